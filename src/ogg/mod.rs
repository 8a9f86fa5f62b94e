// OGG container support
//
// OGG File Structure:
// - OGG Page Header (27 bytes)
//   - Capture Pattern: "OggS" (4 bytes)
//   - Version: 0 (1 byte)
//   - Header Type: 1=continuation, 2=bos, 4=eos (1 byte)
//   - Granule Position (8 bytes)
//   - Bitstream Serial Number (4 bytes)
//   - Page Sequence Number (4 bytes)
//   - CRC Checksum (4 bytes)
//   - Number of Page Segments (1 byte)
//   - Segment Table (variable)
//
// Pages of several logical streams may interleave; each stream is identified
// by its serial number and handed to a codec-specific page consumer.

pub mod flac;
pub mod opus;
pub mod page;
pub mod speex;
pub mod theora;
pub mod vorbis;

pub use page::{HeaderType, PacketSpan, PageHeader, OGG_SIGNATURE, PAGE_HEADER_SIZE};

use std::collections::BTreeMap;

use crate::detect::AudioParser;
use crate::error::{Error, Result};
use crate::metadata::{FormatField, MetadataCollector};
use crate::utils::io::{ignore_exact, peek_vec, read_vec, ByteSource};

/// Codec-specific handler for the pages of one logical stream
pub trait PageConsumer {
    /// Handle one page; `packets` are the packets completed on it, in order
    fn parse_page(
        &mut self,
        header: &PageHeader,
        packets: &[Vec<u8>],
        metadata: &mut MetadataCollector,
    ) -> Result<()>;

    /// Derive duration from the last granule position seen. `end_of_stream`
    /// is set when the physical stream ended without a last page.
    fn calculate_duration(&mut self, end_of_stream: bool, metadata: &mut MetadataCollector);

    /// Called once after the last page was routed
    fn flush(&mut self, _metadata: &mut MetadataCollector) {}

    /// Whether the granule position is only meaningful on the stream's
    /// last page
    fn duration_on_last_page(&self) -> bool {
        true
    }
}

/// Pick a consumer from the first packet of a logical stream
pub fn detect(packet: &[u8]) -> Option<Box<dyn PageConsumer>> {
    vorbis::detect(packet)
        .or_else(|| opus::detect(packet))
        .or_else(|| speex::detect(packet))
        .or_else(|| theora::detect(packet))
        .or_else(|| flac::detect(packet))
}

/// Ogg Skeleton carries no metadata of interest
const SKELETON_SIGNATURE: &[u8] = b"fishead\0";

struct LogicalStream {
    consumer: Option<Box<dyn PageConsumer>>,
    /// Bytes of a packet that continues on a later page
    partial: Vec<u8>,
    finished: bool,
}

impl LogicalStream {
    /// Append this page's segments to the packet in progress and return the
    /// packets completed on it
    fn assemble(&mut self, header: &PageHeader, payload: &[u8], warnings: &mut Vec<String>) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        let mut offset = 0;
        for (i, span) in header.packets().into_iter().enumerate() {
            let data = &payload[offset..offset + span.len];
            offset += span.len;

            if i == 0 {
                if !header.header_type.continued && !self.partial.is_empty() {
                    warnings.push(format!(
                        "ogg stream {:#010x}: dropping incomplete packet of {} bytes",
                        header.serial,
                        self.partial.len()
                    ));
                    self.partial.clear();
                } else if header.header_type.continued && self.partial.is_empty() {
                    // Tail of a packet whose start was never seen
                    log::trace!("ogg stream {:#010x}: orphan continuation", header.serial);
                    continue;
                }
            }

            self.partial.extend_from_slice(data);
            if span.complete {
                packets.push(std::mem::take(&mut self.partial));
            }
        }
        packets
    }
}

/// OGG demultiplexer
#[derive(Default)]
pub struct OggParser {
    streams: BTreeMap<u32, LogicalStream>,
}

impl AudioParser for OggParser {
    fn parse(&mut self, source: &mut dyn ByteSource, metadata: &mut MetadataCollector) -> Result<()> {
        metadata.set_format(FormatField::Container("Ogg".into()));

        // A stream that does not start with a page is not Ogg at all
        let header = PageHeader::read(source)?;
        let payload = read_vec(source, header.data_size())?;
        self.route_page(header, payload, metadata)?;

        while !self.all_finished() {
            if !seek_page(source, metadata)? {
                break;
            }
            let position = source.position();
            let fixed = peek_vec(source, PAGE_HEADER_SIZE)?;
            if fixed.len() == PAGE_HEADER_SIZE && fixed[4] != 0 {
                // Not a page after all; rescan past this capture pattern
                metadata.add_warning(format!(
                    "ogg: false capture pattern at offset {} (page version {})",
                    position, fixed[4]
                ));
                ignore_exact(source, 1)?;
                continue;
            }
            let header = match PageHeader::read(source) {
                Ok(header) => header,
                Err(Error::EndOfStream) => {
                    metadata.add_warning("ogg: stream ends inside a page header");
                    break;
                }
                Err(Error::UnexpectedFileContent { message, .. }) => {
                    metadata.add_warning(format!("ogg: skipping invalid page at offset {}: {}", position, message));
                    continue;
                }
                Err(e) => return Err(e),
            };
            let payload = match read_vec(source, header.data_size()) {
                Ok(payload) => payload,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    metadata.add_warning(format!("ogg: page {} truncated", header.sequence));
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            self.route_page(header, payload, metadata)?;
        }

        self.finish(metadata);
        Ok(())
    }
}

impl OggParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn all_finished(&self) -> bool {
        !self.streams.is_empty() && self.streams.values().all(|stream| stream.finished)
    }

    fn route_page(&mut self, header: PageHeader, payload: Vec<u8>, metadata: &mut MetadataCollector) -> Result<()> {
        log::trace!(
            "ogg page {} of stream {:#010x}: {} bytes, {:?}",
            header.sequence,
            header.serial,
            payload.len(),
            header.header_type
        );

        let stream = match self.streams.entry(header.serial) {
            std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::btree_map::Entry::Vacant(entry) => {
                let consumer = new_consumer(&header, &payload, metadata);
                entry.insert(LogicalStream {
                    consumer,
                    partial: Vec::new(),
                    finished: false,
                })
            }
        };

        let mut warnings = Vec::new();
        let packets = stream.assemble(&header, &payload, &mut warnings);
        for warning in warnings {
            metadata.add_warning(warning);
        }

        if let Some(consumer) = stream.consumer.as_mut() {
            match consumer.parse_page(&header, &packets, metadata) {
                Ok(()) => {}
                Err(Error::FieldDecoding(message)) => {
                    metadata.add_warning(format!("ogg stream {:#010x}: {}", header.serial, message))
                }
                Err(e) => return Err(e),
            }
            if header.header_type.last_page {
                consumer.calculate_duration(false, metadata);
            }
        }
        if header.header_type.last_page {
            stream.finished = true;
        }
        Ok(())
    }

    fn finish(&mut self, metadata: &mut MetadataCollector) {
        for (serial, stream) in self.streams.iter_mut() {
            let Some(consumer) = stream.consumer.as_mut() else {
                continue;
            };
            if !stream.finished {
                if consumer.duration_on_last_page() {
                    metadata.add_warning(format!(
                        "ogg stream {:#010x} ended without a last page; duration unknown",
                        serial
                    ));
                } else {
                    consumer.calculate_duration(true, metadata);
                }
            }
            consumer.flush(metadata);
        }
    }
}

/// Consumer for a stream seen for the first time, chosen by its first packet
fn new_consumer(header: &PageHeader, payload: &[u8], metadata: &mut MetadataCollector) -> Option<Box<dyn PageConsumer>> {
    if !header.header_type.first_page {
        metadata.add_warning(format!(
            "ogg stream {:#010x} starts without a first-page flag",
            header.serial
        ));
    }
    let first_packet_len = header.packets().first().map_or(0, |span| span.len);
    let first_packet = &payload[..first_packet_len];

    if first_packet.starts_with(SKELETON_SIGNATURE) {
        log::debug!("ogg stream {:#010x}: skeleton", header.serial);
        return None;
    }
    let consumer = detect(first_packet);
    if consumer.is_none() {
        metadata.add_warning(format!(
            "ogg stream {:#010x}: unrecognized codec",
            header.serial
        ));
    }
    consumer
}

/// SeekPage: position the source on the next capture pattern.
///
/// Returns false at end of stream. Skipped garbage is reported once.
fn seek_page(source: &mut dyn ByteSource, metadata: &mut MetadataCollector) -> Result<bool> {
    let mut skipped = 0u64;
    loop {
        let window = peek_vec(source, 4096)?;
        if let Some(at) = window.windows(OGG_SIGNATURE.len()).position(|w| w == OGG_SIGNATURE) {
            ignore_exact(source, at as u64)?;
            skipped += at as u64;
            if skipped > 0 {
                metadata.add_warning(format!("ogg: skipped {} bytes to the next page", skipped));
            }
            return Ok(true);
        }
        if window.len() < OGG_SIGNATURE.len() {
            if !window.is_empty() {
                metadata.add_warning(format!(
                    "ogg: {} trailing bytes after the last page",
                    skipped + window.len() as u64
                ));
            }
            return Ok(false);
        }
        // Keep the last bytes, a capture pattern may straddle the window
        let advance = window.len() - (OGG_SIGNATURE.len() - 1);
        ignore_exact(source, advance as u64)?;
        skipped += advance as u64;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::page::tests::page;
    use super::*;
    use crate::metadata::ParseOptions;
    use crate::utils::io::StreamSource;
    use pretty_assertions::assert_eq;

    /// Records every packet it sees
    #[derive(Default)]
    struct Recorder {
        packets: std::rc::Rc<std::cell::RefCell<Vec<Vec<u8>>>>,
    }

    impl PageConsumer for Recorder {
        fn parse_page(&mut self, _: &PageHeader, packets: &[Vec<u8>], _: &mut MetadataCollector) -> Result<()> {
            self.packets.borrow_mut().extend(packets.iter().cloned());
            Ok(())
        }

        fn calculate_duration(&mut self, _: bool, _: &mut MetadataCollector) {}
    }

    #[test]
    fn test_packet_spans_pages() {
        let big: Vec<u8> = (0..600u32).map(|i| i as u8).collect();
        let header_a = PageHeader {
            version: 0,
            header_type: HeaderType { first_page: true, ..Default::default() },
            granule_position: 0,
            serial: 1,
            sequence: 0,
            checksum: 0,
            segment_table: vec![5, 255, 255],
        };
        let header_b = PageHeader {
            header_type: HeaderType { continued: true, ..Default::default() },
            sequence: 1,
            segment_table: vec![90, 3],
            ..header_a.clone()
        };

        let mut stream = LogicalStream {
            consumer: None,
            partial: Vec::new(),
            finished: false,
        };
        let mut warnings = Vec::new();
        let mut payload_a = b"first".to_vec();
        payload_a.extend_from_slice(&big[..510]);
        let first = stream.assemble(&header_a, &payload_a, &mut warnings);
        assert_eq!(first, vec![b"first".to_vec()]);

        let mut payload_b = big[510..].to_vec();
        payload_b.extend_from_slice(b"end");
        let second = stream.assemble(&header_b, &payload_b, &mut warnings);
        assert_eq!(second, vec![big.clone(), b"end".to_vec()]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_demux_interleaved_streams() {
        let seen_a = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen_b = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut parser = OggParser::new();
        for (serial, seen) in [(1u32, &seen_a), (2u32, &seen_b)] {
            parser.streams.insert(
                serial,
                LogicalStream {
                    consumer: Some(Box::new(Recorder { packets: seen.clone() })),
                    partial: Vec::new(),
                    finished: false,
                },
            );
        }

        let mut data = page(0x02, 0, 1, 0, &[b"a0"], false);
        data.extend(page(0x02, 0, 2, 0, &[b"b0"], false));
        data.extend(b"junk");
        data.extend(page(0x04, 10, 1, 1, &[b"a1"], false));
        data.extend(page(0x04, 10, 2, 1, &[b"b1"], false));
        data.extend(page(0x00, 20, 1, 2, &[b"never"], false));

        let mut source = StreamSource::from_bytes(&data);
        let mut metadata = MetadataCollector::new(ParseOptions::default());
        parser.parse(&mut source, &mut metadata).unwrap();

        assert_eq!(*seen_a.borrow(), vec![b"a0".to_vec(), b"a1".to_vec()]);
        assert_eq!(*seen_b.borrow(), vec![b"b0".to_vec(), b"b1".to_vec()]);
        let result = metadata.finalize();
        assert_eq!(result.warnings, vec!["ogg: skipped 4 bytes to the next page".to_string()]);
    }

    #[test]
    fn test_resync_past_false_capture_pattern() {
        use super::vorbis::tests::{comment_header, id_header};

        let mut data = page(0x02, 0, 7, 0, &[&id_header(2, 44_100, 128_000)], false);
        data.extend_from_slice(b"xxOggS\x07garbage that only looks like a page header");
        data.extend(page(0x00, 0, 7, 1, &[&comment_header(&["TITLE=Foo"])], false));
        data.extend(page(0x04, 441_000, 7, 2, &[&[0u8; 64]], false));

        let mut source = StreamSource::from_bytes(&data);
        let mut metadata = MetadataCollector::new(ParseOptions::default());
        OggParser::new().parse(&mut source, &mut metadata).unwrap();
        let result = metadata.finalize();

        assert_eq!(result.common.title.as_deref(), Some("Foo"));
        assert_eq!(result.format.duration, Some(10.0));
        assert!(result.warnings.iter().any(|w| w.contains("false capture pattern")));
    }

    #[test]
    fn test_not_ogg_is_fatal() {
        let mut source = StreamSource::from_bytes(b"RIFF\x00\x00\x00\x00WAVEfmt plus padding bytes");
        let mut metadata = MetadataCollector::new(ParseOptions::default());
        assert!(matches!(
            OggParser::new().parse(&mut source, &mut metadata),
            Err(Error::UnexpectedFileContent { format: "ogg", .. })
        ));
    }

    #[test]
    fn test_unknown_codec_and_missing_last_page() {
        let data = page(0x02, 0, 9, 0, &[b"\x42mystery"], false);
        let mut source = StreamSource::from_bytes(&data);
        let mut metadata = MetadataCollector::new(ParseOptions::default());
        OggParser::new().parse(&mut source, &mut metadata).unwrap();
        let result = metadata.finalize();
        assert_eq!(result.format.container.as_deref(), Some("Ogg"));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("unrecognized codec"));
    }
}

// Ogg FLAC page consumer
//
// First packet: 0x7F "FLAC", mapping version (2 bytes), number of header
// packets (BE u16), "fLaC", then the STREAMINFO block with its header.
// Every further header packet is one native metadata block; audio frames
// start with the 0xFF sync byte.

use crate::error::{Error, Result};
use crate::flac::{handle_block, FlacMetadataBlockHeader, FLAC_SIGNATURE};
use crate::metadata::{FormatField, MetadataCollector};
use crate::ogg::{PageConsumer, PageHeader};

const OGG_FLAC_MAGIC: &[u8; 5] = b"\x7FFLAC";
const FIRST_PACKET_HEADER: usize = 13;

pub fn detect(packet: &[u8]) -> Option<Box<dyn PageConsumer>> {
    if packet.starts_with(OGG_FLAC_MAGIC) {
        Some(Box::new(OggFlacConsumer::default()))
    } else {
        None
    }
}

#[derive(Debug, Default)]
pub struct OggFlacConsumer {
    sample_rate: Option<u32>,
    last_granule: Option<u64>,
}

impl OggFlacConsumer {
    fn parse_first_packet(&mut self, packet: &[u8], metadata: &mut MetadataCollector) -> Result<()> {
        if packet.len() < FIRST_PACKET_HEADER + FlacMetadataBlockHeader::HEADER_SIZE {
            return Err(Error::content("ogg", "Ogg FLAC header packet too short"));
        }
        if &packet[9..13] != FLAC_SIGNATURE {
            return Err(Error::content("ogg", "Ogg FLAC header without fLaC signature"));
        }
        log::debug!(
            "Ogg FLAC mapping {}.{}, {} header packets",
            packet[5],
            packet[6],
            u16::from_be_bytes([packet[7], packet[8]])
        );
        metadata.set_format(FormatField::Container("Ogg/FLAC".into()));
        self.handle_block_packet(&packet[FIRST_PACKET_HEADER..], metadata)
    }

    fn handle_block_packet(&mut self, packet: &[u8], metadata: &mut MetadataCollector) -> Result<()> {
        let mut header_bytes = [0u8; FlacMetadataBlockHeader::HEADER_SIZE];
        header_bytes.copy_from_slice(&packet[..FlacMetadataBlockHeader::HEADER_SIZE]);
        let header = FlacMetadataBlockHeader::parse(header_bytes);
        let body = &packet[FlacMetadataBlockHeader::HEADER_SIZE..];
        handle_block(&header, body, metadata)?;
        if self.sample_rate.is_none() {
            self.sample_rate = metadata.format().sample_rate;
        }
        Ok(())
    }
}

impl PageConsumer for OggFlacConsumer {
    fn parse_page(&mut self, header: &PageHeader, packets: &[Vec<u8>], metadata: &mut MetadataCollector) -> Result<()> {
        if let Some(granule) = header.granule() {
            self.last_granule = Some(granule);
        }
        for packet in packets {
            if packet.starts_with(OGG_FLAC_MAGIC) {
                self.parse_first_packet(packet, metadata)?;
            } else if packet.first() == Some(&0xFF) {
                // Audio frame
            } else if packet.len() >= FlacMetadataBlockHeader::HEADER_SIZE {
                self.handle_block_packet(packet, metadata)?;
            }
        }
        Ok(())
    }

    fn calculate_duration(&mut self, _end_of_stream: bool, metadata: &mut MetadataCollector) {
        let (Some(rate), Some(granule)) = (self.sample_rate, self.last_granule) else {
            return;
        };
        if rate == 0 {
            return;
        }
        metadata.set_format(FormatField::NumberOfSamples(granule));
        metadata.set_format(FormatField::Duration(granule as f64 / rate as f64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::AudioParser;
    use crate::flac::metadata::tests::stream_info;
    use crate::flac::vorbis::tests::comment_block;
    use crate::metadata::ParseOptions;
    use crate::ogg::page::tests::page;
    use crate::ogg::OggParser;
    use crate::utils::io::StreamSource;
    use pretty_assertions::assert_eq;

    fn block_packet(block_type: u8, last: bool, body: &[u8]) -> Vec<u8> {
        let mut out = vec![block_type | if last { 0x80 } else { 0 }];
        out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_ogg_flac_stream() {
        let mut first = OGG_FLAC_MAGIC.to_vec();
        first.extend_from_slice(&[1, 0, 0, 1]);
        first.extend_from_slice(FLAC_SIGNATURE);
        first.extend(block_packet(0, false, &stream_info(48_000, 2, 24, 0)));
        let comments = block_packet(4, true, &comment_block("libFLAC", &["ALBUM=Live"]));

        let mut data = page(0x02, 0, 5, 0, &[&first], false);
        data.extend(page(0x00, 0, 5, 1, &[&comments], false));
        data.extend(page(0x04, 144_000, 5, 2, &[&[0xFF, 0xF8, 0x00, 0x00]], false));

        let mut source = StreamSource::from_bytes(&data);
        let mut metadata = MetadataCollector::new(ParseOptions::default());
        OggParser::new().parse(&mut source, &mut metadata).unwrap();
        let result = metadata.finalize();

        assert_eq!(result.format.container.as_deref(), Some("Ogg/FLAC"));
        assert_eq!(result.format.codec.as_deref(), Some("FLAC"));
        assert_eq!(result.format.bits_per_sample, Some(24));
        assert_eq!(result.format.duration, Some(3.0));
        assert_eq!(result.common.album.as_deref(), Some("Live"));
        assert!(result.warnings.is_empty());
    }
}

// MPEG audio (MP1/MP2/MP3) support
//
// MPEG File Structure:
// - Optional ID3v2 tag(s)
// - Audio frames, the first one possibly carrying a Xing/Info/VBRI header
// - Optional ID3v1 tag (last 128 bytes)

pub mod header;

pub use header::{ChannelMode, FrameHeader, Layer, MpegVersion, VbrHeader, VbrHeaderKind};

use crate::detect::AudioParser;
use crate::error::Result;
use crate::id3;
use crate::metadata::{FormatField, MetadataCollector};
use crate::utils::io::{ignore_exact, peek_vec, ByteSource};

/// How far past the tags the first frame is searched for
const SYNC_WINDOW: usize = 64 * 1024;

/// MPEG audio stream parser
#[derive(Default)]
pub struct MpegParser;

impl AudioParser for MpegParser {
    fn parse(&mut self, source: &mut dyn ByteSource, metadata: &mut MetadataCollector) -> Result<()> {
        id3::v2::parse_leading_tags(source, metadata)?;
        metadata.set_format(FormatField::Container("MPEG".into()));

        let window = peek_vec(source, SYNC_WINDOW)?;
        let Some((offset, frame)) = find_first_frame(&window) else {
            metadata.add_warning("mpeg: no frame sync found");
            if !metadata.options().skip_post_headers {
                id3::v1::read_trailer(source, metadata)?;
            }
            return Ok(());
        };
        if offset > 0 {
            log::debug!("mpeg: first frame after {} bytes of junk", offset);
        }
        ignore_exact(source, offset as u64)?;

        let vbr = VbrHeader::find(&frame, &window[offset..]);
        apply_frame(&frame, vbr.as_ref(), metadata);

        // Everything from the first frame on is audio, unless a trailer says otherwise
        let mut audio_bytes = source.remaining();
        if !metadata.options().skip_post_headers && id3::v1::read_trailer(source, metadata)? {
            audio_bytes = audio_bytes.map(|n| n.saturating_sub(id3::Id3v1Tag::TAG_SIZE as u64));
        }

        let exact_samples = vbr
            .as_ref()
            .and_then(|vbr| vbr.frames)
            .map(|frames| frames as u64 * frame.samples_per_frame() as u64);
        match exact_samples {
            Some(samples) => {
                let duration = samples as f64 / frame.sample_rate as f64;
                metadata.set_format(FormatField::NumberOfSamples(samples));
                metadata.set_format(FormatField::Duration(duration));
                let stream_bytes = vbr.as_ref().and_then(|vbr| vbr.bytes).map(u64::from).or(audio_bytes);
                if let Some(bytes) = stream_bytes.filter(|_| duration > 0.0) {
                    metadata.set_format(FormatField::Bitrate(bytes as f64 * 8.0 / duration));
                }
            }
            None => {
                if let Some(bytes) = audio_bytes {
                    metadata.set_format(FormatField::Duration(bytes as f64 * 8.0 / frame.bitrate as f64));
                }
            }
        }
        Ok(())
    }
}

/// First offset in `data` holding a frame header whose successor (when it
/// lies inside `data`) is also a frame header
fn find_first_frame(data: &[u8]) -> Option<(usize, FrameHeader)> {
    let header_at = |at: usize| {
        let bytes = data.get(at..at + FrameHeader::SIZE)?;
        FrameHeader::parse([bytes[0], bytes[1], bytes[2], bytes[3]])
    };
    (0..data.len().saturating_sub(FrameHeader::SIZE - 1)).find_map(|at| {
        let frame = header_at(at)?;
        let next = at + frame.frame_len();
        if next + FrameHeader::SIZE <= data.len() {
            let follower = header_at(next)?;
            if follower.version != frame.version || follower.layer != frame.layer {
                return None;
            }
        }
        Some((at, frame))
    })
}

fn apply_frame(frame: &FrameHeader, vbr: Option<&VbrHeader>, metadata: &mut MetadataCollector) {
    metadata.set_format(FormatField::Codec(frame.codec()));
    metadata.set_format(FormatField::Lossless(false));
    metadata.set_format(FormatField::HasAudio(true));
    metadata.set_format(FormatField::SampleRate(frame.sample_rate));
    metadata.set_format(FormatField::NumberOfChannels(frame.channel_mode.channels()));
    metadata.set_format(FormatField::Bitrate(frame.bitrate as f64));

    let profile = match vbr.map(|vbr| vbr.kind) {
        Some(VbrHeaderKind::Xing) | Some(VbrHeaderKind::Vbri) => "VBR",
        _ => "CBR",
    };
    metadata.set_format(FormatField::CodecProfile(profile.into()));
    if let Some(encoder) = vbr.and_then(|vbr| vbr.encoder.clone()) {
        metadata.set_format(FormatField::Tool(encoder));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::metadata::ParseOptions;
    use crate::utils::io::StreamSource;
    use pretty_assertions::assert_eq;

    /// 128 kbit/s, 44.1 kHz, joint stereo
    pub(crate) const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
    pub(crate) const FRAME_LEN: usize = 417;

    /// `count` CBR frames
    pub(crate) fn cbr_frames(count: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(count * FRAME_LEN);
        for _ in 0..count {
            out.extend_from_slice(&FRAME_HEADER);
            out.resize(out.len() + FRAME_LEN - 4, 0x11);
        }
        out
    }

    fn id3v1_trailer(title: &str) -> Vec<u8> {
        let mut out = b"TAG".to_vec();
        let mut field = title.as_bytes().to_vec();
        field.resize(30, 0);
        out.extend(field);
        out.resize(127, 0);
        out.push(255);
        out
    }

    fn parse(data: &[u8], options: ParseOptions) -> crate::metadata::AudioMetadata {
        let mut source = StreamSource::from_bytes(data);
        let mut metadata = MetadataCollector::new(options);
        MpegParser.parse(&mut source, &mut metadata).unwrap();
        metadata.finalize()
    }

    #[test]
    fn test_cbr_estimate_and_id3v1() {
        let mut data = cbr_frames(100);
        data.extend(id3v1_trailer("Old Tag"));
        let result = parse(&data, ParseOptions::default());

        assert_eq!(result.format.container.as_deref(), Some("MPEG"));
        assert_eq!(result.format.codec.as_deref(), Some("MPEG 1 Layer 3"));
        assert_eq!(result.format.codec_profile.as_deref(), Some("CBR"));
        assert_eq!(result.format.sample_rate, Some(44_100));
        assert_eq!(result.format.number_of_channels, Some(2));
        assert_eq!(result.format.bitrate, Some(128_000.0));
        assert_eq!(result.format.duration, Some(100.0 * 417.0 * 8.0 / 128_000.0));
        assert_eq!(result.common.title.as_deref(), Some("Old Tag"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_xing_frame_count() {
        let mut first = FRAME_HEADER.to_vec();
        first.resize(36, 0);
        first.extend_from_slice(b"Xing");
        first.extend_from_slice(&0x01u32.to_be_bytes());
        first.extend_from_slice(&2000u32.to_be_bytes());
        first.resize(FRAME_LEN, 0);
        let mut data = vec![0u8; 7];
        data.extend(first);
        data.extend(cbr_frames(3));

        let result = parse(&data, ParseOptions::default());
        assert_eq!(result.format.codec_profile.as_deref(), Some("VBR"));
        assert_eq!(result.format.number_of_samples, Some(2000 * 1152));
        assert_eq!(result.format.duration, Some(2000.0 * 1152.0 / 44_100.0));
    }

    #[test]
    fn test_skip_post_headers_ignores_trailer() {
        let mut data = cbr_frames(10);
        data.extend(id3v1_trailer("Old Tag"));
        let options = ParseOptions {
            skip_post_headers: true,
            ..Default::default()
        };
        let result = parse(&data, options);
        assert_eq!(result.common.title, None);
        assert!(result.native.is_empty());
    }

    #[test]
    fn test_no_sync_is_a_warning() {
        let result = parse(&[0x42u8; 2000], ParseOptions::default());
        assert_eq!(result.format.codec, None);
        assert_eq!(result.warnings, vec!["mpeg: no frame sync found".to_string()]);
    }
}

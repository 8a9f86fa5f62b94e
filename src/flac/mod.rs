// FLAC metadata handling module
//
// FLAC File Structure:
// - "fLaC" signature (4 bytes)
// - Metadata blocks, each with a 4-byte header (last flag, type, 24-bit length)
//   - STREAMINFO must come first
// - Audio frames

pub mod metadata;
pub mod picture;
pub mod vorbis;

pub use metadata::{handle_block, FlacMetadataBlockHeader, FlacMetadataBlockType, StreamInfo, FLAC_SIGNATURE};
pub use picture::FlacPicture;
pub use vorbis::VorbisComment;

use crate::detect::AudioParser;
use crate::error::{Error, Result};
use crate::id3;
use crate::metadata::{FormatField, MetadataCollector};
use crate::utils::io::{ignore_exact, read_array, read_vec, ByteSource};

/// Native FLAC stream parser
#[derive(Default)]
pub struct FlacParser;

impl AudioParser for FlacParser {
    fn parse(&mut self, source: &mut dyn ByteSource, metadata: &mut MetadataCollector) -> Result<()> {
        // Some taggers put an ID3v2 tag in front of the signature
        let id3_tags = id3::v2::parse_leading_tags(source, metadata)?;
        if id3_tags > 0 {
            metadata.add_warning("FLAC stream is preceded by an ID3v2 tag");
        }

        let signature = read_array::<4, _>(source)?;
        if &signature != FLAC_SIGNATURE {
            return Err(Error::content("flac", "missing fLaC signature"));
        }
        metadata.set_format(FormatField::Container("FLAC".into()));

        let mut first = true;
        loop {
            let header = FlacMetadataBlockHeader::read(source)?;
            if first && header.block_type != FlacMetadataBlockType::StreamInfo {
                return Err(Error::content("flac", "first metadata block is not STREAMINFO"));
            }
            first = false;

            let skip = header.block_type == FlacMetadataBlockType::Padding
                || (header.block_type == FlacMetadataBlockType::Picture && metadata.options().skip_covers);
            if skip {
                ignore_exact(source, header.length as u64)?;
            } else {
                let data = read_vec(source, header.length as usize)?;
                handle_block(&header, &data, metadata)?;
            }
            if header.is_last {
                break;
            }
        }

        // Everything after the metadata blocks is audio
        let audio_bytes = source.remaining();
        if let (Some(bytes), Some(duration)) = (audio_bytes, metadata.format().duration) {
            if duration > 0.0 {
                metadata.set_format(FormatField::Bitrate(bytes as f64 * 8.0 / duration));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::flac::metadata::tests::stream_info;
    use crate::flac::vorbis::tests::comment_block;
    use crate::metadata::ParseOptions;
    use crate::utils::io::StreamSource;
    use pretty_assertions::assert_eq;

    fn block(block_type: u8, last: bool, body: &[u8]) -> Vec<u8> {
        let mut out = vec![block_type | if last { 0x80 } else { 0 }];
        out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        out.extend_from_slice(body);
        out
    }

    /// Minimal FLAC file: STREAMINFO, a comment block, padding, fake audio
    pub(crate) fn flac_file(comments: &[&str], audio_len: usize) -> Vec<u8> {
        let mut out = FLAC_SIGNATURE.to_vec();
        out.extend(block(0, false, &stream_info(44100, 2, 16, 441000)));
        out.extend(block(4, false, &comment_block("reference libFLAC 1.4.3", comments)));
        out.extend(block(1, true, &[0u8; 16]));
        out.extend(std::iter::repeat(0xAAu8).take(audio_len));
        out
    }

    fn parse(data: &[u8]) -> Result<crate::metadata::AudioMetadata> {
        let mut source = StreamSource::from_bytes(data);
        let mut metadata = MetadataCollector::new(ParseOptions::default());
        FlacParser.parse(&mut source, &mut metadata)?;
        Ok(metadata.finalize())
    }

    #[test]
    fn test_flac_stream() {
        let result = parse(&flac_file(&["TITLE=Song", "TRACKNUMBER=3", "TRACKTOTAL=12"], 10_000)).unwrap();
        assert_eq!(result.format.container.as_deref(), Some("FLAC"));
        assert_eq!(result.format.codec.as_deref(), Some("FLAC"));
        assert_eq!(result.format.lossless, Some(true));
        assert_eq!(result.format.sample_rate, Some(44100));
        assert_eq!(result.format.duration, Some(10.0));
        assert_eq!(result.format.bitrate, Some(8000.0));
        assert_eq!(result.format.tool.as_deref(), Some("reference libFLAC 1.4.3"));
        assert_eq!(result.common.title.as_deref(), Some("Song"));
        assert_eq!(result.common.track.no, Some(3));
        assert_eq!(result.common.track.of, Some(12));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_leading_id3_tolerated() {
        let mut data = crate::id3::v2::tests::tag(3, 0, &[0u8; 8]);
        data.extend(flac_file(&["ARTIST=Band"], 0));
        let result = parse(&data).unwrap();
        assert_eq!(result.common.artist, vec!["Band".to_string()]);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_streaminfo_must_come_first() {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(4, true, &comment_block("", &[])));
        assert!(matches!(
            parse(&data),
            Err(Error::UnexpectedFileContent { format: "flac", .. })
        ));
    }
}

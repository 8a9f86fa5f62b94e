//! audiotag - streaming audio metadata extraction
//!
//! Sniffs the container format of a byte source, drives the matching parser
//! forward through it and returns normalized metadata: technical format
//! descriptors, common tags mapped from every native tag vocabulary, the
//! native tags themselves and any non-fatal warnings.
//!
//! ```no_run
//! let metadata = audiotag::parse_file("song.flac", audiotag::ParseOptions::default())?;
//! println!("{:?} by {:?}", metadata.common.title, metadata.common.artist);
//! # Ok::<(), audiotag::Error>(())
//! ```

pub mod detect;
pub mod error;
pub mod field_mapping;
pub mod flac;
pub mod id3;
pub mod metadata;
pub mod mpeg;
pub mod ogg;
pub mod utils;

use std::path::Path;

pub use detect::{identify, AudioParser, ParserLoader};
pub use error::{Error, Result};
pub use metadata::{AudioMetadata, CommonTags, FormatInfo, MetadataCollector, ParseOptions, Picture, RawTag, TagValue};
pub use utils::io::{ByteSource, StreamSource};

/// Identify the format of `source` and parse it to completion.
///
/// A structural failure aborts the parse and no partial result is returned;
/// anything recoverable ends up in `AudioMetadata::warnings`.
pub fn parse_stream(source: &mut dyn ByteSource, options: ParseOptions) -> Result<AudioMetadata> {
    let loader = identify(source, &options)?;
    log::debug!("parsing as {}", loader.format_id);

    let mut metadata = MetadataCollector::new(options);
    let mut parser = (loader.load)();
    parser.parse(source, &mut metadata)?;
    Ok(metadata.finalize())
}

/// Parse an in-memory buffer
pub fn parse_bytes(data: &[u8], options: ParseOptions) -> Result<AudioMetadata> {
    let mut source = StreamSource::from_bytes(data);
    parse_stream(&mut source, options)
}

/// Parse a file; its name doubles as the extension hint unless one is set
pub fn parse_file(path: impl AsRef<Path>, mut options: ParseOptions) -> Result<AudioMetadata> {
    let path = path.as_ref();
    if options.path.is_none() {
        options.path = Some(path.to_string_lossy().into_owned());
    }
    let mut source = StreamSource::open(path)?;
    parse_stream(&mut source, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::v2::tests::{frame, tag};
    use crate::ogg::page::tests::page;
    use crate::ogg::vorbis::tests::{comment_header, id_header};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_id3v2_title() {
        let data = tag(3, 0, &frame(3, "TIT2", [0, 0], b"\x00Hello\x00"));
        assert_eq!(data.len(), 27);
        assert_eq!(&data[6..10], &[0, 0, 0, 17]);

        let result = parse_bytes(&data, ParseOptions::default()).unwrap();
        assert_eq!(result.common.title.as_deref(), Some("Hello"));
        let native = result.native_tags("id3v2.3");
        assert_eq!(native.len(), 1);
        assert_eq!(native[0].id, "TIT2");
        assert_eq!(native[0].value, TagValue::Text("Hello".into()));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_ogg_vorbis_title() {
        let mut data = page(0x02, 0, 0x1234, 0, &[&id_header(2, 44_100, 128_000)], false);
        data.extend(page(0x00, 0, 0x1234, 1, &[&comment_header(&["TITLE=Foo"])], false));
        data.extend(page(0x04, 441_000, 0x1234, 2, &[&[0u8; 64]], false));

        let result = parse_bytes(&data, ParseOptions::default()).unwrap();
        assert_eq!(result.common.title.as_deref(), Some("Foo"));
        assert_eq!(result.format.container.as_deref(), Some("Ogg"));
        assert_eq!(result.format.codec.as_deref(), Some("Vorbis I"));
        assert_eq!(result.format.duration, Some(10.0));
        assert_eq!(result.format.bitrate, Some(128_000.0));
        assert_eq!(result.native_tags("vorbis")[0].id, "TITLE");
    }

    #[test]
    fn test_unrecognized_content() {
        let noise: Vec<u8> = (0..256u32).map(|i| (i * 37 % 251) as u8 | 0x01).filter(|&b| b != 0xFF).collect();
        assert!(matches!(
            parse_bytes(&noise, ParseOptions::default()),
            Err(Error::CouldNotDetermineFileType)
        ));
    }

    #[test]
    fn test_empty_source() {
        assert!(matches!(parse_bytes(&[], ParseOptions::default()), Err(Error::EmptySource)));
    }

    #[test]
    fn test_flac_after_id3() {
        let mut data = tag(4, 0, &frame(4, "TPE1", [0, 0], b"\x03Band"));
        data.extend(crate::flac::tests::flac_file(&["TITLE=Song"], 100));
        let result = parse_bytes(&data, ParseOptions::default()).unwrap();
        assert_eq!(result.format.codec.as_deref(), Some("FLAC"));
        assert_eq!(result.common.artist, vec!["Band".to_string()]);
        assert_eq!(result.common.title.as_deref(), Some("Song"));
        assert_eq!(result.format.tag_types, vec!["id3v2.4", "vorbis"]);
        assert_eq!(result.warnings, vec!["flac stream is preceded by an ID3v2 tag".to_string()]);
    }

    #[test]
    fn test_mp3_with_id3v2() {
        let mut data = tag(3, 0, &frame(3, "TALB", [0, 0], b"\x00Record"));
        data.extend(crate::mpeg::tests::cbr_frames(20));
        let result = parse_bytes(&data, ParseOptions::default()).unwrap();
        assert_eq!(result.format.container.as_deref(), Some("MPEG"));
        assert_eq!(result.format.codec.as_deref(), Some("MPEG 1 Layer 3"));
        assert_eq!(result.common.album.as_deref(), Some("Record"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_truncated_structure_is_fatal() {
        let mut data = crate::flac::FLAC_SIGNATURE.to_vec();
        data.extend_from_slice(&[0x80, 0x00, 0x00, 0x22, 0x10]);
        assert!(matches!(
            parse_bytes(&data, ParseOptions::default()),
            Err(Error::EndOfStream)
        ));
    }
}

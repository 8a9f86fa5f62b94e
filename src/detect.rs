// Format sniffing and parser dispatch
//
// Resolution order: caller MIME type, file extension, content signature.
// Parsers are only constructed once a format has been chosen.

use std::path::Path;

use crate::error::{Error, Result};
use crate::flac::FlacParser;
use crate::id3::Id3PrefixedParser;
use crate::metadata::{MetadataCollector, ParseOptions};
use crate::mpeg::{FrameHeader, MpegParser};
use crate::ogg::OggParser;
use crate::utils::io::{peek_vec, ByteSource};

/// Bytes peeked for signature matching
pub const SNIFF_LEN: usize = 16;

/// A container or tag parser driving the byte source forward
pub trait AudioParser {
    fn parse(&mut self, source: &mut dyn ByteSource, metadata: &mut MetadataCollector) -> Result<()>;
}

/// Registry entry for one supported format
pub struct ParserLoader {
    pub format_id: &'static str,
    pub extensions: &'static [&'static str],
    pub mime_types: &'static [&'static str],
    pub load: fn() -> Box<dyn AudioParser>,
}

impl std::fmt::Debug for ParserLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserLoader")
            .field("format_id", &self.format_id)
            .finish_non_exhaustive()
    }
}

fn load<P: AudioParser + Default + 'static>() -> Box<dyn AudioParser> {
    Box::<P>::default()
}

static LOADERS: [ParserLoader; 4] = [
    ParserLoader {
        format_id: "id3v2",
        extensions: &[],
        mime_types: &[],
        load: load::<Id3PrefixedParser>,
    },
    ParserLoader {
        format_id: "mpeg",
        extensions: &["mp3", "mp2", "mp1", "mpga"],
        mime_types: &["audio/mpeg", "audio/mp3", "audio/mpa", "audio/mpeg3"],
        load: load::<MpegParser>,
    },
    ParserLoader {
        format_id: "flac",
        extensions: &["flac"],
        mime_types: &["audio/flac", "audio/x-flac"],
        load: load::<FlacParser>,
    },
    ParserLoader {
        format_id: "ogg",
        extensions: &["ogg", "oga", "ogv", "ogx", "opus", "spx"],
        mime_types: &["audio/ogg", "audio/opus", "audio/speex", "audio/x-speex", "video/ogg", "application/ogg"],
        load: load::<OggParser>,
    },
];

/// Formats that are recognized but have no parser here
struct UnsupportedFormat {
    name: &'static str,
    extensions: &'static [&'static str],
    mime_types: &'static [&'static str],
    signature: fn(&[u8]) -> bool,
}

const ASF_GUID: [u8; 16] = [
    0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];

static UNSUPPORTED: &[UnsupportedFormat] = &[
    UnsupportedFormat {
        name: "wav",
        extensions: &["wav", "wave"],
        mime_types: &["audio/wav", "audio/wave", "audio/x-wav", "audio/vnd.wave"],
        signature: |b| b.starts_with(b"RIFF") && matches!(b.get(8..12), Some(b"WAVE")),
    },
    UnsupportedFormat {
        name: "aiff",
        extensions: &["aif", "aiff", "aifc"],
        mime_types: &["audio/aiff", "audio/x-aiff"],
        signature: |b| b.starts_with(b"FORM") && matches!(b.get(8..12), Some(b"AIFF") | Some(b"AIFC")),
    },
    UnsupportedFormat {
        name: "mp4",
        extensions: &["m4a", "m4b", "m4p", "mp4", "m4v", "3gp"],
        mime_types: &["audio/mp4", "audio/x-m4a", "video/mp4", "audio/aac"],
        signature: |b| matches!(b.get(4..8), Some(b"ftyp")),
    },
    UnsupportedFormat {
        name: "matroska",
        extensions: &["mka", "mkv", "webm"],
        mime_types: &["audio/x-matroska", "video/x-matroska", "audio/webm", "video/webm"],
        signature: |b| b.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]),
    },
    UnsupportedFormat {
        name: "wavpack",
        extensions: &["wv"],
        mime_types: &["audio/x-wavpack", "audio/wavpack"],
        signature: |b| b.starts_with(b"wvpk"),
    },
    UnsupportedFormat {
        name: "musepack",
        extensions: &["mpc", "mp+", "mpp"],
        mime_types: &["audio/x-musepack", "audio/musepack"],
        signature: |b| b.starts_with(b"MPCK") || b.starts_with(b"MP+"),
    },
    UnsupportedFormat {
        name: "dsf",
        extensions: &["dsf"],
        mime_types: &["audio/dsf", "audio/x-dsf"],
        signature: |b| b.starts_with(b"DSD "),
    },
    UnsupportedFormat {
        name: "dsdiff",
        extensions: &["dff"],
        mime_types: &["audio/dff", "audio/x-dff"],
        signature: |b| b.starts_with(b"FRM8"),
    },
    UnsupportedFormat {
        name: "monkeys-audio",
        extensions: &["ape"],
        mime_types: &["audio/ape", "audio/x-ape", "audio/monkeys-audio"],
        signature: |b| b.starts_with(b"MAC "),
    },
    UnsupportedFormat {
        name: "apev2",
        extensions: &[],
        mime_types: &[],
        signature: |b| b.starts_with(b"APETAGEX"),
    },
    UnsupportedFormat {
        name: "amr",
        extensions: &["amr"],
        mime_types: &["audio/amr"],
        signature: |b| b.starts_with(b"#!AMR"),
    },
    UnsupportedFormat {
        name: "asf",
        extensions: &["asf", "wma", "wmv"],
        mime_types: &["audio/x-ms-wma", "video/x-ms-asf", "video/x-ms-wmv"],
        signature: |b| b.starts_with(&ASF_GUID),
    },
    UnsupportedFormat {
        name: "adts",
        extensions: &["aac"],
        mime_types: &["audio/x-aac", "audio/aacp"],
        // Sync word with layer 0
        signature: |b| b.len() >= 2 && b[0] == 0xFF && b[1] & 0xF6 == 0xF0,
    },
];

/// Pick the parser for a source. Nothing is consumed.
pub fn identify(source: &mut dyn ByteSource, options: &ParseOptions) -> Result<&'static ParserLoader> {
    let head = peek_vec(source, SNIFF_LEN)?;
    if head.is_empty() {
        return Err(Error::EmptySource);
    }

    if let Some(mime) = options.mime_type.as_deref() {
        if let Some(found) = by_mime_type(mime) {
            log::debug!("format {:?} from MIME type {}", found.as_ref().map(|l| l.format_id), mime);
            return found;
        }
    }
    if let Some(extension) = options.path.as_deref().and_then(extension_of) {
        if let Some(found) = by_extension(&extension) {
            log::debug!("format {:?} from extension .{}", found.as_ref().map(|l| l.format_id), extension);
            return found;
        }
    }
    let found = identify_signature(&head);
    log::debug!("format {:?} from content signature", found.as_ref().map(|l| l.format_id));
    found
}

/// Match a content prefix against the magic-number table
pub fn identify_signature(head: &[u8]) -> Result<&'static ParserLoader> {
    if head.is_empty() {
        return Err(Error::EmptySource);
    }
    let format_id = if head.starts_with(b"ID3") {
        Some("id3v2")
    } else if head.starts_with(crate::flac::FLAC_SIGNATURE) {
        Some("flac")
    } else if head.starts_with(crate::ogg::OGG_SIGNATURE) {
        Some("ogg")
    } else if is_mpeg_frame(head) {
        Some("mpeg")
    } else {
        None
    };
    if let Some(format_id) = format_id {
        return loader(format_id);
    }
    match UNSUPPORTED.iter().find(|format| (format.signature)(head)) {
        Some(format) => Err(Error::UnsupportedFileType(format.name.to_string())),
        None => Err(Error::CouldNotDetermineFileType),
    }
}

/// Registered loader by format id
pub fn loader(format_id: &str) -> Result<&'static ParserLoader> {
    LOADERS
        .iter()
        .find(|loader| loader.format_id == format_id)
        .ok_or_else(|| Error::InternalParser(format!("no loader registered for {}", format_id)))
}

/// All registered loaders
pub fn loaders() -> &'static [ParserLoader] {
    &LOADERS
}

fn is_mpeg_frame(head: &[u8]) -> bool {
    match head {
        [a, b, c, d, ..] => FrameHeader::parse([*a, *b, *c, *d]).is_some(),
        _ => false,
    }
}

fn by_mime_type(mime: &str) -> Option<Result<&'static ParserLoader>> {
    // Drop parameters such as "; codecs=opus"
    let mime = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if let Some(loader) = LOADERS.iter().find(|l| l.mime_types.contains(&mime.as_str())) {
        return Some(Ok(loader));
    }
    UNSUPPORTED
        .iter()
        .find(|format| format.mime_types.contains(&mime.as_str()))
        .map(|format| Err(Error::UnsupportedFileType(format.name.to_string())))
}

fn by_extension(extension: &str) -> Option<Result<&'static ParserLoader>> {
    if let Some(loader) = LOADERS.iter().find(|l| l.extensions.contains(&extension)) {
        return Some(Ok(loader));
    }
    UNSUPPORTED
        .iter()
        .find(|format| format.extensions.contains(&extension))
        .map(|format| Err(Error::UnsupportedFileType(format.name.to_string())))
}

fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::io::StreamSource;
    use pretty_assertions::assert_eq;

    fn identify_bytes(data: &[u8], options: ParseOptions) -> Result<&'static str> {
        let mut source = StreamSource::from_bytes(data);
        let loader = identify(&mut source, &options)?;
        // Sniffing must not consume anything
        assert_eq!(source.position(), 0);
        Ok(loader.format_id)
    }

    #[test]
    fn test_signatures() {
        let detect = |data: &[u8]| identify_bytes(data, ParseOptions::default());
        assert_eq!(detect(b"ID3\x03\x00\x00\x00\x00\x00\x00").unwrap(), "id3v2");
        assert_eq!(detect(b"fLaC\x00\x00\x00\x22").unwrap(), "flac");
        assert_eq!(detect(b"OggS\x00\x02").unwrap(), "ogg");
        assert_eq!(detect(&[0xFF, 0xFB, 0x90, 0x64, 0x00]).unwrap(), "mpeg");
    }

    #[test]
    fn test_unknown_content() {
        let result = identify_bytes(b"\x01\x02\x03\x04 definitely not audio", ParseOptions::default());
        assert!(matches!(result, Err(Error::CouldNotDetermineFileType)));
    }

    #[test]
    fn test_empty_source() {
        let result = identify_bytes(b"", ParseOptions::default());
        assert!(matches!(result, Err(Error::EmptySource)));
    }

    #[test]
    fn test_recognized_but_unsupported() {
        let wav = b"RIFF\x24\x00\x00\x00WAVEfmt ";
        assert!(matches!(
            identify_bytes(wav, ParseOptions::default()),
            Err(Error::UnsupportedFileType(name)) if name == "wav"
        ));
        let m4a = b"\x00\x00\x00\x20ftypM4A ";
        assert!(matches!(
            identify_bytes(m4a, ParseOptions::default()),
            Err(Error::UnsupportedFileType(name)) if name == "mp4"
        ));
    }

    #[test]
    fn test_hint_order() {
        // MIME type beats extension, extension beats content
        let options = ParseOptions {
            mime_type: Some("audio/ogg; codecs=opus".into()),
            path: Some("song.flac".into()),
            ..Default::default()
        };
        assert_eq!(identify_bytes(b"ID3", options).unwrap(), "ogg");

        let options = ParseOptions {
            mime_type: Some("application/octet-stream".into()),
            path: Some("/music/Song.FLAC".into()),
            ..Default::default()
        };
        assert_eq!(identify_bytes(b"ID3", options).unwrap(), "flac");

        let options = ParseOptions {
            path: Some("clip.wma".into()),
            ..Default::default()
        };
        assert!(matches!(identify_bytes(b"ID3", options), Err(Error::UnsupportedFileType(_))));
    }

    #[test]
    fn test_every_loader_constructs() {
        for loader in loaders() {
            let _parser = (loader.load)();
        }
        assert!(matches!(loader("wav"), Err(Error::InternalParser(_))));
    }
}

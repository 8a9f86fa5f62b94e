// ID3 metadata handling module
pub mod frames;
pub mod v1;
pub mod v2;

pub use v1::Id3v1Tag;
pub use v2::Id3v2Header;

use crate::detect::{self, AudioParser};
use crate::error::Result;
use crate::metadata::MetadataCollector;
use crate::utils::io::{peek_vec, ByteSource};

/// Decode a 28-bit syncsafe integer (7 significant bits per byte)
pub fn decode_syncsafe(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32 & 0x7F) << 21)
        | ((bytes[1] as u32 & 0x7F) << 14)
        | ((bytes[2] as u32 & 0x7F) << 7)
        | (bytes[3] as u32 & 0x7F)
}

/// Undo unsynchronisation: drop the 0x00 inserted after every 0xFF
pub fn remove_unsync(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len());
    let mut after_ff = false;
    for &byte in data {
        if after_ff && byte == 0x00 {
            after_ff = false;
            continue;
        }
        output.push(byte);
        after_ff = byte == 0xFF;
    }
    output
}

/// Entry point for content that starts with an ID3v2 tag.
///
/// Parses the tag(s), then dispatches on whatever signature follows. MPEG
/// audio is assumed when nothing else matches.
#[derive(Default)]
pub struct Id3PrefixedParser;

impl AudioParser for Id3PrefixedParser {
    fn parse(&mut self, source: &mut dyn ByteSource, metadata: &mut MetadataCollector) -> Result<()> {
        v2::parse_leading_tags(source, metadata)?;

        let head = peek_vec(source, detect::SNIFF_LEN)?;
        if head.is_empty() {
            // Bare tag
            return Ok(());
        }
        let loader = match detect::identify_signature(&head) {
            Ok(loader) if loader.format_id != "id3v2" => loader,
            Ok(_) | Err(crate::Error::CouldNotDetermineFileType) => detect::loader("mpeg")?,
            Err(e) => return Err(e),
        };
        log::debug!("content after ID3v2 parsed as {}", loader.format_id);
        if loader.format_id != "mpeg" {
            metadata.add_warning(format!("{} stream is preceded by an ID3v2 tag", loader.format_id));
        }
        (loader.load)().parse(source, metadata)
    }
}

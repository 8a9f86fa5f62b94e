// Vorbis comment block, shared by FLAC and every Ogg codec

use std::io::Cursor;

use crate::error::{Error, Result};
use crate::flac::picture::FlacPicture;
use crate::metadata::{FormatField, MetadataCollector, Picture, TagValue};
use crate::utils::encoding::decode_base64;
use crate::utils::io::{read_le_u32, read_vec};

pub const FORMAT_ID: &str = "vorbis";

/// Vorbis comment structure
#[derive(Debug, Default, PartialEq)]
pub struct VorbisComment {
    pub vendor_string: String,
    pub comments: Vec<(String, String)>,
}

impl VorbisComment {
    /// Parse a comment block (vendor, count, `KEY=value` entries, all
    /// little-endian length-prefixed). Trailing bytes such as the Vorbis
    /// framing bit are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        Self::read(&mut cursor).map_err(|e| match e {
            Error::EndOfStream => Error::field("Vorbis comment block truncated"),
            other => other,
        })
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let vendor_length = read_le_u32(cursor)? as usize;
        let vendor_string = String::from_utf8_lossy(&read_vec(cursor, vendor_length)?).into_owned();

        let comment_count = read_le_u32(cursor)? as usize;
        let mut comments = Vec::with_capacity(comment_count.min(256));
        for _ in 0..comment_count {
            let comment_length = read_le_u32(cursor)? as usize;
            let comment = String::from_utf8_lossy(&read_vec(cursor, comment_length)?).into_owned();

            match comment.split_once('=') {
                Some((field, value)) => comments.push((field.to_string(), value.to_string())),
                None => log::debug!("ignoring Vorbis comment without '=': {:?}", comment),
            }
        }

        Ok(VorbisComment {
            vendor_string,
            comments,
        })
    }

    /// Get a comment value by field name
    pub fn get(&self, field: &str) -> Option<&str> {
        self.comments
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }

    /// Emit every comment as a "vorbis" tag, in block order.
    ///
    /// Base64 pictures (METADATA_BLOCK_PICTURE, COVERART) are decoded into
    /// picture values; the vendor string becomes the encoder tool.
    pub fn add_to(&self, metadata: &mut MetadataCollector) {
        if !self.vendor_string.is_empty() {
            metadata.set_format(FormatField::Tool(self.vendor_string.clone()));
        }
        let cover_mime = self.get("COVERARTMIME").unwrap_or("image/jpeg");

        for (key, value) in &self.comments {
            let tag = if key.eq_ignore_ascii_case("METADATA_BLOCK_PICTURE") {
                decode_block_picture(value)
            } else if key.eq_ignore_ascii_case("COVERART") {
                decode_base64(value)
                    .map(|data| {
                        TagValue::Picture(Picture {
                            format: cover_mime.to_string(),
                            picture_type: None,
                            description: None,
                            data,
                        })
                    })
                    .ok_or_else(|| Error::field("invalid base64 in COVERART"))
            } else {
                Ok(TagValue::Text(value.clone()))
            };

            match tag {
                Ok(value) => metadata.add_tag(FORMAT_ID, key.clone(), value),
                Err(e) => metadata.add_warning(format!("{} {}: {}", FORMAT_ID, key, e)),
            }
        }
    }
}

fn decode_block_picture(value: &str) -> Result<TagValue> {
    let block = decode_base64(value)
        .ok_or_else(|| Error::field("invalid base64 in METADATA_BLOCK_PICTURE"))?;
    let picture = FlacPicture::read_from_data(&block)?;
    Ok(TagValue::Picture(picture.into_picture()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::flac::picture::tests::picture_block;
    use crate::metadata::ParseOptions;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use pretty_assertions::assert_eq;

    /// Serialized comment block body
    pub(crate) fn comment_block(vendor: &str, comments: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        out.extend_from_slice(vendor.as_bytes());
        out.extend_from_slice(&(comments.len() as u32).to_le_bytes());
        for comment in comments {
            out.extend_from_slice(&(comment.len() as u32).to_le_bytes());
            out.extend_from_slice(comment.as_bytes());
        }
        out
    }

    #[test]
    fn test_parse_comment_block() {
        let mut block = comment_block("libFLAC 1.4.3", &["TITLE=Song", "artist=A=B", "broken"]);
        block.push(0x01);
        let comment = VorbisComment::parse(&block).unwrap();
        assert_eq!(comment.vendor_string, "libFLAC 1.4.3");
        assert_eq!(
            comment.comments,
            vec![
                ("TITLE".to_string(), "Song".to_string()),
                ("artist".to_string(), "A=B".to_string()),
            ]
        );
        assert_eq!(comment.get("Title"), Some("Song"));
    }

    #[test]
    fn test_truncated_block() {
        let mut block = comment_block("x", &["TITLE=Song"]);
        block.truncate(block.len() - 3);
        assert!(matches!(VorbisComment::parse(&block), Err(Error::FieldDecoding(_))));
    }

    #[test]
    fn test_pictures_and_tool() {
        let picture = STANDARD.encode(picture_block(3, "image/jpeg", "", &[0xFF, 0xD8]));
        let block_picture = format!("METADATA_BLOCK_PICTURE={}", picture);
        let coverart = format!("COVERART={}", STANDARD.encode([0x89, b'P']));
        let block = comment_block(
            "Lavf",
            &[block_picture.as_str(), "COVERARTMIME=image/png", coverart.as_str(), "METADATA_BLOCK_PICTURE=!!"],
        );

        let mut metadata = MetadataCollector::new(ParseOptions::default());
        VorbisComment::parse(&block).unwrap().add_to(&mut metadata);
        let result = metadata.finalize();

        assert_eq!(result.format.tool.as_deref(), Some("Lavf"));
        assert_eq!(result.common.picture.len(), 2);
        assert_eq!(result.common.picture[0].format, "image/jpeg");
        assert_eq!(result.common.picture[1].format, "image/png");
        assert_eq!(result.common.picture[1].data, vec![0x89, b'P']);
        assert_eq!(result.native_tags(FORMAT_ID).len(), 3);
        assert_eq!(result.warnings.len(), 1);
    }
}

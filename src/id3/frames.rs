// ID3v2 frame headers and payload decoders

use crate::error::{Error, Result};
use crate::id3::{decode_syncsafe, remove_unsync};
use crate::metadata::{Comment, OwnedData, Picture, PictureType, Popularimeter, TagValue};
use crate::utils::encoding::{decode_latin1, decode_text, decode_text_list, split_terminated, TextEncoding};

/// Per-frame status and format flags
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameFlags {
    pub tag_alter_preservation: bool,
    pub file_alter_preservation: bool,
    pub read_only: bool,
    pub grouping_identity: bool,
    pub compression: bool,
    pub encryption: bool,
    pub unsynchronisation: bool,
    pub data_length_indicator: bool,
}

impl FrameFlags {
    /// Decode the two flag bytes; v2.2 frames carry none
    pub fn parse(major: u8, flags: [u8; 2]) -> Self {
        match major {
            3 => FrameFlags {
                tag_alter_preservation: flags[0] & 0x80 != 0,
                file_alter_preservation: flags[0] & 0x40 != 0,
                read_only: flags[0] & 0x20 != 0,
                compression: flags[1] & 0x80 != 0,
                encryption: flags[1] & 0x40 != 0,
                grouping_identity: flags[1] & 0x20 != 0,
                ..Default::default()
            },
            4 => FrameFlags {
                tag_alter_preservation: flags[0] & 0x40 != 0,
                file_alter_preservation: flags[0] & 0x20 != 0,
                read_only: flags[0] & 0x10 != 0,
                grouping_identity: flags[1] & 0x40 != 0,
                compression: flags[1] & 0x08 != 0,
                encryption: flags[1] & 0x04 != 0,
                unsynchronisation: flags[1] & 0x02 != 0,
                data_length_indicator: flags[1] & 0x01 != 0,
            },
            _ => FrameFlags::default(),
        }
    }
}

/// Decoded frame header
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
    pub id: String,
    pub size: u32,
    pub flags: FrameFlags,
}

impl FrameHeader {
    /// Header length for a tag version: 6 bytes in v2.2, 10 afterwards
    pub fn len(major: u8) -> usize {
        if major == 2 {
            6
        } else {
            10
        }
    }

    /// Parse a frame header; `bytes` must hold at least `len(major)` bytes
    pub fn parse(major: u8, bytes: &[u8]) -> Self {
        if major == 2 {
            return FrameHeader {
                id: decode_latin1(&bytes[0..3]),
                size: u32::from_be_bytes([0, bytes[3], bytes[4], bytes[5]]),
                flags: FrameFlags::default(),
            };
        }
        let size_bytes = [bytes[4], bytes[5], bytes[6], bytes[7]];
        let size = if major == 4 {
            decode_syncsafe(size_bytes)
        } else {
            u32::from_be_bytes(size_bytes)
        };
        FrameHeader {
            id: decode_latin1(&bytes[0..4]),
            size,
            flags: FrameFlags::parse(major, [bytes[8], bytes[9]]),
        }
    }

    /// Frame IDs are upper-case letters and digits only
    pub fn has_valid_id(&self) -> bool {
        !self.id.is_empty()
            && self
                .id
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }
}

/// A frame cut out of the tag body, payload still encoded
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub header: FrameHeader,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Strip the per-frame prefixes announced by the flags and undo frame
    /// level unsynchronisation, leaving the bare payload.
    pub fn payload(&self, major: u8, tag_unsync: bool) -> Result<Vec<u8>> {
        let flags = &self.header.flags;
        let mut skip = 0usize;
        match major {
            3 => {
                if flags.compression {
                    skip += 4;
                }
                if flags.encryption {
                    skip += 1;
                }
                if flags.grouping_identity {
                    skip += 1;
                }
            }
            4 => {
                if flags.grouping_identity {
                    skip += 1;
                }
                if flags.encryption {
                    skip += 1;
                }
                if flags.data_length_indicator {
                    skip += 4;
                }
            }
            _ => {}
        }
        let data = self.data.get(skip..).ok_or_else(|| {
            Error::field(format!("frame {} too short for its flag fields", self.header.id))
        })?;
        // v2.3 and earlier unsynchronise the whole tag body instead
        if major == 4 && (flags.unsynchronisation || tag_unsync) {
            Ok(remove_unsync(data))
        } else {
            Ok(data.to_vec())
        }
    }
}

/// Decode a frame payload into one or more native tag values.
///
/// v2.4 text frames can carry several NUL-separated values; each becomes
/// its own tag. Earlier versions hold one value and stop at the first NUL.
/// The returned ids may be qualified, e.g. "TXXX:REPLAYGAIN_TRACK_GAIN".
pub fn decode_frame(major: u8, id: &str, payload: &[u8]) -> Result<Vec<(String, TagValue)>> {
    match id {
        "TXXX" | "TXX" => {
            let (encoding, body) = split_encoding(payload)?;
            let (description, values) = split_terminated(body, encoding);
            let key = format!("{}:{}", id, decode_text(description, encoding));
            Ok(text_values(major, values, encoding)
                .into_iter()
                .map(|value| (key.clone(), TagValue::Text(value)))
                .collect())
        }
        "WXXX" | "WXX" => {
            let (encoding, body) = split_encoding(payload)?;
            let (description, url) = split_terminated(body, encoding);
            let key = format!("{}:{}", id, decode_text(description, encoding));
            Ok(vec![(key, TagValue::Text(latin1_until_nul(url)))])
        }
        "COMM" | "COM" | "USLT" | "ULT" => {
            let comment = decode_comment(payload)?;
            Ok(vec![(id.to_string(), TagValue::Comment(comment))])
        }
        "APIC" => decode_apic(payload).map(|picture| vec![(id.to_string(), TagValue::Picture(picture))]),
        "PIC" => decode_pic(payload).map(|picture| vec![(id.to_string(), TagValue::Picture(picture))]),
        "POPM" | "POP" => {
            let (email, rest) = split_terminated(payload, TextEncoding::Iso8859_1);
            let (&rating, counter) = rest
                .split_first()
                .ok_or_else(|| Error::field(format!("{} frame without rating byte", id)))?;
            let popm = Popularimeter {
                email: decode_latin1(email),
                rating,
                counter: decode_counter(counter),
            };
            Ok(vec![(id.to_string(), TagValue::Popularimeter(popm))])
        }
        "PCNT" | "CNT" => {
            let count = decode_counter(payload)
                .ok_or_else(|| Error::field(format!("{} frame without counter", id)))?;
            Ok(vec![(id.to_string(), TagValue::Number(count))])
        }
        "UFID" | "UFI" | "PRIV" => {
            let (owner, data) = split_terminated(payload, TextEncoding::Iso8859_1);
            let owned = OwnedData {
                owner: decode_latin1(owner),
                data: data.to_vec(),
            };
            Ok(vec![(id.to_string(), TagValue::Owned(owned))])
        }
        _ if id.starts_with('T') => {
            let (encoding, body) = split_encoding(payload)?;
            Ok(text_values(major, body, encoding)
                .into_iter()
                .map(|value| (id.to_string(), TagValue::Text(value)))
                .collect())
        }
        _ if id.starts_with('W') => Ok(vec![(id.to_string(), TagValue::Text(latin1_until_nul(payload)))]),
        _ => Ok(vec![(id.to_string(), TagValue::Binary(payload.to_vec()))]),
    }
}

fn split_encoding(payload: &[u8]) -> Result<(TextEncoding, &[u8])> {
    let (&byte, rest) = payload
        .split_first()
        .ok_or_else(|| Error::field("empty text frame"))?;
    let encoding = TextEncoding::from_byte(byte)
        .ok_or_else(|| Error::field(format!("invalid text encoding {}", byte)))?;
    Ok((encoding, rest))
}

fn text_values(major: u8, data: &[u8], encoding: TextEncoding) -> Vec<String> {
    if major >= 4 {
        decode_text_list(data, encoding)
    } else {
        vec![decode_text(split_terminated(data, encoding).0, encoding)]
    }
}

fn latin1_until_nul(data: &[u8]) -> String {
    decode_latin1(split_terminated(data, TextEncoding::Iso8859_1).0)
}

/// Big-endian counter of arbitrary width; wider than 8 bytes saturates
fn decode_counter(data: &[u8]) -> Option<u64> {
    if data.is_empty() {
        return None;
    }
    if data.len() > 8 {
        return Some(u64::MAX);
    }
    Some(data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// COMM/USLT: encoding, 3-byte language, description, text
fn decode_comment(payload: &[u8]) -> Result<Comment> {
    let (encoding, body) = split_encoding(payload)?;
    if body.len() < 3 {
        return Err(Error::field("comment frame shorter than its language code"));
    }
    let language = decode_latin1(&body[..3]).trim_end_matches('\0').to_string();
    let (description, text) = split_terminated(&body[3..], encoding);
    Ok(Comment {
        language,
        description: decode_text(description, encoding),
        text: decode_text(split_terminated(text, encoding).0, encoding),
    })
}

/// APIC: encoding, MIME type, picture type, description, image data
fn decode_apic(payload: &[u8]) -> Result<Picture> {
    let (encoding, body) = split_encoding(payload)?;
    let (mime, rest) = split_terminated(body, TextEncoding::Iso8859_1);
    let (&picture_type, rest) = rest
        .split_first()
        .ok_or_else(|| Error::field("APIC frame without picture type"))?;
    let (description, data) = split_terminated(rest, encoding);
    Ok(Picture {
        format: image_mime_type(&decode_latin1(mime)),
        picture_type: Some(PictureType::from_u32(picture_type as u32).as_str().to_string()),
        description: Some(decode_text(description, encoding)).filter(|d| !d.is_empty()),
        data: data.to_vec(),
    })
}

/// PIC (v2.2): encoding, 3-character image format, picture type, description, data
fn decode_pic(payload: &[u8]) -> Result<Picture> {
    let (encoding, body) = split_encoding(payload)?;
    if body.len() < 4 {
        return Err(Error::field("PIC frame shorter than its fixed fields"));
    }
    let (description, data) = split_terminated(&body[4..], encoding);
    Ok(Picture {
        format: image_mime_type(&decode_latin1(&body[..3])),
        picture_type: Some(PictureType::from_u32(body[3] as u32).as_str().to_string()),
        description: Some(decode_text(description, encoding)).filter(|d| !d.is_empty()),
        data: data.to_vec(),
    })
}

/// Normalize bare or misspelled image formats to a MIME type
pub fn image_mime_type(format: &str) -> String {
    let lower = format.trim().to_ascii_lowercase();
    match lower.as_str() {
        "jpg" | "jpeg" | "image/jpg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "gif" => "image/gif".to_string(),
        "bmp" => "image/bmp".to_string(),
        "" => "image/".to_string(),
        other if !other.contains('/') => format!("image/{}", other),
        _ => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_frame_flags_by_version() {
        let v3 = FrameFlags::parse(3, [0x80, 0xC0]);
        assert!(v3.tag_alter_preservation);
        assert!(v3.compression);
        assert!(v3.encryption);
        assert!(!v3.unsynchronisation);

        let v4 = FrameFlags::parse(4, [0x40, 0x4B]);
        assert!(v4.tag_alter_preservation);
        assert!(v4.grouping_identity);
        assert!(v4.compression);
        assert!(v4.unsynchronisation);
        assert!(v4.data_length_indicator);
        assert!(!v4.encryption);
    }

    #[test]
    fn test_header_sizes() {
        let v4 = FrameHeader::parse(4, b"TIT2\x00\x00\x02\x01\x00\x00");
        assert_eq!(v4.id, "TIT2");
        assert_eq!(v4.size, 257);

        let v3 = FrameHeader::parse(3, b"TIT2\x00\x00\x02\x01\x00\x00");
        assert_eq!(v3.size, 513);

        let v2 = FrameHeader::parse(2, b"TT2\x00\x01\x00");
        assert_eq!(v2.id, "TT2");
        assert_eq!(v2.size, 256);
        assert!(v2.has_valid_id());

        assert!(!FrameHeader::parse(3, b"ti t\x00\x00\x00\x01\x00\x00").has_valid_id());
    }

    #[test]
    fn test_text_frame_values() {
        let values = decode_frame(4, "TPE1", b"\x03A\x00B\x00").unwrap();
        assert_eq!(
            values,
            vec![
                ("TPE1".to_string(), TagValue::Text("A".into())),
                ("TPE1".to_string(), TagValue::Text("B".into())),
            ]
        );

        let utf16 = decode_frame(4, "TIT2", b"\x01\xFF\xFEH\x00i\x00").unwrap();
        assert_eq!(utf16, vec![("TIT2".to_string(), TagValue::Text("Hi".into()))]);
    }

    #[test]
    fn test_v23_text_is_single_valued() {
        let values = decode_frame(3, "TPE1", b"\x00A\x00B\x00").unwrap();
        assert_eq!(values, vec![("TPE1".to_string(), TagValue::Text("A".into()))]);

        let txxx = decode_frame(3, "TXXX", b"\x00MOOD\x00calm\x00dark").unwrap();
        assert_eq!(txxx, vec![("TXXX:MOOD".to_string(), TagValue::Text("calm".into()))]);
    }

    #[test]
    fn test_invalid_encoding_is_field_error() {
        assert!(matches!(decode_frame(4, "TIT2", b"\x07abc"), Err(Error::FieldDecoding(_))));
    }

    #[test]
    fn test_txxx_and_comment() {
        let txxx = decode_frame(4, "TXXX", b"\x00MOOD\x00calm").unwrap();
        assert_eq!(txxx, vec![("TXXX:MOOD".to_string(), TagValue::Text("calm".into()))]);

        let comm = decode_frame(4, "COMM", b"\x00engdesc\x00Nice").unwrap();
        assert_eq!(
            comm,
            vec![(
                "COMM".to_string(),
                TagValue::Comment(Comment {
                    language: "eng".into(),
                    description: "desc".into(),
                    text: "Nice".into(),
                })
            )]
        );
    }

    #[test]
    fn test_pictures() {
        let apic = decode_frame(4, "APIC", b"\x00image/jpg\x00\x03cover\x00\xFF\xD8").unwrap();
        let TagValue::Picture(picture) = &apic[0].1 else {
            panic!("expected a picture");
        };
        assert_eq!(picture.format, "image/jpeg");
        assert_eq!(picture.picture_type.as_deref(), Some("Cover (front)"));
        assert_eq!(picture.description.as_deref(), Some("cover"));
        assert_eq!(picture.data, vec![0xFF, 0xD8]);

        let pic = decode_frame(2, "PIC", b"\x00PNG\x04\x00\x89P").unwrap();
        let TagValue::Picture(picture) = &pic[0].1 else {
            panic!("expected a picture");
        };
        assert_eq!(picture.format, "image/png");
        assert_eq!(picture.description, None);
        assert_eq!(picture.data, b"\x89P".to_vec());
    }

    #[test]
    fn test_popularimeter_and_counter() {
        let popm = decode_frame(4, "POPM", b"a@b.c\x00\xC4\x00\x00\x01\x00").unwrap();
        assert_eq!(
            popm[0].1,
            TagValue::Popularimeter(Popularimeter {
                email: "a@b.c".into(),
                rating: 196,
                counter: Some(256),
            })
        );
        assert_eq!(decode_frame(4, "PCNT", b"\x00\x00\x00\x07").unwrap()[0].1, TagValue::Number(7));
    }

    #[test]
    fn test_payload_prefixes() {
        let frame = RawFrame {
            header: FrameHeader {
                id: "TIT2".into(),
                size: 8,
                flags: FrameFlags {
                    unsynchronisation: true,
                    data_length_indicator: true,
                    ..Default::default()
                },
            },
            data: b"\x00\x00\x00\x03\x00\xFF\x00\xE0".to_vec(),
        };
        assert_eq!(frame.payload(4, false).unwrap(), vec![0x00, 0xFF, 0xE0]);
    }
}

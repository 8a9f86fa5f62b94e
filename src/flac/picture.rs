// FLAC PICTURE block implementation
//
// Also the payload of the base64 METADATA_BLOCK_PICTURE Vorbis comment.

use std::io::Cursor;

use crate::error::{Error, Result};
use crate::metadata::{Picture, PictureType};
use crate::utils::io::{read_be_u32, read_vec};

/// FLAC PICTURE block structure
#[derive(Debug, Clone, PartialEq)]
pub struct FlacPicture {
    pub picture_type: PictureType,
    pub mime_type: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub colors: u32,
    pub data: Vec<u8>,
}

impl FlacPicture {
    /// Read FLAC PICTURE block from data
    pub fn read_from_data(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        Self::read(&mut cursor).map_err(|e| match e {
            Error::EndOfStream => Error::field("picture block truncated"),
            other => other,
        })
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let picture_type = PictureType::from_u32(read_be_u32(cursor)?);

        let mime_length = read_be_u32(cursor)? as usize;
        let mime_type = String::from_utf8_lossy(&read_vec(cursor, mime_length)?).into_owned();

        let desc_length = read_be_u32(cursor)? as usize;
        let description = String::from_utf8_lossy(&read_vec(cursor, desc_length)?).into_owned();

        let width = read_be_u32(cursor)?;
        let height = read_be_u32(cursor)?;
        let depth = read_be_u32(cursor)?;
        let colors = read_be_u32(cursor)?;

        let data_length = read_be_u32(cursor)? as usize;
        let data = read_vec(cursor, data_length)?;

        Ok(FlacPicture {
            picture_type,
            mime_type,
            description,
            width,
            height,
            depth,
            colors,
            data,
        })
    }

    /// Convert into the format-independent picture shape
    pub fn into_picture(self) -> Picture {
        Picture {
            format: crate::id3::frames::image_mime_type(&self.mime_type),
            picture_type: Some(self.picture_type.as_str().to_string()),
            description: Some(self.description).filter(|d| !d.is_empty()),
            data: self.data,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Serialized PICTURE block body
    pub(crate) fn picture_block(picture_type: u32, mime: &str, description: &str, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&picture_type.to_be_bytes());
        out.extend_from_slice(&(mime.len() as u32).to_be_bytes());
        out.extend_from_slice(mime.as_bytes());
        out.extend_from_slice(&(description.len() as u32).to_be_bytes());
        out.extend_from_slice(description.as_bytes());
        for dimension in [300u32, 300, 24, 0] {
            out.extend_from_slice(&dimension.to_be_bytes());
        }
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_read_picture_block() {
        let block = picture_block(3, "image/png", "front", &[0x89, b'P', b'N', b'G']);
        let picture = FlacPicture::read_from_data(&block).unwrap();
        assert_eq!(picture.picture_type, PictureType::CoverFront);
        assert_eq!(picture.width, 300);
        assert_eq!(picture.depth, 24);

        assert_eq!(
            picture.into_picture(),
            Picture {
                format: "image/png".into(),
                picture_type: Some("Cover (front)".into()),
                description: Some("front".into()),
                data: vec![0x89, b'P', b'N', b'G'],
            }
        );
    }

    #[test]
    fn test_truncated_block_is_field_error() {
        let mut block = picture_block(3, "image/jpeg", "", &[1, 2, 3, 4]);
        block.truncate(block.len() - 2);
        assert!(matches!(
            FlacPicture::read_from_data(&block),
            Err(Error::FieldDecoding(_))
        ));
    }
}

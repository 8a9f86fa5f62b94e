// ID3v2 tag implementation

use crate::error::{Error, Result};
use crate::id3::frames::{self, FrameHeader, RawFrame};
use crate::id3::{decode_syncsafe, remove_unsync};
use crate::metadata::{MetadataCollector, TagValue};
use crate::utils::io::{peek_vec, read_array, read_up_to, ByteSource};

pub const HEADER_SIZE: usize = 10;
pub const ID3_MAGIC: &[u8; 3] = b"ID3";
const FOOTER_MAGIC: &[u8; 3] = b"3DI";

/// Tag-level flags from header byte 5
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeaderFlags {
    pub unsynchronisation: bool,
    /// v2.3 and v2.4 only
    pub extended_header: bool,
    /// v2.3 and v2.4 only
    pub experimental: bool,
    /// v2.4 only
    pub footer: bool,
}

/// ID3v2 header structure
#[derive(Debug, Clone, PartialEq)]
pub struct Id3v2Header {
    pub major: u8,
    pub revision: u8,
    pub flags: HeaderFlags,
    /// Body size, excluding this header and any footer
    pub size: u32,
}

impl Id3v2Header {
    /// Parse the fixed 10-byte header
    pub fn parse(buffer: &[u8; HEADER_SIZE]) -> Result<Self> {
        if &buffer[0..3] != ID3_MAGIC {
            return Err(Error::content("id3v2", "missing ID3 identifier"));
        }
        let major = buffer[3];
        if !(2..=4).contains(&major) {
            return Err(Error::content(
                "id3v2",
                format!("unsupported ID3v2 major version {}", major),
            ));
        }

        let raw = buffer[5];
        let flags = HeaderFlags {
            unsynchronisation: raw & 0x80 != 0,
            extended_header: major >= 3 && raw & 0x40 != 0,
            experimental: major >= 3 && raw & 0x20 != 0,
            footer: major == 4 && raw & 0x10 != 0,
        };

        Ok(Id3v2Header {
            major,
            revision: buffer[4],
            flags,
            size: decode_syncsafe([buffer[6], buffer[7], buffer[8], buffer[9]]),
        })
    }

    /// Native tag format of this version
    pub fn format_id(&self) -> &'static str {
        match self.major {
            2 => "id3v2.2",
            3 => "id3v2.3",
            _ => "id3v2.4",
        }
    }
}

/// Outcome of walking the frame sequence of one tag body
#[derive(Debug, Default)]
pub struct FrameScan {
    pub frames: Vec<RawFrame>,
    /// The loop ended before the body did (padding or an invalid frame)
    pub stopped_early: bool,
    pub warnings: Vec<String>,
}

/// Cut a tag body into frames.
///
/// Never fails: anomalies end the loop and are reported in `warnings`.
pub fn scan_frames(major: u8, body: &[u8]) -> FrameScan {
    let header_len = FrameHeader::len(major);
    let mut scan = FrameScan::default();
    let mut offset = 0;

    while offset < body.len() {
        let rest = &body[offset..];
        if rest[0] == 0 {
            // Padding
            scan.stopped_early = true;
            break;
        }
        if rest.len() < header_len {
            scan.warnings.push(format!(
                "ID3v2.{} frame header truncated at offset {}",
                major, offset
            ));
            scan.stopped_early = true;
            break;
        }

        let header = FrameHeader::parse(major, rest);
        if !header.has_valid_id() {
            scan.warnings.push(format!(
                "invalid ID3v2.{} frame-header ID {:?}, ignoring the remaining {} bytes",
                major,
                header.id,
                rest.len()
            ));
            scan.stopped_early = true;
            break;
        }

        let available = rest.len() - header_len;
        let mut size = header.size as usize;
        if size > available {
            scan.warnings.push(format!(
                "ID3v2.{} frame {} truncated: {} bytes declared, {} remain",
                major, header.id, size, available
            ));
            size = available;
        }
        log::trace!("ID3v2.{} frame {} ({} bytes)", major, header.id, size);
        scan.frames.push(RawFrame {
            data: rest[header_len..header_len + size].to_vec(),
            header,
        });
        offset += header_len + size;
    }
    scan
}

/// Offset of the first frame, past any extended header
fn frames_offset(header: &Id3v2Header, body: &[u8]) -> std::result::Result<usize, String> {
    if !header.flags.extended_header {
        return Ok(0);
    }
    let Some(size_bytes) = body.get(0..4) else {
        return Err("extended header truncated".to_string());
    };
    let size_bytes = [size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]];
    let end = if header.major == 3 {
        // v2.3 size excludes the size field itself
        4 + u32::from_be_bytes(size_bytes) as usize
    } else {
        decode_syncsafe(size_bytes) as usize
    };
    if end > body.len() {
        return Err(format!(
            "extended header of {} bytes exceeds the {}-byte tag body",
            end,
            body.len()
        ));
    }
    Ok(end)
}

/// Read one complete ID3v2 tag from the source
pub fn read_tag(source: &mut dyn ByteSource, metadata: &mut MetadataCollector) -> Result<()> {
    let buffer = read_array::<HEADER_SIZE, _>(source)?;
    let header = Id3v2Header::parse(&buffer)?;
    let format_id = header.format_id();
    log::debug!(
        "{} tag: {} bytes, flags {:?}",
        format_id,
        header.size,
        header.flags
    );

    let mut body = read_up_to(source, header.size as usize)?;
    if body.len() < header.size as usize {
        metadata.add_warning(format!(
            "{} tag truncated: {} bytes declared, stream ended after {}",
            format_id,
            header.size,
            body.len()
        ));
    }
    if header.flags.footer {
        let footer = read_up_to(source, HEADER_SIZE)?;
        if !footer.starts_with(FOOTER_MAGIC) {
            metadata.add_warning(format!("{} footer missing", format_id));
        }
    }
    if header.major < 4 && header.flags.unsynchronisation {
        body = remove_unsync(&body);
    }

    let start = match frames_offset(&header, &body) {
        Ok(start) => start,
        Err(warning) => {
            metadata.add_warning(format!("{}: {}", format_id, warning));
            return Ok(());
        }
    };

    let scan = scan_frames(header.major, &body[start..]);
    for frame in &scan.frames {
        add_frame(&header, frame, metadata);
    }
    for warning in scan.warnings {
        metadata.add_warning(warning);
    }
    Ok(())
}

fn add_frame(header: &Id3v2Header, frame: &RawFrame, metadata: &mut MetadataCollector) {
    let format_id = header.format_id();
    let id = &frame.header.id;
    let flags = &frame.header.flags;

    if flags.compression || flags.encryption {
        let reason = if flags.encryption { "encrypted" } else { "compressed" };
        metadata.add_warning(format!("{} {}: {} frame skipped", format_id, id, reason));
        metadata.add_tag(format_id, id.clone(), TagValue::Discarded);
        return;
    }

    let decoded = frame
        .payload(header.major, header.flags.unsynchronisation)
        .and_then(|payload| frames::decode_frame(header.major, id, &payload));
    match decoded {
        Ok(tags) => {
            for (key, value) in tags {
                metadata.add_tag(format_id, key, value);
            }
        }
        Err(e) => metadata.add_warning(format!("{} {}: {}", format_id, id, e)),
    }
}

/// Parse every ID3v2 tag at the current position (tags may be stacked).
/// Returns how many were read.
pub fn parse_leading_tags(source: &mut dyn ByteSource, metadata: &mut MetadataCollector) -> Result<usize> {
    let mut count = 0;
    while peek_vec(source, ID3_MAGIC.len())?.starts_with(ID3_MAGIC) {
        read_tag(source, metadata)?;
        count += 1;
    }
    Ok(count)
}

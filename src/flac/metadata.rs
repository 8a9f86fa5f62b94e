// FLAC metadata block implementation

use crate::error::{Error, Result};
use crate::flac::picture::FlacPicture;
use crate::flac::vorbis::{self, VorbisComment};
use crate::metadata::{FormatField, MetadataCollector, TagValue};
use crate::utils::io::read_array;

/// FLAC file signature
pub const FLAC_SIGNATURE: &[u8; 4] = b"fLaC";

/// FLAC metadata block types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlacMetadataBlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    Reserved(u8),
    Invalid,
}

impl FlacMetadataBlockType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => FlacMetadataBlockType::StreamInfo,
            1 => FlacMetadataBlockType::Padding,
            2 => FlacMetadataBlockType::Application,
            3 => FlacMetadataBlockType::SeekTable,
            4 => FlacMetadataBlockType::VorbisComment,
            5 => FlacMetadataBlockType::CueSheet,
            6 => FlacMetadataBlockType::Picture,
            127 => FlacMetadataBlockType::Invalid,
            other => FlacMetadataBlockType::Reserved(other),
        }
    }
}

/// FLAC metadata block header
#[derive(Debug, Clone, PartialEq)]
pub struct FlacMetadataBlockHeader {
    pub is_last: bool,
    pub block_type: FlacMetadataBlockType,
    pub length: u32,
}

impl FlacMetadataBlockHeader {
    pub const HEADER_SIZE: usize = 4;

    pub fn parse(buffer: [u8; Self::HEADER_SIZE]) -> Self {
        FlacMetadataBlockHeader {
            is_last: (buffer[0] & 0x80) != 0,
            block_type: FlacMetadataBlockType::from_byte(buffer[0] & 0x7F),
            // Length is big-endian 24-bit
            length: u32::from_be_bytes([0, buffer[1], buffer[2], buffer[3]]),
        }
    }

    /// Read FLAC metadata block header from reader
    pub fn read<R: std::io::Read + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self::parse(read_array(reader)?))
    }
}

/// Decoded STREAMINFO block
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    /// 0 when unknown
    pub total_samples: u64,
    pub md5: [u8; 16],
}

impl StreamInfo {
    pub const SIZE: usize = 34;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::content(
                "flac",
                format!("STREAMINFO block is {} bytes, expected {}", data.len(), Self::SIZE),
            ));
        }
        let be24 = |b: &[u8]| u32::from_be_bytes([0, b[0], b[1], b[2]]);

        // 20 bits sample rate, 3 bits channels-1, 5 bits bps-1, 36 bits samples
        let sample_rate = ((data[10] as u32) << 12) | ((data[11] as u32) << 4) | ((data[12] as u32) >> 4);
        if sample_rate == 0 {
            return Err(Error::content("flac", "STREAMINFO sample rate is 0"));
        }
        let channels = ((data[12] >> 1) & 0x07) + 1;
        let bits_per_sample = (((data[12] & 0x01) << 4) | (data[13] >> 4)) + 1;
        let total_samples = ((data[13] as u64 & 0x0F) << 32)
            | u32::from_be_bytes([data[14], data[15], data[16], data[17]]) as u64;

        let mut md5 = [0u8; 16];
        md5.copy_from_slice(&data[18..34]);

        Ok(StreamInfo {
            min_block_size: u16::from_be_bytes([data[0], data[1]]),
            max_block_size: u16::from_be_bytes([data[2], data[3]]),
            min_frame_size: be24(&data[4..7]),
            max_frame_size: be24(&data[7..10]),
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
            md5,
        })
    }

    /// Record the stream parameters
    pub fn apply(&self, metadata: &mut MetadataCollector) {
        metadata.set_format(FormatField::Codec("FLAC".into()));
        metadata.set_format(FormatField::Lossless(true));
        metadata.set_format(FormatField::HasAudio(true));
        metadata.set_format(FormatField::SampleRate(self.sample_rate));
        metadata.set_format(FormatField::NumberOfChannels(self.channels as u16));
        metadata.set_format(FormatField::BitsPerSample(self.bits_per_sample));
        if self.total_samples > 0 {
            metadata.set_format(FormatField::NumberOfSamples(self.total_samples));
            metadata.set_format(FormatField::Duration(
                self.total_samples as f64 / self.sample_rate as f64,
            ));
        }
    }
}

/// Handle one metadata block body; shared by native FLAC and Ogg FLAC.
///
/// A bad STREAMINFO is fatal; undecodable comment or picture blocks become
/// warnings.
pub fn handle_block(
    header: &FlacMetadataBlockHeader,
    data: &[u8],
    metadata: &mut MetadataCollector,
) -> Result<()> {
    log::trace!("FLAC block {:?} ({} bytes)", header.block_type, header.length);
    match header.block_type {
        FlacMetadataBlockType::StreamInfo => StreamInfo::parse(data)?.apply(metadata),
        FlacMetadataBlockType::VorbisComment => match VorbisComment::parse(data) {
            Ok(comment) => comment.add_to(metadata),
            Err(e) => metadata.add_warning(format!("FLAC comment block: {}", e)),
        },
        FlacMetadataBlockType::Picture => match FlacPicture::read_from_data(data) {
            Ok(picture) => metadata.add_tag(
                vorbis::FORMAT_ID,
                "METADATA_BLOCK_PICTURE",
                TagValue::Picture(picture.into_picture()),
            ),
            Err(e) => metadata.add_warning(format!("FLAC picture block: {}", e)),
        },
        FlacMetadataBlockType::Invalid => {
            return Err(Error::content("flac", "invalid metadata block type 127"));
        }
        _ => {}
    }
    Ok(())
}

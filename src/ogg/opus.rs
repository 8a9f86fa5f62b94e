// OPUS page consumer
//
// OPUS File Structure:
// - Identification header: "OpusHead" (8 bytes) in first page
// - Comment header: "OpusTags" (8 bytes) followed by Vorbis Comment
// - Audio packets
//
// Reference:
// - RFC 7845: Ogg Encapsulation for the Opus Audio Codec

use crate::error::{Error, Result};
use crate::flac::vorbis::VorbisComment;
use crate::metadata::{FormatField, MetadataCollector};
use crate::ogg::{PageConsumer, PageHeader};

pub const OPUS_SIGNATURE: &[u8; 8] = b"OpusHead";
pub const OPUS_TAGS: &[u8; 8] = b"OpusTags";

/// Opus always decodes at 48 kHz; granule positions count 48 kHz samples
pub const OPUS_SAMPLE_RATE: u32 = 48_000;

pub fn detect(packet: &[u8]) -> Option<Box<dyn PageConsumer>> {
    if packet.starts_with(OPUS_SIGNATURE) {
        Some(Box::new(OpusConsumer::default()))
    } else {
        None
    }
}

/// OpusHead identification header
#[derive(Debug, Clone, PartialEq)]
pub struct OpusHead {
    pub version: u8,
    pub channels: u8,
    pub pre_skip: u16,
    pub input_sample_rate: u32,
    pub output_gain: i16,
    pub channel_mapping_family: u8,
}

impl OpusHead {
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < 19 {
            return Err(Error::content("ogg", "OpusHead packet too short"));
        }
        let head = OpusHead {
            version: packet[8],
            channels: packet[9],
            pre_skip: u16::from_le_bytes([packet[10], packet[11]]),
            input_sample_rate: u32::from_le_bytes([packet[12], packet[13], packet[14], packet[15]]),
            output_gain: i16::from_le_bytes([packet[16], packet[17]]),
            channel_mapping_family: packet[18],
        };
        // Upper nibble is the incompatible major version
        if head.version >> 4 != 0 {
            return Err(Error::content(
                "ogg",
                format!("unsupported Opus version {}", head.version),
            ));
        }
        Ok(head)
    }
}

#[derive(Debug, Default)]
pub struct OpusConsumer {
    head: Option<OpusHead>,
    last_granule: Option<u64>,
    audio_bytes: u64,
}

impl PageConsumer for OpusConsumer {
    fn parse_page(&mut self, header: &PageHeader, packets: &[Vec<u8>], metadata: &mut MetadataCollector) -> Result<()> {
        if let Some(granule) = header.granule() {
            self.last_granule = Some(granule);
        }
        for packet in packets {
            if packet.starts_with(OPUS_SIGNATURE) {
                let head = OpusHead::parse(packet)?;
                metadata.set_format(FormatField::Codec("Opus".into()));
                metadata.set_format(FormatField::HasAudio(true));
                metadata.set_format(FormatField::SampleRate(OPUS_SAMPLE_RATE));
                metadata.set_format(FormatField::NumberOfChannels(head.channels as u16));
                self.head = Some(head);
            } else if packet.starts_with(OPUS_TAGS) {
                VorbisComment::parse(&packet[OPUS_TAGS.len()..])?.add_to(metadata);
            } else {
                self.audio_bytes += packet.len() as u64;
            }
        }
        Ok(())
    }

    fn calculate_duration(&mut self, _end_of_stream: bool, metadata: &mut MetadataCollector) {
        let (Some(head), Some(granule)) = (&self.head, self.last_granule) else {
            return;
        };
        let samples = granule.saturating_sub(head.pre_skip as u64);
        let duration = samples as f64 / OPUS_SAMPLE_RATE as f64;
        metadata.set_format(FormatField::NumberOfSamples(samples));
        metadata.set_format(FormatField::Duration(duration));
        if duration > 0.0 {
            metadata.set_format(FormatField::Bitrate(self.audio_bytes as f64 * 8.0 / duration));
        }
    }
}

// Speex page consumer
//
// First packet is the 80-byte Speex header, the second a Vorbis Comment
// without framing bit.

use crate::error::{Error, Result};
use crate::flac::vorbis::VorbisComment;
use crate::metadata::{FormatField, MetadataCollector};
use crate::ogg::{PageConsumer, PageHeader};
use crate::utils::encoding::decode_latin1;

pub const SPEEX_SIGNATURE: &[u8; 8] = b"Speex   ";
const MIN_HEADER_SIZE: usize = 68;

pub fn detect(packet: &[u8]) -> Option<Box<dyn PageConsumer>> {
    if packet.starts_with(SPEEX_SIGNATURE) {
        Some(Box::new(SpeexConsumer::default()))
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeexHeader {
    pub version: String,
    pub sample_rate: u32,
    pub mode: i32,
    pub channels: u16,
    /// -1 when unknown
    pub bitrate: i32,
}

impl SpeexHeader {
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < MIN_HEADER_SIZE {
            return Err(Error::content("ogg", "Speex header too short"));
        }
        let le32 = |at: usize| i32::from_le_bytes([packet[at], packet[at + 1], packet[at + 2], packet[at + 3]]);
        let version = decode_latin1(&packet[8..28]);
        Ok(SpeexHeader {
            version: version.trim_end_matches('\0').trim().to_string(),
            sample_rate: le32(36).max(0) as u32,
            mode: le32(40),
            channels: le32(48).clamp(0, u16::MAX as i32) as u16,
            bitrate: le32(52),
        })
    }
}

#[derive(Debug, Default)]
pub struct SpeexConsumer {
    header: Option<SpeexHeader>,
    packets_seen: u64,
    last_granule: Option<u64>,
}

impl PageConsumer for SpeexConsumer {
    fn parse_page(&mut self, header: &PageHeader, packets: &[Vec<u8>], metadata: &mut MetadataCollector) -> Result<()> {
        if let Some(granule) = header.granule() {
            self.last_granule = Some(granule);
        }
        for packet in packets {
            self.packets_seen += 1;
            match self.packets_seen {
                1 => {
                    let speex = SpeexHeader::parse(packet)?;
                    metadata.set_format(FormatField::Codec("Speex".into()));
                    metadata.set_format(FormatField::Tool(format!("Speex {}", speex.version)));
                    metadata.set_format(FormatField::HasAudio(true));
                    metadata.set_format(FormatField::SampleRate(speex.sample_rate));
                    metadata.set_format(FormatField::NumberOfChannels(speex.channels));
                    if speex.bitrate > 0 {
                        metadata.set_format(FormatField::Bitrate(speex.bitrate as f64));
                    }
                    self.header = Some(speex);
                }
                2 => VorbisComment::parse(packet)?.add_to(metadata),
                _ => {}
            }
        }
        Ok(())
    }

    fn calculate_duration(&mut self, _end_of_stream: bool, metadata: &mut MetadataCollector) {
        let (Some(speex), Some(granule)) = (&self.header, self.last_granule) else {
            return;
        };
        if speex.sample_rate == 0 {
            return;
        }
        metadata.set_format(FormatField::NumberOfSamples(granule));
        metadata.set_format(FormatField::Duration(granule as f64 / speex.sample_rate as f64));
    }
}

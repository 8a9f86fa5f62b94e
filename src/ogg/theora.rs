// Theora page consumer
//
// Header packets start with a type byte (0x80 identification, 0x81 comment,
// 0x82 setup) followed by "theora". The granule position packs the last
// keyframe number and the frames since it.

use crate::error::{Error, Result};
use crate::flac::vorbis::VorbisComment;
use crate::metadata::{FormatField, MetadataCollector};
use crate::ogg::{PageConsumer, PageHeader};

const THEORA_MAGIC: &[u8; 6] = b"theora";
const ID_HEADER_SIZE: usize = 42;

pub fn detect(packet: &[u8]) -> Option<Box<dyn PageConsumer>> {
    if header_packet_type(packet) == Some(0x80) {
        Some(Box::new(TheoraConsumer::default()))
    } else {
        None
    }
}

fn header_packet_type(packet: &[u8]) -> Option<u8> {
    match packet {
        [kind, rest @ ..] if kind & 0x80 != 0 && rest.starts_with(THEORA_MAGIC) => Some(*kind),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TheoraIdHeader {
    pub frame_rate_numerator: u32,
    pub frame_rate_denominator: u32,
    pub nominal_bitrate: u32,
    pub keyframe_granule_shift: u8,
}

impl TheoraIdHeader {
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < ID_HEADER_SIZE {
            return Err(Error::content("ogg", "Theora identification header too short"));
        }
        let be32 = |at: usize| u32::from_be_bytes([packet[at], packet[at + 1], packet[at + 2], packet[at + 3]]);
        Ok(TheoraIdHeader {
            frame_rate_numerator: be32(22),
            frame_rate_denominator: be32(26),
            nominal_bitrate: u32::from_be_bytes([0, packet[37], packet[38], packet[39]]),
            keyframe_granule_shift: ((packet[40] & 0x03) << 3) | (packet[41] >> 5),
        })
    }

    /// Frame count encoded in a granule position
    pub fn frames(&self, granule: u64) -> u64 {
        let shift = self.keyframe_granule_shift as u32;
        if shift >= 64 {
            return granule;
        }
        let mask = (1u64 << shift) - 1;
        (granule >> shift) + (granule & mask)
    }
}

#[derive(Debug, Default)]
pub struct TheoraConsumer {
    id: Option<TheoraIdHeader>,
    last_granule: Option<u64>,
}

impl PageConsumer for TheoraConsumer {
    fn parse_page(&mut self, header: &PageHeader, packets: &[Vec<u8>], metadata: &mut MetadataCollector) -> Result<()> {
        if let Some(granule) = header.granule() {
            self.last_granule = Some(granule);
        }
        for packet in packets {
            match header_packet_type(packet) {
                Some(0x80) => {
                    self.id = Some(TheoraIdHeader::parse(packet)?);
                    metadata.set_format(FormatField::HasVideo(true));
                }
                Some(0x81) => VorbisComment::parse(&packet[7..])?.add_to(metadata),
                _ => {}
            }
        }
        Ok(())
    }

    fn calculate_duration(&mut self, _end_of_stream: bool, metadata: &mut MetadataCollector) {
        let (Some(id), Some(granule)) = (&self.id, self.last_granule) else {
            return;
        };
        if metadata.format().bitrate.is_none() && id.nominal_bitrate > 0 {
            metadata.set_format(FormatField::Bitrate(id.nominal_bitrate as f64));
        }
        // An audio stream in the same file knows better
        if metadata.format().duration.is_some() || id.frame_rate_numerator == 0 {
            return;
        }
        let seconds = id.frames(granule) as f64 * id.frame_rate_denominator as f64 / id.frame_rate_numerator as f64;
        metadata.set_format(FormatField::Duration(seconds));
    }
}

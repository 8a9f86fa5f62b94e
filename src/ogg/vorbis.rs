// OGG Vorbis page consumer
//
// Vorbis Structure:
// 1. Identification Header ("\x01vorbis")
// 2. Comment Header ("\x03vorbis") - Contains Vorbis Comment
// 3. Setup Header ("\x05vorbis")
// 4. Audio packets

use crate::error::{Error, Result};
use crate::flac::vorbis::VorbisComment;
use crate::metadata::{FormatField, MetadataCollector};
use crate::ogg::{PageConsumer, PageHeader};

const VORBIS_MAGIC: &[u8; 6] = b"vorbis";
const ID_HEADER_SIZE: usize = 30;

pub fn detect(packet: &[u8]) -> Option<Box<dyn PageConsumer>> {
    if header_packet_type(packet) == Some(1) {
        Some(Box::new(VorbisConsumer::default()))
    } else {
        None
    }
}

/// Type byte of a Vorbis header packet
fn header_packet_type(packet: &[u8]) -> Option<u8> {
    match packet {
        [kind, rest @ ..] if kind & 0x01 == 1 && rest.starts_with(VORBIS_MAGIC) => Some(*kind),
        _ => None,
    }
}

/// Vorbis identification header
#[derive(Debug, Clone, PartialEq)]
pub struct VorbisIdHeader {
    pub version: u32,
    pub channels: u8,
    pub sample_rate: u32,
    pub bitrate_max: i32,
    pub bitrate_nominal: i32,
    pub bitrate_min: i32,
}

impl VorbisIdHeader {
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < ID_HEADER_SIZE {
            return Err(Error::content("ogg", "Vorbis identification header too short"));
        }
        let le32 = |at: usize| u32::from_le_bytes([packet[at], packet[at + 1], packet[at + 2], packet[at + 3]]);
        let header = VorbisIdHeader {
            version: le32(7),
            channels: packet[11],
            sample_rate: le32(12),
            bitrate_max: le32(16) as i32,
            bitrate_nominal: le32(20) as i32,
            bitrate_min: le32(24) as i32,
        };
        if header.version != 0 {
            return Err(Error::content(
                "ogg",
                format!("unsupported Vorbis version {}", header.version),
            ));
        }
        Ok(header)
    }

    fn apply(&self, metadata: &mut MetadataCollector) {
        metadata.set_format(FormatField::Codec("Vorbis I".into()));
        metadata.set_format(FormatField::HasAudio(true));
        metadata.set_format(FormatField::SampleRate(self.sample_rate));
        metadata.set_format(FormatField::NumberOfChannels(self.channels as u16));
        if self.bitrate_nominal > 0 {
            metadata.set_format(FormatField::Bitrate(self.bitrate_nominal as f64));
        }
    }
}

#[derive(Debug, Default)]
pub struct VorbisConsumer {
    id: Option<VorbisIdHeader>,
    last_granule: Option<u64>,
    audio_bytes: u64,
}

impl PageConsumer for VorbisConsumer {
    fn parse_page(&mut self, header: &PageHeader, packets: &[Vec<u8>], metadata: &mut MetadataCollector) -> Result<()> {
        if let Some(granule) = header.granule() {
            self.last_granule = Some(granule);
        }
        for packet in packets {
            match header_packet_type(packet) {
                Some(1) => {
                    let id = VorbisIdHeader::parse(packet)?;
                    id.apply(metadata);
                    self.id = Some(id);
                }
                Some(3) => VorbisComment::parse(&packet[7..])?.add_to(metadata),
                // Setup header: codebooks only
                Some(_) => {}
                None => self.audio_bytes += packet.len() as u64,
            }
        }
        Ok(())
    }

    fn calculate_duration(&mut self, _end_of_stream: bool, metadata: &mut MetadataCollector) {
        let (Some(id), Some(granule)) = (&self.id, self.last_granule) else {
            return;
        };
        if id.sample_rate == 0 {
            return;
        }
        let duration = granule as f64 / id.sample_rate as f64;
        metadata.set_format(FormatField::NumberOfSamples(granule));
        metadata.set_format(FormatField::Duration(duration));
        if id.bitrate_nominal <= 0 && duration > 0.0 {
            metadata.set_format(FormatField::Bitrate(self.audio_bytes as f64 * 8.0 / duration));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Identification header packet
    pub(crate) fn id_header(channels: u8, sample_rate: u32, nominal: i32) -> Vec<u8> {
        let mut out = vec![0x01];
        out.extend_from_slice(VORBIS_MAGIC);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.push(channels);
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&nominal.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.push(0xB8);
        out.push(0x01);
        out
    }

    /// Comment header packet (with framing bit)
    pub(crate) fn comment_header(comments: &[&str]) -> Vec<u8> {
        let mut out = vec![0x03];
        out.extend_from_slice(VORBIS_MAGIC);
        out.extend(crate::flac::vorbis::tests::comment_block("Xiph.Org libVorbis I 20200704", comments));
        out.push(0x01);
        out
    }

    #[test]
    fn test_detect() {
        assert!(detect(&id_header(2, 44100, 128000)).is_some());
        assert!(detect(&comment_header(&[])).is_none());
        assert!(detect(b"\x01vorbi").is_none());
        assert!(detect(b"OpusHead").is_none());
    }

    #[test]
    fn test_id_header() {
        let id = VorbisIdHeader::parse(&id_header(2, 44100, 128000)).unwrap();
        assert_eq!(id.channels, 2);
        assert_eq!(id.sample_rate, 44100);
        assert_eq!(id.bitrate_nominal, 128000);
        assert!(VorbisIdHeader::parse(&id_header(2, 44100, 0)[..20]).is_err());
    }
}

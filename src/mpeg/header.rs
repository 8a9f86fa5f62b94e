// MPEG audio frame header and Xing/Info/VBRI headers
//
// Frame header (32 bits):
// AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
// A: frame sync, B: version, C: layer, D: protection bit,
// E: bitrate index, F: sample rate index, G: padding, H: private,
// I: channel mode, J: mode extension, K: copyright, L: original, M: emphasis

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    V1,
    V2,
    V2_5,
}

impl MpegVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            MpegVersion::V1 => "1",
            MpegVersion::V2 => "2",
            MpegVersion::V2_5 => "2.5",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Layer1,
    Layer2,
    Layer3,
}

impl Layer {
    pub fn number(&self) -> u8 {
        match self {
            Layer::Layer1 => 1,
            Layer::Layer2 => 2,
            Layer::Layer3 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    SingleChannel,
}

impl ChannelMode {
    pub fn channels(&self) -> u16 {
        match self {
            ChannelMode::SingleChannel => 1,
            _ => 2,
        }
    }
}

// Bitrates in kbit/s, indexed by the 4-bit bitrate index
const BITRATES_V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
const BITRATES_V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const BITRATES_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATES_V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

const SAMPLE_RATES_V1: [u32; 3] = [44_100, 48_000, 32_000];
const SAMPLE_RATES_V2: [u32; 3] = [22_050, 24_000, 16_000];
const SAMPLE_RATES_V2_5: [u32; 3] = [11_025, 12_000, 8_000];

/// Decoded MPEG audio frame header
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    pub protected: bool,
    /// bit/s
    pub bitrate: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channel_mode: ChannelMode,
}

impl FrameHeader {
    pub const SIZE: usize = 4;

    /// Decode a header; `None` for anything that is not a valid frame start.
    /// Free-format frames (bitrate index 0) are rejected too, their length
    /// cannot be known from the header.
    pub fn parse(bytes: [u8; 4]) -> Option<Self> {
        if bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return None;
        }
        let version = match (bytes[1] >> 3) & 0x03 {
            0 => MpegVersion::V2_5,
            2 => MpegVersion::V2,
            3 => MpegVersion::V1,
            _ => return None,
        };
        let layer = match (bytes[1] >> 1) & 0x03 {
            1 => Layer::Layer3,
            2 => Layer::Layer2,
            3 => Layer::Layer1,
            _ => return None,
        };
        let bitrate_index = (bytes[2] >> 4) as usize;
        let rate_index = ((bytes[2] >> 2) & 0x03) as usize;
        if bitrate_index == 0 || bitrate_index == 15 || rate_index == 3 {
            return None;
        }

        let bitrates = match (version, layer) {
            (MpegVersion::V1, Layer::Layer1) => &BITRATES_V1_L1,
            (MpegVersion::V1, Layer::Layer2) => &BITRATES_V1_L2,
            (MpegVersion::V1, Layer::Layer3) => &BITRATES_V1_L3,
            (_, Layer::Layer1) => &BITRATES_V2_L1,
            _ => &BITRATES_V2_L23,
        };
        let sample_rates = match version {
            MpegVersion::V1 => &SAMPLE_RATES_V1,
            MpegVersion::V2 => &SAMPLE_RATES_V2,
            MpegVersion::V2_5 => &SAMPLE_RATES_V2_5,
        };
        let channel_mode = match bytes[3] >> 6 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::SingleChannel,
        };

        Some(FrameHeader {
            version,
            layer,
            protected: bytes[1] & 0x01 == 0,
            bitrate: bitrates[bitrate_index] * 1000,
            sample_rate: sample_rates[rate_index],
            padding: bytes[2] & 0x02 != 0,
            channel_mode,
        })
    }

    pub fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version) {
            (Layer::Layer1, _) => 384,
            (Layer::Layer2, _) | (Layer::Layer3, MpegVersion::V1) => 1152,
            (Layer::Layer3, _) => 576,
        }
    }

    /// Frame length in bytes, header included
    pub fn frame_len(&self) -> usize {
        match self.layer {
            Layer::Layer1 => ((12 * self.bitrate / self.sample_rate) as usize + self.padding as usize) * 4,
            _ => (self.samples_per_frame() / 8 * self.bitrate / self.sample_rate) as usize + self.padding as usize,
        }
    }

    /// e.g. "MPEG 1 Layer 3"
    pub fn codec(&self) -> String {
        format!("MPEG {} Layer {}", self.version.as_str(), self.layer.number())
    }

    /// Offset of a Xing/Info header from the frame start
    fn xing_offset(&self) -> usize {
        let side_info = match (self.version, self.channel_mode) {
            (MpegVersion::V1, ChannelMode::SingleChannel) => 17,
            (MpegVersion::V1, _) => 32,
            (_, ChannelMode::SingleChannel) => 9,
            _ => 17,
        };
        Self::SIZE + side_info
    }
}

/// Kind of VBR info header found in the first frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VbrHeaderKind {
    /// "Xing": variable bitrate
    Xing,
    /// "Info": LAME's marker for constant bitrate
    Info,
    /// Fraunhofer "VBRI"
    Vbri,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VbrHeader {
    pub kind: VbrHeaderKind,
    pub frames: Option<u32>,
    pub bytes: Option<u32>,
    /// Encoder string from a LAME extension, e.g. "LAME3.100"
    pub encoder: Option<String>,
}

const VBRI_OFFSET: usize = 36;

impl VbrHeader {
    /// Look for a Xing/Info or VBRI header inside `frame` (which starts with
    /// the frame header)
    pub fn find(header: &FrameHeader, frame: &[u8]) -> Option<Self> {
        Self::parse_xing(frame.get(header.xing_offset()..)?).or_else(|| Self::parse_vbri(frame.get(VBRI_OFFSET..)?))
    }

    fn parse_xing(data: &[u8]) -> Option<Self> {
        let kind = match data.get(..4)? {
            b"Xing" => VbrHeaderKind::Xing,
            b"Info" => VbrHeaderKind::Info,
            _ => return None,
        };
        let flags = be32(data, 4)?;
        let mut offset = 8;
        let mut field = |present: bool, size: usize| -> Option<Option<u32>> {
            if !present {
                return Some(None);
            }
            let value = if size == 4 { Some(be32(data, offset)?) } else { None };
            offset += size;
            Some(value)
        };
        let frames = field(flags & 0x01 != 0, 4)?;
        let bytes = field(flags & 0x02 != 0, 4)?;
        // TOC and quality indicator
        field(flags & 0x04 != 0, 100)?;
        field(flags & 0x08 != 0, 4)?;

        let encoder = data
            .get(offset..offset + 9)
            .filter(|tag| tag.starts_with(b"LAME") || tag.starts_with(b"Lavc") || tag.starts_with(b"Lavf"))
            .map(|tag| {
                String::from_utf8_lossy(tag)
                    .trim_end_matches(|c: char| c == '\0' || c == ' ')
                    .to_string()
            });

        Some(VbrHeader {
            kind,
            frames,
            bytes,
            encoder,
        })
    }

    fn parse_vbri(data: &[u8]) -> Option<Self> {
        if data.get(..4)? != b"VBRI" {
            return None;
        }
        // version(2) delay(2) quality(2) bytes(4) frames(4)
        Some(VbrHeader {
            kind: VbrHeaderKind::Vbri,
            bytes: Some(be32(data, 10)?),
            frames: Some(be32(data, 14)?),
            encoder: None,
        })
    }
}

fn be32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

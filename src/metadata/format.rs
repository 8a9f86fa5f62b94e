// Technical stream descriptors

use serde::Serialize;

/// Derived technical descriptors of the parsed stream.
///
/// Parsers may assign a field several times (an outer container first, an
/// inner codec header later); the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_profile: Option<String>,
    /// Encoder or vendor string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits_per_sample: Option<u8>,
    /// Bits per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_samples: Option<u64>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lossless: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_audio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_video: Option<bool>,
    /// Native tag formats encountered, in encounter order
    pub tag_types: Vec<String>,
}

/// A single assignment to `FormatInfo`
#[derive(Debug, Clone, PartialEq)]
pub enum FormatField {
    Container(String),
    Codec(String),
    CodecProfile(String),
    Tool(String),
    SampleRate(u32),
    NumberOfChannels(u16),
    BitsPerSample(u8),
    Bitrate(f64),
    NumberOfSamples(u64),
    Duration(f64),
    Lossless(bool),
    HasAudio(bool),
    HasVideo(bool),
}

impl FormatInfo {
    /// Overwrite one field
    pub fn apply(&mut self, field: FormatField) {
        match field {
            FormatField::Container(v) => self.container = Some(v),
            FormatField::Codec(v) => self.codec = Some(v),
            FormatField::CodecProfile(v) => self.codec_profile = Some(v),
            FormatField::Tool(v) => self.tool = Some(v),
            FormatField::SampleRate(v) => self.sample_rate = Some(v),
            FormatField::NumberOfChannels(v) => self.number_of_channels = Some(v),
            FormatField::BitsPerSample(v) => self.bits_per_sample = Some(v),
            FormatField::Bitrate(v) => self.bitrate = Some(v),
            FormatField::NumberOfSamples(v) => self.number_of_samples = Some(v),
            FormatField::Duration(v) => self.duration = Some(v),
            FormatField::Lossless(v) => self.lossless = Some(v),
            FormatField::HasAudio(v) => self.has_audio = Some(v),
            FormatField::HasVideo(v) => self.has_video = Some(v),
        }
    }

    pub(crate) fn add_tag_type(&mut self, format_id: &str) {
        if !self.tag_types.iter().any(|t| t == format_id) {
            self.tag_types.push(format_id.to_string());
        }
    }

    /// Duration from an exact sample count, when both sides are known
    pub fn exact_duration(&self) -> Option<f64> {
        match (self.number_of_samples, self.sample_rate) {
            (Some(samples), Some(rate)) if rate > 0 => Some(samples as f64 / rate as f64),
            _ => None,
        }
    }
}

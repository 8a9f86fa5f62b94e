// Native tag values as they come out of the parsers

use serde::Serialize;

use crate::utils::encoding::serialize_base64;

/// A native tag in its format-specific vocabulary, kept in encounter order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTag {
    pub id: String,
    pub value: TagValue,
}

/// Decoded payload of a native tag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Text(String),
    Number(u64),
    Comment(Comment),
    Picture(Picture),
    Popularimeter(Popularimeter),
    Owned(OwnedData),
    Binary(#[serde(serialize_with = "serialize_base64")] Vec<u8>),
    /// The tag was present but its payload could not be decoded
    Discarded,
}

impl TagValue {
    /// Textual content, if the value carries any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(text) => Some(text),
            TagValue::Comment(comment) => Some(&comment.text),
            _ => None,
        }
    }
}

impl From<String> for TagValue {
    fn from(text: String) -> Self {
        TagValue::Text(text)
    }
}

impl From<&str> for TagValue {
    fn from(text: &str) -> Self {
        TagValue::Text(text.to_string())
    }
}

/// Comment / lyrics payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub language: String,
    pub description: String,
    pub text: String,
}

/// ID3 popularimeter: rating byte (1..=255) and optional play counter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popularimeter {
    pub email: String,
    pub rating: u8,
    pub counter: Option<u64>,
}

/// Binary payload tagged with an owner identifier (UFID, PRIV)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnedData {
    pub owner: String,
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

/// An embedded picture, normalized across encodings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    /// MIME type, e.g. `image/jpeg`
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

impl Picture {
    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        match self.format.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            _ => "bin",
        }
    }
}

/// Picture types shared by ID3v2 APIC and FLAC PICTURE
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PictureType {
    Other = 0,
    FileIcon = 1,
    OtherFileIcon = 2,
    CoverFront = 3,
    CoverBack = 4,
    LeafletPage = 5,
    Media = 6,
    LeadArtist = 7,
    Artist = 8,
    Conductor = 9,
    Band = 10,
    Composer = 11,
    Lyricist = 12,
    RecordingLocation = 13,
    DuringRecording = 14,
    DuringPerformance = 15,
    VideoScreenCapture = 16,
    BrightColouredFish = 17,
    Illustration = 18,
    BandLogo = 19,
    PublisherLogo = 20,
}

impl PictureType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => PictureType::FileIcon,
            2 => PictureType::OtherFileIcon,
            3 => PictureType::CoverFront,
            4 => PictureType::CoverBack,
            5 => PictureType::LeafletPage,
            6 => PictureType::Media,
            7 => PictureType::LeadArtist,
            8 => PictureType::Artist,
            9 => PictureType::Conductor,
            10 => PictureType::Band,
            11 => PictureType::Composer,
            12 => PictureType::Lyricist,
            13 => PictureType::RecordingLocation,
            14 => PictureType::DuringRecording,
            15 => PictureType::DuringPerformance,
            16 => PictureType::VideoScreenCapture,
            17 => PictureType::BrightColouredFish,
            18 => PictureType::Illustration,
            19 => PictureType::BandLogo,
            20 => PictureType::PublisherLogo,
            _ => PictureType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PictureType::Other => "Other",
            PictureType::FileIcon => "File Icon",
            PictureType::OtherFileIcon => "Other File Icon",
            PictureType::CoverFront => "Cover (front)",
            PictureType::CoverBack => "Cover (back)",
            PictureType::LeafletPage => "Leaflet page",
            PictureType::Media => "Media",
            PictureType::LeadArtist => "Lead artist",
            PictureType::Artist => "Artist",
            PictureType::Conductor => "Conductor",
            PictureType::Band => "Band",
            PictureType::Composer => "Composer",
            PictureType::Lyricist => "Lyricist",
            PictureType::RecordingLocation => "Recording Location",
            PictureType::DuringRecording => "During recording",
            PictureType::DuringPerformance => "During performance",
            PictureType::VideoScreenCapture => "Video screen capture",
            PictureType::BrightColouredFish => "Bright coloured fish",
            PictureType::Illustration => "Illustration",
            PictureType::BandLogo => "Band logo",
            PictureType::PublisherLogo => "Publisher logo",
        }
    }
}

/// Position within a set, e.g. track 7 of 9
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackNo {
    pub no: Option<u32>,
    pub of: Option<u32>,
}

impl TrackNo {
    /// Parse "N/M", "N" or "/M"; `None` when neither side is a number
    pub fn parse(text: &str) -> Option<Self> {
        let (no, of) = match text.split_once('/') {
            Some((no, of)) => (no, Some(of)),
            None => (text, None),
        };
        let track = TrackNo {
            no: no.trim().parse().ok(),
            of: of.and_then(|of| of.trim().parse().ok()),
        };
        if track.no.is_none() && track.of.is_none() {
            None
        } else {
            Some(track)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.no.is_none() && self.of.is_none()
    }
}

/// Rating normalized to 0..=1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rating {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub rating: Option<f64>,
}

impl Rating {
    /// Scale `score` out of `max_score` into 0..=1
    pub fn scaled(source: Option<String>, score: f64, max_score: f64) -> Self {
        let rating = if max_score > 0.0 {
            Some((score / max_score).clamp(0.0, 1.0))
        } else {
            None
        };
        Rating {
            source: source.map(|s| s.to_lowercase()),
            rating,
        }
    }
}

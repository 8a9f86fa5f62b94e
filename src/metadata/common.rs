// Format-independent ("common") tag vocabulary and merge rules

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::tag::{Picture, Rating, TrackNo};

/// Closed vocabulary of normalized tag keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommonKey {
    Title,
    Artist,
    AlbumArtist,
    Album,
    Date,
    OriginalDate,
    Year,
    OriginalYear,
    Comment,
    Genre,
    Picture,
    Composer,
    Lyricist,
    Conductor,
    Lyrics,
    Track,
    TrackTotal,
    Disk,
    DiskTotal,
    Rating,
    Bpm,
    Compilation,
    Copyright,
    EncodedBy,
    EncoderSettings,
    Label,
    Isrc,
    Grouping,
    Subtitle,
}

impl CommonKey {
    pub const ALL: [CommonKey; 29] = [
        CommonKey::Title,
        CommonKey::Artist,
        CommonKey::AlbumArtist,
        CommonKey::Album,
        CommonKey::Date,
        CommonKey::OriginalDate,
        CommonKey::Year,
        CommonKey::OriginalYear,
        CommonKey::Comment,
        CommonKey::Genre,
        CommonKey::Picture,
        CommonKey::Composer,
        CommonKey::Lyricist,
        CommonKey::Conductor,
        CommonKey::Lyrics,
        CommonKey::Track,
        CommonKey::TrackTotal,
        CommonKey::Disk,
        CommonKey::DiskTotal,
        CommonKey::Rating,
        CommonKey::Bpm,
        CommonKey::Compilation,
        CommonKey::Copyright,
        CommonKey::EncodedBy,
        CommonKey::EncoderSettings,
        CommonKey::Label,
        CommonKey::Isrc,
        CommonKey::Grouping,
        CommonKey::Subtitle,
    ];

    /// Field name as it appears in the serialized result
    pub fn as_str(&self) -> &'static str {
        match self {
            CommonKey::Title => "title",
            CommonKey::Artist => "artist",
            CommonKey::AlbumArtist => "albumartist",
            CommonKey::Album => "album",
            CommonKey::Date => "date",
            CommonKey::OriginalDate => "originaldate",
            CommonKey::Year => "year",
            CommonKey::OriginalYear => "originalyear",
            CommonKey::Comment => "comment",
            CommonKey::Genre => "genre",
            CommonKey::Picture => "picture",
            CommonKey::Composer => "composer",
            CommonKey::Lyricist => "lyricist",
            CommonKey::Conductor => "conductor",
            CommonKey::Lyrics => "lyrics",
            CommonKey::Track => "track",
            CommonKey::TrackTotal => "tracktotal",
            CommonKey::Disk => "disk",
            CommonKey::DiskTotal => "disktotal",
            CommonKey::Rating => "rating",
            CommonKey::Bpm => "bpm",
            CommonKey::Compilation => "compilation",
            CommonKey::Copyright => "copyright",
            CommonKey::EncodedBy => "encodedby",
            CommonKey::EncoderSettings => "encodersettings",
            CommonKey::Label => "label",
            CommonKey::Isrc => "isrc",
            CommonKey::Grouping => "grouping",
            CommonKey::Subtitle => "subtitle",
        }
    }

    /// Singular keys keep their first value; the rest accumulate
    pub fn is_singular(&self) -> bool {
        !matches!(
            self,
            CommonKey::Artist
                | CommonKey::Composer
                | CommonKey::Lyricist
                | CommonKey::Conductor
                | CommonKey::Genre
                | CommonKey::Comment
                | CommonKey::Lyrics
                | CommonKey::Picture
                | CommonKey::Rating
                | CommonKey::Label
                | CommonKey::Isrc
                | CommonKey::Subtitle
        )
    }
}

impl fmt::Display for CommonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommonKey {
    type Err = String;

    /// Case-insensitive lookup of a field name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommonKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown common tag: {}", s))
    }
}

/// A value converted for a common key
#[derive(Debug, Clone, PartialEq)]
pub enum CommonValue {
    Text(String),
    Number(u32),
    Float(f64),
    Track(TrackNo),
    Flag(bool),
    Picture(Picture),
    Rating(Rating),
}

/// Normalized tags merged from every native tag format in the file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommonTags {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artist: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub albumartist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originaldate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originalyear: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comment: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genre: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub picture: Vec<Picture>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub composer: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lyricist: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conductor: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lyrics: Vec<String>,
    pub track: TrackNo,
    pub disk: TrackNo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rating: Vec<Rating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encodedby: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encodersettings: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub isrc: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtitle: Vec<String>,
}

impl CommonTags {
    /// Merge one value. Returns a warning when the value was rejected.
    pub fn apply(&mut self, key: CommonKey, value: CommonValue) -> Option<String> {
        use CommonValue as V;

        match (key, value) {
            (CommonKey::Title, V::Text(v)) => set_once(&mut self.title, v, key),
            (CommonKey::AlbumArtist, V::Text(v)) => set_once(&mut self.albumartist, v, key),
            (CommonKey::Album, V::Text(v)) => set_once(&mut self.album, v, key),
            (CommonKey::Date, V::Text(v)) => set_once(&mut self.date, v, key),
            (CommonKey::OriginalDate, V::Text(v)) => set_once(&mut self.originaldate, v, key),
            (CommonKey::Year, V::Number(v)) => set_once(&mut self.year, v, key),
            (CommonKey::OriginalYear, V::Number(v)) => set_once(&mut self.originalyear, v, key),
            (CommonKey::Bpm, V::Float(v)) => set_once(&mut self.bpm, v, key),
            (CommonKey::Compilation, V::Flag(v)) => set_once(&mut self.compilation, v, key),
            (CommonKey::Copyright, V::Text(v)) => set_once(&mut self.copyright, v, key),
            (CommonKey::EncodedBy, V::Text(v)) => set_once(&mut self.encodedby, v, key),
            (CommonKey::EncoderSettings, V::Text(v)) => {
                set_once(&mut self.encodersettings, v, key)
            }
            (CommonKey::Grouping, V::Text(v)) => set_once(&mut self.grouping, v, key),

            (CommonKey::Track, V::Track(v)) => merge_position(&mut self.track, v, key),
            (CommonKey::Disk, V::Track(v)) => merge_position(&mut self.disk, v, key),
            (CommonKey::TrackTotal, V::Number(v)) => set_once(&mut self.track.of, v, key),
            (CommonKey::DiskTotal, V::Number(v)) => set_once(&mut self.disk.of, v, key),

            (CommonKey::Artist, V::Text(v)) => push(&mut self.artist, v),
            (CommonKey::Composer, V::Text(v)) => push(&mut self.composer, v),
            (CommonKey::Lyricist, V::Text(v)) => push(&mut self.lyricist, v),
            (CommonKey::Conductor, V::Text(v)) => push(&mut self.conductor, v),
            (CommonKey::Genre, V::Text(v)) => push(&mut self.genre, v),
            (CommonKey::Comment, V::Text(v)) => push(&mut self.comment, v),
            (CommonKey::Lyrics, V::Text(v)) => push(&mut self.lyrics, v),
            (CommonKey::Label, V::Text(v)) => push(&mut self.label, v),
            (CommonKey::Isrc, V::Text(v)) => push(&mut self.isrc, v),
            (CommonKey::Subtitle, V::Text(v)) => push(&mut self.subtitle, v),
            (CommonKey::Rating, V::Rating(v)) => push(&mut self.rating, v),
            (CommonKey::Picture, V::Picture(v)) => {
                // Identical pictures reached through different native tags count once
                if !self
                    .picture
                    .iter()
                    .any(|p| p.format == v.format && p.data == v.data)
                {
                    self.picture.push(v);
                } else {
                    log::debug!("dropping duplicate {} picture", v.format);
                }
                None
            }

            (key, value) => Some(format!(
                "value {:?} is not valid for common tag {}",
                value, key
            )),
        }
    }
}

fn push<T>(list: &mut Vec<T>, value: T) -> Option<String> {
    list.push(value);
    None
}

fn set_once<T: PartialEq + fmt::Debug>(slot: &mut Option<T>, value: T, key: CommonKey) -> Option<String> {
    match slot {
        None => {
            *slot = Some(value);
            None
        }
        Some(existing) if *existing == value => None,
        Some(existing) => Some(format!(
            "ignoring duplicate {}: {:?}, keeping {:?}",
            key, value, existing
        )),
    }
}

fn merge_position(slot: &mut TrackNo, value: TrackNo, key: CommonKey) -> Option<String> {
    let mut warning = None;
    if let Some(no) = value.no {
        warning = set_once(&mut slot.no, no, key);
    }
    if let Some(of) = value.of {
        warning = set_once(&mut slot.of, of, key).or(warning);
    }
    warning
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_parsing() {
        assert_eq!("title".parse::<CommonKey>(), Ok(CommonKey::Title));
        assert_eq!("TiTlE".parse::<CommonKey>(), Ok(CommonKey::Title));
        assert_eq!("albumartist".parse::<CommonKey>(), Ok(CommonKey::AlbumArtist));
        assert!("unknown".parse::<CommonKey>().is_err());
        for key in CommonKey::ALL {
            assert_eq!(key.as_str().parse::<CommonKey>(), Ok(key));
        }
    }

    #[test]
    fn test_singular_keeps_first() {
        let mut tags = CommonTags::default();
        assert_eq!(tags.apply(CommonKey::Title, CommonValue::Text("A".into())), None);
        let warning = tags.apply(CommonKey::Title, CommonValue::Text("B".into()));
        assert!(warning.unwrap().contains("title"));
        // Repeating the same value is not a conflict
        assert_eq!(tags.apply(CommonKey::Title, CommonValue::Text("A".into())), None);
        assert_eq!(tags.title.as_deref(), Some("A"));
    }

    #[test]
    fn test_arrays_keep_encounter_order() {
        let mut tags = CommonTags::default();
        for name in ["B", "A", "B"] {
            tags.apply(CommonKey::Artist, CommonValue::Text(name.into()));
        }
        assert_eq!(tags.artist, vec!["B", "A", "B"]);
    }

    #[test]
    fn test_track_and_total_merge() {
        let mut tags = CommonTags::default();
        tags.apply(CommonKey::Track, CommonValue::Track(TrackNo { no: Some(7), of: None }));
        tags.apply(CommonKey::TrackTotal, CommonValue::Number(9));
        assert_eq!(tags.track, TrackNo { no: Some(7), of: Some(9) });

        let warning = tags.apply(CommonKey::Track, CommonValue::Track(TrackNo { no: Some(8), of: None }));
        assert!(warning.is_some());
        assert_eq!(tags.track.no, Some(7));
    }

    #[test]
    fn test_identical_pictures_collapse() {
        let picture = Picture {
            format: "image/png".into(),
            picture_type: None,
            description: None,
            data: vec![1, 2, 3],
        };
        let mut tags = CommonTags::default();
        tags.apply(CommonKey::Picture, CommonValue::Picture(picture.clone()));
        tags.apply(CommonKey::Picture, CommonValue::Picture(picture));
        assert_eq!(tags.picture.len(), 1);
    }

    #[test]
    fn test_type_mismatch_is_warning() {
        let mut tags = CommonTags::default();
        assert!(tags.apply(CommonKey::Year, CommonValue::Text("soon".into())).is_some());
        assert_eq!(tags.year, None);
    }
}

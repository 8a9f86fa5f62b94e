// Unified metadata field mapping system
//
// Each native vocabulary has a `TagMapper`: a data table from native key to
// common key, plus an optional `post_map` hook for values that need more
// than the default conversion.
//
// - ID3v2: Frame IDs (TIT2, TPE1, TALB, etc.; TT2, TP1, ... for v2.2)
// - Vorbis Comment keys (TITLE, ARTIST, ALBUM, etc.), shared by FLAC and OGG
// - ID3v1: the fixed fields of the 128-byte trailer

pub mod id3v1;
pub mod id3v2;
pub mod vorbis;

use chrono::{Datelike, NaiveDate};

use crate::metadata::{CommonKey, CommonValue, Rating, RawTag, TagValue, TrackNo};

/// Value hook run before the default conversion.
///
/// `None` falls through to the default; `Some(Ok(values))` replaces it.
pub type PostMap = fn(&RawTag, CommonKey) -> Option<Result<Vec<CommonValue>, String>>;

/// Native key → common key table for one tag vocabulary
pub struct TagMapper {
    pub format_ids: &'static [&'static str],
    pub table: &'static [(&'static str, CommonKey)],
    pub case_insensitive: bool,
    /// Score that maps to a rating of 1.0
    pub max_rating: f64,
    pub post_map: Option<PostMap>,
}

static MAPPERS: [&TagMapper; 4] = [
    &id3v2::ID3V22_MAPPER,
    &id3v2::ID3V24_MAPPER,
    &vorbis::VORBIS_MAPPER,
    &id3v1::ID3V1_MAPPER,
];

/// Mapper registered for a native tag format
pub fn mapper_for(format_id: &str) -> Option<&'static TagMapper> {
    MAPPERS
        .iter()
        .copied()
        .find(|mapper| mapper.format_ids.contains(&format_id))
}

impl TagMapper {
    /// Common key for a native id. "KEY:qualifier" ids fall back to "KEY".
    pub fn common_key(&self, id: &str) -> Option<CommonKey> {
        self.lookup(id).or_else(|| {
            id.split_once(':')
                .and_then(|(head, _)| self.lookup(head))
        })
    }

    fn lookup(&self, id: &str) -> Option<CommonKey> {
        self.table
            .iter()
            .find(|(native, _)| {
                if self.case_insensitive {
                    native.eq_ignore_ascii_case(id)
                } else {
                    *native == id
                }
            })
            .map(|(_, key)| *key)
    }

    /// Project a raw tag onto the common vocabulary.
    ///
    /// `Ok(None)` for unmapped or empty tags; `Err` carries a warning.
    pub fn map(&self, tag: &RawTag) -> Result<Option<(CommonKey, Vec<CommonValue>)>, String> {
        let Some(key) = self.common_key(&tag.id) else {
            return Ok(None);
        };
        if tag.value == TagValue::Discarded {
            return Ok(None);
        }
        if tag.value.as_text().is_some_and(|text| text.trim().is_empty()) {
            return Ok(None);
        }
        if let Some(post_map) = self.post_map {
            if let Some(values) = post_map(tag, key) {
                return values.map(|values| Some((key, values)));
            }
        }
        self.convert(key, &tag.value)
            .map(|value| Some((key, vec![value])))
    }

    /// Default conversion of a native value for `key`
    pub fn convert(&self, key: CommonKey, value: &TagValue) -> Result<CommonValue, String> {
        if key == CommonKey::Picture {
            return match value {
                TagValue::Picture(picture) => Ok(CommonValue::Picture(picture.clone())),
                other => Err(format!("expected a picture, got {}", kind_of(other))),
            };
        }

        let text = value
            .as_text()
            .ok_or_else(|| format!("expected text, got {}", kind_of(value)))?
            .trim();

        match key {
            CommonKey::Track | CommonKey::Disk => TrackNo::parse(text)
                .map(CommonValue::Track)
                .ok_or_else(|| format!("invalid position {:?}", text)),
            CommonKey::TrackTotal | CommonKey::DiskTotal => text
                .parse()
                .map(CommonValue::Number)
                .map_err(|_| format!("invalid total {:?}", text)),
            CommonKey::Year | CommonKey::OriginalYear => year_of(text)
                .map(CommonValue::Number)
                .ok_or_else(|| format!("invalid year {:?}", text)),
            CommonKey::Bpm => text
                .parse()
                .map(CommonValue::Float)
                .map_err(|_| format!("invalid bpm {:?}", text)),
            CommonKey::Compilation => parse_flag(text)
                .map(CommonValue::Flag)
                .ok_or_else(|| format!("invalid flag {:?}", text)),
            CommonKey::Rating => text
                .parse::<f64>()
                .map(|score| CommonValue::Rating(Rating::scaled(None, score, self.max_rating)))
                .map_err(|_| format!("invalid rating {:?}", text)),
            _ => Ok(CommonValue::Text(text.to_string())),
        }
    }
}

fn kind_of(value: &TagValue) -> &'static str {
    match value {
        TagValue::Text(_) => "text",
        TagValue::Number(_) => "number",
        TagValue::Comment(_) => "comment",
        TagValue::Picture(_) => "picture",
        TagValue::Popularimeter(_) => "popularimeter",
        TagValue::Owned(_) => "owned data",
        TagValue::Binary(_) => "binary",
        TagValue::Discarded => "discarded payload",
    }
}

/// Year of a date-like string: "2024", "2024-01-15", "2024-01-15T10:00"
pub fn year_of(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return u32::try_from(date.year()).ok();
    }
    let digits = text.get(..4)?;
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_tag(id: &str, value: &str) -> RawTag {
        RawTag {
            id: id.to_string(),
            value: TagValue::Text(value.to_string()),
        }
    }

    #[test]
    fn test_mapper_registry() {
        assert!(mapper_for("id3v2.2").is_some());
        assert!(mapper_for("id3v2.3").is_some());
        assert!(mapper_for("id3v2.4").is_some());
        assert!(mapper_for("vorbis").is_some());
        assert!(mapper_for("id3v1").is_some());
        assert!(mapper_for("APEv2").is_none());
    }

    #[test]
    fn test_field_mapping() {
        let id3 = mapper_for("id3v2.3").unwrap();
        assert_eq!(id3.common_key("TIT2"), Some(CommonKey::Title));
        assert_eq!(id3.common_key("tit2"), None);
        assert_eq!(mapper_for("id3v2.2").unwrap().common_key("TT2"), Some(CommonKey::Title));

        let vorbis = mapper_for("vorbis").unwrap();
        assert_eq!(vorbis.common_key("title"), Some(CommonKey::Title));
        assert_eq!(vorbis.common_key("RATING:someone@example.com"), Some(CommonKey::Rating));
        assert_eq!(vorbis.common_key("UNKNOWN"), None);
    }

    #[test]
    fn test_track_split_through_mapper() {
        let id3 = mapper_for("id3v2.3").unwrap();
        assert_eq!(
            id3.map(&text_tag("TRCK", "7/9")).unwrap(),
            Some((CommonKey::Track, vec![CommonValue::Track(TrackNo { no: Some(7), of: Some(9) })]))
        );
        assert_eq!(
            id3.map(&text_tag("TRCK", "7")).unwrap(),
            Some((CommonKey::Track, vec![CommonValue::Track(TrackNo { no: Some(7), of: None })]))
        );
        assert!(id3.map(&text_tag("TRCK", "seven")).is_err());
    }

    #[test]
    fn test_value_normalization() {
        assert_eq!(year_of("2024-01-15"), Some(2024));
        assert_eq!(year_of("2024"), Some(2024));
        assert_eq!(year_of("1999-13"), Some(1999));
        assert_eq!(year_of("12"), None);
        assert_eq!(year_of("May 2001"), None);

        let vorbis = mapper_for("vorbis").unwrap();
        assert_eq!(
            vorbis.map(&text_tag("COMPILATION", "1")).unwrap(),
            Some((CommonKey::Compilation, vec![CommonValue::Flag(true)]))
        );
        assert_eq!(vorbis.map(&text_tag("TITLE", "   ")).unwrap(), None);
    }

    #[test]
    fn test_rating_scales() {
        let vorbis = mapper_for("vorbis").unwrap();
        let (key, values) = vorbis.map(&text_tag("RATING", "80")).unwrap().unwrap();
        assert_eq!(key, CommonKey::Rating);
        assert_eq!(values, vec![CommonValue::Rating(Rating { source: None, rating: Some(0.8) })]);
    }
}

// Metadata collection: raw tags in, normalized result out

pub mod common;
pub mod format;
pub mod tag;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::field_mapping;

pub use common::{CommonKey, CommonTags, CommonValue};
pub use format::{FormatField, FormatInfo};
pub use tag::{Comment, OwnedData, Picture, PictureType, Popularimeter, Rating, RawTag, TagValue, TrackNo};

/// Caller options for a single parse
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// MIME type of the content, checked before anything else
    pub mime_type: Option<String>,
    /// File name or path; only the extension is used
    pub path: Option<String>,
    /// Drop embedded pictures from native and common output
    pub skip_covers: bool,
    /// Stop MPEG parsing after the first audio frame
    pub skip_post_headers: bool,
}

/// Final parse result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudioMetadata {
    pub format: FormatInfo,
    pub common: CommonTags,
    /// Raw tags per native tag format, in encounter order
    pub native: BTreeMap<String, Vec<RawTag>>,
    pub warnings: Vec<String>,
}

impl AudioMetadata {
    /// Raw tags of one native format (empty when absent)
    pub fn native_tags(&self, format_id: &str) -> &[RawTag] {
        self.native.get(format_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Accumulates everything a parser discovers while it walks the stream.
///
/// One collector exists per parse. It is only ever touched by the parser
/// that currently owns the byte source.
#[derive(Debug)]
pub struct MetadataCollector {
    options: ParseOptions,
    format: FormatInfo,
    common: CommonTags,
    native: BTreeMap<String, Vec<RawTag>>,
    warnings: Vec<String>,
}

impl MetadataCollector {
    pub fn new(options: ParseOptions) -> Self {
        MetadataCollector {
            options,
            format: FormatInfo::default(),
            common: CommonTags::default(),
            native: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn format(&self) -> &FormatInfo {
        &self.format
    }

    pub fn common(&self) -> &CommonTags {
        &self.common
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn set_format(&mut self, field: FormatField) {
        log::debug!("format: {:?}", field);
        self.format.apply(field);
    }

    /// Record a native tag and merge its common projection
    pub fn add_tag(&mut self, format_id: &str, id: impl Into<String>, value: TagValue) {
        if self.options.skip_covers && matches!(value, TagValue::Picture(_)) {
            return;
        }
        let tag = RawTag {
            id: id.into(),
            value,
        };
        log::trace!("{} tag {}", format_id, tag.id);

        self.format.add_tag_type(format_id);
        self.map_common(format_id, &tag);
        self.native
            .entry(format_id.to_string())
            .or_default()
            .push(tag);
    }

    fn map_common(&mut self, format_id: &str, tag: &RawTag) {
        let Some(mapper) = field_mapping::mapper_for(format_id) else {
            return;
        };
        match mapper.map(tag) {
            Ok(Some((key, values))) => {
                for value in values {
                    if let Some(warning) = self.common.apply(key, value) {
                        self.add_warning(format!("{} {}: {}", format_id, tag.id, warning));
                    }
                }
            }
            Ok(None) => {}
            Err(e) => self.add_warning(format!("{} {}: {}", format_id, tag.id, e)),
        }
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Reconcile derived fields and produce the immutable result
    pub fn finalize(mut self) -> AudioMetadata {
        if let Some(duration) = self.format.exact_duration() {
            self.format.duration = Some(duration);
        }
        self.reconcile_year();

        AudioMetadata {
            format: self.format,
            common: self.common,
            native: self.native,
            warnings: self.warnings,
        }
    }

    /// `year` falls back to the date's year; a disagreement is only reported
    fn reconcile_year(&mut self) {
        let date_year = self.common.date.as_deref().and_then(field_mapping::year_of);
        match (self.common.year, date_year) {
            (None, Some(year)) => self.common.year = Some(year),
            (Some(year), Some(from_date)) if year != from_date => {
                self.add_warning(format!(
                    "year {} disagrees with date {}",
                    year,
                    self.common.date.as_deref().unwrap_or_default()
                ));
            }
            _ => {}
        }
        if self.common.originalyear.is_none() {
            self.common.originalyear = self
                .common
                .originaldate
                .as_deref()
                .and_then(field_mapping::year_of);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_raw_tags_survive_mapping() {
        let mut collector = MetadataCollector::new(ParseOptions::default());
        collector.add_tag("vorbis", "TITLE", "First".into());
        collector.add_tag("vorbis", "TITLE", "Second".into());
        collector.add_tag("vorbis", "X-CUSTOM", "kept".into());
        let result = collector.finalize();

        assert_eq!(result.common.title.as_deref(), Some("First"));
        assert_eq!(result.native_tags("vorbis").len(), 3);
        assert_eq!(result.native_tags("vorbis")[2].id, "X-CUSTOM");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.format.tag_types, vec!["vorbis"]);
    }

    #[test]
    fn test_year_derived_from_date() {
        let mut collector = MetadataCollector::new(ParseOptions::default());
        collector.add_tag("vorbis", "DATE", "2019-03-04".into());
        let result = collector.finalize();
        assert_eq!(result.common.date.as_deref(), Some("2019-03-04"));
        assert_eq!(result.common.year, Some(2019));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_year_date_conflict_is_reported() {
        let mut collector = MetadataCollector::new(ParseOptions::default());
        collector.add_tag("id3v2.3", "TYER", "2001".into());
        collector.add_tag("id3v2.4", "TDRC", "2003-05".into());
        let result = collector.finalize();
        assert_eq!(result.common.year, Some(2001));
        assert_eq!(result.common.date.as_deref(), Some("2003-05"));
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_exact_duration_wins_over_estimate() {
        let mut collector = MetadataCollector::new(ParseOptions::default());
        collector.set_format(FormatField::Duration(10.5));
        collector.set_format(FormatField::SampleRate(44_100));
        collector.set_format(FormatField::NumberOfSamples(441_000));
        assert_eq!(collector.finalize().format.duration, Some(10.0));
    }

    #[test]
    fn test_skip_covers() {
        let options = ParseOptions {
            skip_covers: true,
            ..Default::default()
        };
        let mut collector = MetadataCollector::new(options);
        let picture = Picture {
            format: "image/jpeg".into(),
            picture_type: None,
            description: None,
            data: vec![0xFF, 0xD8],
        };
        collector.add_tag("vorbis", "METADATA_BLOCK_PICTURE", TagValue::Picture(picture));
        let result = collector.finalize();
        assert!(result.common.picture.is_empty());
        assert!(result.native.is_empty());
    }
}

// Vorbis Comment keys → common keys (FLAC, OGG Vorbis/Opus/Speex/Theora)

use super::TagMapper;
use crate::metadata::{CommonKey, CommonValue, Rating, RawTag};

/// Vorbis RATING values are percentages
const VORBIS_MAX_RATING: f64 = 100.0;

pub static VORBIS_MAPPER: TagMapper = TagMapper {
    format_ids: &["vorbis"],
    table: &[
        ("TITLE", CommonKey::Title),
        ("ARTIST", CommonKey::Artist),
        ("ALBUMARTIST", CommonKey::AlbumArtist),
        ("ALBUM ARTIST", CommonKey::AlbumArtist),
        ("ALBUM", CommonKey::Album),
        ("DATE", CommonKey::Date),
        ("YEAR", CommonKey::Year),
        ("ORIGINALDATE", CommonKey::OriginalDate),
        ("ORIGINALYEAR", CommonKey::OriginalYear),
        ("COMMENT", CommonKey::Comment),
        ("DESCRIPTION", CommonKey::Comment),
        ("GENRE", CommonKey::Genre),
        ("METADATA_BLOCK_PICTURE", CommonKey::Picture),
        ("COVERART", CommonKey::Picture),
        ("COMPOSER", CommonKey::Composer),
        ("LYRICIST", CommonKey::Lyricist),
        ("CONDUCTOR", CommonKey::Conductor),
        ("LYRICS", CommonKey::Lyrics),
        ("TRACKNUMBER", CommonKey::Track),
        ("TRACKTOTAL", CommonKey::TrackTotal),
        ("TOTALTRACKS", CommonKey::TrackTotal),
        ("DISCNUMBER", CommonKey::Disk),
        ("DISCTOTAL", CommonKey::DiskTotal),
        ("TOTALDISCS", CommonKey::DiskTotal),
        ("RATING", CommonKey::Rating),
        ("BPM", CommonKey::Bpm),
        ("COMPILATION", CommonKey::Compilation),
        ("COPYRIGHT", CommonKey::Copyright),
        ("ENCODEDBY", CommonKey::EncodedBy),
        ("ENCODED-BY", CommonKey::EncodedBy),
        ("ENCODERSETTINGS", CommonKey::EncoderSettings),
        ("LABEL", CommonKey::Label),
        ("ORGANIZATION", CommonKey::Label),
        ("ISRC", CommonKey::Isrc),
        ("GROUPING", CommonKey::Grouping),
        ("SUBTITLE", CommonKey::Subtitle),
    ],
    case_insensitive: true,
    max_rating: VORBIS_MAX_RATING,
    post_map: Some(post_map),
};

/// "RATING:<email>" carries the rating source in the key
fn post_map(tag: &RawTag, key: CommonKey) -> Option<Result<Vec<CommonValue>, String>> {
    if key != CommonKey::Rating {
        return None;
    }
    let (_, source) = tag.id.split_once(':')?;
    let text = tag.value.as_text()?.trim();
    Some(
        text.parse::<f64>()
            .map(|score| {
                vec![CommonValue::Rating(Rating::scaled(
                    Some(source.to_string()),
                    score,
                    VORBIS_MAX_RATING,
                ))]
            })
            .map_err(|_| format!("invalid rating {:?}", text)),
    )
}

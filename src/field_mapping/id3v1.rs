// ID3v1 fields → common keys

use super::TagMapper;
use crate::metadata::CommonKey;

pub static ID3V1_MAPPER: TagMapper = TagMapper {
    format_ids: &["id3v1"],
    table: &[
        ("title", CommonKey::Title),
        ("artist", CommonKey::Artist),
        ("album", CommonKey::Album),
        ("year", CommonKey::Year),
        ("comment", CommonKey::Comment),
        ("track", CommonKey::Track),
        ("genre", CommonKey::Genre),
    ],
    case_insensitive: false,
    max_rating: 1.0,
    post_map: None,
};

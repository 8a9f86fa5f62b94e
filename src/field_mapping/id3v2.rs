// ID3v2 frame IDs → common keys

use super::TagMapper;
use crate::id3::v1::genre_name;
use crate::metadata::{CommonKey, CommonValue, Rating, RawTag, TagValue};

/// v2.2 uses three-character frame IDs
pub static ID3V22_MAPPER: TagMapper = TagMapper {
    format_ids: &["id3v2.2"],
    table: &[
        ("TT2", CommonKey::Title),
        ("TP1", CommonKey::Artist),
        ("TP2", CommonKey::AlbumArtist),
        ("TP3", CommonKey::Conductor),
        ("TAL", CommonKey::Album),
        ("TYE", CommonKey::Year),
        ("TOR", CommonKey::OriginalYear),
        ("TRK", CommonKey::Track),
        ("TPA", CommonKey::Disk),
        ("TCO", CommonKey::Genre),
        ("COM", CommonKey::Comment),
        ("ULT", CommonKey::Lyrics),
        ("PIC", CommonKey::Picture),
        ("POP", CommonKey::Rating),
        ("TCM", CommonKey::Composer),
        ("TXT", CommonKey::Lyricist),
        ("TBP", CommonKey::Bpm),
        ("TCP", CommonKey::Compilation),
        ("TCR", CommonKey::Copyright),
        ("TEN", CommonKey::EncodedBy),
        ("TSS", CommonKey::EncoderSettings),
        ("TPB", CommonKey::Label),
        ("TRC", CommonKey::Isrc),
        ("TT1", CommonKey::Grouping),
        ("TT3", CommonKey::Subtitle),
    ],
    case_insensitive: false,
    max_rating: 255.0,
    post_map: Some(post_map),
};

/// v2.3 and v2.4 share four-character frame IDs
pub static ID3V24_MAPPER: TagMapper = TagMapper {
    format_ids: &["id3v2.3", "id3v2.4"],
    table: &[
        ("TIT2", CommonKey::Title),
        ("TPE1", CommonKey::Artist),
        ("TPE2", CommonKey::AlbumArtist),
        ("TPE3", CommonKey::Conductor),
        ("TALB", CommonKey::Album),
        ("TYER", CommonKey::Year),
        ("TDRC", CommonKey::Date),
        ("TDOR", CommonKey::OriginalDate),
        ("TORY", CommonKey::OriginalYear),
        ("TRCK", CommonKey::Track),
        ("TPOS", CommonKey::Disk),
        ("TCON", CommonKey::Genre),
        ("COMM", CommonKey::Comment),
        ("USLT", CommonKey::Lyrics),
        ("APIC", CommonKey::Picture),
        ("POPM", CommonKey::Rating),
        ("TCOM", CommonKey::Composer),
        ("TEXT", CommonKey::Lyricist),
        ("TBPM", CommonKey::Bpm),
        ("TCMP", CommonKey::Compilation),
        ("TCOP", CommonKey::Copyright),
        ("TENC", CommonKey::EncodedBy),
        ("TSSE", CommonKey::EncoderSettings),
        ("TPUB", CommonKey::Label),
        ("TSRC", CommonKey::Isrc),
        ("TIT1", CommonKey::Grouping),
        ("TIT3", CommonKey::Subtitle),
    ],
    case_insensitive: false,
    max_rating: 255.0,
    post_map: Some(post_map),
};

fn post_map(tag: &RawTag, key: CommonKey) -> Option<Result<Vec<CommonValue>, String>> {
    match (key, &tag.value) {
        (CommonKey::Rating, TagValue::Popularimeter(popm)) => {
            let source = Some(popm.email.clone()).filter(|email| !email.is_empty());
            // 0 means "unknown" rather than "worst"
            let rating = if popm.rating == 0 {
                Rating { source, rating: None }
            } else {
                Rating::scaled(source, popm.rating as f64, 255.0)
            };
            Some(Ok(vec![CommonValue::Rating(rating)]))
        }
        (CommonKey::Genre, TagValue::Text(text)) => {
            Some(Ok(parse_genre(text).into_iter().map(CommonValue::Text).collect()))
        }
        _ => None,
    }
}

/// Resolve ID3 genre references: "(17)", "17", "(4)(RX)Eurodisco", "((Text)"
pub fn parse_genre(text: &str) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    let mut rest = text.trim();

    while let Some(inner) = rest.strip_prefix('(') {
        if inner.starts_with('(') {
            // "((" escapes a literal parenthesis
            rest = inner;
            break;
        }
        let Some(end) = inner.find(')') else { break };
        match genre_reference(&inner[..end]) {
            Some(name) => genres.push(name.to_string()),
            None => break,
        }
        rest = &inner[end + 1..];
    }

    let refinement = rest.trim();
    if !refinement.is_empty() {
        let name = genre_reference(refinement)
            .map(str::to_string)
            .unwrap_or_else(|| refinement.to_string());
        if !genres.contains(&name) {
            genres.push(name);
        }
    }
    genres
}

fn genre_reference(reference: &str) -> Option<&'static str> {
    match reference {
        "RX" => Some("Remix"),
        "CR" => Some("Cover"),
        digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse::<u8>().ok().and_then(genre_name)
        }
        _ => None,
    }
}

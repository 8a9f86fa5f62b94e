// ID3v1 tag implementation

use crate::error::Result;
use crate::metadata::{MetadataCollector, TagValue};
use crate::utils::encoding::decode_latin1;
use crate::utils::io::{ignore_exact, read_array, ByteSource};

pub const FORMAT_ID: &str = "id3v1";

/// ID3v1 tag structure
#[derive(Debug, Default, PartialEq)]
pub struct Id3v1Tag {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub comment: String,
    pub track: Option<u8>,
    pub genre: u8,
}

impl Id3v1Tag {
    pub const TAG_SIZE: usize = 128;
    const TAG_ID: [u8; 3] = [b'T', b'A', b'G'];

    /// Parse a 128-byte trailer; `None` when it does not start with "TAG"
    pub fn parse(buffer: &[u8; 128]) -> Option<Self> {
        if buffer[0..3] != Self::TAG_ID {
            return None;
        }

        // ID3v1.1 steals the last two comment bytes for a track number
        let (comment, track) = if buffer[125] == 0 && buffer[126] != 0 {
            (Self::parse_string(&buffer[97..125]), Some(buffer[126]))
        } else {
            (Self::parse_string(&buffer[97..127]), None)
        };

        Some(Id3v1Tag {
            title: Self::parse_string(&buffer[3..33]),
            artist: Self::parse_string(&buffer[33..63]),
            album: Self::parse_string(&buffer[63..93]),
            year: Self::parse_string(&buffer[93..97]),
            comment,
            track,
            genre: buffer[127],
        })
    }

    /// Null-terminated, space-padded ISO-8859-1
    fn parse_string(bytes: &[u8]) -> String {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        decode_latin1(&bytes[..end]).trim().to_string()
    }

    /// Emit the non-empty fields as "id3v1" tags
    pub fn add_to(&self, metadata: &mut MetadataCollector) {
        let fields = [
            ("title", &self.title),
            ("artist", &self.artist),
            ("album", &self.album),
            ("year", &self.year),
            ("comment", &self.comment),
        ];
        for (id, value) in fields {
            if !value.is_empty() {
                metadata.add_tag(FORMAT_ID, id, TagValue::Text(value.clone()));
            }
        }
        if let Some(track) = self.track {
            metadata.add_tag(FORMAT_ID, "track", TagValue::Text(track.to_string()));
        }
        if let Some(genre) = genre_name(self.genre) {
            metadata.add_tag(FORMAT_ID, "genre", TagValue::Text(genre.to_string()));
        }
    }
}

/// Skip forward to the last 128 bytes of the stream and parse an ID3v1 tag
/// there, if any.
///
/// Needs a known stream size. Returns whether a tag was found; the source is
/// left at the end of the stream either way.
pub fn read_trailer(source: &mut dyn ByteSource, metadata: &mut MetadataCollector) -> Result<bool> {
    let Some(remaining) = source.remaining() else {
        return Ok(false);
    };
    if remaining < Id3v1Tag::TAG_SIZE as u64 {
        return Ok(false);
    }
    ignore_exact(source, remaining - Id3v1Tag::TAG_SIZE as u64)?;
    let buffer = read_array::<128, _>(source)?;
    match Id3v1Tag::parse(&buffer) {
        Some(tag) => {
            log::debug!("ID3v1 trailer found");
            tag.add_to(metadata);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Genre name for an ID3v1 genre index (Winamp extensions included)
pub fn genre_name(index: u8) -> Option<&'static str> {
    GENRES.get(index as usize).copied()
}

const GENRES: &[&str] = &[
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop",
    "Jazz", "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap",
    "Reggae", "Rock", "Techno", "Industrial", "Alternative", "Ska", "Death Metal", "Pranks",
    "Soundtrack", "Euro-Techno", "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance",
    "Classical", "Instrumental", "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise",
    "Alt. Rock", "Bass", "Soul", "Punk", "Space", "Meditative", "Instrumental Pop", "Instrumental Rock",
    "Ethnic", "Gothic", "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
    "Southern Rock", "Comedy", "Cult", "Gangsta Rap", "Top 40", "Christian Rap", "Pop/Funk", "Jungle",
    "Native American", "Cabaret", "New Wave", "Psychedelic", "Rave", "Showtunes", "Trailer", "Lo-Fi",
    "Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll", "Hard Rock",
    "Folk", "Folk/Rock", "National Folk", "Swing", "Fast-Fusion", "Bebop", "Latin", "Revival",
    "Celtic", "Bluegrass", "Avantgarde", "Gothic Rock", "Progressive Rock", "Psychedelic Rock", "Symphonic Rock", "Slow Rock",
    "Big Band", "Chorus", "Easy Listening", "Acoustic", "Humour", "Speech", "Chanson", "Opera",
    "Chamber Music", "Sonata", "Symphony", "Booty Bass", "Primus", "Porn Groove", "Satire", "Slow Jam",
    "Club", "Tango", "Samba", "Folklore", "Ballad", "Power Ballad", "Rhythmic Soul", "Freestyle",
    "Duet", "Punk Rock", "Drum Solo", "A Cappella", "Euro-House", "Dance Hall", "Goa", "Drum & Bass",
    "Club-House", "Hardcore", "Terror", "Indie", "BritPop", "Negerpunk", "Polsk Punk", "Beat",
    "Christian Gangsta Rap", "Heavy Metal", "Black Metal", "Crossover", "Contemporary Christian", "Christian Rock", "Merengue", "Salsa",
    "Thrash Metal", "Anime", "JPop", "Synthpop", "Abstract", "Art Rock", "Baroque", "Bhangra",
    "Big Beat", "Breakbeat", "Chillout", "Downtempo", "Dub", "EBM", "Eclectic", "Electro",
    "Electroclash", "Emo", "Experimental", "Garage", "Global", "IDM", "Illbient", "Industro-Goth",
    "Jam Band", "Krautrock", "Leftfield", "Lounge", "Math Rock", "New Romantic", "Nu-Breakz", "Post-Punk",
    "Post-Rock", "Psytrance", "Shoegaze", "Space Rock", "Trop Rock", "World Music", "Neoclassical", "Audiobook",
    "Audio Theatre", "Neue Deutsche Welle", "Podcast", "Indie Rock", "G-Funk", "Dubstep", "Garage Rock", "Psybient",
];

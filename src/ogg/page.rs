// OGG page header and segment table

use crate::error::{Error, Result};
use crate::utils::io::{read_array, read_vec, ByteSource};

/// OGG capture pattern
pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";
pub const PAGE_HEADER_SIZE: usize = 27;

/// Granule position of a page on which no packet ends
pub const NO_GRANULE: u64 = u64::MAX;

/// Header type flags
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeaderType {
    /// The first packet on this page continues one from the previous page
    pub continued: bool,
    /// Beginning of a logical stream
    pub first_page: bool,
    /// End of a logical stream
    pub last_page: bool,
}

impl HeaderType {
    pub fn from_byte(byte: u8) -> Self {
        HeaderType {
            continued: byte & 0x01 != 0,
            first_page: byte & 0x02 != 0,
            last_page: byte & 0x04 != 0,
        }
    }
}

/// OGG Page Header
#[derive(Debug, Clone, PartialEq)]
pub struct PageHeader {
    pub version: u8,
    pub header_type: HeaderType,
    pub granule_position: u64,
    pub serial: u32,
    pub sequence: u32,
    pub checksum: u32,
    pub segment_table: Vec<u8>,
}

/// One packet, or packet fragment, within a page payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketSpan {
    pub len: usize,
    /// False when the packet continues on the next page
    pub complete: bool,
}

impl PageHeader {
    /// Read the fixed header and the segment table
    pub fn read(source: &mut dyn ByteSource) -> Result<Self> {
        let header = read_array::<PAGE_HEADER_SIZE, _>(source)?;

        if &header[0..4] != OGG_SIGNATURE {
            return Err(Error::content("ogg", "invalid page capture pattern"));
        }
        let version = header[4];
        if version != 0 {
            return Err(Error::content("ogg", format!("unsupported page version {}", version)));
        }

        let le32 = |at: usize| u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]]);
        let mut granule = [0u8; 8];
        granule.copy_from_slice(&header[6..14]);

        let segment_count = header[26] as usize;
        let segment_table = read_vec(source, segment_count)?;

        Ok(PageHeader {
            version,
            header_type: HeaderType::from_byte(header[5]),
            granule_position: u64::from_le_bytes(granule),
            serial: le32(14),
            sequence: le32(18),
            checksum: le32(22),
            segment_table,
        })
    }

    /// Total page payload size from the segment table
    pub fn data_size(&self) -> usize {
        self.segment_table.iter().map(|&x| x as usize).sum()
    }

    /// Granule position, unless no packet ends on this page
    pub fn granule(&self) -> Option<u64> {
        (self.granule_position != NO_GRANULE).then_some(self.granule_position)
    }

    pub fn packets(&self) -> Vec<PacketSpan> {
        split_packets(&self.segment_table)
    }
}

/// Lace segments into packets: a 255 segment continues the packet, anything
/// shorter ends it. A trailing 255 leaves the last packet incomplete.
pub fn split_packets(segment_table: &[u8]) -> Vec<PacketSpan> {
    let mut spans = Vec::new();
    let mut len = 0usize;
    for &segment in segment_table {
        len += segment as usize;
        if segment < 255 {
            spans.push(PacketSpan { len, complete: true });
            len = 0;
        }
    }
    if segment_table.last() == Some(&255) {
        spans.push(PacketSpan { len, complete: false });
    }
    spans
}

// Byte source abstraction and I/O helpers for reading audio files
//
// Every parser drives a `ByteSource` strictly forward. The only look-ahead
// is `peek`, which buffers bytes without advancing the position.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

const SKIP_CHUNK: usize = 64 * 1024;

/// Sequential reader with non-consuming look-ahead and position tracking.
///
/// `Read::read_exact` failing with `UnexpectedEof` means the stream ended;
/// any other error is a genuine I/O failure.
pub trait ByteSource: Read {
    /// Copy up to `buf.len()` upcoming bytes without consuming them.
    /// Returns fewer bytes only when the stream ends first.
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Skip `count` bytes. Returns the number actually skipped.
    fn ignore(&mut self, count: u64) -> io::Result<u64>;

    /// Offset of the next byte to be read.
    fn position(&self) -> u64;

    /// Total length of the underlying stream, when known.
    fn total_size(&self) -> Option<u64>;

    /// Bytes left before the end of the stream, when the size is known.
    fn remaining(&self) -> Option<u64> {
        self.total_size()
            .map(|size| size.saturating_sub(self.position()))
    }
}

/// `ByteSource` over any `Read`, with an internal look-ahead buffer.
pub struct StreamSource<R> {
    inner: R,
    peeked: Vec<u8>,
    position: u64,
    total_size: Option<u64>,
}

impl<R: Read> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        StreamSource {
            inner,
            peeked: Vec::new(),
            position: 0,
            total_size: None,
        }
    }

    /// Attach a known stream length (enables trailer probes and bitrate estimates)
    pub fn with_size(mut self, size: u64) -> Self {
        self.total_size = Some(size);
        self
    }

    /// Pull from the inner reader until `want` bytes are buffered or EOF
    fn fill_peek(&mut self, want: usize) -> io::Result<()> {
        let mut chunk = [0u8; 4096];
        while self.peeked.len() < want {
            let n = (want - self.peeked.len()).min(chunk.len());
            match self.inner.read(&mut chunk[..n]) {
                Ok(0) => break,
                Ok(read) => self.peeked.extend_from_slice(&chunk[..read]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<'a> StreamSource<Cursor<&'a [u8]>> {
    /// Source over an in-memory buffer
    pub fn from_bytes(data: &'a [u8]) -> Self {
        StreamSource::new(Cursor::new(data)).with_size(data.len() as u64)
    }
}

impl StreamSource<io::BufReader<File>> {
    /// Open a file as a source, recording its size
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(StreamSource::new(io::BufReader::new(file)).with_size(size))
    }
}

impl<R: Read> Read for StreamSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = if !self.peeked.is_empty() {
            let n = buf.len().min(self.peeked.len());
            buf[..n].copy_from_slice(&self.peeked[..n]);
            self.peeked.drain(..n);
            n
        } else {
            self.inner.read(buf)?
        };
        self.position += read as u64;
        Ok(read)
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill_peek(buf.len())?;
        let n = buf.len().min(self.peeked.len());
        buf[..n].copy_from_slice(&self.peeked[..n]);
        Ok(n)
    }

    fn ignore(&mut self, count: u64) -> io::Result<u64> {
        let from_peek = (count as usize).min(self.peeked.len());
        self.peeked.drain(..from_peek);
        let mut skipped = from_peek as u64;

        let mut scratch = vec![0u8; SKIP_CHUNK.min((count - skipped) as usize)];
        while skipped < count {
            let n = ((count - skipped) as usize).min(scratch.len());
            match self.inner.read(&mut scratch[..n]) {
                Ok(0) => break,
                Ok(read) => skipped += read as u64,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.position += skipped;
        Ok(skipped)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn total_size(&self) -> Option<u64> {
        self.total_size
    }
}

/// Peek up to `len` bytes; the result is shorter only at end of stream
pub fn peek_vec<S: ByteSource + ?Sized>(source: &mut S, len: usize) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0u8; len];
    let n = source.peek(&mut buffer)?;
    buffer.truncate(n);
    Ok(buffer)
}

/// Skip exactly `count` bytes or fail with `UnexpectedEof`
pub fn ignore_exact<S: ByteSource + ?Sized>(source: &mut S, count: u64) -> io::Result<()> {
    let skipped = source.ignore(count)?;
    if skipped < count {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("wanted to skip {} bytes, stream ended after {}", count, skipped),
        ));
    }
    Ok(())
}

/// Read up to `len` bytes; the result is shorter only at end of stream
pub fn read_up_to<R: Read + ?Sized>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(len.min(SKIP_CHUNK));
    reader.take(len as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Read exactly `len` bytes without trusting `len` for the allocation
pub fn read_vec<R: Read + ?Sized>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let buffer = read_up_to(reader, len)?;
    if buffer.len() < len {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(buffer)
}

/// Read a fixed-size array
pub fn read_array<const N: usize, R: Read + ?Sized>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut buffer = [0u8; N];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

pub fn read_u8<R: Read + ?Sized>(reader: &mut R) -> io::Result<u8> {
    Ok(read_array::<1, R>(reader)?[0])
}

/// Read big-endian 16-bit integer
pub fn read_be_u16<R: Read + ?Sized>(reader: &mut R) -> io::Result<u16> {
    Ok(u16::from_be_bytes(read_array(reader)?))
}

/// Read big-endian 32-bit integer
pub fn read_be_u32<R: Read + ?Sized>(reader: &mut R) -> io::Result<u32> {
    Ok(u32::from_be_bytes(read_array(reader)?))
}

/// Read little-endian 32-bit integer
pub fn read_le_u32<R: Read + ?Sized>(reader: &mut R) -> io::Result<u32> {
    Ok(u32::from_le_bytes(read_array(reader)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_does_not_consume() {
        let data = [1u8, 2, 3, 4, 5];
        let mut source = StreamSource::from_bytes(&data);

        assert_eq!(peek_vec(&mut source, 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(source.position(), 0);
        assert_eq!(read_u8(&mut source).unwrap(), 1);
        assert_eq!(read_be_u16(&mut source).unwrap(), 0x0203);
        assert_eq!(source.position(), 3);
        assert_eq!(source.remaining(), Some(2));
    }

    #[test]
    fn test_ignore_crosses_peek_buffer() {
        let data: Vec<u8> = (0..100).collect();
        let mut source = StreamSource::new(Cursor::new(data.clone()));

        peek_vec(&mut source, 10).unwrap();
        assert_eq!(source.ignore(20).unwrap(), 20);
        assert_eq!(read_u8(&mut source).unwrap(), 20);
        assert_eq!(source.ignore(1000).unwrap(), 79);
        assert_eq!(source.position(), 100);
    }

    #[test]
    fn test_short_stream_is_unexpected_eof() {
        let data = [0u8; 3];
        let mut source = StreamSource::from_bytes(&data);
        let err = read_be_u32(&mut source).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let mut source = StreamSource::from_bytes(&data);
        assert!(ignore_exact(&mut source, 4).is_err());
        assert_eq!(peek_vec(&mut source, 8).unwrap().len(), 0);
    }

    #[test]
    fn test_read_vec_and_little_endian() {
        let data = [0x01, 0x00, 0x00, 0x00, 0xAA, 0xBB];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(read_le_u32(&mut cursor).unwrap(), 1);
        assert_eq!(read_vec(&mut cursor, 2).unwrap(), vec![0xAA, 0xBB]);
        assert!(read_vec(&mut cursor, 1).is_err());
    }
}

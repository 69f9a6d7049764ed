use std::hash::{BuildHasher, Hasher};
use std::io::{self, Read};

use hashbrown::HashMap;

/// Hash map keyed by n-gram text.
///
/// The hasher is unseeded, so iteration order only depends on the inserted keys.
pub type FeatureMap<V> = HashMap<String, V, SplitMix64Builder>;

// Copied from https://prng.di.unimi.it/splitmix64.c
pub struct SplitMix64 {
    x: u64,
}

impl SplitMix64 {
    #[inline(always)]
    fn add(&mut self, i: u64) {
        self.x ^= i;
        self.x = self.x.wrapping_add(0x9e3779b97f4a7c15);
        self.x = (self.x ^ (self.x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        self.x = (self.x ^ (self.x >> 27)).wrapping_mul(0x94d049bb133111eb);
        self.x = self.x ^ (self.x >> 31);
    }
}

impl Hasher for SplitMix64 {
    #[inline(always)]
    fn finish(&self) -> u64 {
        self.x
    }

    #[inline(always)]
    fn write(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            let mut word = [0; 8];
            word.copy_from_slice(chunk);
            self.add(u64::from_le_bytes(word));
        }
        for &i in chunks.remainder() {
            self.add(u64::from(i));
        }
    }

    #[inline(always)]
    fn write_u8(&mut self, i: u8) {
        self.add(u64::from(i));
    }

    #[inline(always)]
    fn write_u32(&mut self, i: u32) {
        self.add(u64::from(i));
    }

    #[inline(always)]
    fn write_u64(&mut self, i: u64) {
        self.add(i);
    }

    #[inline(always)]
    fn write_usize(&mut self, i: usize) {
        self.add(i as u64);
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SplitMix64Builder;

impl BuildHasher for SplitMix64Builder {
    type Hasher = SplitMix64;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        SplitMix64 { x: 0 }
    }
}

const READ_CHUNK_SIZE: usize = 8192;

/// Streams the characters of a UTF-8 byte source.
///
/// The source is decoded chunk by chunk and never read as a whole. Multi-byte sequences that
/// straddle two reads are carried over to the next chunk.
///
/// An iterator cannot return errors, so the first I/O or decoding error ends the stream and is
/// kept until [`ReadChars::take_error()`] is called. Characters preceding an invalid sequence are
/// still yielded.
///
/// # Examples
///
/// ```
/// use gramcat::ReadChars;
///
/// let mut chars = ReadChars::new("añb".as_bytes());
/// assert_eq!("añb", (&mut chars).collect::<String>());
/// assert!(chars.take_error().is_none());
/// ```
pub struct ReadChars<R> {
    rdr: R,
    carry: Vec<u8>,
    decoded: Vec<char>,
    pos: usize,
    pending_error: Option<io::Error>,
    error: Option<io::Error>,
    finished: bool,
}

impl<R> ReadChars<R>
where
    R: Read,
{
    /// Creates a character stream over `rdr`.
    pub fn new(rdr: R) -> Self {
        Self {
            rdr,
            carry: vec![],
            decoded: vec![],
            pos: 0,
            pending_error: None,
            error: None,
            finished: false,
        }
    }

    /// Takes the error that terminated the stream, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn refill(&mut self) -> io::Result<bool> {
        if let Some(e) = self.pending_error.take() {
            return Err(e);
        }
        let mut chunk = [0; READ_CHUNK_SIZE];
        loop {
            let n = match self.rdr.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                if !self.carry.is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "stream ended inside a UTF-8 sequence",
                    ));
                }
                return Ok(false);
            }
            self.carry.extend_from_slice(&chunk[..n]);
            let valid_len = match std::str::from_utf8(&self.carry) {
                Ok(s) => s.len(),
                Err(e) if e.error_len().is_none() => e.valid_up_to(),
                // The valid prefix is emitted before the error is reported.
                Err(e) => {
                    self.pending_error = Some(io::Error::new(io::ErrorKind::InvalidData, e));
                    e.valid_up_to()
                }
            };
            let text = std::str::from_utf8(&self.carry[..valid_len])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.decoded.clear();
            self.decoded.extend(text.chars());
            self.pos = 0;
            self.carry.drain(..valid_len);
            if !self.decoded.is_empty() {
                return Ok(true);
            }
            if let Some(e) = self.pending_error.take() {
                return Err(e);
            }
        }
    }
}

impl<R> Iterator for ReadChars<R>
where
    R: Read,
{
    type Item = char;

    fn next(&mut self) -> Option<char> {
        while self.pos >= self.decoded.len() {
            if self.finished {
                return None;
            }
            match self.refill() {
                Ok(true) => (),
                Ok(false) => {
                    self.finished = true;
                }
                Err(e) => {
                    self.error = Some(e);
                    self.finished = true;
                }
            }
        }
        let c = self.decoded[self.pos];
        self.pos += 1;
        Some(c)
    }
}

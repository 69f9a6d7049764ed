use std::io::Read;
use std::str::Chars;

use crate::errors::{GramcatError, Result};
use crate::ring_buffer::RingBuffer;
use crate::utils::ReadChars;

/// Character wrapped around every word before n-grams are extracted.
pub const BOUNDARY_MARKER: char = '_';

/// Largest accepted maximum n-gram length.
pub const MAX_NGRAM_LENGTH: usize = u8::MAX as usize;

/// Character n-gram generator.
///
/// Every word of the input (a maximal run of letters) is lowercased and wrapped by
/// [`BOUNDARY_MARKER`], and all its substrings of length `1..=max_ngram_length` are generated,
/// except the bare marker. Non-letter characters, digits included, only separate words.
///
/// # Examples
///
/// ```
/// use gramcat::NgramGenerator;
///
/// let generator = NgramGenerator::new(3).unwrap();
/// let ngrams: Vec<String> = generator.features_from_str("Ab!").collect();
/// assert_eq!(vec!["a", "_a", "b", "ab", "_ab", "b_", "ab_"], ngrams);
/// ```
#[derive(Clone, Debug)]
pub struct NgramGenerator {
    max_ngram_length: usize,
    max_lines: Option<u64>,
}

impl NgramGenerator {
    /// Creates a new generator.
    ///
    /// # Arguments
    ///
    /// * `max_ngram_length` - The maximum length of n-grams in characters.
    ///
    /// # Errors
    ///
    /// If `max_ngram_length` is zero or greater than [`MAX_NGRAM_LENGTH`], an error variant will
    /// be returned.
    pub fn new(max_ngram_length: usize) -> Result<Self> {
        if max_ngram_length == 0 {
            return Err(GramcatError::invalid_argument(
                "max_ngram_length",
                "must be a positive integer",
            ));
        }
        if max_ngram_length > MAX_NGRAM_LENGTH {
            return Err(GramcatError::invalid_argument(
                "max_ngram_length",
                "must not be greater than 255",
            ));
        }
        Ok(Self {
            max_ngram_length,
            max_lines: None,
        })
    }

    /// Stops reading the input as soon as the given number of line breaks has been seen.
    ///
    /// `\r`, `\n` and `\r\n` each count as one line break.
    pub fn max_lines(mut self, max_lines: u64) -> Self {
        self.max_lines = Some(max_lines);
        self
    }

    pub fn max_ngram_length(&self) -> usize {
        self.max_ngram_length
    }

    pub fn get_max_lines(&self) -> Option<u64> {
        self.max_lines
    }

    /// Generates n-grams from a character sequence.
    pub fn features<I>(&self, chars: I) -> Ngrams<I::IntoIter>
    where
        I: IntoIterator<Item = char>,
    {
        Ngrams {
            chars: chars.into_iter(),
            buffer: RingBuffer::new(self.max_ngram_length),
            snapshot: Vec::with_capacity(self.max_ngram_length),
            next_len: 0,
            max_lines: self.max_lines,
            n_lines: 0,
            prev_char: None,
            inside_word: false,
            finished: false,
        }
    }

    /// Generates n-grams from a string.
    pub fn features_from_str<'a>(&self, text: &'a str) -> Ngrams<Chars<'a>> {
        self.features(text.chars())
    }

    /// Generates n-grams from a UTF-8 byte source.
    ///
    /// The reader is consumed lazily. Decoding errors end the sequence and can be retrieved from
    /// the [`ReadChars`] passed in afterwards; see [`ReadChars::take_error()`].
    pub fn features_from_reader<'a, R>(
        &self,
        chars: &'a mut ReadChars<R>,
    ) -> Ngrams<&'a mut ReadChars<R>>
    where
        R: Read,
    {
        self.features(chars)
    }
}

/// Lazy sequence of n-grams. Created by [`NgramGenerator`].
pub struct Ngrams<I> {
    chars: I,
    buffer: RingBuffer<char>,
    snapshot: Vec<char>,
    next_len: usize,
    max_lines: Option<u64>,
    n_lines: u64,
    prev_char: Option<char>,
    inside_word: bool,
    finished: bool,
}

impl<I> Ngrams<I>
where
    I: Iterator<Item = char>,
{
    #[inline(always)]
    fn is_separator(c: char) -> bool {
        !c.is_alphabetic()
    }

    #[inline(always)]
    fn lowercase(c: char) -> char {
        c.to_lowercase().next().unwrap_or(c)
    }

    fn push(&mut self, c: char) {
        self.buffer.push(c);
    }

    fn take_snapshot(&mut self) {
        self.buffer
            .copy_last(self.buffer.capacity(), &mut self.snapshot);
        self.next_len = 1;
    }

    /// Reads input until new n-grams are available or the input is exhausted.
    fn advance(&mut self) {
        while !self.finished {
            let Some(c) = self.chars.next() else {
                self.finish();
                return;
            };
            if c == '\r' || (c == '\n' && self.prev_char != Some('\r')) {
                self.n_lines += 1;
            }
            if self.max_lines.map_or(false, |max| self.n_lines >= max) {
                self.finish();
                return;
            }
            self.prev_char = Some(c);

            if Self::is_separator(c) {
                if self.inside_word {
                    self.inside_word = false;
                    self.push(BOUNDARY_MARKER);
                    self.take_snapshot();
                    // The closed word never leaks into the next one.
                    self.buffer.clear();
                    return;
                }
            } else {
                if !self.inside_word {
                    self.inside_word = true;
                    self.push(BOUNDARY_MARKER);
                }
                self.push(Self::lowercase(c));
                self.take_snapshot();
                return;
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        if self.inside_word {
            self.inside_word = false;
            self.push(BOUNDARY_MARKER);
            self.take_snapshot();
            self.buffer.clear();
        }
    }
}

/// Returns the suffix of `snapshot` with the given length, unless it is the bare marker.
fn suffix(snapshot: &[char], len: usize) -> Option<String> {
    let start = snapshot.len().checked_sub(len)?;
    let ngram = &snapshot[start..];
    if ngram == [BOUNDARY_MARKER] {
        return None;
    }
    Some(ngram.iter().collect())
}

impl<I> Iterator for Ngrams<I>
where
    I: Iterator<Item = char>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            while self.next_len != 0 && self.next_len <= self.snapshot.len() {
                let len = self.next_len;
                self.next_len += 1;
                if let Some(ngram) = suffix(&self.snapshot, len) {
                    return Some(ngram);
                }
            }
            self.next_len = 0;
            if self.finished {
                return None;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    fn ngram_set(n: usize, text: &str) -> HashSet<String> {
        NgramGenerator::new(n)
            .unwrap()
            .features_from_str(text)
            .collect()
    }

    #[test]
    fn test_zero_length_is_rejected() {
        let result = NgramGenerator::new(0);

        assert!(result.is_err());
        assert_eq!(
            "InvalidArgumentError: max_ngram_length: must be a positive integer",
            &result.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_too_long_length_is_rejected() {
        assert!(NgramGenerator::new(MAX_NGRAM_LENGTH).is_ok());

        let result = NgramGenerator::new(MAX_NGRAM_LENGTH + 1);
        assert!(matches!(result, Err(GramcatError::InvalidArgument(_))));
    }

    #[test]
    fn test_quick_brown_fox() {
        let expected: HashSet<String> = [
            "t", "_t", "h", "th", "_th", "e", "he", "the", "_the", "e_", "he_", "the_", "_the_",
            "q", "_q", "u", "qu", "_qu", "i", "ui", "qui", "_qui", "c", "ic", "uic", "quic",
            "_quic", "k", "ck", "ick", "uick", "quick", "k_", "ck_", "ick_", "uick_", "b", "_b",
            "r", "br", "_br", "o", "ro", "bro", "_bro", "w", "ow", "row", "brow", "_brow", "n",
            "wn", "own", "rown", "brown", "n_", "wn_", "own_", "rown_", "f", "_f", "o", "fo",
            "_fo", "x", "ox", "fox", "_fox", "x_", "ox_", "fox_", "_fox_",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(expected, ngram_set(5, "The quick brown fox"));
    }

    #[test]
    fn test_emission_order() {
        let ngrams: Vec<String> = NgramGenerator::new(3)
            .unwrap()
            .features_from_str("ab")
            .collect();

        assert_eq!(vec!["a", "_a", "b", "ab", "_ab", "b_", "ab_"], ngrams);
    }

    #[test]
    fn test_max_lines() {
        let ngrams = NgramGenerator::new(1)
            .unwrap()
            .max_lines(5)
            .features_from_str("abcdef\rghjjk\nlmn\nopq\r\nrstu\r\nvwxyz")
            .collect::<HashSet<_>>();

        for c in "abcdefghjklmnopqrstu".chars() {
            assert!(ngrams.contains(&c.to_string()), "missing {c}");
        }
        for c in "vwxyz".chars() {
            assert!(!ngrams.contains(&c.to_string()), "unexpected {c}");
        }
    }

    #[test]
    fn test_max_lines_one_drops_trailing_lines() {
        let ngrams = NgramGenerator::new(3)
            .unwrap()
            .max_lines(1)
            .features_from_str("first line\nsecond line\r\nthird")
            .collect::<HashSet<_>>();

        assert!(ngrams.contains("ne_"));
        for ngram in &ngrams {
            for c in "codh".chars() {
                assert!(!ngram.contains(c), "{ngram} contains {c}");
            }
        }
    }

    #[test]
    fn test_max_lines_zero_reads_nothing() {
        let count = NgramGenerator::new(3)
            .unwrap()
            .max_lines(0)
            .features_from_str("abc")
            .count();

        assert_eq!(0, count);
    }

    #[test]
    fn test_crlf_counts_once() {
        let ngrams = NgramGenerator::new(1)
            .unwrap()
            .max_lines(2)
            .features_from_str("a\r\nb\rc\nd")
            .collect::<HashSet<_>>();

        assert!(ngrams.contains("a"));
        assert!(ngrams.contains("b"));
        assert!(!ngrams.contains("c"));
        assert!(!ngrams.contains("d"));
    }

    #[test]
    fn test_empty_input() {
        assert!(ngram_set(5, "").is_empty());
    }

    #[test]
    fn test_single_non_letter() {
        assert!(ngram_set(5, "7").is_empty());
        assert!(ngram_set(5, " ").is_empty());
    }

    #[test]
    fn test_consecutive_separators() {
        let ngrams: Vec<String> = NgramGenerator::new(3)
            .unwrap()
            .features_from_str("a ,,  \t1 b")
            .collect();

        assert_eq!(vec!["a", "_a", "a_", "_a_", "b", "_b", "b_", "_b_"], ngrams);
    }

    #[test]
    fn test_digits_are_separators() {
        assert_eq!(ngram_set(5, "ab cd"), ngram_set(5, "ab1cd"));
    }

    #[test]
    fn test_no_bare_marker_and_length_bound() {
        let text = "Zwölf Boxkämpfer jagen Viktor quer über den großen Sylter Deich, 2024!";
        for n in 1..=6 {
            for ngram in NgramGenerator::new(n).unwrap().features_from_str(text) {
                assert_ne!("_", ngram);
                let len = ngram.chars().count();
                assert!(len >= 1 && len <= n, "{ngram} for n={n}");
            }
        }
    }

    #[test]
    fn test_lowercase() {
        let ngrams = ngram_set(2, "ÀB");

        assert!(ngrams.contains("àb"));
        assert!(!ngrams.iter().any(|s| s.chars().any(char::is_uppercase)));
    }

    #[test]
    fn test_long_word_does_not_corrupt_ngrams() {
        let word: String = "abcdefghij".repeat(10);
        let wrapped = format!("_{word}_");
        let wrapped: Vec<char> = wrapped.chars().collect();
        let mut expected = HashSet::new();
        for len in 1..=4 {
            for w in wrapped.windows(len) {
                if w != ['_'] {
                    expected.insert(w.iter().collect::<String>());
                }
            }
        }

        assert_eq!(expected, ngram_set(4, &format!("  {word}.")));
    }

    #[test]
    fn test_words_are_independent() {
        let ngrams = ngram_set(4, "ab cd");

        assert!(!ngrams.iter().any(|s| s.contains('b') && s.contains('c')));
    }

    #[test]
    fn test_max_length_one() {
        let ngrams: Vec<String> = NgramGenerator::new(1)
            .unwrap()
            .features_from_str("hi you")
            .collect();

        assert_eq!(vec!["h", "i", "y", "o", "u"], ngrams);
    }

    #[test]
    fn test_features_from_reader() {
        let generator = NgramGenerator::new(5).unwrap();
        let mut chars = ReadChars::new("The quick brown fox".as_bytes());
        let from_reader: HashSet<String> = generator.features_from_reader(&mut chars).collect();

        assert!(chars.take_error().is_none());
        assert_eq!(ngram_set(5, "The quick brown fox"), from_reader);
    }
}

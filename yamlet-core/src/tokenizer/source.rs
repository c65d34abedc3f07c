use memchr::memchr2;

use crate::tokenizer::char_utils::{
    is_alpha, is_blank, is_blank_or_break, is_blank_or_breakz, is_break, is_flow,
};

/// A forward-only source of input bytes with a small bounded lookahead
/// window. The scanner requires nothing else of its input: no seeking, no
/// rewinding, only `peek`/`skip` plus a handful of derived classifiers.
///
/// Positions past the end of input read as `0`, which no YAML document may
/// contain; the scanner treats `0` as the end-of-stream sentinel.
pub trait Source {
    /// Byte at `n` positions ahead of the cursor, `0` at or past EOF.
    #[must_use]
    fn peek_nth(&self, n: usize) -> u8;

    /// Advance the cursor by `n` bytes.
    fn skip(&mut self, n: usize);

    #[must_use]
    fn is_eof(&self) -> bool;

    /// Append everything up to (excluding) the next line break or EOF to
    /// `out`, advancing past it. Returns the number of bytes consumed.
    fn read_to_break(&mut self, out: &mut Vec<u8>) -> usize;

    /// Advance past everything up to (excluding) the next line break or
    /// EOF. Returns the number of bytes consumed.
    fn skip_to_break(&mut self) -> usize;

    #[must_use]
    fn peek(&self) -> u8 {
        self.peek_nth(0)
    }

    fn next_is(&self, c: u8) -> bool {
        self.peek() == c
    }

    #[must_use]
    fn peek_two(&self) -> [u8; 2] {
        [self.peek_nth(0), self.peek_nth(1)]
    }

    fn next_is_three(&self, c: u8) -> bool {
        self.peek_nth(0) == c && self.peek_nth(1) == c && self.peek_nth(2) == c
    }

    #[must_use]
    fn next_is_blank(&self) -> bool {
        is_blank(self.peek())
    }

    #[must_use]
    fn next_is_break(&self) -> bool {
        is_break(self.peek())
    }

    #[must_use]
    fn next_is_breakz(&self) -> bool {
        is_break(self.peek()) || self.peek() == b'\0'
    }

    #[must_use]
    fn next_is_blank_or_break(&self) -> bool {
        is_blank_or_break(self.peek())
    }

    #[must_use]
    fn next_is_blank_or_breakz(&self) -> bool {
        is_blank_or_breakz(self.peek())
    }

    #[must_use]
    fn next_is_flow(&self) -> bool {
        is_flow(self.peek())
    }

    #[must_use]
    fn next_is_alpha(&self) -> bool {
        is_alpha(self.peek())
    }

    /// `---` or `...` followed by a blank, break or EOF.
    fn next_is_document_indicator(&self) -> bool {
        (self.next_is_three(b'-') || self.next_is_three(b'.'))
            && is_blank_or_breakz(self.peek_nth(3))
    }

    /// Whether the byte under the cursor may continue a plain scalar.
    /// See 7.3.3. Plain Style: `:` ends one before a blank (or a flow
    /// indicator inside a flow collection), and flow indicators end one
    /// inside a flow collection.
    fn next_can_be_plain_scalar(&self, in_flow: bool) -> bool {
        let nc = self.peek_nth(1);
        match self.peek() {
            b':' if is_blank_or_breakz(nc) || (in_flow && is_flow(nc)) => false,
            c if in_flow && is_flow(c) => false,
            _ => true,
        }
    }

    /// Fetch consecutive word characters into `out`, returning the count.
    fn read_while_alpha(&mut self, out: &mut Vec<u8>) -> usize {
        let mut n_chars = 0;
        while is_alpha(self.peek()) {
            out.push(self.peek());
            self.skip(1);
            n_chars += 1;
        }
        n_chars
    }

    /// Skip consecutive spaces and tabs, returning the count.
    fn skip_while_blank(&mut self) -> usize {
        let mut n_chars = 0;
        while is_blank(self.peek()) {
            self.skip(1);
            n_chars += 1;
        }
        n_chars
    }
}

/// In-memory [`Source`] over a `&str`.
pub struct StrSource<'input> {
    input: &'input [u8],
    pos: usize,
}

impl<'input> StrSource<'input> {
    #[must_use]
    pub fn new(input: &'input str) -> StrSource<'input> {
        StrSource {
            input: input.as_bytes(),
            pos: 0,
        }
    }
}

impl<'input> From<&'input str> for StrSource<'input> {
    fn from(value: &'input str) -> Self {
        StrSource::new(value)
    }
}

impl Source for StrSource<'_> {
    fn peek_nth(&self, n: usize) -> u8 {
        self.input.get(self.pos + n).copied().unwrap_or(0)
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn read_to_break(&mut self, out: &mut Vec<u8>) -> usize {
        let rest = &self.input[self.pos.min(self.input.len())..];
        let len = memchr2(b'\r', b'\n', rest).unwrap_or(rest.len());
        out.extend_from_slice(&rest[..len]);
        self.pos += len;
        len
    }

    fn skip_to_break(&mut self) -> usize {
        let rest = &self.input[self.pos.min(self.input.len())..];
        let len = memchr2(b'\r', b'\n', rest).unwrap_or(rest.len());
        self.pos += len;
        len
    }
}

#[cfg(test)]
mod test {
    use super::{Source, StrSource};

    #[test]
    fn peeking_past_the_end_reads_zero() {
        let src = StrSource::new("ab");
        assert_eq!(src.peek_nth(0), b'a');
        assert_eq!(src.peek_nth(1), b'b');
        assert_eq!(src.peek_nth(2), 0);
        assert_eq!(src.peek_nth(100), 0);
    }

    #[test]
    fn document_indicator_needs_a_following_blank() {
        assert!(StrSource::new("--- a").next_is_document_indicator());
        assert!(StrSource::new("...").next_is_document_indicator());
        assert!(!StrSource::new("----").next_is_document_indicator());
        assert!(!StrSource::new("..").next_is_document_indicator());
    }

    #[test]
    fn read_to_break_stops_before_the_break() {
        let mut src = StrSource::new("# remark\nrest");
        let mut out = Vec::new();
        assert_eq!(src.read_to_break(&mut out), 8);
        assert_eq!(out, b"# remark");
        assert!(src.next_is_break());
    }
}

use std::borrow::Cow;
use std::collections::VecDeque;

use yamlet_common::TokenType::{
    BlockEnd, FlowMappingEnd, FlowMappingStart, FlowSequenceEnd, FlowSequenceStart, StreamEnd,
};
use yamlet_common::{Marker, ScalarStyle, ScanResult, Span, TokenType, YamlError, YamlResult};

use crate::tokenizer::char_utils::{
    as_hex, is_anchor_char, is_blank_or_break, is_blank_or_breakz, is_break, is_breakz, is_flow,
    is_tag_char, is_uri_char,
};
use crate::tokenizer::source::Source;
use yamlet_common::ChompIndicator;

/// A lexical token together with the input span it was scanned from.
#[derive(Clone, PartialEq, Debug)]
pub struct Token<'input> {
    pub span: Span,
    pub token_type: TokenType<'input>,
}

/// Outcome of a horizontal whitespace run.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct WsRun {
    any_tabs: bool,
    has_space: bool,
}

impl WsRun {
    pub(crate) fn found_tabs(&self) -> bool {
        self.any_tabs
    }

    pub(crate) fn has_space(&self) -> bool {
        self.has_space
    }
}

/// A scalar that may retroactively become a mapping key once a `:` is
/// seen. `token_number` remembers where the `Key` token must be inserted.
#[derive(Clone, Debug, Eq, PartialEq)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: usize,
    mark: Marker,
}

impl SimpleKey {
    fn new(mark: Marker) -> SimpleKey {
        SimpleKey {
            possible: false,
            required: false,
            token_number: 0,
            mark,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Indent {
    indent: u32,
    needs_block_end: bool,
}

/// Lazy tokenizer over a [`Source`].
///
/// Tokens are scanned on demand into a small queue; the queue exists only
/// because simple keys and indentation may require inserting a token
/// before ones already scanned, never because the input is read eagerly.
pub struct Scanner<'input, S> {
    src: S,
    pub(crate) mark: Marker,
    tokens: VecDeque<Token<'input>>,
    error: Option<YamlError>,

    simple_keys: Vec<SimpleKey>,
    indents: Vec<Indent>,
    indent: u32,
    flow_level: u32,

    tokens_parsed: usize,
    token_available: bool,
    stream_start_produced: bool,
    stream_end_emitted: bool,
    simple_key_allowed: bool,
    leading_whitespace: bool,
    adjacent_value_allowed_at: usize,
    keep_comments: bool,
}

impl<'input, S: Source> Scanner<'input, S> {
    pub fn new(src: S) -> Scanner<'input, S> {
        Scanner {
            src,
            mark: Marker::new(0, 1, 1),
            tokens: VecDeque::new(),
            error: None,

            simple_keys: Vec::new(),
            indents: Vec::new(),
            indent: 0,
            flow_level: 0,

            tokens_parsed: 0,
            token_available: false,
            stream_start_produced: false,
            stream_end_emitted: false,
            simple_key_allowed: true,
            leading_whitespace: true,
            adjacent_value_allowed_at: 0,
            keep_comments: false,
        }
    }

    /// A scanner that surfaces `#` runs as [`TokenType::Comment`] tokens
    /// instead of discarding them.
    pub fn with_comments(src: S) -> Scanner<'input, S> {
        let mut scanner = Scanner::new(src);
        scanner.keep_comments = true;
        scanner
    }

    #[must_use]
    pub fn error(&self) -> Option<&YamlError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn stream_ended(&self) -> bool {
        self.stream_end_emitted
    }

    pub fn next_token(&mut self) -> YamlResult<Token<'input>> {
        if self.stream_end_emitted {
            return Ok(Token {
                span: Span::empty(self.mark),
                token_type: StreamEnd,
            });
        }

        if !self.token_available {
            self.fetch_more_tokens()?;
        }

        let tok = match self.tokens.pop_front() {
            Some(tok) => tok,
            None => return Err(YamlError::lexical(self.mark, "unexpected end of token stream")),
        };

        self.token_available = false;
        self.tokens_parsed += 1;

        if tok.token_type == StreamEnd {
            self.stream_end_emitted = true;
        }

        Ok(tok)
    }

    fn fetch_more_tokens(&mut self) -> ScanResult {
        loop {
            let mut need_more = false;
            if self.tokens.is_empty() {
                need_more = true;
            } else {
                self.stale_simple_keys()?;
                for sk in &self.simple_keys {
                    if sk.possible && sk.token_number == self.tokens_parsed {
                        need_more = true;
                        break;
                    }
                }
            }

            if !need_more {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;

        Ok(())
    }

    fn fetch_next_token(&mut self) -> ScanResult {
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }

        self.skip_to_next_token()?;
        self.stale_simple_keys()?;

        self.unroll_indent(self.mark.col);

        if self.src.is_eof() {
            return self.fetch_stream_end();
        }

        if self.mark.col == 1 {
            if self.src.next_is(b'%') {
                return self.fetch_directive();
            }
            if self.next_is_document_start() {
                return self.fetch_document_indicator(TokenType::DocumentStart);
            }
            if self.next_is_document_end() {
                return self.fetch_document_end();
            }
        }

        if self.mark.col < self.indent {
            return Err(YamlError::lexical(self.mark, "invalid indentation"));
        }

        match self.src.peek_two() {
            [b'[', _] => self.fetch_flow_collection_start(FlowSequenceStart),
            [b'{', _] => self.fetch_flow_collection_start(FlowMappingStart),
            [b']', _] => self.fetch_flow_collection_end(FlowSequenceEnd),
            [b'}', _] => self.fetch_flow_collection_end(FlowMappingEnd),
            [b',', _] => self.fetch_flow_entry(),
            [b'-', x] if is_blank_or_breakz(x) => self.fetch_block_entry(),
            [b'?', x] if is_blank_or_breakz(x) => self.fetch_key(),
            [b':', x] if is_blank_or_breakz(x) => self.fetch_value(),
            [b':', x]
                if self.flow_level > 0
                    && (is_flow(x) || self.mark.pos == self.adjacent_value_allowed_at) =>
            {
                self.fetch_flow_value()
            }
            [b'*', _] => self.fetch_anchor(true),
            [b'&', _] => self.fetch_anchor(false),
            [b'!', _] => self.fetch_tag(),
            [b'|', _] if self.flow_level == 0 => self.fetch_block_scalar(true),
            [b'>', _] if self.flow_level == 0 => self.fetch_block_scalar(false),
            [b'\'', _] => self.fetch_flow_scalar(true),
            [b'"', _] => self.fetch_flow_scalar(false),
            [b'%' | b'@' | b'`', _] => Err(YamlError::lexical(
                self.mark,
                &format!("unexpected character `{}`", char::from(self.src.peek())),
            )),
            _ => self.fetch_plain_scalar(),
        }
    }

    fn next_is_document_start(&self) -> bool {
        self.src.next_is_three(b'-') && is_blank_or_breakz(self.src.peek_nth(3))
    }

    fn next_is_document_end(&self) -> bool {
        self.src.next_is_three(b'.') && is_blank_or_breakz(self.src.peek_nth(3))
    }

    fn fetch_stream_start(&mut self) {
        let mark = self.mark;
        self.indent = 0;
        self.stream_start_produced = true;
        self.simple_key_allowed = true;
        self.tokens.push_back(Token {
            span: Span::empty(mark),
            token_type: TokenType::StreamStart,
        });
        self.simple_keys.push(SimpleKey::new(Marker::default()));
    }

    fn fetch_stream_end(&mut self) -> ScanResult {
        // Force a new line for the end position.
        if self.mark.col > 1 {
            self.mark.col = 1;
            self.mark.line += 1;
        }

        // Without further input there is no context left to complete a
        // simple key with. A required one is an error.
        for sk in &mut self.simple_keys {
            if sk.required && sk.possible {
                return Err(YamlError::lexical(self.mark, "simple key expected"));
            }
            sk.possible = false;
        }

        self.unroll_indent(0);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;

        self.tokens.push_back(Token {
            span: Span::empty(self.mark),
            token_type: TokenType::StreamEnd,
        });
        Ok(())
    }

    fn fetch_document_indicator(&mut self, token_type: TokenType<'input>) -> ScanResult {
        self.unroll_indent(0);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;

        let mark = self.mark;
        self.skip_n_non_blank(3);

        self.tokens.push_back(Token {
            span: Span::new(mark, self.mark),
            token_type,
        });
        Ok(())
    }

    fn fetch_document_end(&mut self) -> ScanResult {
        self.fetch_document_indicator(TokenType::DocumentEnd)?;
        self.skip_ws_to_eol(true)?;
        if !self.src.next_is_breakz() {
            return Err(YamlError::lexical(
                self.mark,
                "invalid content after document end marker",
            ));
        }
        Ok(())
    }

    fn fetch_directive(&mut self) -> ScanResult {
        self.unroll_indent(0);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;

        if let Some(tok) = self.scan_directive()? {
            self.tokens.push_back(tok);
        }
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, token_type: TokenType<'input>) -> ScanResult {
        self.save_simple_key();

        self.roll_one_col_indent();
        self.increase_flow_level()?;

        self.simple_key_allowed = true;

        let start_mark = self.mark;
        self.skip_non_blank();
        self.skip_ws_to_eol(true)?;

        self.tokens.push_back(Token {
            span: Span::new(start_mark, self.mark),
            token_type,
        });
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, token_type: TokenType<'input>) -> ScanResult {
        self.remove_simple_key()?;
        self.decrease_flow_level();

        self.simple_key_allowed = false;

        let start_mark = self.mark;
        self.skip_non_blank();
        self.skip_ws_to_eol(true)?;

        if self.flow_level > 0 {
            self.adjacent_value_allowed_at = self.mark.pos;
        }

        self.tokens.push_back(Token {
            span: Span::new(start_mark, self.mark),
            token_type,
        });
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> ScanResult {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;

        let start_mark = self.mark;
        self.skip_non_blank();
        self.skip_ws_to_eol(true)?;

        self.tokens.push_back(Token {
            span: Span::new(start_mark, self.mark),
            token_type: TokenType::FlowEntry,
        });
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> ScanResult {
        if self.flow_level > 0 {
            return Err(YamlError::lexical(
                self.mark,
                r#""-" is only valid inside a block"#,
            ));
        }
        if !self.simple_key_allowed {
            return Err(YamlError::lexical(
                self.mark,
                "block sequence entries are not allowed in this context",
            ));
        }

        // An anchor or tag at column 1 cannot be followed by an entry of a
        // sequence nested deeper than it.
        if let Some(Token {
            span,
            token_type: TokenType::Anchor(..) | TokenType::Tag { .. },
        }) = self.tokens.back()
        {
            if self.mark.col == 1 && span.start.col == 1 && self.indent > 0 {
                return Err(YamlError::lexical(
                    self.mark,
                    "block sequence entries are not allowed in this context",
                ));
            }
        }

        // Skip over the `-`.
        let mark = self.mark;
        self.skip_non_blank();

        self.roll_indent(mark.col, None, TokenType::BlockSequenceStart, mark);
        let found_tabs = self.skip_ws_to_eol(true)?.found_tabs();
        if found_tabs && self.src.next_is(b'-') && is_blank_or_break(self.src.peek_nth(1)) {
            return Err(YamlError::lexical(
                self.mark,
                "'-' must be followed by a valid YAML whitespace",
            ));
        }

        self.skip_ws_to_eol(false)?;
        if self.src.next_is_break() || self.src.next_is_flow() {
            self.roll_one_col_indent();
        }

        self.remove_simple_key()?;
        self.simple_key_allowed = true;

        self.tokens.push_back(Token {
            span: Span::new(mark, self.mark),
            token_type: TokenType::BlockEntry,
        });
        Ok(())
    }

    fn fetch_key(&mut self) -> ScanResult {
        let start_mark = self.mark;
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(YamlError::lexical(
                    self.mark,
                    "mapping keys are not allowed in this context",
                ));
            }
            self.roll_indent(
                start_mark.col,
                None,
                TokenType::BlockMappingStart,
                start_mark,
            );
        }

        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;

        self.skip_non_blank();
        self.skip_explicit_key_whitespace()?;
        if self.src.next_is(b'\t') {
            return Err(YamlError::lexical(
                self.mark,
                "tabs disallowed in this context",
            ));
        }
        self.tokens.push_back(Token {
            span: Span::new(start_mark, self.mark),
            token_type: TokenType::Key,
        });
        Ok(())
    }

    fn skip_explicit_key_whitespace(&mut self) -> ScanResult {
        let mut need_whitespace = true;
        loop {
            match self.src.peek() {
                b' ' => {
                    self.skip_blank();
                    need_whitespace = false;
                }
                b'\n' | b'\r' => {
                    self.skip_linebreak();
                    if self.flow_level == 0 {
                        self.simple_key_allowed = true;
                    }
                    need_whitespace = false;
                }
                b'#' => self.scan_comment(!self.leading_whitespace)?,
                _ => break,
            }
        }

        if need_whitespace {
            Err(YamlError::lexical(self.mark, "expected whitespace"))
        } else {
            Ok(())
        }
    }

    fn fetch_value(&mut self) -> ScanResult {
        let sk = self.simple_keys.last().unwrap().clone();
        let start_mark = self.mark;

        // Skip over ':'.
        self.skip_non_blank();
        if self.src.next_is(b'\t')
            && !self.skip_ws_to_eol(true)?.has_space()
            && (self.src.next_is(b'-') || self.src.next_is_alpha())
        {
            return Err(YamlError::lexical(
                self.mark,
                "':' must be followed by a valid YAML whitespace",
            ));
        }

        if sk.possible {
            // Insert the simple key before the scalar it was saved for.
            let tok = Token {
                span: Span::empty(sk.mark),
                token_type: TokenType::Key,
            };
            self.insert_token(sk.token_number - self.tokens_parsed, tok);

            self.roll_indent(
                sk.mark.col,
                Some(sk.token_number),
                TokenType::BlockMappingStart,
                sk.mark,
            );
            self.roll_one_col_indent();

            self.simple_keys.last_mut().unwrap().possible = false;
            self.simple_key_allowed = false;
        } else {
            // The ':' indicator follows a complex key.
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(YamlError::lexical(
                        start_mark,
                        "mapping values are not allowed in this context",
                    ));
                }
                self.roll_indent(
                    start_mark.col,
                    None,
                    TokenType::BlockMappingStart,
                    start_mark,
                );
            }
            self.roll_one_col_indent();

            self.simple_key_allowed = self.flow_level == 0;
        }
        self.tokens.push_back(Token {
            span: Span::empty(start_mark),
            token_type: TokenType::Value,
        });

        Ok(())
    }

    fn fetch_flow_value(&mut self) -> ScanResult {
        // A ':' inside a flow collection not followed by a blank needs an
        // adjacent-value allowance (`["a":b]`, JSON compatibility) and may
        // not directly open a nested collection.
        let nc = self.src.peek_nth(1);
        if self.mark.pos != self.adjacent_value_allowed_at && matches!(nc, b'[' | b'{') {
            return Err(YamlError::lexical(
                self.mark,
                "':' may not precede any of `[{` in flow mapping",
            ));
        }

        self.fetch_value()
    }

    fn fetch_anchor(&mut self, alias: bool) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_anchor(alias)?;
        self.tokens.push_back(tok);
        Ok(())
    }

    fn fetch_tag(&mut self) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_tag()?;
        self.tokens.push_back(tok);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = true;

        let tok = self.scan_block_scalar(literal)?;
        self.tokens.push_back(tok);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_flow_scalar(single)?;

        // To ensure JSON compatibility, a value may be specified adjacent
        // to the ':' after a quoted key.
        self.skip_to_next_token()?;
        self.adjacent_value_allowed_at = self.mark.pos;

        self.tokens.push_back(tok);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_plain_scalar()?;
        self.tokens.push_back(tok);
        Ok(())
    }

    fn skip_to_next_token(&mut self) -> ScanResult {
        loop {
            match self.src.peek() {
                // Tabs may not be used as indentation while a block is
                // open; they are fine as leading whitespace past it and
                // anywhere inside flow constructs.
                b'\t'
                    if !self.indents.is_empty()
                        && self.leading_whitespace
                        && self.mark.col < self.indent =>
                {
                    self.skip_ws_to_eol(true)?;
                    if !self.src.next_is_breakz() {
                        return Err(YamlError::lexical(
                            self.mark,
                            "tabs disallowed within this context (block indentation)",
                        ));
                    }
                }
                b'\t' | b' ' => self.skip_blank(),
                b'\n' | b'\r' => {
                    self.skip_linebreak();
                    if self.flow_level == 0 {
                        self.simple_key_allowed = true;
                    }
                }
                b'#' => self.scan_comment(!self.leading_whitespace)?,
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip spaces (and optionally tabs) up to the end of the line,
    /// consuming an inline comment when one follows the whitespace.
    fn skip_ws_to_eol(&mut self, skip_tabs: bool) -> YamlResult<WsRun> {
        let mut run = WsRun {
            any_tabs: false,
            has_space: false,
        };
        loop {
            match self.src.peek() {
                b' ' => {
                    run.has_space = true;
                    self.skip_blank();
                }
                b'\t' if skip_tabs => {
                    run.any_tabs = true;
                    self.skip_blank();
                }
                // YAML comments must be preceded by whitespace.
                b'#' if !run.any_tabs && !run.has_space && !self.leading_whitespace => {
                    return Err(YamlError::lexical(
                        self.mark,
                        "comments must be separated from other tokens by whitespace",
                    ));
                }
                b'#' => self.scan_comment(true)?,
                _ => break,
            }
        }
        Ok(run)
    }

    /// Consume a `#` run to the end of the line, producing a token when
    /// comment scanning is enabled.
    fn scan_comment(&mut self, inline: bool) -> ScanResult {
        let start_mark = self.mark;
        self.skip_non_blank();

        if self.keep_comments {
            let mut text = Vec::new();
            let n = self.src.read_to_break(&mut text);
            self.mark.pos += n;
            self.mark.col += n as u32;

            let mut text = String::from_utf8(text)
                .map_err(|_| YamlError::lexical(start_mark, "comment is not valid UTF-8"))?;
            if text.starts_with(' ') {
                text.remove(0);
            }
            self.tokens.push_back(Token {
                span: Span::new(start_mark, self.mark),
                token_type: TokenType::Comment {
                    text: Cow::Owned(text),
                    inline,
                },
            });
        } else {
            let n = self.src.skip_to_break();
            self.mark.pos += n;
            self.mark.col += n as u32;
        }
        Ok(())
    }

    fn scan_directive(&mut self) -> YamlResult<Option<Token<'input>>> {
        let start_mark = self.mark;
        self.skip_non_blank();

        let name = self.scan_directive_name()?;
        let tok = match &name[..] {
            b"YAML" => Some(self.scan_version_directive_value(&start_mark)?),
            b"TAG" => Some(self.scan_tag_directive_value(&start_mark)?),
            // Reserved directives are skipped; the YAML spec asks for a
            // warning, not an error.
            _ => {
                let line_len = self.src.skip_to_break();
                self.mark.pos += line_len;
                self.mark.col += line_len as u32;
                None
            }
        };

        self.skip_ws_to_eol(true)?;

        if self.src.next_is_breakz() {
            self.skip_linebreak();
            Ok(tok)
        } else {
            Err(YamlError::lexical(
                start_mark,
                "while scanning a directive, did not find expected comment or line break",
            ))
        }
    }

    fn scan_directive_name(&mut self) -> YamlResult<Vec<u8>> {
        let start_mark = self.mark;
        let mut string = Vec::new();

        let n_chars = self.src.read_while_alpha(&mut string);
        self.mark.pos += n_chars;
        self.mark.col += n_chars as u32;

        if string.is_empty() {
            return Err(YamlError::lexical(
                start_mark,
                "while scanning a directive, could not find expected directive name",
            ));
        }

        if !is_blank_or_breakz(self.src.peek()) {
            return Err(YamlError::lexical(
                start_mark,
                "while scanning a directive, found unexpected non-alphabetical character",
            ));
        }

        Ok(string)
    }

    fn scan_version_directive_value(&mut self, mark: &Marker) -> YamlResult<Token<'input>> {
        let n_blanks = self.src.skip_while_blank();
        self.mark.pos += n_blanks;
        self.mark.col += n_blanks as u32;

        let major = self.scan_version_directive_number(mark)?;

        if !self.src.next_is(b'.') {
            return Err(YamlError::lexical(
                *mark,
                "while scanning a YAML directive, did not find expected digit or '.' character",
            ));
        }
        self.skip_non_blank();

        let minor = self.scan_version_directive_number(mark)?;

        Ok(Token {
            span: Span::new(*mark, self.mark),
            token_type: TokenType::VersionDirective { major, minor },
        })
    }

    fn scan_version_directive_number(&mut self, mark: &Marker) -> YamlResult<u8> {
        let mut val = 0u8;
        let mut length = 0usize;
        while self.src.peek().is_ascii_digit() {
            if length >= 3 {
                return Err(YamlError::lexical(
                    *mark,
                    "while scanning a YAML directive, found extremely long version number",
                ));
            }
            length += 1;
            val = val.saturating_mul(10).saturating_add(self.src.peek() - b'0');
            self.skip_non_blank();
        }

        if length == 0 {
            return Err(YamlError::lexical(
                *mark,
                "while scanning a YAML directive, did not find expected version number",
            ));
        }

        Ok(val)
    }

    fn scan_tag_directive_value(&mut self, mark: &Marker) -> YamlResult<Token<'input>> {
        let n_blanks = self.src.skip_while_blank();
        self.mark.pos += n_blanks;
        self.mark.col += n_blanks as u32;

        let handle = self.scan_tag_handle(true, mark)?;

        let n_blanks = self.src.skip_while_blank();
        self.mark.pos += n_blanks;
        self.mark.col += n_blanks as u32;

        let prefix = self.scan_tag_prefix(mark)?;

        if self.src.next_is_blank_or_breakz() {
            Ok(Token {
                span: Span::new(*mark, self.mark),
                token_type: TokenType::TagDirective {
                    handle: Cow::Owned(to_utf8(handle, mark)?),
                    prefix: Cow::Owned(to_utf8(prefix, mark)?),
                },
            })
        } else {
            Err(YamlError::lexical(
                *mark,
                "while scanning a %TAG directive, did not find expected whitespace or line break",
            ))
        }
    }

    fn scan_anchor(&mut self, alias: bool) -> YamlResult<Token<'input>> {
        let mut string = Vec::new();
        let start_mark = self.mark;

        self.skip_non_blank();
        while is_anchor_char(self.src.peek()) {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        if string.is_empty() {
            return Err(YamlError::lexical(
                start_mark,
                "while scanning an anchor or alias, did not find expected alphabetic or numeric character",
            ));
        }

        let name = Cow::Owned(to_utf8(string, &start_mark)?);
        let token_type = if alias {
            TokenType::Alias(name)
        } else {
            TokenType::Anchor(name)
        };
        Ok(Token {
            span: Span::new(start_mark, self.mark),
            token_type,
        })
    }

    fn scan_tag(&mut self) -> YamlResult<Token<'input>> {
        let start_mark = self.mark;
        let mut handle = Vec::new();
        let mut suffix;

        if self.src.peek_nth(1) == b'<' {
            // Verbatim tag: `!<...>`. The handle stays empty.
            suffix = self.scan_verbatim_tag(&start_mark)?;
        } else {
            // Either the '!suffix' or the '!handle!suffix' form.
            handle = self.scan_tag_handle(false, &start_mark)?;
            if handle.len() >= 2 && handle.starts_with(b"!") && handle.ends_with(b"!") {
                suffix = self.scan_tag_shorthand_suffix(&[], &start_mark)?;
            } else {
                suffix = self.scan_tag_shorthand_suffix(&handle, &start_mark)?;
                handle = b"!".to_vec();
                // The bare '!' tag: empty handle, '!' suffix.
                if suffix.is_empty() {
                    handle.clear();
                    suffix.push(b'!');
                }
            }
        }

        if is_blank_or_breakz(self.src.peek()) || (self.flow_level > 0 && self.src.next_is_flow()) {
            Ok(Token {
                span: Span::new(start_mark, self.mark),
                token_type: TokenType::Tag {
                    handle: Cow::Owned(to_utf8(handle, &start_mark)?),
                    suffix: Cow::Owned(to_utf8(suffix, &start_mark)?),
                },
            })
        } else {
            Err(YamlError::lexical(
                start_mark,
                "while scanning a tag, did not find expected whitespace or line break",
            ))
        }
    }

    fn scan_verbatim_tag(&mut self, start_mark: &Marker) -> YamlResult<Vec<u8>> {
        // Eat `!<`.
        self.skip_non_blank();
        self.skip_non_blank();

        let mut string = Vec::new();
        while is_uri_char(self.src.peek()) {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        if !self.src.next_is(b'>') {
            return Err(YamlError::lexical(
                *start_mark,
                "while scanning a verbatim tag, did not find the expected '>'",
            ));
        }
        self.skip_non_blank();

        Ok(string)
    }

    fn scan_tag_handle(&mut self, directive: bool, mark: &Marker) -> YamlResult<Vec<u8>> {
        let mut string = Vec::new();
        if !self.src.next_is(b'!') {
            return Err(YamlError::lexical(
                *mark,
                "while scanning a tag, did not find expected '!'",
            ));
        }

        string.push(self.src.peek());
        self.skip_non_blank();

        let n_chars = self.src.read_while_alpha(&mut string);
        self.mark.pos += n_chars;
        self.mark.col += n_chars as u32;

        if self.src.next_is(b'!') {
            string.push(self.src.peek());
            self.skip_non_blank();
        } else if directive && string != b"!" {
            // In a %TAG directive the handle must close with '!'.
            return Err(YamlError::lexical(
                *mark,
                "while parsing a tag directive, did not find expected '!'",
            ));
        }
        Ok(string)
    }

    fn scan_tag_shorthand_suffix(&mut self, head: &[u8], mark: &Marker) -> YamlResult<Vec<u8>> {
        let mut length = head.len();
        let mut string = Vec::new();

        // Copy the head over, without its leading '!'.
        if length > 1 {
            string.extend_from_slice(&head[1..]);
        }

        // `%xx` escapes are carried through raw and decoded at tag
        // resolution time.
        while is_tag_char(self.src.peek()) {
            string.push(self.src.peek());
            self.skip_non_blank();
            length += 1;
        }

        if length == 0 {
            return Err(YamlError::lexical(
                *mark,
                "while parsing a tag, did not find expected tag URI",
            ));
        }

        Ok(string)
    }

    fn scan_tag_prefix(&mut self, start_mark: &Marker) -> YamlResult<Vec<u8>> {
        let mut string = Vec::new();

        if self.src.next_is(b'!') {
            // A local tag prefix.
            string.push(self.src.peek());
            self.skip_non_blank();
        } else if !is_tag_char(self.src.peek()) {
            return Err(YamlError::lexical(
                *start_mark,
                "invalid global tag character",
            ));
        } else {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        while is_uri_char(self.src.peek()) {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        Ok(string)
    }

    #[allow(clippy::too_many_lines)]
    fn scan_plain_scalar(&mut self) -> YamlResult<Token<'input>> {
        self.unroll_non_block_indents();
        let indent = self.indent + 1;
        let start_mark = self.mark;

        if self.flow_level > 0 && start_mark.col < indent {
            return Err(YamlError::lexical(
                start_mark,
                "invalid indentation in flow construct",
            ));
        }

        let mut string: Vec<u8> = Vec::with_capacity(32);
        let mut leading_break: Vec<u8> = Vec::new();
        let mut trailing_breaks: Vec<u8> = Vec::new();
        let mut whitespaces: Vec<u8> = Vec::new();
        let mut end_mark = self.mark;

        loop {
            if (self.leading_whitespace && self.src.next_is_document_indicator())
                || self.src.next_is(b'#')
            {
                break;
            }

            if self.flow_level > 0 && self.src.next_is(b'-') && is_flow(self.src.peek_nth(1)) {
                return Err(YamlError::lexical(
                    self.mark,
                    "plain scalar cannot start with '-' followed by ,[]{}",
                ));
            }

            if !self.src.next_is_blank_or_breakz()
                && self.src.next_can_be_plain_scalar(self.flow_level > 0)
            {
                // Join the buffered whitespace or fold the line breaks.
                if self.leading_whitespace {
                    if !leading_break.is_empty() {
                        if trailing_breaks.is_empty() {
                            string.push(b' ');
                        } else {
                            string.append(&mut trailing_breaks);
                        }
                        leading_break.clear();
                    }
                    self.leading_whitespace = false;
                } else if !whitespaces.is_empty() {
                    string.append(&mut whitespaces);
                }

                // Add the run of content characters.
                while !self.src.next_is_blank_or_breakz()
                    && self.src.next_can_be_plain_scalar(self.flow_level > 0)
                {
                    string.push(self.src.peek());
                    self.skip_non_blank();
                }
                end_mark = self.mark;
            }

            // The scalar also ends on eof, on ": " and on a flow character
            // in flow context.
            if !(self.src.next_is_blank() || self.src.next_is_break()) {
                break;
            }

            // Process blank characters.
            while self.src.next_is_blank_or_break() {
                if self.src.next_is_blank() {
                    if !self.leading_whitespace {
                        whitespaces.push(self.src.peek());
                        self.skip_blank();
                    } else if self.mark.col < indent && self.src.next_is(b'\t') {
                        // Tabs in an indentation column are only allowed
                        // on an otherwise empty line.
                        self.skip_ws_to_eol(true)?;
                        if !self.src.next_is_breakz() {
                            return Err(YamlError::lexical(
                                start_mark,
                                "while scanning a plain scalar, found a tab",
                            ));
                        }
                    } else {
                        self.skip_blank();
                    }
                } else if self.leading_whitespace {
                    self.skip_linebreak();
                    trailing_breaks.push(b'\n');
                } else {
                    whitespaces.clear();
                    self.skip_linebreak();
                    leading_break.push(b'\n');
                    self.leading_whitespace = true;
                }
            }

            // A less indented continuation line ends a block scalar.
            if self.flow_level == 0 && self.mark.col < indent {
                break;
            }
        }

        if self.leading_whitespace {
            self.simple_key_allowed = true;
        }

        if string.is_empty() {
            // At least one byte must be consumed or the fetch loop would
            // call us forever, e.g. on inputs such as "{...".
            return Err(YamlError::lexical(
                start_mark,
                "unexpected end of plain scalar",
            ));
        }

        Ok(Token {
            span: Span::new(start_mark, end_mark),
            token_type: TokenType::Scalar {
                style: ScalarStyle::Plain,
                value: Cow::Owned(to_utf8(string, &start_mark)?),
            },
        })
    }

    #[allow(clippy::too_many_lines)]
    fn scan_flow_scalar(&mut self, single: bool) -> YamlResult<Token<'input>> {
        let start_mark = self.mark;

        let mut string: Vec<u8> = Vec::new();
        let mut leading_break: Vec<u8> = Vec::new();
        let mut trailing_breaks: Vec<u8> = Vec::new();
        let mut whitespaces: Vec<u8> = Vec::new();
        let mut leading_blanks;

        // Eat the left quote.
        self.skip_non_blank();

        loop {
            if self.mark.col == 1 && self.src.next_is_document_indicator() {
                return Err(YamlError::lexical(
                    start_mark,
                    "while scanning a quoted scalar, found unexpected document indicator",
                ));
            }

            if self.src.is_eof() {
                return Err(YamlError::lexical(
                    start_mark,
                    "while scanning a quoted scalar, found unexpected end of stream",
                ));
            }

            if self.mark.col < self.indent {
                return Err(YamlError::lexical(
                    start_mark,
                    "invalid indentation in quoted scalar",
                ));
            }

            leading_blanks = false;
            self.consume_flow_scalar_content(single, &mut string, &mut leading_blanks, &start_mark)?;

            match self.src.peek() {
                b'\'' if single => break,
                b'"' if !single => break,
                _ => {}
            }

            // Consume blank characters.
            while self.src.next_is_blank() || self.src.next_is_break() {
                if self.src.next_is_blank() {
                    if leading_blanks {
                        if self.src.next_is(b'\t') && self.mark.col < self.indent {
                            return Err(YamlError::lexical(
                                self.mark,
                                "tab cannot be used as indentation",
                            ));
                        }
                        self.skip_blank();
                    } else {
                        whitespaces.push(self.src.peek());
                        self.skip_blank();
                    }
                } else if leading_blanks {
                    self.read_break(&mut trailing_breaks);
                } else {
                    whitespaces.clear();
                    self.read_break(&mut leading_break);
                    leading_blanks = true;
                }
            }

            // Join the whitespaces or fold the line breaks. An escaped
            // line break leaves `leading_break` empty; any breaks after it
            // are content.
            if leading_blanks {
                if leading_break.is_empty() {
                    string.append(&mut trailing_breaks);
                } else if trailing_breaks.is_empty() {
                    string.push(b' ');
                    leading_break.clear();
                } else {
                    string.append(&mut trailing_breaks);
                    leading_break.clear();
                }
            } else {
                string.append(&mut whitespaces);
            }
        }

        // Eat the right quote.
        self.skip_non_blank();
        // Ensure there is no invalid trailing content.
        self.skip_ws_to_eol(true)?;
        match self.src.peek() {
            // These can be encountered in flow sequences or mappings.
            b',' | b'}' | b']' if self.flow_level > 0 => {}
            // An end-of-line / end-of-stream is fine. No trailing content.
            c if is_breakz(c) => {}
            // ':' can be encountered if our scalar is a key. Outside of
            // flow contexts, keys cannot span multiple lines.
            b':' if self.flow_level == 0 && start_mark.line == self.mark.line => {}
            b':' if self.flow_level > 0 => {}
            _ => {
                return Err(YamlError::lexical(
                    self.mark,
                    "invalid trailing content after quoted scalar",
                ));
            }
        }

        let style = if single {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
        Ok(Token {
            span: Span::new(start_mark, self.mark),
            token_type: TokenType::Scalar {
                style,
                value: Cow::Owned(to_utf8(string, &start_mark)?),
            },
        })
    }

    fn consume_flow_scalar_content(
        &mut self,
        single: bool,
        string: &mut Vec<u8>,
        leading_blanks: &mut bool,
        start_mark: &Marker,
    ) -> ScanResult {
        while !is_blank_or_breakz(self.src.peek()) {
            match self.src.peek() {
                // An escaped single quote.
                b'\'' if single && self.src.peek_nth(1) == b'\'' => {
                    string.push(b'\'');
                    self.skip_n_non_blank(2);
                }
                // The right quote.
                b'\'' if single => break,
                b'"' if !single => break,
                // An escaped line break.
                b'\\' if !single && is_break(self.src.peek_nth(1)) => {
                    self.skip_non_blank();
                    self.skip_linebreak();
                    *leading_blanks = true;
                    break;
                }
                // An escape sequence.
                b'\\' if !single => {
                    let chr = self.resolve_double_quote_escape(start_mark)?;
                    let mut buf = [0u8; 4];
                    string.extend_from_slice(chr.encode_utf8(&mut buf).as_bytes());
                }
                c => {
                    string.push(c);
                    self.skip_non_blank();
                }
            }
        }
        Ok(())
    }

    /// Resolve the escape sequence under the cursor, which points at the
    /// `\` opening it.
    fn resolve_double_quote_escape(&mut self, start_mark: &Marker) -> YamlResult<char> {
        let mut code_length = 0usize;
        let mut ret = '\0';

        match self.src.peek_nth(1) {
            b'0' => ret = '\0',
            b'a' => ret = '\x07',
            b'b' => ret = '\x08',
            b't' | b'\t' => ret = '\t',
            b'n' => ret = '\n',
            b'v' => ret = '\x0b',
            b'f' => ret = '\x0c',
            b'r' => ret = '\x0d',
            b'e' => ret = '\x1b',
            b' ' => ret = '\x20',
            b'"' => ret = '"',
            b'/' => ret = '/',
            b'\\' => ret = '\\',
            // Unicode next line (#x85)
            b'N' => ret = '\u{85}',
            // Unicode non-breaking space (#xA0)
            b'_' => ret = '\u{A0}',
            // Unicode line separator (#x2028)
            b'L' => ret = '\u{2028}',
            // Unicode paragraph separator (#x2029)
            b'P' => ret = '\u{2029}',
            b'x' => code_length = 2,
            b'u' => code_length = 4,
            b'U' => code_length = 8,
            _ => {
                return Err(YamlError::lexical(
                    *start_mark,
                    "while parsing a quoted scalar, found unknown escape character",
                ));
            }
        }
        self.skip_n_non_blank(2);

        if code_length > 0 {
            let mut value = 0u32;
            for i in 0..code_length {
                let c = self.src.peek_nth(i);
                if !c.is_ascii_hexdigit() {
                    return Err(YamlError::lexical(
                        *start_mark,
                        "while parsing a quoted scalar, did not find expected hexadecimal number",
                    ));
                }
                value = (value << 4) + as_hex(c);
            }

            let Some(ch) = char::from_u32(value) else {
                return Err(YamlError::lexical(
                    *start_mark,
                    "while parsing a quoted scalar, found invalid Unicode character escape code",
                ));
            };
            ret = ch;

            self.skip_n_non_blank(code_length);
        }
        Ok(ret)
    }

    #[allow(clippy::too_many_lines)]
    fn scan_block_scalar(&mut self, literal: bool) -> YamlResult<Token<'input>> {
        let start_mark = self.mark;
        let mut chomping = ChompIndicator::Clip;
        let mut increment: u32 = 0;
        let mut indent: u32 = 0;
        let mut trailing_blank: bool;
        let mut leading_blank: bool = false;
        let style = if literal {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };

        let mut string = Vec::<u8>::new();
        let mut leading_break = Vec::<u8>::new();
        let mut trailing_breaks = Vec::<u8>::new();
        let mut chomping_break = Vec::<u8>::new();

        // Skip '|' or '>'.
        self.skip_non_blank();
        self.unroll_non_block_indents();

        // The chomping and indentation indicators may come in any order.
        if self.src.next_is(b'+') || self.src.next_is(b'-') {
            chomping = if self.src.next_is(b'+') {
                ChompIndicator::Keep
            } else {
                ChompIndicator::Strip
            };
            self.skip_non_blank();
            if self.src.peek().is_ascii_digit() {
                increment = self.scan_block_scalar_indicator_digit(&start_mark)?;
            }
        } else if self.src.peek().is_ascii_digit() {
            increment = self.scan_block_scalar_indicator_digit(&start_mark)?;
            if self.src.next_is(b'+') || self.src.next_is(b'-') {
                chomping = if self.src.next_is(b'+') {
                    ChompIndicator::Keep
                } else {
                    ChompIndicator::Strip
                };
                self.skip_non_blank();
            }
        }

        self.skip_ws_to_eol(true)?;

        if !self.src.next_is_breakz() {
            return Err(YamlError::lexical(
                start_mark,
                "while scanning a block scalar, did not find expected comment or line break",
            ));
        }

        if self.src.next_is_break() {
            self.read_break(&mut chomping_break);
        }

        if self.src.next_is(b'\t') {
            return Err(YamlError::lexical(
                start_mark,
                "a block scalar content cannot start with a tab",
            ));
        }

        if increment > 0 {
            indent = if self.indent >= 1 {
                self.indent + increment
            } else {
                increment + 1
            };
        }

        // Scan the leading line breaks; determine the indentation level if
        // no explicit indicator gave one.
        if indent == 0 {
            self.skip_block_scalar_first_line_indent(&mut indent, &mut trailing_breaks);
        } else {
            self.skip_block_scalar_indent(indent, &mut trailing_breaks);
        }

        // An end-of-stream with no content line at all, e.g. `- |+`.
        if self.src.is_eof() {
            let contents = match chomping {
                ChompIndicator::Strip => Vec::new(),
                // There was no newline after the indicators.
                _ if self.mark.line == start_mark.line => Vec::new(),
                ChompIndicator::Clip => chomping_break,
                ChompIndicator::Keep if trailing_breaks.is_empty() => chomping_break,
                // The newline after the indicators is the header's, not
                // the content's.
                ChompIndicator::Keep => trailing_breaks,
            };
            return Ok(Token {
                span: Span::new(start_mark, self.mark),
                token_type: TokenType::Scalar {
                    style,
                    value: Cow::Owned(to_utf8(contents, &start_mark)?),
                },
            });
        }

        if self.mark.col < indent && self.mark.col > self.indent {
            return Err(YamlError::lexical(
                self.mark,
                "wrongly indented line in block scalar",
            ));
        }

        let mut line_buffer = Vec::with_capacity(100);
        while self.mark.col == indent && !self.src.is_eof() {
            if self.mark.col == 1 && self.src.next_is_document_indicator() {
                break;
            }

            // We are at the first content character of a content line.
            trailing_blank = self.src.next_is_blank();
            if !literal && !leading_break.is_empty() && !leading_blank && !trailing_blank {
                // A single break between two ordinary lines folds into a
                // space; empty lines keep their breaks.
                if trailing_breaks.is_empty() {
                    string.push(b' ');
                } else {
                    string.append(&mut trailing_breaks);
                }
            } else {
                string.append(&mut leading_break);
                string.append(&mut trailing_breaks);
            }

            leading_break.clear();
            trailing_breaks.clear();

            leading_blank = self.src.next_is_blank();

            // Read the content line itself.
            line_buffer.clear();
            let n_chars = self.src.read_to_break(&mut line_buffer);
            self.mark.pos += n_chars;
            self.mark.col += n_chars as u32;
            string.extend_from_slice(&line_buffer);

            if self.src.is_eof() {
                break;
            }

            self.read_break(&mut leading_break);

            // Eat the following indentation spaces and line breaks.
            self.skip_block_scalar_indent(indent, &mut trailing_breaks);
        }

        // Chomp the tail.
        if chomping != ChompIndicator::Strip {
            string.append(&mut leading_break);
            // If we reached an eof without a final line break but the last
            // line was properly indented, a newline is still implied.
            if self.src.is_eof() && self.mark.col > indent.max(1) {
                string.push(b'\n');
            }
        }
        if chomping == ChompIndicator::Keep {
            string.append(&mut trailing_breaks);
        }

        Ok(Token {
            span: Span::new(start_mark, self.mark),
            token_type: TokenType::Scalar {
                style,
                value: Cow::Owned(to_utf8(string, &start_mark)?),
            },
        })
    }

    fn scan_block_scalar_indicator_digit(&mut self, start_mark: &Marker) -> YamlResult<u32> {
        if self.src.next_is(b'0') {
            return Err(YamlError::lexical(
                *start_mark,
                "while scanning a block scalar, found an indentation indicator equal to 0",
            ));
        }
        let increment = u32::from(self.src.peek() - b'0');
        self.skip_non_blank();
        Ok(increment)
    }

    fn skip_block_scalar_first_line_indent(&mut self, indent: &mut u32, breaks: &mut Vec<u8>) {
        let mut max_indent = 0;
        loop {
            // Consume all spaces; tabs cannot be used as indentation.
            while self.src.next_is(b' ') {
                self.skip_blank();
            }

            if self.mark.col > max_indent {
                max_indent = self.mark.col;
            }

            if self.src.next_is_break() {
                self.read_break(breaks);
            } else {
                break;
            }
        }

        // A scalar at the top level may have its content on column 1, so
        // the minimum indent depends on whether a block is open.
        *indent = max_indent.max(self.indent + 1);
        if self.indent > 0 {
            *indent = (*indent).max(1);
        }
    }

    /// Skip the block scalar indentation and empty lines.
    fn skip_block_scalar_indent(&mut self, indent: u32, breaks: &mut Vec<u8>) {
        loop {
            while self.mark.col < indent && self.src.next_is(b' ') {
                self.skip_blank();
            }

            if self.src.next_is_break() {
                self.read_break(breaks);
            } else {
                break;
            }
        }
    }

    #[inline]
    fn read_break(&mut self, s: &mut Vec<u8>) {
        self.skip_linebreak();
        s.push(b'\n');
    }

    fn skip_n_non_blank(&mut self, count: usize) {
        self.src.skip(count);
        self.mark.pos += count;
        self.mark.col += count as u32;
        self.leading_whitespace = false;
    }

    fn skip_non_blank(&mut self) {
        self.skip_n_non_blank(1);
    }

    fn skip_blank(&mut self) {
        self.src.skip(1);
        self.mark.pos += 1;
        self.mark.col += 1;
    }

    #[inline]
    fn skip_linebreak(&mut self) {
        match self.src.peek_two() {
            [b'\r', b'\n'] => {
                self.src.skip(2);
                self.mark.pos += 2;
                self.mark.col = 1;
                self.mark.line += 1;
                self.leading_whitespace = true;
            }
            [b'\r' | b'\n', _] => {
                self.src.skip(1);
                self.mark.pos += 1;
                self.mark.col = 1;
                self.mark.line += 1;
                self.leading_whitespace = true;
            }
            _ => {}
        }
    }

    fn unroll_indent(&mut self, col: u32) {
        if self.flow_level > 0 {
            return;
        }

        while self.indent > col {
            let indent = self.indents.pop().unwrap();
            self.indent = indent.indent;
            if indent.needs_block_end {
                self.tokens.push_back(Token {
                    span: Span::empty(self.mark),
                    token_type: BlockEnd,
                });
            }
        }
    }

    fn roll_indent(
        &mut self,
        col: u32,
        number: Option<usize>,
        token_type: TokenType<'input>,
        mark: Marker,
    ) {
        if self.flow_level > 0 {
            return;
        }

        if self.indent <= col {
            if let Some(last) = self.indents.last() {
                if !last.needs_block_end {
                    self.indent = last.indent;
                    self.indents.pop();
                }
            }
        }

        if self.indent < col {
            self.indents.push(Indent {
                indent: self.indent,
                needs_block_end: true,
            });
            self.indent = col;
            let span = Span::empty(mark);
            match number {
                Some(n) => self.insert_token(n - self.tokens_parsed, Token { span, token_type }),
                None => self.tokens.push_back(Token { span, token_type }),
            }
        }
    }

    /// Push a pseudo indentation level for inline compact nesting
    /// (`- x: y`). It emits no `BlockEnd` when popped.
    fn roll_one_col_indent(&mut self) {
        if self.flow_level == 0 && self.indents.last().is_some_and(|x| x.needs_block_end) {
            self.indents.push(Indent {
                indent: self.indent,
                needs_block_end: false,
            });
            self.indent += 1;
        }
    }

    fn unroll_non_block_indents(&mut self) {
        while let Some(indent) = self.indents.last() {
            if indent.needs_block_end {
                break;
            }
            self.indent = indent.indent;
            self.indents.pop();
        }
    }

    fn insert_token(&mut self, pos: usize, token: Token<'input>) {
        assert!(pos <= self.tokens.len());
        self.tokens.insert(pos, token);
    }

    fn increase_flow_level(&mut self) -> ScanResult {
        self.simple_keys.push(SimpleKey::new(Marker::default()));
        self.flow_level = self
            .flow_level
            .checked_add(1)
            .ok_or_else(|| YamlError::lexical(self.mark, "recursion limit exceeded"))?;
        Ok(())
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop().unwrap();
        }
    }

    fn stale_simple_keys(&mut self) -> ScanResult {
        for sk in &mut self.simple_keys {
            // Outside flow constructs, simple keys may not span multiple
            // lines, and never more than 1024 bytes.
            if sk.possible
                && self.flow_level == 0
                && (sk.mark.line < self.mark.line || sk.mark.pos + 1024 < self.mark.pos)
            {
                if sk.required {
                    return Err(YamlError::lexical(self.mark, "simple key expected ':'"));
                }
                sk.possible = false;
            }
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> ScanResult {
        let last = self.simple_keys.last_mut().unwrap();
        if last.possible && last.required {
            return Err(YamlError::lexical(self.mark, "simple key expected"));
        }

        last.possible = false;
        Ok(())
    }

    fn save_simple_key(&mut self) {
        if self.simple_key_allowed {
            let required = self.flow_level == 0
                && self.indent == self.mark.col
                && self.indents.last().is_some_and(|x| x.needs_block_end);

            let sk = SimpleKey {
                mark: self.mark,
                required,
                possible: true,
                token_number: self.tokens_parsed + self.tokens.len(),
            };

            self.simple_keys.pop();
            self.simple_keys.push(sk);
        }
    }
}

fn to_utf8(raw: Vec<u8>, mark: &Marker) -> YamlResult<String> {
    String::from_utf8(raw).map_err(|_| YamlError::lexical(*mark, "input is not valid UTF-8"))
}

impl<'input, S: Source> Iterator for Scanner<'input, S> {
    type Item = Token<'input>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() || self.stream_end_emitted {
            return None;
        }
        match self.next_token() {
            Ok(tok) => Some(tok),
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use yamlet_common::{ScalarStyle, TokenType};

    use super::Scanner;
    use crate::tokenizer::source::StrSource;

    fn kinds(input: &str) -> Vec<TokenType<'static>> {
        Scanner::new(StrSource::new(input))
            .map(|tok| tok.token_type)
            .collect()
    }

    #[test]
    fn simple_key_is_inserted_retroactively() {
        let toks = kinds("a: 1\n");
        assert_eq!(
            toks,
            vec![
                TokenType::StreamStart,
                TokenType::BlockMappingStart,
                TokenType::Key,
                TokenType::Scalar {
                    style: ScalarStyle::Plain,
                    value: "a".into()
                },
                TokenType::Value,
                TokenType::Scalar {
                    style: ScalarStyle::Plain,
                    value: "1".into()
                },
                TokenType::BlockEnd,
                TokenType::StreamEnd,
            ]
        );
    }

    #[test]
    fn flow_tokens_ignore_indentation() {
        let toks = kinds("[a,\n  b]\n");
        assert_eq!(
            toks,
            vec![
                TokenType::StreamStart,
                TokenType::FlowSequenceStart,
                TokenType::Scalar {
                    style: ScalarStyle::Plain,
                    value: "a".into()
                },
                TokenType::FlowEntry,
                TokenType::Scalar {
                    style: ScalarStyle::Plain,
                    value: "b".into()
                },
                TokenType::FlowSequenceEnd,
                TokenType::StreamEnd,
            ]
        );
    }

    #[test]
    fn tab_indentation_is_rejected() {
        let mut scanner = Scanner::new(StrSource::new("a:\n\tb: 1\n"));
        while scanner.next().is_some() {}
        assert!(scanner.error().is_some());
    }

    #[test]
    fn comment_tokens_surface_when_enabled() {
        let toks: Vec<_> = Scanner::with_comments(StrSource::new("a: 1 # trailing\n"))
            .map(|tok| tok.token_type)
            .collect();
        assert!(toks.contains(&TokenType::Comment {
            text: "trailing".into(),
            inline: true,
        }));
    }

    #[test]
    fn comments_are_dropped_by_default() {
        let toks = kinds("# leading\na: 1 # trailing\n");
        assert!(!toks
            .iter()
            .any(|t| matches!(t, TokenType::Comment { .. })));
    }
}

use hashbrown::HashSet;

use yamlet_common::{
    CollectionStyle, ScalarStyle, ScanResult, Span, TagDirective, TokenType, YamlError, YamlResult,
};

use crate::events::{Event, EventSource, SpannedEvent};
use crate::tokenizer::{Scanner, Source, StrSource, Token};

#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

/// Dataless mirror of [`TokenType`], so state handlers can branch on the
/// upcoming token without borrowing it.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum TokenKind {
    StreamStart,
    StreamEnd,
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    BlockEntry,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    FlowEntry,
    Key,
    Value,
    Alias,
    Anchor,
    VersionDirective,
    TagDirective,
    Tag,
    Scalar,
    Comment,
}

fn kind_of(token_type: &TokenType<'_>) -> TokenKind {
    match token_type {
        TokenType::StreamStart => TokenKind::StreamStart,
        TokenType::StreamEnd => TokenKind::StreamEnd,
        TokenType::DocumentStart => TokenKind::DocumentStart,
        TokenType::DocumentEnd => TokenKind::DocumentEnd,
        TokenType::BlockSequenceStart => TokenKind::BlockSequenceStart,
        TokenType::BlockMappingStart => TokenKind::BlockMappingStart,
        TokenType::BlockEnd => TokenKind::BlockEnd,
        TokenType::BlockEntry => TokenKind::BlockEntry,
        TokenType::FlowSequenceStart => TokenKind::FlowSequenceStart,
        TokenType::FlowSequenceEnd => TokenKind::FlowSequenceEnd,
        TokenType::FlowMappingStart => TokenKind::FlowMappingStart,
        TokenType::FlowMappingEnd => TokenKind::FlowMappingEnd,
        TokenType::FlowEntry => TokenKind::FlowEntry,
        TokenType::Key => TokenKind::Key,
        TokenType::Value => TokenKind::Value,
        TokenType::Alias(_) => TokenKind::Alias,
        TokenType::Anchor(_) => TokenKind::Anchor,
        TokenType::VersionDirective { .. } => TokenKind::VersionDirective,
        TokenType::TagDirective { .. } => TokenKind::TagDirective,
        TokenType::Tag { .. } => TokenKind::Tag,
        TokenType::Scalar { .. } => TokenKind::Scalar,
        TokenType::Comment { .. } => TokenKind::Comment,
    }
}

/// Pull parser turning the scanner's tokens into parsing events.
///
/// Anchors register on sight and may be re-defined; aliases naming an
/// anchor not yet seen are recorded and re-checked once the document ends,
/// so forward references are legal and a name never declared anywhere in
/// the document surfaces as [`YamlError::AnchorNotFound`].
pub struct Parser<'input, S> {
    scanner: Scanner<'input, S>,
    state: State,
    states: Vec<State>,
    token: Option<Token<'input>>,
    current: Option<SpannedEvent>,

    anchors: HashSet<String>,
    pending_aliases: Vec<(String, Span)>,
    tag_directives: Vec<TagDirective>,
}

impl<'input> Parser<'input, StrSource<'input>> {
    #[must_use]
    pub fn from_str(input: &'input str) -> Self {
        Parser::new(StrSource::new(input))
    }

    /// A parser that surfaces comments as [`Event::Comment`] instead of
    /// discarding them.
    #[must_use]
    pub fn from_str_with_comments(input: &'input str) -> Self {
        Parser::with_scanner(Scanner::with_comments(StrSource::new(input)))
    }
}

impl<'input, S: Source> Parser<'input, S> {
    pub fn new(src: S) -> Parser<'input, S> {
        Parser::with_scanner(Scanner::new(src))
    }

    pub fn with_scanner(scanner: Scanner<'input, S>) -> Parser<'input, S> {
        Parser {
            scanner,
            state: State::StreamStart,
            states: Vec::new(),
            token: None,
            current: None,

            anchors: HashSet::new(),
            pending_aliases: Vec::new(),
            tag_directives: Vec::new(),
        }
    }

    /// The next event in document order. After [`Event::StreamEnd`] the
    /// stream is exhausted and the call keeps returning it.
    pub fn next_event(&mut self) -> YamlResult<SpannedEvent> {
        match self.current.take() {
            Some(ev) => Ok(ev),
            None => self.parse(),
        }
    }

    /// Peek at the next event without consuming it.
    pub fn peek_event(&mut self) -> YamlResult<&SpannedEvent> {
        if self.current.is_none() {
            self.current = Some(self.parse()?);
        }
        Ok(self.current.as_ref().unwrap())
    }

    fn parse(&mut self) -> YamlResult<SpannedEvent> {
        if self.state == State::End {
            return Ok(SpannedEvent::new(
                Event::StreamEnd,
                Span::empty(self.scanner.mark),
            ));
        }

        // Comments pass through without disturbing the grammar state.
        if self.peek_kind()? == TokenKind::Comment {
            let tok = self.fetch_token();
            if let TokenType::Comment { text, inline } = tok.token_type {
                return Ok(SpannedEvent::new(
                    Event::Comment {
                        text: text.into_owned(),
                        inline,
                    },
                    tok.span,
                ));
            }
            unreachable!()
        }

        self.state_machine()
    }

    fn state_machine(&mut self) -> YamlResult<SpannedEvent> {
        match self.state {
            State::StreamStart => self.stream_start(),

            State::ImplicitDocumentStart => self.document_start(true),
            State::DocumentStart => self.document_start(false),
            State::DocumentContent => self.document_content(),
            State::DocumentEnd => self.document_end(),

            State::BlockNode => self.parse_node(true, false),
            State::BlockMappingFirstKey => self.block_mapping_key(true),
            State::BlockMappingKey => self.block_mapping_key(false),
            State::BlockMappingValue => self.block_mapping_value(),

            State::BlockSequenceFirstEntry => self.block_sequence_entry(true),
            State::BlockSequenceEntry => self.block_sequence_entry(false),
            State::IndentlessSequenceEntry => self.indentless_sequence_entry(),

            State::FlowSequenceFirstEntry => self.flow_sequence_entry(true),
            State::FlowSequenceEntry => self.flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.flow_sequence_entry_mapping_end(),

            State::FlowMappingFirstKey => self.flow_mapping_key(true),
            State::FlowMappingKey => self.flow_mapping_key(false),
            State::FlowMappingValue => self.flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.flow_mapping_value(true),

            State::End => unreachable!(),
        }
    }

    fn peek_token(&mut self) -> YamlResult<&Token<'input>> {
        if self.token.is_none() {
            self.token = Some(self.scanner.next_token()?);
        }
        Ok(self.token.as_ref().unwrap())
    }

    fn peek_kind(&mut self) -> YamlResult<TokenKind> {
        Ok(kind_of(&self.peek_token()?.token_type))
    }

    fn peek_span(&mut self) -> YamlResult<Span> {
        Ok(self.peek_token()?.span)
    }

    fn fetch_token(&mut self) -> Token<'input> {
        self.token
            .take()
            .expect("fetch_token needs to be preceded by peek_token")
    }

    fn skip(&mut self) {
        self.token = None;
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap();
    }

    fn push_state(&mut self, state: State) {
        self.states.push(state);
    }

    fn stream_start(&mut self) -> YamlResult<SpannedEvent> {
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::StreamStart => {
                self.state = State::ImplicitDocumentStart;
                self.skip();
                Ok(SpannedEvent::new(Event::StreamStart, span))
            }
            _ => Err(YamlError::syntax(
                span.start,
                "did not find expected <stream-start>",
            )),
        }
    }

    fn document_start(&mut self, implicit: bool) -> YamlResult<SpannedEvent> {
        if !implicit {
            while self.peek_kind()? == TokenKind::DocumentEnd {
                self.skip();
            }
        }

        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::StreamEnd => {
                self.state = State::End;
                self.skip();
                Ok(SpannedEvent::new(Event::StreamEnd, span))
            }
            TokenKind::VersionDirective | TokenKind::TagDirective | TokenKind::DocumentStart => {
                self.explicit_document_start()
            }
            _ if implicit => {
                self.push_state(State::DocumentEnd);
                self.state = State::BlockNode;
                Ok(SpannedEvent::new(
                    Event::DocumentStart {
                        version: None,
                        tags: Vec::new(),
                        implicit: true,
                    },
                    span,
                ))
            }
            _ => self.explicit_document_start(),
        }
    }

    fn explicit_document_start(&mut self) -> YamlResult<SpannedEvent> {
        let (version, tags) = self.process_directives()?;
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::DocumentStart => {
                self.push_state(State::DocumentEnd);
                self.state = State::DocumentContent;
                self.skip();
                Ok(SpannedEvent::new(
                    Event::DocumentStart {
                        version,
                        tags,
                        implicit: false,
                    },
                    span,
                ))
            }
            _ => Err(YamlError::syntax(
                span.start,
                "did not find expected <document start>",
            )),
        }
    }

    /// Accumulate `%YAML`/`%TAG` directives for the upcoming document.
    /// Duplicates and unsupported versions are semantic errors.
    fn process_directives(&mut self) -> YamlResult<(Option<(u8, u8)>, Vec<TagDirective>)> {
        let mut version = None;
        let mut tags: Vec<TagDirective> = Vec::new();
        loop {
            match self.peek_kind()? {
                TokenKind::VersionDirective => {
                    let tok = self.fetch_token();
                    if version.is_some() {
                        return Err(YamlError::semantic(tok.span, "duplicate %YAML directive"));
                    }
                    if let TokenType::VersionDirective { major, minor } = tok.token_type {
                        if major != 1 {
                            return Err(YamlError::semantic(
                                tok.span,
                                &format!("unsupported YAML version {major}.{minor}"),
                            ));
                        }
                        version = Some((major, minor));
                    }
                }
                TokenKind::TagDirective => {
                    let tok = self.fetch_token();
                    if let TokenType::TagDirective { handle, prefix } = tok.token_type {
                        if tags.iter().any(|t| t.handle == handle) {
                            return Err(YamlError::semantic(
                                tok.span,
                                &format!("duplicate %TAG directive for handle '{handle}'"),
                            ));
                        }
                        tags.push(TagDirective::new(&handle, &prefix));
                    }
                }
                _ => break,
            }
        }
        self.tag_directives = tags.clone();
        Ok((version, tags))
    }

    fn document_content(&mut self) -> YamlResult<SpannedEvent> {
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::VersionDirective
            | TokenKind::TagDirective
            | TokenKind::DocumentStart
            | TokenKind::DocumentEnd
            | TokenKind::StreamEnd => {
                // An empty document.
                self.pop_state();
                Ok(SpannedEvent::new(Event::empty_scalar(), span))
            }
            _ => self.parse_node(true, false),
        }
    }

    fn document_end(&mut self) -> YamlResult<SpannedEvent> {
        let mut implicit = true;
        let span = self.peek_span()?;
        if self.peek_kind()? == TokenKind::DocumentEnd {
            self.skip();
            implicit = false;
        }

        // Second phase of alias resolution: anything still pending was
        // never anchored anywhere in this document.
        self.check_pending_aliases()?;
        self.anchors.clear();
        self.tag_directives.clear();

        self.state = State::DocumentStart;
        Ok(SpannedEvent::new(Event::DocumentEnd { implicit }, span))
    }

    fn check_pending_aliases(&mut self) -> ScanResult {
        for (name, span) in &self.pending_aliases {
            if !self.anchors.contains(name) {
                return Err(YamlError::anchor_not_found(*span, name));
            }
        }
        self.pending_aliases.clear();
        Ok(())
    }

    fn lookup_handle(&self, handle: &str) -> Option<&str> {
        self.tag_directives
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| t.prefix.as_str())
    }

    /// Expand a tag token against the document's directive table. The
    /// primary and secondary handles fall back to their standard
    /// expansions; any other unlisted handle is a semantic error.
    fn resolve_tag(&self, handle: &str, suffix: &str, span: Span) -> YamlResult<Option<String>> {
        if handle.is_empty() {
            // The bare `!` non-specific tag, or a verbatim `!<...>` tag.
            if suffix == "!" {
                return Ok(Some("!".to_string()));
            }
            return decode_tag(suffix, span).map(Some);
        }
        let prefix = match self.lookup_handle(handle) {
            Some(prefix) => prefix,
            None => match handle {
                "!" => "!",
                "!!" => "tag:yaml.org,2002:",
                _ => {
                    return Err(YamlError::semantic(
                        span,
                        &format!("unresolved tag handle '{handle}'"),
                    ));
                }
            },
        };
        decode_tag(&format!("{prefix}{suffix}"), span).map(Some)
    }

    #[allow(clippy::too_many_lines)]
    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> YamlResult<SpannedEvent> {
        let mut anchor: Option<String> = None;
        let mut tag_token: Option<(String, String, Span)> = None;

        match self.peek_kind()? {
            TokenKind::Alias => {
                self.pop_state();
                let tok = self.fetch_token();
                if let TokenType::Alias(name) = tok.token_type {
                    let name = name.into_owned();
                    if !self.anchors.contains(&name) {
                        self.pending_aliases.push((name.clone(), tok.span));
                    }
                    return Ok(SpannedEvent::new(Event::Alias { name }, tok.span));
                }
                unreachable!()
            }
            TokenKind::Anchor => {
                let tok = self.fetch_token();
                if let TokenType::Anchor(name) = tok.token_type {
                    let name = name.into_owned();
                    self.anchors.insert(name.clone());
                    anchor = Some(name);
                }
                if self.peek_kind()? == TokenKind::Tag {
                    let tok = self.fetch_token();
                    if let TokenType::Tag { handle, suffix } = tok.token_type {
                        tag_token = Some((handle.into_owned(), suffix.into_owned(), tok.span));
                    }
                }
            }
            TokenKind::Tag => {
                let tok = self.fetch_token();
                if let TokenType::Tag { handle, suffix } = tok.token_type {
                    tag_token = Some((handle.into_owned(), suffix.into_owned(), tok.span));
                }
                if self.peek_kind()? == TokenKind::Anchor {
                    let tok = self.fetch_token();
                    if let TokenType::Anchor(name) = tok.token_type {
                        let name = name.into_owned();
                        self.anchors.insert(name.clone());
                        anchor = Some(name);
                    }
                }
            }
            _ => {}
        }

        let tag = match tag_token {
            Some((handle, suffix, span)) => self.resolve_tag(&handle, &suffix, span)?,
            None => None,
        };
        let implicit = tag.is_none();

        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::BlockEntry if indentless_sequence => {
                self.state = State::IndentlessSequenceEntry;
                Ok(SpannedEvent::new(
                    Event::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Block,
                    },
                    span,
                ))
            }
            TokenKind::Scalar => {
                self.pop_state();
                let tok = self.fetch_token();
                if let TokenType::Scalar { style, value } = tok.token_type {
                    let plain_implicit = implicit && style == ScalarStyle::Plain;
                    let quoted_implicit = implicit && style != ScalarStyle::Plain;
                    return Ok(SpannedEvent::new(
                        Event::Scalar {
                            anchor,
                            tag,
                            value: value.into_owned(),
                            style,
                            plain_implicit,
                            quoted_implicit,
                        },
                        tok.span,
                    ));
                }
                unreachable!()
            }
            TokenKind::FlowSequenceStart => {
                self.state = State::FlowSequenceFirstEntry;
                Ok(SpannedEvent::new(
                    Event::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Flow,
                    },
                    span,
                ))
            }
            TokenKind::FlowMappingStart => {
                self.state = State::FlowMappingFirstKey;
                Ok(SpannedEvent::new(
                    Event::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Flow,
                    },
                    span,
                ))
            }
            TokenKind::BlockSequenceStart if block => {
                self.state = State::BlockSequenceFirstEntry;
                Ok(SpannedEvent::new(
                    Event::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Block,
                    },
                    span,
                ))
            }
            TokenKind::BlockMappingStart if block => {
                self.state = State::BlockMappingFirstKey;
                Ok(SpannedEvent::new(
                    Event::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        style: CollectionStyle::Block,
                    },
                    span,
                ))
            }
            // An empty scalar may follow a lone anchor or tag.
            _ if anchor.is_some() || tag.is_some() => {
                self.pop_state();
                Ok(SpannedEvent::new(
                    Event::empty_scalar_with(anchor, tag),
                    span,
                ))
            }
            _ => Err(YamlError::syntax(
                span.start,
                "while parsing a node, did not find expected node content",
            )),
        }
    }

    fn block_mapping_key(&mut self, first: bool) -> YamlResult<SpannedEvent> {
        // Skip BlockMappingStart.
        if first {
            self.peek_token()?;
            self.skip();
        }
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::Key => {
                self.skip();
                let span = self.peek_span()?;
                match self.peek_kind()? {
                    TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd => {
                        self.state = State::BlockMappingValue;
                        Ok(SpannedEvent::new(Event::empty_scalar(), span))
                    }
                    _ => {
                        self.push_state(State::BlockMappingValue);
                        self.parse_node(true, true)
                    }
                }
            }
            // libyaml fails on YAML 1.2 example 8.18, a value with no key
            TokenKind::Value => {
                self.state = State::BlockMappingValue;
                Ok(SpannedEvent::new(Event::empty_scalar(), span))
            }
            TokenKind::BlockEnd => {
                self.pop_state();
                self.skip();
                Ok(SpannedEvent::new(Event::MappingEnd, span))
            }
            _ => Err(YamlError::syntax(
                span.start,
                "while parsing a block mapping, did not find expected key",
            )),
        }
    }

    fn block_mapping_value(&mut self) -> YamlResult<SpannedEvent> {
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::Value => {
                self.skip();
                let span = self.peek_span()?;
                match self.peek_kind()? {
                    TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd => {
                        self.state = State::BlockMappingKey;
                        Ok(SpannedEvent::new(Event::empty_scalar(), span))
                    }
                    _ => {
                        self.push_state(State::BlockMappingKey);
                        self.parse_node(true, true)
                    }
                }
            }
            _ => {
                self.state = State::BlockMappingKey;
                Ok(SpannedEvent::new(Event::empty_scalar(), span))
            }
        }
    }

    fn block_sequence_entry(&mut self, first: bool) -> YamlResult<SpannedEvent> {
        // Skip BlockSequenceStart.
        if first {
            self.peek_token()?;
            self.skip();
        }
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::BlockEnd => {
                self.pop_state();
                self.skip();
                Ok(SpannedEvent::new(Event::SequenceEnd, span))
            }
            TokenKind::BlockEntry => {
                self.skip();
                let span = self.peek_span()?;
                match self.peek_kind()? {
                    TokenKind::BlockEntry | TokenKind::BlockEnd => {
                        self.state = State::BlockSequenceEntry;
                        Ok(SpannedEvent::new(Event::empty_scalar(), span))
                    }
                    _ => {
                        self.push_state(State::BlockSequenceEntry);
                        self.parse_node(true, false)
                    }
                }
            }
            _ => Err(YamlError::syntax(
                span.start,
                "while parsing a block collection, did not find expected '-' indicator",
            )),
        }
    }

    fn indentless_sequence_entry(&mut self) -> YamlResult<SpannedEvent> {
        let span = self.peek_span()?;
        if self.peek_kind()? != TokenKind::BlockEntry {
            self.pop_state();
            return Ok(SpannedEvent::new(Event::SequenceEnd, span));
        }
        self.skip();

        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::BlockEntry | TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd => {
                self.state = State::IndentlessSequenceEntry;
                Ok(SpannedEvent::new(Event::empty_scalar(), span))
            }
            _ => {
                self.push_state(State::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        }
    }

    fn flow_sequence_entry(&mut self, first: bool) -> YamlResult<SpannedEvent> {
        // Skip FlowSequenceStart.
        if first {
            self.peek_token()?;
            self.skip();
        }
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::FlowSequenceEnd => {
                self.pop_state();
                self.skip();
                return Ok(SpannedEvent::new(Event::SequenceEnd, span));
            }
            TokenKind::FlowEntry if !first => self.skip(),
            _ if !first => {
                return Err(YamlError::syntax(
                    span.start,
                    "while parsing a flow sequence, expected ',' or ']'",
                ));
            }
            _ => {}
        }
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::FlowSequenceEnd => {
                self.pop_state();
                self.skip();
                Ok(SpannedEvent::new(Event::SequenceEnd, span))
            }
            TokenKind::Key => {
                // A single `key: value` pair inside a flow sequence is an
                // implicit mapping.
                self.state = State::FlowSequenceEntryMappingKey;
                self.skip();
                Ok(SpannedEvent::new(
                    Event::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        style: CollectionStyle::Flow,
                    },
                    span,
                ))
            }
            _ => {
                self.push_state(State::FlowSequenceEntry);
                self.parse_node(false, false)
            }
        }
    }

    fn flow_sequence_entry_mapping_key(&mut self) -> YamlResult<SpannedEvent> {
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowSequenceEnd => {
                self.skip();
                self.state = State::FlowSequenceEntryMappingValue;
                Ok(SpannedEvent::new(Event::empty_scalar(), span))
            }
            _ => {
                self.push_state(State::FlowSequenceEntryMappingValue);
                self.parse_node(false, false)
            }
        }
    }

    fn flow_sequence_entry_mapping_value(&mut self) -> YamlResult<SpannedEvent> {
        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::Value => {
                self.skip();
                let span = self.peek_span()?;
                match self.peek_kind()? {
                    TokenKind::FlowEntry | TokenKind::FlowSequenceEnd => {
                        self.state = State::FlowSequenceEntryMappingEnd;
                        Ok(SpannedEvent::new(Event::empty_scalar(), span))
                    }
                    _ => {
                        self.push_state(State::FlowSequenceEntryMappingEnd);
                        self.parse_node(false, false)
                    }
                }
            }
            _ => {
                self.state = State::FlowSequenceEntryMappingEnd;
                Ok(SpannedEvent::new(Event::empty_scalar(), span))
            }
        }
    }

    fn flow_sequence_entry_mapping_end(&mut self) -> YamlResult<SpannedEvent> {
        self.state = State::FlowSequenceEntry;
        Ok(SpannedEvent::new(
            Event::MappingEnd,
            Span::empty(self.scanner.mark),
        ))
    }

    fn flow_mapping_key(&mut self, first: bool) -> YamlResult<SpannedEvent> {
        // Skip FlowMappingStart.
        if first {
            self.peek_token()?;
            self.skip();
        }
        let span = self.peek_span()?;
        if self.peek_kind()? == TokenKind::FlowMappingEnd {
            self.pop_state();
            self.skip();
            return Ok(SpannedEvent::new(Event::MappingEnd, span));
        }

        if !first {
            if self.peek_kind()? == TokenKind::FlowEntry {
                self.skip();
            } else {
                return Err(YamlError::syntax(
                    span.start,
                    "while parsing a flow mapping, did not find expected ',' or '}'",
                ));
            }
            // A trailing comma before the closing brace.
            let span = self.peek_span()?;
            if self.peek_kind()? == TokenKind::FlowMappingEnd {
                self.pop_state();
                self.skip();
                return Ok(SpannedEvent::new(Event::MappingEnd, span));
            }
        }

        let span = self.peek_span()?;
        match self.peek_kind()? {
            TokenKind::Key => {
                self.skip();
                let span = self.peek_span()?;
                match self.peek_kind()? {
                    TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowMappingEnd => {
                        self.state = State::FlowMappingValue;
                        Ok(SpannedEvent::new(Event::empty_scalar(), span))
                    }
                    _ => {
                        self.push_state(State::FlowMappingValue);
                        self.parse_node(false, false)
                    }
                }
            }
            TokenKind::Value => {
                self.state = State::FlowMappingValue;
                Ok(SpannedEvent::new(Event::empty_scalar(), span))
            }
            TokenKind::FlowMappingEnd => {
                self.pop_state();
                self.skip();
                Ok(SpannedEvent::new(Event::MappingEnd, span))
            }
            _ => {
                self.push_state(State::FlowMappingEmptyValue);
                self.parse_node(false, false)
            }
        }
    }

    fn flow_mapping_value(&mut self, empty: bool) -> YamlResult<SpannedEvent> {
        let span = self.peek_span()?;
        if empty {
            self.state = State::FlowMappingKey;
            return Ok(SpannedEvent::new(Event::empty_scalar(), span));
        }

        if self.peek_kind()? == TokenKind::Value {
            self.skip();
            match self.peek_kind()? {
                TokenKind::FlowEntry | TokenKind::FlowMappingEnd => {}
                _ => {
                    self.push_state(State::FlowMappingKey);
                    return self.parse_node(false, false);
                }
            }
        }

        let span = self.peek_span()?;
        self.state = State::FlowMappingKey;
        Ok(SpannedEvent::new(Event::empty_scalar(), span))
    }
}

fn decode_tag(raw: &str, span: Span) -> YamlResult<String> {
    if raw.contains('%') {
        let decoded = urlencoding::decode_binary(raw.as_bytes()).into_owned();
        String::from_utf8(decoded)
            .map_err(|_| YamlError::semantic(span, "tag is not valid UTF-8 after URI decoding"))
    } else {
        Ok(raw.to_string())
    }
}

impl<'input, S: Source> EventSource for Parser<'input, S> {
    fn next_event(&mut self) -> YamlResult<SpannedEvent> {
        Parser::next_event(self)
    }
}

/// Iterating yields every event once and fuses after `StreamEnd` or the
/// first error.
impl<'input, S: Source> Iterator for Parser<'input, S> {
    type Item = YamlResult<SpannedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::End && self.current.is_none() {
            return None;
        }
        Some(self.next_event())
    }
}

#[cfg(test)]
mod test {
    use super::Parser;
    use crate::events::Event;

    #[test]
    fn peek_matches_next() {
        let input = "a: [1, 2]\nb: &x c\nd: *x\n";
        let mut parser = Parser::from_str(input);
        loop {
            let peeked = parser.peek_event().unwrap().clone();
            let ev = parser.next_event().unwrap();
            assert_eq!(peeked, ev);
            if ev.event == Event::StreamEnd {
                break;
            }
        }
    }

    #[test]
    fn iterator_fuses_after_stream_end() {
        let events: Vec<_> = Parser::from_str("x").collect();
        assert!(matches!(
            events.last().unwrap().as_ref().unwrap().event,
            Event::StreamEnd
        ));
        assert_eq!(
            events
                .iter()
                .filter(|ev| matches!(ev.as_ref().unwrap().event, Event::StreamEnd))
                .count(),
            1
        );
    }
}

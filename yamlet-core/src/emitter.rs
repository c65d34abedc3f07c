use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;
use yamlet_common::{CollectionStyle, ScalarStyle};

use crate::events::Event;

/// A malformed event sequence is a programming-contract violation of the
/// caller, not a data error; the emitter fails immediately and writes
/// nothing further.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error(transparent)]
    Fmt(#[from] fmt::Error),
    #[error("unexpected event: {0}")]
    UnexpectedEvent(String),
}

/// A convenience alias for emitter functions that may fail without returning a value.
pub type EmitResult = Result<(), EmitError>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentRoot,
    DocumentEnd,
    BlockSequenceItem,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
    FlowSequenceFirstItem,
    FlowSequenceItem,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    End,
}

struct ScalarAnalysis {
    multiline: bool,
    allow_flow_plain: bool,
    allow_block_plain: bool,
    allow_single: bool,
    allow_block: bool,
}

/// Push-driven emitter producing YAML text from a well-formed event
/// stream.
///
/// One event of lookahead is buffered so that a collection start knows
/// whether it is empty; empty collections always emit in flow form.
pub struct Emitter<'a> {
    writer: &'a mut dyn fmt::Write,
    state: State,
    states: Vec<State>,
    queue: VecDeque<Event>,

    indents: Vec<i32>,
    indent: i32,
    best_indent: u32,
    flow_level: u32,

    column: u32,
    whitespace: bool,
    indention: bool,
    open_ended: bool,
    last_alias: bool,
    document_count: usize,
}

impl<'a> Emitter<'a> {
    /// Create a new emitter serializing into `writer`.
    pub fn new(writer: &'a mut dyn fmt::Write) -> Emitter<'a> {
        Emitter {
            writer,
            state: State::StreamStart,
            states: Vec::new(),
            queue: VecDeque::new(),

            indents: Vec::new(),
            indent: -1,
            best_indent: 2,
            flow_level: 0,

            column: 0,
            whitespace: true,
            indention: true,
            open_ended: false,
            last_alias: false,
            document_count: 0,
        }
    }

    /// Push one event. Output is produced incrementally; at most one
    /// event is held back for lookahead.
    pub fn emit(&mut self, event: Event) -> EmitResult {
        self.queue.push_back(event);
        while !self.need_more_events() {
            let event = self.queue.pop_front().unwrap();
            self.process(event)?;
        }
        Ok(())
    }

    /// Push a whole event sequence.
    pub fn emit_all<I>(&mut self, events: I) -> EmitResult
    where
        I: IntoIterator<Item = Event>,
    {
        for event in events {
            self.emit(event)?;
        }
        Ok(())
    }

    fn need_more_events(&self) -> bool {
        match self.queue.front() {
            None => true,
            Some(Event::SequenceStart { .. } | Event::MappingStart { .. }) => self.queue.len() < 2,
            Some(_) => false,
        }
    }

    fn process(&mut self, event: Event) -> EmitResult {
        if let Event::Comment { text, inline } = &event {
            return self.emit_comment(text, *inline);
        }

        match self.state {
            State::StreamStart => match event {
                Event::StreamStart => {
                    self.state = State::FirstDocumentStart;
                    Ok(())
                }
                ev => Err(unexpected("expected stream start", &ev)),
            },
            State::FirstDocumentStart | State::DocumentStart => self.emit_document_start(event),
            State::DocumentRoot => {
                self.states.push(State::DocumentEnd);
                self.emit_node(event, false, false)
            }
            State::DocumentEnd => self.emit_document_end(event),

            State::BlockSequenceItem => self.emit_block_sequence_item(event),
            State::BlockMappingKey => self.emit_block_mapping_key(event),
            State::BlockMappingSimpleValue => self.emit_block_mapping_value(event, true),
            State::BlockMappingValue => self.emit_block_mapping_value(event, false),

            State::FlowSequenceFirstItem => self.emit_flow_sequence_item(event, true),
            State::FlowSequenceItem => self.emit_flow_sequence_item(event, false),
            State::FlowMappingFirstKey => self.emit_flow_mapping_key(event, true),
            State::FlowMappingKey => self.emit_flow_mapping_key(event, false),
            State::FlowMappingValue => self.emit_flow_mapping_value(event),

            State::End => Err(unexpected("no events are expected after stream end", &event)),
        }
    }

    fn emit_document_start(&mut self, event: Event) -> EmitResult {
        match event {
            Event::DocumentStart {
                version,
                tags,
                implicit,
            } => {
                if self.column > 0 {
                    self.write_break()?;
                }
                let has_directives = version.is_some() || !tags.is_empty();
                // Directives attach to the next document; an open-ended
                // previous document must be closed off first.
                if self.open_ended && has_directives {
                    self.write_indicator("...", true, false, false)?;
                    self.write_break()?;
                }
                self.open_ended = false;

                if let Some((major, minor)) = version {
                    self.raw_write(&format!("%YAML {major}.{minor}"))?;
                    self.write_break()?;
                }
                for tag in &tags {
                    self.raw_write(&format!("%TAG {} {}", tag.handle, tag.prefix))?;
                    self.write_break()?;
                }

                let explicit = !implicit || has_directives || self.document_count > 0;
                if explicit {
                    self.write_indicator("---", true, false, false)?;
                }

                self.document_count += 1;
                self.state = State::DocumentRoot;
                Ok(())
            }
            Event::StreamEnd => {
                self.state = State::End;
                Ok(())
            }
            ev => Err(unexpected("expected document start or stream end", &ev)),
        }
    }

    fn emit_document_end(&mut self, event: Event) -> EmitResult {
        match event {
            Event::DocumentEnd { implicit } => {
                if self.column > 0 {
                    self.write_break()?;
                }
                if implicit {
                    self.open_ended = true;
                } else {
                    self.write_indicator("...", true, false, false)?;
                    self.write_break()?;
                }

                self.indents.clear();
                self.indent = -1;
                self.whitespace = true;
                self.indention = true;
                self.state = State::DocumentStart;
                Ok(())
            }
            ev => Err(unexpected("expected document end", &ev)),
        }
    }

    fn emit_node(&mut self, event: Event, in_mapping_value: bool, simple_key: bool) -> EmitResult {
        match event {
            Event::Alias { name } => self.emit_alias(&name),
            Event::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                self.last_alias = false;
                self.emit_properties(anchor.as_deref(), tag.as_deref())?;
                self.emit_scalar(&value, style, simple_key)?;
                self.end_node()
            }
            Event::SequenceStart {
                anchor, tag, style, ..
            } => {
                self.last_alias = false;
                self.emit_properties(anchor.as_deref(), tag.as_deref())?;
                let empty = matches!(self.queue.front(), Some(Event::SequenceEnd));
                if self.flow_level > 0 || style == CollectionStyle::Flow || empty {
                    self.write_indicator("[", true, true, false)?;
                    self.flow_level += 1;
                    self.increase_indent(true, false);
                    self.state = State::FlowSequenceFirstItem;
                } else {
                    self.increase_indent(false, in_mapping_value && !self.indention);
                    self.state = State::BlockSequenceItem;
                }
                Ok(())
            }
            Event::MappingStart {
                anchor, tag, style, ..
            } => {
                self.last_alias = false;
                self.emit_properties(anchor.as_deref(), tag.as_deref())?;
                let empty = matches!(self.queue.front(), Some(Event::MappingEnd));
                if self.flow_level > 0 || style == CollectionStyle::Flow || empty {
                    self.write_indicator("{", true, true, false)?;
                    self.flow_level += 1;
                    self.increase_indent(true, false);
                    self.state = State::FlowMappingFirstKey;
                } else {
                    self.increase_indent(false, false);
                    self.state = State::BlockMappingKey;
                }
                Ok(())
            }
            ev => Err(unexpected("expected a node", &ev)),
        }
    }

    fn end_node(&mut self) -> EmitResult {
        match self.states.pop() {
            Some(state) => {
                self.state = state;
                Ok(())
            }
            None => Err(EmitError::UnexpectedEvent(
                "event stream ended more nodes than it started".into(),
            )),
        }
    }

    fn emit_block_sequence_item(&mut self, event: Event) -> EmitResult {
        if event == Event::SequenceEnd {
            self.decrease_indent();
            return self.end_node();
        }
        expect_node(&event)?;
        self.write_indent()?;
        self.write_indicator("-", true, false, true)?;
        self.states.push(State::BlockSequenceItem);
        self.emit_node(event, false, false)
    }

    fn emit_block_mapping_key(&mut self, event: Event) -> EmitResult {
        if event == Event::MappingEnd {
            self.decrease_indent();
            return self.end_node();
        }
        expect_node(&event)?;
        self.write_indent()?;
        if is_simple_key(&event) {
            self.states.push(State::BlockMappingSimpleValue);
            self.emit_node(event, false, true)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(State::BlockMappingValue);
            self.emit_node(event, false, false)
        }
    }

    fn emit_block_mapping_value(&mut self, event: Event, simple: bool) -> EmitResult {
        expect_node(&event)?;
        if simple {
            self.write_indicator(":", self.last_alias, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        self.last_alias = false;
        self.states.push(State::BlockMappingKey);
        self.emit_node(event, true, false)
    }

    fn emit_flow_sequence_item(&mut self, event: Event, first: bool) -> EmitResult {
        if event == Event::SequenceEnd {
            self.write_indicator("]", false, false, false)?;
            self.flow_level -= 1;
            self.decrease_indent();
            return self.end_node();
        }
        expect_node(&event)?;
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        self.states.push(State::FlowSequenceItem);
        self.emit_node(event, false, false)
    }

    fn emit_flow_mapping_key(&mut self, event: Event, first: bool) -> EmitResult {
        if event == Event::MappingEnd {
            self.write_indicator("}", false, false, false)?;
            self.flow_level -= 1;
            self.decrease_indent();
            return self.end_node();
        }
        expect_node(&event)?;
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if is_simple_key(&event) {
            self.states.push(State::FlowMappingValue);
            self.emit_node(event, false, true)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(State::FlowMappingValue);
            self.emit_node(event, false, false)
        }
    }

    fn emit_flow_mapping_value(&mut self, event: Event) -> EmitResult {
        expect_node(&event)?;
        self.write_indicator(":", self.last_alias, false, false)?;
        self.last_alias = false;
        self.states.push(State::FlowMappingKey);
        self.emit_node(event, true, false)
    }

    fn emit_alias(&mut self, name: &str) -> EmitResult {
        if !self.whitespace {
            self.raw_write(" ")?;
        }
        self.raw_write("*")?;
        self.raw_write(name)?;
        self.whitespace = false;
        self.indention = false;
        self.last_alias = true;
        self.end_node()
    }

    fn emit_properties(&mut self, anchor: Option<&str>, tag: Option<&str>) -> EmitResult {
        if let Some(anchor) = anchor {
            if !self.whitespace {
                self.raw_write(" ")?;
            }
            self.raw_write("&")?;
            self.raw_write(anchor)?;
            self.whitespace = false;
            self.indention = false;
        }
        if let Some(tag) = tag {
            if !self.whitespace {
                self.raw_write(" ")?;
            }
            let formatted = format_tag(tag);
            self.raw_write(&formatted)?;
            self.whitespace = false;
            self.indention = false;
        }
        Ok(())
    }

    fn emit_comment(&mut self, text: &str, inline: bool) -> EmitResult {
        if inline && self.column > 0 {
            if !self.whitespace {
                self.raw_write(" ")?;
            }
        } else {
            self.write_indent()?;
        }
        self.raw_write("# ")?;
        self.raw_write(text)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn emit_scalar(&mut self, value: &str, style: ScalarStyle, simple_key: bool) -> EmitResult {
        let analysis = analyze_scalar(value);
        let style = self.choose_scalar_style(style, &analysis, simple_key);
        match style {
            ScalarStyle::Any | ScalarStyle::Plain => self.write_plain(value),
            ScalarStyle::SingleQuoted => self.write_single_quoted(value),
            ScalarStyle::DoubleQuoted => self.write_double_quoted(value),
            ScalarStyle::Literal => self.write_block_scalar(value, true),
            ScalarStyle::Folded => self.write_block_scalar(value, false),
        }
    }

    /// Honor the requested style when it can represent the content in the
    /// current context, otherwise fall back along
    /// plain -> single-quoted -> double-quoted.
    fn choose_scalar_style(
        &self,
        requested: ScalarStyle,
        analysis: &ScalarAnalysis,
        simple_key: bool,
    ) -> ScalarStyle {
        let in_flow = self.flow_level > 0;
        let mut style = match requested {
            ScalarStyle::Any => ScalarStyle::Plain,
            s => s,
        };

        if style == ScalarStyle::Literal || style == ScalarStyle::Folded {
            if in_flow || simple_key || !analysis.allow_block {
                style = if analysis.multiline || !analysis.allow_single {
                    ScalarStyle::DoubleQuoted
                } else {
                    ScalarStyle::SingleQuoted
                };
            }
        }

        if style == ScalarStyle::Plain {
            let allowed = if in_flow {
                analysis.allow_flow_plain
            } else {
                analysis.allow_block_plain
            };
            if !allowed {
                style = if analysis.allow_single && !analysis.multiline {
                    ScalarStyle::SingleQuoted
                } else {
                    ScalarStyle::DoubleQuoted
                };
            }
        }

        if style == ScalarStyle::SingleQuoted && (!analysis.allow_single || analysis.multiline) {
            style = ScalarStyle::DoubleQuoted;
        }
        if simple_key && analysis.multiline {
            style = ScalarStyle::DoubleQuoted;
        }
        style
    }

    fn write_plain(&mut self, value: &str) -> EmitResult {
        if !self.whitespace && !value.is_empty() {
            self.raw_write(" ")?;
        }
        self.raw_write(value)?;
        if !value.is_empty() {
            self.whitespace = false;
            self.indention = false;
        }
        Ok(())
    }

    fn write_single_quoted(&mut self, value: &str) -> EmitResult {
        if !self.whitespace {
            self.raw_write(" ")?;
        }
        self.raw_write("'")?;
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            if c == '\'' {
                escaped.push_str("''");
            } else {
                escaped.push(c);
            }
        }
        self.raw_write(&escaped)?;
        self.raw_write("'")?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_double_quoted(&mut self, value: &str) -> EmitResult {
        if !self.whitespace {
            self.raw_write(" ")?;
        }
        self.raw_write("\"")?;
        self.raw_write(&escape_double_quoted(value))?;
        self.raw_write("\"")?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    /// Emit `value` as a literal (`|`) or folded (`>`) block scalar with
    /// the indicators needed for the content to round-trip byte-for-byte.
    fn write_block_scalar(&mut self, value: &str, literal: bool) -> EmitResult {
        let trailing_breaks = value.len() - value.trim_end_matches('\n').len();
        let body = &value[..value.len() - trailing_breaks];

        self.write_indicator(if literal { "|" } else { ">" }, true, false, false)?;
        // An explicit indentation indicator when the content opens with a
        // space or an empty line, which auto-detection would misread.
        if value.starts_with(' ') || value.starts_with('\n') {
            let digit = self.best_indent.to_string();
            self.raw_write(&digit)?;
        }
        match trailing_breaks {
            0 => self.raw_write("-")?,
            1 if !body.is_empty() => {}
            _ => self.raw_write("+")?,
        }

        self.increase_block_scalar_indent();

        if body.is_empty() {
            // Content made of line breaks only; every break is kept.
            for _ in 0..trailing_breaks {
                self.write_break()?;
            }
            self.decrease_indent();
            return Ok(());
        }

        let segments: Vec<&str> = body.split('\n').collect();
        let mut prev: Option<&str> = None;
        let mut pending_breaks = 0usize;
        for segment in segments {
            if segment.is_empty() {
                pending_breaks += 1;
                continue;
            }
            let breaks = match prev {
                // Leading empty lines are literal, plus the structural
                // break after the header.
                None => pending_breaks + 1,
                Some(prev) => {
                    let folds = !literal && !prev.starts_with(' ') && !segment.starts_with(' ');
                    // A single break would fold into a space; an extra
                    // break preserves it. Breaks around more-indented
                    // lines are already literal.
                    if folds {
                        pending_breaks + 2
                    } else {
                        pending_breaks + 1
                    }
                }
            };
            for _ in 0..breaks {
                self.write_break()?;
            }
            self.write_indent()?;
            self.raw_write(segment)?;
            self.whitespace = false;
            self.indention = false;
            prev = Some(segment);
            pending_breaks = 0;
        }
        // Keep-chomped trailing breaks are written out; the single clip
        // break is implied and supplied by whatever output follows.
        if trailing_breaks > 1 {
            for _ in 0..trailing_breaks {
                self.write_break()?;
            }
        }

        self.decrease_indent();
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        is_whitespace: bool,
        is_indention: bool,
    ) -> EmitResult {
        if need_whitespace && !self.whitespace {
            self.raw_write(" ")?;
        }
        self.raw_write(indicator)?;
        self.whitespace = is_whitespace;
        self.indention = self.indention && is_indention;
        Ok(())
    }

    fn write_indent(&mut self) -> EmitResult {
        let target = self.indent.max(0) as u32;
        if !self.indention || self.column > target || (self.column == target && !self.whitespace) {
            self.write_break()?;
        }
        while self.column < target {
            self.raw_write(" ")?;
        }
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_break(&mut self) -> EmitResult {
        self.writer.write_char('\n')?;
        self.column = 0;
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn raw_write(&mut self, s: &str) -> EmitResult {
        self.writer.write_str(s)?;
        self.column += s.chars().count() as u32;
        Ok(())
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        if self.indent < 0 {
            self.indent = if flow { self.best_indent as i32 } else { 0 };
        } else if !indentless {
            self.indent += self.best_indent as i32;
        }
    }

    /// Block scalar content is always indented past its parent, even at
    /// the document root.
    fn increase_block_scalar_indent(&mut self) {
        self.indents.push(self.indent);
        self.indent = self.indent.max(0) + self.best_indent as i32;
    }

    fn decrease_indent(&mut self) {
        self.indent = self.indents.pop().unwrap_or(-1);
    }
}

fn unexpected(expected: &str, event: &Event) -> EmitError {
    EmitError::UnexpectedEvent(format!("{expected}, got {event}"))
}

fn expect_node(event: &Event) -> EmitResult {
    match event {
        Event::Alias { .. }
        | Event::Scalar { .. }
        | Event::SequenceStart { .. }
        | Event::MappingStart { .. } => Ok(()),
        ev => Err(unexpected("expected a node", ev)),
    }
}

fn is_simple_key(event: &Event) -> bool {
    match event {
        Event::Alias { .. } => true,
        Event::Scalar { value, .. } => value.len() <= 128 && !value.contains('\n'),
        _ => false,
    }
}

fn format_tag(tag: &str) -> String {
    if tag == "!" {
        "!".to_string()
    } else if let Some(suffix) = tag.strip_prefix("tag:yaml.org,2002:") {
        format!("!!{suffix}")
    } else if tag.starts_with('!') {
        tag.to_string()
    } else {
        format!("!<{tag}>")
    }
}

fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn analyze_scalar(value: &str) -> ScalarAnalysis {
    if value.is_empty() {
        return ScalarAnalysis {
            multiline: false,
            allow_flow_plain: false,
            allow_block_plain: true,
            allow_single: true,
            allow_block: false,
        };
    }

    let mut multiline = false;
    let mut special = false;
    for c in value.chars() {
        match c {
            '\n' => multiline = true,
            c if (c as u32) < 0x20 || c == '\x7f' => special = true,
            _ => {}
        }
    }

    let leading = value.chars().next().unwrap();
    let mut allow_plain = !special
        && !multiline
        && !value.starts_with(' ')
        && !value.ends_with(' ')
        && !matches!(
            leading,
            '-' | '?'
                | ':'
                | ','
                | '['
                | ']'
                | '{'
                | '}'
                | '#'
                | '&'
                | '*'
                | '!'
                | '|'
                | '>'
                | '\''
                | '"'
                | '%'
                | '@'
                | '`'
        );
    if allow_plain && (value.contains(": ") || value.ends_with(':') || value.contains(" #")) {
        allow_plain = false;
    }

    let allow_flow_plain = allow_plain
        && !value.contains(|c| matches!(c, ',' | '[' | ']' | '{' | '}'))
        && !value.contains(':');

    // Block scalars carry any printable content verbatim; escapes do not
    // exist there, so control characters force double quotes.
    let allow_block = !value
        .chars()
        .any(|c| ((c as u32) < 0x20 && c != '\n' && c != '\t') || c == '\x7f');

    ScalarAnalysis {
        multiline,
        allow_flow_plain,
        allow_block_plain: allow_plain,
        allow_single: !special && !multiline,
        allow_block,
    }
}

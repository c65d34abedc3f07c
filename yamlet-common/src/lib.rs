use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use thiserror::Error;

/// A position inside the scanned character stream.
///
/// `pos` is the byte offset into the input. `line` and `col` are 1-based
/// while the scanner is live; the all-zero [`Marker::default`] acts as the
/// empty sentinel for synthetic tokens and end-of-stream positions.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct Marker {
    /// Byte offset into the input.
    pub pos: usize,
    /// Line of the mark. One indexed.
    pub line: u32,
    /// Column of the mark. One indexed.
    pub col: u32,
}

impl Marker {
    #[must_use]
    pub fn new(pos: usize, line: u32, col: u32) -> Marker {
        Marker { pos, line, col }
    }
}

impl Ord for Marker {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.pos, self.line, self.col).cmp(&(other.pos, other.line, other.col))
    }
}

impl PartialOrd for Marker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

/// Start and end [`Marker`] of a token or event.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default)]
pub struct Span {
    pub start: Marker,
    pub end: Marker,
}

impl Span {
    #[must_use]
    pub fn new(start: Marker, end: Marker) -> Self {
        Span { start, end }
    }

    #[must_use]
    pub fn empty(mark: Marker) -> Self {
        Span {
            start: mark,
            end: mark,
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.start, f)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum ScalarStyle {
    /// No requested style; only meaningful on the emitter input side.
    #[default]
    Any,
    /// Unquoted string type like:
    /// ```yaml
    ///   multiline
    ///   string
    /// ```
    Plain,
    /// Single quote string which permits any symbol inside
    /// E.g. :
    /// ```yaml
    /// ' This is a quoted string
    ///    with ''quoted'' string within.'
    /// ```
    SingleQuoted,
    /// Double quote string which permits escape sequences inside
    /// E.g. :
    /// ```yaml
    /// "This is a quoted string
    ///    with \"double quoted\" string within."
    /// ```
    DoubleQuoted,
    /// Literal block type like:
    /// ```yaml
    ///   |
    ///     literal
    ///     string
    /// ```
    Literal,
    /// Folded block type like:
    /// ```yaml
    ///   >
    ///     folded
    ///     string
    /// ```
    Folded,
}

impl Display for ScalarStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarStyle::Any | ScalarStyle::Plain => write!(f, ":"),
            ScalarStyle::SingleQuoted => write!(f, "'"),
            ScalarStyle::DoubleQuoted => write!(f, "\""),
            ScalarStyle::Literal => write!(f, "|"),
            ScalarStyle::Folded => write!(f, ">"),
        }
    }
}

/// Requested layout of a collection node.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum CollectionStyle {
    #[default]
    Any,
    /// Indentation delimited, `- x` / `x: y`.
    Block,
    /// Bracket delimited, `[x]` / `{x: y}`.
    Flow,
}

#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub enum ChompIndicator {
    /// `-` final line break and any trailing empty lines are excluded from the scalar’s content
    Strip,
    /// ` ` final line break character is preserved in the scalar’s content
    Clip,
    /// `+` final line break and any trailing empty lines are considered to be part of the scalar’s content
    Keep,
}

/// A `%TAG` directive pairing a handle with its expansion prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDirective {
    pub handle: String,
    pub prefix: String,
}

impl TagDirective {
    #[must_use]
    pub fn new(handle: &str, prefix: &str) -> TagDirective {
        TagDirective {
            handle: handle.into(),
            prefix: prefix.into(),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum TokenType<'input> {
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
    Alias(Cow<'input, str>),
    Anchor(Cow<'input, str>),
    VersionDirective {
        major: u8,
        minor: u8,
    },
    TagDirective {
        handle: Cow<'input, str>,
        prefix: Cow<'input, str>,
    },
    Tag {
        handle: Cow<'input, str>,
        suffix: Cow<'input, str>,
    },
    Scalar {
        style: ScalarStyle,
        value: Cow<'input, str>,
    },
    Comment {
        text: Cow<'input, str>,
        /// Whether content preceded the comment on its line.
        inline: bool,
    },
}

/// A specialized `Result` type where the error is hard-wired to [`YamlError`].
pub type YamlResult<T> = Result<T, YamlError>;
pub type ScanResult = Result<(), YamlError>;

/// Every data error carries the [`Span`] of the offending input. None of
/// these are recoverable; the stream is unusable past the error point.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum YamlError {
    /// The scanner could not tokenize the input.
    #[error("{info} at {span}")]
    Lexical { span: Span, info: String },
    /// The token sequence does not match the grammar.
    #[error("{info} at {span}")]
    Syntax { span: Span, info: String },
    /// Grammatically valid but meaningless input, e.g. an unresolvable
    /// tag handle or a duplicate directive.
    #[error("{info} at {span}")]
    Semantic { span: Span, info: String },
    /// An alias referenced an anchor that was never declared.
    #[error("anchor '{name}' was never defined, referenced at {span}")]
    AnchorNotFound { span: Span, name: String },
    /// Failure of the underlying character source.
    #[error("io error: {0}")]
    Io(String),
}

impl YamlError {
    pub fn lexical(mark: Marker, info: &str) -> Self {
        YamlError::Lexical {
            span: Span::empty(mark),
            info: info.into(),
        }
    }

    pub fn syntax(mark: Marker, info: &str) -> Self {
        YamlError::Syntax {
            span: Span::empty(mark),
            info: info.into(),
        }
    }

    pub fn semantic(span: Span, info: &str) -> Self {
        YamlError::Semantic {
            span,
            info: info.into(),
        }
    }

    pub fn anchor_not_found(span: Span, name: &str) -> Self {
        YamlError::AnchorNotFound {
            span,
            name: name.into(),
        }
    }

    /// The input span the error points at. [`Span::default`] for I/O errors.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            YamlError::Lexical { span, .. }
            | YamlError::Syntax { span, .. }
            | YamlError::Semantic { span, .. }
            | YamlError::AnchorNotFound { span, .. } => *span,
            YamlError::Io(_) => Span::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Marker, YamlError};

    #[test]
    fn marker_orders_by_position() {
        let a = Marker::new(3, 1, 4);
        let b = Marker::new(7, 2, 1);
        assert!(a < b);
        assert!(a <= a);
    }

    #[test]
    fn error_display_carries_position() {
        let err = YamlError::lexical(Marker::new(12, 3, 5), "tab used for indentation");
        assert_eq!(
            err.to_string(),
            "tab used for indentation at line 3, column 5"
        );
    }
}

use std::fmt::{Display, Formatter, Write};

use yamlet_common::{CollectionStyle, ScalarStyle, Span, TagDirective, YamlResult};

/// A parsing event, the unit both the parser produces and the emitter
/// consumes. Tags carried here are fully resolved: directive handles are
/// expanded and `%xx` escapes decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StreamStart,
    StreamEnd,
    DocumentStart {
        version: Option<(u8, u8)>,
        tags: Vec<TagDirective>,
        /// `false` when the document was opened with an explicit `---`.
        implicit: bool,
    },
    DocumentEnd {
        /// `false` when the document was closed with an explicit `...`.
        implicit: bool,
    },
    /// A `*name` reference to an anchored node.
    Alias {
        name: String,
    },
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        value: String,
        style: ScalarStyle,
        /// The scalar may be written plain without changing its meaning.
        plain_implicit: bool,
        /// The scalar may be written quoted without changing its meaning.
        quoted_implicit: bool,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    MappingEnd,
    Comment {
        text: String,
        inline: bool,
    },
}

impl Event {
    /// An empty plain scalar, produced wherever the grammar allows a node
    /// to be omitted (`key:`, `[,]`, …).
    #[must_use]
    pub fn empty_scalar() -> Event {
        Event::Scalar {
            anchor: None,
            tag: None,
            value: String::new(),
            style: ScalarStyle::Plain,
            plain_implicit: true,
            quoted_implicit: false,
        }
    }

    #[must_use]
    pub(crate) fn empty_scalar_with(anchor: Option<String>, tag: Option<String>) -> Event {
        let implicit = tag.is_none();
        Event::Scalar {
            anchor,
            tag,
            value: String::new(),
            style: ScalarStyle::Plain,
            plain_implicit: implicit,
            quoted_implicit: false,
        }
    }

    /// Contribution of this event to the nesting depth: +1 for `*Start`
    /// events, -1 for `*End` events, 0 otherwise. A well-formed stream
    /// always sums to zero.
    #[must_use]
    pub fn nesting_increase(&self) -> i32 {
        match self {
            Event::SequenceStart { .. } | Event::MappingStart { .. } => 1,
            Event::SequenceEnd | Event::MappingEnd => -1,
            _ => 0,
        }
    }

    /// Anchor declared by this event, if any.
    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Event::Scalar { anchor, .. }
            | Event::SequenceStart { anchor, .. }
            | Event::MappingStart { anchor, .. } => anchor.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn clear_anchor(&mut self) {
        match self {
            Event::Scalar { anchor, .. }
            | Event::SequenceStart { anchor, .. }
            | Event::MappingStart { anchor, .. } => *anchor = None,
            _ => {}
        }
    }
}

/// An [`Event`] with the input [`Span`] it was parsed from. Synthetic
/// events carry an empty span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedEvent {
    pub event: Event,
    pub span: Span,
}

impl SpannedEvent {
    #[must_use]
    pub fn new(event: Event, span: Span) -> SpannedEvent {
        SpannedEvent { event, span }
    }
}

/// A pull producer of parsing events. The stream is over once
/// [`Event::StreamEnd`] is returned; further calls keep returning it.
pub trait EventSource {
    fn next_event(&mut self) -> YamlResult<SpannedEvent>;
}

fn escape_value(f: &mut Formatter<'_>, value: &str) -> std::fmt::Result {
    for c in value.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\x08' => f.write_str("\\b")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

fn write_properties(
    f: &mut Formatter<'_>,
    anchor: &Option<String>,
    tag: &Option<String>,
) -> std::fmt::Result {
    if let Some(anchor) = anchor {
        write!(f, " &{anchor}")?;
    }
    if let Some(tag) = tag {
        write!(f, " <{tag}>")?;
    }
    Ok(())
}

/// Renders the event in the yaml-test-suite notation, e.g. `+DOC ---`,
/// `+SEQ []`, `=VAL &a :value`.
impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::StreamStart => write!(f, "+STR"),
            Event::StreamEnd => write!(f, "-STR"),
            Event::DocumentStart { implicit, .. } => {
                write!(f, "+DOC")?;
                if !implicit {
                    write!(f, " ---")?;
                }
                Ok(())
            }
            Event::DocumentEnd { implicit } => {
                write!(f, "-DOC")?;
                if !implicit {
                    write!(f, " ...")?;
                }
                Ok(())
            }
            Event::Alias { name } => write!(f, "=ALI *{name}"),
            Event::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                write!(f, "=VAL")?;
                write_properties(f, anchor, tag)?;
                write!(f, " {style}")?;
                escape_value(f, value)
            }
            Event::SequenceStart {
                anchor,
                tag,
                style,
                ..
            } => {
                write!(f, "+SEQ")?;
                if *style == CollectionStyle::Flow {
                    write!(f, " []")?;
                }
                write_properties(f, anchor, tag)
            }
            Event::SequenceEnd => write!(f, "-SEQ"),
            Event::MappingStart {
                anchor,
                tag,
                style,
                ..
            } => {
                write!(f, "+MAP")?;
                if *style == CollectionStyle::Flow {
                    write!(f, " {{}}")?;
                }
                write_properties(f, anchor, tag)
            }
            Event::MappingEnd => write!(f, "-MAP"),
            Event::Comment { text, .. } => {
                write!(f, "=COM ")?;
                escape_value(f, text)
            }
        }
    }
}

impl Display for SpannedEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.event, f)
    }
}

#[cfg(test)]
mod test {
    use yamlet_common::{CollectionStyle, ScalarStyle};

    use super::Event;

    #[test]
    fn nesting_sums_to_zero_for_balanced_streams() {
        let events = [
            Event::StreamStart,
            Event::DocumentStart {
                version: None,
                tags: Vec::new(),
                implicit: true,
            },
            Event::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: CollectionStyle::Block,
            },
            Event::empty_scalar(),
            Event::SequenceEnd,
            Event::DocumentEnd { implicit: true },
            Event::StreamEnd,
        ];
        assert_eq!(events.iter().map(Event::nesting_increase).sum::<i32>(), 0);
    }

    #[test]
    fn display_uses_test_suite_notation() {
        let ev = Event::Scalar {
            anchor: Some("a".into()),
            tag: None,
            value: "two\nlines".into(),
            style: ScalarStyle::DoubleQuoted,
            plain_implicit: false,
            quoted_implicit: true,
        };
        assert_eq!(ev.to_string(), "=VAL &a \"two\\nlines");
    }
}

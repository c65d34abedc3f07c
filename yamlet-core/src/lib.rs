//! Event-level YAML 1.1 engine: scanner, parser, merge-key resolution,
//! scalar schemas and an event-driven emitter.
//!
//! Text flows through [`Scanner`] into tokens, through [`Parser`] into
//! [`Event`]s (optionally wrapped by [`MergingParser`] to resolve `<<`
//! merge keys), and back out through [`Emitter`]. [`ScalarResolver`]
//! assigns implicit tags to plain scalars.

pub use yamlet_common::{
    ChompIndicator, CollectionStyle, Marker, ScalarStyle, Span, TagDirective, TokenType, YamlError,
    YamlResult,
};

pub use emitter::{EmitError, EmitResult, Emitter};
pub use events::{Event, EventSource, SpannedEvent};
pub use merge::{MergingParser, MERGE_KEY};
pub use parser::Parser;
pub use schema::{tags, ScalarResolver, ScalarResolverBuilder};
pub use tokenizer::{Scanner, Source, StrSource, Token};

mod emitter;
mod events;
mod merge;
mod parser;
mod schema;
pub mod tokenizer;

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use yamlet_common::{Marker, ScalarStyle, YamlError, YamlResult};

use crate::events::Event;

/// The standard `tag:yaml.org,2002` tags assigned by implicit resolution.
pub mod tags {
    pub const NULL: &str = "tag:yaml.org,2002:null";
    pub const BOOL: &str = "tag:yaml.org,2002:bool";
    pub const INT: &str = "tag:yaml.org,2002:int";
    pub const FLOAT: &str = "tag:yaml.org,2002:float";
    pub const STR: &str = "tag:yaml.org,2002:str";
    pub const MERGE: &str = "tag:yaml.org,2002:merge";
}

struct TagPattern {
    tag: Cow<'static, str>,
    pattern: Regex,
}

/// Maps a plain scalar's text to an implicit tag through an ordered
/// first-match-wins pattern table. The two standard schemas are built once
/// and shared process-wide; custom tables go through [`builder`].
///
/// [`builder`]: ScalarResolver::builder
pub struct ScalarResolver {
    patterns: Vec<TagPattern>,
    /// A strict resolver (the JSON schema) rejects plain scalars that
    /// match none of its patterns instead of leaving them untagged.
    strict: bool,
}

static CORE_SCHEMA: Lazy<ScalarResolver> = Lazy::new(|| {
    ScalarResolver::builder()
        .pattern(tags::NULL, r"^(~|null|Null|NULL|)$")
        .pattern(tags::BOOL, r"^(true|True|TRUE|false|False|FALSE)$")
        .pattern(tags::INT, r"^([-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$")
        .pattern(
            tags::FLOAT,
            r"^([-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?|[-+]?\.(inf|Inf|INF)|\.(nan|NaN|NAN))$",
        )
        .build()
});

static JSON_SCHEMA: Lazy<ScalarResolver> = Lazy::new(|| {
    ScalarResolver::builder()
        .pattern(tags::NULL, r"^null$")
        .pattern(tags::BOOL, r"^(true|false)$")
        .pattern(tags::INT, r"^-?(0|[1-9][0-9]*)$")
        .pattern(
            tags::FLOAT,
            r"^-?(0|[1-9][0-9]*)(\.[0-9]*)?([eE][-+]?[0-9]+)?$",
        )
        .strict()
        .build()
});

impl ScalarResolver {
    /// The YAML core schema: null, bool, int (decimal, `0o`, `0x`) and
    /// float (including `.inf`/`.nan` forms); anything else stays
    /// untagged and defaults to a string downstream.
    #[must_use]
    pub fn core() -> &'static ScalarResolver {
        &CORE_SCHEMA
    }

    /// The JSON schema: lowercase keywords only, no leading zeros, no
    /// radix prefixes, and unresolvable plain scalars are an error.
    #[must_use]
    pub fn json() -> &'static ScalarResolver {
        &JSON_SCHEMA
    }

    #[must_use]
    pub fn builder() -> ScalarResolverBuilder {
        ScalarResolverBuilder::default()
    }

    /// Resolve the implicit tag of a plain scalar's text. `Ok(None)`
    /// means no pattern matched; a strict resolver raises a syntax error
    /// instead.
    pub fn resolve(&self, value: &str) -> YamlResult<Option<&str>> {
        for entry in &self.patterns {
            if entry.pattern.is_match(value) {
                return Ok(Some(&entry.tag));
            }
        }
        if self.strict {
            return Err(YamlError::syntax(
                Marker::default(),
                &format!("plain scalar '{value}' does not match any schema pattern"),
            ));
        }
        Ok(None)
    }

    /// Implicit tag of a scalar event under this schema: an explicit tag
    /// wins, quoted scalars never resolve, and only plain untagged
    /// scalars consult the pattern table.
    pub fn resolve_event<'a>(&'a self, event: &'a Event) -> YamlResult<Option<&'a str>> {
        let Event::Scalar {
            tag, value, style, ..
        } = event
        else {
            return Ok(None);
        };
        if let Some(tag) = tag {
            return Ok(Some(tag));
        }
        match style {
            ScalarStyle::Any | ScalarStyle::Plain => self.resolve(value),
            _ => Ok(None),
        }
    }
}

/// Assembles a custom [`ScalarResolver`]. Registration is scoped to the
/// builder; the shared core/JSON tables are never mutated.
#[derive(Default)]
pub struct ScalarResolverBuilder {
    patterns: Vec<TagPattern>,
    strict: bool,
}

impl ScalarResolverBuilder {
    /// Append a `(tag, pattern)` pair. Patterns are tried in registration
    /// order, first match wins.
    ///
    /// # Panics
    /// Panics if `pattern` is not a valid regular expression; pattern
    /// tables are built from literals at startup.
    #[must_use]
    pub fn pattern(mut self, tag: impl Into<Cow<'static, str>>, pattern: &str) -> Self {
        self.patterns.push(TagPattern {
            tag: tag.into(),
            pattern: Regex::new(pattern).expect("invalid schema pattern"),
        });
        self
    }

    /// Make unresolvable plain scalars an error instead of untagged.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    #[must_use]
    pub fn build(self) -> ScalarResolver {
        ScalarResolver {
            patterns: self.patterns,
            strict: self.strict,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{tags, ScalarResolver};

    #[test]
    fn core_schema_resolves_standard_forms() {
        let core = ScalarResolver::core();
        assert_eq!(core.resolve("123").unwrap(), Some(tags::INT));
        assert_eq!(core.resolve("0x2A").unwrap(), Some(tags::INT));
        assert_eq!(core.resolve("0o17").unwrap(), Some(tags::INT));
        assert_eq!(core.resolve("true").unwrap(), Some(tags::BOOL));
        assert_eq!(core.resolve("TRUE").unwrap(), Some(tags::BOOL));
        assert_eq!(core.resolve("~").unwrap(), Some(tags::NULL));
        assert_eq!(core.resolve("").unwrap(), Some(tags::NULL));
        assert_eq!(core.resolve("-.inf").unwrap(), Some(tags::FLOAT));
        assert_eq!(core.resolve(".nan").unwrap(), Some(tags::FLOAT));
        assert_eq!(core.resolve("6.8523015e+5").unwrap(), Some(tags::FLOAT));
        assert_eq!(core.resolve("abc").unwrap(), None);
    }

    #[test]
    fn json_schema_is_strict() {
        let json = ScalarResolver::json();
        assert_eq!(json.resolve("123").unwrap(), Some(tags::INT));
        assert_eq!(json.resolve("0").unwrap(), Some(tags::INT));
        // Leading zeros are not JSON integers, and nothing else matches.
        assert!(json.resolve("01").is_err());
        assert!(json.resolve("True").is_err());
        assert_eq!(json.resolve("-12.5e3").unwrap(), Some(tags::FLOAT));
    }

    #[test]
    fn custom_tables_win_by_registration_order() {
        let resolver = ScalarResolver::builder()
            .pattern("!even", r"^[0-9]*[02468]$")
            .pattern(tags::INT, r"^[0-9]+$")
            .build();
        assert_eq!(resolver.resolve("42").unwrap(), Some("!even"));
        assert_eq!(resolver.resolve("7").unwrap(), Some(tags::INT));
    }
}

mod common;

use crate::common::assert_eq_event;

const SINGLE_QUOTE_INPUT: &str = r"
'squoted scalar'
";
const SINGLE_QUOTE_EVENTS: &str = r"
+DOC
=VAL 'squoted scalar
-DOC";

const SINGLE_QUOTE_ESCAPED_INPUT: &str = r"
'it''s'
";
const SINGLE_QUOTE_ESCAPED_EVENTS: &str = r"
+DOC
=VAL 'it's
-DOC";

#[test]
fn single_quoted() {
    assert_eq_event(SINGLE_QUOTE_INPUT, SINGLE_QUOTE_EVENTS);
    assert_eq_event(SINGLE_QUOTE_ESCAPED_INPUT, SINGLE_QUOTE_ESCAPED_EVENTS);
}

const SINGLE_FOLD_INPUT: &str = r"
'first
 second'
";
const SINGLE_FOLD_EVENTS: &str = r"
+DOC
=VAL 'first second
-DOC";

#[test]
fn single_quoted_folds_breaks() {
    assert_eq_event(SINGLE_FOLD_INPUT, SINGLE_FOLD_EVENTS);
}

const DOUBLE_ESCAPES_INPUT: &str = "\n\"a\\tb\\nc\"\n";
const DOUBLE_ESCAPES_EVENTS: &str = "\n+DOC\n=VAL \"a\\tb\\nc\n-DOC";

const DOUBLE_UNICODE_INPUT: &str = "\n\"\\u0041\\x42\"\n";
const DOUBLE_UNICODE_EVENTS: &str = "\n+DOC\n=VAL \"AB\n-DOC";

#[test]
fn double_quoted_escapes() {
    assert_eq_event(DOUBLE_ESCAPES_INPUT, DOUBLE_ESCAPES_EVENTS);
    assert_eq_event(DOUBLE_UNICODE_INPUT, DOUBLE_UNICODE_EVENTS);
}

const DOUBLE_FOLD_INPUT: &str = "\n\"a\n\n b\"\n";
const DOUBLE_FOLD_EVENTS: &str = "\n+DOC\n=VAL \"a\\nb\n-DOC";

const ESCAPED_BREAK_INPUT: &str = "\n\"folded \\\nto a space\"\n";
const ESCAPED_BREAK_EVENTS: &str = "\n+DOC\n=VAL \"folded to a space\n-DOC";

// An empty line inside a double-quoted scalar is a literal break; an
// escaped break disappears entirely.
#[test]
fn double_quoted_folding() {
    assert_eq_event(DOUBLE_FOLD_INPUT, DOUBLE_FOLD_EVENTS);
    assert_eq_event(ESCAPED_BREAK_INPUT, ESCAPED_BREAK_EVENTS);
}

const UNTERMINATED_INPUT: &str = "\n'abc\n";

#[test]
fn unterminated_quote_err() {
    assert_eq_event(UNTERMINATED_INPUT, "\nERR");
}

const BAD_ESCAPE_INPUT: &str = "\n\"\\q\"\n";

#[test]
fn unknown_escape_err() {
    assert_eq_event(BAD_ESCAPE_INPUT, "\nERR");
}

const QUOTED_KEY_INPUT: &str = r#"
"quoted key": value
"#;
const QUOTED_KEY_EVENTS: &str = "\n+DOC\n+MAP\n=VAL \"quoted key\n=VAL :value\n-MAP\n-DOC";

#[test]
fn quoted_key() {
    assert_eq_event(QUOTED_KEY_INPUT, QUOTED_KEY_EVENTS);
}

const TRAILING_CONTENT_INPUT: &str = "\n'abc' extra\n";

#[test]
fn trailing_content_err() {
    assert_eq_event(TRAILING_CONTENT_INPUT, "\nERR");
}

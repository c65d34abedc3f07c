mod common;

use crate::common::assert_eq_event;

const BLOCK_SEQ_INPUT: &str = r"
- x
- y
";

const BLOCK_SEQ2_INPUT: &str = r"
 - x
 - y
";

const BLOCK_SEQ_EVENTS: &str = r"
+DOC
+SEQ
=VAL :x
=VAL :y
-SEQ
-DOC";

#[test]
fn block_seq() {
    assert_eq_event(BLOCK_SEQ_INPUT, BLOCK_SEQ_EVENTS);
    assert_eq_event(BLOCK_SEQ2_INPUT, BLOCK_SEQ_EVENTS);
}

const BLOCK_DEDENT_ERR_INPUT: &str = r"
  - x
 - y
";

const BLOCK_DEDENT_ERR_EVENTS: &str = r"
+DOC
+SEQ
=VAL :x
-SEQ
-DOC
ERR";

#[test]
fn block_dedent_err() {
    assert_eq_event(BLOCK_DEDENT_ERR_INPUT, BLOCK_DEDENT_ERR_EVENTS);
}

const BLOCK_NESTED_SEQ_INPUT: &str = r"
- - a
  - b
";

const BLOCK_NESTED_SEQ_EVENTS: &str = r"
+DOC
+SEQ
+SEQ
=VAL :a
=VAL :b
-SEQ
-SEQ
-DOC";

#[test]
fn block_nested_seq() {
    assert_eq_event(BLOCK_NESTED_SEQ_INPUT, BLOCK_NESTED_SEQ_EVENTS);
}

const BLOCK_MAPPING_INPUT: &str = r"
a: 1
b: 2
";

const BLOCK_MAPPING_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=VAL :1
=VAL :b
=VAL :2
-MAP
-DOC";

#[test]
fn block_mapping() {
    assert_eq_event(BLOCK_MAPPING_INPUT, BLOCK_MAPPING_EVENTS);
}

const BLOCK_NESTED_MAPPING_INPUT: &str = r"
outer:
  inner: 1
  other: 2
";

const BLOCK_NESTED_MAPPING_EVENTS: &str = r"
+DOC
+MAP
=VAL :outer
+MAP
=VAL :inner
=VAL :1
=VAL :other
=VAL :2
-MAP
-MAP
-DOC";

#[test]
fn block_nested_mapping() {
    assert_eq_event(BLOCK_NESTED_MAPPING_INPUT, BLOCK_NESTED_MAPPING_EVENTS);
}

const SEQ_OF_MAPS_INPUT: &str = r"
- a: 1
- b: 2
";

const SEQ_OF_MAPS_EVENTS: &str = r"
+DOC
+SEQ
+MAP
=VAL :a
=VAL :1
-MAP
+MAP
=VAL :b
=VAL :2
-MAP
-SEQ
-DOC";

#[test]
fn block_seq_of_maps() {
    assert_eq_event(SEQ_OF_MAPS_INPUT, SEQ_OF_MAPS_EVENTS);
}

const INDENTLESS_SEQ_INPUT: &str = r"
key:
- a
- b
";

const INDENTLESS_SEQ_EVENTS: &str = r"
+DOC
+MAP
=VAL :key
+SEQ
=VAL :a
=VAL :b
-SEQ
-MAP
-DOC";

#[test]
fn block_indentless_seq() {
    assert_eq_event(INDENTLESS_SEQ_INPUT, INDENTLESS_SEQ_EVENTS);
}

const EXPLICIT_KEY_INPUT: &str = r"
? complex key
: value
";

const EXPLICIT_KEY_EVENTS: &str = r"
+DOC
+MAP
=VAL :complex key
=VAL :value
-MAP
-DOC";

#[test]
fn block_explicit_key() {
    assert_eq_event(EXPLICIT_KEY_INPUT, EXPLICIT_KEY_EVENTS);
}

const EMPTY_VALUE_INPUT: &str = r"
a:
b: 2
";

const EMPTY_VALUE_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=VAL :
=VAL :b
=VAL :2
-MAP
-DOC";

#[test]
fn block_empty_value() {
    assert_eq_event(EMPTY_VALUE_INPUT, EMPTY_VALUE_EVENTS);
}

const BLOCK_STRINGS_INPUT: &str = "
- |+ # Keep indicator
  # keep

# Trail
 # comment
- | # Empty header
 literal
 next line
- > # Indentation indicator
  folded
  are continued

- >1- # Both indicators
 strip
  newline

";

const BLOCK_STRINGS_EVENTS: &str = r"
+DOC
+SEQ
=VAL |# keep\n\n
=VAL |literal\nnext line\n
=VAL >folded are continued\n
=VAL >strip\n newline
-SEQ
-DOC";

#[test]
fn block_strings() {
    assert_eq_event(BLOCK_STRINGS_INPUT, BLOCK_STRINGS_EVENTS);
}

const FOLD_INPUT: &str = r"
>
  abc
  def
";

const FOLD_EVENTS: &str = r"
+DOC
=VAL >abc def\n
-DOC";

const FOLD_MORE_INDENTED_INPUT: &str = r"
>
  abc
   more
  def
";

const FOLD_MORE_INDENTED_EVENTS: &str = r"
+DOC
=VAL >abc\n more\ndef\n
-DOC";

// Two consecutive non-blank lines fold to a space; a more-indented line
// keeps its surrounding breaks literally.
#[test]
fn block_scalar_folding() {
    assert_eq_event(FOLD_INPUT, FOLD_EVENTS);
    assert_eq_event(FOLD_MORE_INDENTED_INPUT, FOLD_MORE_INDENTED_EVENTS);
}

const PLAIN_MULTILINE_INPUT: &str = r"
a
b
c
  d
e
";

const PLAIN_MULTILINE_EVENTS: &str = r"
+DOC
=VAL :a b c d e
-DOC";

#[test]
fn plain_multiline_folds() {
    assert_eq_event(PLAIN_MULTILINE_INPUT, PLAIN_MULTILINE_EVENTS);
}

const TAB_INDENT_ERR_INPUT: &str = "a:\n\tb: 1\n";

#[test]
fn tab_indentation_err() {
    let events = "\n+DOC\n+MAP\n=VAL :a\nERR";
    assert_eq_event(TAB_INDENT_ERR_INPUT, events);
}

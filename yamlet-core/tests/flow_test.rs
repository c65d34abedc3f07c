mod common;

use crate::common::assert_eq_event;

const NULL_YAML_INPUT: &str = "\nnull\n";
const NULL_YAML2_INPUT: &str = "\r\nnull\r\n";
const NULL_YAML_EVENTS: &str = r"
+DOC
=VAL :null
-DOC";

const MULTILINE_INPUT: &str = r"
test
xt
";
const MULTILINE_EVENTS: &str = r"
+DOC
=VAL :test xt
-DOC";

#[test]
fn flow_scalars() {
    assert_eq_event(NULL_YAML_INPUT, NULL_YAML_EVENTS);
    assert_eq_event(NULL_YAML2_INPUT, NULL_YAML_EVENTS);
    assert_eq_event(MULTILINE_INPUT, MULTILINE_EVENTS);
}

const SEQ_FLOW_INPUT: &str = r"
[x, y]
";
const SEQ_FLOW2_INPUT: &str = r"
[x ,y]
";
const SEQ_FLOW_EVENTS: &str = r"
+DOC
+SEQ []
=VAL :x
=VAL :y
-SEQ
-DOC";

#[test]
fn flow_seq() {
    assert_eq_event(SEQ_FLOW_INPUT, SEQ_FLOW_EVENTS);
    assert_eq_event(SEQ_FLOW2_INPUT, SEQ_FLOW_EVENTS);
}

const SEQ_NESTED_INPUT: &str = r"
[a, [b, c]]
";
const SEQ_NESTED_EVENTS: &str = r"
+DOC
+SEQ []
=VAL :a
+SEQ []
=VAL :b
=VAL :c
-SEQ
-SEQ
-DOC";

#[test]
fn flow_seq_nested() {
    assert_eq_event(SEQ_NESTED_INPUT, SEQ_NESTED_EVENTS);
}

const MAP_FLOW_INPUT: &str = r"
{a: b, c: d}
";
const MAP_FLOW_EVENTS: &str = r"
+DOC
+MAP {}
=VAL :a
=VAL :b
=VAL :c
=VAL :d
-MAP
-DOC";

const MAP_TRAILING_COMMA_INPUT: &str = r"
{a: b, c: d, }
";

#[test]
fn flow_map() {
    assert_eq_event(MAP_FLOW_INPUT, MAP_FLOW_EVENTS);
    assert_eq_event(MAP_TRAILING_COMMA_INPUT, MAP_FLOW_EVENTS);
}

const MAP_OMITTED_VALUE_INPUT: &str = r"
{a, b: 1}
";
const MAP_OMITTED_VALUE_EVENTS: &str = r"
+DOC
+MAP {}
=VAL :a
=VAL :
=VAL :b
=VAL :1
-MAP
-DOC";

#[test]
fn flow_map_omitted_value() {
    assert_eq_event(MAP_OMITTED_VALUE_INPUT, MAP_OMITTED_VALUE_EVENTS);
}

const SEQ_PAIR_INPUT: &str = r"
[a: b]
";
const SEQ_PAIR_EVENTS: &str = r"
+DOC
+SEQ []
+MAP {}
=VAL :a
=VAL :b
-MAP
-SEQ
-DOC";

// A `key: value` pair inside a flow sequence is an implicit single-pair
// mapping.
#[test]
fn flow_seq_implicit_pair() {
    assert_eq_event(SEQ_PAIR_INPUT, SEQ_PAIR_EVENTS);
}

const ADJACENT_VALUE_INPUT: &str = "\n{\"a\":1}\n";
const ADJACENT_VALUE_EVENTS: &str = "\n+DOC\n+MAP {}\n=VAL \"a\n=VAL :1\n-MAP\n-DOC";

// JSON compatibility: no space needed after ':' when the key is quoted.
#[test]
fn flow_adjacent_value() {
    assert_eq_event(ADJACENT_VALUE_INPUT, ADJACENT_VALUE_EVENTS);
}

const EMPTY_SEQ_INPUT: &str = "\n[]\n";
const EMPTY_SEQ_EVENTS: &str = "\n+DOC\n+SEQ []\n-SEQ\n-DOC";

const EMPTY_MAP_INPUT: &str = "\n{}\n";
const EMPTY_MAP_EVENTS: &str = "\n+DOC\n+MAP {}\n-MAP\n-DOC";

#[test]
fn flow_empty_collections() {
    assert_eq_event(EMPTY_SEQ_INPUT, EMPTY_SEQ_EVENTS);
    assert_eq_event(EMPTY_MAP_INPUT, EMPTY_MAP_EVENTS);
}

const FLOW_INDENT_INPUT: &str = r"
a: [1,
  2]
";
const FLOW_INDENT_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
+SEQ []
=VAL :1
=VAL :2
-SEQ
-MAP
-DOC";

#[test]
fn flow_spans_lines() {
    assert_eq_event(FLOW_INDENT_INPUT, FLOW_INDENT_EVENTS);
}

const UNTERMINATED_SEQ_INPUT: &str = r"
[a, b
";
const UNTERMINATED_SEQ_EVENTS: &str = r"
+DOC
+SEQ []
=VAL :a
=VAL :b
ERR";

#[test]
fn flow_unterminated_seq_err() {
    assert_eq_event(UNTERMINATED_SEQ_INPUT, UNTERMINATED_SEQ_EVENTS);
}

const BLOCK_ENTRY_IN_FLOW_INPUT: &str = r"
[- x]
";

#[test]
fn flow_block_entry_err() {
    // "-" is only valid inside a block collection.
    assert_eq_event(BLOCK_ENTRY_IN_FLOW_INPUT, "\n+DOC\n+SEQ []\nERR");
}

mod common;

use crate::common::{assert_eq_event, assert_eq_merged};

const BACKREFERENCE_INPUT: &str = r"
a: &anchor val
b: *anchor
";
const BACKREFERENCE_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=VAL &anchor :val
=VAL :b
=ALI *anchor
-MAP
-DOC";

#[test]
fn anchor_backreference() {
    assert_eq_event(BACKREFERENCE_INPUT, BACKREFERENCE_EVENTS);
}

const FORWARD_ALIAS_INPUT: &str = r"
a: *fwd
b: &fwd val
";
const FORWARD_ALIAS_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=ALI *fwd
=VAL :b
=VAL &fwd :val
-MAP
-DOC";

// The alias is emitted as an event; the name is checked against the
// anchors declared anywhere in the document once it ends.
#[test]
fn anchor_forward_alias() {
    assert_eq_event(FORWARD_ALIAS_INPUT, FORWARD_ALIAS_EVENTS);
}

const OVERWRITING_INPUT: &str = r"
a: &x 1
b: &x 2
c: *x
";
const OVERWRITING_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=VAL &x :1
=VAL :b
=VAL &x :2
=VAL :c
=ALI *x
-MAP
-DOC";

#[test]
fn anchor_overwriting() {
    assert_eq_event(OVERWRITING_INPUT, OVERWRITING_EVENTS);
}

const MISSING_ANCHOR_INPUT: &str = r"
a: *missing
";
const MISSING_ANCHOR_EVENTS: &str = r"
+DOC
+MAP
=VAL :a
=ALI *missing
-MAP
ERR";

#[test]
fn anchor_not_found_err() {
    assert_eq_event(MISSING_ANCHOR_INPUT, MISSING_ANCHOR_EVENTS);
}

const CYCLE_INPUT: &str = r"
&a [*a]
";
const CYCLE_EVENTS: &str = r"
+DOC
+SEQ [] &a
=ALI *a
-SEQ
-DOC";

// An alias referencing its own enclosing anchor still parses to a finite
// event sequence; only a naive graph materializer would diverge.
#[test]
fn anchor_cycle_terminates() {
    assert_eq_event(CYCLE_INPUT, CYCLE_EVENTS);
    assert_eq_merged(CYCLE_INPUT, CYCLE_EVENTS);
}

const ANCHORED_MAPPING_INPUT: &str = r"
base: &b
  x: 1
ref: *b
";
const ANCHORED_MAPPING_EVENTS: &str = r"
+DOC
+MAP
=VAL :base
+MAP &b
=VAL :x
=VAL :1
-MAP
=VAL :ref
=ALI *b
-MAP
-DOC";

#[test]
fn anchor_on_mapping() {
    assert_eq_event(ANCHORED_MAPPING_INPUT, ANCHORED_MAPPING_EVENTS);
}

const ANCHORED_SEQ_ITEM_INPUT: &str = r"
- &first one
- *first
";
const ANCHORED_SEQ_ITEM_EVENTS: &str = r"
+DOC
+SEQ
=VAL &first :one
=ALI *first
-SEQ
-DOC";

#[test]
fn anchor_in_sequence() {
    assert_eq_event(ANCHORED_SEQ_ITEM_INPUT, ANCHORED_SEQ_ITEM_EVENTS);
}

const ANCHOR_WITHOUT_NODE_INPUT: &str = r"
&a
";
const ANCHOR_WITHOUT_NODE_EVENTS: &str = r"
+DOC
=VAL &a :
-DOC";

// A lone anchor attaches to an empty scalar.
#[test]
fn anchor_without_content() {
    assert_eq_event(ANCHOR_WITHOUT_NODE_INPUT, ANCHOR_WITHOUT_NODE_EVENTS);
}

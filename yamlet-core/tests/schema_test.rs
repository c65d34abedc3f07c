mod common;

use yamlet_core::{tags, Event, Parser, ScalarResolver};

/// First scalar event of the first document of `input`.
fn first_scalar(input: &str) -> Event {
    let mut parser = Parser::from_str(input);
    loop {
        let ev = parser.next_event().unwrap();
        match ev.event {
            Event::Scalar { .. } => return ev.event,
            Event::StreamEnd => panic!("no scalar in {input}"),
            _ => {}
        }
    }
}

#[test]
fn quoted_scalar_gets_no_implicit_tag() {
    let core = ScalarResolver::core();
    let ev = first_scalar("\"123\"\n");
    assert_eq!(core.resolve_event(&ev).unwrap(), None);
}

#[test]
fn plain_int_resolves() {
    let core = ScalarResolver::core();
    let ev = first_scalar("123\n");
    assert_eq!(core.resolve_event(&ev).unwrap(), Some(tags::INT));
}

#[test]
fn bool_spellings_resolve() {
    let core = ScalarResolver::core();
    for input in ["true\n", "True\n", "TRUE\n"] {
        let ev = first_scalar(input);
        assert_eq!(core.resolve_event(&ev).unwrap(), Some(tags::BOOL));
    }
}

#[test]
fn unmatched_plain_scalar_stays_untagged() {
    let core = ScalarResolver::core();
    let ev = first_scalar("abc\n");
    assert_eq!(core.resolve_event(&ev).unwrap(), None);
}

#[test]
fn explicit_tag_wins_over_schema() {
    let core = ScalarResolver::core();
    let ev = first_scalar("!!str 123\n");
    assert_eq!(core.resolve_event(&ev).unwrap(), Some(tags::STR));
}

#[test]
fn json_schema_rejects_leading_zero() {
    // `01` is an int under the permissive core schema but fails JSON
    // schema resolution outright.
    let core = ScalarResolver::core();
    let json = ScalarResolver::json();
    let ev = first_scalar("01\n");
    assert_eq!(core.resolve_event(&ev).unwrap(), Some(tags::INT));
    assert!(json.resolve_event(&ev).is_err());
}

#[test]
fn json_schema_accepts_json_forms() {
    let json = ScalarResolver::json();
    for (input, tag) in [
        ("null\n", tags::NULL),
        ("false\n", tags::BOOL),
        ("-7\n", tags::INT),
        ("2.5e3\n", tags::FLOAT),
    ] {
        let ev = first_scalar(input);
        assert_eq!(json.resolve_event(&ev).unwrap(), Some(tag), "for {input}");
    }
}

#[test]
fn special_floats_resolve_in_core_only() {
    let core = ScalarResolver::core();
    let json = ScalarResolver::json();
    for input in [".inf\n", "-.Inf\n", ".nan\n"] {
        let ev = first_scalar(input);
        assert_eq!(core.resolve_event(&ev).unwrap(), Some(tags::FLOAT));
        assert!(json.resolve_event(&ev).is_err(), "for {input}");
    }
}

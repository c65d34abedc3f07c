#![allow(dead_code)]

use std::fmt::Write;

use yamlet_core::{Emitter, Event, EventSource, MergingParser, Parser};

fn dump<S: EventSource>(source: &mut S, out: &mut String) {
    loop {
        match source.next_event() {
            Ok(ev) => {
                if ev.event == Event::StreamStart {
                    continue;
                }
                if ev.event == Event::StreamEnd {
                    break;
                }
                out.push('\n');
                write!(out, "{ev}").unwrap();
            }
            Err(_) => {
                out.push_str("\nERR");
                break;
            }
        }
    }
}

/// Assert that for the given input, the parser generates the expected set
/// of events.
///
/// # Panics
///
///    Panics if there is a difference between the expected events string
///    and the one generated from the input.
pub fn assert_eq_event(input: &str, expected_events: &str) {
    let mut line = String::with_capacity(expected_events.len());
    let mut parser = Parser::from_str(input);
    dump(&mut parser, &mut line);
    assert_eq!(line, expected_events, "Error in {input}");
}

/// Same as [`assert_eq_event`], with `<<` merge keys resolved.
pub fn assert_eq_merged(input: &str, expected_events: &str) {
    let mut line = String::with_capacity(expected_events.len());
    let mut parser = MergingParser::new(Parser::from_str(input));
    dump(&mut parser, &mut line);
    assert_eq!(line, expected_events, "Error in {input}");
}

/// Same as [`assert_eq_event`], with comments surfaced as events.
pub fn assert_eq_event_with_comments(input: &str, expected_events: &str) {
    let mut line = String::with_capacity(expected_events.len());
    let mut parser = Parser::from_str_with_comments(input);
    dump(&mut parser, &mut line);
    assert_eq!(line, expected_events, "Error in {input}");
}

/// Parse `input` and feed the events straight back through the emitter.
pub fn emit_from(input: &str) -> String {
    let mut parser = Parser::from_str(input);
    let mut out = String::new();
    let mut emitter = Emitter::new(&mut out);
    loop {
        let ev = parser.next_event().expect("parse error during emission");
        let done = ev.event == Event::StreamEnd;
        emitter.emit(ev.event).expect("emit error");
        if done {
            break;
        }
    }
    out
}

fn event_list(input: &str) -> Vec<Event> {
    Parser::from_str(input)
        .map(|ev| ev.expect("parse error").event)
        .collect()
}

/// Assert that emitting the parse of `input` and re-parsing the output
/// yields a structurally equal event sequence (anchors, tags, values and
/// styles included).
pub fn assert_round_trip(input: &str) {
    let original = event_list(input);
    let emitted = emit_from(input);
    let reparsed = event_list(&emitted);
    assert_eq!(original, reparsed, "round trip changed events:\n{emitted}");
}

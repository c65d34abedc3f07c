use std::collections::VecDeque;

use hashbrown::HashSet;
use yamlet_common::{ScalarStyle, Span, YamlError, YamlResult};

use crate::events::{Event, EventSource, SpannedEvent};
use crate::schema::tags;

/// The reserved mapping key whose value names mappings to copy in.
pub const MERGE_KEY: &str = "<<";

/// Hard ceiling on splice operations per document, so a mapping merging
/// itself degenerates into an error instead of unbounded growth.
const MAX_EXPANSIONS: usize = 1_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Ctx {
    Seq,
    MapKey,
    MapValue,
}

/// Decorator over an event source that resolves `<<` merge keys.
///
/// One document at a time is drained into a buffer (so forward anchor
/// references resolve, and documents not yet reached are not buffered),
/// merge keys are spliced out in place, and the result is re-exposed
/// through the ordinary pull interface.
///
/// Splicing inserts the referenced mapping's entries at the merge key's
/// position and never deduplicates colliding keys; with `<<: [*a, *b]`
/// the aliases splice in listed order, so a first-occurrence-wins
/// consumer observes the conventional merge-key precedence.
pub struct MergingParser<P> {
    inner: P,
    buffer: VecDeque<SpannedEvent>,
}

impl<P: EventSource> MergingParser<P> {
    pub fn new(inner: P) -> MergingParser<P> {
        MergingParser {
            inner,
            buffer: VecDeque::new(),
        }
    }

    pub fn next_event(&mut self) -> YamlResult<SpannedEvent> {
        if let Some(ev) = self.buffer.pop_front() {
            return Ok(ev);
        }
        let ev = self.inner.next_event()?;
        if matches!(ev.event, Event::DocumentStart { .. }) {
            self.buffer_document(ev)?;
            return Ok(self.buffer.pop_front().unwrap());
        }
        // Stream framing and inter-document comments pass straight
        // through.
        Ok(ev)
    }

    fn buffer_document(&mut self, doc_start: SpannedEvent) -> YamlResult<()> {
        let mut events = vec![doc_start];
        loop {
            let ev = self.inner.next_event()?;
            let is_end = matches!(ev.event, Event::DocumentEnd { .. });
            events.push(ev);
            if is_end {
                break;
            }
        }
        resolve_merges(&mut events)?;
        self.buffer.extend(events);
        Ok(())
    }
}

impl<P: EventSource> EventSource for MergingParser<P> {
    fn next_event(&mut self) -> YamlResult<SpannedEvent> {
        MergingParser::next_event(self)
    }
}

fn is_merge_scalar(event: &Event) -> bool {
    match event {
        Event::Scalar {
            value, tag, style, ..
        } => {
            value == MERGE_KEY
                && matches!(style, ScalarStyle::Any | ScalarStyle::Plain)
                && tag.as_deref().map_or(true, |t| t == tags::MERGE)
        }
        _ => false,
    }
}

/// Single in-place resolution pass over one document's events.
fn resolve_merges(events: &mut Vec<SpannedEvent>) -> YamlResult<()> {
    // Splicing never removes an anchor declaration, so the declared set
    // can be computed up front.
    let declared: HashSet<String> = events
        .iter()
        .filter_map(|ev| ev.event.anchor().map(String::from))
        .collect();

    let mut stack: Vec<Ctx> = Vec::new();
    let mut expansions = 0usize;
    let mut i = 0;
    while i < events.len() {
        let in_key_position = matches!(stack.last(), Some(Ctx::MapKey));
        if in_key_position && is_merge_scalar(&events[i].event) {
            let key_span = events[i].span;
            expansions += 1;
            if expansions > MAX_EXPANSIONS {
                return Err(YamlError::semantic(
                    key_span,
                    "merge key expansion limit exceeded (self-referential merge?)",
                ));
            }

            enum ValueShape {
                Alias(String, Span),
                Aliases,
                Other,
            }
            let shape = match events.get(i + 1) {
                Some(ev) => match &ev.event {
                    Event::Alias { name } => ValueShape::Alias(name.clone(), ev.span),
                    Event::SequenceStart { .. } => ValueShape::Aliases,
                    _ => ValueShape::Other,
                },
                None => ValueShape::Other,
            };

            match shape {
                ValueShape::Alias(name, alias_span) => {
                    let inner = anchored_mapping_contents(events, &name, alias_span)?;
                    events.splice(i..i + 2, inner);
                    // Rescan from the splice point: merged-in content may
                    // itself contain merge keys.
                    continue;
                }
                ValueShape::Aliases => {
                    let end = matching_end(events, i + 1)?;
                    let mut names = Vec::new();
                    for ev in &events[i + 2..end] {
                        match &ev.event {
                            Event::Alias { name } => names.push((name.clone(), ev.span)),
                            _ => {
                                return Err(YamlError::semantic(
                                    ev.span,
                                    "merge key sequence may contain only aliases",
                                ));
                            }
                        }
                    }
                    let mut merged = Vec::new();
                    for (name, span) in names {
                        merged.extend(anchored_mapping_contents(events, &name, span)?);
                    }
                    events.splice(i..=end, merged);
                    continue;
                }
                ValueShape::Other => {
                    return Err(YamlError::semantic(
                        key_span,
                        "merge key requires an alias or a sequence of aliases",
                    ));
                }
            }
        }

        if let Event::Alias { name } = &events[i].event {
            if !declared.contains(name) {
                return Err(YamlError::anchor_not_found(events[i].span, name));
            }
        }
        advance(&mut stack, &events[i].event);
        i += 1;
    }
    Ok(())
}

/// Track whether the walk is at a mapping key or value position. A
/// completed node (scalar, alias, or a closed collection) flips the
/// parity of the enclosing mapping.
fn advance(stack: &mut Vec<Ctx>, event: &Event) {
    match event {
        Event::MappingStart { .. } => stack.push(Ctx::MapKey),
        Event::SequenceStart { .. } => stack.push(Ctx::Seq),
        Event::MappingEnd | Event::SequenceEnd => {
            stack.pop();
            flip_parent(stack);
        }
        Event::Scalar { .. } | Event::Alias { .. } => flip_parent(stack),
        _ => {}
    }
}

fn flip_parent(stack: &mut [Ctx]) {
    if let Some(top) = stack.last_mut() {
        *top = match top {
            Ctx::MapKey => Ctx::MapValue,
            Ctx::MapValue => Ctx::MapKey,
            Ctx::Seq => Ctx::Seq,
        };
    }
}

/// The events strictly between the anchored mapping's start and its
/// matching end, cloned with their anchors stripped so the copies never
/// re-declare a name.
fn anchored_mapping_contents(
    events: &[SpannedEvent],
    name: &str,
    span: Span,
) -> YamlResult<Vec<SpannedEvent>> {
    let start = events
        .iter()
        .position(|ev| ev.event.anchor() == Some(name))
        .ok_or_else(|| YamlError::anchor_not_found(span, name))?;
    if !matches!(events[start].event, Event::MappingStart { .. }) {
        return Err(YamlError::semantic(
            span,
            &format!("merge key alias '*{name}' must reference a mapping"),
        ));
    }
    let end = matching_end(events, start)?;
    let mut inner: Vec<SpannedEvent> = events[start + 1..end].to_vec();
    for ev in &mut inner {
        ev.event.clear_anchor();
    }
    Ok(inner)
}

/// Index of the end event matching the start at `start`, by nesting
/// count.
fn matching_end(events: &[SpannedEvent], start: usize) -> YamlResult<usize> {
    let mut depth = 0i32;
    for (idx, ev) in events.iter().enumerate().skip(start) {
        depth += ev.event.nesting_increase();
        if depth == 0 {
            return Ok(idx);
        }
    }
    Err(YamlError::semantic(
        events[start].span,
        "unterminated collection in event stream",
    ))
}

#[cfg(test)]
mod test {
    use super::MergingParser;
    use crate::events::Event;
    use crate::parser::Parser;

    fn values(input: &str) -> Vec<String> {
        let mut parser = MergingParser::new(Parser::from_str(input));
        let mut out = Vec::new();
        loop {
            let ev = parser.next_event().unwrap();
            match ev.event {
                Event::Scalar { value, .. } => out.push(value),
                Event::Alias { name } => out.push(format!("*{name}")),
                Event::StreamEnd => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn merge_splices_at_key_position() {
        let input = "base: &b {a: 1, b: 2}\nderived: {<<: *b, b: 3}\n";
        assert_eq!(
            values(input),
            ["base", "a", "1", "b", "2", "derived", "a", "1", "b", "2", "b", "3"]
        );
    }

    #[test]
    fn double_merge_as_sequence_item_is_plain_data() {
        // `<<` outside a key position must not trigger merging.
        let input = "anchored: &a {x: 1}\nlist:\n  - <<\n  - *a\n";
        assert_eq!(values(input), ["anchored", "x", "1", "list", "<<", "*a"]);
    }

    #[test]
    fn self_referential_merge_is_rejected() {
        let input = "a: &a {<<: *a}\n";
        let mut parser = MergingParser::new(Parser::from_str(input));
        let mut result = Ok(());
        loop {
            match parser.next_event() {
                Err(e) => {
                    result = Err(e);
                    break;
                }
                Ok(ev) if ev.event == Event::StreamEnd => break,
                Ok(_) => {}
            }
        }
        assert!(result.is_err());
    }
}

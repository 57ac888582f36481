#[path = "common/harness.rs"]
mod harness;

use bus::ReplicaEvent;
use core_types::ReportPolicy;
use dom::{ChildItem, Document, NodeId};
use dom_test_support::seeds::{Lcg, derive_seed, fuzz_seed_base, fuzz_seed_count};
use harness::Harness;

const MARKUP: &str = r#"<html><head></head><body><div id="a" class="x"><p>one</p><p>two</p></div><ul><li>i</li><li>ii</li></ul></body></html>"#;
const TAGS: &[&str] = &["div", "p", "span", "li", "b"];
const WORDS: &[&str] = &["alpha", "beta", "", "a & b", "<tag>"];
const CLASSES: &[&str] = &["x", "y", "z"];

/// Elements attached under the document element, in document order.
fn attached_elements(doc: &Document) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = doc.document_element().into_iter().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(doc.element_children(node).collect::<Vec<_>>().into_iter().rev());
    }
    out
}

fn word(rng: &mut Lcg) -> &'static str {
    rng.pick(WORDS).copied().unwrap_or_default()
}

/// Detached nodes built up during a session, available for later moves.
#[derive(Default)]
struct Session {
    holders: Vec<NodeId>,
}

/// A detached chain of nested elements deeper than serde_json's default nesting
/// limit allows for a snapshot.
fn deep_chain(harness: &mut Harness, rng: &mut Lcg) -> Option<NodeId> {
    let depth = rng.gen_range(65, 131);
    let tag = rng.pick(TAGS).copied().unwrap_or("div");
    let markup = format!(
        "{}{}{}",
        format!("<{tag}>").repeat(depth),
        word(rng),
        format!("</{tag}>").repeat(depth)
    );
    harness.primary.create_fragment(&markup).first().copied()
}

/// One random mutation through the primary. Failures are fine: under
/// report-after a failing operation reports nothing.
fn mutate(harness: &mut Harness, session: &mut Session, rng: &mut Lcg) {
    let elements = harness.primary.read(attached_elements);
    // never touch <html> itself so there is always a document element
    let Some(&target) = rng.pick(&elements[1..]) else {
        return;
    };
    let choice = rng.gen_range(0, 16);
    if choice == 14 {
        if let Some(chain) = deep_chain(harness, rng) {
            let _ = harness.primary.append_child(target, chain);
        }
        return;
    }
    let primary = &mut harness.primary;
    let _ = match choice {
        0 => primary.set_text_content(target, Some(word(rng))),
        1 => primary.set_attribute(target, "title", word(rng)),
        2 => primary.remove_attribute(target, "title"),
        3 => {
            let tag = rng.pick(TAGS).copied().unwrap_or("div");
            match primary.create_element(tag) {
                Ok(fresh) => {
                    let text = primary.create_text_node(word(rng));
                    let _ = primary.append_child(fresh, text);
                    primary.append_child(target, fresh).map(|_| ())
                }
                Err(err) => Err(err),
            }
        }
        4 => {
            let Some(&moved) = rng.pick(&elements[1..]) else {
                return;
            };
            let reference = primary.read(|doc| doc.children(target).first().copied());
            primary.insert_before(target, moved, reference).map(|_| ())
        }
        5 => primary.remove(target),
        6 => primary
            .class_list(target)
            .toggle(rng.pick(CLASSES).copied().unwrap_or("x"), None)
            .map(|_| ()),
        7 => {
            let value = if rng.chance(3) { "" } else { "red" };
            primary.style(target).set_property("color", value, None)
        }
        8 => primary.set_inner_html(target, "<i>in</i>ner"),
        9 => {
            let items = vec![ChildItem::Text(word(rng).to_string())];
            if rng.chance(2) {
                primary.before(target, items)
            } else {
                primary.after(target, items)
            }
        }
        10 => primary.dataset(target).set("itemId", word(rng)),
        11 => primary.set_class_name(target, "y z"),
        12 => {
            // attached nodes moved into a container that is not in the tree
            let reused = rng.pick(&session.holders).copied().filter(|_| rng.chance(2));
            let holder = match reused {
                Some(holder) => holder,
                None => match primary.create_element("div") {
                    Ok(holder) => {
                        session.holders.push(holder);
                        holder
                    }
                    Err(_) => return,
                },
            };
            let second = rng.pick(&elements[1..]).copied().unwrap_or(target);
            if rng.chance(2) {
                primary.append_child(holder, target).map(|_| ())
            } else {
                primary.append(holder, vec![ChildItem::Node(target), ChildItem::Node(second)])
            }
        }
        13 => match rng.pick(&session.holders) {
            Some(&holder) => primary.append_child(target, holder).map(|_| ()),
            None => return,
        },
        _ => primary.style(target).set("--gap", "1px"),
    };
}

#[test]
fn replica_matches_primary_after_every_checkpoint() {
    let base = fuzz_seed_base();
    for case in 0..fuzz_seed_count() {
        let seed = derive_seed(base, "replica_matches_primary_after_every_checkpoint", case as u64);
        let mut rng = Lcg::new(seed);
        let mut harness = Harness::new(MARKUP, ReportPolicy::ReportAfter);
        let mut session = Session::default();
        for _ in 0..rng.gen_range(1, 13) {
            for _ in 0..rng.gen_range(0, 17) {
                mutate(&mut harness, &mut session, &mut rng);
            }
            harness.primary.checkpoint();
            let events = harness.pump_framed();
            assert!(
                events
                    .iter()
                    .all(|event| matches!(event, ReplicaEvent::Flushed(_))),
                "seed {seed:#x}: {events:?}"
            );
            harness.assert_mirrored();
        }
    }
}

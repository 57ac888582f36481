//! Fixtures and helpers shared by the mirror's integration tests.
mod scenario;
pub mod seeds;

pub use dom::dom_snapshot::{CompareOptions, DomMismatch, assert_dom_eq, compare_dom};
pub use scenario::{
    Scenario, Step, StepArg, all_fixtures, fixtures_dir, load_fixture, run_step, run_steps,
};

use dom::Document;

/// Panics with a readable diff unless both document elements match.
pub fn assert_mirrored(primary: &Document, replica: &Document) {
    let (Some(expected), Some(actual)) = (primary.document_element(), replica.document_element())
    else {
        panic!("both documents need a document element");
    };
    if let Err(mismatch) = compare_dom(primary, expected, replica, actual, CompareOptions::default())
    {
        panic!("replica diverged from primary:\n{mismatch}");
    }
}

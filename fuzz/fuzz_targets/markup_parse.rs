#![no_main]

use dom::{Document, document_from_snapshot, snapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let markup = String::from_utf8_lossy(data);
    let doc = Document::parse(&markup);
    let _ = doc.to_html();
    if let Ok(wire) = snapshot(&doc, doc.root())
        && let Ok(rebuilt) = document_from_snapshot(&wire)
        && let Some(element) = rebuilt.document_element()
    {
        let _ = rebuilt.outer_html(element);
    }
});

#![no_main]

use bus::{FrameReader, PrimaryEvent};
use dom::Document;
use libfuzzer_sys::fuzz_target;
use replica::Replica;

const FIXTURE: &str = r#"<html><head></head><body><div id="a" class="x" style="color: red;"><p>one</p>two<!--c--></div><ul><li>i</li></ul></body></html>"#;

fuzz_target!(|data: &[u8]| {
    let mut replica = Replica::new(Document::parse(FIXTURE));
    let mut reader = FrameReader::new(data);
    // bounded so a pathological input cannot loop on decode errors forever
    for _ in 0..256 {
        match reader.next_frame::<PrimaryEvent>() {
            Ok(Some(event)) => {
                replica.handle_event(event);
            }
            Ok(None) => break,
            Err(_) => continue,
        }
    }
    replica.checkpoint();
    let _ = replica.view().outer_html();
});

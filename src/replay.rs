use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use bus::{FrameError, FrameReader, PrimaryEvent};
use dom::Document;
use replica::Replica;

/// Applies a recorded event stream to the markup in `markup` and prints the
/// visible replica. Undecodable lines are logged and skipped.
pub fn run(markup: &Path, events: &Path, verbose: bool) -> Result<()> {
    let source = fs::read_to_string(markup).with_context(|| format!("reading {markup:?}"))?;
    let mut replica = Replica::new(Document::parse(&source));
    let file = File::open(events).with_context(|| format!("opening {events:?}"))?;
    let mut reader = FrameReader::new(BufReader::new(file));

    let mut applied = 0usize;
    loop {
        let event = match reader.next_frame::<PrimaryEvent>() {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err @ FrameError::Decode { .. }) => {
                log::warn!(target: "mirror.bus", "{events:?}: {err}");
                continue;
            }
            Err(err) => return Err(err).with_context(|| format!("reading {events:?}")),
        };
        if matches!(event, PrimaryEvent::Patch { .. }) {
            applied += 1;
        }
        for replica_event in replica.handle_event(event) {
            if verbose {
                eprintln!("{replica_event:?}");
            }
        }
    }
    // a stream cut off mid-step still shows what it carried
    if let Some(flush) = replica.checkpoint() {
        log::info!(target: "mirror.flush", "final flush of {} trailing patch(es)", flush.patches);
    }
    log::info!(target: "mirror.apply", "{applied} patch frame(s) read from {events:?}");
    println!("{}", replica.view().read().to_html());
    Ok(())
}

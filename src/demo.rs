//! End-to-end run: scripted primary, replica runtime thread, optional root swap
//! recovered through the debugger bridge.
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use bus::{ChannelBridge, FrameSink, MirrorBus, ReplicaCommand, ReplicaEvent};
use core_types::ReportPolicy;
use dom::Document;
use primary::{InterceptConfig, PatchRecorder, Primary, RootHandle, spawn_eval_server};
use replica::{Replica, ReplicaConfig, ResyncClient};
use runtime_replica::start_replica_runtime;

const PAGE: &str = r#"<!DOCTYPE html><html><head><title>counter</title></head><body><h1>Counter</h1><p id="count">0</p><ul id="log"></ul></body></html>"#;
const SWAPPED_PAGE: &str = r#"<!DOCTYPE html><html><head></head><body><main>swapped</main></body></html>"#;

pub struct DemoOptions {
    pub steps: u32,
    pub report_before: bool,
    pub swap_root: bool,
    pub resync_timeout_ms: Option<u64>,
    pub record: Option<PathBuf>,
}

pub fn run(options: DemoOptions) -> Result<()> {
    let intercept = if options.report_before {
        InterceptConfig::with_policy(ReportPolicy::ReportBefore)
    } else {
        InterceptConfig::from_env()
    };
    let mut replica_config = ReplicaConfig::from_env();
    if let Some(ms) = options.resync_timeout_ms {
        replica_config.resync_timeout = Duration::from_millis(ms);
    }
    let wait = replica_config.resync_timeout;

    let MirrorBus {
        cmd_tx,
        cmd_rx,
        evt_tx,
        evt_rx,
    } = MirrorBus::new();
    let replica = Replica::new(Document::parse(PAGE));
    let view = replica.view();
    let runtime = start_replica_runtime(cmd_rx, evt_tx, replica);

    let root = RootHandle::new(Document::parse(PAGE));
    let (bridge, eval_requests) = ChannelBridge::new();
    let eval_server = spawn_eval_server(root.clone(), eval_requests);

    let recording = match &options.record {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {path:?}"))?;
            Some(FrameSink::new(BufWriter::new(file)))
        }
        None => None,
    };
    let mut primary = Primary::new(root.clone());
    primary.install(intercept, PatchRecorder::new((cmd_tx.clone(), recording)));

    let (count, list) = primary.read(|doc| {
        let body = doc.body()?;
        let mut children = doc.element_children(body).skip(1);
        Some((children.next()?, children.next()?))
    })
    .ok_or_else(|| anyhow!("demo page lost its counter"))?;

    for step in 1..=options.steps {
        primary.set_text_content(count, Some(step.to_string().as_str()))?;
        let item = primary.create_element("li")?;
        primary.class_list(item).add(&["entry"])?;
        let text = primary.create_text_node(format!("step {step}"));
        primary.append_child(item, text)?;
        primary.append_child(list, item)?;
        primary.style(count).set("fontWeight", if step % 2 == 0 { "bold" } else { "normal" })?;
        primary.checkpoint();

        expect_event(&evt_rx, wait, |event| matches!(event, ReplicaEvent::Flushed(_)))?;
        println!("after step {step}: {}", view.outer_html());
    }

    if options.swap_root {
        root.replace(Document::parse(SWAPPED_PAGE));
        let main = primary
            .read(|doc| doc.body().and_then(|body| doc.element_children(body).next()))
            .ok_or_else(|| anyhow!("swapped page has no <main>"))?;
        primary.set_text_content(main, Some("swapped and edited"))?;
        primary.checkpoint();

        expect_event(&evt_rx, wait, |event| matches!(event, ReplicaEvent::ResyncRequired))?;
        ResyncClient::new(bridge, &replica_config).request_reset(&cmd_tx)?;
        expect_event(&evt_rx, wait, |event| matches!(event, ReplicaEvent::Reset))?;
        println!("after resync: {}", view.outer_html());
    } else {
        drop(bridge);
    }

    cmd_tx
        .send(ReplicaCommand::Shutdown)
        .map_err(|_| anyhow!("replica runtime stopped early"))?;
    let replica = runtime
        .join()
        .map_err(|_| anyhow!("replica runtime panicked"))?;
    drop(primary);
    eval_server
        .join()
        .map_err(|_| anyhow!("evaluation server panicked"))?;

    let primary_html = root.read().to_html();
    let replica_html = replica.view().read().to_html();
    println!("primary: {primary_html}");
    println!("replica: {replica_html}");
    if primary_html != replica_html {
        log::warn!(target: "mirror.flush", "replica differs from primary (non-element preamble is not replicated)");
    }
    Ok(())
}

/// Waits for the first event matching `wanted`, logging anything else on the way.
fn expect_event(
    events: &Receiver<ReplicaEvent>,
    timeout: Duration,
    wanted: impl Fn(&ReplicaEvent) -> bool,
) -> Result<ReplicaEvent> {
    loop {
        let event = events
            .recv_timeout(timeout)
            .context("waiting for the replica")?;
        if wanted(&event) {
            return Ok(event);
        }
        match &event {
            ReplicaEvent::PatchSkipped { .. } | ReplicaEvent::SequenceGap { .. } => {
                log::warn!(target: "mirror.apply", "replica: {event:?}");
            }
            ReplicaEvent::ProtocolError { message, .. } => bail!("protocol error: {message}"),
            _ => log::info!(target: "mirror.apply", "replica: {event:?}"),
        }
    }
}

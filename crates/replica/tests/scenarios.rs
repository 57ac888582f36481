#[path = "common/harness.rs"]
mod harness;

use bus::{ChannelBridge, Flush, PrimaryEvent, ReplicaEvent};
use core_types::{PatchSeq, ReportPolicy};
use dom::{ChildItem, Document, NodeMember, NodePath, Operation, PatchArg};
use dom_test_support::{all_fixtures, load_fixture, run_step, run_steps};
use harness::Harness;
use primary::{InstallOutcome, InterceptConfig, PatchRecorder, spawn_eval_server};
use replica::{ReplicaConfig, ResyncClient};

#[test]
fn counter_updates_become_visible_at_each_checkpoint() {
    let scenario = load_fixture("counter");
    let mut harness = Harness::new(&scenario.markup, ReportPolicy::ReportAfter);
    let view = harness.replica.view();

    run_step(&mut harness.primary, &scenario.steps[0]);
    let events = harness.drain();
    assert_eq!(events.len(), 2);
    match &events[0] {
        PrimaryEvent::Patch { seq, patch } => {
            assert_eq!(*seq, PatchSeq(1));
            assert_eq!(patch.target_path, NodePath(vec![0, 1, 0]));
            assert_eq!(patch.prop, Operation::node(NodeMember::TextContent));
            assert_eq!(patch.args, vec![PatchArg::String("1".into())]);
        }
        other => panic!("expected a patch, got {other:?}"),
    }
    assert_eq!(events[1], PrimaryEvent::Checkpoint);
    assert_eq!(
        harness.deliver(events),
        vec![ReplicaEvent::Flushed(Flush {
            patches: 1,
            first: PatchSeq(1),
            last: PatchSeq(1),
        })]
    );
    assert!(view.outer_html().contains(r#"<p id="count">1</p>"#));

    run_step(&mut harness.primary, &scenario.steps[1]);
    harness.pump();
    assert_eq!(view.outer_html(), scenario.expected.clone().unwrap());
    assert_eq!(view.flush_count(), 2);
}

#[test]
fn appended_button_arrives_as_a_snapshot() {
    let scenario = load_fixture("append_button");
    let mut harness = Harness::new(&scenario.markup, ReportPolicy::ReportAfter);
    run_steps(&mut harness.primary, &scenario);
    let events = harness.drain();
    let PrimaryEvent::Patch { patch, .. } = &events[0] else {
        panic!("expected a patch, got {:?}", events[0]);
    };
    let [PatchArg::Node(wire)] = patch.args.as_slice() else {
        panic!("expected one snapshot argument, got {:?}", patch.args);
    };
    assert_eq!(
        serde_json::to_string(wire).unwrap(),
        r#"["button",{"class":"go"},[["Text","Go"]]]"#
    );
    harness.deliver(events);
    assert_eq!(
        harness.replica.view().outer_html(),
        scenario.expected.clone().unwrap()
    );
}

#[test]
fn root_swap_is_recovered_by_a_full_resync() {
    let mut harness = Harness::new(
        "<html><body><p>old</p></body></html>",
        ReportPolicy::ReportAfter,
    );
    harness
        .primary
        .root()
        .replace(Document::parse("<html><body><main>new</main></body></html>"));
    let main = harness.primary.read(|doc| doc.element_children(doc.body().unwrap()).next().unwrap());
    harness.primary.set_text_content(main, Some("newer")).unwrap();
    harness.primary.checkpoint();

    let events = harness.pump();
    assert_eq!(events, vec![ReplicaEvent::ResyncRequired]);
    assert!(harness.replica.is_awaiting_resync());
    assert_eq!(
        harness.replica.view().outer_html(),
        "<html><body><p>old</p></body></html>"
    );

    let (bridge, requests) = ChannelBridge::new();
    let server = spawn_eval_server(harness.primary.root().clone(), requests);
    let client = ResyncClient::new(bridge, &ReplicaConfig::default());
    client.resync(&mut harness.replica).unwrap();
    drop(client);
    server.join().unwrap();
    harness.assert_mirrored();

    // the stream continues normally after the resync
    harness.primary.set_text_content(main, Some("newest")).unwrap();
    harness.primary.checkpoint();
    let events = harness.pump();
    assert!(matches!(events.as_slice(), [ReplicaEvent::Flushed(_)]));
    harness.assert_mirrored();
}

#[test]
fn dropped_patch_is_reported_as_a_gap_and_application_continues() {
    let mut harness = Harness::new(
        "<html><body><p>0</p><span>0</span></body></html>",
        ReportPolicy::ReportAfter,
    );
    let (p, span) = harness.primary.read(|doc| {
        let mut children = doc.element_children(doc.body().unwrap());
        (children.next().unwrap(), children.next().unwrap())
    });
    harness.primary.set_text_content(p, Some("1")).unwrap();
    harness.primary.set_text_content(p, Some("2")).unwrap();
    harness.primary.set_text_content(span, Some("3")).unwrap();
    harness.primary.checkpoint();

    let events: Vec<_> = harness
        .drain()
        .into_iter()
        .filter(|event| !matches!(event, PrimaryEvent::Patch { seq: PatchSeq(2), .. }))
        .collect();
    let replica_events = harness.deliver(events);
    assert_eq!(
        replica_events,
        vec![
            ReplicaEvent::SequenceGap {
                expected: PatchSeq(2),
                got: PatchSeq(3),
            },
            ReplicaEvent::Flushed(Flush {
                patches: 2,
                first: PatchSeq(1),
                last: PatchSeq(3),
            }),
        ]
    );
    assert_eq!(
        harness.replica.view().outer_html(),
        "<html><body><p>1</p><span>3</span></body></html>"
    );
}

#[test]
fn patch_against_a_stale_tree_is_skipped_without_stopping_the_stream() {
    let mut harness = Harness::new(
        "<html><body><ul><li>a</li><li>b</li></ul></body></html>",
        ReportPolicy::ReportAfter,
    );
    let (list, first) = harness.primary.read(|doc| {
        let list = doc.element_children(doc.body().unwrap()).next().unwrap();
        (list, doc.element_children(list).next().unwrap())
    });
    let item = harness.primary.create_element("li").unwrap();
    harness.primary.append_child(list, item).unwrap();
    harness.primary.set_text_content(item, Some("c")).unwrap();
    harness.primary.set_text_content(first, Some("A")).unwrap();
    harness.primary.checkpoint();

    // lose the append: the next patch addresses a sibling the replica never got
    let events: Vec<_> = harness
        .drain()
        .into_iter()
        .filter(|event| !matches!(event, PrimaryEvent::Patch { seq: PatchSeq(1), .. }))
        .collect();
    let replica_events = harness.deliver(events);
    assert!(matches!(
        replica_events.as_slice(),
        [
            ReplicaEvent::PatchSkipped { seq: PatchSeq(2), .. },
            ReplicaEvent::Flushed(Flush { patches: 1, .. }),
        ]
    ));
    assert_eq!(
        harness.replica.view().outer_html(),
        "<html><body><ul><li>A</li><li>b</li></ul></body></html>"
    );
}

#[test]
fn every_fixture_mirrors_under_both_policies() {
    for policy in [ReportPolicy::ReportAfter, ReportPolicy::ReportBefore] {
        for scenario in all_fixtures() {
            let mut harness = Harness::new(&scenario.markup, policy);
            run_steps(&mut harness.primary, &scenario);
            harness.pump();
            harness.assert_mirrored();
            if let Some(expected) = &scenario.expected {
                assert_eq!(&harness.primary_html(), expected, "{}", scenario.name);
            }
        }
    }
}

#[test]
fn failing_primary_operation_is_skipped_on_the_replica_under_report_before() {
    let scenario = load_fixture("markup_and_failures");
    let mut harness = Harness::new(&scenario.markup, ReportPolicy::ReportBefore);
    run_steps(&mut harness.primary, &scenario);
    let events = harness.pump();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, ReplicaEvent::PatchSkipped { seq: PatchSeq(2), .. })),
        "{events:?}"
    );

    let mut after = Harness::new(&scenario.markup, ReportPolicy::ReportAfter);
    run_steps(&mut after.primary, &scenario);
    let events = after.pump();
    assert!(matches!(events.as_slice(), [ReplicaEvent::Flushed(Flush { patches: 1, .. })]));
}

#[test]
fn second_install_does_not_double_report() {
    let mut harness = Harness::new("<html><body></body></html>", ReportPolicy::ReportAfter);
    let (tx, extra) = std::sync::mpsc::channel();
    assert_eq!(
        harness
            .primary
            .install(InterceptConfig::default(), PatchRecorder::new(tx)),
        InstallOutcome::AlreadyInstalled
    );
    let body = harness.primary.read(|doc| doc.body().unwrap());
    harness.primary.set_id(body, "main").unwrap();
    let patches = harness
        .drain()
        .into_iter()
        .filter(|event| matches!(event, PrimaryEvent::Patch { .. }))
        .count();
    assert_eq!(patches, 1);
    assert!(extra.try_recv().is_err());
}

#[test]
fn unknown_operations_surface_as_protocol_errors() {
    let mut harness = Harness::new("<html><body></body></html>", ReportPolicy::ReportAfter);
    let patch: dom::Patch = serde_json::from_str(
        r#"{"targetPath":[0,0],"prop":["classList","shuffle"],"args":[]}"#,
    )
    .unwrap();
    let events = harness.deliver(vec![
        PrimaryEvent::Patch {
            seq: PatchSeq(1),
            patch,
        },
        PrimaryEvent::Checkpoint,
    ]);
    assert!(matches!(
        events.as_slice(),
        [ReplicaEvent::ProtocolError { seq: PatchSeq(1), .. }]
    ));
}

#[test]
fn node_moved_into_a_detached_holder_leaves_the_replica_too() {
    for policy in [ReportPolicy::ReportAfter, ReportPolicy::ReportBefore] {
        let mut harness = Harness::new(
            "<html><body><p>stays</p><p>moves</p><b>too</b></body></html>",
            policy,
        );
        let (moves, too) = harness.primary.read(|doc| {
            let children = doc.children(doc.body().unwrap());
            (children[1], children[2])
        });
        let holder = harness.primary.create_element("div").unwrap();
        harness.primary.append_child(holder, moves).unwrap();
        let other = harness.primary.create_element("section").unwrap();
        harness
            .primary
            .append(other, vec![ChildItem::Node(too), ChildItem::Text("x".into())])
            .unwrap();
        harness.primary.checkpoint();

        let events = harness.pump();
        assert!(matches!(events.as_slice(), [ReplicaEvent::Flushed(_)]), "{events:?}");
        assert_eq!(
            harness.replica.view().outer_html(),
            "<html><body><p>stays</p></body></html>"
        );
        harness.assert_mirrored();

        // the holder goes back in with its content as one snapshot
        let body = harness.primary.read(|doc| doc.body().unwrap());
        harness.primary.append_child(body, holder).unwrap();
        harness.primary.checkpoint();
        harness.pump();
        harness.assert_mirrored();
    }
}

#[test]
fn deep_documents_resync_and_stream_past_the_json_nesting_limit() {
    let depth = 200;
    let markup = format!(
        "<html><body>{}<i>bottom</i>{}</body></html>",
        "<div>".repeat(depth),
        "</div>".repeat(depth)
    );
    let mut harness = Harness::new("<html><body></body></html>", ReportPolicy::ReportAfter);
    harness.primary.root().replace(Document::parse(&markup));
    let body = harness.primary.read(|doc| doc.body().unwrap());
    harness.primary.set_id(body, "deep").unwrap();
    harness.primary.checkpoint();
    assert_eq!(harness.pump(), vec![ReplicaEvent::ResyncRequired]);

    let (bridge, requests) = ChannelBridge::new();
    let server = spawn_eval_server(harness.primary.root().clone(), requests);
    let client = ResyncClient::new(bridge, &ReplicaConfig::default());
    client.resync(&mut harness.replica).unwrap();
    drop(client);
    server.join().unwrap();
    harness.assert_mirrored();

    // a detached chain just as deep travels as one framed snapshot argument
    let chain = harness
        .primary
        .create_fragment(&format!("{}leaf{}", "<span>".repeat(depth), "</span>".repeat(depth)));
    harness.primary.append_child(body, chain[0]).unwrap();
    harness.primary.checkpoint();
    let events = harness.pump_framed();
    assert!(matches!(events.as_slice(), [ReplicaEvent::Flushed(_)]), "{events:?}");
    harness.assert_mirrored();

    // and a patch addressed at the bottom of the tree resolves there
    let bottom = harness.primary.read(|doc| {
        let mut node = doc.body().unwrap();
        while let Some(child) = doc.element_children(node).next() {
            node = child;
        }
        node
    });
    harness.primary.set_text_content(bottom, Some("moved")).unwrap();
    harness.primary.checkpoint();
    harness.pump_framed();
    harness.assert_mirrored();
}

#[test]
fn custom_style_properties_mirror_like_any_other_assignment() {
    let mut harness = Harness::new("<html><body></body></html>", ReportPolicy::ReportAfter);
    let body = harness.primary.read(|doc| doc.body().unwrap());
    harness.primary.style(body).set("--my_var", "1px").unwrap();
    harness.primary.style(body).set("backgroundColor", "red").unwrap();
    assert!(harness.primary.style(body).set("not a name", "x").is_err());
    harness.primary.checkpoint();

    let events = harness.pump_framed();
    assert!(matches!(events.as_slice(), [ReplicaEvent::Flushed(_)]), "{events:?}");
    assert_eq!(
        harness.replica.view().outer_html(),
        r#"<html><body style="--my_var: 1px; background-color: red;"></body></html>"#
    );
    harness.assert_mirrored();
}

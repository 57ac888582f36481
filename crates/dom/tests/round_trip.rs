use dom::dom_snapshot::{CompareOptions, compare_dom};
use dom::{Document, NodeId, NodePath, WireNode, materialize, path_of, resolve, snapshot};

const FIXTURES: &[&str] = &[
    "<html><body></body></html>",
    "<html><head><title>t</title></head><body><p>a<b>b</b>c</p></body></html>",
    "<html><body><ul id=\"l\"><li class=\"x y\">1</li><li>2</li></ul><!-- note --></body></html>",
    "<html><body><input type=\"text\" disabled><br><img src=\"a.png\" alt=\"&quot;q&quot;\"></body></html>",
    "<html><body><script>if (a < b) { c(); }</script><style>p > a { color: red }</style></body></html>",
    "<html><body style=\"color: red;\" data-user-id=\"7\">&lt;tag&gt; &amp; &nbsp;</body></html>",
];

fn descendants(doc: &Document, node: NodeId, out: &mut Vec<NodeId>) {
    out.push(node);
    for &child in doc.children(node) {
        descendants(doc, child, out);
    }
}

fn with_shadow_fixture() -> Document {
    let mut doc = Document::parse("<html><body><x-card title=\"c\"><span>light</span></x-card></body></html>");
    let body = doc.body().unwrap();
    let host = doc.children(body)[0];
    let shadow = doc.attach_shadow(host).unwrap();
    let slot = doc.create_element("slot").unwrap();
    let text = doc.create_text_node("shadow text");
    doc.append_child(shadow, slot).unwrap();
    doc.append_child(shadow, text).unwrap();
    doc
}

#[test]
fn materialize_of_snapshot_is_structurally_equal() {
    let mut docs: Vec<Document> = FIXTURES.iter().map(|m| Document::parse(m)).collect();
    docs.push(with_shadow_fixture());
    for mut doc in docs {
        let mut nodes = Vec::new();
        descendants(&doc, doc.document_element().unwrap(), &mut nodes);
        for node in nodes {
            let wire = snapshot(&doc, node).unwrap();
            let copy = materialize(&mut doc, &wire).unwrap();
            assert_ne!(copy, node);
            if let Err(mismatch) = compare_dom(&doc, node, &doc, copy, CompareOptions::default()) {
                panic!("{mismatch}");
            }
        }
    }
}

#[test]
fn snapshots_survive_json() {
    let doc = with_shadow_fixture();
    let wire = snapshot(&doc, doc.root()).unwrap();
    let json = serde_json::to_string(&wire).unwrap();
    let back: WireNode = serde_json::from_str(&json).unwrap();
    assert_eq!(back, wire);
}

#[test]
fn materialized_copies_share_no_state() {
    let mut doc = Document::parse(FIXTURES[2]);
    let list = doc.children(doc.body().unwrap())[0];
    let wire = snapshot(&doc, list).unwrap();
    let copy = materialize(&mut doc, &wire).unwrap();
    doc.set_attribute(copy, "id", "other").unwrap();
    assert_eq!(doc.get_attribute(list, "id"), Some("l"));
}

#[test]
fn paths_resolve_back_to_their_node() {
    for markup in FIXTURES {
        let doc = Document::parse(&format!("<!DOCTYPE html><!--pre-->{markup}"));
        let mut nodes = Vec::new();
        descendants(&doc, doc.document_element().unwrap(), &mut nodes);
        for node in nodes {
            let path = path_of(&doc, node, doc.root()).expect("attached node has a path");
            assert_eq!(resolve(&doc, doc.root(), &path), Some(node), "{markup} {path}");
        }
    }
}

#[test]
fn paths_are_relative_to_their_root() {
    let doc = Document::parse(FIXTURES[2]);
    let body = doc.body().unwrap();
    let list = doc.children(body)[0];
    let second = doc.children(list)[1];
    assert_eq!(path_of(&doc, second, list), Some(NodePath(vec![1])));
    assert_eq!(path_of(&doc, list, second), None);
}

#[test]
fn shadow_content_has_no_document_path() {
    let doc = with_shadow_fixture();
    let body = doc.body().unwrap();
    let host = doc.children(body)[0];
    let shadow = doc.shadow_root(host).unwrap();
    let slot = doc.children(shadow)[0];
    assert_eq!(path_of(&doc, slot, doc.root()), None);
    assert_eq!(path_of(&doc, slot, shadow), Some(NodePath(vec![0])));
}

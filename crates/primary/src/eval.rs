//! Primary-side answers to the resync expressions.
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use bus::{EvalRequest, OUTER_HTML_EXPRESSION, SERIALIZE_ROOT_EXPRESSION};
use dom::{Document, WireError, snapshot};
use thiserror::Error;

use crate::RootHandle;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unsupported expression {0:?}")]
    Unsupported(String),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Evaluates one of the known expressions and returns its JSON text.
pub fn evaluate(doc: &Document, expression: &str) -> Result<String, EvalError> {
    match expression.trim() {
        SERIALIZE_ROOT_EXPRESSION => Ok(serde_json::to_string(&snapshot(doc, doc.root())?)?),
        OUTER_HTML_EXPRESSION => {
            let markup = doc
                .document_element()
                .map(|element| doc.outer_html(element))
                .unwrap_or_default();
            Ok(serde_json::to_string(&markup)?)
        }
        other => Err(EvalError::Unsupported(other.to_string())),
    }
}

pub fn serve_eval(root: &RootHandle, request: EvalRequest) {
    let result = evaluate(&root.read(), &request.expression);
    if let Err(err) = &result {
        log::debug!(target: "mirror.resync", "evaluation of {:?} failed: {err}", request.expression);
    }
    request.respond(result.map_err(|err| err.to_string()));
}

/// Serves evaluation requests until every requester is gone.
pub fn spawn_eval_server(root: RootHandle, requests: Receiver<EvalRequest>) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(request) = requests.recv() {
            serve_eval(&root, request);
        }
        log::debug!(target: "mirror.resync", "evaluation server stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::{BridgeError, ChannelBridge, DebuggerBridge};
    use std::time::Duration;

    #[test]
    fn serialize_root_yields_the_document_element() {
        let doc = Document::parse("<!DOCTYPE html><html><body><p>x</p></body></html>");
        let json = evaluate(&doc, SERIALIZE_ROOT_EXPRESSION).unwrap();
        assert_eq!(json, r#"["html",{},[["body",{},[["p",{},[["Text","x"]]]]]]]"#);
        assert_eq!(
            evaluate(&doc, OUTER_HTML_EXPRESSION).unwrap(),
            r#""<html><body><p>x</p></body></html>""#
        );
    }

    #[test]
    fn bridge_round_trip_through_the_server() {
        let root = RootHandle::new(Document::parse("<html><body></body></html>"));
        let (bridge, requests) = ChannelBridge::new();
        let server = spawn_eval_server(root, requests);
        let timeout = Duration::from_secs(5);
        assert!(bridge.evaluate(SERIALIZE_ROOT_EXPRESSION, timeout).is_ok());
        assert!(matches!(
            bridge.evaluate("window.close()", timeout),
            Err(BridgeError::Evaluation(_))
        ));
        drop(bridge);
        server.join().unwrap();
    }
}

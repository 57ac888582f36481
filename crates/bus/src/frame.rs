//! JSON-lines framing for carrying the event stream across a process boundary:
//! one JSON value per line, blank lines ignored.
use std::io::{BufRead, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{EventSink, PrimaryEvent, SinkClosed};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("encoding frame: {0}")]
    Encode(#[source] serde_json::Error),
}

pub fn write_frame<W: Write, T: Serialize>(out: &mut W, frame: &T) -> Result<(), FrameError> {
    serde_json::to_writer(&mut *out, frame).map_err(FrameError::Encode)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

pub struct FrameReader<R> {
    inner: R,
    buf: String,
    line: usize,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: String::new(),
            line: 0,
        }
    }

    /// `Ok(None)` at end of input. A decode error consumes its line, so the caller
    /// may keep reading.
    pub fn next_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>, FrameError> {
        loop {
            self.buf.clear();
            if self.inner.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return dom::json::from_str(text)
                .map(Some)
                .map_err(|source| FrameError::Decode {
                    line: self.line,
                    source,
                });
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

/// Writes primary events as frames. A write failure closes the sink for good.
pub struct FrameSink<W> {
    out: Option<W>,
}

impl<W: Write> FrameSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Some(out) }
    }

    pub fn into_inner(self) -> Option<W> {
        self.out
    }
}

impl<W: Write + Send> EventSink for FrameSink<W> {
    fn send(&mut self, event: PrimaryEvent) -> Result<(), SinkClosed> {
        let out = self.out.as_mut().ok_or(SinkClosed)?;
        if let Err(err) = write_frame(out, &event) {
            log::debug!(target: "mirror.bus", "frame sink closed: {err}");
            self.out = None;
            return Err(SinkClosed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_round_trip_line_by_line() {
        let mut sink = FrameSink::new(Vec::new());
        sink.send(PrimaryEvent::Checkpoint).unwrap();
        sink.send(PrimaryEvent::RootReplaced).unwrap();
        let bytes = sink.into_inner().unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            "{\"type\":\"checkpoint\"}\n{\"type\":\"rootReplaced\"}\n"
        );
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(
            reader.next_frame::<PrimaryEvent>().unwrap(),
            Some(PrimaryEvent::Checkpoint)
        );
        assert_eq!(
            reader.next_frame::<PrimaryEvent>().unwrap(),
            Some(PrimaryEvent::RootReplaced)
        );
        assert_eq!(reader.next_frame::<PrimaryEvent>().unwrap(), None);
    }

    #[test]
    fn deep_snapshots_fit_in_one_frame() {
        use core_types::PatchSeq;
        use dom::{NodeMember, NodePath, Patch, PatchArg, WireNode};

        let mut node = WireNode::text("leaf");
        for _ in 0..150 {
            node = WireNode::Element {
                tag: "section".into(),
                attributes: vec![("class".into(), "level".into())],
                children: vec![node],
                shadow: None,
            };
        }
        let event = PrimaryEvent::Patch {
            seq: PatchSeq::FIRST,
            patch: Patch {
                target_path: NodePath(vec![0, 1]),
                prop: NodeMember::AppendChild.into(),
                args: vec![PatchArg::Node(node)],
            },
        };
        let mut sink = FrameSink::new(Vec::new());
        sink.send(event.clone()).unwrap();
        let mut reader = FrameReader::new(Cursor::new(sink.into_inner().unwrap()));
        assert_eq!(reader.next_frame::<PrimaryEvent>().unwrap(), Some(event));
    }

    #[test]
    fn decode_errors_carry_the_line_and_do_not_stop_reading() {
        let input = "{\"type\":\"checkpoint\"}\n\nnot json\n{\"type\":\"checkpoint\"}\n";
        let mut reader = FrameReader::new(Cursor::new(input));
        assert!(reader.next_frame::<PrimaryEvent>().unwrap().is_some());
        match reader.next_frame::<PrimaryEvent>() {
            Err(FrameError::Decode { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected decode error, got {other:?}"),
        }
        assert!(reader.next_frame::<PrimaryEvent>().unwrap().is_some());
    }
}

//! Incremental INDI element framing and emission.
//!
//! INDI has no document root: it is a stream of sibling top-level elements
//! (`<defNumberVector>`, `<newSwitchVector>`, `<message/>`, ...). A
//! connection is long-lived, so the codec must hand back each element as
//! soon as its closing tag is seen rather than waiting for the stream to
//! end, the way [`quick_xml::Reader`]'s token-at-a-time API is used to walk
//! `Event::Start`/`Event::End`/`Event::Empty` pairs for a single element
//! without buffering the whole connection.

use crate::error::{Error, Result};
use crate::message::MessageType;
use bytes::BytesMut;
use quick_xml::events::Event;
use quick_xml::Reader;
use tokio::io::{AsyncBufRead, AsyncReadExt};

/// One complete top-level INDI element, as raw XML text (including any
/// base64 BLOB body), ready for [`quick_xml::de::from_str`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawElement(pub String);

/// Incrementally frames top-level INDI elements off an async byte stream.
///
/// `ElementFramer` never requires the whole document to be buffered: it
/// accumulates bytes only until the current top-level element balances
/// (depth returns to zero), yields it, and discards those bytes before
/// reading more.
pub struct ElementFramer<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncBufRead + Unpin> ElementFramer<R> {
    /// Wrap a reader. `capacity` is just an allocation hint.
    pub fn new(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Read and return the next top-level element, or `None` at EOF.
    ///
    /// Malformed or unrecognised leading bytes are skipped up to the next
    /// plausible `<` and a warning is logged; the connection is never torn
    /// down for this alone.
    pub async fn next_element(&mut self) -> Result<Option<RawElement>> {
        loop {
            if let Some(span) = find_balanced_element(&self.buf) {
                let raw = String::from_utf8_lossy(&self.buf[span.clone()]).into_owned();
                let consumed = span.end;
                let _ = self.buf.split_to(consumed);
                return Ok(Some(RawElement(raw)));
            }

            self.resync_to_candidate();

            let mut chunk = [0u8; 4096];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                if self.buf.iter().all(|b| b.is_ascii_whitespace()) {
                    return Ok(None);
                }
                return Err(Error::Protocol("stream closed mid-element".to_string()));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Drop any bytes before the first `<` that could plausibly begin an
    /// element.
    fn resync_to_candidate(&mut self) {
        if let Some(pos) = self.buf.iter().position(|&b| b == b'<') {
            if pos > 0 {
                tracing::warn!(skipped = pos, "discarding unparsable bytes before next element");
                let _ = self.buf.split_to(pos);
            }
        } else if !self.buf.is_empty() && self.buf.len() > 1 << 20 {
            tracing::warn!("discarding oversized junk prefix with no element start");
            self.buf.clear();
        }
    }
}

/// Scan `data` for one fully-closed top-level element starting at its first
/// `<`. Returns the byte range of that element (start tag through matching
/// end tag, or a self-closing tag) if complete, else `None`.
fn find_balanced_element(data: &[u8]) -> Option<std::ops::Range<usize>> {
    let start = data.iter().position(|&b| b == b'<')?;
    let mut reader = Reader::from_reader(&data[start..]);
    reader.config_mut().trim_text(true);
    let mut depth: i32 = 0;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::Empty(_)) if depth == 0 => {
                let end = reader.buffer_position() as usize;
                return Some(start..start + end);
            }
            Ok(Event::Empty(_)) => {}
            Ok(Event::End(_)) => {
                depth -= 1;
                if depth == 0 {
                    let end = reader.buffer_position() as usize;
                    return Some(start..start + end);
                }
            }
            Ok(Event::Eof) => return None,
            Ok(_) => {}
            Err(_) => {
                // Either truly malformed, or just not enough bytes yet for
                // quick_xml to finish this token. Wait for more; a prefix
                // that is genuinely bad gets skipped by the caller's resync
                // once no progress is made at all.
                return None;
            }
        }
        buf.clear();
    }
}

impl RawElement {
    /// Parse this element's text into a typed [`MessageType`].
    pub fn parse(&self) -> Result<MessageType> {
        self.0.parse()
    }
}

/// Serialize a message to XML text for writing to a connection. Never
/// wraps the result in a synthetic root element — each message stands
/// alone on the wire, exactly as INDI expects.
pub fn emit(message: &MessageType) -> Result<String> {
    message.to_xml()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn frames_one_self_closing_element() {
        let data = b"<getProperties version=\"1.7\"/>".to_vec();
        let mut framer = ElementFramer::new(BufReader::new(Cursor::new(data)), 256);
        let el = framer.next_element().await.unwrap().unwrap();
        assert!(el.0.contains("getProperties"));
        assert!(framer.next_element().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn frames_two_sibling_elements_with_no_root() {
        let data = br#"<getProperties version="1.7"/><message message="hi"/>"#.to_vec();
        let mut framer = ElementFramer::new(BufReader::new(Cursor::new(data)), 256);
        let first = framer.next_element().await.unwrap().unwrap();
        assert!(first.0.contains("getProperties"));
        let second = framer.next_element().await.unwrap().unwrap();
        assert!(second.0.contains("message"));
    }

    #[tokio::test]
    async fn frames_nested_def_vector() {
        let data = br#"<defSwitchVector device="D" name="N" state="Idle" perm="rw" rule="OneOfMany"><defSwitch name="S1">On</defSwitch></defSwitchVector>"#.to_vec();
        let mut framer = ElementFramer::new(BufReader::new(Cursor::new(data)), 256);
        let el = framer.next_element().await.unwrap().unwrap();
        assert!(el.0.contains("defSwitchVector"));
        assert!(el.0.contains("defSwitch"));
    }

    #[tokio::test]
    async fn resyncs_past_garbage_prefix() {
        let data = b"garbage<getProperties version=\"1.7\"/>".to_vec();
        let mut framer = ElementFramer::new(BufReader::new(Cursor::new(data)), 256);
        let el = framer.next_element().await.unwrap().unwrap();
        assert!(el.0.contains("getProperties"));
    }
}

//! Incremental decoder for the chat relay's `data: {json}` event stream.
//!
//! Bytes arrive in arbitrarily sized chunks. The decoder keeps the partial
//! UTF-8 sequence and the partial line between calls, so a frame or a
//! character split across reads is reassembled before it is interpreted.

use serde_json::Value;
use tracing::debug;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";
const DELTA_POINTER: &str = "/choices/0/delta/content";

/// Streaming UTF-8 decoder holding at most one incomplete code point.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8], out: &mut String) {
        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Truncated sequence: wait for the next chunk.
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
    }

    fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            out.push(char::REPLACEMENT_CHARACTER);
            self.pending.clear();
        }
    }
}

enum Frame<'a> {
    Ignored,
    Done,
    Payload(&'a str),
}

fn classify(line: &str) -> Frame<'_> {
    if line.starts_with(':') || line.trim().is_empty() {
        return Frame::Ignored;
    }
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };
    let payload = rest.trim();
    if payload == DONE_SENTINEL {
        Frame::Done
    } else {
        Frame::Payload(payload)
    }
}

fn delta_text(value: &Value) -> Option<String> {
    value
        .pointer(DELTA_POINTER)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

/// Turns raw body chunks into text deltas.
///
/// `push` never fails: a frame whose JSON does not parse is put back at the
/// front of the buffer together with its newline and line extraction stops
/// until more bytes arrive. Once `[DONE]` is seen the decoder is finished and
/// ignores everything after it.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    utf8: Utf8Decoder,
    buffer: String,
    finished: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once the sentinel was seen or [`FrameDecoder::finish`] ran.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feeds one chunk and returns the deltas completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.finished {
            return deltas;
        }
        self.utf8.decode(chunk, &mut self.buffer);
        self.drain_complete_lines(&mut deltas);
        deltas
    }

    /// Flushes whatever is still buffered after end-of-stream.
    ///
    /// Same classification as [`FrameDecoder::push`], but a frame that does
    /// not parse is dropped since no more bytes will complete it.
    pub fn finish(&mut self) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.finished {
            return deltas;
        }
        self.finished = true;
        self.utf8.finish(&mut self.buffer);

        let residual = std::mem::take(&mut self.buffer);
        for raw in residual.split('\n') {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            match classify(line) {
                Frame::Ignored => {}
                Frame::Done => break,
                Frame::Payload(payload) => match serde_json::from_str::<Value>(payload) {
                    Ok(value) => deltas.extend(delta_text(&value)),
                    Err(err) => debug!("dropping malformed trailing frame: {err}"),
                },
            }
        }
        deltas
    }

    fn drain_complete_lines(&mut self, deltas: &mut Vec<String>) {
        while let Some(newline) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=newline).collect();
            let line = raw.trim_end_matches('\n');
            let line = line.strip_suffix('\r').unwrap_or(line);

            match classify(line) {
                Frame::Ignored => {}
                Frame::Done => {
                    self.finished = true;
                    self.buffer.clear();
                    return;
                }
                Frame::Payload(payload) => match serde_json::from_str::<Value>(payload) {
                    Ok(value) => deltas.extend(delta_text(&value)),
                    Err(_) => {
                        self.buffer.insert_str(0, &raw);
                        return;
                    }
                },
            }
        }
    }
}

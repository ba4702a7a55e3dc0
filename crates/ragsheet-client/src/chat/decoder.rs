//! Byte stream → frame stream

use std::pin::Pin;

use futures::{Stream, StreamExt};

use super::backend::ByteStream;
use super::frame::{FrameEvent, parse_line};
use crate::error::Result;

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<FrameEvent>> + Send>>;

/// Carries partial lines over between network reads.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    pending: Vec<u8>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every line it completed.
    ///
    /// Splitting happens on raw bytes, so a multi-byte character cut by a
    /// read boundary is only decoded once its line is complete.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..pos]));
        }
        lines
    }

    /// Flush the trailing fragment left when the transport closes.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Lazily decode frames from a response body.
///
/// The stream ends right after [`FrameEvent::Done`]. A read error is yielded
/// once and ends the stream. Plain EOF ends it without any terminal event.
pub fn decode_frames(mut bytes: ByteStream) -> FrameStream {
    Box::pin(async_stream::stream! {
        let mut lines = LineAccumulator::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for line in lines.push(&chunk) {
                let Some(event) = parse_line(&line) else {
                    continue;
                };
                let done = event == FrameEvent::Done;
                yield Ok(event);
                if done {
                    return;
                }
            }
        }

        // Last line may lack its newline when the server closes abruptly.
        if let Some(event) = lines.finish().as_deref().and_then(parse_line) {
            yield Ok(event);
        }
    })
}

use anyhow::Result;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;

use super::buffering::LineBuffer;
use crate::streaming::StreamEvent;
use crate::traits::EventStream;

/// Strategy for turning SSE `data:` payloads into stream events
pub trait SseLineParser: Send {
    /// Parse one data payload into zero or more events
    fn parse_data_line(&mut self, data: &str) -> Result<Vec<StreamEvent>>;

    /// True once the payload just parsed closed the stream
    fn is_finished(&self) -> bool;
}

/// Drive a byte stream through a parser
///
/// Non-`data:` lines (`event:`, comments, blank separators) are skipped; the
/// payload carries its own type tag. The stream stops after the parser
/// reports completion.
pub fn parse_sse_stream<S, E, P>(bytes: S, mut parser: P) -> EventStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
    P: SseLineParser + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = LineBuffer::with_capacity(4096);

        'outer: while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(chunk) => {
                    buffer.extend(&chunk);

                    while let Some(line_result) = buffer.next_line() {
                        let line = match line_result {
                            Ok(line) => line,
                            Err(e) => {
                                yield Err(e);
                                continue;
                            }
                        };

                        let Some(data) = line.strip_prefix("data:") else {
                            continue;
                        };

                        match parser.parse_data_line(data.trim_start()) {
                            Ok(events) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            Err(e) => yield Err(e),
                        }

                        if parser.is_finished() {
                            break 'outer;
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    break;
                }
            }
        }

        if !parser.is_finished() {
            if let Some(Ok(line)) = buffer.take_remaining() {
                if let Some(data) = line.strip_prefix("data:") {
                    match parser.parse_data_line(data.trim_start()) {
                        Ok(events) => {
                            for event in events {
                                yield Ok(event);
                            }
                        }
                        Err(e) => yield Err(e),
                    }
                }
            }
        }
    })
}

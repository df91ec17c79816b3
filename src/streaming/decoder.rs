//! Completion stream decoder
//!
//! Turns the raw body of a streamed chat completion into [`StreamFrame`]s.
//!
//! The body is a sequence of lines, each relevant one being `data: <json>`.
//! Bytes are buffered until a newline arrives, so a JSON object (or a UTF-8
//! sequence) split across transport chunks is only parsed once complete.
//! A line that fails to parse is logged and skipped; it never ends the stream.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;

use super::frame::{CompletionChunk, StreamFrame, ToolCallDelta};
use crate::error::{ChatError, Result};

/// Prefix of every payload line.
pub const DATA_PREFIX: &str = "data:";
/// Payload that marks the end of the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Synchronous line decoder: bytes in, frames out.
///
/// Holds the trailing partial line between chunks and the cumulative content
/// of the round.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    content: String,
    malformed_lines: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return the frames of every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line[..line.len() - 1], &mut frames);
        }
        frames
    }

    /// Flush whatever is left in the buffer once the transport is exhausted.
    ///
    /// A final line without a trailing newline is still decoded.
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        let mut frames = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut frames);
        }
        frames
    }

    /// Cumulative text content decoded so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of lines skipped because their payload was not valid JSON.
    pub fn malformed_lines(&self) -> usize {
        self.malformed_lines
    }

    fn decode_line(&mut self, raw: &[u8], out: &mut Vec<StreamFrame>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            return;
        }

        let payload = match line.strip_prefix(DATA_PREFIX) {
            Some(rest) => rest.trim_start(),
            None => line,
        };
        if payload.is_empty() || payload == DONE_SENTINEL {
            return;
        }

        let chunk: CompletionChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.malformed_lines += 1;
                tracing::warn!(error = %e, line = %payload, "skipping malformed stream line");
                return;
            }
        };

        let Some(delta) = chunk.choices.into_iter().next().and_then(|c| c.delta) else {
            tracing::debug!("stream line without choices[0].delta");
            return;
        };

        if let Some(text) = delta.content.filter(|s| !s.is_empty()) {
            self.content.push_str(&text);
            out.push(StreamFrame::Content {
                content: self.content.clone(),
            });
        }

        for (position, call) in delta.tool_calls.unwrap_or_default().into_iter().enumerate() {
            let (name, arguments) = match call.function {
                Some(f) => (f.name, f.arguments),
                None => (None, None),
            };
            out.push(StreamFrame::ToolCallDelta(ToolCallDelta {
                index: call.index.unwrap_or(position),
                id: call.id.filter(|s| !s.is_empty()),
                name: name.filter(|s| !s.is_empty()),
                arguments: arguments.filter(|s| !s.is_empty()),
            }));
        }
    }
}

/// Pull-based decoder over a transport byte stream.
///
/// Yields frames lazily, suspending only while waiting for the next chunk.
/// After [`StreamFrame::Done`] has been returned every further call yields
/// `None`; the decoder cannot be restarted.
pub struct StreamDecoder<S> {
    source: S,
    lines: LineDecoder,
    pending: VecDeque<StreamFrame>,
    finished: bool,
}

impl<S> StreamDecoder<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            lines: LineDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Next frame, `Ok(None)` once the stream has been fully drained.
    ///
    /// A transport error while reading is returned as-is and ends the stream.
    pub async fn next_frame(&mut self) -> Result<Option<StreamFrame>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }
            if self.finished {
                return Ok(None);
            }
            match self.source.next().await {
                Some(Ok(chunk)) => self.pending.extend(self.lines.feed(&chunk)),
                Some(Err(e)) => {
                    self.finished = true;
                    self.pending.clear();
                    return Err(match e {
                        ChatError::StreamError(_) => e,
                        other => ChatError::StreamError(other.to_string()),
                    });
                }
                None => {
                    self.finished = true;
                    self.pending.extend(self.lines.finish());
                    self.pending.push_back(StreamFrame::Done);
                }
            }
        }
    }

    /// Cumulative text content decoded so far.
    pub fn content(&self) -> &str {
        self.lines.content()
    }

    /// Adapt the decoder into a `Stream` of frames.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<StreamFrame>>
    where
        S: 'static,
    {
        async_stream::stream! {
            loop {
                match self.next_frame().await {
                    Ok(Some(frame)) => yield Ok(frame),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_line(json: &str) -> String {
        format!("data: {json}\n\n")
    }

    fn byte_stream(parts: Vec<&'static str>) -> impl Stream<Item = Result<Bytes>> + Unpin {
        futures::stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))))
    }

    #[test]
    fn content_frames_are_cumulative() {
        let mut d = LineDecoder::new();
        let mut frames = d.feed(
            chunk_line(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#).as_bytes(),
        );
        frames.extend(d.feed(chunk_line(r#"{"choices":[{"delta":{"content":"lo"}}]}"#).as_bytes()));
        assert_eq!(
            frames,
            vec![
                StreamFrame::Content { content: "Hel".into() },
                StreamFrame::Content { content: "Hello".into() },
            ]
        );
    }

    #[test]
    fn partial_lines_are_kept_until_newline() {
        let mut d = LineDecoder::new();
        assert!(d.feed(br#"data: {"choices":[{"delta":{"con"#).is_empty());
        let frames = d.feed(b"tent\":\"hi\"}}]}\n");
        assert_eq!(frames, vec![StreamFrame::Content { content: "hi".into() }]);
    }

    #[test]
    fn utf8_split_across_chunks_is_preserved() {
        let line = chunk_line(r#"{"choices":[{"delta":{"content":"héllo"}}]}"#);
        let bytes = line.as_bytes();
        let split = line.find('é').unwrap() + 1; // inside the two-byte sequence
        let mut d = LineDecoder::new();
        let mut frames = d.feed(&bytes[..split]);
        frames.extend(d.feed(&bytes[split..]));
        assert_eq!(frames, vec![StreamFrame::Content { content: "héllo".into() }]);
    }

    #[test]
    fn malformed_line_is_skipped() {
        let mut d = LineDecoder::new();
        let mut input = String::from("data: {not json}\n");
        input.push_str(&chunk_line(r#"{"choices":[{"delta":{"content":"ok"}}]}"#));
        let frames = d.feed(input.as_bytes());
        assert_eq!(frames, vec![StreamFrame::Content { content: "ok".into() }]);
        assert_eq!(d.malformed_lines(), 1);
    }

    #[tracing_test::traced_test]
    #[test]
    fn malformed_line_is_logged() {
        let mut d = LineDecoder::new();
        assert!(d.feed(b"data: {\"choices\":[\n").is_empty());
        assert!(logs_contain("skipping malformed stream line"));
    }

    #[test]
    fn sentinel_comments_and_blank_lines_are_ignored() {
        let mut d = LineDecoder::new();
        let frames = d.feed(b": keep-alive\n\n\r\ndata: [DONE]\n");
        assert!(frames.is_empty());
        assert_eq!(d.malformed_lines(), 0);
    }

    #[test]
    fn tool_call_entries_become_individual_deltas() {
        let mut d = LineDecoder::new();
        let frames = d.feed(
            chunk_line(
                r#"{"choices":[{"delta":{"tool_calls":[
                    {"index":0,"id":"c1","function":{"name":"X","arguments":""}},
                    {"index":1,"id":"","function":{"arguments":"{\"a\""}}
                ]}}]}"#
                    .replace('\n', "")
                    .as_str(),
            )
            .as_bytes(),
        );
        assert_eq!(
            frames,
            vec![
                StreamFrame::ToolCallDelta(ToolCallDelta::new(0).with_id("c1").with_name("X")),
                StreamFrame::ToolCallDelta(ToolCallDelta::new(1).with_arguments("{\"a\"")),
            ]
        );
    }

    #[test]
    fn missing_index_falls_back_to_array_position() {
        let mut d = LineDecoder::new();
        let frames = d.feed(
            chunk_line(r#"{"choices":[{"delta":{"tool_calls":[{"id":"a"},{"id":"b"}]}}]}"#)
                .as_bytes(),
        );
        assert_eq!(
            frames,
            vec![
                StreamFrame::ToolCallDelta(ToolCallDelta::new(0).with_id("a")),
                StreamFrame::ToolCallDelta(ToolCallDelta::new(1).with_id("b")),
            ]
        );
    }

    #[test]
    fn final_line_without_newline_is_flushed() {
        let mut d = LineDecoder::new();
        assert!(d.feed(br#"data: {"choices":[{"delta":{"content":"tail"}}]}"#).is_empty());
        assert_eq!(d.finish(), vec![StreamFrame::Content { content: "tail".into() }]);
    }

    #[tokio::test]
    async fn decoder_ends_with_done_and_stays_finished() {
        let mut decoder = StreamDecoder::new(byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
            "data: [DONE]\n",
        ]));
        let mut frames = Vec::new();
        while let Some(frame) = decoder.next_frame().await.unwrap() {
            frames.push(frame);
        }
        assert_eq!(
            frames,
            vec![
                StreamFrame::Content { content: "a".into() },
                StreamFrame::Content { content: "ab".into() },
                StreamFrame::Done,
            ]
        );
        assert_eq!(decoder.content(), "ab");
        assert!(decoder.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transport_error_surfaces_as_stream_error() {
        let parts: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n")),
            Err(ChatError::HttpError("connection reset".into())),
        ];
        let mut decoder = StreamDecoder::new(futures::stream::iter(parts));
        assert!(matches!(
            decoder.next_frame().await,
            Ok(Some(StreamFrame::Content { .. }))
        ));
        let err = decoder.next_frame().await.unwrap_err();
        assert!(matches!(err, ChatError::StreamError(msg) if msg.contains("connection reset")));
        assert!(decoder.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn into_stream_yields_the_same_frames() {
        let decoder = StreamDecoder::new(byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
        ]));
        let frames: Vec<_> = decoder.into_stream().collect().await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[1], Ok(StreamFrame::Done)));
    }

    #[test]
    fn decoder_waits_only_on_the_transport() {
        let first: Vec<Result<Bytes>> = vec![Ok(Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
        ))];
        let source = futures::stream::iter(first).chain(futures::stream::pending());
        let mut decoder = StreamDecoder::new(source);
        {
            let mut next = tokio_test::task::spawn(decoder.next_frame());
            let frame = tokio_test::assert_ready!(next.poll());
            assert!(matches!(frame, Ok(Some(StreamFrame::Content { .. }))));
        }
        let mut next = tokio_test::task::spawn(decoder.next_frame());
        tokio_test::assert_pending!(next.poll());
    }
}

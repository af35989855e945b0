//! Event-stream decoding for streamed chat responses.
//!
//! This module turns the raw byte stream of a streaming response into an
//! ordered sequence of [`Frame`]s, then drives a [`Renderer`] with the
//! growing accumulation. The wire format is blank-line-delimited blocks;
//! only blocks prefixed with `data:` carry payload, and the payload is a
//! JSON object with a `text` field (a string, or an array of strings that
//! concatenates to one). A block whose text trims to `[DONE]` marks
//! successful completion.
//!
//! Decoding is lossy-tolerant: blocks without the prefix, blocks that fail
//! to parse, and blocks without a usable `text` field are skipped so that a
//! live display never stalls on protocol garbage.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::observability::{STREAM_BYTES, STREAM_FRAMES, STREAM_SKIPPED};
use crate::render::Renderer;

/// Sentinel text marking the end of a streamed response.
const DONE_SENTINEL: &str = "[DONE]";

/// Prefix identifying payload-carrying blocks.
const DATA_PREFIX: &str = "data:";

/// One decoded unit of the event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A text delta to append to the accumulated response.
    Delta(String),
    /// The completion sentinel; no further frames follow.
    Done,
}

/// The payload of a `data:` block.
#[derive(serde::Deserialize)]
struct FramePayload {
    text: Text,
}

/// The `text` field arrives as either one string or an ordered sequence of
/// strings that concatenates to one.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Text {
    One(String),
    Many(Vec<String>),
}

impl Text {
    fn join(self) -> String {
        match self {
            Text::One(text) => text,
            Text::Many(parts) => parts.concat(),
        }
    }
}

/// Process a stream of bytes into a stream of decoded frames.
///
/// Chunks may split blocks at arbitrary byte boundaries; a carry buffer
/// reassembles them. Skipped blocks produce no item at all, so consumers
/// see only deltas, the completion sentinel, and transport errors.
pub fn process_frames<S>(byte_stream: S) -> impl Stream<Item = Result<Frame>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert reqwest errors to our error type.
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    // Byte-level carry buffer so multibyte characters and blocks split
    // across network reads reassemble correctly.
    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, false),
        move |(mut stream, mut buffer, mut done)| async move {
            if done {
                // No blocks are processed after the sentinel, even if more
                // bytes arrive.
                return None;
            }
            loop {
                // Drain any complete blocks already buffered.
                while let Some(block) = split_block(&mut buffer) {
                    match decode_block(&block) {
                        Some(frame) => {
                            STREAM_FRAMES.click();
                            if matches!(frame, Frame::Done) {
                                done = true;
                            }
                            return Some((Ok(frame), (stream, buffer, done)));
                        }
                        None => {
                            STREAM_SKIPPED.click();
                        }
                    }
                }

                // Read more data.
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, done)));
                    }
                    None => {
                        // End of stream: a trailing block without its
                        // delimiter still decodes; otherwise stop cleanly.
                        if !buffer.is_empty() {
                            let block = std::mem::take(&mut buffer);
                            if let Some(frame) = decode_block(&block) {
                                STREAM_FRAMES.click();
                                done = true;
                                return Some((Ok(frame), (stream, buffer, done)));
                            }
                            STREAM_SKIPPED.click();
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Splits one complete block off the front of the buffer, leaving the
/// remainder for the next read.
fn split_block(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let delim = buffer.windows(2).position(|w| w == b"\n\n")?;
    let rest = buffer.split_off(delim + 2);
    let mut block = std::mem::replace(buffer, rest);
    block.truncate(delim);
    Some(block)
}

/// Decodes one block, or returns `None` for any block that should be
/// skipped: no `data:` prefix, invalid UTF-8, malformed JSON, or a missing
/// or non-text `text` field.
fn decode_block(block: &[u8]) -> Option<Frame> {
    let text = std::str::from_utf8(block).ok()?;
    let payload = text.strip_prefix(DATA_PREFIX)?;
    let payload: FramePayload = serde_json::from_str(payload).ok()?;
    let text = payload.text.join();
    if text.trim() == DONE_SENTINEL {
        Some(Frame::Done)
    } else {
        Some(Frame::Delta(text))
    }
}

/// The outcome of decoding one streamed response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// The accumulated response text.
    pub text: String,
    /// Whether the stream terminated with the completion sentinel.
    pub complete: bool,
}

/// Drives a frame stream to completion, rendering the growing accumulation.
///
/// Every renderer update carries the full accumulation so far, so the sink
/// observes a monotonically growing prefix of the final response. The first
/// delta of a response has its leading whitespace stripped; servers pad the
/// first token. Consumption stops at the sentinel. A stream that ends
/// without one yields `complete: false` with whatever accumulated, which the
/// caller surfaces rather than treating as fatal. A transport error still
/// closes out the response before it propagates, so the renderer starts the
/// next response from a clean slate.
pub async fn decode<S>(frames: S, renderer: &mut dyn Renderer) -> Result<Decoded>
where
    S: Stream<Item = Result<Frame>>,
{
    let mut frames = std::pin::pin!(frames);
    let mut accumulated = String::new();
    let mut first_delta = true;

    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                // Close out the response so the renderer is ready for the
                // next one before the error propagates.
                renderer.finish_response();
                return Err(err);
            }
        };
        match frame {
            Frame::Delta(text) => {
                if first_delta {
                    accumulated.push_str(text.trim_start());
                    first_delta = false;
                } else {
                    accumulated.push_str(&text);
                }
                renderer.update(&accumulated);
            }
            Frame::Done => {
                renderer.update(&accumulated);
                renderer.finish_response();
                return Ok(Decoded {
                    text: accumulated,
                    complete: true,
                });
            }
        }
    }

    renderer.finish_response();
    Ok(Decoded {
        text: accumulated,
        complete: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    use crate::render::RecordingRenderer;

    fn byte_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
        ))
    }

    async fn collect_frames(chunks: Vec<&'static [u8]>) -> Vec<Frame> {
        let mut frames = Box::pin(process_frames(byte_stream(chunks)));
        let mut out = Vec::new();
        while let Some(frame) = frames.next().await {
            out.push(frame.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn single_chunk_stream() {
        let frames = collect_frames(vec![
            b"data: {\"text\":\"Hel\"}\n\ndata: {\"text\":\"lo\"}\n\ndata: {\"text\":\"[DONE]\"}\n\n",
        ])
        .await;
        assert_eq!(
            frames,
            vec![
                Frame::Delta("Hel".to_string()),
                Frame::Delta("lo".to_string()),
                Frame::Done,
            ]
        );
    }

    #[tokio::test]
    async fn chunk_boundary_invariance() {
        // The same bytes split mid-block decode identically.
        let whole = collect_frames(vec![b"data: {\"text\":\"Hello\"}\n\ndata: {\"text\":\"[DONE]\"}\n\n"])
            .await;
        let split = collect_frames(vec![
            b"data: {\"te",
            b"xt\":\"Hel",
            b"lo\"}\n",
            b"\ndata: {\"text\":\"[DONE]\"}\n\n",
        ])
        .await;
        assert_eq!(whole, split);
    }

    #[tokio::test]
    async fn multibyte_split_across_chunks() {
        // A UTF-8 sequence split at a chunk boundary must reassemble.
        let text = "data: {\"text\":\"héllo\"}\n\n".as_bytes();
        let (a, b) = text.split_at(17);
        let frames = collect_frames(vec![a, b]).await;
        assert_eq!(frames, vec![Frame::Delta("héllo".to_string())]);
    }

    #[tokio::test]
    async fn array_text_concatenates() {
        let frames = collect_frames(vec![b"data: {\"text\":[\"ab\",\"cd\"]}\n\n"]).await;
        assert_eq!(frames, vec![Frame::Delta("abcd".to_string())]);
    }

    #[tokio::test]
    async fn malformed_json_is_skipped() {
        let frames = collect_frames(vec![
            b"data: {\"text\":\"a\"}\n\ndata: {not json\n\ndata: {\"text\":\"b\"}\n\n",
        ])
        .await;
        assert_eq!(
            frames,
            vec![Frame::Delta("a".to_string()), Frame::Delta("b".to_string())]
        );
    }

    #[tokio::test]
    async fn non_data_block_is_skipped() {
        let frames = collect_frames(vec![
            b"garbage-not-json\n\ndata: {\"text\":\"ok\"}\n\n",
        ])
        .await;
        assert_eq!(frames, vec![Frame::Delta("ok".to_string())]);
    }

    #[tokio::test]
    async fn missing_text_field_is_skipped() {
        let frames = collect_frames(vec![
            b"data: {\"other\":1}\n\ndata: {\"text\":42}\n\ndata: {\"text\":\"ok\"}\n\n",
        ])
        .await;
        assert_eq!(frames, vec![Frame::Delta("ok".to_string())]);
    }

    #[tokio::test]
    async fn nothing_after_sentinel() {
        let frames = collect_frames(vec![
            b"data: {\"text\":\"[DONE]\"}\n\ndata: {\"text\":\"late\"}\n\n",
        ])
        .await;
        assert_eq!(frames, vec![Frame::Done]);
    }

    #[tokio::test]
    async fn padded_sentinel_recognized() {
        let frames = collect_frames(vec![b"data: {\"text\":\"  [DONE]\\n\"}\n\n"]).await;
        assert_eq!(frames, vec![Frame::Done]);
    }

    #[tokio::test]
    async fn trailing_block_without_delimiter() {
        let frames = collect_frames(vec![b"data: {\"text\":\"tail\"}"]).await;
        assert_eq!(frames, vec![Frame::Delta("tail".to_string())]);
    }

    #[tokio::test]
    async fn decode_accumulates_monotonically() {
        let frames = process_frames(byte_stream(vec![
            b"data: {\"text\":\"Hel\"}\n\ndata: {\"text\":\"lo\"}\n\ndata: {\"text\":\"[DONE]\"}\n\n",
        ]));
        let mut renderer = RecordingRenderer::new();
        let decoded = decode(frames, &mut renderer).await.unwrap();

        assert_eq!(decoded.text, "Hello");
        assert!(decoded.complete);
        assert_eq!(renderer.updates, vec!["Hel", "Hello", "Hello"]);
        // Every update is a prefix extension of the previous one.
        for pair in renderer.updates.windows(2) {
            assert!(pair[1].starts_with(pair[0].as_str()));
        }
    }

    #[tokio::test]
    async fn first_delta_strips_leading_whitespace() {
        let frames = process_frames(byte_stream(vec![b"data: {\"text\":\" Hi\"}\n\n"]));
        let mut renderer = RecordingRenderer::new();
        let decoded = decode(frames, &mut renderer).await.unwrap();

        assert_eq!(renderer.updates, vec!["Hi"]);
        assert_eq!(decoded.text, "Hi");
        assert!(!decoded.complete);
    }

    #[tokio::test]
    async fn only_first_delta_is_stripped() {
        let frames = process_frames(byte_stream(vec![
            b"data: {\"text\":\" a\"}\n\ndata: {\"text\":\" b\"}\n\ndata: {\"text\":\"[DONE]\"}\n\n",
        ]));
        let mut renderer = RecordingRenderer::new();
        let decoded = decode(frames, &mut renderer).await.unwrap();
        assert_eq!(decoded.text, "a b");
    }

    #[tokio::test]
    async fn missing_sentinel_ends_cleanly() {
        let frames = process_frames(byte_stream(vec![
            b"data: {\"text\":\"partial\"}\n\n",
        ]));
        let mut renderer = RecordingRenderer::new();
        let decoded = decode(frames, &mut renderer).await.unwrap();

        assert_eq!(decoded.text, "partial");
        assert!(!decoded.complete);
        assert_eq!(renderer.finished, 1);
    }

    #[tokio::test]
    async fn mid_stream_error_still_closes_out_the_response() {
        let frames = stream::iter(vec![
            Ok(Frame::Delta("half a resp".to_string())),
            Err(Error::streaming("connection reset", None)),
        ]);
        let mut renderer = RecordingRenderer::new();
        let result = decode(frames, &mut renderer).await;

        assert!(result.is_err());
        assert_eq!(renderer.updates, vec!["half a resp"]);
        // The renderer must be ready for the next response despite the error.
        assert_eq!(renderer.finished, 1);
    }

    #[tokio::test]
    async fn empty_stream_decodes_empty() {
        let frames = process_frames(byte_stream(vec![]));
        let mut renderer = RecordingRenderer::new();
        let decoded = decode(frames, &mut renderer).await.unwrap();
        assert_eq!(decoded.text, "");
        assert!(!decoded.complete);
        assert!(renderer.updates.is_empty());
    }
}

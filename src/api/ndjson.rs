//! Newline-delimited JSON decoding for offer response bodies.
//!
//! Response bodies arrive in chunks whose boundaries have nothing to do with
//! line boundaries. [`NdjsonDecoder`] buffers the partial tail of each chunk,
//! [`decode_line`] turns one complete line into a [`StreamRecord`], and
//! [`decode_records`] glues both onto any byte stream.

use crate::api::error::{ApiError, ApiResult};
use crate::api::types::RecordStream;
use crate::models::StreamRecord;
use futures_util::{stream, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::debug;

/// Splits a chunked byte stream into complete lines
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every line it completed.
    /// Blank lines are dropped and a trailing `\r` is stripped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            if let Some(line) = clean_line(&self.buffer[start..end]) {
                lines.push(line);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Flush the unterminated last line at end of body
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.buffer);
        clean_line(&rest)
    }

    /// Bytes held back waiting for a newline
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

fn clean_line(line: &[u8]) -> Option<Vec<u8>> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(line.to_vec())
    }
}

/// Decode one line. `Ok(None)` means valid JSON of an unknown shape.
pub fn decode_line(line: &[u8]) -> ApiResult<Option<StreamRecord>> {
    let value: Value = serde_json::from_slice(line)?;

    let Value::Object(mut fields) = value else {
        debug!("Skipping non-object record");
        return Ok(None);
    };

    if let Some(query) = fields.remove("query").filter(|v| !v.is_null()) {
        return Ok(Some(StreamRecord::Query(serde_json::from_value(query)?)));
    }
    if let Some(offer) = fields.remove("offer").filter(|v| !v.is_null()) {
        return Ok(Some(StreamRecord::Offer(serde_json::from_value(offer)?)));
    }

    debug!(keys = ?fields.keys().collect::<Vec<_>>(), "Skipping unrecognized record");
    Ok(None)
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: NdjsonDecoder,
    pending: VecDeque<Vec<u8>>,
    eof: bool,
    failed: bool,
}

/// Adapt a chunked body into a [`RecordStream`].
///
/// The first transport or decode error is yielded once and ends the stream;
/// no later line is looked at.
pub fn decode_records<S, B, E>(body: S) -> RecordStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<ApiError> + Send,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: NdjsonDecoder::new(),
        pending: VecDeque::new(),
        eof: false,
        failed: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if st.failed {
                return None;
            }

            if let Some(line) = st.pending.pop_front() {
                match decode_line(&line) {
                    Ok(Some(record)) => return Some((Ok(record), st)),
                    Ok(None) => continue,
                    Err(e) => {
                        st.failed = true;
                        return Some((Err(e), st));
                    }
                }
            }

            if st.eof {
                return None;
            }

            match st.body.next().await {
                Some(Ok(chunk)) => {
                    let lines = st.decoder.push(chunk.as_ref());
                    st.pending.extend(lines);
                }
                Some(Err(e)) => {
                    st.failed = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.eof = true;
                    if let Some(rest) = st.decoder.finish() {
                        st.pending.push_back(rest);
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = concat!(
        r#"{"query":{"offers":{},"address":{"street":"Main St","houseNumber":"1","city":"Berlin","zipCode":"10115"},"sessionID":"abc","timestamp":1000,"addressHash":"h1"}}"#,
        "\n",
        r#"{"offer":{"offerHash":"x1","provider":"ByteMe","speed":100,"monthlyCostInCent":2999}}"#,
        "\r\n",
        "\n",
        r#"{"offer":{"offerHash":"x2","provider":"WebWunder","speed":50,"monthlyCostInCent":1999}}"#,
    );

    fn chunked(body: &str, size: usize) -> Vec<Result<Vec<u8>, ApiError>> {
        body.as_bytes()
            .chunks(size)
            .map(|c| Ok(c.to_vec()))
            .collect()
    }

    async fn collect(chunks: Vec<Result<Vec<u8>, ApiError>>) -> Vec<ApiResult<StreamRecord>> {
        decode_records(stream::iter(chunks)).collect().await
    }

    fn kinds(records: &[ApiResult<StreamRecord>]) -> Vec<String> {
        records
            .iter()
            .map(|r| match r {
                Ok(StreamRecord::Query(q)) => format!("query:{}", q.address_hash),
                Ok(StreamRecord::Offer(o)) => format!("offer:{}", o.offer_hash),
                Err(_) => "error".to_string(),
            })
            .collect()
    }

    #[test]
    fn decoder_buffers_partial_lines() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(b"{\"a\":").is_empty());
        assert_eq!(decoder.buffered(), 5);

        let lines = decoder.push(b"1}\r\n{\"b\"");
        assert_eq!(lines, vec![b"{\"a\":1}".to_vec()]);

        assert!(decoder.push(b":2}").is_empty());
        assert_eq!(decoder.finish(), Some(b"{\"b\":2}".to_vec()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_skips_blank_lines() {
        let mut decoder = NdjsonDecoder::new();
        let lines = decoder.push(b"\n  \n\r\n{}\n");
        assert_eq!(lines, vec![b"{}".to_vec()]);
    }

    #[test]
    fn unknown_shapes_are_skipped() {
        assert!(decode_line(br#"{"heartbeat":true}"#).unwrap().is_none());
        assert!(decode_line(br#"[1,2,3]"#).unwrap().is_none());
        assert!(decode_line(br#"{"query":null}"#).unwrap().is_none());
    }

    #[test]
    fn malformed_lines_fail() {
        assert!(matches!(decode_line(b"{not json"), Err(ApiError::Decode(_))));
        assert!(matches!(
            decode_line(br#"{"offer":{"provider":"ByteMe"}}"#),
            Err(ApiError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn records_survive_any_chunk_size() {
        for size in [1, 2, 7, 64, BODY.len()] {
            let records = collect(chunked(BODY, size)).await;
            assert_eq!(
                kinds(&records),
                vec!["query:h1", "offer:x1", "offer:x2"],
                "chunk size {size}"
            );
        }
    }

    #[tokio::test]
    async fn decode_error_ends_the_stream() {
        let body = concat!(
            r#"{"offer":{"offerHash":"x1","provider":"ByteMe","speed":100,"monthlyCostInCent":2999}}"#,
            "\n{broken\n",
            r#"{"offer":{"offerHash":"x2","provider":"WebWunder","speed":50,"monthlyCostInCent":1999}}"#,
            "\n"
        );
        let records = collect(chunked(body, 16)).await;
        assert_eq!(kinds(&records), vec!["offer:x1", "error"]);
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let mut chunks = chunked(BODY, BODY.find('\n').unwrap() + 1);
        chunks.truncate(1);
        chunks.push(Err(ApiError::MissingShareId));
        chunks.push(Ok(b"{\"offer\":{}}\n".to_vec()));

        let records = collect(chunks).await;
        assert_eq!(kinds(&records), vec!["query:h1", "error"]);
    }

    #[tokio::test]
    async fn empty_body_yields_nothing() {
        assert!(collect(Vec::new()).await.is_empty());
    }
}

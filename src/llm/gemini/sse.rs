//! Server-Sent Events (SSE) parser for Gemini responses

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;

use crate::llm::core::error::LlmError;

use super::types::GenerateContentResponse;

/// Stream of raw response bytes
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Stream of decoded Gemini response chunks
pub type ResponseStream =
    Pin<Box<dyn Stream<Item = Result<GenerateContentResponse, LlmError>> + Send>>;

/// Parse a stream of bytes as Gemini SSE events
///
/// Only `data:` lines carry payloads; `event:`, `id:` and comment lines are skipped.
/// Lines may be split across network chunks, so bytes are buffered until a newline.
pub fn parse_sse_stream(byte_stream: ByteStream) -> ResponseStream {
    let mut buffer: Vec<u8> = Vec::new();

    let event_stream = byte_stream.flat_map(move |chunk_result| {
        let chunk = match chunk_result {
            Ok(bytes) => bytes,
            Err(e) => {
                return futures::stream::iter(vec![Err(LlmError::StreamError(e.to_string()))]);
            }
        };

        buffer.extend_from_slice(&chunk);

        let mut events = Vec::new();
        while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = buffer.drain(..=newline_pos).collect();
            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line.trim(),
                Err(e) => {
                    events.push(Err(LlmError::StreamError(format!(
                        "Invalid UTF-8 in stream: {}",
                        e
                    ))));
                    continue;
                }
            };

            if let Some(event) = parse_line(line) {
                events.push(event);
            }
        }

        futures::stream::iter(events)
    });

    Box::pin(event_stream)
}

fn parse_line(line: &str) -> Option<Result<GenerateContentResponse, LlmError>> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }

    Some(
        serde_json::from_str::<GenerateContentResponse>(data).map_err(|e| {
            LlmError::SerializationError(format!(
                "Failed to parse SSE data: {}. Data: {}",
                e, data
            ))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::gemini::types::Part;
    use futures::stream;

    fn bytes_of(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
        ))
    }

    #[tokio::test]
    async fn test_parse_simple_sse() {
        let data: &'static [u8] = b"data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hello\"}]}}]}\n\n";
        let mut sse_stream = parse_sse_stream(bytes_of(vec![data]));

        let response = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].content.role, "model");
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_parse_chunked_data() {
        let chunk1: &'static [u8] = b"data: {\"candidates\":[{\"content\":{\"role\":\"mo";
        let chunk2: &'static [u8] = b"del\",\"parts\":[{\"text\":\"Hello\"}]}}]}\r\n";

        let mut sse_stream = parse_sse_stream(bytes_of(vec![chunk1, chunk2]));

        let response = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(response.candidates[0].content.role, "model");
    }

    #[tokio::test]
    async fn test_parse_multibyte_split_across_chunks() {
        // "é" is 0xC3 0xA9; split it between chunks
        let chunk1: &'static [u8] =
            b"data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"caf\xC3";
        let chunk2: &'static [u8] = b"\xA9\"}]}}]}\n";

        let mut sse_stream = parse_sse_stream(bytes_of(vec![chunk1, chunk2]));

        let response = sse_stream.next().await.unwrap().unwrap();
        match &response.candidates[0].content.parts[0] {
            Part::Text { text } => assert_eq!(text, "café"),
            _ => panic!("Expected text part"),
        }
    }

    #[tokio::test]
    async fn test_ignores_non_data_lines() {
        let data: &'static [u8] = b": keep-alive\nevent: message\ndata: {\"candidates\":[]}\n";
        let mut sse_stream = parse_sse_stream(bytes_of(vec![data]));

        let response = sse_stream.next().await.unwrap().unwrap();
        assert!(response.candidates.is_empty());
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_parse_invalid_json() {
        let data: &'static [u8] = b"data: {invalid json}\n";
        let mut sse_stream = parse_sse_stream(bytes_of(vec![data]));

        let result = sse_stream.next().await.unwrap();
        assert!(matches!(result, Err(LlmError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_parse_function_call() {
        let data: &'static [u8] = b"data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"functionCall\":{\"name\":\"search_knowledge\",\"args\":{\"query\":\"refunds\"}}}]}}]}\n";
        let mut sse_stream = parse_sse_stream(bytes_of(vec![data]));

        let response = sse_stream.next().await.unwrap().unwrap();
        match &response.candidates[0].content.parts[0] {
            Part::FunctionCall { function_call } => {
                assert_eq!(function_call.name, "search_knowledge");
                assert_eq!(function_call.args["query"], "refunds");
            }
            _ => panic!("Expected function call part"),
        }
    }
}

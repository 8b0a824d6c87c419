//! Server-sent-event line decoding for streamed AI responses.

use futures_util::{future, Stream, StreamExt};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use super::GatewayError;

const MAX_LINE_LENGTH: usize = 1024 * 1024;
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded line of an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Payload of a `data:` line
    Data(String),
    /// The `[DONE]` terminator
    Done,
    /// Blank lines, comments, `event:`/`id:` fields
    Other,
}

pub fn parse_line(line: &str) -> SseLine {
    let Some(rest) = line.strip_prefix("data:") else {
        return SseLine::Other;
    };
    let payload = rest.strip_prefix(' ').unwrap_or(rest);
    if payload.trim() == DONE_SENTINEL {
        SseLine::Done
    } else {
        SseLine::Data(payload.to_string())
    }
}

/// Payloads of the `data:` lines in a response body, ending at `[DONE]` or EOF.
pub fn data_payloads(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String, GatewayError>> + Send {
    let bytes_stream = response
        .bytes_stream()
        .map(|r| r.map_err(std::io::Error::other));
    let lines = FramedRead::new(
        StreamReader::new(bytes_stream),
        LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
    );

    lines
        .map(|line| match line {
            Ok(line) => Ok(parse_line(&line)),
            Err(e) => Err(GatewayError::transport(format!("Stream read failed: {}", e))),
        })
        .take_while(|item| future::ready(!matches!(item, Ok(SseLine::Done))))
        .filter_map(|item| {
            future::ready(match item {
                Ok(SseLine::Data(data)) => Some(Ok(data)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        })
}

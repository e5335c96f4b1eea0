use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::domain::{AgentStatus, SystemSnapshot};
use crate::error::{AgentError, AppError, AppResult};

/// Upper bound for one newline-delimited message.
pub const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    // agent -> controller
    Hello(HelloMessage),
    Status(StatusMessage),
    Heartbeat,
    Snapshot(SnapshotMessage),
    // controller -> agent
    Stop,
    SnapshotRequest(SnapshotRequestMessage),
    Error(ErrorMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    pub name: String,
    /// Region the agent was configured for, possibly with an owner suffix.
    pub region: String,
    #[serde(default)]
    pub status: AgentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: AgentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub request_id: u64,
    pub snapshot: SystemSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRequestMessage {
    pub request_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// Reads one JSON line.
///
/// # Errors
///
/// Returns an error when the peer closed the connection, the line exceeds
/// [`MAX_MESSAGE_BYTES`], or it is not a valid message.
pub async fn read_message<R>(reader: &mut R) -> AppResult<WireMessage>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let limit = u64::try_from(MAX_MESSAGE_BYTES)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let bytes = (&mut *reader)
        .take(limit)
        .read_until(b'\n', &mut buffer)
        .await
        .map_err(|err| {
            AppError::agent(AgentError::Io {
                context: "read wire message",
                source: err,
            })
        })?;
    if bytes == 0 {
        return Err(AppError::agent(AgentError::ConnectionClosed));
    }
    if buffer.len() > MAX_MESSAGE_BYTES {
        return Err(AppError::agent(AgentError::WireMessageTooLarge {
            max_bytes: MAX_MESSAGE_BYTES,
        }));
    }
    if buffer.ends_with(b"\n") {
        buffer.pop();
        if buffer.ends_with(b"\r") {
            buffer.pop();
        }
    }
    let line = std::str::from_utf8(&buffer)
        .map_err(|err| AppError::agent(AgentError::WireMessageInvalidUtf8 { source: err }))?;
    serde_json::from_str::<WireMessage>(line)
        .map_err(|err| AppError::agent(AgentError::InvalidWireMessage { source: err }))
}

/// Writes one message followed by a newline.
///
/// # Errors
///
/// Returns an error when the write fails.
pub async fn send_message<W>(writer: &mut W, message: &WireMessage) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_string(message)?;
    payload.push('\n');
    writer.write_all(payload.as_bytes()).await.map_err(|err| {
        AppError::agent(AgentError::Io {
            context: "send wire message",
            source: err,
        })
    })
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Connection closed.")]
    ConnectionClosed,
    #[error("Wire message exceeded max size ({max_bytes} bytes).")]
    WireMessageTooLarge { max_bytes: usize },
    #[error("Wire message was not valid UTF-8: {source}")]
    WireMessageInvalidUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("Invalid wire message: {source}")]
    InvalidWireMessage {
        #[source]
        source: serde_json::Error,
    },
    #[error("Timed out waiting for agent hello.")]
    HelloTimeout,
    #[error("Expected hello from agent.")]
    ExpectedHello,
    #[error("Invalid hello from agent: {reason}")]
    InvalidHello { reason: String },
    #[error("Control channel for agent {agent} is closed.")]
    ChannelClosed { agent: String },
    #[error("Timed out waiting for system snapshot from agent {agent}.")]
    SnapshotTimeout { agent: String },
    #[error("Agent {agent} reported an error: {message}")]
    Remote { agent: String, message: String },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}

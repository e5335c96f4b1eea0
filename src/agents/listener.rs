use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::control::ConnectionControl;
use super::directory::LocalAgentDirectory;
use super::protocol::{ErrorMessage, HelloMessage, WireMessage, read_message, send_message};
use crate::domain::{AgentKey, AgentRegion, LiveAgent};
use crate::error::{AgentError, AppError, AppResult};
use crate::shutdown::ShutdownReceiver;

const AGENT_HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP endpoint agents connect to.
pub struct AgentListener {
    listener: TcpListener,
    directory: Arc<LocalAgentDirectory>,
    snapshot_timeout: Duration,
    hello_timeout: Duration,
}

impl AgentListener {
    /// # Errors
    ///
    /// Returns an error when the address cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        directory: Arc<LocalAgentDirectory>,
        snapshot_timeout: Duration,
    ) -> AppResult<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|err| {
            AppError::agent(AgentError::Bind {
                addr: addr.to_string(),
                source: err,
            })
        })?;
        Ok(Self {
            listener,
            directory,
            snapshot_timeout,
            hello_timeout: AGENT_HELLO_TIMEOUT,
        })
    }

    #[must_use]
    pub const fn with_hello_timeout(mut self, hello_timeout: Duration) -> Self {
        self.hello_timeout = hello_timeout;
        self
    }

    /// # Errors
    ///
    /// Returns an error when the socket has no local address.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        self.listener.local_addr().map_err(|err| {
            AppError::agent(AgentError::Io {
                context: "read listener address",
                source: err,
            })
        })
    }

    /// Accepts agents until shutdown. Each connection runs on its own task.
    pub async fn serve(self, mut shutdown_rx: ShutdownReceiver) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Listening for agents on {}", addr);
        }
        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                accepted = self.listener.accept() => accepted,
            };
            let (stream, peer) = match accepted {
                Ok(result) => result,
                Err(err) => {
                    warn!("Failed to accept agent: {}", err);
                    continue;
                }
            };
            let directory = self.directory.clone();
            let snapshot_timeout = self.snapshot_timeout;
            let hello_timeout = self.hello_timeout;
            tokio::spawn(async move {
                if let Err(err) =
                    serve_agent(stream, peer, directory, snapshot_timeout, hello_timeout).await
                {
                    warn!("Agent connection from {} ended: {}", peer, err);
                }
            });
        }
        debug!("Agent listener stopped");
    }
}

async fn serve_agent(
    stream: TcpStream,
    peer: SocketAddr,
    directory: Arc<LocalAgentDirectory>,
    snapshot_timeout: Duration,
    hello_timeout: Duration,
) -> AppResult<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let hello = match await_hello(&mut reader, hello_timeout).await {
        Ok(hello) => hello,
        Err(err) => {
            reject(&mut write_half, &err).await;
            return Err(err);
        }
    };

    let key = AgentKey::new(peer.ip().to_string(), hello.name);
    let live = LiveAgent {
        key: key.clone(),
        port: peer.port(),
        status: hello.status,
        region: AgentRegion::parse(&hello.region),
    };
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WireMessage>();
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if let Err(err) = send_message(&mut write_half, &message).await {
                debug!("Agent writer stopped: {}", err);
                break;
            }
        }
    });
    let control = Arc::new(ConnectionControl::new(&key, out_tx, snapshot_timeout));
    let connection = directory.attach(live, control.clone()).await;

    let result = read_loop(&mut reader, &key, connection, &directory, &control).await;

    directory.detach(&key, connection).await;
    control.close().await;
    writer.abort();
    result
}

async fn await_hello(
    reader: &mut BufReader<OwnedReadHalf>,
    hello_timeout: Duration,
) -> AppResult<HelloMessage> {
    let message = timeout(hello_timeout, read_message(reader))
        .await
        .map_err(|_err| AppError::agent(AgentError::HelloTimeout))??;
    let WireMessage::Hello(hello) = message else {
        return Err(AppError::agent(AgentError::ExpectedHello));
    };
    if hello.name.trim().is_empty() {
        return Err(AppError::agent(AgentError::InvalidHello {
            reason: "agent name is empty".to_owned(),
        }));
    }
    if AgentRegion::parse(&hello.region).name().trim().is_empty() {
        return Err(AppError::agent(AgentError::InvalidHello {
            reason: "agent region is empty".to_owned(),
        }));
    }
    Ok(hello)
}

async fn reject(writer: &mut OwnedWriteHalf, err: &AppError) {
    let message = WireMessage::Error(ErrorMessage {
        message: err.to_string(),
    });
    if let Err(send_err) = send_message(writer, &message).await {
        debug!("Failed to send rejection: {}", send_err);
    }
}

async fn read_loop(
    reader: &mut BufReader<OwnedReadHalf>,
    key: &AgentKey,
    connection: u64,
    directory: &LocalAgentDirectory,
    control: &ConnectionControl,
) -> AppResult<()> {
    loop {
        let message = match read_message(reader).await {
            Ok(message) => message,
            Err(AppError::Agent(AgentError::ConnectionClosed)) => return Ok(()),
            Err(err) => return Err(err),
        };
        match message {
            WireMessage::Status(update) => {
                debug!("Agent {} reported status {}", key, update.status);
                directory.set_status(key, connection, update.status).await;
            }
            WireMessage::Heartbeat => {}
            WireMessage::Snapshot(reply) => {
                if !control
                    .complete_snapshot(reply.request_id, reply.snapshot)
                    .await
                {
                    debug!(
                        "Dropping late snapshot {} from agent {}",
                        reply.request_id, key
                    );
                }
            }
            WireMessage::Error(error) => {
                warn!("Agent {} reported an error: {}", key, error.message);
            }
            WireMessage::Hello(_) | WireMessage::Stop | WireMessage::SnapshotRequest(_) => {
                warn!("Unexpected message from agent {}", key);
            }
        }
    }
}

#[cfg(test)]
mod tests;

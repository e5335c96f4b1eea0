use tokio::io::AsyncWriteExt;

use super::*;
use crate::agents::protocol::{SnapshotMessage, StatusMessage};
use crate::domain::{AgentStatus, SystemSnapshot};
use crate::ports::LiveAgentDirectory;
use crate::shutdown::{ShutdownSender, shutdown_channel};

const WAIT_STEP: Duration = Duration::from_millis(10);
const WAIT_LIMIT: Duration = Duration::from_secs(5);

struct Harness {
    addr: SocketAddr,
    directory: Arc<LocalAgentDirectory>,
    shutdown_tx: ShutdownSender,
}

async fn start(hello_timeout: Duration) -> AppResult<Harness> {
    let directory = Arc::new(LocalAgentDirectory::new());
    let listener = AgentListener::bind(
        SocketAddr::from(([127, 0, 0, 1], 0)),
        directory.clone(),
        Duration::from_secs(2),
    )
    .await?
    .with_hello_timeout(hello_timeout);
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(listener.serve(shutdown_rx));
    Ok(Harness {
        addr,
        directory,
        shutdown_tx,
    })
}

async fn connect(addr: SocketAddr) -> AppResult<(BufReader<OwnedReadHalf>, OwnedWriteHalf)> {
    let stream = TcpStream::connect(addr).await?;
    let (read_half, write_half) = stream.into_split();
    Ok((BufReader::new(read_half), write_half))
}

async fn wait_for_agents(directory: &LocalAgentDirectory, expected: usize) -> AppResult<()> {
    let waited = timeout(WAIT_LIMIT, async {
        while directory.len().await != expected {
            tokio::time::sleep(WAIT_STEP).await;
        }
    })
    .await;
    waited.map_err(|_err| {
        AppError::validation(format!("Timed out waiting for {} agents", expected))
    })
}

fn hello(name: &str, region: &str) -> WireMessage {
    WireMessage::Hello(HelloMessage {
        name: name.to_owned(),
        region: region.to_owned(),
        status: AgentStatus::Ready,
    })
}

#[tokio::test(flavor = "current_thread")]
async fn hello_attaches_agent_with_peer_address() -> AppResult<()> {
    let harness = start(AGENT_HELLO_TIMEOUT).await?;
    let (_reader, mut writer) = connect(harness.addr).await?;
    let local_port = writer.local_addr()?.port();
    send_message(&mut writer, &hello("agent-1", "east_owned_bob")).await?;
    wait_for_agents(&harness.directory, 1).await?;

    let attached = harness.directory.attached().await;
    let Some(agent) = attached.first() else {
        return Err(AppError::validation("Expected attached agent"));
    };
    let expected = LiveAgent {
        key: AgentKey::new("127.0.0.1", "agent-1"),
        port: local_port,
        status: AgentStatus::Ready,
        region: AgentRegion::owned("east", "bob"),
    };
    if *agent != expected {
        return Err(AppError::validation(format!(
            "Unexpected agent: {:?}",
            agent
        )));
    }

    send_message(
        &mut writer,
        &WireMessage::Status(StatusMessage {
            status: AgentStatus::Busy,
        }),
    )
    .await?;
    send_message(&mut writer, &WireMessage::Heartbeat).await?;
    let busy = timeout(WAIT_LIMIT, async {
        loop {
            let agents = harness.directory.attached().await;
            if agents.first().map(|agent| agent.status) == Some(AgentStatus::Busy) {
                break;
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    })
    .await;
    if busy.is_err() {
        return Err(AppError::validation("Expected status update"));
    }

    writer.shutdown().await?;
    wait_for_agents(&harness.directory, 0).await?;
    drop(harness.shutdown_tx.send(()));
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn controller_commands_reach_the_agent() -> AppResult<()> {
    let harness = start(AGENT_HELLO_TIMEOUT).await?;
    let (mut reader, mut writer) = connect(harness.addr).await?;
    send_message(&mut writer, &hello("agent-1", "east")).await?;
    wait_for_agents(&harness.directory, 1).await?;
    let key = AgentKey::new("127.0.0.1", "agent-1");
    let Some(control) = harness.directory.control(&key).await else {
        return Err(AppError::validation("Expected control handle"));
    };

    let fetch = {
        let control = control.clone();
        tokio::spawn(async move { control.fetch_system_snapshot().await })
    };
    let WireMessage::SnapshotRequest(request) = read_message(&mut reader).await? else {
        return Err(AppError::validation("Expected snapshot request"));
    };
    let snapshot = SystemSnapshot {
        system: "linux".to_owned(),
        cpu_used_percentage: 12.5,
        collected_at_ms: 1_700_000_000_000,
        ..SystemSnapshot::default()
    };
    send_message(
        &mut writer,
        &WireMessage::Snapshot(SnapshotMessage {
            request_id: request.request_id,
            snapshot: snapshot.clone(),
        }),
    )
    .await?;
    if fetch.await?? != snapshot {
        return Err(AppError::validation("Unexpected snapshot"));
    }

    control.stop().await?;
    if read_message(&mut reader).await? != WireMessage::Stop {
        return Err(AppError::validation("Expected stop"));
    }
    drop(harness.shutdown_tx.send(()));
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn first_message_must_be_hello() -> AppResult<()> {
    let harness = start(AGENT_HELLO_TIMEOUT).await?;
    let (mut reader, mut writer) = connect(harness.addr).await?;
    send_message(&mut writer, &WireMessage::Heartbeat).await?;
    match read_message(&mut reader).await? {
        WireMessage::Error(_) => {}
        other => {
            return Err(AppError::validation(format!(
                "Expected rejection, got {:?}",
                other
            )));
        }
    }
    if !harness.directory.is_empty().await {
        return Err(AppError::validation("Expected nothing attached"));
    }
    drop(harness.shutdown_tx.send(()));
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn hello_with_empty_name_is_rejected() -> AppResult<()> {
    let harness = start(AGENT_HELLO_TIMEOUT).await?;
    let (mut reader, mut writer) = connect(harness.addr).await?;
    send_message(&mut writer, &hello(" ", "east")).await?;
    let WireMessage::Error(error) = read_message(&mut reader).await? else {
        return Err(AppError::validation("Expected rejection"));
    };
    if !error.message.contains("name") {
        return Err(AppError::validation(format!(
            "Unexpected rejection: {}",
            error.message
        )));
    }
    drop(harness.shutdown_tx.send(()));
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn silent_connection_times_out() -> AppResult<()> {
    let harness = start(Duration::from_millis(50)).await?;
    let (mut reader, _writer) = connect(harness.addr).await?;
    let WireMessage::Error(error) = read_message(&mut reader).await? else {
        return Err(AppError::validation("Expected rejection"));
    };
    if !error.message.contains("hello") {
        return Err(AppError::validation(format!(
            "Unexpected rejection: {}",
            error.message
        )));
    }
    drop(harness.shutdown_tx.send(()));
    Ok(())
}

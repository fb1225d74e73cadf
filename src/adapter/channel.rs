//! Isolated context transports
//!
//! - InMemoryChannel: requests go to an mpsc receiver (tests, embedding hosts)
//! - ChildProcessChannel: the context is a child process speaking
//!   newline-delimited JSON, requests on stdin and responses on stdout

use std::process::Stdio;

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, Command},
    sync::{Mutex, mpsc}
};
use tracing::{Level, event};

use crate::{
    domain::{
        constant::channel,
        error::BridgeError,
        rpc::{RpcRequest, RpcResponse}
    },
    port::channel::ContextChannel
};

/// In-memory transport handing every request to a receiver
pub struct InMemoryChannel {
    requests: mpsc::UnboundedSender<RpcRequest>
}

impl InMemoryChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RpcRequest>) {
        let (requests, receiver) = mpsc::unbounded_channel();
        (Self { requests }, receiver)
    }
}

#[async_trait]
impl ContextChannel for InMemoryChannel {
    async fn send(&self, request: RpcRequest) -> Result<(), BridgeError> {
        self.requests
            .send(request)
            .map_err(|e| BridgeError::Channel(format!("isolated context is gone, dropped call {}", e.0.id)))
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

/// Child process transport
pub struct ChildProcessChannel {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>
}

impl ChildProcessChannel {
    /// Start `program` and return the channel plus the stream of its responses
    pub fn spawn(
        program: &str,
        args: &[String]
    ) -> Result<(Self, mpsc::UnboundedReceiver<RpcResponse>), BridgeError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::Spawn(format!("Failed to start isolated context '{}': {}", program, e)))?;

        let stdin = child.stdin.take().ok_or_else(|| BridgeError::Channel("context stdin unavailable".to_string()))?;
        let stdout =
            child.stdout.take().ok_or_else(|| BridgeError::Channel("context stdout unavailable".to_string()))?;

        event!(Level::INFO, event = channel::CONTEXT_SPAWNED, program = %program, pid = ?child.id());

        let (responses, receiver) = mpsc::unbounded_channel();
        tokio::spawn(read_responses(BufReader::new(stdout), responses));

        Ok((Self { stdin: Mutex::new(stdin), child: Mutex::new(child) }, receiver))
    }

    /// OS process id, if the context is still running
    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.id()
    }

    /// Kill the context process
    pub async fn kill(&self) -> Result<(), BridgeError> {
        self.child.lock().await.kill().await.map_err(BridgeError::from)
    }
}

#[async_trait]
impl ContextChannel for ChildProcessChannel {
    async fn send(&self, request: RpcRequest) -> Result<(), BridgeError> {
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');

        let mut stdin = self.stdin.lock().await;
        stdin.write_all(&line).await.map_err(|e| BridgeError::Channel(format!("write to context failed: {}", e)))?;
        stdin.flush().await.map_err(|e| BridgeError::Channel(format!("flush to context failed: {}", e)))
    }

    fn name(&self) -> &'static str {
        "child-process"
    }
}

/// Decode response lines until the context closes its output.
///
/// Lines that are not a valid response are logged and skipped.
pub async fn read_responses<R>(reader: R, responses: mpsc::UnboundedSender<RpcResponse>)
where
    R: AsyncBufRead + Unpin
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<RpcResponse>(&line) {
                    Ok(response) => {
                        if responses.send(response).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        event!(Level::WARN, event = channel::RESPONSE_MALFORMED, error = %e, line = %line);
                    }
                }
            }
            Ok(None) => {
                event!(Level::INFO, event = channel::CONTEXT_EXITED);
                break;
            }
            Err(e) => {
                event!(Level::ERROR, event = channel::CONTEXT_EXITED, error = %e);
                break;
            }
        }
    }
}

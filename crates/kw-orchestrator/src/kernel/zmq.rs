//! ZeroMQ transport for kernel channels
//!
//! The shell channel is a DEALER socket and the iopub channel a SUB socket
//! subscribed to every topic. Frames are signed and verified with the key
//! from the connection file.
//!
//! zeromq retries a refused connection indefinitely, so every dial is
//! bounded by the connector's timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use kw_core::traits::{IopubChannel, KernelChannels, KernelConnector, ShellChannel};
use kw_core::ChannelError;
use kw_protocol::{ConnectionInfo, Message, WireCodec};
use zeromq::{DealerSocket, Socket, SocketRecv, SocketSend, SubSocket, ZmqMessage, ZmqResult};

/// Default bound on each channel connect
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens kernel channels over ZeroMQ
#[derive(Debug, Clone)]
pub struct ZmqConnector {
    connect_timeout: Duration,
}

impl Default for ZmqConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ZmqConnector {
    /// Create a connector with the default connect timeout
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a connector giving up on a channel after `connect_timeout`
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    async fn bounded<F>(
        &self,
        channel: &'static str,
        endpoint: &str,
        step: F,
    ) -> Result<(), ChannelError>
    where
        F: Future<Output = ZmqResult<()>>,
    {
        let open_error = |reason: String| ChannelError::Open {
            channel,
            endpoint: endpoint.to_string(),
            reason,
        };

        match tokio::time::timeout(self.connect_timeout, step).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(open_error(e.to_string())),
            Err(_) => Err(open_error(format!(
                "not connected after {:?}",
                self.connect_timeout
            ))),
        }
    }
}

#[async_trait]
impl KernelConnector for ZmqConnector {
    async fn connect(&self, info: &ConnectionInfo) -> Result<KernelChannels, ChannelError> {
        let codec = info.codec()?;

        let shell_endpoint = info.shell_endpoint();
        let mut shell = DealerSocket::new();
        self.bounded("shell", &shell_endpoint, shell.connect(&shell_endpoint))
            .await?;

        let iopub_endpoint = info.iopub_endpoint();
        let mut iopub = SubSocket::new();
        self.bounded("iopub", &iopub_endpoint, iopub.connect(&iopub_endpoint))
            .await?;
        self.bounded("iopub", &iopub_endpoint, iopub.subscribe(""))
            .await?;

        tracing::debug!("Connected shell {} and iopub {}", shell_endpoint, iopub_endpoint);

        Ok(KernelChannels {
            session: uuid::Uuid::new_v4().to_string(),
            shell: Box::new(ZmqShell {
                socket: shell,
                codec: codec.clone(),
            }),
            iopub: Box::new(ZmqIopub {
                socket: iopub,
                codec,
            }),
        })
    }
}

struct ZmqShell {
    socket: DealerSocket,
    codec: WireCodec,
}

#[async_trait]
impl ShellChannel for ZmqShell {
    async fn send(&mut self, message: Message) -> Result<(), ChannelError> {
        let frames = self.codec.encode(&message)?;
        let zmq_message = ZmqMessage::try_from(frames).map_err(|e| ChannelError::Transport {
            channel: "shell",
            reason: e.to_string(),
        })?;
        self.socket
            .send(zmq_message)
            .await
            .map_err(|e| ChannelError::Transport {
                channel: "shell",
                reason: e.to_string(),
            })
    }

    async fn recv(&mut self) -> Result<Message, ChannelError> {
        let zmq_message = self.socket.recv().await.map_err(|e| ChannelError::Transport {
            channel: "shell",
            reason: e.to_string(),
        })?;
        Ok(self.codec.decode(Vec::from(zmq_message.into_vecdeque()))?)
    }

    async fn close(self: Box<Self>) -> Result<(), ChannelError> {
        let errors = self.socket.close().await;
        if errors.is_empty() {
            Ok(())
        } else {
            let reasons: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            Err(ChannelError::Close(reasons.join("; ")))
        }
    }
}

struct ZmqIopub {
    socket: SubSocket,
    codec: WireCodec,
}

#[async_trait]
impl IopubChannel for ZmqIopub {
    async fn recv(&mut self) -> Result<Message, ChannelError> {
        let zmq_message = self.socket.recv().await.map_err(|e| ChannelError::Transport {
            channel: "iopub",
            reason: e.to_string(),
        })?;
        Ok(self.codec.decode(Vec::from(zmq_message.into_vecdeque()))?)
    }
}

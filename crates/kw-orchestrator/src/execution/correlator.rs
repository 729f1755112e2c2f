//! Request/reply correlation on the shell channel

use std::path::Path;
use std::time::Duration;

use kw_core::traits::{KernelChannels, KernelConnector, ShellChannel};
use kw_core::{ChannelError, WarmupError};
use kw_protocol::{ConnectionInfo, Message, MsgId};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::drain::spawn_iopub_drain;

/// Completed execution
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Correlation token of the request
    pub msg_id: MsgId,
    /// The reply whose parent is the request
    pub reply: Message,
    /// Time from submission to reply
    pub elapsed: Duration,
    /// IOPub events drained while waiting
    pub iopub_events: usize,
}

impl ExecutionOutcome {
    /// Reply status (`ok`, `error`, `aborted`)
    pub fn status(&self) -> Option<&str> {
        self.reply.reply_status()
    }
}

/// Submits a command and awaits its correlated reply
pub struct ExecutionCorrelator<'a, C: KernelConnector + ?Sized> {
    connector: &'a C,
}

impl<'a, C: KernelConnector + ?Sized> ExecutionCorrelator<'a, C> {
    /// Create a correlator opening channels through `connector`
    pub fn new(connector: &'a C) -> Self {
        Self { connector }
    }

    /// Open channels described by `connection_file`, run `command` and wait
    /// up to `timeout` for its reply
    pub async fn execute_and_await(
        &self,
        connection_file: &Path,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecutionOutcome, WarmupError> {
        let info = ConnectionInfo::load(connection_file).map_err(ChannelError::from)?;
        tracing::debug!(
            "Connecting to kernel at {} (iopub {})",
            info.shell_endpoint(),
            info.iopub_endpoint()
        );

        let channels = self.connector.connect(&info).await?;
        execute_on(channels, command, timeout).await
    }
}

/// Run `command` on already-open channels
///
/// The iopub drain is cancelled and joined before this returns, whether
/// the reply arrived, the wait timed out or the shell channel failed.
pub async fn execute_on(
    channels: KernelChannels,
    command: &str,
    timeout: Duration,
) -> Result<ExecutionOutcome, WarmupError> {
    let KernelChannels {
        session,
        mut shell,
        iopub,
    } = channels;

    let request = Message::execute_request(session, command);
    let msg_id = request.msg_id().clone();

    let start = Instant::now();
    shell.send(request).await?;
    tracing::debug!("Submitted execute request {}", msg_id);

    let cancel = CancellationToken::new();
    let drain = spawn_iopub_drain(iopub, cancel.clone());

    let waited = tokio::time::timeout(timeout, await_reply(shell.as_mut(), &msg_id)).await;
    let elapsed = start.elapsed();

    cancel.cancel();
    let iopub_events = match drain.await {
        Ok(count) => count,
        Err(e) if e.is_cancelled() => 0,
        Err(e) => {
            tracing::warn!("IOPub drain task failed: {}", e);
            0
        }
    };

    let reply = match waited {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            close_quietly(shell).await;
            return Err(e.into());
        }
        Err(_) => {
            tracing::warn!(
                "No reply to {} after {:.3}s (timeout {:?})",
                msg_id,
                elapsed.as_secs_f64(),
                timeout
            );
            close_quietly(shell).await;
            return Err(WarmupError::Timeout { timeout });
        }
    };

    shell.close().await?;

    tracing::info!(
        "Execute finished: status {:?}, elapsed {:.3}s, {} iopub events",
        reply.reply_status().unwrap_or("unknown"),
        elapsed.as_secs_f64(),
        iopub_events
    );

    Ok(ExecutionOutcome {
        msg_id,
        reply,
        elapsed,
        iopub_events,
    })
}

async fn await_reply(
    shell: &mut dyn ShellChannel,
    msg_id: &MsgId,
) -> Result<Message, ChannelError> {
    loop {
        let reply = shell.recv().await?;
        if reply.parent_msg_id() == Some(msg_id) {
            return Ok(reply);
        }
        tracing::debug!(
            "Skipping {} not correlated with {} (parent {:?})",
            reply.header.msg_type,
            msg_id,
            reply.parent_msg_id()
        );
    }
}

async fn close_quietly(shell: Box<dyn ShellChannel>) {
    if let Err(e) = shell.close().await {
        tracing::debug!("Failed to close shell channel: {}", e);
    }
}

//! IOPub drain task

use kw_core::traits::IopubChannel;
use kw_core::ChannelError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn a task that receives and logs iopub events until cancelled.
///
/// The task never stops on its own. A message that fails to decode or
/// verify is skipped; after a transport error it parks until `cancel`
/// fires. It resolves to the number of events drained.
pub fn spawn_iopub_drain(
    mut iopub: Box<dyn IopubChannel>,
    cancel: CancellationToken,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut drained = 0usize;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                event = iopub.recv() => match event {
                    Ok(message) => {
                        drained += 1;
                        tracing::debug!(
                            msg_type = %message.header.msg_type,
                            content = %message.content,
                            "recv iopub msg"
                        );
                    }
                    Err(ChannelError::Protocol(e)) => {
                        tracing::warn!("Skipping unreadable iopub message: {}", e);
                    }
                    Err(e) => {
                        tracing::warn!("IOPub channel error, parking drain: {}", e);
                        cancel.cancelled().await;
                        break;
                    }
                },
            }
        }

        tracing::debug!("IOPub drain stopped after {} events", drained);
        drained
    })
}

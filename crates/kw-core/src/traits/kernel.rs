//! Kernel channel traits

use async_trait::async_trait;
use kw_protocol::{ConnectionInfo, Message};

use crate::error::ChannelError;

/// Request/reply channel to a kernel
#[async_trait]
pub trait ShellChannel: Send {
    /// Send a request
    async fn send(&mut self, message: Message) -> Result<(), ChannelError>;

    /// Receive the next reply
    async fn recv(&mut self) -> Result<Message, ChannelError>;

    /// Close the channel
    async fn close(self: Box<Self>) -> Result<(), ChannelError>;
}

/// Broadcast side-channel of a kernel (status and output events)
#[async_trait]
pub trait IopubChannel: Send {
    /// Receive the next event
    async fn recv(&mut self) -> Result<Message, ChannelError>;
}

/// Open channels to one kernel
pub struct KernelChannels {
    /// Client session ID stamped on outgoing messages
    pub session: String,
    /// Shell channel
    pub shell: Box<dyn ShellChannel>,
    /// IOPub channel
    pub iopub: Box<dyn IopubChannel>,
}

impl std::fmt::Debug for KernelChannels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelChannels")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Opens channels from a connection descriptor
#[async_trait]
pub trait KernelConnector: Send + Sync {
    /// Connect to the kernel described by `info`
    async fn connect(&self, info: &ConnectionInfo) -> Result<KernelChannels, ChannelError>;
}

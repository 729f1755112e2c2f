//! kw-protocol: Kernel messaging wire format for kernel-warmup
//!
//! This crate defines the messages exchanged with an interactive compute
//! kernel over its shell and iopub channels, the multipart frame layout
//! used to carry them, and the connection descriptor a freshly started
//! kernel writes to its runtime directory.

pub mod codec;
pub mod connection;
pub mod error;
pub mod message;
pub mod msg_id;

pub use codec::{WireCodec, DELIMITER};
pub use connection::ConnectionInfo;
pub use error::ProtocolError;
pub use message::{Header, Message, MessageType, PROTOCOL_VERSION};
pub use msg_id::MsgId;

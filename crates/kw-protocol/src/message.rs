//! Message types for the kernel messaging protocol
//!
//! Every message carries a header identifying it, an optional parent header
//! naming the request it answers, free-form metadata, and a content object
//! whose shape depends on the message type. The frame layout is handled by
//! the codec in `codec.rs`.
//!
//! # Message Flow
//!
//! A single execution looks like this:
//!
//! 1. Client sends `execute_request` on the shell channel
//! 2. Kernel publishes `status: busy`, `execute_input`, any `stream` or
//!    `display_data` output, then `status: idle` on iopub
//! 3. Kernel answers with `execute_reply` on the shell channel, its parent
//!    header carrying the request's `msg_id`
//!
//! Iopub traffic and the reply are not ordered relative to each other.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::msg_id::MsgId;

/// Messaging protocol version sent in every header.
pub const PROTOCOL_VERSION: &str = "5.3";

/// Message type identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    /// Request to run code
    ExecuteRequest,
    /// Reply to an execute request
    ExecuteReply,
    /// Kernel execution state change
    Status,
    /// stdout/stderr output
    Stream,
    /// Echo of the code being executed
    ExecuteInput,
    /// Value of the last expression
    ExecuteResult,
    /// Rich display output
    DisplayData,
    /// Exception raised during execution
    Error,
    /// Any message type not listed above
    Other(String),
}

impl MessageType {
    /// Wire name of this message type
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExecuteRequest => "execute_request",
            Self::ExecuteReply => "execute_reply",
            Self::Status => "status",
            Self::Stream => "stream",
            Self::ExecuteInput => "execute_input",
            Self::ExecuteResult => "execute_result",
            Self::DisplayData => "display_data",
            Self::Error => "error",
            Self::Other(name) => name,
        }
    }

    /// Parse a wire name
    pub fn from_name(name: &str) -> Self {
        match name {
            "execute_request" => Self::ExecuteRequest,
            "execute_reply" => Self::ExecuteReply,
            "status" => Self::Status,
            "stream" => Self::Stream,
            "execute_input" => Self::ExecuteInput,
            "execute_result" => Self::ExecuteResult,
            "display_data" => Self::DisplayData,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Message header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Unique ID of this message
    pub msg_id: MsgId,
    /// Client session this message belongs to
    pub session: String,
    /// User that sent the message
    #[serde(default)]
    pub username: String,
    /// ISO 8601 creation time
    #[serde(default)]
    pub date: String,
    /// Message type name
    pub msg_type: String,
    /// Protocol version
    #[serde(default)]
    pub version: String,
}

impl Header {
    /// Create a header for a new message
    pub fn new(session: impl Into<String>, msg_type: &MessageType) -> Self {
        Self {
            msg_id: MsgId::generate(),
            session: session.into(),
            username: "kernel-warmup".to_string(),
            date: chrono::Utc::now().to_rfc3339(),
            msg_type: msg_type.as_str().to_string(),
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}

/// A protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Routing prefix frames preceding the delimiter
    pub identities: Vec<Bytes>,
    /// This message's header
    pub header: Header,
    /// Header of the message this one answers, if any
    pub parent_header: Option<Header>,
    /// Free-form metadata
    pub metadata: Value,
    /// Type-specific content
    pub content: Value,
}

impl Message {
    /// Create a message with no parent and empty metadata
    pub fn new(session: impl Into<String>, msg_type: MessageType, content: Value) -> Self {
        Self {
            identities: Vec::new(),
            header: Header::new(session, &msg_type),
            parent_header: None,
            metadata: json!({}),
            content,
        }
    }

    /// Build an `execute_request` for the given code
    pub fn execute_request(session: impl Into<String>, code: &str) -> Self {
        Self::new(
            session,
            MessageType::ExecuteRequest,
            json!({
                "code": code,
                "silent": false,
                "store_history": true,
                "user_expressions": {},
                "allow_stdin": false,
                "stop_on_error": true,
            }),
        )
    }

    /// Build a reply to `parent` sharing its session
    pub fn reply_to(parent: &Message, msg_type: MessageType, content: Value) -> Self {
        let mut reply = Self::new(parent.header.session.clone(), msg_type, content);
        reply.parent_header = Some(parent.header.clone());
        reply
    }

    /// This message's ID
    pub fn msg_id(&self) -> &MsgId {
        &self.header.msg_id
    }

    /// Parsed message type
    pub fn msg_type(&self) -> MessageType {
        MessageType::from_name(&self.header.msg_type)
    }

    /// ID of the request this message answers
    pub fn parent_msg_id(&self) -> Option<&MsgId> {
        self.parent_header.as_ref().map(|h| &h.msg_id)
    }

    /// `content.status` of a reply (`ok`, `error`, `aborted`)
    pub fn reply_status(&self) -> Option<&str> {
        self.content.get("status").and_then(Value::as_str)
    }
}

//! Multipart frame codec for protocol messages
//!
//! A message travels as a sequence of frames:
//!
//! ```text
//! [identities...] <IDS|MSG> signature header parent_header metadata content [buffers...]
//! ```
//!
//! The signature is the hex HMAC-SHA256 of the four JSON frames that follow
//! it, keyed with the `key` from the connection descriptor. An empty key
//! disables signing and the signature frame is sent empty.

use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::error::ProtocolError;
use crate::message::{Header, Message};

/// Frame separating routing identities from the message body
pub const DELIMITER: &[u8] = b"<IDS|MSG>";

/// Signature scheme supported by this codec
pub const SIGNATURE_SCHEME: &str = "hmac-sha256";

/// Frames after the delimiter: signature + four JSON parts
const BODY_FRAMES: usize = 5;

type HmacSha256 = Hmac<Sha256>;

/// Codec for signing, encoding and decoding multipart messages
#[derive(Debug, Clone, Default)]
pub struct WireCodec {
    /// Signing key, `None` when signing is disabled
    key: Option<Vec<u8>>,
}

impl WireCodec {
    /// Create a codec for the given key and signature scheme
    pub fn new(key: &str, signature_scheme: &str) -> Result<Self, ProtocolError> {
        if key.is_empty() {
            return Ok(Self { key: None });
        }
        if signature_scheme != SIGNATURE_SCHEME {
            return Err(ProtocolError::UnsupportedSignatureScheme(
                signature_scheme.to_string(),
            ));
        }
        Ok(Self {
            key: Some(key.as_bytes().to_vec()),
        })
    }

    /// Codec that neither signs nor verifies
    pub fn unsigned() -> Self {
        Self { key: None }
    }

    fn mac(&self, parts: &[&[u8]]) -> Result<Option<HmacSha256>, ProtocolError> {
        let Some(key) = &self.key else {
            return Ok(None);
        };
        let mut mac =
            HmacSha256::new_from_slice(key).map_err(|_| ProtocolError::InvalidSignature)?;
        for part in parts {
            mac.update(part);
        }
        Ok(Some(mac))
    }

    /// Encode a message into frames
    pub fn encode(&self, message: &Message) -> Result<Vec<Bytes>, ProtocolError> {
        let header = serde_json::to_vec(&message.header)?;
        let parent = match &message.parent_header {
            Some(parent) => serde_json::to_vec(parent)?,
            None => b"{}".to_vec(),
        };
        let metadata = serde_json::to_vec(&message.metadata)?;
        let content = serde_json::to_vec(&message.content)?;

        let signature = match self.mac(&[
            header.as_slice(),
            parent.as_slice(),
            metadata.as_slice(),
            content.as_slice(),
        ])? {
            Some(mac) => hex::encode(mac.finalize().into_bytes()),
            None => String::new(),
        };

        let mut frames = Vec::with_capacity(message.identities.len() + 1 + BODY_FRAMES);
        frames.extend(message.identities.iter().cloned());
        frames.push(Bytes::from_static(DELIMITER));
        frames.push(Bytes::from(signature));
        frames.push(Bytes::from(header));
        frames.push(Bytes::from(parent));
        frames.push(Bytes::from(metadata));
        frames.push(Bytes::from(content));
        Ok(frames)
    }

    /// Decode frames into a message, verifying the signature
    pub fn decode(&self, frames: Vec<Bytes>) -> Result<Message, ProtocolError> {
        let delimiter = frames
            .iter()
            .position(|frame| frame.as_ref() == DELIMITER)
            .ok_or(ProtocolError::MissingDelimiter)?;

        let body = &frames[delimiter + 1..];
        if body.len() < BODY_FRAMES {
            return Err(ProtocolError::IncompleteFrame {
                expected: BODY_FRAMES,
                actual: body.len(),
            });
        }

        let (signature, header, parent, metadata, content) =
            (&body[0], &body[1], &body[2], &body[3], &body[4]);

        if let Some(mac) = self.mac(&[
            header.as_ref(),
            parent.as_ref(),
            metadata.as_ref(),
            content.as_ref(),
        ])? {
            let expected = hex::decode(signature)
                .map_err(|_| ProtocolError::InvalidSignature)?;
            mac.verify_slice(&expected).map_err(|_| {
                tracing::warn!("Dropping message with bad signature ({} identities)", delimiter);
                ProtocolError::InvalidSignature
            })?;
        }

        let header: Header = serde_json::from_slice(header)?;
        let parent: Value = serde_json::from_slice(parent)?;
        let parent_header = if parent.as_object().is_some_and(|map| map.is_empty()) {
            None
        } else {
            Some(serde_json::from_value(parent)?)
        };

        Ok(Message {
            identities: frames[..delimiter].to_vec(),
            header,
            parent_header,
            metadata: serde_json::from_slice(metadata)?,
            content: serde_json::from_slice(content)?,
        })
    }
}

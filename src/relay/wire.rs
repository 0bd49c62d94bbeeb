//! Bot API wire format.
//!
//! Decoding of `getUpdates` response bodies, shaped like the Telegram Bot
//! API, into inbound messages.

use crate::core::SubscriberId;
use crate::relay::transport::{InboundMessage, TransportError};
use serde::Deserialize;

/// Envelope wrapping every API response.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<i64>,
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the result, mapping `ok: false` to [`TransportError::Rejected`].
    pub fn into_result(self) -> Result<T, TransportError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(TransportError::Malformed("ok response without result".to_string())),
            (false, _) => Err(TransportError::Rejected {
                code: self.error_code.unwrap_or_default(),
                description: self.description.unwrap_or_default(),
            }),
        }
    }
}

/// A single entry from `getUpdates`.
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

impl Update {
    /// Text messages become inbound messages; everything else is dropped.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let text = message.text?;
        Some(InboundMessage {
            sender: SubscriberId(message.chat.id),
            text,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatMessage {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Parse a `getUpdates` response body.
pub fn parse_updates(body: &str) -> Result<Vec<Update>, TransportError> {
    let response: ApiResponse<Vec<Update>> =
        serde_json::from_str(body).map_err(|e| TransportError::Malformed(e.to_string()))?;
    response.into_result()
}

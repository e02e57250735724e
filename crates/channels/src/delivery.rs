use {async_trait::async_trait, std::path::Path};

use crate::error::Result;

/// Handle to a message the relay posted, used to edit or delete it later.
///
/// The chat id and message id are kept as transport-neutral values; the
/// concrete delivery implementation converts them to its own id types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle {
    pub chat_id: String,
    pub message_id: i64,
}

/// An inbound text event from the chat transport.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InboundMessage {
    /// Opaque conversation identity, stable per chat.
    pub chat_id: String,
    /// Raw message text as the user sent it.
    pub text: String,
}

/// Outbound operations against the chat transport.
///
/// Implementations must be safe for concurrent use by independent
/// in-flight requests.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Post a new text message and return a handle for later edits.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageHandle>;

    /// Rewrite the text of a previously posted message.
    async fn edit_text(&self, handle: &MessageHandle, text: &str) -> Result<()>;

    /// Delete a previously posted message.
    async fn delete_message(&self, handle: &MessageHandle) -> Result<()>;

    /// Upload a local video file to the chat.
    ///
    /// `supports_streaming` hints to the transport that the file is
    /// playable while still downloading.
    async fn send_video(
        &self,
        chat_id: &str,
        video: &Path,
        supports_streaming: bool,
    ) -> Result<()>;
}

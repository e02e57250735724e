use {
    async_trait::async_trait,
    std::{future::Future, path::Path, time::Duration},
    teloxide::{
        RequestError,
        payloads::SendVideoSetters,
        prelude::*,
        types::{ChatId, InputFile, MessageId},
    },
    tracing::warn,
};

use clipferry_channels::{Delivery, Error, MessageHandle, Result};

/// How many times to re-issue a request Telegram answered with a
/// flood-control wait.
const RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Telegram implementation of the delivery channel.
///
/// `Bot` is a cheap handle over a shared HTTP client, so one
/// `TelegramDelivery` serves every in-flight request concurrently.
#[derive(Clone)]
pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn chat(chat_id: &str) -> Result<ChatId> {
        chat_id
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| Error::invalid_input(format!("invalid chat id: {chat_id}")))
    }

    fn message_id(handle: &MessageHandle) -> Result<MessageId> {
        i32::try_from(handle.message_id)
            .map(MessageId)
            .map_err(|_| {
                Error::invalid_input(format!("invalid message id: {}", handle.message_id))
            })
    }

    /// Run a request, honoring Telegram flood control: on `RetryAfter`,
    /// wait the advertised duration and retry a bounded number of times.
    async fn with_flood_control<T, F, Fut>(
        &self,
        operation: &'static str,
        mut request: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(Error::external(operation, err));
                    };

                    if retries >= RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            operation,
                            retries,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(Error::external(operation, err));
                    }

                    retries += 1;
                    warn!(
                        operation,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

#[async_trait]
impl Delivery for TelegramDelivery {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<MessageHandle> {
        let chat = Self::chat(chat_id)?;
        let message = self
            .with_flood_control("send message", || {
                let req = self.bot.send_message(chat, text.to_owned());
                async move { req.await }
            })
            .await?;
        Ok(MessageHandle {
            chat_id: chat_id.to_string(),
            message_id: i64::from(message.id.0),
        })
    }

    async fn edit_text(&self, handle: &MessageHandle, text: &str) -> Result<()> {
        let chat = Self::chat(&handle.chat_id)?;
        let message_id = Self::message_id(handle)?;
        self.with_flood_control("edit message", || {
            let req = self.bot.edit_message_text(chat, message_id, text.to_owned());
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<()> {
        let chat = Self::chat(&handle.chat_id)?;
        let message_id = Self::message_id(handle)?;
        self.with_flood_control("delete message", || {
            let req = self.bot.delete_message(chat, message_id);
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    async fn send_video(
        &self,
        chat_id: &str,
        video: &Path,
        supports_streaming: bool,
    ) -> Result<()> {
        let chat = Self::chat(chat_id)?;
        self.with_flood_control("send video", || {
            let req = self
                .bot
                .send_video(chat, InputFile::file(video.to_path_buf()))
                .supports_streaming(supports_streaming);
            async move { req.await }
        })
        .await?;
        Ok(())
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_parsing() {
        assert_eq!(TelegramDelivery::chat("42").unwrap(), ChatId(42));
        assert_eq!(
            TelegramDelivery::chat("-1001234").unwrap(),
            ChatId(-1_001_234)
        );
        assert!(TelegramDelivery::chat("not-a-chat").is_err());
    }

    #[test]
    fn message_id_conversion_rejects_out_of_range() {
        let handle = MessageHandle {
            chat_id: "42".to_string(),
            message_id: i64::from(i32::MAX) + 1,
        };
        assert!(TelegramDelivery::message_id(&handle).is_err());

        let handle = MessageHandle {
            chat_id: "42".to_string(),
            message_id: 7,
        };
        assert_eq!(TelegramDelivery::message_id(&handle).unwrap(), MessageId(7));
    }
}

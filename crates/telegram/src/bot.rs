use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, Message, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {clipferry_channels::InboundMessage, clipferry_pipeline::Pipeline};

use crate::{arbiter::ConflictArbiter, config::TelegramConfig};

/// Reply to `/start`.
const GREETING: &str = "Hi! Send me a YouTube link and I'll fetch the video for you.\n\n\
Note: uploads are limited to 50 MB, so long videos may fail.";

/// Wait before retrying after a transient poll error.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connect to Telegram and verify credentials.
///
/// Deletes any registered webhook (long polling requires none) and
/// registers the `/start` command for client-side autocomplete.
pub async fn connect(config: &TelegramConfig) -> anyhow::Result<Bot> {
    // Client timeout longer than the long-polling timeout (30s) so the
    // HTTP client doesn't abort the request before Telegram responds.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(45))
        .build()?;
    let bot = Bot::with_client(config.token.expose_secret(), client);

    let me = bot.get_me().await?;
    bot.delete_webhook().send().await?;

    if let Err(e) = bot
        .set_my_commands(vec![BotCommand::new("start", "Show usage")])
        .await
    {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?me.username, "telegram bot connected (webhook cleared)");
    Ok(bot)
}

/// Start the manual long-polling loop.
///
/// Spawns a background task that dispatches one pipeline task per inbound
/// message until the returned `CancellationToken` is cancelled. Duplicate
/// pollers on the same token trigger the arbiter's cooldown instead of
/// killing the loop.
pub fn start_polling(bot: Bot, pipeline: Arc<Pipeline>) -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut arbiter = ConflictArbiter::new();
        let mut offset: i32 = 0;

        loop {
            if cancel_clone.is_cancelled() {
                info!("telegram polling stopped");
                break;
            }

            let result = bot
                .get_updates()
                .offset(offset)
                .timeout(30)
                .allowed_updates(vec![AllowedUpdate::Message])
                .await;

            match result {
                Ok(updates) => {
                    arbiter.record_clean_poll();
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match update.kind {
                            UpdateKind::Message(msg) => dispatch_message(msg, &bot, &pipeline),
                            other => {
                                debug!("ignoring non-message update: {other:?}");
                            },
                        }
                    }
                },
                Err(e) if is_duplicate_poller(&e) => {
                    arbiter.cooldown().await;
                },
                Err(e) => {
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                },
            }
        }
    });

    cancel
}

/// Hand one inbound message to its own task.
///
/// A slow fetch must never stall the polling loop, so each request runs
/// in a spawned task and only the spawn happens here.
fn dispatch_message(msg: Message, bot: &Bot, pipeline: &Arc<Pipeline>) {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text().map(str::to_owned) else {
        debug!(chat_id = chat_id.0, "ignoring non-text message");
        return;
    };

    if is_start_command(&text) {
        let bot = bot.clone();
        tokio::spawn(async move {
            if let Err(e) = bot.send_message(chat_id, GREETING).await {
                warn!(chat_id = chat_id.0, error = %e, "failed to send greeting");
            }
        });
        return;
    }

    debug!(chat_id = chat_id.0, "received telegram message");
    let pipeline = Arc::clone(pipeline);
    tokio::spawn(async move {
        let message = InboundMessage {
            chat_id: chat_id.0.to_string(),
            text,
        };
        let report = pipeline.handle(&message).await;
        info!(
            chat_id = %report.chat_id,
            terminal = ?report.terminal(),
            "request finished"
        );
    });
}

/// Conflict signal: another process instance holds the long-poll
/// connection for this bot token.
fn is_duplicate_poller(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Api(ApiError::TerminatedByOtherGetUpdates)
    )
}

fn is_start_command(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed == "/start" || trimmed.starts_with("/start ") || trimmed.starts_with("/start@")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_command_detection() {
        assert!(is_start_command("/start"));
        assert!(is_start_command("  /start  "));
        assert!(is_start_command("/start@clipferry_bot"));
        assert!(!is_start_command("/starting"));
        assert!(!is_start_command("https://youtu.be/abc"));
    }

    #[test]
    fn conflict_signal_detection() {
        assert!(is_duplicate_poller(&RequestError::Api(
            ApiError::TerminatedByOtherGetUpdates
        )));
        assert!(!is_duplicate_poller(&RequestError::Api(
            ApiError::BotBlocked
        )));
    }
}

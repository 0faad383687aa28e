//! Outbound chat operations used by the search and callback flows.
//!
//! The flows only talk to [`ChatTransport`], so they can be driven by a mock
//! in tests; [`TelegramTransport`] is the real implementation bound to one
//! chat.

use crate::bot::resilient::send_message_resilient;
use crate::bot::views::RenderedItem;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId, ParseMode};
use tracing::warn;

/// Outbound side of a single interaction
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain text message
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Send a rendered result (photo with caption, or HTML text)
    async fn send_item(&self, item: &RenderedItem) -> Result<()>;

    /// Remove the inline keyboard from the message whose button was pressed
    async fn clear_keyboard(&self) -> Result<()>;
}

/// Telegram-backed transport for one chat.
pub struct TelegramTransport {
    bot: Bot,
    chat_id: ChatId,
    source_message: Option<MessageId>,
}

impl TelegramTransport {
    /// Create a transport sending into `chat_id`.
    pub const fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self {
            bot,
            chat_id,
            source_message: None,
        }
    }

    /// Bind the message that carried the pressed button.
    #[must_use]
    pub fn with_source_message(mut self, message_id: MessageId) -> Self {
        self.source_message = Some(message_id);
        self
    }

    async fn send_html(&self, item: &RenderedItem) -> Result<()> {
        let mut req = self
            .bot
            .send_message(self.chat_id, item.caption.clone())
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = item.keyboard() {
            req = req.reply_markup(keyboard);
        }
        req.await?;
        Ok(())
    }

    async fn send_photo(&self, poster_url: &str, item: &RenderedItem) -> Result<()> {
        let url = Url::parse(poster_url)?;
        let mut req = self
            .bot
            .send_photo(self.chat_id, InputFile::url(url))
            .caption(item.caption.clone())
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = item.keyboard() {
            req = req.reply_markup(keyboard);
        }
        req.await?;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, text: &str) -> Result<()> {
        send_message_resilient(&self.bot, self.chat_id, text, None).await?;
        Ok(())
    }

    async fn send_item(&self, item: &RenderedItem) -> Result<()> {
        if let Some(poster_url) = item.poster_url.as_deref() {
            match self.send_photo(poster_url, item).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        poster_url = %poster_url,
                        error = %e,
                        "Failed to send poster; falling back to text"
                    );
                }
            }
        }
        self.send_html(item).await
    }

    async fn clear_keyboard(&self) -> Result<()> {
        let Some(message_id) = self.source_message else {
            return Ok(());
        };
        self.bot
            .edit_message_reply_markup(self.chat_id, message_id)
            .await?;
        Ok(())
    }
}

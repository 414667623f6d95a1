//! Telegram reply sink using teloxide.

use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, ReplyParameters};
use tracing::warn;

use crate::relay::ReplySink;

/// Reply target for one inbound message.
pub struct MessageReply {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
}

impl MessageReply {
    pub fn new(bot: Bot, msg: &Message) -> Self {
        Self {
            bot,
            chat_id: msg.chat.id,
            message_id: msg.id,
        }
    }

    async fn send(&self, text: &str, parse_mode: Option<ParseMode>) -> Result<i64, String> {
        let mut request = self
            .bot
            .send_message(self.chat_id, text)
            .reply_parameters(ReplyParameters::new(self.message_id));

        if let Some(mode) = parse_mode {
            request = request.parse_mode(mode);
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }
}

impl ReplySink for MessageReply {
    async fn send_markdown(&self, text: &str) -> Result<i64, String> {
        self.send(text, Some(ParseMode::Markdown)).await
    }

    async fn send_plain(&self, text: &str) -> Result<i64, String> {
        self.send(text, None).await
    }
}

/// True when Telegram would treat the text as a bot command.
/// Commands are filtered at handler registration; the relay never sees them.
pub fn is_command(text: &str) -> bool {
    text.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_prefix_is_command() {
        assert!(is_command("/start"));
        assert!(is_command("/help@svenskbot"));
    }

    #[test]
    fn test_plain_text_is_not_command() {
        assert!(!is_command("привет"));
        assert!(!is_command(""));
        assert!(!is_command("скажи /start по-шведски"));
    }
}

use async_trait::async_trait;
use gambit_types::{events::ChatLine, game::GameInfo, Result};
use tracing::debug;

/// Chat side of a game. Message wording is entirely up to the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_greetings(&self, info: &GameInfo) -> Result<()>;
    async fn send_abortion_message(&self, info: &GameInfo) -> Result<()>;
    async fn send_goodbyes(&self, info: &GameInfo) -> Result<()>;
    async fn handle_chat_message(&self, info: &GameInfo, line: &ChatLine) -> Result<()>;
}

/// Notifier for bots that keep quiet in chat.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn send_greetings(&self, _info: &GameInfo) -> Result<()> {
        Ok(())
    }

    async fn send_abortion_message(&self, _info: &GameInfo) -> Result<()> {
        Ok(())
    }

    async fn send_goodbyes(&self, _info: &GameInfo) -> Result<()> {
        Ok(())
    }

    async fn handle_chat_message(&self, info: &GameInfo, line: &ChatLine) -> Result<()> {
        debug!(game_id = %info.id, room = %line.room, "{}: {}", line.username, line.text);
        Ok(())
    }
}

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::Bot;
use crate::infrastructure::telegram::{TelegramClient, Update};

/// Pause after a failed `getUpdates` call
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// How long a chat worker waits for more updates before exiting
const CHAT_IDLE: Duration = Duration::from_secs(600);

/// Long-polls Telegram until `shutdown` resolves
///
/// Updates of one chat are handled in arrival order; different chats run
/// concurrently so a slow manual check does not hold up other users.
pub async fn run_polling(client: TelegramClient, bot: Arc<Bot>, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);
    let mut offset: Option<i64> = None;
    let mut chats = ChatQueues::new(bot);
    tracing::info!("Bot handlers added. Starting bot...");

    loop {
        let updates = tokio::select! {
            _ = &mut shutdown => break,
            result = client.get_updates(offset) => result,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    chats.dispatch(update);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch updates");
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    tracing::info!("Polling stopped");
}

/// Chat the update belongs to
fn chat_key(update: &Update) -> Option<i64> {
    if let Some(message) = &update.message {
        Some(message.chat.id)
    } else {
        update
            .callback_query
            .as_ref()
            .map(|query| query.message.as_ref().map_or(query.from.id, |m| m.chat.id))
    }
}

/// One sequential worker per chat, spawned on demand
pub struct ChatQueues {
    bot: Arc<Bot>,
    queues: HashMap<i64, mpsc::UnboundedSender<Update>>,
}

impl ChatQueues {
    pub fn new(bot: Arc<Bot>) -> Self {
        Self {
            bot,
            queues: HashMap::new(),
        }
    }

    /// Queues `update` behind earlier updates of the same chat
    pub fn dispatch(&mut self, update: Update) {
        let Some(chat_id) = chat_key(&update) else {
            tracing::debug!(update_id = update.update_id, "Ignoring update without chat");
            return;
        };

        let update = match self.queues.get(&chat_id) {
            Some(queue) => match queue.send(update) {
                Ok(()) => return,
                // Worker went idle and exited
                Err(mpsc::error::SendError(update)) => update,
            },
            None => update,
        };

        self.queues.retain(|_, queue| !queue.is_closed());
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(update);
        tokio::spawn(chat_worker(Arc::clone(&self.bot), rx));
        self.queues.insert(chat_id, tx);
    }
}

async fn chat_worker(bot: Arc<Bot>, mut rx: mpsc::UnboundedReceiver<Update>) {
    loop {
        match tokio::time::timeout(CHAT_IDLE, rx.recv()).await {
            Ok(Some(update)) => bot.handle_update(update).await,
            Ok(None) => return,
            Err(_) => {
                rx.close();
                while let Ok(update) = rx.try_recv() {
                    bot.handle_update(update).await;
                }
                return;
            }
        }
    }
}

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::bail;
use async_trait::async_trait;
use ipcast_broadcast::{ChatClient, ChatMessage};
use parking_lot::Mutex;

#[derive(Default)]
/// A chat client which keeps every posted message in memory.
pub struct RecordingChatClient {
    messages: Mutex<Vec<ChatMessage>>,
    failing: AtomicBool,
}

impl RecordingChatClient {
    /// A client which rejects every message.
    pub fn failing() -> Self {
        Self {
            messages: Mutex::default(),
            failing: AtomicBool::new(true),
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .map(|message| message.text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatClient for RecordingChatClient {
    async fn post_message(&self, message: &ChatMessage) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("channel_not_found");
        }
        self.messages.lock().push(message.clone());
        Ok(())
    }
}

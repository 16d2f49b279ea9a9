use serde::{Deserialize, Serialize};

pub const GREETING: &str = "Hi! Upload your Excel/CSV file and ask me anything about your data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One chat turn. Every message produced by the client carries either text
/// or a chart reference, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage {
            sender: Sender::User,
            text: Some(text.into()),
            chart: None,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        ChatMessage {
            sender: Sender::Bot,
            text: Some(text.into()),
            chart: None,
        }
    }

    pub fn chart(reference: impl Into<String>) -> Self {
        ChatMessage {
            sender: Sender::Bot,
            text: None,
            chart: Some(reference.into()),
        }
    }

    pub fn greeting() -> Self {
        Self::bot(GREETING)
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// The messages currently on screen. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptStore {
    messages: Vec<ChatMessage>,
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptStore {
    pub fn new() -> Self {
        TranscriptStore {
            messages: vec![ChatMessage::greeting()],
        }
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn reset(&mut self) {
        self.messages = vec![ChatMessage::greeting()];
    }

    /// Swap in a stored snapshot. An empty snapshot falls back to the greeting.
    pub fn replace(&mut self, messages: &[ChatMessage]) {
        if messages.is_empty() {
            self.reset();
        } else {
            self.messages = messages.to_vec();
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

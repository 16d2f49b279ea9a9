use crate::transcript::ChatMessage;

const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

/// Title for a new session, cut to 30 characters with a trailing "..." when longer.
pub fn title_from(text: &str) -> String {
    if text.chars().count() > TITLE_MAX_CHARS {
        let head: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Saved conversations, newest first. Lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    sessions: Vec<Session>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(&mut self, session: Session) {
        self.sessions.insert(0, session);
    }

    pub fn get(&self, index: usize) -> Option<&Session> {
        self.sessions.get(index)
    }

    pub fn set_messages(&mut self, index: usize, messages: &[ChatMessage]) -> bool {
        match self.sessions.get_mut(index) {
            Some(session) => {
                session.messages = messages.to_vec();
                true
            }
            None => false,
        }
    }

    pub fn set_title(&mut self, index: usize, title: String) -> bool {
        match self.sessions.get_mut(index) {
            Some(session) => {
                session.title = title;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<Session> {
        if index < self.sessions.len() {
            Some(self.sessions.remove(index))
        } else {
            None
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

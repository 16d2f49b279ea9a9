use crate::error::GatewayError;
use crate::gateway::ChatReply;
use crate::history::{title_from, HistoryStore, Session};
use crate::menu::MenuVisibility;
use crate::progress::{self, Kind};
use crate::transcript::{ChatMessage, TranscriptStore};
use std::path::Path;

pub const CHAT_ERROR_TEXT: &str = "Error contacting backend.";
pub const UPLOAD_OK_TEXT: &str = "File uploaded! Now you can ask questions about your data.";
pub const UPLOAD_FAILED_TEXT: &str = "Upload failed. Please try again.";
pub const UPLOAD_STATUS_OK: &str = "✅ File uploaded successfully";
pub const UPLOAD_STATUS_FAILED: &str = "❌ Upload failed";

/// Whether the live transcript is mirrored by a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoActiveSession,
    ActiveSession(usize),
}

/// What has to happen to the history after an append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Nothing,
    Create { title: String },
    Overwrite(usize),
}

/// The synchronization rule, as a pure function of the current state and the
/// transcript right after an append.
pub fn sync_action(state: SessionState, transcript: &[ChatMessage]) -> SyncAction {
    match state {
        SessionState::NoActiveSession => match transcript {
            [_, second] if second.is_user() => SyncAction::Create {
                title: title_from(second.text.as_deref().unwrap_or_default()),
            },
            _ => SyncAction::Nothing,
        },
        SessionState::ActiveSession(index) if transcript.len() > 2 => {
            SyncAction::Overwrite(index)
        }
        SessionState::ActiveSession(_) => SyncAction::Nothing,
    }
}

/// Sole owner of the transcript, the history list, the active pointer and
/// menu visibility. Every mutation goes through one of its operations.
#[derive(Debug)]
pub struct SessionController {
    transcript: TranscriptStore,
    history: HistoryStore,
    state: SessionState,
    menu: MenuVisibility,
    uploading: bool,
    chats_in_flight: usize,
    upload_status: Option<&'static str>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        SessionController {
            transcript: TranscriptStore::new(),
            history: HistoryStore::new(),
            state: SessionState::NoActiveSession,
            menu: MenuVisibility::new(),
            uploading: false,
            chats_in_flight: 0,
            upload_status: None,
        }
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    #[allow(dead_code)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_index(&self) -> Option<usize> {
        match self.state {
            SessionState::ActiveSession(index) => Some(index),
            SessionState::NoActiveSession => None,
        }
    }

    pub fn menu(&self) -> &MenuVisibility {
        &self.menu
    }

    pub fn toggle_menu(&mut self, index: usize) {
        if index < self.history.len() {
            self.menu.toggle(index);
        }
    }

    pub fn close_menu(&mut self) {
        self.menu.close();
    }

    pub fn set_menu_pointer_inside(&mut self, inside: bool) {
        self.menu.set_pointer_inside(inside);
    }

    /// Returns whether the press closed the open menu.
    pub fn menu_pointer_pressed(&mut self) -> bool {
        self.menu.pointer_pressed()
    }

    /// Every chart reference still reachable from the transcript or history.
    pub fn chart_references(&self) -> impl Iterator<Item = &str> {
        self.transcript
            .messages()
            .iter()
            .chain(self.history.sessions().iter().flat_map(|s| s.messages.iter()))
            .filter_map(|m| m.chart.as_deref())
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn is_waiting_for_reply(&self) -> bool {
        self.chats_in_flight > 0
    }

    /// Message submission is refused while an upload or a chat request is
    /// outstanding.
    pub fn can_submit(&self) -> bool {
        !self.uploading && self.chats_in_flight == 0
    }

    pub fn upload_status(&self) -> Option<&'static str> {
        self.upload_status
    }

    fn append(&mut self, message: ChatMessage) {
        self.transcript.append(message);
        self.synchronize();
    }

    fn synchronize(&mut self) {
        match sync_action(self.state, self.transcript.messages()) {
            SyncAction::Create { title } => {
                progress::log_with(Kind::Session, format!("new session \"{}\"", title));
                self.history.prepend(Session {
                    title,
                    messages: self.transcript.messages().to_vec(),
                });
                self.menu.on_prepended();
                self.state = SessionState::ActiveSession(0);
            }
            SyncAction::Overwrite(index) => {
                self.history
                    .set_messages(index, self.transcript.messages());
            }
            SyncAction::Nothing => {}
        }
    }

    /// Append the user's message and hand back the text to send to the chat
    /// backend. Blank text, or text entered while a request is outstanding,
    /// is ignored.
    pub fn submit_user_message(&mut self, text: &str) -> Option<String> {
        if text.trim().is_empty() || !self.can_submit() {
            return None;
        }
        self.chats_in_flight += 1;
        self.append(ChatMessage::user(text));
        Some(text.to_string())
    }

    /// Apply a (delayed) chat outcome to whatever conversation is current.
    pub fn apply_chat_result(&mut self, result: Result<ChatReply, GatewayError>) {
        self.chats_in_flight = self.chats_in_flight.saturating_sub(1);
        match result {
            Ok(reply) => {
                progress::log_with(Kind::Chat, "reply received");
                self.append(ChatMessage::bot(reply.reply));
                if let Some(chart) = reply.chart.filter(|c| !c.trim().is_empty()) {
                    self.append(ChatMessage::chart(chart));
                }
            }
            Err(e) => {
                progress::log_with(Kind::Chat, e.to_string());
                self.append(ChatMessage::bot(CHAT_ERROR_TEXT));
            }
        }
    }

    /// Mark an upload of `path` as in flight. Returns false while another
    /// upload or a chat request is outstanding.
    pub fn begin_upload(&mut self, path: &Path) -> bool {
        if !self.can_submit() {
            return false;
        }
        progress::log_with(Kind::Upload, format!("uploading {}", path.display()));
        self.uploading = true;
        self.upload_status = None;
        true
    }

    pub fn apply_upload_result(&mut self, result: Result<(), GatewayError>) {
        self.uploading = false;
        match result {
            Ok(()) => {
                progress::log_with(Kind::Upload, "upload finished");
                self.upload_status = Some(UPLOAD_STATUS_OK);
                self.append(ChatMessage::bot(UPLOAD_OK_TEXT));
            }
            Err(e) => {
                progress::log_with(Kind::Upload, e.to_string());
                self.upload_status = Some(UPLOAD_STATUS_FAILED);
                self.append(ChatMessage::bot(UPLOAD_FAILED_TEXT));
            }
        }
    }

    pub fn select_session(&mut self, index: usize) {
        let Some(session) = self.history.get(index) else {
            return;
        };
        self.transcript.replace(&session.messages);
        self.state = SessionState::ActiveSession(index);
    }

    pub fn new_chat(&mut self) {
        self.transcript.reset();
        self.state = SessionState::NoActiveSession;
    }

    pub fn delete_session(&mut self, index: usize) {
        let Some(removed) = self.history.remove(index) else {
            return;
        };
        progress::log_with(Kind::Session, format!("deleted \"{}\"", removed.title));
        self.menu.on_removed(index);
        match self.state {
            SessionState::ActiveSession(active) if active == index => self.new_chat(),
            SessionState::ActiveSession(active) if active > index => {
                self.state = SessionState::ActiveSession(active - 1);
            }
            _ => {}
        }
    }

    pub fn rename_session(&mut self, index: usize, new_title: &str) {
        let title = new_title.trim();
        if title.is_empty() {
            return;
        }
        if self.history.set_title(index, title.to_string()) {
            progress::log_with(Kind::Session, format!("renamed to \"{}\"", title));
        }
    }
}

mod chart;
mod config;
mod error;
mod gateway;
mod history;
mod menu;
mod progress;
mod session;
mod transcript;

use iced::{
    alignment,
    event::{self, Event as IcedEvent},
    keyboard::{self, Key},
    mouse,
    widget::{
        button, column, container, image, mouse_area, row, scrollable, text, text_input, text_input::Id,
        Column, Space,
    },
    window, Element, Font, Length, Padding, Subscription, Task, Theme,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chart::ChartCache;
use error::GatewayError;
use gateway::{BackendClient, ChatReply};
use session::SessionController;
use transcript::ChatMessage;

const ACTIVITY_LINES: usize = 8;

fn main() -> iced::Result {
    let config = config::Config::load();
    let size = iced::Size::new(config.window.width as f32, config.window.height as f32);
    let min_size = iced::Size::new(
        config.window.min_width as f32,
        config.window.min_height as f32,
    );

    iced::application("Chartbot", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size,
            min_size: Some(min_size),
            position: window::Position::Centered,
            ..Default::default()
        })
        .default_font(Font::MONOSPACE)
        .run_with(move || App::new(config))
}

#[derive(Debug, Clone)]
enum Message {
    InputChanged(String),
    Submit,
    ChatReplied(Result<ChatReply, GatewayError>),
    AttachPathChanged(String),
    AttachSubmit,
    FileDropped(PathBuf),
    UploadFinished(Result<(), GatewayError>),
    NewChat,
    SelectSession(usize),
    ToggleMenu(usize),
    RenameStarted(usize),
    RenameChanged(String),
    RenameCommit,
    RenameCancel,
    DeleteSession(usize),
    MenuPointer(bool),
    PointerPressed,
    ToggleActivity,
    ClearActivity,
    Escape,
}

impl Message {
    /// User interactions that happen outside an open history menu. Raw
    /// pointer presses are judged by where the cursor is instead.
    fn dismisses_menu(&self) -> bool {
        !matches!(
            self,
            Message::MenuPointer(_)
                | Message::PointerPressed
                | Message::ToggleMenu(_)
                | Message::RenameStarted(_)
                | Message::DeleteSession(_)
                | Message::ChatReplied(_)
                | Message::UploadFinished(_)
        )
    }

    fn is_rename(&self) -> bool {
        matches!(
            self,
            Message::RenameChanged(_) | Message::RenameCommit | Message::RenameCancel
        )
    }
}

#[derive(Debug, Clone)]
struct RenameDraft {
    index: usize,
    title: String,
}

struct App {
    controller: SessionController,
    backend: Arc<BackendClient>,
    reply_delay: Duration,
    input_text: String,
    attach_path: String,
    rename: Option<RenameDraft>,
    charts: ChartCache,
    show_activity: bool,
    input_id: Id,
    rename_id: Id,
    transcript_id: scrollable::Id,
}

impl App {
    fn new(config: config::Config) -> (Self, Task<Message>) {
        let backend = BackendClient::with_config(config.backend.base_url);
        progress::log(format!("backend at {}", backend.base_url()));

        let input_id = Id::unique();

        let app = App {
            controller: SessionController::new(),
            backend: Arc::new(backend),
            reply_delay: Duration::from_millis(config.backend.reply_delay_ms),
            input_text: String::new(),
            attach_path: String::new(),
            rename: None,
            charts: ChartCache::new(),
            show_activity: false,
            input_id: input_id.clone(),
            rename_id: Id::unique(),
            transcript_id: scrollable::Id::unique(),
        };

        (app, text_input::focus(input_id))
    }

    fn scroll_to_latest(&self) -> Task<Message> {
        scrollable::snap_to(self.transcript_id.clone(), scrollable::RelativeOffset::END)
    }

    fn start_upload(&mut self, path: PathBuf) -> Task<Message> {
        if path.as_os_str().is_empty() {
            return Task::none();
        }
        if !gateway::is_supported_file(&path) {
            progress::log_with(
                progress::Kind::Upload,
                format!("skipped {}: only .xlsx and .csv files", path.display()),
            );
            return Task::none();
        }
        if !self.controller.begin_upload(&path) {
            return Task::none();
        }

        self.attach_path.clear();
        let backend = self.backend.clone();
        Task::future(async move { Message::UploadFinished(backend.upload(&path).await) })
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        if message.dismisses_menu() {
            self.controller.close_menu();
            if !message.is_rename() {
                self.rename = None;
            }
        }

        match message {
            Message::InputChanged(value) => {
                self.input_text = value;
                Task::none()
            }
            Message::Submit => {
                let Some(prompt) = self.controller.submit_user_message(&self.input_text) else {
                    return Task::none();
                };
                self.input_text.clear();

                let backend = self.backend.clone();
                let delay = self.reply_delay;
                let request = Task::future(async move {
                    let result = gateway::delayed(backend.chat(&prompt), delay).await;
                    Message::ChatReplied(result)
                });

                Task::batch([self.scroll_to_latest(), request])
            }
            Message::ChatReplied(result) => {
                if let Ok(ChatReply {
                    chart: Some(reference),
                    ..
                }) = &result
                {
                    if !reference.trim().is_empty() && !self.charts.remember(reference) {
                        progress::log_with(progress::Kind::Chat, "chart is not an inline image");
                    }
                }
                self.controller.apply_chat_result(result);
                self.scroll_to_latest()
            }
            Message::AttachPathChanged(value) => {
                self.attach_path = value;
                Task::none()
            }
            Message::AttachSubmit => {
                let path = PathBuf::from(self.attach_path.trim());
                self.start_upload(path)
            }
            Message::FileDropped(path) => self.start_upload(path),
            Message::UploadFinished(result) => {
                self.controller.apply_upload_result(result);
                self.scroll_to_latest()
            }
            Message::NewChat => {
                self.controller.new_chat();
                self.charts.retain_live(self.controller.chart_references());
                text_input::focus(self.input_id.clone())
            }
            Message::SelectSession(index) => {
                self.controller.select_session(index);
                self.scroll_to_latest()
            }
            Message::ToggleMenu(index) => {
                self.rename = None;
                self.controller.toggle_menu(index);
                Task::none()
            }
            Message::RenameStarted(index) => {
                self.controller.close_menu();
                match self.controller.history().get(index) {
                    Some(session) => {
                        self.rename = Some(RenameDraft {
                            index,
                            title: session.title.clone(),
                        });
                        text_input::focus(self.rename_id.clone())
                    }
                    None => Task::none(),
                }
            }
            Message::RenameChanged(value) => {
                if let Some(draft) = self.rename.as_mut() {
                    draft.title = value;
                }
                Task::none()
            }
            Message::RenameCommit => {
                if let Some(draft) = self.rename.take() {
                    self.controller.rename_session(draft.index, &draft.title);
                }
                Task::none()
            }
            Message::RenameCancel => {
                self.rename = None;
                Task::none()
            }
            Message::DeleteSession(index) => {
                self.rename = None;
                self.controller.delete_session(index);
                self.controller.close_menu();
                self.charts.retain_live(self.controller.chart_references());
                Task::none()
            }
            Message::ToggleActivity => {
                self.show_activity = !self.show_activity;
                Task::none()
            }
            Message::ClearActivity => {
                progress::clear();
                Task::none()
            }
            Message::MenuPointer(inside) => {
                self.controller.set_menu_pointer_inside(inside);
                Task::none()
            }
            Message::PointerPressed => {
                if self.controller.menu_pointer_pressed() {
                    self.rename = None;
                }
                Task::none()
            }
            // Closing already happened above.
            Message::Escape => Task::none(),
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let window_events = event::listen_with(|event, _status, _id| match event {
            IcedEvent::Window(window::Event::FileDropped(path)) => Some(Message::FileDropped(path)),
            IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Named(keyboard::key::Named::Escape),
                ..
            }) => Some(Message::Escape),
            _ => None,
        });

        // Only listen for presses while a menu is open. Whether a press is
        // outside is decided from the pointer tracking, not capture status.
        let outside_clicks = if self.controller.menu().any_open() {
            event::listen_with(|event, _status, _id| match event {
                IcedEvent::Mouse(mouse::Event::ButtonPressed(_)) => Some(Message::PointerPressed),
                _ => None,
            })
        } else {
            Subscription::none()
        };

        Subscription::batch([window_events, outside_clicks])
    }

    fn view_sidebar(&self) -> Element<Message> {
        let new_chat = button(text("+ New Chat").size(16))
            .on_press(Message::NewChat)
            .padding(10)
            .width(Length::Fill)
            .style(button::primary);

        let mut entries = Column::new().spacing(6);
        let history = self.controller.history();
        if history.is_empty() {
            entries = entries.push(text("No chats yet").size(14));
        }

        for (index, session) in history.sessions().iter().enumerate() {
            let style = if self.controller.active_index() == Some(index) {
                button::primary
            } else {
                button::secondary
            };

            let title = button(text(session.title.as_str()).size(14))
                .on_press(Message::SelectSession(index))
                .padding(8)
                .width(Length::Fill)
                .style(style);
            let options = mouse_area(
                button(text("⋮").size(14))
                    .on_press(Message::ToggleMenu(index))
                    .padding(8)
                    .style(button::text),
            )
            .on_enter(Message::MenuPointer(true))
            .on_exit(Message::MenuPointer(false));

            let mut entry = column![row![title, options].spacing(4)].spacing(4);

            if self.controller.menu().is_open(index) {
                let actions = container(
                    column![
                        button(text("Rename").size(14))
                            .on_press(Message::RenameStarted(index))
                            .width(Length::Fill)
                            .style(button::text),
                        button(text("Delete").size(14))
                            .on_press(Message::DeleteSession(index))
                            .width(Length::Fill)
                            .style(button::danger),
                    ]
                    .spacing(2),
                )
                .padding(4)
                .style(container::rounded_box);

                entry = entry.push(
                    mouse_area(actions)
                        .on_enter(Message::MenuPointer(true))
                        .on_exit(Message::MenuPointer(false)),
                );
            }

            if let Some(draft) = self.rename.as_ref().filter(|d| d.index == index) {
                entry = entry.push(
                    row![
                        text_input("New title", &draft.title)
                            .id(self.rename_id.clone())
                            .on_input(Message::RenameChanged)
                            .on_submit(Message::RenameCommit)
                            .padding(6)
                            .size(14),
                        button(text("Cancel").size(12))
                            .on_press(Message::RenameCancel)
                            .style(button::text),
                    ]
                    .spacing(4),
                );
            }

            entries = entries.push(entry);
        }

        container(
            column![
                text("Chartbot").size(24),
                new_chat,
                text("History").size(18),
                scrollable(entries).height(Length::Fill),
            ]
            .spacing(14),
        )
        .padding(16)
        .width(Length::Fixed(300.0))
        .height(Length::Fill)
        .style(container::rounded_box)
        .into()
    }

    fn view_message<'a>(&'a self, message: &'a ChatMessage) -> Element<'a, Message> {
        let mut body = Column::new().spacing(6);
        body = body.push(text(if message.is_user() { "You" } else { "Bot" }).size(12));

        if let Some(content) = message.text.as_deref() {
            body = body.push(text(content).size(15));
        }
        if let Some(reference) = message.chart.as_deref() {
            body = match self.charts.get(reference) {
                Some(handle) => body.push(image(handle.clone()).width(Length::Fixed(480.0))),
                None => body.push(text(reference).size(13)),
            };
        }

        let bubble = container(body)
            .padding(12)
            .max_width(620.0)
            .style(container::rounded_box);

        let align = if message.is_user() {
            alignment::Horizontal::Right
        } else {
            alignment::Horizontal::Left
        };

        container(bubble).width(Length::Fill).align_x(align).into()
    }

    fn view_input_bar(&self) -> Element<Message> {
        let uploading = self.controller.is_uploading();

        let mut attach = text_input("Drop or type a .xlsx / .csv path", &self.attach_path)
            .padding(12)
            .size(14)
            .width(Length::FillPortion(2));
        if self.controller.can_submit() {
            attach = attach
                .on_input(Message::AttachPathChanged)
                .on_submit(Message::AttachSubmit);
        }

        let mut input = text_input("Type your question...", &self.input_text)
            .id(self.input_id.clone())
            .padding(12)
            .size(16)
            .width(Length::FillPortion(3));
        if !uploading {
            input = input
                .on_input(Message::InputChanged)
                .on_submit(Message::Submit);
        }

        let can_send = self.controller.can_submit() && !self.input_text.trim().is_empty();
        let send = button(text("Send").size(16))
            .on_press_maybe(can_send.then_some(Message::Submit))
            .padding(12)
            .style(button::primary);

        let status = if uploading {
            "Uploading..."
        } else if self.controller.is_waiting_for_reply() {
            "Waiting for reply..."
        } else {
            self.controller.upload_status().unwrap_or("")
        };

        column![
            row![attach, input, send]
                .spacing(8)
                .align_y(alignment::Vertical::Center),
            text(status).size(14),
        ]
        .spacing(6)
        .into()
    }

    fn view_activity(&self) -> Element<Message> {
        let toggle = button(text(if self.show_activity { "Activity ▾" } else { "Activity ▸" }).size(12))
            .on_press(Message::ToggleActivity)
            .style(button::text);

        if !self.show_activity {
            return toggle.into();
        }

        let mut lines = Column::new().spacing(2);
        for entry in progress::recent(ACTIVITY_LINES) {
            lines = lines.push(text(format!("[{}] {}", entry.kind.label(), entry.text)).size(12));
        }

        column![
            row![
                toggle,
                Space::with_width(Length::Fill),
                button(text("Clear").size(12))
                    .on_press(Message::ClearActivity)
                    .style(button::text),
            ],
            lines,
        ]
        .spacing(4)
        .into()
    }

    fn view(&self) -> Element<Message> {
        let mut messages = Column::new().spacing(14).padding(Padding::from([10, 16]));
        for message in self.controller.transcript().messages() {
            messages = messages.push(self.view_message(message));
        }

        let transcript = scrollable(messages)
            .id(self.transcript_id.clone())
            .height(Length::Fill);

        let chat = column![transcript, self.view_input_bar(), self.view_activity()]
            .spacing(10)
            .padding(16)
            .width(Length::Fill);

        row![self.view_sidebar(), chat]
            .height(Length::Fill)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNightLight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_actions_dismiss_menu() {
        for message in [
            Message::InputChanged("rows?".to_string()),
            Message::Submit,
            Message::AttachPathChanged("/tmp/a.csv".to_string()),
            Message::AttachSubmit,
            Message::FileDropped(PathBuf::from("/tmp/a.csv")),
            Message::NewChat,
            Message::SelectSession(0),
            Message::RenameChanged("x".to_string()),
            Message::RenameCommit,
            Message::RenameCancel,
            Message::ToggleActivity,
            Message::ClearActivity,
            Message::Escape,
        ] {
            assert!(message.dismisses_menu(), "{:?} should close the menu", message);
        }
    }

    #[test]
    fn test_menu_actions_and_results_keep_menu() {
        for message in [
            Message::ToggleMenu(0),
            Message::RenameStarted(0),
            Message::DeleteSession(0),
            Message::MenuPointer(true),
            Message::PointerPressed,
            Message::ChatReplied(Err(GatewayError::ChatRequestFailed("x".to_string()))),
            Message::UploadFinished(Ok(())),
        ] {
            assert!(!message.dismisses_menu(), "{:?} should not close the menu", message);
        }
    }

    #[test]
    fn test_rename_messages_keep_draft() {
        assert!(Message::RenameChanged("x".to_string()).is_rename());
        assert!(Message::RenameCommit.is_rename());
        assert!(!Message::SelectSession(0).is_rename());
    }
}

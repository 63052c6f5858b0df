use chrono::Local;
use drafter_core::{
    Command, DraftState, DrafterClient, Driver, Event, SessionId, Settings, Transition,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

/// Canned prompts offered while the conversation is empty.
pub const QUICK_ACTIONS: [&str; 4] = [
    "Write a short story about a robot",
    "Create a to-do list for today",
    "Write a paragraph about artificial intelligence",
    "Save this document as 'my_document'",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Document,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation + document, owned by the reducer
    pub state: DraftState,
    pub driver: Driver<DrafterClient>,
    pub server_url: String,

    // Chat input
    pub input: String,
    pub cursor: usize, // cursor position in input (chars)

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Document view
    pub document_scroll: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub document_area: Option<Rect>,
}

impl App {
    pub fn new(settings: &Settings, session: SessionId, events: UnboundedSender<Event>) -> Self {
        let client = DrafterClient::new(&settings.server_url);
        let driver = Driver::new(client, session, settings.timing, events);

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Chat,

            state: DraftState::new(settings.ordering),
            driver,
            server_url: settings.server_url.clone(),

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            document_scroll: 0,

            animation_frame: 0,

            chat_area: None,
            document_area: None,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        self.driver.session()
    }

    /// First document fetch, health probe and the repeating poll.
    pub fn start(&mut self) {
        tracing::info!(session = %self.session_id(), server = %self.server_url, "Session started");
        self.dispatch(Event::Started);
        self.driver.start_polling();
    }

    pub fn shutdown(&mut self) {
        self.driver.shutdown();
    }

    /// Feed an event through the state machine and run whatever it asks for.
    /// Returns the commands that were handed to the driver.
    pub fn dispatch(&mut self, event: Event) -> Vec<Command> {
        let state = std::mem::take(&mut self.state);
        let Transition { state, commands } = state.apply(event, Local::now());
        self.state = state;
        self.driver.run_all(commands.iter().cloned());
        commands
    }

    pub fn submit_input(&mut self) {
        let text = self.input.clone();
        self.send_message(text);
    }

    pub fn send_quick_action(&mut self, index: usize) {
        if !self.state.messages().is_empty() {
            return;
        }
        if let Some(text) = QUICK_ACTIONS.get(index) {
            self.send_message(text.to_string());
        }
    }

    fn send_message(&mut self, text: String) {
        let commands = self.dispatch(Event::Submit(text));
        if commands.iter().any(|c| matches!(c, Command::SendChat { .. })) {
            self.input.clear();
            self.cursor = 0;
            self.scroll_chat_to_bottom();
        }
    }

    pub fn refresh_document(&mut self) {
        self.dispatch(Event::RefreshRequested);
    }

    pub fn clear_session(&mut self) {
        self.dispatch(Event::ClearRequested);
    }

    /// Network completions and timer events coming back from the driver.
    pub fn handle_sync(&mut self, event: Event) {
        let chat_done = matches!(event, Event::ChatCompleted(_) | Event::SessionCleared(Err(_)));
        self.dispatch(event);
        if chat_done {
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.state.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn can_edit(&self) -> bool {
        !self.state.is_loading()
    }

    /// Scroll chat so the newest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;

        for msg in self.state.messages() {
            total_lines = total_lines.saturating_add(1); // Header line ("You · 3:04:05 PM")
            for line in msg.content.lines() {
                total_lines = total_lines.saturating_add(wrapped_lines(line, wrap_width));
            }
            if !msg.tools_used.is_empty() {
                total_lines = total_lines.saturating_add(1);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.state.is_loading() {
            total_lines = total_lines.saturating_add(2); // "Drafter" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        // Paragraph scroll offsets are u16; very long logs stop at the limit
        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_focused_down(&mut self, amount: u16) {
        match self.focus {
            FocusPane::Chat => self.chat_scroll = self.chat_scroll.saturating_add(amount),
            FocusPane::Document => {
                self.document_scroll = self.document_scroll.saturating_add(amount)
            }
        }
    }

    pub fn scroll_focused_up(&mut self, amount: u16) {
        match self.focus {
            FocusPane::Chat => self.chat_scroll = self.chat_scroll.saturating_sub(amount),
            FocusPane::Document => {
                self.document_scroll = self.document_scroll.saturating_sub(amount)
            }
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Chat => FocusPane::Document,
            FocusPane::Document => FocusPane::Chat,
        };
    }
}

pub(crate) fn wrapped_lines(line: &str, width: usize) -> usize {
    // Use character count, not byte length, for proper UTF-8 handling
    let char_count = line.chars().count();
    if char_count == 0 {
        1
    } else {
        (char_count - 1) / width.max(1) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drafter_core::{ChatReply, Config, MessageKind};
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let settings = Config {
            // Nothing listens here; spawned requests fail quietly
            server_url: Some("http://127.0.0.1:9".into()),
            ..Config::new()
        }
        .settings();
        let session = SessionId::parse("apptest01").unwrap();
        (App::new(&settings, session, tx), rx)
    }

    #[tokio::test]
    async fn test_submit_clears_input_when_accepted() {
        let (mut app, _rx) = test_app();
        app.input = "Write a poem".into();
        app.cursor = 12;

        app.submit_input();

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.state.is_loading());
        assert_eq!(app.state.messages().len(), 1);
        assert!(!app.can_edit());
    }

    #[tokio::test]
    async fn test_blank_submit_keeps_input() {
        let (mut app, _rx) = test_app();
        app.input = "   ".into();

        app.submit_input();

        assert_eq!(app.input, "   ");
        assert!(app.state.messages().is_empty());
    }

    #[tokio::test]
    async fn test_quick_action_only_when_log_empty() {
        let (mut app, _rx) = test_app();

        app.send_quick_action(1);
        assert_eq!(app.state.messages()[0].content, "Create a to-do list for today");

        app.handle_sync(Event::ChatCompleted(Ok(ChatReply {
            response: "Here you go".into(),
            tools_used: vec![],
            document_content: Some("- groceries".into()),
        })));
        assert_eq!(app.state.document().content(), "- groceries");

        app.send_quick_action(0);
        assert_eq!(app.state.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_quick_action_ignored() {
        let (mut app, _rx) = test_app();
        app.send_quick_action(QUICK_ACTIONS.len());
        assert!(app.state.messages().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_returns_commands() {
        let (mut app, _rx) = test_app();
        let commands = app.dispatch(Event::RefreshRequested);
        assert!(commands.contains(&Command::CheckHealth));
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::FetchDocument { .. })));
        assert!(app.state.document().is_empty());
    }

    #[tokio::test]
    async fn test_chat_error_unlocks_input() {
        let (mut app, _rx) = test_app();
        app.input = "hello".into();
        app.submit_input();
        app.handle_sync(Event::ChatCompleted(Err("connection refused".into())));

        let last = app.state.messages().last().unwrap();
        assert_eq!(last.kind, MessageKind::Error);
        assert_eq!(last.content, "Error: connection refused");
        assert!(app.can_edit());
    }

    #[test]
    fn test_wrapped_lines() {
        assert_eq!(wrapped_lines("", 10), 1);
        assert_eq!(wrapped_lines("0123456789", 10), 1);
        assert_eq!(wrapped_lines("01234567890", 10), 2);
        assert_eq!(wrapped_lines("ééééé", 5), 1);
        assert_eq!(wrapped_lines(&"x".repeat(200_000), 1), 200_000);
    }

    #[tokio::test]
    async fn test_scroll_follows_new_messages() {
        let (mut app, _rx) = test_app();
        app.chat_height = 4;
        app.chat_width = 40;
        for i in 0..3 {
            app.input = format!("message {}", i);
            app.submit_input();
            app.handle_sync(Event::ChatCompleted(Ok(ChatReply {
                response: "ok".into(),
                tools_used: vec!["update_document".into()],
                document_content: None,
            })));
        }
        // 3 user messages * 3 lines + 3 ai messages * 4 lines
        assert_eq!(app.chat_scroll, 21 - 4);
    }

    #[tokio::test]
    async fn test_scroll_saturates_on_huge_reply() {
        let (mut app, _rx) = test_app();
        app.chat_height = 10;
        app.chat_width = 40;
        app.input = "Make it long".into();
        app.submit_input();
        app.handle_sync(Event::ChatCompleted(Ok(ChatReply {
            response: "y\n".repeat(70_000),
            tools_used: vec![],
            document_content: None,
        })));

        assert_eq!(app.chat_scroll, u16::MAX - 10);
        assert_eq!(app.state.messages().len(), 2);
    }
}

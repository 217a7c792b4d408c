//! Root container: panel toggling, refresh propagation, background requests

use crate::api::BackendClient;
use crate::config::Config;
use crate::events::{AppEvent, Panel};
use crate::ui::history::HistoryAction;
use crate::ui::{ChatPanel, HistoryPanel};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Tabs},
    Frame,
};
use tokio::sync::mpsc;

pub struct App {
    client: BackendClient,
    chat: ChatPanel,
    history: HistoryPanel,
    active_panel: Panel,
    refresh_counter: u64,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    should_exit: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut chat = ChatPanel::new();
        chat.set_focus(true);

        Self {
            client: BackendClient::new(config.backend_url.clone()),
            chat,
            history: HistoryPanel::new(),
            active_panel: Panel::Chat,
            refresh_counter: 0,
            events_tx,
            events_rx,
            should_exit: false,
        }
    }

    /// Handle a key event from the terminal
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_exit = true;
            return;
        }

        // Esc quits, except while the history clear confirmation is armed
        // (there it declines the confirmation).
        if key.code == KeyCode::Esc && !self.history.is_confirming_clear() {
            self.should_exit = true;
            return;
        }

        if key.code == KeyCode::Tab {
            self.active_panel = self.active_panel.toggled();
            self.chat.set_focus(self.active_panel == Panel::Chat);
            return;
        }

        match self.active_panel {
            Panel::Chat => {
                if let Some(prompt) = self.chat.handle_key(key) {
                    self.spawn_ask(prompt);
                }
            }
            Panel::History => match self.history.handle_key(key) {
                HistoryAction::Load => self.spawn_history_load(),
                HistoryAction::ClearAll => self.spawn_history_clear(),
                HistoryAction::None => {}
            },
        }
    }

    /// Drain finished background requests and trigger any load the history
    /// panel is due for. Called once per draw tick.
    pub fn on_tick(&mut self) {
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            }
        }

        // The counter comparison inside maybe_load makes this idempotent
        // across ticks; only a genuinely new value starts a fetch.
        if self.active_panel == Panel::History && self.history.maybe_load(self.refresh_counter) {
            self.spawn_history_load();
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::AskFinished(result) => {
                if self.chat.on_response(result) {
                    // A new conversation was stored server-side; nudge the
                    // history panel to refetch next time it is visible.
                    self.refresh_counter += 1;
                }
            }
            AppEvent::HistoryLoaded(result) => self.history.on_loaded(result),
            AppEvent::HistoryCleared(result) => self.history.on_cleared(result),
        }
    }

    fn spawn_ask(&self, prompt: String) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.ask(&prompt).await;
            let _ = tx.send(AppEvent::AskFinished(result));
        });
    }

    fn spawn_history_load(&self) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.list_conversations().await;
            let _ = tx.send(AppEvent::HistoryLoaded(result));
        });
    }

    fn spawn_history_clear(&self) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.clear_conversations().await;
            let _ = tx.send(AppEvent::HistoryCleared(result));
        });
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(8)])
            .split(frame.size());

        let titles = [Panel::Chat, Panel::History]
            .iter()
            .map(|p| p.display_name())
            .collect::<Vec<_>>();
        let selected = match self.active_panel {
            Panel::Chat => 0,
            Panel::History => 1,
        };
        let tabs = Tabs::new(titles)
            .select(selected)
            .block(Block::default().borders(Borders::ALL).title("promptline"))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, chunks[0]);

        match self.active_panel {
            Panel::Chat => frame.render_widget(&self.chat, chunks[1]),
            Panel::History => frame.render_widget(&self.history, chunks[1]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;

    fn test_app() -> App {
        let config = Config {
            backend_url: "http://127.0.0.1:1".to_string(),
            home_dir: std::env::temp_dir(),
        };
        App::new(&config)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn successful_ask_bumps_refresh_counter() {
        let mut app = test_app();
        app.chat.submit("hello");
        app.events_tx
            .send(AppEvent::AskFinished(Ok("hi".to_string())))
            .unwrap();

        app.on_tick();
        assert_eq!(app.refresh_counter, 1);
        assert_eq!(app.chat.messages().len(), 2);
    }

    #[tokio::test]
    async fn failed_ask_does_not_bump_refresh_counter() {
        let mut app = test_app();
        app.chat.submit("hello");
        app.events_tx
            .send(AppEvent::AskFinished(Err(ApiError::Backend(
                "boom".to_string(),
            ))))
            .unwrap();

        app.on_tick();
        assert_eq!(app.refresh_counter, 0);
        assert_eq!(app.chat.error(), Some("boom"));
    }

    #[tokio::test]
    async fn tab_toggles_active_panel() {
        let mut app = test_app();
        assert_eq!(app.active_panel, Panel::Chat);
        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.active_panel, Panel::History);
        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.active_panel, Panel::Chat);
    }

    #[tokio::test]
    async fn history_tick_loads_once_per_counter_value() {
        let mut app = test_app();
        app.handle_key(press(KeyCode::Tab));

        app.on_tick();
        assert!(app.history.is_loading());
        app.history.on_loaded(Ok(vec![]));

        // Same counter value on subsequent ticks: no new load.
        app.on_tick();
        assert!(!app.history.is_loading());
    }

    #[tokio::test]
    async fn late_results_still_apply_after_panel_switch() {
        let mut app = test_app();
        app.chat.submit("hello");
        app.handle_key(press(KeyCode::Tab));

        app.events_tx
            .send(AppEvent::AskFinished(Ok("late".to_string())))
            .unwrap();
        app.on_tick();

        assert_eq!(app.chat.messages().len(), 2);
        assert_eq!(app.refresh_counter, 1);
    }

    #[tokio::test]
    async fn ctrl_c_requests_exit() {
        let mut app = test_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_exit());
    }
}

//! Chat panel: session transcript plus prompt composer

use crate::api::{ApiError, MAX_PROMPT_LEN};
use crate::ui::composer::{ComposerResult, PromptComposer};
use crate::ui::wrap_text;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use uuid::Uuid;

/// Author of a session message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// A client-local chat bubble. Lives only in the current session's memory;
/// never persisted client-side.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Message {
    fn new(role: MessageRole, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Chat panel state. The message list is append-only and insertion-ordered;
/// at most one ask request is in flight at a time.
pub struct ChatPanel {
    messages: Vec<Message>,
    composer: PromptComposer,
    in_flight: bool,
    error: Option<String>,
}

impl ChatPanel {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            composer: PromptComposer::new("Type your message..."),
            in_flight: false,
            error: None,
        }
    }

    /// Handle a key event. Returns the prompt to send when the user
    /// submitted one that passes the guards.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<String> {
        if key.code == KeyCode::Char('l') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.clear();
            return None;
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => self.submit(&text),
            ComposerResult::None => None,
        }
    }

    /// Guarded submit. Returns the trimmed prompt when a request should be
    /// issued; `None` means no network call and no message-list mutation.
    pub fn submit(&mut self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        if self.in_flight {
            tracing::debug!("ask already in flight, dropping submit");
            return None;
        }

        if trimmed.chars().count() > MAX_PROMPT_LEN {
            self.error = Some(format!("Prompt too long (max {} characters)", MAX_PROMPT_LEN));
            return None;
        }

        self.error = None;
        self.messages
            .push(Message::new(MessageRole::User, trimmed.to_string()));
        self.in_flight = true;
        Some(trimmed.to_string())
    }

    /// Apply the result of the ask request. Returns true on success so the
    /// caller can bump the history refresh counter.
    pub fn on_response(&mut self, result: Result<String, ApiError>) -> bool {
        self.in_flight = false;
        match result {
            Ok(text) => {
                self.messages.push(Message::new(MessageRole::Assistant, text));
                true
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "ask request failed");
                self.messages
                    .push(Message::new(MessageRole::Assistant, format!("Error: {}", message)));
                self.error = Some(message);
                false
            }
        }
    }

    /// Reset the visible transcript and error banner. Purely a view reset;
    /// server-side history is untouched.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.error = None;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.composer.set_focus(has_focus);
    }

    /// Render a single message into lines
    fn render_message(&self, message: &Message, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let role_label = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "ai",
        };
        let timestamp = message.timestamp.format("%H:%M:%S").to_string();
        let header = format!("[{}] {} {}", role_label, timestamp, "─".repeat(20));

        lines.push(Line::from(vec![Span::styled(
            header,
            Style::default().fg(Color::DarkGray),
        )]));

        let style = match message.role {
            MessageRole::User => Style::default().fg(Color::Blue),
            MessageRole::Assistant => Style::default().fg(Color::Green),
        };
        for content_line in wrap_text(&message.content, width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, style),
            ]));
        }

        lines
    }
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &ChatPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let error_height = if self.error.is_some() { 1 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),
                Constraint::Length(error_height),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_transcript(chunks[0], buf);

        if let Some(ref error) = self.error {
            let banner = Line::from(vec![Span::styled(
                format!("✗ {}", error),
                Style::default().fg(Color::Red),
            )]);
            buf.set_line(chunks[1].x, chunks[1].y, &banner, chunks[1].width);
        }

        (&self.composer).render(chunks[2], buf);
    }
}

impl ChatPanel {
    fn render_transcript(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Conversation");
        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.messages.is_empty() && !self.in_flight {
            let welcome_lines = vec![
                Line::from(vec![Span::styled(
                    "Start a conversation",
                    Style::default().fg(Color::Green),
                )]),
                Line::from(vec![Span::raw("")]),
                Line::from(vec![Span::styled(
                    "Ask anything - questions, creative writing, analysis, coding.",
                    Style::default().fg(Color::Gray),
                )]),
                Line::from(vec![Span::styled(
                    "Enter sends, Ctrl+L clears, Tab switches to history.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];
            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let mut all_lines: Vec<Line> = Vec::new();
        for message in &self.messages {
            all_lines.append(&mut self.render_message(message, inner_area.width));
            all_lines.push(Line::from(vec![Span::raw("")]));
        }

        if self.in_flight {
            all_lines.push(Line::from(vec![Span::styled(
                "AI is thinking...",
                Style::default().fg(Color::Yellow),
            )]));
        }

        // Show the tail of the transcript, newest lines anchored at bottom
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

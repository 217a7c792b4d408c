//! History panel: server-persisted conversations with refresh and bulk delete

use crate::api::{format_timestamp, ApiError, Conversation};
use crate::ui::{truncate, wrap_text};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const PROMPT_PREVIEW_CHARS: usize = 150;
const RESPONSE_PREVIEW_CHARS: usize = 200;

/// Requests the panel asks the root container to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    None,
    Load,
    ClearAll,
}

/// History panel state. One load and one clear may each be in flight at a
/// time; duplicates are dropped, not queued.
pub struct HistoryPanel {
    conversations: Vec<Conversation>,
    loading: bool,
    clearing: bool,
    error: Option<String>,
    confirm_clear: bool,
    last_refresh: Option<u64>,
    scroll: usize,
}

impl HistoryPanel {
    pub fn new() -> Self {
        Self {
            conversations: Vec::new(),
            loading: false,
            clearing: false,
            error: None,
            confirm_clear: false,
            last_refresh: None,
            scroll: 0,
        }
    }

    /// Decide whether a fetch should be issued for this refresh counter
    /// value. The first call always loads; a load already in flight or a
    /// counter value identical to the last one acted on suppresses the
    /// fetch.
    pub fn maybe_load(&mut self, refresh: u64) -> bool {
        if self.loading {
            tracing::debug!("history load already in flight, skipping");
            return false;
        }

        if self.last_refresh == Some(refresh) {
            return false;
        }

        self.last_refresh = Some(refresh);
        self.begin_load()
    }

    /// Manual refresh: bypasses the counter dedup but not the single-flight
    /// guard.
    pub fn force_load(&mut self) -> bool {
        if self.loading {
            tracing::debug!("history load already in flight, skipping manual refresh");
            return false;
        }
        self.begin_load()
    }

    fn begin_load(&mut self) -> bool {
        self.loading = true;
        self.error = None;
        true
    }

    /// Apply the result of a load. Success replaces the cache; failure
    /// keeps the previous cache untouched.
    pub fn on_loaded(&mut self, result: Result<Vec<Conversation>, ApiError>) {
        self.loading = false;
        match result {
            Ok(conversations) => {
                self.conversations = conversations;
                self.scroll = 0;
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "history load failed");
                self.error = Some(message);
            }
        }
    }

    /// Start the clear-all flow once confirmed. Returns true when the
    /// DELETE should be issued.
    fn begin_clear(&mut self) -> bool {
        self.confirm_clear = false;
        if self.clearing {
            tracing::debug!("history clear already in flight, skipping");
            return false;
        }
        self.clearing = true;
        self.error = None;
        true
    }

    /// Apply the result of the clear-all. Success empties the cache;
    /// failure leaves it untouched.
    pub fn on_cleared(&mut self, result: Result<(), ApiError>) {
        self.clearing = false;
        match result {
            Ok(()) => {
                self.conversations.clear();
                self.scroll = 0;
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "history clear failed");
                self.error = Some(message);
            }
        }
    }

    /// Handle a key event, translating it into a request for the root
    /// container where one applies.
    pub fn handle_key(&mut self, key: KeyEvent) -> HistoryAction {
        if self.confirm_clear {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    if self.begin_clear() {
                        HistoryAction::ClearAll
                    } else {
                        HistoryAction::None
                    }
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirm_clear = false;
                    HistoryAction::None
                }
                _ => HistoryAction::None,
            };
        }

        match key.code {
            KeyCode::Char('r') => {
                if self.force_load() {
                    HistoryAction::Load
                } else {
                    HistoryAction::None
                }
            }
            KeyCode::Char('d') => {
                if !self.conversations.is_empty() && !self.clearing {
                    self.confirm_clear = true;
                }
                HistoryAction::None
            }
            KeyCode::Up => {
                self.scroll = self.scroll.saturating_sub(1);
                HistoryAction::None
            }
            KeyCode::Down => {
                self.scroll = self.scroll.saturating_add(1);
                HistoryAction::None
            }
            _ => HistoryAction::None,
        }
    }

    pub fn count(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_clearing(&self) -> bool {
        self.clearing
    }

    pub fn is_confirming_clear(&self) -> bool {
        self.confirm_clear
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }
}

impl Default for HistoryPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &HistoryPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!("Conversation History ({})", self.count());
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner_area = block.inner(area);
        block.render(area, buf);

        let mut all_lines: Vec<Line> = Vec::new();

        if self.confirm_clear {
            all_lines.push(Line::from(vec![Span::styled(
                "Clear all conversations? This cannot be undone. (y/n)",
                Style::default().fg(Color::Red),
            )]));
            all_lines.push(Line::from(vec![Span::raw("")]));
        }

        if let Some(ref error) = self.error {
            all_lines.push(Line::from(vec![Span::styled(
                format!("✗ {}", error),
                Style::default().fg(Color::Red),
            )]));
            all_lines.push(Line::from(vec![Span::styled(
                "Press r to retry.",
                Style::default().fg(Color::DarkGray),
            )]));
            all_lines.push(Line::from(vec![Span::raw("")]));
        }

        if self.loading {
            all_lines.push(Line::from(vec![Span::styled(
                "Loading conversations...",
                Style::default().fg(Color::Yellow),
            )]));
        } else if self.clearing {
            all_lines.push(Line::from(vec![Span::styled(
                "Clearing conversations...",
                Style::default().fg(Color::Yellow),
            )]));
        } else if self.conversations.is_empty() && self.error.is_none() {
            all_lines.push(Line::from(vec![Span::styled(
                "No conversations yet",
                Style::default().fg(Color::Gray),
            )]));
            all_lines.push(Line::from(vec![Span::styled(
                "Start chatting to see your conversation history here.",
                Style::default().fg(Color::DarkGray),
            )]));
        } else {
            let width = inner_area.width.saturating_sub(2) as usize;
            for conversation in &self.conversations {
                all_lines.append(&mut render_entry(conversation, width));
                all_lines.push(Line::from(vec![Span::raw("")]));
            }
            all_lines.push(Line::from(vec![Span::styled(
                format!(
                    "{} conversation{} stored — r refresh, d delete all",
                    self.count(),
                    if self.count() == 1 { "" } else { "s" }
                ),
                Style::default().fg(Color::DarkGray),
            )]));
        }

        let height = inner_area.height as usize;
        let max_scroll = all_lines.len().saturating_sub(height);
        let start = self.scroll.min(max_scroll);
        for (i, line) in all_lines[start..].iter().take(height).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Render one stored conversation into preview lines
fn render_entry(conversation: &Conversation, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    lines.push(Line::from(vec![Span::styled(
        format_timestamp(&conversation.timestamp),
        Style::default().fg(Color::DarkGray),
    )]));

    lines.push(Line::from(vec![Span::styled(
        "You asked:",
        Style::default().fg(Color::Blue),
    )]));
    for line in wrap_text(&truncate(&conversation.prompt, PROMPT_PREVIEW_CHARS), width) {
        lines.push(Line::from(vec![Span::raw("  "), Span::raw(line)]));
    }

    lines.push(Line::from(vec![Span::styled(
        "AI responded:",
        Style::default().fg(Color::Green),
    )]));
    for line in wrap_text(
        &truncate(&conversation.response, RESPONSE_PREVIEW_CHARS),
        width,
    ) {
        lines.push(Line::from(vec![Span::raw("  "), Span::raw(line)]));
    }

    lines
}

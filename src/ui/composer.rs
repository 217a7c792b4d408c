use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the prompt composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    None,
}

/// Single-line prompt input with cursor editing
#[derive(Debug, Clone)]
pub struct PromptComposer {
    content: String,
    cursor_position: usize,
    placeholder: String,
    has_focus: bool,
}

impl PromptComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor_position: 0,
            placeholder: placeholder.into(),
            has_focus: true,
        }
    }

    /// Handle key input. Enter submits the current content; editing keys
    /// mutate it in place. Submission does not trim — the panel owns the
    /// whitespace/empty policy.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if !self.content.is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor_position = 0;
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Char(c) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    self.insert_char(c);
                }
            }
            KeyCode::Backspace => {
                if self.cursor_position > 0 {
                    let prev = self.prev_boundary();
                    self.content.remove(prev);
                    self.cursor_position = prev;
                }
            }
            KeyCode::Delete => {
                if self.cursor_position < self.content.len() {
                    self.content.remove(self.cursor_position);
                }
            }
            KeyCode::Left => {
                if self.cursor_position > 0 {
                    self.cursor_position = self.prev_boundary();
                }
            }
            KeyCode::Right => {
                if self.cursor_position < self.content.len() {
                    self.cursor_position = self.next_boundary();
                }
            }
            KeyCode::Home => {
                self.cursor_position = 0;
            }
            KeyCode::End => {
                self.cursor_position = self.content.len();
            }
            _ => {}
        }

        ComposerResult::None
    }

    fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    /// Byte index of the previous char boundary before the cursor.
    fn prev_boundary(&self) -> usize {
        self.content[..self.cursor_position]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Byte index of the next char boundary after the cursor.
    fn next_boundary(&self) -> usize {
        self.content[self.cursor_position..]
            .chars()
            .next()
            .map(|c| self.cursor_position + c.len_utf8())
            .unwrap_or(self.content.len())
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor_position = 0;
    }
}

impl Widget for &PromptComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Prompt - Enter to send")
            .style(if self.has_focus {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = self.content.clone();
            if self.has_focus {
                content.insert(self.cursor_position.min(content.len()), '▌');
            }
            let line = Line::from(vec![Span::raw(content)]);
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
        }
    }
}

use crate::api::{ApiError, Conversation};

/// Results delivered by background request tasks. Requests are never
/// cancelled; a late event still updates panel state when it arrives.
#[derive(Debug)]
pub enum AppEvent {
    /// `POST /api/ask-ai` finished
    AskFinished(Result<String, ApiError>),

    /// `GET /api/conversations` finished
    HistoryLoaded(Result<Vec<Conversation>, ApiError>),

    /// `DELETE /api/conversations` finished
    HistoryCleared(Result<(), ApiError>),
}

/// The two top-level panels the root container toggles between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Chat,
    History,
}

impl Panel {
    pub fn display_name(&self) -> &'static str {
        match self {
            Panel::Chat => "Chat",
            Panel::History => "History",
        }
    }

    pub fn toggled(&self) -> Panel {
        match self {
            Panel::Chat => Panel::History,
            Panel::History => Panel::Chat,
        }
    }
}

//! Conversation and document state as explicit transitions.
//!
//! Every input to the client (a keystroke that submits, a network completion,
//! a timer firing) is an [`Event`]. [`DraftState::apply`] consumes the current
//! state and returns the next one together with the [`Command`]s the caller
//! has to run. Nothing in here touches the network or timers, so the ordering
//! rules for document writes can be exercised directly in tests.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::backend::{ChatReply, Health};
use crate::config::DocumentOrdering;

/// Who produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Ai,
    Error,
}

/// One entry of the conversation log. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: String,
    pub tools_used: Vec<String>,
}

/// Latest known document text and the sequence number of the write that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    content: String,
    seq: u64,
}

impl DocumentState {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Length as shown in the preview footer (characters, not bytes).
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ServerStatus {
    #[default]
    Unknown,
    Online {
        active_sessions: usize,
    },
    Offline {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Session start: first document fetch and health probe.
    Started,
    Submit(String),
    ChatCompleted(Result<ChatReply, String>),
    DocumentFetched {
        seq: u64,
        result: Result<String, String>,
    },
    PollTick,
    RefreshRequested,
    ReconcileDue,
    HealthChecked(Result<Health, String>),
    ClearRequested,
    SessionCleared(Result<(), String>),
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SendChat { message: String },
    FetchDocument { seq: u64 },
    ScheduleReconcile,
    CheckHealth,
    ClearSession,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: DraftState,
    pub commands: Vec<Command>,
}

impl Transition {
    pub fn has_command(&self, wanted: &Command) -> bool {
        self.commands.iter().any(|c| c == wanted)
    }

    /// True when a chat request was issued, i.e. the submit was accepted.
    pub fn sent_chat(&self) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, Command::SendChat { .. }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DraftState {
    messages: Vec<Message>,
    document: DocumentState,
    loading: bool,
    clearing: bool,
    server: ServerStatus,
    ordering: DocumentOrdering,
    next_seq: u64,
    last_message_id: i64,
}

impl DraftState {
    pub fn new(ordering: DocumentOrdering) -> Self {
        Self {
            ordering,
            next_seq: 1,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_clearing(&self) -> bool {
        self.clearing
    }

    pub fn server_status(&self) -> &ServerStatus {
        &self.server
    }

    pub fn ordering(&self) -> DocumentOrdering {
        self.ordering
    }

    pub fn apply(mut self, event: Event, now: DateTime<Local>) -> Transition {
        let mut commands = Vec::new();

        match event {
            Event::Started => {
                commands.push(self.issue_fetch());
                commands.push(Command::CheckHealth);
            }
            Event::Submit(text) => {
                if text.trim().is_empty() || self.loading {
                    return self.unchanged();
                }
                self.append(MessageKind::User, text.clone(), Vec::new(), now);
                self.loading = true;
                commands.push(Command::SendChat { message: text });
            }
            Event::ChatCompleted(Ok(reply)) => {
                self.loading = false;
                self.append(MessageKind::Ai, reply.response, reply.tools_used, now);
                if let Some(content) = reply.document_content {
                    self.overwrite_document(content);
                }
                commands.push(Command::ScheduleReconcile);
            }
            Event::ChatCompleted(Err(reason)) => {
                self.loading = false;
                tracing::warn!("Chat request failed: {}", reason);
                self.append(MessageKind::Error, format!("Error: {}", reason), Vec::new(), now);
            }
            Event::DocumentFetched { seq, result } => match result {
                Ok(content) => self.apply_fetched(seq, content),
                Err(reason) => {
                    tracing::warn!(seq, "Error fetching document: {}", reason);
                }
            },
            Event::PollTick | Event::ReconcileDue => {
                commands.push(self.issue_fetch());
            }
            Event::RefreshRequested => {
                commands.push(self.issue_fetch());
                commands.push(Command::CheckHealth);
            }
            Event::HealthChecked(result) => {
                self.server = match result {
                    Ok(health) => ServerStatus::Online {
                        active_sessions: health.active_sessions,
                    },
                    Err(reason) => {
                        tracing::warn!("Health check failed: {}", reason);
                        ServerStatus::Offline { reason }
                    }
                };
            }
            Event::ClearRequested => {
                if self.loading || self.clearing {
                    return self.unchanged();
                }
                self.clearing = true;
                commands.push(Command::ClearSession);
            }
            Event::SessionCleared(Ok(())) => {
                self.clearing = false;
                self.overwrite_document(String::new());
                commands.push(Command::ScheduleReconcile);
            }
            Event::SessionCleared(Err(reason)) => {
                self.clearing = false;
                self.append(MessageKind::Error, format!("Error: {}", reason), Vec::new(), now);
            }
        }

        Transition {
            state: self,
            commands,
        }
    }

    fn unchanged(self) -> Transition {
        Transition {
            state: self,
            commands: Vec::new(),
        }
    }

    fn issue_fetch(&mut self) -> Command {
        let seq = self.take_seq();
        Command::FetchDocument { seq }
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq.max(1);
        self.next_seq = seq + 1;
        seq
    }

    /// Content carried by a chat or clear response. Always wins over fetches issued before it.
    fn overwrite_document(&mut self, content: String) {
        let seq = self.take_seq();
        self.document = DocumentState { content, seq };
    }

    fn apply_fetched(&mut self, seq: u64, content: String) {
        match self.ordering {
            DocumentOrdering::IssueOrder if seq <= self.document.seq => {
                tracing::debug!(
                    seq,
                    applied = self.document.seq,
                    "Discarding stale document fetch"
                );
            }
            _ => {
                tracing::debug!(seq, chars = content.chars().count(), "Fetched document content");
                self.document = DocumentState { content, seq };
            }
        }
    }

    fn append(
        &mut self,
        kind: MessageKind,
        content: String,
        tools_used: Vec<String>,
        now: DateTime<Local>,
    ) {
        let id = now.timestamp_millis().max(self.last_message_id + 1);
        self.last_message_id = id;
        self.messages.push(Message {
            id,
            kind,
            content,
            timestamp: now.format("%-I:%M:%S %p").to_string(),
            tools_used,
        });
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{ChartHandle, ChartRegistry, ChartSlotId, ChartSpec, Segment, format_response};

pub const GREETING: &str = "Hello! I'm your AI assistant. Ask me questions about departments, applications, integrations, and more.";
pub const GREETING_HINT: &str =
    "Try: \"Which departments are critical?\" or \"Show me a chart of applications by status\"";
pub const TRANSPORT_FAILURE: &str = "Failed to get response. Please try again.";
pub const NEW_CHAT_PROMPT: &str =
    "Start a new conversation? Current chat history will be cleared.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Body of `POST chat`. `history` never contains `message` itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryMessage>,
}

/// Reply to `POST chat`: either an answer or a backend-reported error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Answer(String),
    Error(String),
}

/// A request handed out by [`ChatSession::begin_send`]. The ticket ties the
/// eventual reply back to the session generation that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingChat {
    pub ticket: u64,
    pub request: ChatRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Greeting,
    User {
        text: String,
        excluded_from_context: bool,
    },
    Assistant {
        raw: String,
        segments: Vec<Segment>,
    },
    Error(String),
    Thinking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    ticket: u64,
    user_entry: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    transcript: Vec<TranscriptEntry>,
    history: Vec<HistoryMessage>,
    pending: Option<Pending>,
    next_ticket: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self {
            transcript: vec![TranscriptEntry::Greeting],
            history: Vec::new(),
            pending: None,
            next_ticket: 1,
        }
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn history(&self) -> &[HistoryMessage] {
        &self.history
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn needs_new_chat_confirmation(&self) -> bool {
        !self.history.is_empty()
    }

    /// Appends the user turn and returns the request to send, or `None` when
    /// the input is blank or a reply is still outstanding.
    pub fn begin_send(&mut self, input: &str) -> Option<OutgoingChat> {
        if self.pending.is_some() {
            return None;
        }
        let message = input.trim();
        if message.is_empty() {
            return None;
        }

        let request = ChatRequest {
            message: message.to_owned(),
            history: self.history.clone(),
        };
        self.transcript.push(TranscriptEntry::User {
            text: message.to_owned(),
            excluded_from_context: false,
        });
        let user_entry = self.transcript.len() - 1;
        self.history.push(HistoryMessage {
            role: ChatRole::User,
            content: message.to_owned(),
        });
        self.transcript.push(TranscriptEntry::Thinking);

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending = Some(Pending { ticket, user_entry });
        Some(OutgoingChat { ticket, request })
    }

    /// Records a successful reply. Returns the transcript index of the new
    /// assistant entry, or `None` for a stale ticket.
    pub fn complete(&mut self, ticket: u64, reply: &str) -> Option<usize> {
        self.take_pending(ticket)?;
        self.transcript.push(TranscriptEntry::Assistant {
            raw: reply.to_owned(),
            segments: format_response(reply),
        });
        self.history.push(HistoryMessage {
            role: ChatRole::Assistant,
            content: reply.to_owned(),
        });
        Some(self.transcript.len() - 1)
    }

    /// Records a backend-reported error and rolls the user turn back out of
    /// the history. The turn stays visible, flagged as excluded.
    pub fn fail(&mut self, ticket: u64, error: &str) -> bool {
        let Some(pending) = self.take_pending(ticket) else {
            return false;
        };
        if matches!(self.history.last(), Some(message) if message.role == ChatRole::User) {
            self.history.pop();
        }
        if let Some(TranscriptEntry::User {
            excluded_from_context,
            ..
        }) = self.transcript.get_mut(pending.user_entry)
        {
            *excluded_from_context = true;
        }
        self.transcript
            .push(TranscriptEntry::Error(format!("Error: {error}")));
        true
    }

    pub fn fail_transport(&mut self, ticket: u64) -> bool {
        self.fail(ticket, TRANSPORT_FAILURE)
    }

    /// Drops transcript and history, disposes every chart and returns to the
    /// greeting. A reply still in flight is ignored when it lands.
    pub fn clear<H: ChartHandle>(&mut self, charts: &mut ChartRegistry<H>) {
        charts.dispose_all();
        self.transcript = vec![TranscriptEntry::Greeting];
        self.history.clear();
        self.pending = None;
    }

    /// Chart blocks of one assistant entry with their slot ids.
    pub fn charts_for(&self, message: usize) -> Vec<(ChartSlotId, &ChartSpec)> {
        let Some(TranscriptEntry::Assistant { segments, .. }) = self.transcript.get(message) else {
            return Vec::new();
        };
        segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Chart(spec) => Some(spec),
                _ => None,
            })
            .enumerate()
            .map(|(index, spec)| (ChartSlotId { message, index }, spec))
            .collect()
    }

    fn take_pending(&mut self, ticket: u64) -> Option<Pending> {
        let pending = self.pending.filter(|pending| pending.ticket == ticket)?;
        self.pending = None;
        if matches!(self.transcript.last(), Some(TranscriptEntry::Thinking)) {
            self.transcript.pop();
        }
        Some(pending)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{ChatRole, ChatSession, HistoryMessage, TRANSPORT_FAILURE, TranscriptEntry};
    use crate::{ChartBackend, ChartConfig, ChartHandle, ChartRegistry, ChartSlotId};

    struct NoopHandle;

    impl ChartHandle for NoopHandle {
        fn dispose(&mut self) {}
    }

    struct NoopBackend;

    impl ChartBackend for NoopBackend {
        type Handle = NoopHandle;

        fn render(&mut self, _slot: ChartSlotId, _config: &ChartConfig) -> Result<NoopHandle> {
            Ok(NoopHandle)
        }
    }

    #[test]
    fn starts_with_greeting_and_no_history() {
        let session = ChatSession::new();
        assert_eq!(session.transcript(), &[TranscriptEntry::Greeting]);
        assert!(!session.needs_new_chat_confirmation());
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut session = ChatSession::new();
        assert!(session.begin_send("   \n").is_none());
        assert_eq!(session.transcript().len(), 1);
        assert!(session.history().is_empty());
    }

    #[test]
    fn request_history_excludes_current_turn() {
        let mut session = ChatSession::new();
        let first = session.begin_send("  how many?  ").expect("first send");
        assert_eq!(first.request.message, "how many?");
        assert!(first.request.history.is_empty());
        assert!(session.in_flight());
        assert_eq!(session.transcript().last(), Some(&TranscriptEntry::Thinking));

        session.complete(first.ticket, "Four.").expect("reply lands");
        assert_eq!(session.history().len(), 2);

        let second = session.begin_send("which ones").expect("second send");
        assert_eq!(
            second.request.history,
            vec![
                HistoryMessage {
                    role: ChatRole::User,
                    content: "how many?".into(),
                },
                HistoryMessage {
                    role: ChatRole::Assistant,
                    content: "Four.".into(),
                },
            ]
        );
    }

    #[test]
    fn success_grows_history_by_two() {
        let mut session = ChatSession::new();
        let out = session.begin_send("q").expect("send");
        let entry = session.complete(out.ticket, "a").expect("reply");
        assert_eq!(session.history().len(), 2);
        assert!(!session.in_flight());
        assert!(matches!(
            &session.transcript()[entry],
            TranscriptEntry::Assistant { raw, .. } if raw == "a"
        ));
        assert!(
            !session
                .transcript()
                .iter()
                .any(|entry| *entry == TranscriptEntry::Thinking)
        );
    }

    #[test]
    fn error_reply_rolls_back_history_and_keeps_turn_visible() {
        let mut session = ChatSession::new();
        let out = session.begin_send("q").expect("send");
        assert!(session.fail(out.ticket, "model offline"));

        assert!(session.history().is_empty());
        assert_eq!(
            session.transcript()[1],
            TranscriptEntry::User {
                text: "q".into(),
                excluded_from_context: true,
            }
        );
        assert_eq!(
            session.transcript()[2],
            TranscriptEntry::Error("Error: model offline".into())
        );

        let retry = session.begin_send("again").expect("retry");
        assert!(retry.request.history.is_empty());
    }

    #[test]
    fn transport_failure_uses_fixed_message() {
        let mut session = ChatSession::new();
        let out = session.begin_send("q").expect("send");
        assert!(session.fail_transport(out.ticket));
        assert_eq!(
            session.transcript().last(),
            Some(&TranscriptEntry::Error(format!("Error: {TRANSPORT_FAILURE}")))
        );
        assert!(session.history().is_empty());
    }

    #[test]
    fn send_refused_while_in_flight() {
        let mut session = ChatSession::new();
        let out = session.begin_send("q").expect("send");
        assert!(session.begin_send("another").is_none());
        assert_eq!(session.history().len(), 1);
        session.complete(out.ticket, "ok");
        assert!(session.begin_send("another").is_some());
    }

    #[test]
    fn clear_drops_everything_and_ignores_late_reply() {
        let mut session = ChatSession::new();
        let mut charts = ChartRegistry::new();
        let first = session.begin_send("chart please").expect("send");
        let entry = session
            .complete(
                first.ticket,
                "```chart\n{\"type\":\"pie\",\"labels\":[\"a\"],\"datasets\":[{\"data\":[1]}]}\n```",
            )
            .expect("reply");
        for (slot, spec) in session.charts_for(entry) {
            charts
                .render_into(&mut NoopBackend, slot, spec)
                .expect("render");
        }
        assert_eq!(charts.len(), 1);

        let late = session.begin_send("more").expect("send");
        assert!(session.needs_new_chat_confirmation());
        session.clear(&mut charts);

        assert!(charts.is_empty());
        assert_eq!(session.transcript(), &[TranscriptEntry::Greeting]);
        assert!(session.history().is_empty());
        assert!(session.complete(late.ticket, "too late").is_none());
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn chart_slots_are_numbered_per_message() {
        let mut session = ChatSession::new();
        let out = session.begin_send("two charts").expect("send");
        let reply = "intro\n```chart\n{\"labels\":[],\"datasets\":[]}\n```\nmid\n```chart\n{broken}\n```\n```chart\n{\"type\":\"line\",\"labels\":[],\"datasets\":[]}\n```";
        let entry = session.complete(out.ticket, reply).expect("reply");
        let slots = session
            .charts_for(entry)
            .into_iter()
            .map(|(slot, _)| slot)
            .collect::<Vec<_>>();
        assert_eq!(
            slots,
            vec![
                ChartSlotId {
                    message: entry,
                    index: 0,
                },
                ChartSlotId {
                    message: entry,
                    index: 1,
                },
            ]
        );
        assert!(session.charts_for(0).is_empty());
    }
}

//! The session reducer.
//!
//! [`ChatSession`] is the single consumer of inbound frames. Each frame is
//! fingerprinted, classified once, and folded into [`SessionState`]; outbound
//! intents go through a [`FrameSink`]. Everything runs through `&mut self`,
//! so frames are applied strictly one at a time in arrival order.

use assist_connection::ConnectionState;
use assist_core::{
    Action, AnswerFrame, BatchFrame, Frame, Inbound, Message, MessageId, Mode, Request, Role,
    TaskId, classify, sort_messages,
};
use assist_settings::SessionSettings;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::composer::ComposerStatus;
use crate::dedup::FingerprintWindow;
use crate::errors::SendRejected;
use crate::sink::FrameSink;

/// Conversation state owned by the reducer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    /// Log, sorted ascending by id.
    pub messages: Vec<Message>,
    /// A reply is awaited; further sends are refused.
    pub pending: bool,
    /// Outstanding correlation id.
    pub task_id: Option<TaskId>,
    /// Backend-supplied button commands.
    pub buttons: Vec<String>,
    /// Selectable roles.
    pub roles: Vec<Role>,
    /// Active conversational mode.
    pub mode: Mode,
}

/// What ingesting a frame did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Already seen; nothing changed.
    Duplicate,
    /// Not JSON, or a recognized envelope with malformed fields.
    Malformed,
    /// Valid JSON of no recognized shape.
    Ignored,
    /// A task was accepted and is now outstanding.
    Accepted,
    /// An answer was appended.
    Answered,
    /// An answer for a different task was dropped.
    StaleAnswer,
    /// The log was replaced by a history batch.
    Replayed {
        /// Messages now in the log.
        count: usize,
    },
}

/// Conversation reducer.
#[derive(Debug)]
pub struct ChatSession {
    settings: SessionSettings,
    state: SessionState,
    seen: FingerprintWindow,
    input: String,
}

impl ChatSession {
    /// Empty session.
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            seen: FingerprintWindow::new(settings.dedup_capacity),
            settings,
            state: SessionState::default(),
            input: String::new(),
        }
    }

    // ── Observation ─────────────────────────────────────────────────────

    /// Full state snapshot.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The log, ascending by id.
    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    /// Whether a reply is awaited.
    pub fn is_pending(&self) -> bool {
        self.state.pending
    }

    /// Outstanding task id.
    pub fn task_id(&self) -> Option<&TaskId> {
        self.state.task_id.as_ref()
    }

    /// Active mode.
    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// The action menu: roles when any are offered, otherwise buttons.
    ///
    /// Buttons matching the escalation or chat command are mode actions.
    pub fn actions(&self) -> Vec<Action> {
        if !self.state.roles.is_empty() {
            return self.state.roles.iter().cloned().map(Action::Role).collect();
        }
        self.state
            .buttons
            .iter()
            .map(|label| {
                if *label == self.settings.escalation_command
                    || *label == self.settings.chat_command
                {
                    Action::Mode(label.clone())
                } else {
                    Action::Button(label.clone())
                }
            })
            .collect()
    }

    /// Composer status for the given connection state.
    pub fn composer_status(&self, connection: ConnectionState) -> ComposerStatus {
        if connection != ConnectionState::Open {
            ComposerStatus::Offline
        } else if !self.state.roles.is_empty() {
            ComposerStatus::ChooseRole
        } else {
            ComposerStatus::Ready(self.state.mode)
        }
    }

    /// Whether free input is accepted: connected, nothing pending, no roles
    /// on offer.
    pub fn input_enabled(&self, connection: ConnectionState) -> bool {
        connection == ConnectionState::Open && !self.state.pending && self.state.roles.is_empty()
    }

    /// Interactive input buffer.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the interactive input buffer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    // ── Inbound ─────────────────────────────────────────────────────────

    /// Fold one inbound frame into the state.
    pub fn ingest(&mut self, frame: &Frame) -> IngestOutcome {
        if !self
            .seen
            .insert(frame.fingerprint(self.settings.fingerprint_prefix))
        {
            debug!("duplicate frame ignored");
            return IngestOutcome::Duplicate;
        }

        let inbound = match classify(&frame.data) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(error = %e, payload = %frame.data, "discarding malformed frame");
                return IngestOutcome::Malformed;
            }
        };
        debug!(kind = inbound.name(), "frame classified");

        match inbound {
            Inbound::Accepted { task_id } => {
                info!(task_id = ?task_id, "task accepted");
                self.state.task_id = task_id;
                self.state.pending = true;
                IngestOutcome::Accepted
            }
            Inbound::Answer(answer) => self.apply_answer(answer),
            Inbound::Batch(batch) => self.apply_batch(batch),
            Inbound::Unknown => {
                debug!(payload = %frame.data, "ignoring frame of unrecognized shape");
                IngestOutcome::Ignored
            }
        }
    }

    fn apply_answer(&mut self, answer: AnswerFrame) -> IngestOutcome {
        let explicit = answer.explicit_mode();
        if let Some(buttons) = answer.buttons {
            self.state.buttons = buttons;
            self.state.roles.clear();
        } else if let Some(roles) = answer.roles {
            self.state.roles = roles;
            self.state.buttons.clear();
        }
        self.recompute_mode(explicit);

        let matches = match (&self.state.task_id, &answer.task_id) {
            (None, _) => true,
            (Some(outstanding), Some(incoming)) => outstanding == incoming,
            (Some(_), None) => false,
        };
        if !matches {
            debug!(
                outstanding = ?self.state.task_id,
                incoming = ?answer.task_id,
                "dropping stale answer"
            );
            return IngestOutcome::StaleAnswer;
        }

        let now = Utc::now();
        let id = self.next_id(now);
        self.push(Message::system(id, answer.answer, answer.embedding, now));
        self.state.pending = false;
        self.state.task_id = None;
        IngestOutcome::Answered
    }

    fn apply_batch(&mut self, batch: BatchFrame) -> IngestOutcome {
        let explicit = batch.explicit_mode();
        let mut messages = batch.messages;
        sort_messages(&mut messages);
        self.state.messages = messages;

        if let Some(buttons) = batch.buttons {
            self.state.buttons = buttons;
        }
        if let Some(roles) = batch.roles {
            self.state.roles = roles;
        }
        self.recompute_mode(explicit);

        let count = self.state.messages.len();
        info!(count, "history replayed");
        IngestOutcome::Replayed { count }
    }

    fn recompute_mode(&mut self, explicit: Option<Mode>) {
        self.state.mode = explicit.unwrap_or_else(|| {
            Mode::infer(
                &self.state.buttons,
                &self.state.roles,
                &self.settings.escalation_command,
            )
        });
    }

    // ── Outbound ────────────────────────────────────────────────────────

    /// Send the interactive input buffer. The buffer is cleared once the
    /// frame is handed to the sink.
    pub fn send_input(&mut self, sink: &dyn FrameSink) -> Result<MessageId, SendRejected> {
        let text = self.input.clone();
        self.dispatch(sink, &Request::text(text.clone()), text, true)
    }

    /// Send `text` programmatically (quick actions, commands). The input
    /// buffer is left alone.
    pub fn send_text(
        &mut self,
        sink: &dyn FrameSink,
        text: &str,
    ) -> Result<MessageId, SendRejected> {
        self.dispatch(sink, &Request::text(text), text.to_owned(), false)
    }

    /// Select a role. The role name is both the prompt and the logged text.
    pub fn select_role(
        &mut self,
        sink: &dyn FrameSink,
        role: &Role,
    ) -> Result<MessageId, SendRejected> {
        self.dispatch(sink, &Request::role(role), role.name.clone(), false)
    }

    /// Activate an entry of [`actions`](Self::actions).
    pub fn activate(
        &mut self,
        sink: &dyn FrameSink,
        action: &Action,
    ) -> Result<MessageId, SendRejected> {
        match action {
            Action::Mode(label) | Action::Button(label) => self.send_text(sink, label),
            Action::Role(role) => self.select_role(sink, role),
        }
    }

    fn dispatch(
        &mut self,
        sink: &dyn FrameSink,
        request: &Request,
        shown: String,
        interactive: bool,
    ) -> Result<MessageId, SendRejected> {
        if self.state.pending {
            return Err(SendRejected::AwaitingResponse);
        }
        if request.role_id.is_none() && request.prompt.trim().is_empty() {
            return Err(SendRejected::Empty);
        }
        let payload = request.to_json()?;

        let now = Utc::now();
        let id = self.next_id(now);
        self.push(Message::user(id, shown, now));

        if !sink.send(&payload) {
            warn!("send failed, message kept without awaiting a reply");
            return Err(SendRejected::NotConnected);
        }
        if interactive {
            self.input.clear();
        }
        self.state.pending = true;
        debug!(id = %id, role_id = ?request.role_id, "request sent");
        Ok(id)
    }

    // ── Log ─────────────────────────────────────────────────────────────

    /// Creation-time id, bumped past the newest logged id so appends stay
    /// strictly ascending.
    fn next_id(&self, now: DateTime<Utc>) -> MessageId {
        let floor = self
            .state
            .messages
            .last()
            .map_or(i64::MIN, |m| m.id.get().saturating_add(1));
        MessageId::new(MessageId::from_time(now).get().max(floor))
    }

    fn push(&mut self, message: Message) {
        self.state.messages.push(message);
        sort_messages(&mut self.state.messages);
    }
}

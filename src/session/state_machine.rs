use serde::Serialize;
use statig::prelude::*;

use crate::question::Question;

/// Session-level voting state exposed to the exam-control UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VotingSession {
    pub is_active: bool,
    pub current_question: Option<Question>,
    pub current_poll_id: Option<String>,
    pub is_polling_active_for_question: bool,
    pub poll_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Idle,
    SessionActive,
    PollOpen,
}

impl VotingSession {
    pub fn phase(&self) -> SessionPhase {
        if !self.is_active {
            SessionPhase::Idle
        } else if self.is_polling_active_for_question {
            SessionPhase::PollOpen
        } else {
            SessionPhase::SessionActive
        }
    }

    /// True when a vote for `current_question` is being accepted.
    pub fn accepts_votes(&self) -> bool {
        self.is_active && self.current_question.is_some() && self.is_polling_active_for_question
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Start { question: Question },
    Advance { question: Question },
    PollOpened { poll_id: String },
    PollClosed,
    PollFailed { message: String },
    End,
}

#[derive(Debug, Default)]
pub struct VotingSessionMachine {
    session: VotingSession,
}

impl VotingSessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &VotingSession {
        &self.session
    }

    fn begin(&mut self, question: &Question) {
        self.session = VotingSession {
            is_active: true,
            current_question: Some(question.clone()),
            ..VotingSession::default()
        };
        tracing::info!(question_id = %question.id, "Exam session started");
    }

    fn swap_question(&mut self, question: &Question) {
        self.session.current_question = Some(question.clone());
        self.session.current_poll_id = None;
        self.session.is_polling_active_for_question = false;
        self.session.poll_error = None;
        tracing::info!(question_id = %question.id, "Current exam question set");
    }

    fn reset(&mut self) {
        self.session = VotingSession::default();
        tracing::info!("Exam session ended");
    }

    fn fail(&mut self, message: &str) {
        tracing::warn!(poll_error = %message, "Poll error recorded");
        self.session.poll_error = Some(message.to_string());
    }
}

#[state_machine(initial = "State::idle()")]
impl VotingSessionMachine {
    #[state]
    fn idle(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Start { question } => {
                self.begin(question);
                Transition(State::session_active())
            }
            SessionEvent::PollFailed { message } => {
                self.fail(message);
                Handled
            }
            _ => Handled,
        }
    }

    #[state]
    fn session_active(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Start { question } => {
                self.begin(question);
                Handled
            }
            SessionEvent::Advance { question } => {
                self.swap_question(question);
                Handled
            }
            SessionEvent::PollOpened { poll_id } => {
                self.session.current_poll_id = Some(poll_id.clone());
                self.session.is_polling_active_for_question = true;
                self.session.poll_error = None;
                tracing::info!(poll_id = %poll_id, "Poll opened");
                Transition(State::poll_open())
            }
            SessionEvent::PollFailed { message } => {
                self.fail(message);
                Handled
            }
            SessionEvent::End => {
                self.reset();
                Transition(State::idle())
            }
            SessionEvent::PollClosed => Handled,
        }
    }

    #[state]
    fn poll_open(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::PollClosed => {
                // The poll id stays around for result lookups until the question changes
                self.session.is_polling_active_for_question = false;
                tracing::info!(poll_id = ?self.session.current_poll_id, "Poll closed");
                Transition(State::session_active())
            }
            SessionEvent::Advance { question } => {
                self.swap_question(question);
                Transition(State::session_active())
            }
            SessionEvent::Start { question } => {
                self.begin(question);
                Transition(State::session_active())
            }
            SessionEvent::PollFailed { message } => {
                self.fail(message);
                Handled
            }
            SessionEvent::End => {
                self.reset();
                Transition(State::idle())
            }
            SessionEvent::PollOpened { .. } => Handled,
        }
    }
}

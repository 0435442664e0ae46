// Voting-session coordination - one coordinator per exam room
// Session transitions go through the statig machine; everything else the UI reads
// (connection, devices, responses) lives next to it behind the same lock.

use chrono::Utc;
use serde::Serialize;
use statig::prelude::*;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::SessionSettings;
use crate::hardware::{HardwareError, ResponseLink, VotingHardware};
use crate::question::{Answer, Question};
use crate::session::countdown::{self, CountdownTick};
use crate::session::devices::{record_device_response, Device, DeviceRegistry, ResponseSet};
use crate::session::results::PollResults;
use crate::session::scheduler::ScheduledTask;
use crate::session::simulation::{self, SimulationPlan};
use crate::session::state_machine::{SessionEvent, VotingSession, VotingSessionMachine};
use crate::telemetry::{create_session_span, generate_correlation_id};

pub const NO_ACTIVE_DEVICE: &str = "Aucun boîtier OMBEA actif détecté.";
pub const SESSION_NOT_ACTIVE: &str = "Session ou question non active.";
pub const POLL_ALREADY_OPEN: &str = "Un vote est déjà en cours pour cette question.";
pub const NO_ACTIVE_LINK: &str = "Aucun boîtier OMBEA actif pour ouvrir le vote.";
pub const HARDWARE_NOT_READY: &str =
    "OMBEA non prêt. Connectez un boîtier ou activez le mode test.";

/// Connection-derived state, reset by every `connect` and `disconnect`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub is_connecting: bool,
    pub is_authenticated: bool,
    pub is_ready: bool,
    pub active_response_link_id: Option<String>,
    pub connection_error: Option<String>,
}

/// Everything the exam-control UI renders, copied out under one lock.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorSnapshot {
    pub connection: ConnectionStatus,
    pub devices: Vec<Device>,
    pub responses: ResponseSet,
    pub voting_session: VotingSession,
    pub is_test_mode: bool,
    pub seconds_left: Option<u32>,
    pub simulation_running: bool,
}

struct CoordinatorState {
    connection: ConnectionStatus,
    devices: DeviceRegistry,
    responses: ResponseSet,
    test_mode: bool,
    machine: StateMachine<VotingSessionMachine>,
    /// Whether the open (or last) poll was synthesized rather than opened on the hardware
    simulated_poll: bool,
    /// Response link the live poll was opened on; closing always targets it
    poll_link_id: Option<String>,
    simulated_polls_opened: u64,
    simulation: Option<ScheduledTask>,
    countdown: Option<ScheduledTask>,
    seconds_left: Option<u32>,
}

impl CoordinatorState {
    fn new() -> Self {
        Self {
            connection: ConnectionStatus::default(),
            devices: DeviceRegistry::new(),
            responses: ResponseSet::new(),
            test_mode: false,
            machine: VotingSessionMachine::new().state_machine(),
            simulated_poll: false,
            poll_link_id: None,
            simulated_polls_opened: 0,
            simulation: None,
            countdown: None,
            seconds_left: None,
        }
    }

    fn session(&self) -> &VotingSession {
        self.machine.inner().session()
    }

    fn reject(&mut self, message: &str) {
        self.machine.handle(&SessionEvent::PollFailed {
            message: message.to_string(),
        });
    }

    fn stop_simulation(&mut self) {
        if let Some(task) = self.simulation.take() {
            info!(task = task.name(), "Stopping simulated responses");
        }
    }

    fn stop_countdown(&mut self) {
        self.countdown.take();
        self.seconds_left = None;
    }

    fn stop_timers(&mut self) {
        self.stop_simulation();
        self.stop_countdown();
    }

    /// Link and id of the poll currently open on the hardware, if any.
    fn live_poll(&self) -> Option<(String, String)> {
        let session = self.session();
        if !session.is_polling_active_for_question || self.simulated_poll {
            return None;
        }
        Some((self.poll_link_id.clone()?, session.current_poll_id.clone()?))
    }
}

struct CoordinatorInner {
    hardware: Arc<dyn VotingHardware>,
    settings: SessionSettings,
    state: Mutex<CoordinatorState>,
}

/// Coordinates OMBEA voting for one exam session.
///
/// Cloning is cheap and every clone drives the same session. Poll and session
/// operations hold the state lock across their hardware call, so they are applied one
/// at a time in call order.
#[derive(Clone)]
pub struct VotingCoordinator {
    inner: Arc<CoordinatorInner>,
}

/// Handle held by background tasks so they never keep a disposed coordinator alive.
#[derive(Clone)]
pub struct WeakCoordinator {
    inner: Weak<CoordinatorInner>,
}

impl WeakCoordinator {
    pub fn upgrade(&self) -> Option<VotingCoordinator> {
        self.inner.upgrade().map(|inner| VotingCoordinator { inner })
    }
}

impl VotingCoordinator {
    pub fn new(hardware: Arc<dyn VotingHardware>, settings: SessionSettings) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                hardware,
                settings,
                state: Mutex::new(CoordinatorState::new()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakCoordinator {
        WeakCoordinator {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    /// Disconnect and cancel every timer. Other clones stay usable and start from a
    /// disconnected state.
    pub async fn dispose(self) {
        self.disconnect().await;
        debug!("Voting coordinator disposed");
    }

    // ---- connection lifecycle ----

    /// Authenticate and pick the first connected response link. Returns readiness.
    pub async fn connect(&self) -> bool {
        let correlation_id = generate_correlation_id();
        let span = create_session_span("connect", None, &correlation_id);

        async move {
            {
                let mut state = self.inner.state.lock().await;
                if state.connection.is_connecting {
                    warn!("Connection already in progress");
                    return state.connection.is_ready;
                }
                state.connection = ConnectionStatus {
                    is_connecting: true,
                    ..ConnectionStatus::default()
                };
                state.devices.clear();
            }

            info!("Connecting to OMBEA hardware");
            let discovered = self.authenticate_and_discover().await;

            let mut state = self.inner.state.lock().await;
            match discovered {
                Ok(links) => {
                    state.devices = links
                        .iter()
                        .map(|link| (link.id.clone(), Device::from(link)))
                        .collect();

                    let active = links.iter().find(|link| link.is_connected());
                    state.connection = ConnectionStatus {
                        is_connecting: false,
                        is_authenticated: true,
                        is_ready: active.is_some(),
                        active_response_link_id: active.map(|link| link.id.clone()),
                        connection_error: None,
                    };

                    match active {
                        Some(link) => info!(
                            link_id = %link.id,
                            devices = links.len(),
                            "OMBEA hardware ready"
                        ),
                        None => {
                            warn!(devices = links.len(), "Authenticated but no connected response link");
                            state.connection.connection_error = Some(NO_ACTIVE_DEVICE.to_string());
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "OMBEA connection failed");
                    state.devices.clear();
                    state.connection = ConnectionStatus {
                        connection_error: Some(err.to_string()),
                        ..ConnectionStatus::default()
                    };
                }
            }

            state.connection.is_ready
        }
        .instrument(span)
        .await
    }

    async fn authenticate_and_discover(&self) -> Result<Vec<ResponseLink>, HardwareError> {
        self.inner.hardware.get_access_token().await?;
        self.inner.hardware.get_response_links(false).await
    }

    pub async fn disconnect(&self) {
        let mut state = self.inner.state.lock().await;
        self.close_open_poll_best_effort(&mut state).await;
        self.inner.hardware.clear_access_token().await;

        state.stop_timers();
        state.machine.handle(&SessionEvent::End);
        state.responses.clear();
        state.devices.clear();
        state.connection = ConnectionStatus::default();
        state.simulated_poll = false;

        info!("Disconnected from OMBEA hardware");
    }

    pub async fn set_test_mode(&self, enabled: bool) {
        let mut state = self.inner.state.lock().await;
        state.test_mode = enabled;
        info!(enabled, "Test mode {}", if enabled { "enabled" } else { "disabled" });
    }

    // ---- exam session ----

    /// Returns false (with `poll_error` set) when neither hardware nor test mode is
    /// available.
    pub async fn start_exam_session(&self, first_question: Question) -> bool {
        let mut state = self.inner.state.lock().await;

        if !state.connection.is_ready && !state.test_mode {
            warn!("Cannot start exam session: hardware not ready and test mode disabled");
            state.reject(HARDWARE_NOT_READY);
            return false;
        }

        if state.session().is_active {
            warn!("Exam session already active, restarting it");
            self.close_open_poll_best_effort(&mut state).await;
            state.machine.handle(&SessionEvent::End);
        }

        state.stop_timers();
        state.responses.clear();
        state.simulated_poll = false;
        state.machine.handle(&SessionEvent::Start {
            question: first_question,
        });
        true
    }

    pub async fn set_current_exam_question(&self, question: Question) {
        let mut state = self.inner.state.lock().await;

        if !state.session().is_active {
            warn!(question_id = %question.id, "Cannot change question: no active exam session");
            return;
        }

        self.close_open_poll_best_effort(&mut state).await;
        state.stop_timers();
        state.responses.clear();
        state.simulated_poll = false;
        state.machine.handle(&SessionEvent::Advance { question });
    }

    pub async fn end_exam_session(&self) {
        let mut state = self.inner.state.lock().await;
        self.close_open_poll_best_effort(&mut state).await;

        state.stop_timers();
        state.responses.clear();
        state.simulated_poll = false;
        state.machine.handle(&SessionEvent::End);
    }

    /// Stop a live poll before the session moves on. Failures are only logged.
    async fn close_open_poll_best_effort(&self, state: &mut CoordinatorState) {
        let Some((link_id, poll_id)) = state.live_poll() else {
            return;
        };
        state.poll_link_id = None;

        if let Err(err) = self.inner.hardware.stop_poll(&link_id, &poll_id).await {
            warn!(
                link_id = %link_id,
                poll_id = %poll_id,
                error = %err,
                "Could not close poll before leaving it, continuing"
            );
        }
    }

    // ---- polls ----

    /// Returns true when a poll is open afterwards.
    pub async fn open_poll_for_current_question(&self) -> bool {
        let correlation_id = generate_correlation_id();
        let mut state = self.inner.state.lock().await;

        let session = state.session();
        let question = match &session.current_question {
            Some(question) if session.is_active => question.clone(),
            _ => {
                warn!("Cannot open poll: no active session or question");
                state.reject(SESSION_NOT_ACTIVE);
                return false;
            }
        };

        if session.is_polling_active_for_question {
            warn!("Cannot open poll: a poll is already open");
            state.reject(POLL_ALREADY_OPEN);
            return false;
        }

        let active_link = state.connection.active_response_link_id.clone();
        if active_link.is_none() && !state.test_mode {
            warn!("Cannot open poll: no active response link and test mode disabled");
            state.reject(NO_ACTIVE_LINK);
            return false;
        }

        let span = create_session_span("open_poll", Some(&question.id), &correlation_id);

        let poll_id = if state.test_mode {
            state.simulated_polls_opened += 1;
            let poll_id = format!(
                "sim-poll-{}-{}",
                Utc::now().timestamp_millis(),
                state.simulated_polls_opened
            );
            info!(poll_id = %poll_id, question_id = %question.id, "Opening simulated poll");
            state.simulated_poll = true;
            state.poll_link_id = None;
            poll_id
        } else {
            let link_id = active_link.unwrap_or_default();
            let opened = self
                .inner
                .hardware
                .start_poll(&link_id, &question)
                .instrument(span.clone())
                .await;
            match opened {
                Ok(poll) => {
                    state.simulated_poll = false;
                    state.poll_link_id = Some(link_id);
                    poll.id
                }
                Err(err) => {
                    error!(parent: &span, link_id = %link_id, error = %err, "Failed to open poll");
                    state.reject(&err.to_string());
                    return false;
                }
            }
        };

        state.responses.clear();
        state.machine.handle(&SessionEvent::PollOpened {
            poll_id: poll_id.clone(),
        });

        if state.simulated_poll {
            let plan = SimulationPlan::new(
                state.devices.keys().map(String::as_str),
                &question,
                self.inner.settings.simulation.placeholder_devices,
            );
            state.simulation = Some(simulation::start(
                self.downgrade(),
                plan,
                self.inner.settings.simulation.clone(),
            ));
        }

        if self.inner.settings.auto_close_polls {
            let seconds = question
                .time_limit
                .unwrap_or(self.inner.settings.default_time_limit_secs);
            state.seconds_left = Some(seconds);
            state.countdown = Some(countdown::start(self.downgrade(), poll_id, seconds));
        }

        true
    }

    /// Returns true when the poll was closed.
    pub async fn close_poll_for_current_question(&self) -> bool {
        let mut state = self.inner.state.lock().await;

        if !state.session().accepts_votes() {
            warn!("Cannot close poll: no poll is open");
            return false;
        }
        self.close_open_poll(&mut state).await
    }

    /// Close the open poll only while it is still `poll_id`.
    pub(crate) async fn close_poll_if_current(&self, poll_id: &str) -> bool {
        let mut state = self.inner.state.lock().await;

        let session = state.session();
        if !session.accepts_votes() || session.current_poll_id.as_deref() != Some(poll_id) {
            debug!(poll_id, "Poll already replaced, nothing to close");
            return false;
        }
        self.close_open_poll(&mut state).await
    }

    async fn close_open_poll(&self, state: &mut CoordinatorState) -> bool {
        if !state.simulated_poll {
            let Some((link_id, poll_id)) = state.live_poll() else {
                warn!("Open poll has no response link or poll id");
                state.reject(NO_ACTIVE_LINK);
                return false;
            };

            if let Err(err) = self.inner.hardware.stop_poll(&link_id, &poll_id).await {
                // The poll is presumed still open on the hardware
                error!(link_id = %link_id, poll_id = %poll_id, error = %err, "Failed to close poll");
                state.reject(&err.to_string());
                return false;
            }
            state.poll_link_id = None;
        }

        state.stop_timers();
        state.machine.handle(&SessionEvent::PollClosed);
        info!(votes = state.responses.len(), "Voting closed");
        true
    }

    /// Record a keypad vote. Votes outside an open poll, or that cannot answer the
    /// current question, are dropped.
    pub async fn handle_response(&self, device_id: &str, raw: &str) -> bool {
        let mut state = self.inner.state.lock().await;

        let answer = {
            let session = state.session();
            if !session.accepts_votes() {
                debug!(device_id, raw, "Ignoring response outside an open poll");
                return false;
            }
            match session
                .current_question
                .as_ref()
                .and_then(|question| Answer::parse(raw, question))
            {
                Some(answer) => answer,
                None => {
                    debug!(device_id, raw, "Ignoring response that does not answer the question");
                    return false;
                }
            }
        };

        record_device_response(&mut state.devices, device_id, answer, Utc::now());
        if let Some(previous) = state.responses.record(device_id, answer) {
            debug!(device_id, previous = %previous, "Device changed its vote");
        }
        info!(device_id, answer = %answer, "Boîtier#{device_id} → {answer}");
        true
    }

    // ---- background task hooks ----

    pub(crate) async fn simulation_should_continue(&self) -> bool {
        let state = self.inner.state.lock().await;
        state.test_mode && state.simulated_poll && state.session().accepts_votes()
    }

    pub(crate) async fn countdown_tick(&self, poll_id: &str) -> CountdownTick {
        let mut state = self.inner.state.lock().await;

        let session = state.session();
        if !session.accepts_votes() || session.current_poll_id.as_deref() != Some(poll_id) {
            return CountdownTick::Stale;
        }

        let remaining = state.seconds_left.unwrap_or(0).saturating_sub(1);
        state.seconds_left = Some(remaining);
        if remaining > 0 {
            return CountdownTick::Running(remaining);
        }

        // The countdown task closes the poll itself; it must not be aborted on the way
        if let Some(task) = state.countdown.take() {
            task.detach();
        }
        CountdownTick::Expired
    }

    // ---- read side ----

    pub async fn snapshot(&self) -> CoordinatorSnapshot {
        let state = self.inner.state.lock().await;
        CoordinatorSnapshot {
            connection: state.connection.clone(),
            devices: state.devices.values().cloned().collect(),
            responses: state.responses.clone(),
            voting_session: state.session().clone(),
            is_test_mode: state.test_mode,
            seconds_left: state.seconds_left,
            simulation_running: state
                .simulation
                .as_ref()
                .is_some_and(|task| !task.is_finished()),
        }
    }

    pub async fn voting_session(&self) -> VotingSession {
        self.inner.state.lock().await.session().clone()
    }

    pub async fn responses(&self) -> ResponseSet {
        self.inner.state.lock().await.responses.clone()
    }

    pub async fn devices(&self) -> Vec<Device> {
        self.inner.state.lock().await.devices.values().cloned().collect()
    }

    pub async fn connection(&self) -> ConnectionStatus {
        self.inner.state.lock().await.connection.clone()
    }

    pub async fn is_test_mode(&self) -> bool {
        self.inner.state.lock().await.test_mode
    }

    /// Tally of the open or most recently closed poll.
    pub async fn poll_results(&self) -> Option<PollResults> {
        let state = self.inner.state.lock().await;
        let session = state.session();
        let question = session.current_question.as_ref()?;
        Some(PollResults::tally(
            question,
            &state.responses,
            state.devices.len(),
            session.current_poll_id.clone(),
        ))
    }
}

//! The chat engine.
//!
//! `ChatEngine` is the object a presentation layer owns for one chat
//! session. It ties the pure pieces from chat-core (lifecycle, message
//! board, validation, failure policy) to a [`Backend`] and the tokio
//! runtime.
//!
//! # Lifecycle
//!
//! ```text
//! AwaitingIdentity --set_session_identity--> Idle --start_polling--> Polling
//!        |                                    ^  <--stop_polling----   |
//!        +---------------shutdown / drop------+------------------------+--> Closed
//! ```
//!
//! Nothing touches the network before the display name is set.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use chat_core::{
    Action, ApplyOutcome, CallSite, Draft, EngineEvent, Event, Failure, FetchMode, Lifecycle,
    MessageBoard, SessionIdentity, ValidationError, Visibility,
};
use chat_types::{Message, MessageId, SubmitRequest};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::backend::{Backend, BackendError, HttpBackend};
use crate::config::{ConfigError, EngineConfig};
use crate::device::DeviceIdentity;
use crate::poller::spawn_poll_task;

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// User input was rejected; nothing was sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Device information has not been obtained yet.
    #[error("device information not available")]
    MissingIdentity,

    /// The operation needs a display name first.
    #[error("no display name set for this session")]
    NoSession,

    /// The display name can only be set once.
    #[error("display name already set for this session")]
    SessionAlreadySet,

    /// A submission is already in flight.
    #[error("a message is already being sent")]
    Busy,

    /// Poll interval must be greater than zero.
    #[error("poll interval must be greater than zero")]
    InvalidInterval,

    /// The engine was shut down.
    #[error("engine is shut down")]
    Closed,

    /// Backend or transport failure.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Configuration was unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result of a message fetch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchReport {
    /// The board now shows `count` messages from this fetch.
    Replaced {
        /// Number of messages on the board.
        count: usize,
    },
    /// A newer fetch was already applied; this response was dropped.
    Stale,
    /// The backend answered with a non-success status; nothing changed.
    Ignored {
        /// Status reported by the backend.
        status: String,
    },
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Identifier the backend assigned, when it reported one.
    pub id: Option<MessageId>,
    /// Outcome of the refresh that followed the send. `None` if that fetch
    /// failed (silently).
    pub refresh: Option<FetchReport>,
}

/// Result of setting the display name.
#[derive(Debug)]
pub struct SessionStart {
    /// The accepted display name.
    pub identity: SessionIdentity,
    /// Outcome of the device information lookup. A failure here does not
    /// undo the session; retry with [`ChatEngine::fetch_device_info`].
    pub device: Result<DeviceIdentity, EngineError>,
}

/// Lifecycle state and the poll task handle, guarded together.
#[derive(Debug, Default)]
struct Control {
    lifecycle: Lifecycle,
    poll_task: Option<JoinHandle<()>>,
}

/// State shared between the engine handle and its poll task.
pub(crate) struct Shared<B: Backend> {
    backend: B,
    config: EngineConfig,
    session: OnceLock<SessionIdentity>,
    control: Mutex<Control>,
    board: tokio::sync::Mutex<MessageBoard>,
    device: tokio::sync::Mutex<Option<DeviceIdentity>>,
    busy: AtomicBool,
    refreshing: AtomicUsize,
    events: broadcast::Sender<EngineEvent>,
}

/// Clears the busy flag when the submission ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Counts a manual fetch in flight.
struct RefreshGuard<'a>(&'a AtomicUsize);

impl<'a> RefreshGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<B: Backend> Shared<B> {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn ensure_active(&self) -> Result<(), EngineError> {
        match self.control().lifecycle {
            Lifecycle::AwaitingIdentity => Err(EngineError::NoSession),
            Lifecycle::Closed => Err(EngineError::Closed),
            Lifecycle::Idle | Lifecycle::Polling { .. } => Ok(()),
        }
    }

    /// Fetch the message list and offer it to the board.
    pub(crate) async fn fetch_messages(
        &self,
        mode: FetchMode,
    ) -> Result<FetchReport, Failure<EngineError>> {
        self.ensure_active().map_err(Failure::Visible)?;

        let _refreshing = match mode {
            FetchMode::Manual => Some(RefreshGuard::new(&self.refreshing)),
            FetchMode::Background => None,
        };

        let ticket = self.board.lock().await.begin_fetch();
        tracing::debug!(ticket = ticket.value(), %mode, "Fetching messages");

        let response = match self.backend.messages().await {
            Ok(response) => response,
            Err(e) => {
                let failure = Failure::at(mode.call_site(), EngineError::from(e));
                match failure.visibility() {
                    Visibility::Silent => {
                        tracing::debug!(%mode, "Fetch failed: {}", failure)
                    }
                    Visibility::Visible => {
                        tracing::warn!(%mode, "Fetch failed: {}", failure)
                    }
                }
                self.emit(EngineEvent::FetchFailed {
                    mode,
                    error: failure.to_string(),
                });
                return Err(failure);
            }
        };

        let status = response.status.clone();
        let Some(messages) = response.into_messages() else {
            tracing::debug!(%mode, %status, "Ignoring non-success message list");
            return Ok(FetchReport::Ignored { status });
        };

        let outcome = self.board.lock().await.apply(ticket, messages);
        match outcome {
            ApplyOutcome::Replaced { count } => {
                tracing::debug!(%mode, count, "Message board replaced");
                self.emit(EngineEvent::MessagesReplaced { count, mode });
                Ok(FetchReport::Replaced { count })
            }
            ApplyOutcome::Stale { ticket, current } => {
                tracing::debug!(
                    ticket = ticket.value(),
                    current = current.value(),
                    "Discarding stale fetch"
                );
                self.emit(EngineEvent::StaleFetchDiscarded {
                    ticket: ticket.value(),
                });
                Ok(FetchReport::Stale)
            }
        }
    }
}

/// Message synchronization engine for one chat session.
///
/// Not `Clone`: the presentation layer owns exactly one engine per session.
/// Dropping it stops the poll loop.
pub struct ChatEngine<B: Backend + 'static> {
    shared: Arc<Shared<B>>,
}

impl ChatEngine<HttpBackend> {
    /// Create an engine talking HTTP to the backend named in `config`.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let backend = HttpBackend::new(config.backend.clone())?;
        Ok(Self::new(backend, config))
    }
}

impl<B: Backend + 'static> ChatEngine<B> {
    /// Create an engine. No network activity happens until
    /// [`set_session_identity`](Self::set_session_identity).
    pub fn new(backend: B, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.poll.event_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                session: OnceLock::new(),
                control: Mutex::new(Control::default()),
                board: tokio::sync::Mutex::new(MessageBoard::new()),
                device: tokio::sync::Mutex::new(None),
                busy: AtomicBool::new(false),
                refreshing: AtomicUsize::new(0),
                events,
            }),
        }
    }

    // ===========================================
    // Lifecycle
    // ===========================================

    /// Run a lifecycle event while already holding the control lock.
    ///
    /// Timer and event actions run immediately; fetch actions are returned
    /// for the caller to run once the lock is released.
    fn apply(&self, control: &mut Control, event: Event) -> Vec<Action> {
        let (next, actions) = control.lifecycle.clone().on_event(event);
        control.lifecycle = next;

        let mut deferred = Vec::new();
        for action in actions {
            match action {
                Action::SchedulePoll { interval } => {
                    let task = spawn_poll_task(Arc::downgrade(&self.shared), interval);
                    if let Some(previous) = control.poll_task.replace(task) {
                        previous.abort();
                    }
                }
                Action::CancelPoll => {
                    if let Some(task) = control.poll_task.take() {
                        task.abort();
                    }
                }
                Action::EmitEvent(event) => self.shared.emit(event),
                other => deferred.push(other),
            }
        }
        deferred
    }

    fn transition(&self, event: Event) -> Vec<Action> {
        let mut control = self.shared.control();
        self.apply(&mut control, event)
    }

    /// Set the display name and start the session.
    ///
    /// Validates the name, then looks up device information, runs an
    /// initial fetch and starts the poll loop at the configured interval.
    /// Works once per engine; later calls fail with
    /// [`EngineError::SessionAlreadySet`] and change nothing.
    pub async fn set_session_identity(&self, name: &str) -> Result<SessionStart, EngineError> {
        let identity = SessionIdentity::parse(name)?;

        let deferred = {
            let mut control = self.shared.control();
            match control.lifecycle {
                Lifecycle::AwaitingIdentity => {}
                Lifecycle::Closed => return Err(EngineError::Closed),
                Lifecycle::Idle | Lifecycle::Polling { .. } => {
                    return Err(EngineError::SessionAlreadySet)
                }
            }
            let _ = self.shared.session.set(identity.clone());
            self.apply(
                &mut control,
                Event::IdentitySet {
                    display_name: identity.as_str().to_string(),
                },
            )
        };
        tracing::info!("Session started as {}", identity);

        let mut device = Err(EngineError::MissingIdentity);
        for action in deferred {
            match action {
                Action::FetchDeviceInfo => device = self.fetch_device_info().await,
                Action::FetchMessages { mode } => {
                    // Logged inside; the loop heals fetch failures.
                    let _ = self.shared.fetch_messages(mode).await;
                }
                _ => {}
            }
        }

        if let Err(e) = self
            .start_polling(self.shared.config.poll.interval())
            .await
        {
            tracing::debug!("Poll loop not started: {}", e);
        }

        Ok(SessionStart { identity, device })
    }

    /// Start the poll loop, replacing any running one.
    ///
    /// Must be called from within a Tokio runtime. The first tick fires one
    /// `interval` from now.
    pub async fn start_polling(&self, interval: Duration) -> Result<(), EngineError> {
        if interval.is_zero() {
            return Err(EngineError::InvalidInterval);
        }

        let mut control = self.shared.control();
        match control.lifecycle {
            Lifecycle::AwaitingIdentity => Err(EngineError::NoSession),
            Lifecycle::Closed => Err(EngineError::Closed),
            Lifecycle::Idle | Lifecycle::Polling { .. } => {
                self.apply(&mut control, Event::StartPollingRequested { interval });
                tracing::info!("Polling every {:?}", interval);
                Ok(())
            }
        }
    }

    /// Stop the poll loop. No-op when it is not running.
    ///
    /// Fetches already in flight complete normally.
    pub fn stop_polling(&self) {
        self.transition(Event::StopPollingRequested);
    }

    /// Stop polling and refuse further operations.
    pub fn shutdown(&self) {
        let was_active = self.shared.control().lifecycle.is_active();
        self.transition(Event::ShutdownRequested);
        if was_active {
            tracing::info!("Chat engine shut down");
        }
    }

    // ===========================================
    // Network operations
    // ===========================================

    /// Fetch the message list now.
    ///
    /// Failures are tagged with their visibility: fetch errors are always
    /// [`Failure::Silent`], calling before the session starts is
    /// [`Failure::Visible`].
    pub async fn fetch_messages(&self, mode: FetchMode) -> Result<FetchReport, Failure<EngineError>> {
        self.shared.fetch_messages(mode).await
    }

    /// Look up device information.
    ///
    /// Returns the stored identity if one was already obtained; otherwise
    /// asks the backend. A failure leaves the identity unset.
    pub async fn fetch_device_info(&self) -> Result<DeviceIdentity, EngineError> {
        self.shared.ensure_active()?;

        if let Some(existing) = self.shared.device.lock().await.clone() {
            return Ok(existing);
        }

        let fetched = match self.shared.backend.device_info().await {
            Ok(response) => DeviceIdentity::from_response(response),
            Err(e) => Err(e),
        };
        let identity = match fetched {
            Ok(identity) => identity,
            Err(e) => {
                let failure = Failure::at(CallSite::DeviceInfo, EngineError::from(e));
                tracing::warn!("Device info lookup failed: {}", failure);
                return Err(failure.into_inner());
            }
        };

        let mut device = self.shared.device.lock().await;
        if let Some(existing) = device.as_ref() {
            // A concurrent lookup got there first.
            return Ok(existing.clone());
        }
        *device = Some(identity.clone());
        drop(device);

        tracing::info!(
            local_address = %identity.local_address,
            "Device identified as {}",
            identity.display_name()
        );
        self.shared.emit(EngineEvent::DeviceIdentified {
            local_address: identity.local_address.clone(),
        });
        Ok(identity)
    }

    /// Send the draft.
    ///
    /// Checks run in order: draft text, session state, device identity and
    /// the busy flag. On success the draft is cleared and a manual fetch runs
    /// straight away. On failure the draft is left as it was.
    pub async fn send_message(&self, draft: &mut Draft) -> Result<SendReceipt, EngineError> {
        let text = draft.validated()?.to_string();
        self.shared.ensure_active()?;

        let device = self
            .shared
            .device
            .lock()
            .await
            .clone()
            .ok_or(EngineError::MissingIdentity)?;

        let busy = BusyGuard::acquire(&self.shared.busy).ok_or(EngineError::Busy)?;

        let request = SubmitRequest::new(
            self.session_identity().map(SessionIdentity::as_str),
            Some(device.local_address.as_str()),
            &text,
        );

        let ack = match self.shared.backend.submit(&request).await {
            Ok(ack) => ack,
            Err(e) => {
                let failure = Failure::at(CallSite::Submission, EngineError::from(e));
                tracing::warn!("Send failed: {}", failure);
                return Err(failure.into_inner());
            }
        };

        draft.clear();
        tracing::info!(id = ?ack.message_id, "Message sent");
        self.shared.emit(EngineEvent::MessageSent { id: ack.message_id });
        drop(busy);

        let refresh = self.shared.fetch_messages(FetchMode::Manual).await.ok();
        Ok(SendReceipt {
            id: ack.message_id,
            refresh,
        })
    }

    /// The most recent message stored by the backend.
    ///
    /// Does not touch the board.
    pub async fn latest_message(&self) -> Result<Option<Message>, EngineError> {
        self.shared.ensure_active()?;
        let response = self.shared.backend.latest_message().await?;
        Ok(response.into_latest())
    }

    // ===========================================
    // Read access
    // ===========================================

    /// Messages currently displayed, in backend order.
    pub async fn messages(&self) -> Vec<Message> {
        self.shared.board.lock().await.messages().to_vec()
    }

    /// Device information, once obtained.
    pub async fn device_identity(&self) -> Option<DeviceIdentity> {
        self.shared.device.lock().await.clone()
    }

    /// The display name, once set.
    pub fn session_identity(&self) -> Option<&SessionIdentity> {
        self.shared.session.get()
    }

    /// Whether a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Whether a manual fetch is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.shared.refreshing.load(Ordering::Acquire) > 0
    }

    /// Whether the poll loop is running.
    pub fn is_polling(&self) -> bool {
        self.shared.control().lifecycle.is_polling()
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    /// The backend in use.
    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }
}

impl<B: Backend + 'static> Drop for ChatEngine<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<B: Backend + 'static> std::fmt::Debug for ChatEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatEngine")
            .field("session", &self.session_identity())
            .field("lifecycle", &self.shared.control().lifecycle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::config::PollConfig;
    use chat_types::{DeviceInfoResponse, UNKNOWN_IP};
    use tokio::time::sleep;

    fn config_with_interval(interval_ms: u64) -> EngineConfig {
        EngineConfig {
            poll: PollConfig {
                interval_ms,
                ..PollConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn engine(backend: &MockBackend) -> ChatEngine<MockBackend> {
        ChatEngine::new(backend.clone(), config_with_interval(1000))
    }

    fn message(id: i64, text: &str) -> Message {
        Message {
            id: MessageId::new(id),
            author_name: "Bo".into(),
            author_address: "192.168.1.30".into(),
            text: text.into(),
            sent_at: "2024-05-01T10:00:00".into(),
        }
    }

    async fn started(backend: &MockBackend) -> ChatEngine<MockBackend> {
        let engine = engine(backend);
        engine.set_session_identity("Ana").await.unwrap();
        engine
    }

    // ===========================================
    // Session Identity Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn blank_name_is_rejected_without_network() {
        let backend = MockBackend::new();
        let engine = engine(&backend);

        let result = engine.set_session_identity("   ").await;

        assert!(matches!(
            result,
            Err(EngineError::Validation(ValidationError::EmptyName))
        ));
        assert!(engine.session_identity().is_none());
        sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn long_name_is_rejected() {
        let backend = MockBackend::new();
        let engine = engine(&backend);

        let result = engine.set_session_identity(&"x".repeat(31)).await;

        assert!(matches!(
            result,
            Err(EngineError::Validation(ValidationError::NameTooLong { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn identity_bootstraps_session() {
        let backend = MockBackend::new();
        backend.set_messages(vec![message(1, "hello")]);
        let engine = engine(&backend);

        let start = engine.set_session_identity("  Ana ").await.unwrap();

        assert_eq!(start.identity.as_str(), "Ana");
        assert_eq!(start.device.unwrap().local_address, "192.168.1.50");
        assert_eq!(engine.session_identity().unwrap().as_str(), "Ana");
        assert_eq!(backend.device_info_calls(), 1);
        assert_eq!(backend.message_calls(), 1);
        assert_eq!(engine.messages().await.len(), 1);
        assert!(engine.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn second_identity_is_rejected_and_changes_nothing() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        let device = engine.device_identity().await;

        let result = engine.set_session_identity("Bo").await;

        assert!(matches!(result, Err(EngineError::SessionAlreadySet)));
        assert_eq!(engine.session_identity().unwrap().as_str(), "Ana");
        assert_eq!(engine.device_identity().await, device);
        assert!(engine.is_polling());
        assert_eq!(backend.device_info_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn operations_before_identity_are_refused() {
        let backend = MockBackend::new();
        let engine = engine(&backend);

        assert!(matches!(
            engine.start_polling(Duration::from_secs(1)).await,
            Err(EngineError::NoSession)
        ));
        assert!(matches!(
            engine.fetch_messages(FetchMode::Manual).await,
            Err(Failure::Visible(EngineError::NoSession))
        ));
        assert!(matches!(
            engine.fetch_device_info().await,
            Err(EngineError::NoSession)
        ));
        assert!(matches!(
            engine.latest_message().await,
            Err(EngineError::NoSession)
        ));
        assert!(matches!(
            engine.send_message(&mut Draft::from("hello")).await,
            Err(EngineError::NoSession)
        ));

        sleep(Duration::from_secs(5)).await;
        assert!(!engine.is_polling());
        assert_eq!(backend.latest_calls(), 0);
        assert_eq!(backend.total_calls(), 0);
    }

    // ===========================================
    // Device Info Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn device_failure_is_visible_and_retryable() {
        let backend = MockBackend::new();
        backend.fail_next_device_info("no route to host");
        let engine = engine(&backend);

        let start = engine.set_session_identity("Ana").await.unwrap();

        assert!(matches!(start.device, Err(EngineError::Backend(_))));
        assert!(engine.device_identity().await.is_none());
        // The session still runs.
        assert!(engine.is_polling());

        let identity = engine.fetch_device_info().await.unwrap();
        assert_eq!(identity.local_address, "192.168.1.50");
        assert_eq!(engine.device_identity().await, Some(identity));
    }

    #[tokio::test(start_paused = true)]
    async fn device_info_is_fetched_once() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;

        engine.fetch_device_info().await.unwrap();
        engine.fetch_device_info().await.unwrap();

        assert_eq!(backend.device_info_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn error_only_device_body_leaves_identity_unset() {
        let backend = MockBackend::new();
        backend.set_device_info(DeviceInfoResponse {
            error: Some("Unable to determine local IP".into()),
            ..Default::default()
        });
        let engine = engine(&backend);

        let start = engine.set_session_identity("Ana").await.unwrap();

        assert!(matches!(
            start.device,
            Err(EngineError::Backend(BackendError::Rejected(_)))
        ));
        assert!(engine.device_identity().await.is_none());
    }

    // ===========================================
    // Submission Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn blank_draft_fails_without_network() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        let calls = backend.total_calls();

        let mut draft = Draft::from("  \n\t ");
        let result = engine.send_message(&mut draft).await;

        assert!(matches!(
            result,
            Err(EngineError::Validation(ValidationError::EmptyMessage))
        ));
        assert_eq!(backend.total_calls(), calls);
        assert_eq!(draft.text(), "  \n\t ");
    }

    #[tokio::test(start_paused = true)]
    async fn send_without_device_identity_is_refused() {
        let backend = MockBackend::new();
        backend.fail_next_device_info("timeout");
        let engine = started(&backend).await;

        let mut draft = Draft::from("hello");
        let result = engine.send_message(&mut draft).await;

        assert!(matches!(result, Err(EngineError::MissingIdentity)));
        assert_eq!(backend.submit_calls(), 0);
        assert_eq!(draft.text(), "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn sent_message_appears_after_forced_fetch() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;

        let mut draft = Draft::from("  hello from the kitchen  ");
        let receipt = engine.send_message(&mut draft).await.unwrap();

        assert_eq!(receipt.id, Some(MessageId::new(1)));
        assert_eq!(receipt.refresh, Some(FetchReport::Replaced { count: 1 }));
        assert!(draft.text().is_empty());

        let submitted = backend.submitted();
        assert_eq!(submitted[0].device_name, "Ana");
        assert_eq!(submitted[0].local_ip, "192.168.1.50");
        assert_eq!(submitted[0].message_text, "hello from the kitchen");

        let messages = engine.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello from the kitchen");
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_address_uses_placeholder() {
        let backend = MockBackend::new();
        backend.set_device_info(DeviceInfoResponse {
            device_info: Some("tablet".into()),
            ..Default::default()
        });
        let engine = started(&backend).await;

        let mut draft = Draft::from("hi");
        engine.send_message(&mut draft).await.unwrap();

        assert_eq!(backend.submitted()[0].local_ip, UNKNOWN_IP);
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_keeps_draft() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        backend.fail_next_submit("connection reset");

        let mut draft = Draft::from("important");
        let result = engine.send_message(&mut draft).await;

        assert!(matches!(result, Err(EngineError::Backend(_))));
        assert_eq!(draft.text(), "important");
        assert!(!engine.is_busy());
        assert!(backend.stored_messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_send_is_busy() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        backend.set_submit_delay(Duration::from_secs(1));

        let mut first = Draft::from("one");
        let mut second = Draft::from("two");
        let (a, b) = tokio::join!(engine.send_message(&mut first), async {
            sleep(Duration::from_millis(10)).await;
            assert!(engine.is_busy());
            engine.send_message(&mut second).await
        });

        assert!(a.is_ok());
        assert!(matches!(b, Err(EngineError::Busy)));
        assert_eq!(second.text(), "two");
        assert_eq!(backend.submit_calls(), 1);
        assert!(!engine.is_busy());
    }

    // ===========================================
    // Poll Loop Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn double_start_leaves_one_loop() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        let after_bootstrap = backend.message_calls();

        engine.start_polling(Duration::from_secs(1)).await.unwrap();
        sleep(Duration::from_millis(3500)).await;

        assert_eq!(backend.message_calls() - after_bootstrap, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_uses_new_interval() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        let after_bootstrap = backend.message_calls();

        engine.start_polling(Duration::from_secs(2)).await.unwrap();
        sleep(Duration::from_millis(4500)).await;

        assert_eq!(backend.message_calls() - after_bootstrap, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_rejected() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;

        assert!(matches!(
            engine.start_polling(Duration::ZERO).await,
            Err(EngineError::InvalidInterval)
        ));
        assert!(engine.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;

        engine.stop_polling();
        engine.stop_polling();
        let calls = backend.message_calls();
        sleep(Duration::from_secs(5)).await;

        assert!(!engine.is_polling());
        assert_eq!(backend.message_calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_delays_next_tick() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        let after_bootstrap = backend.message_calls();
        backend.queue_messages(Duration::from_millis(2500), vec![message(1, "slow")]);

        // Ticks at 1s (runs until 3.5s) and 3.5s; the next waits until 4.5s.
        sleep(Duration::from_secs(4)).await;

        assert_eq!(backend.message_calls() - after_bootstrap, 2);
        assert!(engine.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_failure_keeps_board_and_loop() {
        let backend = MockBackend::new();
        backend.set_messages(vec![message(1, "a"), message(2, "b")]);
        let engine = started(&backend).await;
        assert_eq!(engine.messages().await.len(), 2);

        backend.fail_next_messages("connection reset");
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(engine.messages().await.len(), 2);

        backend.set_messages(vec![message(1, "a"), message(2, "b"), message(3, "c")]);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.messages().await.len(), 3);
        assert!(engine.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn non_success_status_is_ignored() {
        let backend = MockBackend::new();
        backend.set_messages(vec![message(1, "a")]);
        let engine = started(&backend).await;
        backend.set_list_status("maintenance");
        backend.set_messages(Vec::new());

        let report = engine.fetch_messages(FetchMode::Manual).await.unwrap();

        assert_eq!(
            report,
            FetchReport::Ignored {
                status: "maintenance".into()
            }
        );
        assert_eq!(engine.messages().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_engine_stops_polling() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        let calls = backend.message_calls();

        drop(engine);
        sleep(Duration::from_secs(5)).await;

        assert_eq!(backend.message_calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_refuses_further_work() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;

        engine.shutdown();

        assert!(!engine.is_polling());
        assert!(matches!(
            engine.start_polling(Duration::from_secs(1)).await,
            Err(EngineError::Closed)
        ));
        assert!(matches!(
            engine.fetch_messages(FetchMode::Manual).await,
            Err(Failure::Visible(EngineError::Closed))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn send_after_shutdown_is_refused() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        engine.shutdown();

        let mut draft = Draft::from("after shutdown");
        let result = engine.send_message(&mut draft).await;

        assert!(matches!(result, Err(EngineError::Closed)));
        assert_eq!(backend.submit_calls(), 0);
        assert_eq!(draft.text(), "after shutdown");
        assert!(!engine.is_busy());
    }

    // ===========================================
    // Manual Refresh Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn manual_failure_is_silent_and_clears_refreshing() {
        let backend = MockBackend::new();
        backend.set_messages(vec![message(1, "a")]);
        let engine = started(&backend).await;
        backend.fail_next_messages("connection reset");

        let result = engine.fetch_messages(FetchMode::Manual).await;

        match result {
            Err(failure) => assert!(!failure.is_visible()),
            Ok(report) => panic!("expected failure, got {:?}", report),
        }
        assert!(!engine.is_refreshing());
        assert_eq!(engine.messages().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshing_while_manual_fetch_in_flight() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        engine.stop_polling();
        backend.queue_messages(Duration::from_secs(1), vec![message(1, "a")]);

        let (report, ()) = tokio::join!(engine.fetch_messages(FetchMode::Manual), async {
            sleep(Duration::from_millis(100)).await;
            assert!(engine.is_refreshing());
        });

        assert!(report.is_ok());
        assert!(!engine.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn background_fetch_does_not_set_refreshing() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        engine.stop_polling();
        backend.queue_messages(Duration::from_secs(1), Vec::new());

        let (_, ()) = tokio::join!(engine.fetch_messages(FetchMode::Background), async {
            sleep(Duration::from_millis(100)).await;
            assert!(!engine.is_refreshing());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn slow_older_fetch_is_discarded() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        engine.stop_polling();

        backend.queue_messages(Duration::from_millis(500), vec![message(1, "old")]);
        backend.queue_messages(
            Duration::ZERO,
            vec![message(1, "old"), message(2, "new")],
        );

        let (older, newer) = tokio::join!(
            engine.fetch_messages(FetchMode::Background),
            engine.fetch_messages(FetchMode::Manual)
        );

        assert_eq!(older.unwrap(), FetchReport::Stale);
        assert_eq!(newer.unwrap(), FetchReport::Replaced { count: 2 });
        let messages = engine.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "new");
    }

    // ===========================================
    // Latest Message and Events Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn latest_message_reads_backend() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        assert_eq!(engine.latest_message().await.unwrap(), None);

        backend.set_messages(vec![message(1, "a"), message(2, "b")]);

        let latest = engine.latest_message().await.unwrap().unwrap();
        assert_eq!(latest.text, "b");
        assert_eq!(backend.latest_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn events_follow_session() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        let mut events = engine.subscribe();

        engine.set_session_identity("Ana").await.unwrap();
        let mut draft = Draft::from("hi");
        engine.send_message(&mut draft).await.unwrap();
        engine.stop_polling();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }

        assert_eq!(
            seen,
            vec![
                EngineEvent::SessionStarted {
                    display_name: "Ana".into()
                },
                EngineEvent::DeviceIdentified {
                    local_address: "192.168.1.50".into()
                },
                EngineEvent::MessagesReplaced {
                    count: 0,
                    mode: FetchMode::Manual
                },
                EngineEvent::PollingStarted {
                    interval: Duration::from_secs(1)
                },
                EngineEvent::MessageSent {
                    id: Some(MessageId::new(1))
                },
                EngineEvent::MessagesReplaced {
                    count: 1,
                    mode: FetchMode::Manual
                },
                EngineEvent::PollingStopped,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_emits_event() {
        let backend = MockBackend::new();
        let engine = started(&backend).await;
        let mut events = engine.subscribe();
        backend.fail_next_messages("reset");

        let _ = engine.fetch_messages(FetchMode::Manual).await;

        assert!(matches!(
            events.try_recv(),
            Ok(EngineEvent::FetchFailed {
                mode: FetchMode::Manual,
                ..
            })
        ));
    }
}

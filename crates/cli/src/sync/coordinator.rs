// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync coordinator: single owner of the match state.
//!
//! The coordinator runs as one tokio task and handles one event at a
//! time. Operator commands from a [`CoordinatorHandle`], timer ticks,
//! inbound transport messages and connect completions all arrive on the same
//! queue, so state is never touched concurrently and needs no lock.
//!
//! After every mutation a fresh [`Snapshot`] is captured and queued on
//! each connected transport, subject to the [`PushLimiter`] for timer-only
//! changes. Queueing never waits: each transport writes from its own task,
//! so a stalled peer delays neither local changes nor the other transport.
//! Connecting the session transport runs in a spawned task and reports back
//! through the queue tagged with an attempt id, so a cancelled or superseded
//! attempt is simply ignored.

use std::sync::Arc;
use std::time::Duration;

use ks_core::{
    Change, DisplayMessage, MatchInit, MatchState, Phase, Slot, Snapshot, TimerMode, ViewMode,
    Visibility,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::limiter::{PushDecision, PushLimiter};
use super::tick::TickScheduler;
use super::transport::{
    CloseReason, ConnectionState, Inbound, SessionConnector, Transport, TransportError,
    TransportEvent, TransportKind, TransportResult,
};
use crate::store::{KeyValueStore, SESSION_ID_KEY};

/// Errors reported to callers of the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("session already active\n  hint: run 'sync stop' first")]
    SessionActive,

    #[error("coordinator is not running")]
    Stopped,

    #[error("connect cancelled")]
    Cancelled,
}

/// Result of a `start_sync` request: the new session id.
pub type ConnectResult = Result<String, SyncError>;

/// Coordinator tuning, usually derived from the config file.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub default_match_time_secs: u32,
    pub default_timer_mode: TimerMode,
    pub tick_interval: Duration,
    pub push_window: Duration,
    pub connect_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            default_match_time_secs: 180,
            default_timer_mode: TimerMode::Countdown,
            tick_interval: Duration::from_secs(1),
            push_window: Duration::from_millis(1000),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Health of one transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportStatus {
    pub kind: TransportKind,
    pub state: ConnectionState,
    pub connection_id: Option<String>,
    pub last_error: Option<String>,
}

/// Answer to [`CoordinatorHandle::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// `None` until a match has been initialized.
    pub phase: Option<Phase>,
    pub session: TransportStatus,
    pub broadcast: TransportStatus,
}

/// Operator and collaborator requests.
enum Command {
    InitializeMatch(Box<MatchInit>),
    SetScore(Slot, i64),
    SetPenalty(Slot, i64),
    ResetMatch,
    Finish,
    StartTimer,
    StopTimer,
    SetTime(i64),
    SetTimerMode(TimerMode),
    SetVisibility(Visibility),
    SetViewMode(ViewMode),
    StartSync(oneshot::Sender<ConnectResult>),
    StopSync,
    Snapshot(oneshot::Sender<Option<Arc<Snapshot>>>),
    Status(oneshot::Sender<SyncStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Everything the coordinator task reacts to.
enum Event {
    Command(Command),
    Tick {
        generation: u64,
    },
    Transport(TransportEvent),
    Connected {
        attempt: u64,
        link: u64,
        resumed: bool,
        result: TransportResult<Box<dyn Transport>>,
    },
}

/// Cloneable, non-blocking front end to a running coordinator.
///
/// Mutations enqueue and return at once; queries wait for their turn in the
/// queue. Every method fails with [`SyncError::Stopped`] once the
/// coordinator has shut down.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl CoordinatorHandle {
    fn send(&self, command: Command) -> Result<(), SyncError> {
        self.tx
            .send(Event::Command(command))
            .map_err(|_| SyncError::Stopped)
    }

    async fn query<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.send(command(reply))?;
        rx.await.map_err(|_| SyncError::Stopped)
    }

    /// Replaces the current match wholesale.
    pub fn initialize_match(&self, init: MatchInit) -> Result<(), SyncError> {
        self.send(Command::InitializeMatch(Box::new(init)))
    }

    pub fn set_score(&self, slot: Slot, value: i64) -> Result<(), SyncError> {
        self.send(Command::SetScore(slot, value))
    }

    pub fn set_penalty(&self, slot: Slot, value: i64) -> Result<(), SyncError> {
        self.send(Command::SetPenalty(slot, value))
    }

    pub fn reset_match(&self) -> Result<(), SyncError> {
        self.send(Command::ResetMatch)
    }

    pub fn finish(&self) -> Result<(), SyncError> {
        self.send(Command::Finish)
    }

    pub fn start_timer(&self) -> Result<(), SyncError> {
        self.send(Command::StartTimer)
    }

    pub fn stop_timer(&self) -> Result<(), SyncError> {
        self.send(Command::StopTimer)
    }

    pub fn set_time(&self, secs: i64) -> Result<(), SyncError> {
        self.send(Command::SetTime(secs))
    }

    pub fn set_timer_mode(&self, mode: TimerMode) -> Result<(), SyncError> {
        self.send(Command::SetTimerMode(mode))
    }

    pub fn set_visibility(&self, visibility: Visibility) -> Result<(), SyncError> {
        self.send(Command::SetVisibility(visibility))
    }

    pub fn set_view_mode(&self, view_mode: ViewMode) -> Result<(), SyncError> {
        self.send(Command::SetViewMode(view_mode))
    }

    /// Opens a fresh session. The returned receiver resolves once the
    /// connect finishes; dropping it does not cancel the connect.
    pub fn start_sync(&self) -> Result<oneshot::Receiver<ConnectResult>, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::StartSync(reply))?;
        Ok(rx)
    }

    /// Terminates the session, cancelling any connect in flight.
    pub fn stop_sync(&self) -> Result<(), SyncError> {
        self.send(Command::StopSync)
    }

    /// The current snapshot, or `None` before the first match.
    pub async fn snapshot(&self) -> Result<Option<Arc<Snapshot>>, SyncError> {
        self.query(Command::Snapshot).await
    }

    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        self.query(Command::Status).await
    }

    /// Stops the coordinator. Transports are closed but the stored session
    /// id is kept, so the next process can resume.
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        self.query(Command::Shutdown).await
    }
}

/// One transport slot and what is known about it.
struct Channel {
    kind: TransportKind,
    transport: Option<Box<dyn Transport>>,
    link: u64,
    /// State to report while `transport` is `None`.
    idle_state: ConnectionState,
    last_error: Option<String>,
}

impl Channel {
    fn new(kind: TransportKind) -> Self {
        Channel {
            kind,
            transport: None,
            link: 0,
            idle_state: ConnectionState::Closed,
            last_error: None,
        }
    }

    fn status(&self, connecting: bool) -> TransportStatus {
        let (state, connection_id) = match &self.transport {
            Some(transport) => (transport.connection_state(), transport.connection_id()),
            None if connecting => (ConnectionState::Connecting, None),
            None => (self.idle_state, None),
        };
        TransportStatus {
            kind: self.kind,
            state,
            connection_id,
            last_error: self.last_error.clone(),
        }
    }

    /// Queues `payload` if connected. Failures are recorded, never returned.
    fn push(&mut self, payload: Arc<str>) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        match transport.send(payload) {
            Ok(()) => tracing::debug!(transport = %self.kind, "snapshot queued"),
            Err(e) => {
                tracing::warn!(transport = %self.kind, "push failed: {}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// How an installed transport ended, if it is no longer connected.
    fn lost(&self) -> Option<CloseReason> {
        match self.transport.as_ref()?.connection_state() {
            ConnectionState::Connected => None,
            ConnectionState::Terminated => Some(CloseReason::Terminated),
            ConnectionState::Connecting | ConnectionState::Closed => Some(CloseReason::Closed),
        }
    }
}

/// A session connect running in the background.
struct PendingConnect {
    attempt: u64,
    token: CancellationToken,
    reply: Option<oneshot::Sender<ConnectResult>>,
}

/// Owns the match and drives both transports. See the module docs.
pub struct Coordinator {
    settings: SyncSettings,
    state: Option<MatchState>,
    snapshot: Option<Arc<Snapshot>>,
    payload: Option<Arc<str>>,
    scheduler: TickScheduler,
    limiter: PushLimiter,
    session: Channel,
    broadcast: Channel,
    pending: Option<PendingConnect>,
    connector: Arc<dyn SessionConnector>,
    store: Box<dyn KeyValueStore>,
    events: mpsc::WeakUnboundedSender<Event>,
    next_attempt: u64,
    next_link: u64,
}

impl Coordinator {
    /// Starts a coordinator task.
    ///
    /// `broadcast` is connected first, then a single session resume is
    /// attempted if `store` holds a session id. Must be called from within a
    /// tokio runtime.
    pub fn spawn(
        settings: SyncSettings,
        connector: Arc<dyn SessionConnector>,
        broadcast: Option<Box<dyn Transport>>,
        store: Box<dyn KeyValueStore>,
    ) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = tx.downgrade();

        let tick_events = events.clone();
        let scheduler = TickScheduler::new(settings.tick_interval, move |generation| {
            if let Some(tx) = tick_events.upgrade() {
                let _ = tx.send(Event::Tick { generation });
            }
        });

        let coordinator = Coordinator {
            limiter: PushLimiter::new(settings.push_window),
            settings,
            state: None,
            snapshot: None,
            payload: None,
            scheduler,
            session: Channel::new(TransportKind::Session),
            broadcast: Channel::new(TransportKind::Broadcast),
            pending: None,
            connector,
            store,
            events,
            next_attempt: 0,
            next_link: 0,
        };
        let task = tokio::spawn(coordinator.run(rx, broadcast));
        (CoordinatorHandle { tx }, task)
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Event>,
        broadcast: Option<Box<dyn Transport>>,
    ) {
        if let Some(transport) = broadcast {
            self.connect_broadcast(transport).await;
        }
        self.resume_session();

        loop {
            let deadline = self.limiter.deadline();
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    if let Some(done) = self.handle(event).await {
                        self.close_all().await;
                        let _ = done.send(());
                        return;
                    }
                }
                _ = wait_until(deadline), if deadline.is_some() => {
                    self.flush_deferred();
                }
            }
        }
        self.close_all().await;
    }

    /// Handles one event; returns the shutdown reply when asked to stop.
    async fn handle(&mut self, event: Event) -> Option<oneshot::Sender<()>> {
        match event {
            Event::Command(command) => return self.handle_command(command).await,
            Event::Tick { generation } => self.handle_tick(generation),
            Event::Transport(event) => self.handle_transport_event(event),
            Event::Connected {
                attempt,
                link,
                resumed,
                result,
            } => self.handle_connected(attempt, link, resumed, result).await,
        }
        None
    }

    async fn handle_command(&mut self, command: Command) -> Option<oneshot::Sender<()>> {
        match command {
            Command::InitializeMatch(init) => self.initialize_match(*init),
            Command::SetScore(slot, value) => self.mutate(|s| s.set_score(slot, value)),
            Command::SetPenalty(slot, value) => self.mutate(|s| s.set_penalty(slot, value)),
            Command::ResetMatch => self.mutate(MatchState::reset_match),
            Command::Finish => self.mutate(MatchState::finish),
            Command::StartTimer => self.mutate(MatchState::start_timer),
            Command::StopTimer => self.mutate(MatchState::stop_timer),
            Command::SetTime(secs) => self.mutate(|s| s.set_time(secs)),
            Command::SetTimerMode(mode) => self.mutate(|s| s.set_timer_mode(mode)),
            Command::SetVisibility(v) => self.mutate(|s| s.set_visibility(v)),
            Command::SetViewMode(m) => self.mutate(|s| s.set_view_mode(m)),
            Command::StartSync(reply) => self.start_connect(None, Some(reply)),
            Command::StopSync => self.stop_sync().await,
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot.clone());
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown(reply) => return Some(reply),
        }
        None
    }

    fn initialize_match(&mut self, init: MatchInit) {
        self.scheduler.reset();
        self.limiter.reset();
        let state = MatchState::new(
            init,
            self.settings.default_match_time_secs,
            self.settings.default_timer_mode,
        );
        tracing::info!(match_id = %state.match_id(), "match initialized");
        self.state = Some(state);
        self.publish(Change::Substantive);
    }

    fn mutate(&mut self, f: impl FnOnce(&mut MatchState) -> Change) {
        let Some(state) = self.state.as_mut() else {
            tracing::debug!("no match initialized, ignoring command");
            return;
        };
        let change = f(state);
        self.publish(change);
    }

    fn handle_tick(&mut self, generation: u64) {
        if !self.scheduler.is_current(generation) {
            tracing::trace!(generation, "dropping stale tick");
            return;
        }
        self.mutate(MatchState::tick);
    }

    /// Brings the scheduler in line with the state and pushes if needed.
    fn publish(&mut self, change: Change) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        if state.is_running() {
            self.scheduler.start();
        } else {
            self.scheduler.stop();
        }
        if change == Change::None {
            return;
        }

        let snapshot = Snapshot::capture(state);
        match snapshot.to_json() {
            Ok(json) => self.payload = Some(Arc::from(json)),
            Err(e) => {
                tracing::warn!("failed to serialize snapshot: {}", e);
                return;
            }
        }
        self.snapshot = Some(Arc::new(snapshot));

        match self.limiter.decide(change, Instant::now()) {
            PushDecision::Now => self.push_all(),
            PushDecision::Deferred => tracing::trace!("timer push deferred"),
            PushDecision::Skip => {}
        }
    }

    fn flush_deferred(&mut self) {
        if self.limiter.take_due(Instant::now()) {
            self.push_all();
        }
    }

    fn push_all(&mut self) {
        self.push_to(TransportKind::Session);
        self.push_to(TransportKind::Broadcast);
    }

    /// Queues the current payload on one transport, retiring it if the
    /// push shows the connection is gone.
    fn push_to(&mut self, kind: TransportKind) {
        let Some(payload) = self.payload.clone() else {
            return;
        };
        let channel = self.channel(kind);
        channel.push(payload);
        if let Some(reason) = channel.lost() {
            self.transport_closed(kind, reason);
        }
    }

    fn channel(&mut self, kind: TransportKind) -> &mut Channel {
        match kind {
            TransportKind::Session => &mut self.session,
            TransportKind::Broadcast => &mut self.broadcast,
        }
    }

    fn inbound(&mut self, kind: TransportKind) -> Inbound {
        self.next_link += 1;
        let events = self.events.clone();
        Inbound::new(kind, self.next_link, move |event| {
            if let Some(tx) = events.upgrade() {
                let _ = tx.send(Event::Transport(event));
            }
        })
    }

    async fn connect_broadcast(&mut self, mut transport: Box<dyn Transport>) {
        let inbound = self.inbound(TransportKind::Broadcast);
        let link = inbound.link();
        match transport.connect(inbound).await {
            Ok(()) => {
                self.broadcast.transport = Some(transport);
                self.broadcast.link = link;
            }
            Err(e) => {
                tracing::warn!("broadcast transport unavailable: {}", e);
                self.broadcast.last_error = Some(e.to_string());
            }
        }
    }

    /// The one resume attempt per process, using the stored session id.
    fn resume_session(&mut self) {
        match self.store.get(SESSION_ID_KEY) {
            Ok(Some(id)) => {
                tracing::info!(session_id = %id, "resuming session");
                self.start_connect(Some(id), None);
            }
            Ok(None) => tracing::debug!("no stored session, not resuming"),
            Err(e) => tracing::warn!("failed to read stored session id: {}", e),
        }
    }

    fn start_connect(
        &mut self,
        resume: Option<String>,
        reply: Option<oneshot::Sender<ConnectResult>>,
    ) {
        if self.pending.is_some() || self.session.transport.is_some() {
            if let Some(reply) = reply {
                let _ = reply.send(Err(SyncError::SessionActive));
            }
            return;
        }
        let resumed = resume.is_some();
        let mut transport = match self.connector.create(resume) {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!("session transport unavailable: {}", e);
                self.session.last_error = Some(e.to_string());
                if resumed {
                    self.forget_session();
                }
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e.into()));
                }
                return;
            }
        };

        self.next_attempt += 1;
        let attempt = self.next_attempt;
        let inbound = self.inbound(TransportKind::Session);
        let link = inbound.link();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let events = self.events.clone();
        let timeout = self.settings.connect_timeout;

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancelled.cancelled() => return,
                result = tokio::time::timeout(timeout, transport.connect(inbound)) => result,
            };
            let result = match result {
                Ok(Ok(())) => Ok(transport),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(TransportError::Timeout),
            };
            if let Some(tx) = events.upgrade() {
                let _ = tx.send(Event::Connected {
                    attempt,
                    link,
                    resumed,
                    result,
                });
            }
        });

        self.pending = Some(PendingConnect {
            attempt,
            token,
            reply,
        });
    }

    async fn handle_connected(
        &mut self,
        attempt: u64,
        link: u64,
        resumed: bool,
        result: TransportResult<Box<dyn Transport>>,
    ) {
        let pending = match self.pending.take() {
            Some(pending) if pending.attempt == attempt => pending,
            other => {
                self.pending = other;
                if let Ok(mut transport) = result {
                    let _ = transport.close().await;
                }
                tracing::debug!(attempt, "ignoring superseded connect");
                return;
            }
        };

        let outcome = match result {
            Ok(mut transport) if transport.connection_state() != ConnectionState::Connected => {
                tracing::warn!(resumed, "session closed before it was installed");
                let _ = transport.close().await;
                let error = TransportError::ConnectionClosed;
                self.session.last_error = Some(error.to_string());
                self.session.idle_state = ConnectionState::Closed;
                self.forget_session();
                Err(SyncError::from(error))
            }
            Ok(transport) => {
                let id = transport.connection_id();
                if let Some(id) = &id {
                    if let Err(e) = self.store.set(SESSION_ID_KEY, id) {
                        tracing::warn!("failed to persist session id: {}", e);
                    }
                }
                tracing::info!(session_id = ?id, resumed, "session connected");
                self.session.transport = Some(transport);
                self.session.link = link;
                self.session.last_error = None;
                self.push_to(TransportKind::Session);
                Ok(id.unwrap_or_default())
            }
            Err(e) => {
                tracing::warn!(resumed, "session connect failed: {}", e);
                self.session.last_error = Some(e.to_string());
                self.session.idle_state = ConnectionState::Closed;
                if resumed {
                    self.forget_session();
                }
                Err(SyncError::from(e))
            }
        };
        if let Some(reply) = pending.reply {
            let _ = reply.send(outcome);
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message {
                kind,
                link,
                message: DisplayMessage::RequestSnapshot,
            } => {
                if !self.is_live(kind, link) {
                    return;
                }
                tracing::debug!(transport = %kind, "snapshot requested");
                self.push_to(kind);
            }
            TransportEvent::Closed { kind, link, reason } => {
                if self.is_live(kind, link) {
                    self.transport_closed(kind, reason);
                }
            }
            TransportEvent::Failed { kind, link, error } => {
                if self.is_live(kind, link) {
                    self.channel(kind).last_error = Some(error);
                }
            }
        }
    }

    /// Whether `link` is the transport currently installed for `kind`.
    fn is_live(&mut self, kind: TransportKind, link: u64) -> bool {
        let channel = self.channel(kind);
        channel.link == link && channel.transport.is_some()
    }

    /// Drops a transport that went away on its own. A lost session is not
    /// resumed, so its stored id is discarded.
    fn transport_closed(&mut self, kind: TransportKind, reason: CloseReason) {
        let channel = self.channel(kind);
        if channel.transport.take().is_none() {
            return;
        }
        channel.idle_state = match reason {
            CloseReason::Closed => ConnectionState::Closed,
            CloseReason::Terminated => ConnectionState::Terminated,
        };
        tracing::info!(transport = %kind, ?reason, "transport disconnected");
        if kind == TransportKind::Session {
            self.forget_session();
        }
    }

    async fn stop_sync(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
            if let Some(reply) = pending.reply {
                let _ = reply.send(Err(SyncError::Cancelled));
            }
        }
        if let Some(mut transport) = self.session.transport.take() {
            if let Err(e) = transport.terminate().await {
                tracing::warn!("failed to terminate session: {}", e);
                self.session.last_error = Some(e.to_string());
            }
            self.session.idle_state = ConnectionState::Terminated;
            tracing::info!("session terminated");
        }
        self.forget_session();
    }

    fn forget_session(&mut self) {
        if let Err(e) = self.store.remove(SESSION_ID_KEY) {
            tracing::warn!("failed to clear stored session id: {}", e);
        }
    }

    fn status(&self) -> SyncStatus {
        SyncStatus {
            phase: self.state.as_ref().map(MatchState::phase),
            session: self.session.status(self.pending.is_some()),
            broadcast: self.broadcast.status(false),
        }
    }

    async fn close_all(&mut self) {
        self.scheduler.stop();
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
            if let Some(reply) = pending.reply {
                let _ = reply.send(Err(SyncError::Cancelled));
            }
        }
        for kind in [TransportKind::Session, TransportKind::Broadcast] {
            if let Some(mut transport) = self.channel(kind).transport.take() {
                if let Err(e) = transport.close().await {
                    tracing::debug!(transport = %kind, "close failed: {}", e);
                }
            }
        }
        tracing::info!("coordinator stopped");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

//! Connection loop with reconnection support.
//!
//! One runner owns the socket for the whole lifetime of a client:
//! connect, greet, authenticate, register for events, then poll until the
//! connection fails or a stop is requested. Every failure ends in a full
//! teardown followed by a fixed backoff.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use kikoe_shared::time::Clock;

use crate::{
    domain::{
        ConnectionPhase, Connector, DisconnectReason, IdentityState, QueryError, RosterRepository,
    },
    infrastructure::codec::Command,
    usecase::{QuerySession, RefreshRosterUseCase, Reply, SyncIdentityUseCase},
};

use super::config::Settings;

/// State shared between the runner and the client facade.
#[derive(Clone)]
pub(crate) struct SharedState {
    pub(crate) roster: Arc<dyn RosterRepository>,
    pub(crate) identity: Arc<Mutex<IdentityState>>,
    pub(crate) stay_alive: Arc<AtomicBool>,
    pub(crate) phase: Arc<Mutex<ConnectionPhase>>,
    pub(crate) clock: Arc<dyn Clock>,
}

pub(crate) struct Runner {
    connector: Arc<dyn Connector>,
    settings: Settings,
    shared: SharedState,
}

impl Runner {
    pub(crate) fn new(connector: Arc<dyn Connector>, settings: Settings, shared: SharedState) -> Self {
        Self {
            connector,
            settings,
            shared,
        }
    }

    /// Run until `stay_alive` is cleared.
    pub(crate) async fn run(self) {
        tracing::info!("Query worker started for {}", self.connector.endpoint());

        while self.is_alive() {
            let result = self.run_connection().await;
            self.set_phase(ConnectionPhase::Disconnected);

            match result {
                Ok(()) => break,
                Err(e) => {
                    let delay = self.backoff_after(&e);
                    tracing::info!("Reconnecting in {:?}", delay);
                    self.sleep_while_alive(delay).await;
                }
            }
        }

        self.set_phase(ConnectionPhase::Disconnected);
        tracing::info!("Query worker stopped");
    }

    /// One physical connection, from connect to teardown.
    async fn run_connection(&self) -> Result<(), QueryError> {
        self.set_phase(ConnectionPhase::Connecting);
        let transport = self.connector.connect().await?;
        tracing::info!("Connected to {}", self.connector.endpoint());

        let mut session = QuerySession::new(
            transport,
            self.shared.roster.clone(),
            self.shared.clock.clone(),
            self.settings.timings.poll_interval,
        );
        let result = self.drive(&mut session).await;
        session.close(self.settings.timings.close_grace).await;
        result
    }

    async fn drive(&self, session: &mut QuerySession) -> Result<(), QueryError> {
        self.set_phase(ConnectionPhase::Greeting);
        session.greet(self.settings.timings.greeting_timeout).await?;

        self.set_phase(ConnectionPhase::Authenticating);
        self.authenticate(session).await?;

        self.set_phase(ConnectionPhase::RegisteringEvents);
        let sync_identity = SyncIdentityUseCase::new(
            self.shared.identity.clone(),
            self.settings.push_name,
        );
        let refresh_roster = RefreshRosterUseCase::new();

        while self.is_alive() {
            if !session.context.events_registered {
                self.register_events(session).await?;
            }
            if self.settings.push_number {
                sync_identity.execute(session).await?;
            }
            if session.context.refresh_roster_pending {
                refresh_roster.execute(session).await?;
            }
            self.keepalive(session).await?;
            session.poll().await?;
        }

        tracing::info!("Stop requested, closing connection");
        Ok(())
    }

    async fn authenticate(&self, session: &mut QuerySession) -> Result<(), QueryError> {
        if !self.settings.has_api_key() {
            tracing::debug!("No API key configured, skipping authentication");
            return Ok(());
        }

        match session.execute(&Command::auth(&self.settings.api_key)).await {
            Ok(Reply::Complete(_)) => {
                tracing::info!("Authenticated");
                Ok(())
            }
            Ok(Reply::Pending) => Err(QueryError::NoResponse),
            Err(QueryError::Command { id, message }) => {
                tracing::warn!("Authentication failed (id={}): {}", id, message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn register_events(&self, session: &mut QuerySession) -> Result<(), QueryError> {
        match session.execute(&Command::notify_register_all()).await {
            Ok(Reply::Complete(_)) => {
                session.context.events_registered = true;
                self.set_phase(ConnectionPhase::Listening);
                tracing::info!("Registered for notifications");
                Ok(())
            }
            Ok(Reply::Pending) => Ok(()),
            Err(QueryError::Command { id, message }) => {
                tracing::warn!("Event registration failed (id={}): {}", id, message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn keepalive(&self, session: &mut QuerySession) -> Result<(), QueryError> {
        let now = session.now_millis();
        let interval = duration_millis(self.settings.timings.keepalive_interval);
        if now.saturating_sub(session.context.last_keepalive) < interval {
            return Ok(());
        }

        session.context.last_keepalive = now;
        match session.execute(&Command::whoami()).await {
            Ok(_) => Ok(()),
            Err(QueryError::Command { id, message }) => {
                tracing::warn!("Keepalive failed (id={}): {}", id, message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Log a connection failure and pick the delay before the next attempt.
    fn backoff_after(&self, error: &QueryError) -> Duration {
        let timings = &self.settings.timings;
        match error {
            QueryError::NotConnected(DisconnectReason::MissingCredential) => {
                tracing::warn!("Disconnected: {}", error);
                timings.auth_pause + timings.reconnect_delay
            }
            QueryError::NotConnected(reason) => {
                tracing::warn!("Remote session lost: {}", reason);
                timings.reconnect_delay
            }
            QueryError::Io(e) => {
                tracing::warn!("Cannot talk to {}: {}", self.connector.endpoint(), e);
                timings.reconnect_delay
            }
            QueryError::Greeting(banner) => {
                tracing::warn!(
                    "{} is not a ClientQuery endpoint (greeting {:?})",
                    self.connector.endpoint(),
                    banner
                );
                timings.reconnect_delay
            }
            QueryError::Malformed(_) => {
                tracing::error!("Dropping connection after malformed input: {}", error);
                timings.reconnect_delay
            }
            _ => {
                tracing::warn!("Connection failed: {}", error);
                timings.reconnect_delay
            }
        }
    }

    /// Sleep in poll-sized slices so a stop request is noticed quickly.
    async fn sleep_while_alive(&self, total: Duration) {
        let slice = self.settings.timings.poll_interval.max(Duration::from_millis(1));
        let mut remaining = total;
        while !remaining.is_zero() && self.is_alive() {
            let step = remaining.min(slice);
            tokio::time::sleep(step).await;
            remaining -= step;
        }
    }

    fn is_alive(&self) -> bool {
        self.shared.stay_alive.load(Ordering::SeqCst)
    }

    fn set_phase(&self, phase: ConnectionPhase) {
        let mut current = self
            .shared
            .phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *current != phase {
            tracing::debug!("Connection phase: {} -> {}", *current, phase);
            *current = phase;
        }
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

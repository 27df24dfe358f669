//! Caller-facing client.
//!
//! [`QueryClient`] runs the connection loop on its own worker thread and
//! exposes only non-blocking accessors: every method touches in-memory
//! state guarded by short-lived locks and returns immediately.

pub mod config;
mod runner;

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

use kikoe_shared::time::{Clock, SystemClock};

use crate::{
    domain::{ConnectionPhase, Connector, IdentityState, ParticipantRecord, Talker},
    infrastructure::{repository::InMemoryRosterRepository, transport::TcpConnector},
};

pub use config::{ConfigSource, Settings, Timings};

use runner::{Runner, SharedState};

const WORKER_THREAD_NAME: &str = "kikoe-query";

pub struct QueryClient {
    settings: Settings,
    connector: Arc<dyn Connector>,
    shared: SharedState,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueryClient {
    /// Client for the plug-in on `settings.host`.
    pub fn new(settings: Settings) -> Self {
        let connector = Arc::new(TcpConnector::new(settings.host.clone()));
        Self::with_connector(settings, connector)
    }

    /// Client using a custom transport.
    pub fn with_connector(settings: Settings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            shared: SharedState {
                roster: Arc::new(InMemoryRosterRepository::default()),
                identity: Arc::new(Mutex::new(IdentityState::default())),
                stay_alive: Arc::new(AtomicBool::new(false)),
                phase: Arc::new(Mutex::new(ConnectionPhase::Disconnected)),
                clock: Arc::new(SystemClock),
            },
            worker: Mutex::new(None),
        }
    }

    /// Replace the clock used for timestamps and talker selection.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.shared.clock = clock;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Start the background connection. Calling it again is a no-op, also
    /// after [`disconnect`](Self::disconnect).
    pub fn start(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            tracing::debug!("Query worker already started");
            return;
        }

        self.shared.stay_alive.store(true, Ordering::SeqCst);
        let runner = Runner::new(
            self.connector.clone(),
            self.settings.clone(),
            self.shared.clone(),
        );
        let spawned = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(runner.run()),
                    Err(e) => tracing::error!("Failed to build worker runtime: {}", e),
                }
            });

        match spawned {
            Ok(handle) => *worker = Some(handle),
            Err(e) => {
                tracing::error!("Failed to spawn query worker: {}", e);
                self.shared.stay_alive.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Ask the worker to close the connection and exit. Does not wait.
    pub fn disconnect(&self) {
        if self.shared.stay_alive.swap(false, Ordering::SeqCst) {
            tracing::info!("Disconnect requested");
        }
    }

    /// Whether the worker thread is still running.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Hand over fresh identity fields from the host application.
    ///
    /// Cheap enough to call on every host update; the worker only acts
    /// when the values actually changed.
    pub fn update(&self, participant_number: &str, display_name: &str) {
        let mut identity = self
            .shared
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if identity.participant_number != participant_number {
            identity.participant_number = participant_number.to_string();
        }
        if identity.display_name != display_name {
            identity.display_name = display_name.to_string();
        }
    }

    pub fn identity(&self) -> IdentityState {
        self.shared
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Participant currently talking, preferring whisperers.
    pub fn current_talker(&self) -> Talker {
        let timeout = self.settings.timings.talk_timeout;
        let timeout_millis = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        self.shared
            .roster
            .select_talker(self.shared.clock.now_millis(), timeout_millis)
    }

    /// Nickname of the current talker, or `""`.
    pub fn talker_nickname(&self) -> String {
        self.current_talker().nickname
    }

    /// Nickname of the current talker if they are whispering, or `""`.
    pub fn whisperer_nickname(&self) -> String {
        let talker = self.current_talker();
        if talker.whispering {
            talker.nickname
        } else {
            String::new()
        }
    }

    pub fn roster(&self) -> Vec<ParticipantRecord> {
        self.shared.roster.snapshot()
    }

    pub fn phase(&self) -> ConnectionPhase {
        *self
            .shared
            .phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for QueryClient {
    fn drop(&mut self) {
        self.shared.stay_alive.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{MockConnector, ParticipantRow, QueryError, RosterRepository};
    use kikoe_shared::time::FixedClock;

    const NOW: i64 = 1_700_000_000_000;

    fn offline_connector() -> MockConnector {
        let mut connector = MockConnector::new();
        connector.expect_endpoint().return_const("test:25639".to_string());
        connector
            .expect_connect()
            .returning(|| Err(QueryError::ConnectionClosed));
        connector
    }

    fn create_test_client() -> QueryClient {
        QueryClient::with_connector(Settings::default(), Arc::new(offline_connector()))
            .with_clock(Arc::new(FixedClock::new(NOW)))
    }

    #[test]
    fn test_queries_without_connection_return_nobody() {
        // テスト項目: 未接続でも問い合わせは空の値を返す
        // given (前提条件):
        let client = create_test_client();

        // when (操作) / then (期待する結果):
        assert_eq!(client.talker_nickname(), "");
        assert_eq!(client.whisperer_nickname(), "");
        assert!(client.roster().is_empty());
        assert_eq!(client.phase(), ConnectionPhase::Disconnected);
        assert!(!client.is_running());
    }

    #[test]
    fn test_talker_and_whisperer_queries() {
        // テスト項目: 発話者とウィスパーの問い合わせがロスターを反映する
        // given (前提条件):
        let client = create_test_client();
        client.shared.roster.refresh(
            vec![ParticipantRow {
                id: "7".to_string(),
                nickname: "Nana".to_string(),
                channel_id: None,
            }],
            NOW,
        );

        // when (操作):
        client.shared.roster.apply_talk("7", true, false, NOW);
        let talking = (client.talker_nickname(), client.whisperer_nickname());
        client.shared.roster.apply_talk("7", true, true, NOW);
        let whispering = (client.talker_nickname(), client.whisperer_nickname());

        // then (期待する結果):
        assert_eq!(talking, ("Nana".to_string(), String::new()));
        assert_eq!(whispering, ("Nana".to_string(), "Nana".to_string()));
    }

    #[test]
    fn test_update_stores_identity() {
        // テスト項目: update() で識別情報が保存される
        // given (前提条件):
        let client = create_test_client();

        // when (操作):
        client.update("12", "Officer Bob");

        // then (期待する結果):
        assert_eq!(
            client.identity(),
            IdentityState {
                participant_number: "12".to_string(),
                display_name: "Officer Bob".to_string(),
            }
        );
    }

    #[test]
    fn test_start_is_idempotent_and_disconnect_stops_worker() {
        // テスト項目: start() の二重呼び出しは無視され、disconnect() でワーカーが終了する
        // given (前提条件):
        let settings = Settings::default().with_timings(Timings {
            poll_interval: Duration::from_millis(5),
            reconnect_delay: Duration::from_secs(30),
            ..Timings::default()
        });
        let client = QueryClient::with_connector(settings, Arc::new(offline_connector()));

        // when (操作):
        client.start();
        client.start();
        let running = client.is_running();
        client.disconnect();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while client.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        // then (期待する結果):
        assert!(running);
        assert!(!client.is_running());
        client.start();
        assert!(!client.is_running());
    }
}

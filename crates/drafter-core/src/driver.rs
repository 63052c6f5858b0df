//! Runs the [`Command`]s produced by state transitions.
//!
//! Each command becomes a spawned task that reports back as an [`Event`] on
//! the channel the UI loop reads from. Requests are never cancelled; the only
//! long-lived resource is the poll timer, which [`Driver::shutdown`] releases.

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::backend::DrafterApi;
use crate::config::Timing;
use crate::session::SessionId;
use crate::state::{Command, Event};

pub struct Driver<A: DrafterApi> {
    api: A,
    session: SessionId,
    timing: Timing,
    events: UnboundedSender<Event>,
    poller: Option<JoinHandle<()>>,
}

impl<A: DrafterApi> Driver<A> {
    pub fn new(api: A, session: SessionId, timing: Timing, events: UnboundedSender<Event>) -> Self {
        Self {
            api,
            session,
            timing,
            events,
            poller: None,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Start the repeating document poll. The first tick comes one period from now.
    pub fn start_polling(&mut self) {
        if self.poller.is_some() {
            return;
        }

        let period = self.timing.poll_interval;
        let tx = self.events.clone();
        self.poller = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(Event::PollTick).is_err() {
                    break;
                }
            }
        }));
        tracing::info!(session = %self.session, ?period, "Document polling started");
    }

    /// Release the poll timer. In-flight requests are left to finish on their own.
    pub fn shutdown(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
            tracing::info!(session = %self.session, "Document polling stopped");
        }
    }

    pub fn run_all(&self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            self.execute(command);
        }
    }

    pub fn execute(&self, command: Command) {
        let api = self.api.clone();
        let session = self.session.clone();
        let tx = self.events.clone();

        match command {
            Command::SendChat { message } => {
                tracing::info!(session = %session, chars = message.chars().count(), "Sending chat message");
                tokio::spawn(async move {
                    let result = api
                        .send_chat(&message, &session)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(Event::ChatCompleted(result));
                });
            }
            Command::FetchDocument { seq } => {
                tokio::spawn(async move {
                    let result = api.fetch_document(&session).await.map_err(|e| e.to_string());
                    let _ = tx.send(Event::DocumentFetched { seq, result });
                });
            }
            Command::ScheduleReconcile => {
                let delay = self.timing.reconcile_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Event::ReconcileDue);
                });
            }
            Command::CheckHealth => {
                tokio::spawn(async move {
                    let result = api.health().await.map_err(|e| e.to_string());
                    let _ = tx.send(Event::HealthChecked(result));
                });
            }
            Command::ClearSession => {
                tracing::info!(session = %session, "Clearing session");
                tokio::spawn(async move {
                    let result = api.clear_session(&session).await.map_err(|e| e.to_string());
                    let _ = tx.send(Event::SessionCleared(result));
                });
            }
        }
    }
}

impl<A: DrafterApi> Drop for Driver<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ChatReply, Health};
    use crate::config::DocumentOrdering;
    use crate::error::ApiError;
    use crate::state::DraftState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Clone, Default)]
    struct FakeApi {
        document: Arc<Mutex<String>>,
        chat_fails: bool,
        fetches: Arc<AtomicUsize>,
        chats: Arc<AtomicUsize>,
    }

    impl DrafterApi for FakeApi {
        async fn fetch_document(&self, _session: &SessionId) -> Result<String, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.document.lock().unwrap().clone())
        }

        async fn send_chat(&self, message: &str, _session: &SessionId) -> Result<ChatReply, ApiError> {
            self.chats.fetch_add(1, Ordering::SeqCst);
            if self.chat_fails {
                return Err(ApiError::Rejected("model unavailable".into()));
            }
            let content = format!("Document about: {}", message);
            *self.document.lock().unwrap() = format!("{} (saved)", content);
            Ok(ChatReply {
                response: "Updated the document".into(),
                tools_used: vec!["update_document".into()],
                document_content: Some(content),
            })
        }

        async fn health(&self) -> Result<Health, ApiError> {
            Ok(Health {
                status: "healthy".into(),
                active_sessions: 1,
            })
        }

        async fn clear_session(&self, _session: &SessionId) -> Result<(), ApiError> {
            self.document.lock().unwrap().clear();
            Ok(())
        }
    }

    fn timing() -> Timing {
        Timing {
            poll_interval: Duration::from_secs(2),
            reconcile_delay: Duration::from_secs(1),
        }
    }

    fn driver(api: FakeApi) -> (Driver<FakeApi>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = SessionId::parse("testsession").unwrap();
        (Driver::new(api, session, timing(), tx), rx)
    }

    #[tokio::test]
    async fn test_fetch_reports_sequence_number() {
        let api = FakeApi::default();
        *api.document.lock().unwrap() = "hello".into();
        let (driver, mut rx) = driver(api);

        driver.execute(Command::FetchDocument { seq: 7 });

        assert_eq!(
            rx.recv().await.unwrap(),
            Event::DocumentFetched {
                seq: 7,
                result: Ok("hello".into())
            }
        );
    }

    #[tokio::test]
    async fn test_chat_failure_is_reported_as_text() {
        let api = FakeApi {
            chat_fails: true,
            ..FakeApi::default()
        };
        let (driver, mut rx) = driver(api);

        driver.execute(Command::SendChat {
            message: "hi".into(),
        });

        assert_eq!(
            rx.recv().await.unwrap(),
            Event::ChatCompleted(Err("model unavailable".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_fires_after_delay() {
        let (driver, mut rx) = driver(FakeApi::default());
        let start = Instant::now();

        driver.execute(Command::ScheduleReconcile);

        assert_eq!(rx.recv().await.unwrap(), Event::ReconcileDue);
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_ticks_every_interval() {
        let (mut driver, mut rx) = driver(FakeApi::default());
        let start = Instant::now();

        driver.start_polling();
        assert!(driver.is_polling());

        for n in 1..=3u32 {
            assert_eq!(rx.recv().await.unwrap(), Event::PollTick);
            assert!(start.elapsed() >= Duration::from_secs(2) * n);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_timer() {
        let (mut driver, mut rx) = driver(FakeApi::default());

        driver.start_polling();
        driver.shutdown();
        assert!(!driver.is_polling());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let (mut driver, mut rx) = driver(FakeApi::default());

        driver.start_polling();
        assert_eq!(rx.recv().await.unwrap(), Event::PollTick);
        drop(driver);

        // Every sender is gone once the poll task is aborted, so no tick can follow
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_send_cycle() {
        let api = FakeApi::default();
        let (driver, mut rx) = driver(api.clone());
        let mut state = DraftState::new(DocumentOrdering::IssueOrder);

        let t = state.apply(Event::Submit("robots".into()), chrono::Local::now());
        state = t.state;
        driver.run_all(t.commands);

        // Chat completes: document shown immediately, reconcile scheduled
        let event = rx.recv().await.unwrap();
        let t = state.apply(event, chrono::Local::now());
        state = t.state;
        assert_eq!(state.document().content(), "Document about: robots");
        assert_eq!(t.commands, vec![Command::ScheduleReconcile]);
        driver.run_all(t.commands);

        // Reconcile timer fires, fetch issued
        let event = rx.recv().await.unwrap();
        assert_eq!(event, Event::ReconcileDue);
        let t = state.apply(event, chrono::Local::now());
        state = t.state;
        driver.run_all(t.commands);

        // Canonical server state replaces the embedded copy
        let event = rx.recv().await.unwrap();
        state = state.apply(event, chrono::Local::now()).state;
        assert_eq!(state.document().content(), "Document about: robots (saved)");
        assert_eq!(state.messages().len(), 2);
        assert!(!state.is_loading());
        assert_eq!(api.chats.load(Ordering::SeqCst), 1);
        assert_eq!(api.fetches.load(Ordering::SeqCst), 1);
    }
}

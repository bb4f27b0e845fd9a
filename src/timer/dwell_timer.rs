//! Dwell session state machine
//!
//! `Idle -> Running -> TimeUp`, with `reset_timer` returning any state to
//! `Idle`. Remaining time is always recomputed from the persisted start time
//! and the wall clock, never from a count of ticks, so a session survives the
//! process being backgrounded, suspended or killed.
//!
//! Commands are serialized through an async operation lock. Each command reads
//! the latest state at the moment it decides, so a ticker or handler never acts
//! on a snapshot taken before an await.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    config::DwellConfig,
    services::{Clock, KeyValueStore},
    state::{
        session::{
            decode_start_time, elapsed_seconds, generate_session_id, remaining_seconds,
            SESSION_ID_KEY, START_TIME_KEY,
        },
        Session, TimerState,
    },
    tasks::dwell_ticker_task,
};

use super::AppLifecycle;

/// Persisted, wall-clock anchored countdown for one visit at a time
pub struct DwellTimer {
    config: DwellConfig,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<TimerState>,
    /// Serializes commands; held across store awaits
    ops: tokio::sync::Mutex<()>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    /// Bumped whenever the ticker is stopped; a ticker only acts on its own generation
    ticker_generation: AtomicU64,
    lifecycle: Mutex<AppLifecycle>,
    /// Last session id issued or observed, so a new id never repeats it
    last_session_id: Mutex<Option<String>>,
    update_tx: watch::Sender<TimerState>,
}

impl DwellTimer {
    pub fn new(
        config: DwellConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let initial = TimerState::new(config.total_duration_seconds);
        let (update_tx, _) = watch::channel(initial.clone());

        Arc::new(Self {
            config,
            store,
            clock,
            state: Mutex::new(initial),
            ops: tokio::sync::Mutex::new(()),
            ticker: Mutex::new(None),
            ticker_generation: AtomicU64::new(0),
            lifecycle: Mutex::new(AppLifecycle::default()),
            last_session_id: Mutex::new(None),
            update_tx,
        })
    }

    /// Current observed state
    pub fn snapshot(&self) -> TimerState {
        self.lock_state().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.update_tx.subscribe()
    }

    /// Whether a ticker task is currently live
    pub fn is_ticking(&self) -> bool {
        self.lock_ticker()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Start a new session now, or resume one from its persisted anchor
    ///
    /// Both the start time and the session id are written in a single store
    /// call. A failed write is logged and the timer runs in memory anyway.
    pub async fn start_timer(
        self: &Arc<Self>,
        start_time: Option<DateTime<Utc>>,
        session_id: Option<String>,
    ) {
        let _op = self.ops.lock().await;
        self.start_locked(start_time, session_id).await;
    }

    /// Stop the ticker, return to `Idle` and forget the persisted session
    pub async fn reset_timer(&self) {
        let _op = self.ops.lock().await;
        self.reset_locked().await;
    }

    /// Generate and persist a fresh session id without starting a countdown
    pub async fn start_new_session(&self) -> String {
        let _op = self.ops.lock().await;
        let session_id = self.next_session_id();
        if let Err(e) = self.store.set(SESSION_ID_KEY, session_id.clone()).await {
            warn!("Failed to persist session id {}: {}", session_id, e);
        }
        self.update_state(|s| s.current_session_id = Some(session_id.clone()));
        session_id
    }

    /// Whole seconds since the persisted start time; 0 when there is none
    pub async fn calculate_elapsed_time(&self) -> i64 {
        match self.read_start_time().await {
            Some(start) => elapsed_seconds(start, self.clock.now()),
            None => 0,
        }
    }

    /// Run one recomputation, exactly as the ticker does
    ///
    /// Does nothing unless a session is running.
    pub async fn tick(&self) {
        let _op = self.ops.lock().await;
        let running = self.lock_state().is_running;
        if running {
            self.recompute_locked().await;
        }
    }

    /// Ticker entry point; returns `false` once the ticker should exit
    pub(crate) async fn tick_generation(&self, generation: u64) -> bool {
        let _op = self.ops.lock().await;
        if self.ticker_generation.load(Ordering::SeqCst) != generation {
            debug!("Ticker generation {} superseded, exiting", generation);
            return false;
        }
        let running = self.lock_state().is_running;
        if !running {
            return false;
        }
        self.recompute_locked().await
    }

    /// Reconcile with persisted state when the hosting screen becomes visible
    ///
    /// Persisted data left behind by an earlier mount, or by a different
    /// session, is discarded and a new session begins. Only the session this
    /// instance is already tracking is resumed, anchored to its original start.
    pub async fn reconcile_on_focus(self: &Arc<Self>) {
        let _op = self.ops.lock().await;

        let stored_session_id = self.read_session_id().await;
        let stored_start = self.read_start_time().await;
        let current = self.snapshot();

        match (stored_session_id, stored_start) {
            (Some(stored_id), Some(start)) => {
                let same_session = current.current_session_id.as_deref() == Some(stored_id.as_str());
                if !same_session {
                    match current.current_session_id.as_deref() {
                        None => info!("Fresh mount found stale session {}, starting over", stored_id),
                        Some(tracked) => info!(
                            "Persisted session {} does not match tracked session {}, starting over",
                            stored_id, tracked
                        ),
                    }
                    self.note_session_id(&stored_id);
                    self.reset_locked().await;
                    if !current.is_time_up {
                        self.start_locked(None, None).await;
                    }
                    return;
                }

                if current.is_time_up {
                    debug!("Session {} already time up, nothing to resume", stored_id);
                    return;
                }

                let session = Session::new(stored_id, start, self.config.total_duration_seconds);
                let remaining = session.remaining_seconds(self.clock.now());
                if remaining == 0 {
                    info!("Session {} ran out while unobserved", session.session_id);
                    self.finalize_locked().await;
                    return;
                }

                self.update_state(|s| s.remaining_seconds = remaining);
                if !self.is_ticking() {
                    debug!("Resuming session {} with {}s remaining", session.session_id, remaining);
                    self.start_locked(Some(session.start_time), Some(session.session_id)).await;
                }
            }
            _ if current.is_time_up => {
                debug!("Time is up, not starting another session on focus");
            }
            _ => {
                info!("No persisted session, starting the first one");
                self.start_locked(None, None).await;
            }
        }
    }

    /// React to a foreground/background transition
    ///
    /// Leaving the foreground only stops the ticker; the persisted anchor is
    /// kept so the session keeps running against the wall clock.
    pub async fn handle_lifecycle_change(self: &Arc<Self>, next: AppLifecycle) {
        let _op = self.ops.lock().await;

        let previous = {
            let mut lifecycle = self.lock_lifecycle();
            std::mem::replace(&mut *lifecycle, next)
        };
        debug!("Lifecycle {} -> {}", previous, next);

        if next.is_suspended() {
            if self.is_ticking() {
                info!("App is {}, pausing ticker", next);
            }
            self.stop_ticker();
        } else if previous.is_suspended() {
            self.resume_locked().await;
        }
    }

    /// Forget the tracked session as if the hosting screen were newly mounted
    ///
    /// Persisted keys are kept; the next focus sees them as stale and starts
    /// a new session instead of resuming.
    pub async fn remount(&self) {
        let _op = self.ops.lock().await;
        self.stop_ticker();
        let previous = self.snapshot().current_session_id;
        if let Some(session_id) = &previous {
            self.note_session_id(session_id);
        }
        self.update_state(|s| *s = TimerState::new(self.config.total_duration_seconds));
        info!(
            "Timer remounted, no longer tracking session {}",
            previous.as_deref().unwrap_or("<none>")
        );
    }

    /// Stop the ticker on teardown; persisted state is left untouched
    pub fn shutdown(&self) {
        self.stop_ticker();
        debug!("Dwell timer shut down");
    }

    async fn start_locked(
        self: &Arc<Self>,
        start_time: Option<DateTime<Utc>>,
        session_id: Option<String>,
    ) {
        let start_time = start_time.unwrap_or_else(|| self.clock.now());
        let session_id = session_id.unwrap_or_else(|| self.next_session_id());
        self.note_session_id(&session_id);
        let session = Session::new(session_id, start_time, self.config.total_duration_seconds);

        if let Err(e) = self.store.set_many(&session.persisted_entries()).await {
            warn!(
                "Failed to persist session {}: {} (continuing in memory only)",
                session.session_id, e
            );
        }

        let generation = self.stop_ticker();
        let remaining = session.remaining_seconds(self.clock.now());
        let session_id = session.session_id;
        self.update_state(|s| {
            s.is_running = true;
            s.is_time_up = false;
            s.current_session_id = Some(session_id.clone());
            s.remaining_seconds = remaining;
        });
        info!("Dwell session {} running, {}s remaining", session_id, remaining);

        if remaining == 0 {
            self.finalize_locked().await;
            return;
        }

        let handle = tokio::spawn(dwell_ticker_task(
            Arc::downgrade(self),
            generation,
            self.config.tick_interval,
        ));
        *self.lock_ticker() = Some(handle);
    }

    async fn reset_locked(&self) {
        self.stop_ticker();
        self.update_state(|s| *s = TimerState::new(self.config.total_duration_seconds));
        if let Err(e) = self.store.remove_many(&[START_TIME_KEY, SESSION_ID_KEY]).await {
            warn!("Failed to clear persisted session: {}", e);
        }
        info!("Dwell timer reset");
    }

    /// Returns `true` while the countdown should keep ticking
    async fn recompute_locked(&self) -> bool {
        let elapsed = self.calculate_elapsed_time().await;
        let remaining = remaining_seconds(self.config.total_duration_seconds, elapsed);
        if remaining == 0 {
            self.finalize_locked().await;
            return false;
        }
        self.update_state(|s| s.remaining_seconds = remaining);
        debug!("Tick: {}s remaining", remaining);
        true
    }

    async fn resume_locked(self: &Arc<Self>) {
        let current = self.snapshot();
        if current.is_time_up {
            return;
        }
        let Some(start) = self.read_start_time().await else {
            debug!("Returned to foreground with no persisted session");
            return;
        };

        let remaining = self.remaining_since(start);
        self.update_state(|s| s.remaining_seconds = remaining);

        if remaining > 0 {
            let stored_session_id = self.read_session_id().await;
            match (stored_session_id, current.current_session_id) {
                (Some(stored), Some(tracked)) if stored == tracked => {
                    info!("Returned to foreground, resuming session {}", stored);
                    self.start_locked(Some(start), Some(stored)).await;
                }
                _ => debug!("Persisted session is not the tracked one, not resuming"),
            }
        } else if current.is_running {
            info!("Session ran out while in the background");
            self.finalize_locked().await;
        }
    }

    /// Enter `TimeUp`: clears the start-time key but keeps the session id
    async fn finalize_locked(&self) {
        let finished = self.update_state(|s| {
            s.remaining_seconds = 0;
            s.is_time_up = true;
            s.is_running = false;
        });
        if let Err(e) = self.store.remove(START_TIME_KEY).await {
            warn!("Failed to clear start time after completion: {}", e);
        }
        info!(
            "Dwell session {} complete",
            finished.current_session_id.as_deref().unwrap_or("<untracked>")
        );
        // Last: this may abort the calling ticker task at its next await.
        self.stop_ticker();
    }

    /// Cancel any live ticker; returns the generation a new ticker should use
    fn stop_ticker(&self) -> u64 {
        let generation = self.ticker_generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = self.lock_ticker().take() {
            handle.abort();
        }
        generation
    }

    fn remaining_since(&self, start: DateTime<Utc>) -> u64 {
        remaining_seconds(
            self.config.total_duration_seconds,
            elapsed_seconds(start, self.clock.now()),
        )
    }

    fn next_session_id(&self) -> String {
        let previous = self.lock_last_session_id().clone();
        generate_session_id(self.clock.now(), previous.as_deref())
    }

    fn note_session_id(&self, session_id: &str) {
        *self.lock_last_session_id() = Some(session_id.to_string());
    }

    async fn read_start_time(&self) -> Option<DateTime<Utc>> {
        let raw = match self.store.get(START_TIME_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read persisted start time, treating as absent: {}", e);
                return None;
            }
        };
        let parsed = decode_start_time(&raw);
        if parsed.is_none() {
            warn!("Ignoring unparseable persisted start time {:?}", raw);
        }
        parsed
    }

    async fn read_session_id(&self) -> Option<String> {
        match self.store.get(SESSION_ID_KEY).await {
            Ok(id) => id.filter(|id| !id.is_empty()),
            Err(e) => {
                warn!("Failed to read persisted session id, treating as absent: {}", e);
                None
            }
        }
    }

    fn update_state<F>(&self, updater: F) -> TimerState
    where
        F: FnOnce(&mut TimerState),
    {
        let mut state = self.lock_state();
        updater(&mut state);
        let new_state = state.clone();
        drop(state);

        self.update_tx.send_replace(new_state.clone());
        new_state
    }

    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            error!("Timer state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_ticker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, AppLifecycle> {
        self.lifecycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_last_session_id(&self) -> MutexGuard<'_, Option<String>> {
        self.last_session_id
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for DwellTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_ticker().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::{Duration, TimeZone};
    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        services::{ManualClock, MemoryStore, StoreError},
        state::session::encode_start_time,
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
    }

    fn fixture() -> (Arc<DwellTimer>, Arc<MemoryStore>, ManualClock) {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(t0());
        let timer = DwellTimer::new(DwellConfig::default(), store.clone(), Arc::new(clock.clone()));
        (timer, store, clock)
    }

    async fn persisted(store: &MemoryStore, key: &str) -> Option<String> {
        store.get(key).await.unwrap()
    }

    /// Store whose every operation fails
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
            Box::pin(async { Err(StoreError::Unavailable("disk gone".into())) })
        }

        fn set_many<'a>(
            &'a self,
            _entries: &'a [(&'a str, String)],
        ) -> BoxFuture<'a, Result<(), StoreError>> {
            Box::pin(async { Err(StoreError::Unavailable("disk gone".into())) })
        }

        fn remove_many<'a>(&'a self, _keys: &'a [&'a str]) -> BoxFuture<'a, Result<(), StoreError>> {
            Box::pin(async { Err(StoreError::Unavailable("disk gone".into())) })
        }
    }

    #[tokio::test]
    async fn start_then_tick_past_duration_completes_session() {
        let (timer, store, clock) = fixture();

        timer.start_timer(None, None).await;
        let state = timer.snapshot();
        let session_id = state.current_session_id.clone().unwrap();
        assert_eq!(session_id, t0().timestamp_millis().to_string());
        assert_eq!(state.remaining_seconds, 600);
        assert!(state.is_running);
        assert!(!state.is_time_up);
        assert!(timer.is_ticking());
        assert_eq!(
            persisted(&store, START_TIME_KEY).await,
            Some(encode_start_time(t0()))
        );

        clock.advance_secs(605);
        timer.tick().await;

        let state = timer.snapshot();
        assert!(state.is_time_up);
        assert!(!state.is_running);
        assert_eq!(state.remaining_seconds, 0);
        assert!(!timer.is_ticking());
        assert_eq!(persisted(&store, START_TIME_KEY).await, None);
        assert_eq!(persisted(&store, SESSION_ID_KEY).await, Some(session_id));
    }

    #[tokio::test]
    async fn tick_recomputes_from_wall_clock() {
        let (timer, _store, clock) = fixture();
        timer.start_timer(None, None).await;

        clock.advance(Duration::milliseconds(42_700));
        timer.tick().await;
        assert_eq!(timer.snapshot().remaining_seconds, 558);
    }

    #[tokio::test]
    async fn focus_after_duration_finishes_without_ticking() {
        let (timer, _store, clock) = fixture();
        timer.start_timer(None, None).await;
        let session_id = timer.snapshot().current_session_id;

        clock.advance_secs(700);
        timer.reconcile_on_focus().await;

        let state = timer.snapshot();
        assert!(state.is_time_up);
        assert_eq!(state.remaining_seconds, 0);
        assert_eq!(state.current_session_id, session_id);
    }

    #[tokio::test]
    async fn fresh_mount_discards_stale_session() {
        let (timer, store, clock) = fixture();
        store
            .set_many(&[
                (START_TIME_KEY, encode_start_time(t0() - Duration::seconds(100))),
                (SESSION_ID_KEY, "A".to_string()),
            ])
            .await
            .unwrap();
        clock.advance_secs(5);

        timer.reconcile_on_focus().await;

        let state = timer.snapshot();
        let new_id = state.current_session_id.clone().unwrap();
        assert_ne!(new_id, "A");
        assert_eq!(state.remaining_seconds, 600);
        assert!(state.is_running);
        assert_eq!(persisted(&store, SESSION_ID_KEY).await, Some(new_id));
        assert_eq!(
            persisted(&store, START_TIME_KEY).await,
            Some(encode_start_time(t0() + Duration::seconds(5)))
        );
    }

    #[tokio::test]
    async fn mismatched_session_starts_over() {
        let (timer, store, clock) = fixture();
        timer.start_timer(None, None).await;
        store.set(SESSION_ID_KEY, "someone-else".to_string()).await.unwrap();
        clock.advance_secs(30);

        timer.reconcile_on_focus().await;

        let state = timer.snapshot();
        assert_ne!(state.current_session_id.as_deref(), Some("someone-else"));
        assert_eq!(state.remaining_seconds, 600);
    }

    #[tokio::test]
    async fn reset_clears_persistence_and_next_mount_starts_fresh() {
        let (timer, store, clock) = fixture();
        timer.start_timer(None, None).await;
        clock.advance_secs(200);

        timer.reset_timer().await;
        assert_eq!(timer.snapshot(), TimerState::new(600));
        assert!(!timer.is_ticking());
        assert_eq!(persisted(&store, START_TIME_KEY).await, None);
        assert_eq!(persisted(&store, SESSION_ID_KEY).await, None);

        let remount = DwellTimer::new(DwellConfig::default(), store.clone(), Arc::new(clock.clone()));
        remount.reconcile_on_focus().await;
        let state = remount.snapshot();
        assert!(state.is_running);
        assert_eq!(state.remaining_seconds, 600);
    }

    #[tokio::test]
    async fn reset_from_idle_is_harmless() {
        let (timer, store, _clock) = fixture();
        timer.reset_timer().await;
        timer.reset_timer().await;
        assert_eq!(timer.snapshot(), TimerState::new(600));
        assert_eq!(persisted(&store, SESSION_ID_KEY).await, None);
    }

    #[tokio::test]
    async fn focus_resumes_same_session_from_original_anchor() {
        let (timer, store, clock) = fixture();
        timer.start_timer(None, None).await;
        let session_id = timer.snapshot().current_session_id;

        timer.handle_lifecycle_change(AppLifecycle::Background).await;
        clock.advance_secs(120);
        timer.reconcile_on_focus().await;

        let state = timer.snapshot();
        assert_eq!(state.current_session_id, session_id);
        assert_eq!(state.remaining_seconds, 480);
        assert!(timer.is_ticking());
        assert_eq!(
            persisted(&store, START_TIME_KEY).await,
            Some(encode_start_time(t0()))
        );
    }

    #[tokio::test]
    async fn background_past_duration_finalizes_on_return() {
        let (timer, store, clock) = fixture();
        timer.start_timer(None, None).await;

        clock.advance_secs(100);
        timer.tick().await;
        assert_eq!(timer.snapshot().remaining_seconds, 500);

        timer.handle_lifecycle_change(AppLifecycle::Background).await;
        assert!(!timer.is_ticking());
        assert!(timer.snapshot().is_running);
        assert!(persisted(&store, START_TIME_KEY).await.is_some());

        clock.advance_secs(550);
        timer.handle_lifecycle_change(AppLifecycle::Active).await;

        let state = timer.snapshot();
        assert!(state.is_time_up);
        assert!(!state.is_running);
        assert_eq!(state.remaining_seconds, 0);
        assert!(!timer.is_ticking());
        assert_eq!(persisted(&store, START_TIME_KEY).await, None);
    }

    #[tokio::test]
    async fn foreground_resume_keeps_elapsed_progress() {
        let (timer, store, clock) = fixture();
        timer.start_timer(None, None).await;
        let session_id = timer.snapshot().current_session_id;

        timer.handle_lifecycle_change(AppLifecycle::Inactive).await;
        clock.advance_secs(250);
        timer.handle_lifecycle_change(AppLifecycle::Active).await;

        let state = timer.snapshot();
        assert_eq!(state.remaining_seconds, 350);
        assert!(state.is_running);
        assert_eq!(state.current_session_id, session_id);
        assert!(timer.is_ticking());
        assert_eq!(
            persisted(&store, START_TIME_KEY).await,
            Some(encode_start_time(t0()))
        );
    }

    #[tokio::test]
    async fn time_up_survives_focus_and_lifecycle_events() {
        let (timer, _store, clock) = fixture();
        timer.start_timer(None, None).await;
        let session_id = timer.snapshot().current_session_id;
        clock.advance_secs(700);
        timer.tick().await;
        assert!(timer.snapshot().is_time_up);

        timer.reconcile_on_focus().await;
        timer.handle_lifecycle_change(AppLifecycle::Background).await;
        clock.advance_secs(60);
        timer.handle_lifecycle_change(AppLifecycle::Active).await;
        timer.reconcile_on_focus().await;
        timer.tick().await;

        let state = timer.snapshot();
        assert!(state.is_time_up);
        assert_eq!(state.remaining_seconds, 0);
        assert_eq!(state.current_session_id, session_id);
        assert!(!timer.is_ticking());
    }

    #[tokio::test]
    async fn restarting_replaces_the_ticker() {
        let (timer, store, clock) = fixture();
        timer.start_timer(None, None).await;
        let session_id = timer.snapshot().current_session_id.unwrap();

        clock.advance_secs(10);
        timer.start_timer(Some(t0()), Some(session_id.clone())).await;
        timer.start_timer(Some(t0()), Some(session_id.clone())).await;

        assert!(timer.is_ticking());
        let state = timer.snapshot();
        assert_eq!(state.current_session_id.as_deref(), Some(session_id.as_str()));
        assert_eq!(state.remaining_seconds, 590);
        assert_eq!(persisted(&store, SESSION_ID_KEY).await, Some(session_id));
    }

    #[tokio::test]
    async fn resuming_an_expired_anchor_goes_straight_to_time_up() {
        let (timer, _store, _clock) = fixture();
        timer
            .start_timer(Some(t0() - Duration::seconds(900)), Some("old".into()))
            .await;

        let state = timer.snapshot();
        assert!(state.is_time_up);
        assert!(!state.is_running);
        assert!(!timer.is_ticking());
    }

    #[tokio::test]
    async fn elapsed_time_reads_persisted_anchor() {
        let (timer, store, clock) = fixture();
        assert_eq!(timer.calculate_elapsed_time().await, 0);

        timer.start_timer(None, None).await;
        clock.advance(Duration::milliseconds(61_900));
        assert_eq!(timer.calculate_elapsed_time().await, 61);

        store.set(START_TIME_KEY, "garbage".to_string()).await.unwrap();
        assert_eq!(timer.calculate_elapsed_time().await, 0);
    }

    #[tokio::test]
    async fn corrupt_anchor_on_fresh_mount_starts_first_session() {
        let (timer, store, _clock) = fixture();
        store
            .set_many(&[
                (START_TIME_KEY, "not a date".to_string()),
                (SESSION_ID_KEY, "A".to_string()),
            ])
            .await
            .unwrap();

        timer.reconcile_on_focus().await;
        let state = timer.snapshot();
        assert!(state.is_running);
        assert_ne!(state.current_session_id.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn broken_store_fails_open() {
        let clock = ManualClock::new(t0());
        let timer = DwellTimer::new(
            DwellConfig::default(),
            Arc::new(BrokenStore),
            Arc::new(clock.clone()),
        );

        timer.reconcile_on_focus().await;
        let state = timer.snapshot();
        assert!(state.is_running);
        assert_eq!(state.remaining_seconds, 600);
        assert!(state.current_session_id.is_some());
        assert_eq!(timer.calculate_elapsed_time().await, 0);

        timer.reset_timer().await;
        assert_eq!(timer.snapshot(), TimerState::new(600));
    }

    #[tokio::test]
    async fn new_session_id_differs_after_reset_in_same_millisecond() {
        let (timer, store, _clock) = fixture();
        timer.start_timer(None, None).await;
        let first = timer.snapshot().current_session_id.unwrap();

        timer.reset_timer().await;
        let second = timer.start_new_session().await;
        assert_ne!(first, second);
        assert_eq!(persisted(&store, SESSION_ID_KEY).await, Some(second.clone()));
        assert_eq!(timer.snapshot().current_session_id, Some(second));
    }

    #[tokio::test]
    async fn remount_discards_running_session_on_next_focus() {
        let (timer, store, clock) = fixture();
        timer.start_timer(None, None).await;
        let first = timer.snapshot().current_session_id.unwrap();
        clock.advance_secs(590);

        timer.remount().await;
        assert_eq!(timer.snapshot(), TimerState::new(600));
        assert!(!timer.is_ticking());
        assert_eq!(persisted(&store, SESSION_ID_KEY).await, Some(first.clone()));

        timer.reconcile_on_focus().await;
        let state = timer.snapshot();
        assert_ne!(state.current_session_id.as_deref(), Some(first.as_str()));
        assert_eq!(state.remaining_seconds, 600);
        assert!(state.is_running);
    }

    #[tokio::test]
    async fn remount_after_time_up_starts_a_new_session() {
        let (timer, _store, clock) = fixture();
        timer.start_timer(None, None).await;
        let first = timer.snapshot().current_session_id.unwrap();
        clock.advance_secs(601);
        timer.tick().await;
        assert!(timer.snapshot().is_time_up);

        timer.remount().await;
        timer.reconcile_on_focus().await;

        let state = timer.snapshot();
        assert!(!state.is_time_up);
        assert!(state.is_running);
        assert_eq!(state.remaining_seconds, 600);
        assert_ne!(state.current_session_id.as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn shutdown_stops_ticker_but_keeps_session() {
        let (timer, store, _clock) = fixture();
        timer.start_timer(None, None).await;
        timer.shutdown();

        assert!(!timer.is_ticking());
        assert!(persisted(&store, START_TIME_KEY).await.is_some());
        assert!(persisted(&store, SESSION_ID_KEY).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_task_drives_completion() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(t0());
        let timer = DwellTimer::new(DwellConfig::default(), store.clone(), Arc::new(clock.clone()));
        let mut updates = timer.subscribe();

        timer.start_timer(None, None).await;
        clock.advance_secs(605);

        let finished = tokio::time::timeout(
            StdDuration::from_secs(5),
            updates.wait_for(|state| state.is_time_up),
        )
        .await
        .expect("ticker should finish the session")
        .map(|state| state.remaining_seconds)
        .expect("timer still alive");

        assert_eq!(finished, 0);
        assert_eq!(persisted(&store, START_TIME_KEY).await, None);
    }
}

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::Backend,
    db::models::{Routine, SessionRecord},
    log_error, log_info, log_warn,
    models::{LoggedExercise, SetEntry, SetPatch, WorkoutSession},
    settings::LocalStore,
    workout::{
        arbitrate_start,
        progression::{self, FinishExerciseOutcome, NextStep},
        RestoreGuard, StartDecision,
    },
};

use super::{Clock, ClockStatus, RestTimer, SessionError};

const ENABLE_LOGS: bool = true;

/// How many completed sessions are consulted when comparing an exercise with its last run.
const HISTORY_LOOKBACK: usize = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session: Option<WorkoutSession>,
    pub status: Option<ClockStatus>,
    pub rest: Option<RestTimer>,
    pub rest_remaining_secs: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum SessionEvent {
    StateChanged { snapshot: SessionSnapshot },
    Tick { session_id: String, duration_seconds: u64 },
    RestTick { remaining_secs: u32 },
    RestFinished,
    ExerciseFinished { outcome: FinishExerciseOutcome },
    SessionFinished { record: SessionRecord },
    SessionDiscarded { session_id: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseAdvance {
    pub outcome: FinishExerciseOutcome,
    /// Present when advancing past the last exercise finished the session.
    pub finished: Option<SessionRecord>,
}

struct TickerHandle {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl TickerHandle {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Owns the in-progress workout: clock, ticker, set edits, and the draft mirror.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<Option<WorkoutSession>>>,
    rest: Arc<Mutex<Option<RestTimer>>>,
    backend: Arc<dyn Backend>,
    store: Arc<LocalStore>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<SessionEvent>,
    ticker: Arc<Mutex<Option<TickerHandle>>>,
    rest_ticker: Arc<Mutex<Option<TickerHandle>>>,
    restore_guard: Arc<RestoreGuard>,
    user_id: String,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<LocalStore>,
        clock: Arc<dyn Clock>,
        user_id: impl Into<String>,
        debug_mode: bool,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Arc::new(Mutex::new(None)),
            rest: Arc::new(Mutex::new(None)),
            backend,
            store,
            clock,
            events,
            ticker: Arc::new(Mutex::new(None)),
            rest_ticker: Arc::new(Mutex::new(None)),
            restore_guard: Arc::new(RestoreGuard::new()),
            user_id: user_id.into(),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn now_local(&self) -> DateTime<Local> {
        DateTime::<Utc>::from_timestamp_millis(self.now_ms())
            .unwrap_or_default()
            .with_timezone(&Local)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.state.lock().await.clone();
        let rest = self.rest.lock().await.clone();
        let now = self.now_ms();
        SessionSnapshot {
            status: session.as_ref().map(|s| s.clock.status()),
            rest_remaining_secs: rest.as_ref().map(|r| r.remaining_secs(now)),
            session,
            rest,
        }
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.is_some()
    }

    // ------------------------------------------------------------------
    // Starting and restoring
    // ------------------------------------------------------------------

    /// Resolves a "start routine" request against the active session and the abandoned draft.
    /// Only `PromptResume` leaves the state untouched; the caller then picks
    /// [`Self::resume_abandoned`] or [`Self::decline_abandoned`].
    pub async fn request_start(&self, routine: &Routine) -> Result<StartDecision> {
        self.restore_guard.mark_manual_start();

        let decision = {
            let active = self.state.lock().await;
            let abandoned = self.store.abandoned();
            arbitrate_start(
                active.as_ref(),
                abandoned.as_ref(),
                &routine.id,
                &self.now_local(),
            )
        };

        match &decision {
            StartDecision::NavigateToActive | StartDecision::PromptResume { .. } => {}
            StartDecision::ReplaceActive => {
                log_info!("Replacing active session with routine {}", routine.id);
                self.start_fresh(routine).await?;
            }
            StartDecision::StartFresh => {
                self.start_fresh(routine).await?;
            }
        }

        Ok(decision)
    }

    pub async fn start_fresh(&self, routine: &Routine) -> Result<WorkoutSession> {
        let session = WorkoutSession::start(routine, self.now_ms());
        self.activate(session).await
    }

    /// Starts a session with no routine behind it.
    pub async fn start_empty(&self, name: &str) -> Result<WorkoutSession> {
        self.restore_guard.mark_manual_start();
        let session = WorkoutSession::empty(name, self.now_ms());
        self.activate(session).await
    }

    pub async fn resume_abandoned(&self) -> Result<WorkoutSession> {
        let draft = self
            .store
            .abandoned()
            .ok_or_else(|| anyhow!("no abandoned session to resume"))?;
        if let Err(err) = self.store.save_abandoned(None) {
            log_warn!("Failed to clear abandoned draft: {err}");
        }
        log_info!("Resuming abandoned session {}", draft.id);
        self.activate(draft).await
    }

    /// Starts fresh instead of resuming. The abandoned draft is dropped only when the user
    /// setting asks for it.
    pub async fn decline_abandoned(&self, routine: &Routine) -> Result<WorkoutSession> {
        if self.store.settings().discard_abandoned_on_decline {
            if let Err(err) = self.store.save_abandoned(None) {
                log_warn!("Failed to clear abandoned draft: {err}");
            }
        }
        self.start_fresh(routine).await
    }

    /// Reloads the in-progress draft after a restart. Backs off when a session was started by
    /// hand while the lookup was in flight.
    pub async fn restore_from_storage(&self) -> Result<Option<WorkoutSession>> {
        let store = self.store.clone();
        let draft = tokio::task::spawn_blocking(move || store.draft())
            .await
            .context("draft lookup task failed")?;

        let Some(draft) = draft else {
            return Ok(None);
        };

        if !self.restore_guard.restore_allowed() || self.is_active().await {
            log_info!("Skipping draft restore; a session was started meanwhile");
            return Ok(None);
        }

        log_info!(
            "Restored draft session {} ({})",
            draft.id,
            if draft.clock.is_paused() { "paused" } else { "running" }
        );
        self.activate(draft).await.map(Some)
    }

    /// Opens a completed record for editing. No ticker runs and no draft is written.
    /// Refused while a live workout is open; another historical edit is simply replaced.
    pub async fn edit_history(&self, record: &SessionRecord) -> Result<WorkoutSession> {
        let live = self
            .state
            .lock()
            .await
            .as_ref()
            .is_some_and(|session| !session.historical);
        if live {
            return Err(SessionError::SessionActive.into());
        }
        self.restore_guard.mark_manual_start();
        self.activate(record.to_session()).await
    }

    async fn activate(&self, session: WorkoutSession) -> Result<WorkoutSession> {
        self.cancel_ticker().await;
        self.cancel_rest().await;

        let arm = !session.historical && !session.clock.is_paused();
        {
            let mut guard = self.state.lock().await;
            *guard = Some(session.clone());
            self.persist_draft(&session);
        }

        if arm {
            self.spawn_ticker().await;
        }
        self.emit_state_changed().await;
        Ok(session)
    }

    // ------------------------------------------------------------------
    // Pause / resume
    // ------------------------------------------------------------------

    pub async fn pause(&self) -> Result<WorkoutSession> {
        let now = self.now_ms();
        let session = self
            .mutate(|session| session.clock.pause(now))
            .await?
            .1;
        self.cancel_ticker().await;
        self.pause_rest(now).await;
        self.emit_state_changed().await;
        Ok(session)
    }

    pub async fn resume(&self) -> Result<WorkoutSession> {
        let now = self.now_ms();
        let (paused_ms, session) = self.mutate(|session| session.clock.resume(now)).await?;
        log_info!("Resumed session {} after {} ms", session.id, paused_ms);
        if !session.historical {
            self.spawn_ticker().await;
        }
        self.resume_rest(now).await;
        self.emit_state_changed().await;
        Ok(session)
    }

    pub async fn toggle_pause(&self) -> Result<ClockStatus> {
        let paused = {
            let guard = self.state.lock().await;
            guard
                .as_ref()
                .ok_or(SessionError::NoActiveSession)?
                .clock
                .is_paused()
        };
        let session = if paused {
            self.resume().await?
        } else {
            self.pause().await?
        };
        Ok(session.clock.status())
    }

    // ------------------------------------------------------------------
    // Exercise and set edits
    // ------------------------------------------------------------------

    pub async fn add_exercise(&self, exercise: LoggedExercise) -> Result<usize> {
        let (index, _) = self
            .mutate(|session| Ok(progression::add_exercise(session, exercise)))
            .await?;
        self.emit_state_changed().await;
        Ok(index)
    }

    pub async fn remove_exercise(&self, index: usize) -> Result<LoggedExercise> {
        let (removed, _) = self
            .mutate(|session| progression::remove_exercise(session, index))
            .await?;
        self.emit_state_changed().await;
        Ok(removed)
    }

    pub async fn move_exercise(&self, from: usize, to: usize) -> Result<()> {
        self.mutate(|session| progression::move_exercise(session, from, to))
            .await?;
        self.emit_state_changed().await;
        Ok(())
    }

    pub async fn select_exercise(&self, index: usize) -> Result<()> {
        self.mutate(|session| progression::select_exercise(session, index))
            .await?;
        self.emit_state_changed().await;
        Ok(())
    }

    pub async fn add_set(&self, exercise_index: usize) -> Result<usize> {
        let (index, _) = self
            .mutate(|session| progression::add_set(session, exercise_index))
            .await?;
        self.emit_state_changed().await;
        Ok(index)
    }

    pub async fn remove_set(&self, exercise_index: usize, set_index: usize) -> Result<SetEntry> {
        let (removed, _) = self
            .mutate(|session| progression::remove_set(session, exercise_index, set_index))
            .await?;
        self.emit_state_changed().await;
        Ok(removed)
    }

    pub async fn update_set(
        &self,
        exercise_index: usize,
        set_index: usize,
        patch: SetPatch,
    ) -> Result<()> {
        self.mutate(|session| progression::update_set(session, exercise_index, set_index, &patch))
            .await?;
        self.emit_state_changed().await;
        Ok(())
    }

    /// Flips a set's completion. Completing a set starts the rest countdown when enabled.
    pub async fn toggle_set(&self, exercise_index: usize, set_index: usize) -> Result<bool> {
        let (completed, session) = self
            .mutate(|session| progression::toggle_set(session, exercise_index, set_index))
            .await?;

        let settings = self.store.settings();
        if completed && settings.auto_start_rest_timer && !session.historical {
            let rest_secs = session
                .exercises
                .get(exercise_index)
                .and_then(|exercise| exercise.rest_seconds)
                .unwrap_or(settings.default_rest_seconds);
            self.start_rest(rest_secs).await;
        }

        self.emit_state_changed().await;
        Ok(completed)
    }

    pub async fn set_notes(&self, notes: Option<String>) -> Result<()> {
        self.mutate(|session| {
            session.notes = notes;
            Ok(())
        })
        .await?;
        self.emit_state_changed().await;
        Ok(())
    }

    /// Finishes the active exercise, comparing it against recent history. Moving past the
    /// last exercise finishes the whole session.
    pub async fn finish_exercise(&self) -> Result<ExerciseAdvance> {
        let history = match self.backend.list_sessions(&self.user_id, HISTORY_LOOKBACK).await {
            Ok(history) => history,
            Err(err) => {
                log_warn!("History unavailable for comparison: {err:#}");
                Vec::new()
            }
        };

        let (outcome, _) = self
            .mutate(|session| progression::finish_exercise(session, &history))
            .await?;

        let _ = self.events.send(SessionEvent::ExerciseFinished {
            outcome: outcome.clone(),
        });

        let finished = match outcome.next {
            NextStep::FinishSession => Some(self.finish().await?),
            NextStep::Exercise(_) => {
                self.emit_state_changed().await;
                None
            }
        };

        Ok(ExerciseAdvance { outcome, finished })
    }

    // ------------------------------------------------------------------
    // Ending
    // ------------------------------------------------------------------

    /// Stops the clock, stamps the end time and writes the completed record. The live session
    /// is only cleared once the write succeeds; on failure it stays active and unchanged so the
    /// user can try again.
    pub async fn finish(&self) -> Result<SessionRecord> {
        self.cancel_ticker().await;

        let now = self.now_ms();
        let (record, resume_ticker) = {
            let guard = self.state.lock().await;
            let session = guard.as_ref().ok_or(SessionError::NoActiveSession)?;
            let resume_ticker = !session.historical && !session.clock.is_paused();

            let mut finished = session.clone();
            if !finished.historical {
                finished.clock.finish(now);
                finished.end_time = Some(now);
            }
            let ended_at = finished
                .end_time
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or_else(Utc::now);
            (
                SessionRecord::from_session(&finished, &self.user_id, ended_at),
                resume_ticker,
            )
        };

        if let Err(err) = self.backend.save_session(&record).await {
            log_error!("Failed to save session {}: {err:#}", record.id);
            if resume_ticker {
                self.spawn_ticker().await;
            }
            return Err(err.context("failed to save finished session"));
        }

        self.cancel_rest().await;
        {
            let mut guard = self.state.lock().await;
            let historical = guard.as_ref().is_some_and(|s| s.historical);
            *guard = None;
            if !historical {
                if let Err(err) = self.store.save_draft(None) {
                    log_warn!("Failed to clear draft: {err:#}");
                }
            }
        }

        log_info!(
            "Finished session {} ({}s, volume {:.1})",
            record.id, record.duration_seconds, record.total_volume
        );
        let _ = self.events.send(SessionEvent::SessionFinished {
            record: record.clone(),
        });
        self.emit_state_changed().await;
        Ok(record)
    }

    /// Drops the active session. A live session is kept in the abandoned slot for same-day
    /// resume, replacing whatever was there.
    pub async fn discard(&self) -> Result<()> {
        self.cancel_ticker().await;
        self.cancel_rest().await;

        let session = self
            .state
            .lock()
            .await
            .take()
            .ok_or(SessionError::NoActiveSession)?;

        if !session.historical {
            if let Err(err) = self.store.save_abandoned(Some(&session)) {
                log_warn!("Failed to keep abandoned draft: {err:#}");
            }
            if let Err(err) = self.store.save_draft(None) {
                log_warn!("Failed to clear draft: {err:#}");
            }
        }

        let _ = self.events.send(SessionEvent::SessionDiscarded {
            session_id: session.id,
        });
        self.emit_state_changed().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rest timer
    // ------------------------------------------------------------------

    /// A rest started while the session is paused waits for the resume.
    pub async fn start_rest(&self, duration_secs: u32) {
        let now = self.now_ms();
        let paused = self
            .state
            .lock()
            .await
            .as_ref()
            .is_some_and(|session| session.clock.is_paused());

        let mut timer = RestTimer::start(duration_secs, now);
        if paused {
            timer.pause(now);
        }
        *self.rest.lock().await = Some(timer);
        if paused {
            self.stop_rest_ticker().await;
        } else {
            self.spawn_rest_ticker().await;
        }
    }

    pub async fn add_rest(&self, secs: u32) -> Result<u32> {
        let now = self.now_ms();
        let mut guard = self.rest.lock().await;
        let rest = guard.as_mut().ok_or_else(|| anyhow!("no rest timer running"))?;
        rest.add_secs(secs);
        Ok(rest.remaining_secs(now))
    }

    pub async fn skip_rest(&self) {
        self.cancel_rest().await;
    }

    async fn cancel_rest(&self) {
        self.stop_rest_ticker().await;
        *self.rest.lock().await = None;
    }

    /// Freezes the countdown with the session clock.
    async fn pause_rest(&self, now: i64) {
        self.stop_rest_ticker().await;
        if let Some(timer) = self.rest.lock().await.as_mut() {
            timer.pause(now);
        }
    }

    async fn resume_rest(&self, now: i64) {
        let running = match self.rest.lock().await.as_mut() {
            Some(timer) => {
                timer.resume(now);
                true
            }
            None => false,
        };
        if running {
            self.spawn_rest_ticker().await;
        }
    }

    async fn stop_rest_ticker(&self) {
        if let Some(ticker) = self.rest_ticker.lock().await.take() {
            ticker.stop();
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Applies `f` to the active session and mirrors the result to the draft slot.
    async fn mutate<F, T>(&self, f: F) -> Result<(T, WorkoutSession)>
    where
        F: FnOnce(&mut WorkoutSession) -> Result<T, SessionError>,
    {
        let mut guard = self.state.lock().await;
        let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;
        let value = f(session)?;
        let snapshot = session.clone();
        self.persist_draft(&snapshot);
        Ok((value, snapshot))
    }

    /// Fire-and-forget mirror of the session into local storage.
    fn persist_draft(&self, session: &WorkoutSession) {
        if session.historical {
            return;
        }
        if let Err(err) = self.store.save_draft(Some(session)) {
            log_warn!("Failed to persist draft {}: {err:#}", session.id);
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.stop();
        }

        let state = self.state.clone();
        let clock = self.clock.clone();
        let store = self.store.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks.max(1);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + tick_interval, tick_interval);
            let mut ticks: u32 = 0;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let snapshot = {
                    let mut guard = state.lock().await;
                    let Some(session) = guard.as_mut() else {
                        break;
                    };
                    if session.historical {
                        break;
                    }
                    // A pause can land between the interval firing and this lock.
                    let Some(duration_seconds) = session.clock.tick(clock.now_ms()) else {
                        break;
                    };
                    let _ = events.send(SessionEvent::Tick {
                        session_id: session.id.clone(),
                        duration_seconds,
                    });
                    session.clone()
                };

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    if let Err(err) = store.save_draft(Some(&snapshot)) {
                        log_warn!("Heartbeat draft write failed: {err:#}");
                    }
                }
            }
        });

        *ticker_guard = Some(TickerHandle { handle, cancel });
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.stop();
        }
    }

    async fn spawn_rest_ticker(&self) {
        let mut ticker_guard = self.rest_ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.stop();
        }

        let rest = self.rest.clone();
        let clock = self.clock.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + tick_interval, tick_interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let mut guard = rest.lock().await;
                let Some(timer) = guard.as_ref() else {
                    break;
                };
                let now = clock.now_ms();
                if timer.is_done(now) {
                    *guard = None;
                    let _ = events.send(SessionEvent::RestFinished);
                    break;
                }
                let _ = events.send(SessionEvent::RestTick {
                    remaining_secs: timer.remaining_secs(now),
                });
            }
        });

        *ticker_guard = Some(TickerHandle { handle, cancel });
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.snapshot().await;
        let _ = self.events.send(SessionEvent::StateChanged { snapshot });
    }

    #[cfg(test)]
    pub(crate) async fn ticker_armed(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|ticker| !ticker.handle.is_finished())
    }
}

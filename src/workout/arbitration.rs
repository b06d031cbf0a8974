//! Deciding what "start routine R" means given the drafts already on the device.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::models::WorkoutSession;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "decision")]
pub enum StartDecision {
    /// The active session already belongs to the routine.
    NavigateToActive,
    /// Another routine is active; it gets overwritten by a fresh session.
    ReplaceActive,
    /// A same-day abandoned draft exists; the user chooses.
    PromptResume { draft: WorkoutSession },
    StartFresh,
}

/// True when `session` started on the same calendar day as `now`, in `now`'s timezone.
pub fn started_same_day<Tz: TimeZone>(session: &WorkoutSession, now: &DateTime<Tz>) -> bool {
    let started = session.started_at().with_timezone(&now.timezone());
    started.date_naive() == now.date_naive()
}

pub fn arbitrate_start<Tz: TimeZone>(
    active: Option<&WorkoutSession>,
    abandoned: Option<&WorkoutSession>,
    routine_id: &str,
    now: &DateTime<Tz>,
) -> StartDecision {
    if let Some(active) = active {
        return if active.is_for_routine(routine_id) {
            StartDecision::NavigateToActive
        } else {
            StartDecision::ReplaceActive
        };
    }

    match abandoned {
        Some(draft) if draft.is_for_routine(routine_id) && started_same_day(draft, now) => {
            StartDecision::PromptResume {
                draft: draft.clone(),
            }
        }
        _ => StartDecision::StartFresh,
    }
}

/// Keeps a slow restore-from-storage from overwriting a session the user started by hand.
///
/// A manual start marks the guard; a restore that resolves afterwards checks it and backs off.
#[derive(Debug, Default)]
pub struct RestoreGuard {
    manual_start: AtomicBool,
}

impl RestoreGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_manual_start(&self) {
        self.manual_start.store(true, Ordering::SeqCst);
    }

    pub fn restore_allowed(&self) -> bool {
        !self.manual_start.load(Ordering::SeqCst)
    }
}

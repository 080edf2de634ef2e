//! Single-submission guard for QR check-ins.
//!
//! A camera feed reports the same code on many consecutive frames; only the
//! first detection after the guard is armed may write a check-in. The guard
//! is a plain state machine: [`transition`] maps a state and an event to the
//! next state plus the effects the caller must carry out. It has no
//! durable idempotency key, so a crash mid-write goes unnoticed.

use std::time::Duration;

use chrono::{DateTime, Utc};

use solace_types::models::ScannedSession;

use crate::error::GENERIC_FAILURE;

pub const CHECK_IN_SUCCESS: &str = "Check-in recorded!";
pub const MISSING_IDENTITY: &str = "Your profile is incomplete. Add your name before checking in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardState {
    /// Armed: the next detection submits.
    #[default]
    Idle,
    /// A write is in flight; detections are dropped. Carries the attempt
    /// id that its write outcome must echo.
    Locked(u64),
    /// Written. Stays disarmed until the screen is focused again.
    Succeeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    ScanDetected(String),
    WriteSucceeded(u64),
    WriteFailed(u64),
    NavigationDelayElapsed,
    Focused,
    Blurred,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Submit { attempt: u64, session: ScannedSession },
    ShowMessage(String),
    ClearMessages,
    ScheduleNavigateHome(Duration),
    NavigateHome,
}

/// Who is checking in. Both fields are needed to build a check-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            first_name: Some(first_name.into()),
        }
    }

    fn complete(&self) -> Option<(&str, &str)> {
        let user_id = self.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let first_name = self.first_name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((user_id, first_name))
    }
}

/// Inputs a transition may read besides the state.
#[derive(Debug, Clone)]
pub struct GuardContext<'a> {
    pub identity: &'a Identity,
    pub now: DateTime<Utc>,
    pub home_delay: Duration,
    /// Id given to the lock if this event acquires it. Must differ from
    /// every earlier attempt.
    pub attempt: u64,
}

pub fn transition(state: GuardState, event: ScanEvent, ctx: &GuardContext<'_>) -> (GuardState, Vec<Effect>) {
    use GuardState::*;

    match (state, event) {
        (_, ScanEvent::Focused) => (Idle, vec![Effect::ClearMessages]),

        (Idle, ScanEvent::ScanDetected(payload)) => match ctx.identity.complete() {
            Some((user_id, first_name)) => (
                Locked(ctx.attempt),
                vec![Effect::Submit {
                    attempt: ctx.attempt,
                    session: ScannedSession {
                        id: String::new(),
                        user_id: user_id.to_string(),
                        first_name: first_name.to_string(),
                        scanned_data: payload,
                        timestamp: ctx.now,
                    },
                }],
            ),
            // Locked then straight back to Idle: the scanner re-arms.
            None => (Idle, vec![Effect::ShowMessage(MISSING_IDENTITY.to_string())]),
        },

        (Locked(held), ScanEvent::WriteFailed(attempt)) if held == attempt => {
            (Idle, vec![Effect::ShowMessage(GENERIC_FAILURE.to_string())])
        }

        (Locked(held), ScanEvent::WriteSucceeded(attempt)) if held == attempt => (
            Succeeded,
            vec![
                Effect::ShowMessage(CHECK_IN_SUCCESS.to_string()),
                Effect::ScheduleNavigateHome(ctx.home_delay),
            ],
        ),

        (Succeeded, ScanEvent::NavigationDelayElapsed) => (Succeeded, vec![Effect::NavigateHome]),

        // Duplicate detections, blur, and write outcomes from an attempt
        // other than the one holding the lock all leave the guard alone.
        (state, _) => (state, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(identity: &Identity) -> GuardContext<'_> {
        attempt(identity, 7)
    }

    fn attempt(identity: &Identity, attempt: u64) -> GuardContext<'_> {
        GuardContext {
            identity,
            now: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            home_delay: Duration::from_millis(1500),
            attempt,
        }
    }

    fn scan(code: &str) -> ScanEvent {
        ScanEvent::ScanDetected(code.to_string())
    }

    fn submits(effects: &[Effect]) -> usize {
        effects.iter().filter(|e| matches!(e, Effect::Submit { .. })).count()
    }

    #[test]
    fn first_detection_locks_and_submits() {
        let id = Identity::new("u1", "Ana");
        let (state, effects) = transition(GuardState::Idle, scan("room-4"), &ctx(&id));

        assert_eq!(state, GuardState::Locked(7));
        match effects.as_slice() {
            [Effect::Submit { attempt: 7, session }] => {
                assert_eq!(session.user_id, "u1");
                assert_eq!(session.first_name, "Ana");
                assert_eq!(session.scanned_data, "room-4");
                assert_eq!(session.timestamp.timestamp_millis(), 1_700_000_000_000);
            }
            other => panic!("unexpected effects {other:?}"),
        }
    }

    #[test]
    fn detections_while_locked_submit_nothing() {
        let id = Identity::new("u1", "Ana");
        let mut state = GuardState::Locked(7);
        let mut total = 0;

        for n in 0..50 {
            let (next, effects) = transition(state, scan(&format!("frame-{n}")), &attempt(&id, 8 + n));
            total += submits(&effects);
            assert!(effects.is_empty());
            state = next;
        }

        assert_eq!(state, GuardState::Locked(7));
        assert_eq!(total, 0);
    }

    #[test]
    fn failure_rearms_for_exactly_one_more_write() {
        let id = Identity::new("u1", "Ana");
        let (state, effects) = transition(GuardState::Locked(7), ScanEvent::WriteFailed(7), &ctx(&id));
        assert_eq!(state, GuardState::Idle);
        assert_eq!(effects, [Effect::ShowMessage(GENERIC_FAILURE.to_string())]);

        let (state, effects) = transition(state, scan("room-4"), &attempt(&id, 8));
        assert_eq!(state, GuardState::Locked(8));
        assert_eq!(submits(&effects), 1);

        let (_, effects) = transition(state, scan("room-4"), &attempt(&id, 9));
        assert_eq!(submits(&effects), 0);
    }

    #[test]
    fn success_stays_disarmed_until_focus() {
        let id = Identity::new("u1", "Ana");
        let (state, effects) = transition(GuardState::Locked(7), ScanEvent::WriteSucceeded(7), &ctx(&id));
        assert_eq!(state, GuardState::Succeeded);
        assert_eq!(
            effects,
            [
                Effect::ShowMessage(CHECK_IN_SUCCESS.to_string()),
                Effect::ScheduleNavigateHome(Duration::from_millis(1500)),
            ]
        );

        let (state, effects) = transition(state, scan("room-4"), &ctx(&id));
        assert_eq!(state, GuardState::Succeeded);
        assert!(effects.is_empty());

        let (state, effects) = transition(state, ScanEvent::Blurred, &ctx(&id));
        assert_eq!(state, GuardState::Succeeded);
        assert!(effects.is_empty());

        let (state, effects) = transition(state, ScanEvent::NavigationDelayElapsed, &ctx(&id));
        assert_eq!(state, GuardState::Succeeded);
        assert_eq!(effects, [Effect::NavigateHome]);

        let (state, effects) = transition(state, ScanEvent::Focused, &ctx(&id));
        assert_eq!(state, GuardState::Idle);
        assert_eq!(effects, [Effect::ClearMessages]);
    }

    #[test]
    fn missing_identity_reports_and_stays_armed() {
        let cases = [
            Identity::default(),
            Identity {
                user_id: Some("u1".into()),
                first_name: None,
            },
            Identity::new("u1", "   "),
        ];

        for id in &cases {
            let (state, effects) = transition(GuardState::Idle, scan("room-4"), &ctx(id));
            assert_eq!(state, GuardState::Idle);
            assert_eq!(effects, [Effect::ShowMessage(MISSING_IDENTITY.to_string())]);
        }
    }

    #[test]
    fn focus_resets_from_any_state() {
        let id = Identity::new("u1", "Ana");
        for state in [GuardState::Idle, GuardState::Locked(7), GuardState::Succeeded] {
            let (next, effects) = transition(state, ScanEvent::Focused, &ctx(&id));
            assert_eq!(next, GuardState::Idle);
            assert_eq!(effects, [Effect::ClearMessages]);
        }
    }

    #[test]
    fn late_write_outcome_after_reset_is_ignored() {
        let id = Identity::new("u1", "Ana");
        for event in [ScanEvent::WriteSucceeded(7), ScanEvent::WriteFailed(7), ScanEvent::NavigationDelayElapsed] {
            let (state, effects) = transition(GuardState::Idle, event, &ctx(&id));
            assert_eq!(state, GuardState::Idle);
            assert!(effects.is_empty());
        }
    }

    #[test]
    fn outcome_of_an_earlier_attempt_keeps_current_lock() {
        let id = Identity::new("u1", "Ana");
        for event in [ScanEvent::WriteFailed(3), ScanEvent::WriteSucceeded(3)] {
            let (state, effects) = transition(GuardState::Locked(7), event, &ctx(&id));
            assert_eq!(state, GuardState::Locked(7));
            assert!(effects.is_empty());
        }
    }
}

//! Pause/resume coordination
//!
//! While the browser is in the background, script timers are suspended
//! unless a load is still running. A running load gets a bounded wake lock
//! instead; when it expires every load is stopped so timers can be
//! suspended after all.
//!
//! Timers run when `(!paused && !in_load) || (paused && in_load)` and are
//! suspended only when `paused && !in_load`.
//!
//! The coordinator only decides. The browser applies each outcome to the
//! engine, the wake lock and the scheduler.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    /// Already paused: nothing changes
    Ignored,
    TimersPaused,
    /// Loads continue under a wake lock identified by `token`
    WakeLockHeld { token: u64, timeout: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// Already running: nothing changes
    Ignored,
    Resumed {
        resume_timers: bool,
        release_wake_lock: bool,
    },
}

/// What to do once loads settle while paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    pub release_wake_lock: bool,
}

#[derive(Debug)]
pub struct PauseResumeCoordinator {
    paused: bool,
    timers_paused: bool,
    wake_lock: Option<u64>,
    next_token: u64,
    wake_lock_timeout: Duration,
}

impl PauseResumeCoordinator {
    pub fn new(wake_lock_timeout: Duration) -> Self {
        Self {
            paused: false,
            timers_paused: false,
            wake_lock: None,
            next_token: 0,
            wake_lock_timeout,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn timers_paused(&self) -> bool {
        self.timers_paused
    }

    pub fn wake_lock_held(&self) -> bool {
        self.wake_lock.is_some()
    }

    pub fn pause(&mut self, any_in_load: bool) -> PauseOutcome {
        if self.paused {
            return PauseOutcome::Ignored;
        }
        self.paused = true;

        if !any_in_load {
            self.timers_paused = true;
            return PauseOutcome::TimersPaused;
        }

        self.next_token += 1;
        let token = self.next_token;
        self.wake_lock = Some(token);
        PauseOutcome::WakeLockHeld {
            token,
            timeout: self.wake_lock_timeout,
        }
    }

    pub fn resume(&mut self) -> ResumeOutcome {
        if !self.paused {
            return ResumeOutcome::Ignored;
        }
        self.paused = false;

        ResumeOutcome::Resumed {
            resume_timers: std::mem::take(&mut self.timers_paused),
            release_wake_lock: self.wake_lock.take().is_some(),
        }
    }

    /// A page started loading. Returns true if timers must run again: a
    /// paused browser keeps timers alive for loads in flight.
    pub fn load_started(&mut self) -> bool {
        if self.paused && self.timers_paused {
            self.timers_paused = false;
            return true;
        }
        false
    }

    /// A load finished or was stopped. While paused with nothing left
    /// loading, timers are suspended and any wake lock let go.
    pub fn load_settled(&mut self, any_in_load: bool) -> Option<Settled> {
        if !self.paused || any_in_load || self.timers_paused {
            return None;
        }
        self.timers_paused = true;
        Some(Settled {
            release_wake_lock: self.wake_lock.take().is_some(),
        })
    }

    /// The wake lock timed out. Returns true if `token` is the lock still
    /// held, meaning all loads must now be stopped.
    pub fn wake_lock_expired(&mut self, token: u64) -> bool {
        if self.wake_lock == Some(token) {
            self.wake_lock = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> PauseResumeCoordinator {
        PauseResumeCoordinator::new(Duration::from_secs(300))
    }

    #[test]
    fn test_idle_pause_suspends_timers() {
        let mut c = coordinator();
        assert_eq!(c.pause(false), PauseOutcome::TimersPaused);
        assert!(c.timers_paused());
        assert!(!c.wake_lock_held());

        assert_eq!(
            c.resume(),
            ResumeOutcome::Resumed {
                resume_timers: true,
                release_wake_lock: false
            }
        );
        assert!(!c.timers_paused());
    }

    #[test]
    fn test_double_pause_and_resume_are_ignored() {
        let mut c = coordinator();
        c.pause(true);
        assert_eq!(c.pause(false), PauseOutcome::Ignored);
        assert!(c.wake_lock_held());
        assert!(!c.timers_paused());

        assert!(matches!(c.resume(), ResumeOutcome::Resumed { .. }));
        assert_eq!(c.resume(), ResumeOutcome::Ignored);
    }

    #[test]
    fn test_pause_mid_load_holds_wake_lock_until_settled() {
        let mut c = coordinator();
        assert_eq!(
            c.pause(true),
            PauseOutcome::WakeLockHeld {
                token: 1,
                timeout: Duration::from_secs(300)
            }
        );

        assert_eq!(c.load_settled(true), None);
        assert_eq!(
            c.load_settled(false),
            Some(Settled {
                release_wake_lock: true
            })
        );
        assert!(c.timers_paused());
        assert!(!c.wake_lock_held());
        assert_eq!(c.load_settled(false), None);
    }

    #[test]
    fn test_wake_lock_expiry_matches_token() {
        let mut c = coordinator();
        c.pause(true);
        c.resume();
        c.pause(true);

        // The first lock was released on resume
        assert!(!c.wake_lock_expired(1));
        assert!(c.wake_lock_expired(2));
        assert!(!c.wake_lock_expired(2));
    }

    #[test]
    fn test_load_started_while_paused_restarts_timers() {
        let mut c = coordinator();
        assert!(!c.load_started());

        c.pause(false);
        assert!(c.load_started());
        assert!(!c.timers_paused());
        assert!(!c.load_started());
    }

    #[test]
    fn test_settled_while_running_does_nothing() {
        let mut c = coordinator();
        assert_eq!(c.load_settled(false), None);
        assert!(!c.timers_paused());
    }
}

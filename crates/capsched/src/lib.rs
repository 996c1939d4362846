//! Arm/capture state machine for the snapshot pipeline.
//!
//! The scheduler is deliberately pure: it tracks the armed/capturing flags and
//! the interval timer, and emits decisions (`ArmRequest`, `TickOutcome`) that
//! the capture controller turns into side effects. A failed arm attempt simply
//! never calls [`CaptureScheduler::confirm_arm`], so the state stays disarmed.

use std::time::Duration;

use capconfig::CaptureConfig;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("capture interval must be greater than zero")]
    InvalidInterval,
}

/// What a `toggle_arm` press should do, given the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmRequest {
    Arm,
    Disarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    /// The interval elapsed; the caller must take a snapshot now. The timer
    /// has already been reset.
    SnapshotDue,
}

#[derive(Debug)]
pub struct CaptureScheduler {
    armed: bool,
    capturing: bool,
    timer: Duration,
    interval: Duration,
    total_captures: u64,
}

impl CaptureScheduler {
    /// `initial_total` is the count of pre-existing base captures in the
    /// output directory; the total is derived, never persisted.
    pub fn new(config: &CaptureConfig, initial_total: u64) -> Result<Self, SchedulerError> {
        Self::with_interval(config.capture_interval, initial_total)
    }

    pub fn with_interval(interval: Duration, initial_total: u64) -> Result<Self, SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }
        Ok(Self {
            armed: false,
            capturing: false,
            timer: Duration::ZERO,
            interval,
            total_captures: initial_total,
        })
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_capturing(&self) -> bool {
        self.armed && self.capturing
    }

    pub fn timer(&self) -> Duration {
        self.timer
    }

    pub fn total_captures(&self) -> u64 {
        self.total_captures
    }

    pub fn toggle_arm(&self) -> ArmRequest {
        if self.armed {
            ArmRequest::Disarm
        } else {
            ArmRequest::Arm
        }
    }

    /// Called once the rig camera and command list exist.
    pub fn confirm_arm(&mut self) {
        self.armed = true;
    }

    /// Resets the capturing flag and timer; safe to call when already
    /// disarmed.
    pub fn confirm_disarm(&mut self) {
        self.armed = false;
        self.capturing = false;
        self.timer = Duration::ZERO;
    }

    /// Flips the capturing flag. No effect while disarmed.
    pub fn toggle_capture(&mut self) -> bool {
        if self.armed {
            self.capturing = !self.capturing;
        }
        self.is_capturing()
    }

    /// Accumulates one frame of wall time. Only `Armed.Capturing` advances
    /// the timer.
    pub fn tick(&mut self, delta: Duration) -> TickOutcome {
        if !self.is_capturing() {
            return TickOutcome::Idle;
        }
        self.timer += delta;
        if self.timer >= self.interval {
            self.timer = Duration::ZERO;
            TickOutcome::SnapshotDue
        } else {
            TickOutcome::Idle
        }
    }

    /// Called after a snapshot was written (or attempted with only
    /// per-file recoverable failures).
    pub fn record_snapshot(&mut self) {
        self.total_captures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(interval: Duration) -> CaptureScheduler {
        CaptureScheduler::with_interval(interval, 0).expect("valid interval")
    }

    fn armed_capturing(interval: Duration) -> CaptureScheduler {
        let mut s = scheduler(interval);
        assert_eq!(s.toggle_arm(), ArmRequest::Arm);
        s.confirm_arm();
        assert!(s.toggle_capture());
        s
    }

    #[test]
    fn rejects_zero_interval() {
        let err = CaptureScheduler::with_interval(Duration::ZERO, 0).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInterval));
    }

    #[test]
    fn capture_toggle_is_noop_while_disarmed() {
        let mut s = scheduler(Duration::from_secs(1));
        assert!(!s.toggle_capture());
        assert!(!s.is_capturing());
        // ticking while disarmed never accumulates
        assert_eq!(s.tick(Duration::from_secs(10)), TickOutcome::Idle);
        assert_eq!(s.timer(), Duration::ZERO);
    }

    #[test]
    fn armed_idle_does_not_accumulate() {
        let mut s = scheduler(Duration::from_secs(1));
        s.confirm_arm();
        assert_eq!(s.tick(Duration::from_secs(5)), TickOutcome::Idle);
        assert_eq!(s.timer(), Duration::ZERO);
    }

    #[test]
    fn continuous_capture_takes_floor_t_over_i_snapshots() {
        // 3.5 s of simulated 60 fps frames at a 1 s interval -> 3 snapshots.
        let mut s = armed_capturing(Duration::from_secs(1));
        let dt = Duration::from_secs_f64(1.0 / 60.0);
        let mut snapshots = 0;
        for _ in 0..210 {
            if s.tick(dt) == TickOutcome::SnapshotDue {
                s.record_snapshot();
                snapshots += 1;
            }
        }
        assert_eq!(snapshots, 3);
        assert_eq!(s.total_captures(), 3);
    }

    #[test]
    fn timer_resets_on_snapshot() {
        let mut s = armed_capturing(Duration::from_secs(1));
        assert_eq!(s.tick(Duration::from_millis(700)), TickOutcome::Idle);
        assert_eq!(s.tick(Duration::from_millis(400)), TickOutcome::SnapshotDue);
        assert_eq!(s.timer(), Duration::ZERO);
    }

    #[test]
    fn disarm_mid_capture_resets_timer_and_flag() {
        let mut s = armed_capturing(Duration::from_secs(1));
        assert_eq!(s.tick(Duration::from_millis(700)), TickOutcome::Idle);
        assert_eq!(s.toggle_arm(), ArmRequest::Disarm);
        s.confirm_disarm();
        assert!(!s.is_armed());
        assert!(!s.is_capturing());
        assert_eq!(s.timer(), Duration::ZERO);

        // re-arm starts from scratch
        s.confirm_arm();
        assert!(!s.is_capturing());
        assert_eq!(s.timer(), Duration::ZERO);
    }

    #[test]
    fn double_disarm_is_idempotent() {
        let mut s = armed_capturing(Duration::from_secs(1));
        s.confirm_disarm();
        let timer = s.timer();
        let total = s.total_captures();
        s.confirm_disarm();
        assert!(!s.is_armed());
        assert_eq!(s.timer(), timer);
        assert_eq!(s.total_captures(), total);
    }

    #[test]
    fn failed_arm_leaves_state_disarmed() {
        // No primary camera: the controller never confirms the arm.
        let mut s = scheduler(Duration::from_secs(1));
        assert_eq!(s.toggle_arm(), ArmRequest::Arm);
        assert!(!s.is_armed());
        assert!(!s.toggle_capture());
        assert_eq!(s.tick(Duration::from_secs(2)), TickOutcome::Idle);
    }

    #[test]
    fn initial_total_comes_from_existing_files() {
        let s = CaptureScheduler::with_interval(Duration::from_secs(1), 17).unwrap();
        assert_eq!(s.total_captures(), 17);
    }
}

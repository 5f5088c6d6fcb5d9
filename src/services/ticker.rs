//! Continuous leftward ticker scroll with seamless wraparound
//!
//! The animator owns the horizontal offset and the run state. It knows
//! nothing about how frames are scheduled or how widths are measured:
//! the rendering surface supplies extents through `Measure`, and the
//! runtime acts on the `Transition` returned by every state change
//! (start a frame schedule on `Started`, cancel it on `Stopped`).

use crate::services::display::DisplayState;
use tracing::debug;

/// Pixels per second
pub const DEFAULT_TICKER_SPEED: f64 = 30.0;

/// Rendered widths of the ticker content and its visible container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub content_width: f64,
    pub container_width: f64,
}

impl Extents {
    pub fn new(content_width: f64, container_width: f64) -> Self {
        Self { content_width, container_width }
    }

    fn is_laid_out(&self) -> bool {
        self.content_width.is_finite()
            && self.container_width.is_finite()
            && self.content_width > 0.0
            && self.container_width > 0.0
    }
}

/// Layout measurement capability provided by the rendering surface
pub trait Measure {
    /// Current extents, `None` when nothing is laid out yet
    fn extents(&self) -> Option<Extents>;
}

impl Measure for Extents {
    fn extents(&self) -> Option<Extents> {
        Some(*self)
    }
}

impl Measure for Option<Extents> {
    fn extents(&self) -> Option<Extents> {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerState {
    /// Not mounted
    Idle,
    Running,
    Paused,
}

impl TickerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickerState::Idle => "idle",
            TickerState::Running => "running",
            TickerState::Paused => "paused",
        }
    }
}

/// Effect of a state change on the frame schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Entered `Running`: request frames
    Started,
    /// Left `Running`: cancel the pending frame
    Stopped,
    Unchanged,
}

/// Result of a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Not running; nothing done
    Inactive,
    /// First frame of a run; establishes the elapsed-time baseline
    Baseline,
    /// No time elapsed since the previous frame
    Still,
    /// Widths unknown or zero; retried next frame
    NotLaidOut,
    Moved { offset: f64 },
    /// Content fully scrolled off; re-entering from the right edge
    Wrapped { offset: f64 },
}

#[derive(Debug, Clone)]
pub struct TickerAnimator {
    state: TickerState,
    speed: f64,
    offset: f64,
    last_frame_ms: Option<f64>,
    user_paused: bool,
}

fn sanitize_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        DEFAULT_TICKER_SPEED
    }
}

impl TickerAnimator {
    pub fn new(speed: f64) -> Self {
        Self {
            state: TickerState::Idle,
            speed: sanitize_speed(speed),
            offset: 0.0,
            last_frame_ms: None,
            user_paused: false,
        }
    }

    pub fn state(&self) -> TickerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TickerState::Running
    }

    pub fn is_user_paused(&self) -> bool {
        self.user_paused
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = sanitize_speed(speed);
    }

    fn wants_to_run(&self, display: &DisplayState) -> bool {
        display.allows_ticker() && !self.user_paused
    }

    fn start(&mut self) -> Transition {
        self.state = TickerState::Running;
        self.last_frame_ms = None;
        debug!(offset = %self.offset, "ticker_started");
        Transition::Started
    }

    fn stop(&mut self, next: TickerState) -> Transition {
        let was_running = self.is_running();
        self.state = next;
        self.last_frame_ms = None;
        if was_running {
            debug!(offset = %self.offset, next = %next.as_str(), "ticker_stopped");
            Transition::Stopped
        } else {
            Transition::Unchanged
        }
    }

    /// Leave `Idle`; starts running if the display allows it
    pub fn mount(&mut self, display: &DisplayState) -> Transition {
        if self.state != TickerState::Idle {
            return self.sync(display);
        }
        if self.wants_to_run(display) {
            self.start()
        } else {
            self.state = TickerState::Paused;
            Transition::Unchanged
        }
    }

    /// Back to `Idle`, cancelling any pending frame
    pub fn unmount(&mut self) -> Transition {
        self.stop(TickerState::Idle)
    }

    /// Re-evaluate after a display change. Hidden or expanded preempts
    /// the animation; collapsing again resumes it unless the user paused.
    pub fn sync(&mut self, display: &DisplayState) -> Transition {
        match (self.state, self.wants_to_run(display)) {
            (TickerState::Idle, _) => Transition::Unchanged,
            (TickerState::Running, false) => self.stop(TickerState::Paused),
            (TickerState::Paused, true) => self.start(),
            _ => Transition::Unchanged,
        }
    }

    pub fn pause(&mut self, display: &DisplayState) -> Transition {
        self.user_paused = true;
        self.sync(display)
    }

    /// Resume; only takes effect while visible and collapsed
    pub fn resume(&mut self, display: &DisplayState) -> Transition {
        self.user_paused = false;
        self.sync(display)
    }

    pub fn toggle_pause(&mut self, display: &DisplayState) -> Transition {
        if self.user_paused {
            self.resume(display)
        } else {
            self.pause(display)
        }
    }

    /// Advance one animation frame at `timestamp_ms` (monotonic clock)
    pub fn frame(&mut self, timestamp_ms: f64, measure: &dyn Measure) -> FrameOutcome {
        if !self.is_running() {
            return FrameOutcome::Inactive;
        }

        let Some(last) = self.last_frame_ms else {
            self.last_frame_ms = Some(timestamp_ms);
            return FrameOutcome::Baseline;
        };

        let elapsed = timestamp_ms - last;
        let elapsed = if elapsed.is_finite() && elapsed > 0.0 { elapsed } else { 0.0 };
        self.last_frame_ms = Some(timestamp_ms);
        if elapsed == 0.0 {
            return FrameOutcome::Still;
        }

        let Some(extents) = measure.extents().filter(Extents::is_laid_out) else {
            return FrameOutcome::NotLaidOut;
        };

        // Only a leftward run-off wraps; the positive re-entry offset may
        // exceed a short content width and must still scroll in
        if self.offset < 0.0 && self.offset.abs() >= extents.content_width {
            self.offset = extents.container_width;
            FrameOutcome::Wrapped { offset: self.offset }
        } else {
            self.offset -= self.speed * elapsed / 1000.0;
            FrameOutcome::Moved { offset: self.offset }
        }
    }
}

impl Default for TickerAnimator {
    fn default() -> Self {
        Self::new(DEFAULT_TICKER_SPEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::display::ResponsivePolicy;

    fn collapsed() -> DisplayState {
        DisplayState::new(true, false, ResponsivePolicy::default())
    }

    fn running(speed: f64) -> TickerAnimator {
        let mut ticker = TickerAnimator::new(speed);
        assert_eq!(ticker.mount(&collapsed()), Transition::Started);
        ticker
    }

    #[test]
    fn test_mount_respects_display() {
        let mut ticker = TickerAnimator::default();
        assert_eq!(ticker.state(), TickerState::Idle);
        let expanded = DisplayState::new(true, true, ResponsivePolicy::default());
        assert_eq!(ticker.mount(&expanded), Transition::Unchanged);
        assert_eq!(ticker.state(), TickerState::Paused);

        let mut ticker = TickerAnimator::default();
        assert_eq!(ticker.mount(&collapsed()), Transition::Started);
        assert!(ticker.is_running());
    }

    #[test]
    fn test_first_frame_is_baseline() {
        let mut ticker = running(40.0);
        let extents = Extents::new(500.0, 300.0);
        assert_eq!(ticker.frame(1000.0, &extents), FrameOutcome::Baseline);
        assert_eq!(ticker.offset(), 0.0);
        assert_eq!(ticker.frame(1000.0, &extents), FrameOutcome::Still);
    }

    #[test]
    fn test_frame_moves_speed_times_elapsed() {
        let mut ticker = running(40.0);
        let extents = Extents::new(500.0, 300.0);
        ticker.frame(1000.0, &extents);
        assert_eq!(ticker.frame(1500.0, &extents), FrameOutcome::Moved { offset: -20.0 });
        assert_eq!(ticker.frame(1750.0, &extents), FrameOutcome::Moved { offset: -30.0 });
    }

    #[test]
    fn test_wraps_to_container_width() {
        let mut ticker = running(100.0);
        let extents = Extents::new(50.0, 300.0);
        ticker.frame(0.0, &extents);
        assert_eq!(ticker.frame(500.0, &extents), FrameOutcome::Moved { offset: -50.0 });
        // |offset| reached content width: re-enter from the right edge
        assert_eq!(ticker.frame(600.0, &extents), FrameOutcome::Wrapped { offset: 300.0 });
        assert_eq!(ticker.frame(700.0, &extents), FrameOutcome::Moved { offset: 290.0 });
    }

    #[test]
    fn test_offset_never_overshoots_past_content() {
        let mut ticker = running(1000.0);
        let extents = Extents::new(120.0, 80.0);
        let mut t = 0.0;
        ticker.frame(t, &extents);
        for _ in 0..200 {
            t += 16.0;
            ticker.frame(t, &extents);
            assert!(ticker.offset() >= -120.0 - 16.0);
            assert!(ticker.offset() <= 80.0);
        }
    }

    #[test]
    fn test_zero_width_is_a_noop_frame() {
        let mut ticker = running(40.0);
        ticker.frame(0.0, &Extents::new(0.0, 0.0));
        assert_eq!(ticker.frame(500.0, &Extents::new(0.0, 300.0)), FrameOutcome::NotLaidOut);
        assert_eq!(ticker.frame(1000.0, &None::<Extents>), FrameOutcome::NotLaidOut);
        assert_eq!(ticker.offset(), 0.0);

        // Laid out now: only the time since the last frame counts
        assert_eq!(
            ticker.frame(1500.0, &Extents::new(400.0, 300.0)),
            FrameOutcome::Moved { offset: -20.0 }
        );
        assert!(!ticker.offset().is_nan());
    }

    #[test]
    fn test_backwards_clock_does_not_move() {
        let mut ticker = running(40.0);
        let extents = Extents::new(500.0, 300.0);
        ticker.frame(1000.0, &extents);
        assert_eq!(ticker.frame(900.0, &extents), FrameOutcome::Still);
        assert_eq!(ticker.offset(), 0.0);
    }

    #[test]
    fn test_pause_and_resume() {
        let display = collapsed();
        let mut ticker = running(40.0);
        let extents = Extents::new(500.0, 300.0);
        ticker.frame(0.0, &extents);
        ticker.frame(500.0, &extents);

        assert_eq!(ticker.toggle_pause(&display), Transition::Stopped);
        assert_eq!(ticker.state(), TickerState::Paused);
        assert_eq!(ticker.frame(1000.0, &extents), FrameOutcome::Inactive);

        assert_eq!(ticker.toggle_pause(&display), Transition::Started);
        // New run: fresh baseline, offset kept
        assert_eq!(ticker.frame(5000.0, &extents), FrameOutcome::Baseline);
        assert_eq!(ticker.offset(), -20.0);
    }

    #[test]
    fn test_expand_and_hide_preempt_animation() {
        let mut display = collapsed();
        let mut ticker = running(40.0);

        display.expand();
        assert_eq!(ticker.sync(&display), Transition::Stopped);
        // Resume has no effect while expanded
        assert_eq!(ticker.resume(&display), Transition::Unchanged);
        assert!(!ticker.is_running());

        display.collapse();
        assert_eq!(ticker.sync(&display), Transition::Started);

        display.hide();
        assert_eq!(ticker.sync(&display), Transition::Stopped);
        display.show();
        assert_eq!(ticker.sync(&display), Transition::Started);
    }

    #[test]
    fn test_user_pause_survives_expand_cycle() {
        let mut display = collapsed();
        let mut ticker = running(40.0);
        ticker.pause(&display);

        display.expand();
        ticker.sync(&display);
        display.collapse();
        assert_eq!(ticker.sync(&display), Transition::Unchanged);
        assert!(!ticker.is_running());
    }

    #[test]
    fn test_unmount_cancels() {
        let mut ticker = running(40.0);
        assert_eq!(ticker.unmount(), Transition::Stopped);
        assert_eq!(ticker.state(), TickerState::Idle);
        assert_eq!(ticker.sync(&collapsed()), Transition::Unchanged);
    }

    #[test]
    fn test_invalid_speed_falls_back() {
        assert_eq!(TickerAnimator::new(0.0).speed(), DEFAULT_TICKER_SPEED);
        assert_eq!(TickerAnimator::new(-5.0).speed(), DEFAULT_TICKER_SPEED);
        assert_eq!(TickerAnimator::new(f64::NAN).speed(), DEFAULT_TICKER_SPEED);
        assert_eq!(TickerAnimator::new(12.5).speed(), 12.5);
    }
}

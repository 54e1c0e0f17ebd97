use std::time::Duration;

use crate::core::XIndex;

pub const DEFAULT_MIN_SPEED: f64 = 1.0;
pub const DEFAULT_MAX_SPEED: f64 = 8.0;
pub const DEFAULT_SPEED_FACTOR: f64 = 2.0;

/// Fixed settle window after a slider jump; targets arriving inside the
/// window are coalesced into one trailing jump.
pub const SETTLE_WINDOW: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum PlayState {
    Paused,
    Playing,
}

/// Timer-driven state machine for automatic forward stepping.
///
/// The controller never owns a timer thread: the host drives it by calling
/// [`tick`](Self::tick) whenever the previously returned delay elapses, and
/// [`settle`](Self::settle) after [`SETTLE_WINDOW`] past a slider jump.
/// Pausing cancels the logical continuation — a stale timer that still fires
/// finds the machine paused and does nothing.
#[derive(Debug)]
pub struct PlaybackController {
    series_len: usize,
    state: PlayState,
    current_x: XIndex,
    target_x: XIndex,
    speed: f64,
    min_speed: f64,
    max_speed: f64,
    speed_factor: f64,
    slider_locked: bool,
}

impl PlaybackController {
    pub fn new(series_len: usize) -> Self {
        Self {
            series_len,
            state: PlayState::Paused,
            current_x: XIndex(0),
            target_x: XIndex(0),
            speed: DEFAULT_MIN_SPEED,
            min_speed: DEFAULT_MIN_SPEED,
            max_speed: DEFAULT_MAX_SPEED,
            speed_factor: DEFAULT_SPEED_FACTOR,
            slider_locked: false,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn current_x(&self) -> XIndex {
        self.current_x
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn tick_delay(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.speed)
    }

    fn last_index(&self) -> usize {
        self.series_len.saturating_sub(1)
    }

    /// Play/pause toggle. Starting playback at the last index rewinds to 0
    /// first. Returns the delay until the first tick, or `None` when the
    /// toggle paused playback (or there is nothing to step through).
    pub fn play<F: FnMut(XIndex)>(&mut self, mut update: F) -> Option<Duration> {
        match self.state {
            PlayState::Playing => {
                self.state = PlayState::Paused;
                None
            }
            PlayState::Paused => {
                if self.series_len < 2 {
                    return None;
                }
                if self.current_x.0 >= self.last_index() {
                    self.current_x = XIndex(0);
                    self.target_x = self.current_x;
                    update(self.current_x);
                }
                self.state = PlayState::Playing;
                Some(self.tick_delay())
            }
        }
    }

    /// One scheduled advance. Returns the delay until the next tick, or
    /// `None` when no further tick is scheduled (paused, or auto-stop at the
    /// end of the series).
    pub fn tick<F: FnMut(XIndex)>(&mut self, mut update: F) -> Option<Duration> {
        if self.state != PlayState::Playing {
            return None;
        }
        if self.current_x.0 >= self.last_index() {
            self.state = PlayState::Paused;
            return None;
        }

        self.current_x = XIndex(self.current_x.0 + 1);
        self.target_x = self.current_x;
        update(self.current_x);

        if self.current_x.0 >= self.last_index() {
            self.state = PlayState::Paused;
            None
        } else {
            Some(self.tick_delay())
        }
    }

    /// Multiplies the speed by the fixed factor, wrapping back to the
    /// minimum once the maximum is reached. Affects tick cadence only.
    pub fn cycle_speed(&mut self) -> f64 {
        if self.speed >= self.max_speed {
            self.speed = self.min_speed;
        } else {
            self.speed = (self.speed * self.speed_factor).min(self.max_speed);
        }
        self.speed
    }

    /// Slider-driven jump, independent of the play state machine. While the
    /// settle lock is held, only the latest target is recorded (coalesced);
    /// otherwise the jump is applied immediately and the lock is taken.
    /// Returns whether the jump was applied.
    pub fn move_to<F: FnMut(XIndex)>(&mut self, target: XIndex, mut update: F) -> bool {
        let target = XIndex(target.0.min(self.last_index()));
        self.target_x = target;
        if self.slider_locked {
            return false;
        }
        self.slider_locked = true;
        self.current_x = target;
        update(target);
        true
    }

    /// Releases the settle lock and applies the newest coalesced target if
    /// it superseded the jump that took the lock.
    pub fn settle<F: FnMut(XIndex)>(&mut self, mut update: F) {
        self.slider_locked = false;
        if self.target_x != self.current_x {
            self.current_x = self.target_x;
            update(self.current_x);
        }
    }
}

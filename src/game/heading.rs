use log::debug;
use std::time::Duration;

use super::geometry::Direction;
use crate::config::PaceConfig;

/// Current direction of travel plus the tick delays that go with it.
///
/// Horizontal and vertical moves keep separate delays. The active delay is
/// re-selected from the matching axis whenever a turn is accepted or the
/// player changes speed.
#[derive(Debug, Clone)]
pub struct Heading {
    direction: Direction,
    delay_ms: u64,
    horizontal_ms: u64,
    vertical_ms: u64,
    floor_ms: u64,
    ceiling_ms: u64,
    step_ms: u64,
}

impl Heading {
    pub fn new(pace: &PaceConfig) -> Self {
        Self {
            direction: Direction::Right,
            delay_ms: pace.initial_delay_ms,
            horizontal_ms: pace.horizontal_ms,
            vertical_ms: pace.vertical_ms,
            floor_ms: pace.floor_ms,
            ceiling_ms: pace.ceiling_ms,
            step_ms: pace.step_ms,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn rates(&self) -> (u64, u64) {
        (self.horizontal_ms, self.vertical_ms)
    }

    /// Turns toward `requested` unless that would reverse onto the body.
    /// Returns whether the turn was accepted.
    pub fn turn(&mut self, requested: Direction) -> bool {
        if requested == self.direction.opposite() {
            return false;
        }

        self.direction = requested;
        self.select_delay();
        true
    }

    pub fn speed_up(&mut self) {
        if self.horizontal_ms > self.floor_ms {
            self.horizontal_ms = self.horizontal_ms.saturating_sub(self.step_ms).max(self.floor_ms);
        }
        if self.vertical_ms > self.floor_ms {
            self.vertical_ms = self.vertical_ms.saturating_sub(self.step_ms).max(self.floor_ms);
        }
        self.select_delay();
        debug!("Speed increase: {} ms", self.delay_ms);
    }

    pub fn slow_down(&mut self) {
        if self.horizontal_ms < self.ceiling_ms {
            self.horizontal_ms = (self.horizontal_ms + self.step_ms).min(self.ceiling_ms);
        }
        if self.vertical_ms < self.ceiling_ms {
            self.vertical_ms = (self.vertical_ms + self.step_ms).min(self.ceiling_ms);
        }
        self.select_delay();
        debug!("Speed decrease: {} ms", self.delay_ms);
    }

    /// Difficulty ramp applied on every meal. Not clamped, and the active
    /// delay keeps its value until the next accepted input.
    pub fn ramp(&mut self, amount: u64) {
        self.horizontal_ms += amount;
        self.vertical_ms += amount;
    }

    fn select_delay(&mut self) {
        self.delay_ms = if self.direction.is_vertical() {
            self.vertical_ms
        } else {
            self.horizontal_ms
        };
    }
}

use std::time::{Duration, Instant};

use super::gesture::{GestureConfig, InteractionEvent};

#[derive(Debug, Clone, Copy)]
struct Sample {
    x: f64,
    at: Instant,
}

#[derive(Debug, Clone)]
struct Press {
    origin_x: f64,
    origin_y: f64,
    started_at: Instant,
    last: Sample,
    /// Horizontal speed of the latest move segment, px/ms
    velocity: f64,
    /// Furthest the pointer strayed from the origin
    max_distance: f64,
}

/// Turns raw pointer samples into gesture events for the top card
///
/// A press that never strays past the tap slop and is released within the
/// tap window becomes a tap; anything else ends in a release carrying the net
/// horizontal displacement and the release velocity.
#[derive(Debug, Default)]
pub struct PointerTracker {
    press: Option<Press>,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }

    pub fn down(&mut self, x: f64, y: f64, at: Instant) {
        self.press = Some(Press {
            origin_x: x,
            origin_y: y,
            started_at: at,
            last: Sample { x, at },
            velocity: 0.0,
            max_distance: 0.0,
        });
    }

    /// Pointer moved while pressed; yields the drag offset
    pub fn moved(&mut self, x: f64, y: f64, at: Instant) -> Option<InteractionEvent> {
        let press = self.press.as_mut()?;

        let dt = millis(at.saturating_duration_since(press.last.at));
        if dt > 0.0 {
            press.velocity = (x - press.last.x).abs() / dt;
        }
        press.last = Sample { x, at };

        let distance = (x - press.origin_x).hypot(y - press.origin_y);
        press.max_distance = press.max_distance.max(distance);

        Some(InteractionEvent::Drag {
            dx: x - press.origin_x,
        })
    }

    /// Pointer released; yields a tap or a release
    pub fn up(&mut self, x: f64, y: f64, at: Instant, config: &GestureConfig) -> Option<InteractionEvent> {
        let mut press = self.press.take()?;

        let dt = millis(at.saturating_duration_since(press.last.at));
        if dt > 0.0 {
            press.velocity = (x - press.last.x).abs() / dt;
        }

        let distance = (x - press.origin_x).hypot(y - press.origin_y);
        let max_distance = press.max_distance.max(distance);
        let held = at.saturating_duration_since(press.started_at);

        if max_distance <= config.tap_slop && held <= config.tap_max_duration {
            return Some(InteractionEvent::Tap { at });
        }

        Some(InteractionEvent::Release {
            dx: x - press.origin_x,
            velocity: press.velocity,
        })
    }

    /// Pointer left the surface without a release (e.g. touch cancel)
    pub fn cancel(&mut self) -> Option<InteractionEvent> {
        self.press.take().map(|_| InteractionEvent::Release {
            dx: 0.0,
            velocity: 0.0,
        })
    }
}

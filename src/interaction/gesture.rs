//! Interaction state machine for the top card
//!
//! Transitions are a pure function of `(state, event)`: [`CardInteraction::step`]
//! never mutates and reports the decision and visual effect to apply.
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::models::{Decision, ReviewDraft};

/// Fraction of the viewport width a drag must cover to commit a swipe
pub const SWIPE_FRACTION: f64 = 0.25;
/// Release speed (px/ms) that commits a swipe regardless of distance
pub const VELOCITY_THRESHOLD: f64 = 0.2;
/// Degrees of rotation per pixel of horizontal drag
pub const ROTATION_FACTOR: f64 = 0.15;
/// Scale applied while the card is lifted by a drag
pub const LIFT_SCALE: f64 = 1.1;
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);
/// Maximum pointer travel (px) for a press to still count as a tap
pub const TAP_SLOP: f64 = 3.0;
/// Maximum press duration for a tap
pub const TAP_MAX_DURATION: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub swipe_fraction: f64,
    pub velocity_threshold: f64,
    pub rotation_factor: f64,
    pub lift_scale: f64,
    pub double_tap_window: Duration,
    pub tap_slop: f64,
    pub tap_max_duration: Duration,
}

impl GestureConfig {
    pub fn with_viewport(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            viewport_width,
            viewport_height,
            swipe_fraction: SWIPE_FRACTION,
            velocity_threshold: VELOCITY_THRESHOLD,
            rotation_factor: ROTATION_FACTOR,
            lift_scale: LIFT_SCALE,
            double_tap_window: DOUBLE_TAP_WINDOW,
            tap_slop: TAP_SLOP,
            tap_max_duration: TAP_MAX_DURATION,
        }
    }

    /// Horizontal displacement (px) that commits a swipe
    pub fn swipe_threshold(&self) -> f64 {
        self.viewport_width * self.swipe_fraction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    /// Watch-later exit
    Up,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    Dragging { dx: f64 },
    Exiting(Direction),
    Flipped,
    ReviewEditing(ReviewDraft),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// Pointer held and moved by `dx` from where it went down
    Drag { dx: f64 },
    /// Pointer released after a drag; `velocity` in px/ms
    Release { dx: f64, velocity: f64 },
    Tap { at: Instant },
    WatchLater,
    SetRating(u8),
    EditReview(String),
    SubmitReview,
    CancelReview,
    /// The exit animation finished and the buffer popped the card
    ExitCompleted,
}

/// Visual side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    SnapBack,
    StartExit(Direction),
    Flip,
    Unflip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardInteraction {
    pub state: InteractionState,
    /// Time of the last single tap, for double-tap detection
    pub last_tap: Option<Instant>,
}

/// Result of feeding one event to the machine
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub next: CardInteraction,
    pub decision: Option<Decision>,
    pub effect: Option<Effect>,
}

impl Default for CardInteraction {
    fn default() -> Self {
        Self {
            state: InteractionState::Idle,
            last_tap: None,
        }
    }
}

/// Direction a release commits to, or `None` to snap back
///
/// Either the distance (≥ threshold) or the speed (> threshold) can trigger a
/// swipe, but only the sign of the displacement picks the side.
pub fn classify_release(dx: f64, velocity: f64, config: &GestureConfig) -> Option<Direction> {
    if dx == 0.0 || dx.is_nan() {
        return None;
    }

    let far_enough = dx.abs() >= config.swipe_threshold();
    let fast_enough = velocity.abs() > config.velocity_threshold;
    if !(far_enough || fast_enough) {
        return None;
    }

    Some(if dx > 0.0 {
        Direction::Right
    } else {
        Direction::Left
    })
}

impl CardInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_exiting(&self) -> bool {
        matches!(self.state, InteractionState::Exiting(_))
    }

    pub fn is_flipped(&self) -> bool {
        matches!(
            self.state,
            InteractionState::Flipped | InteractionState::ReviewEditing(_)
        )
    }

    fn to(&self, state: InteractionState) -> Step {
        Step {
            next: CardInteraction {
                state,
                last_tap: self.last_tap,
            },
            decision: None,
            effect: None,
        }
    }

    fn unchanged(&self) -> Step {
        self.to(self.state.clone())
    }

    fn exit(&self, direction: Direction, decision: Decision) -> Step {
        Step {
            next: CardInteraction {
                state: InteractionState::Exiting(direction),
                last_tap: None,
            },
            decision: Some(decision),
            effect: Some(Effect::StartExit(direction)),
        }
    }

    /// Computes the transition for `event` without changing `self`
    pub fn step(&self, event: InteractionEvent, config: &GestureConfig) -> Step {
        use InteractionEvent as E;
        use InteractionState as S;

        match (&self.state, event) {
            (S::Exiting(_), E::ExitCompleted) => Step {
                next: CardInteraction::default(),
                decision: None,
                effect: None,
            },
            // one exit at a time: everything else waits for the completion
            (S::Exiting(_), _) | (_, E::ExitCompleted) => self.unchanged(),

            (_, E::Tap { at }) => self.tap(at, config),

            (S::Idle | S::Dragging { .. }, E::Drag { dx }) => self.to(S::Dragging { dx }),
            (S::Idle | S::Dragging { .. }, E::Release { dx, velocity }) => {
                match classify_release(dx, velocity, config) {
                    Some(Direction::Right) => self.exit(Direction::Right, Decision::Watched),
                    Some(_) => self.exit(Direction::Left, Decision::Skipped),
                    None => Step {
                        effect: Some(Effect::SnapBack),
                        ..self.to(S::Idle)
                    },
                }
            }
            (S::Idle, E::WatchLater) => self.exit(Direction::Up, Decision::WatchLater),

            (S::Flipped, E::SetRating(rating)) => {
                let mut draft = ReviewDraft::default();
                draft.set_rating(rating);
                self.to(S::ReviewEditing(draft))
            }
            (S::Flipped, E::EditReview(text)) => {
                let mut draft = ReviewDraft::default();
                draft.set_text(text);
                self.to(S::ReviewEditing(draft))
            }
            (S::ReviewEditing(draft), E::SetRating(rating)) => {
                let mut draft = draft.clone();
                draft.set_rating(rating);
                self.to(S::ReviewEditing(draft))
            }
            (S::ReviewEditing(draft), E::EditReview(text)) => {
                let mut draft = draft.clone();
                draft.set_text(text);
                self.to(S::ReviewEditing(draft))
            }
            (S::ReviewEditing(draft), E::SubmitReview) => match draft.submit() {
                Some(review) => self.exit(Direction::Right, Decision::Reviewed(review)),
                None => self.unchanged(),
            },
            (S::Flipped | S::ReviewEditing(_), E::CancelReview) => Step {
                effect: Some(Effect::Unflip),
                ..self.to(S::Idle)
            },

            _ => self.unchanged(),
        }
    }

    fn tap(&self, at: Instant, config: &GestureConfig) -> Step {
        let is_double = self
            .last_tap
            .is_some_and(|previous| at.saturating_duration_since(previous) < config.double_tap_window);

        if !is_double {
            let state = match self.state {
                // a tap ends whatever tiny drag preceded it
                InteractionState::Dragging { .. } => InteractionState::Idle,
                ref other => other.clone(),
            };
            let effect = matches!(self.state, InteractionState::Dragging { .. })
                .then_some(Effect::SnapBack);
            return Step {
                next: CardInteraction {
                    state,
                    last_tap: Some(at),
                },
                decision: None,
                effect,
            };
        }

        let (state, effect) = if self.is_flipped() {
            (InteractionState::Idle, Effect::Unflip)
        } else {
            (InteractionState::Flipped, Effect::Flip)
        };

        Step {
            next: CardInteraction {
                state,
                last_tap: None,
            },
            decision: None,
            effect: Some(effect),
        }
    }

    /// Applies `event` in place, returning the decision and effect
    pub fn apply(
        &mut self,
        event: InteractionEvent,
        config: &GestureConfig,
    ) -> (Option<Decision>, Option<Effect>) {
        let step = self.step(event, config);
        *self = step.next;
        (step.decision, step.effect)
    }
}

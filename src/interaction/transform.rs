use serde::Serialize;

use super::gesture::{Direction, GestureConfig, InteractionState};

/// Visual transform applied to one card
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CardTransform {
    /// Horizontal offset in pixels
    pub x: f64,
    /// Vertical offset in pixels
    pub y: f64,
    /// In-plane rotation in degrees
    pub rotate_z: f64,
    /// Rotation around the vertical axis in degrees; 180 shows the back face
    pub rotate_y: f64,
    pub scale: f64,
    pub opacity: f64,
}

impl Default for CardTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotate_z: 0.0,
            rotate_y: 0.0,
            scale: 1.0,
            opacity: 1.0,
        }
    }
}

impl CardTransform {
    /// Card face turned towards the viewer
    pub fn flipped() -> Self {
        Self {
            rotate_y: 180.0,
            ..Self::default()
        }
    }

    /// Live feedback while the pointer drags the card
    pub fn dragging(dx: f64, config: &GestureConfig) -> Self {
        Self {
            x: dx,
            rotate_z: dx * config.rotation_factor,
            scale: config.lift_scale,
            ..Self::default()
        }
    }

    /// Final frame of an exit: off screen, faded out
    pub fn exit_target(direction: Direction, rotation: f64, config: &GestureConfig) -> Self {
        let (x, y) = match direction {
            Direction::Left => (-config.viewport_width, 0.0),
            Direction::Right => (config.viewport_width, 0.0),
            Direction::Up => (0.0, -config.viewport_height),
        };
        Self {
            x,
            y,
            rotate_z: rotation,
            rotate_y: 0.0,
            scale: 0.5,
            opacity: 0.0,
        }
    }

    /// Transform a card rests at for a given interaction state
    pub fn resting(state: &InteractionState, config: &GestureConfig) -> Self {
        match state {
            InteractionState::Dragging { dx } => Self::dragging(*dx, config),
            InteractionState::Flipped | InteractionState::ReviewEditing(_) => Self::flipped(),
            InteractionState::Idle | InteractionState::Exiting(_) => Self::default(),
        }
    }

    /// Linear interpolation; `t` is clamped to `0.0..=1.0`
    pub fn lerp(&self, to: &Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            x: mix(self.x, to.x),
            y: mix(self.y, to.y),
            rotate_z: mix(self.rotate_z, to.rotate_z),
            rotate_y: mix(self.rotate_y, to.rotate_y),
            scale: mix(self.scale, to.scale),
            opacity: mix(self.opacity, to.opacity),
        }
    }

    /// Whether the back face is the one turned towards the viewer
    pub fn shows_back(&self) -> bool {
        self.rotate_y.rem_euclid(360.0) > 90.0 && self.rotate_y.rem_euclid(360.0) < 270.0
    }
}

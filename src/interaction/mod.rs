pub mod gesture;
pub mod pointer;
pub mod stack;
pub mod transform;

pub use gesture::{
    classify_release, CardInteraction, Direction, Effect, GestureConfig, InteractionEvent,
    InteractionState, Step,
};
pub use pointer::PointerTracker;
pub use stack::{CardStack, Face, StackView, VisibleCard};
pub use transform::CardTransform;

mod camera;
pub mod pick;
pub mod sketch;
mod surface;
pub mod transition;

pub use camera::{CameraController, CameraMovement, MoveDirection};
pub use pick::{pick, PickCandidate, PickTarget};
pub use sketch::{Outline, OutlineKind};
pub use surface::GpuSurface;
pub use transition::{
    AnimTarget, Animatable, Easing, Property, TransitionEngine, TransitionEvent, TransitionId,
};

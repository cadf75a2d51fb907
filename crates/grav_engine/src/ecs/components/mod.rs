//! Concrete component variants
//!
//! Each variant is a plain data struct; behavior that needs the solver
//! lives in the physics system, keeping these types engine-agnostic.

pub mod gameplay;
pub mod gravity;
pub mod path;
pub mod physics;
pub mod position;
pub mod shape;
pub mod visual;

pub use gameplay::{CompPlayerController, CompTrigger, CompVariable};
pub use gravity::{CompGravField, GravityKind};
pub use path::{CompPath, CompPathMove, MotionMode, PathError, PathPoint, PathTarget};
pub use physics::{ActiveField, BodyRuntime, CompPhysics, ShapeFixture};
pub use position::CompPosition;
pub use shape::CompShape;
pub use visual::{CompVisualAnimation, CompVisualMessage, CompVisualTexture};

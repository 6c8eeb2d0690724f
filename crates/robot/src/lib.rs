// Domain-driven module structure for the Flockcast robot.

// Core infrastructure
pub mod conf;
pub mod error;
pub mod state;
pub mod transport;

// Domain modules
pub mod presence;
pub mod flocking;
pub mod runtime;

pub use error::{Result, RobotError};
pub use runtime::{Lifecycle, Robot, RobotHandle, StopReport};

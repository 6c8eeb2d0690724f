//! Runtime module — robot lifecycle: boot, activities, shutdown.

pub mod activity;
pub mod boot;
pub mod robot;
pub mod stop;

pub use robot::{Lifecycle, Robot, RobotHandle, StopReport};

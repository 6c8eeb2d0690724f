//! State module — identity, geometry, and the state shared by a robot's activities.

pub mod identity;
pub mod position;
pub mod robot;

pub use identity::AgentId;
pub use position::{Position, Vec2};
pub use robot::{Kinematics, MetricsSnapshot, RobotMetrics, RobotState, SharedState};

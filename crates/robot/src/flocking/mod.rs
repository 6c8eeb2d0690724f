//! Flocking module — steering toward the centroid of the observed swarm.

pub mod controller;
pub mod policy;

pub use controller::{centroid, integrate, FlockingController, MotionVector};
pub use policy::RecomputePolicy;

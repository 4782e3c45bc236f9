//! Crossing model: cars, lanes, booths and the crossing that owns them
//!
//! - **Car**: 1-D kinematics and a lifecycle status
//! - **ServiceNode**: an inspection booth serving one car at a time
//! - **CarQueue**: one lane with car-following and its booths
//! - **BorderCrossing**: routes arrivals to lanes and runs ticks
//!
//! Snapshot types for telemetry live in [`state`].

pub mod border;
pub mod car;
pub mod node;
pub mod queue;
pub mod state;

pub use border::*;
pub use car::*;
pub use node::*;
pub use queue::*;
pub use state::*;

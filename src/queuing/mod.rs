//! Stochastic processes driving the crossing
//!
//! - **ArrivalProcess**: Poisson arrivals, optionally modulated by hour of day
//! - **ServiceProcess**: exponential booth service with conditional and jittered variants
//! - **Mm1Queue**: event-driven single-server reference model with closed-form metrics
//!
//! All samplers take the random number generator as an argument so a run is
//! reproducible from a single seed.

pub mod arrival;
pub mod mm1;
pub mod service;

pub use arrival::*;
pub use mm1::*;
pub use service::*;

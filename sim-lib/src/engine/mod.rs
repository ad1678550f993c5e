//! Fault-injection engine.
//!
//! Decides, per endpoint, how long to delay a response and whether
//! and how it fails. Free of any HTTP framework: the transport layer
//! only maps a [`SimulationResult`] onto a response.

pub mod latency;
pub mod outcome;
pub mod policy;
pub mod random;
pub mod simulator;

pub use self::{
    latency::{DEFAULT_LATENCY_WINDOW, Interrupted, LatencyRange},
    outcome::{FailurePolicy, FailurePolicyError, Outcome},
    policy::{Endpoint, EndpointMessages, EndpointPolicy, PolicyRegistry, UnknownEndpoint},
    random::{ProcessRandom, RandomSource, SeededRandom, ThreadRandom},
    simulator::{Fault, RequestSimulator, SimulationError, SimulationResult},
};

#[cfg(any(test, feature = "test-utils"))]
pub use self::random::ScriptedRandom;

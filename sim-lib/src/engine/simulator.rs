use std::{fmt, sync::Arc};

use rama::telemetry::tracing;

use super::{
    Endpoint, EndpointPolicy, Outcome, PolicyRegistry, RandomSource, ThreadRandom, UnknownEndpoint,
    latency::{sample_delay, suspend},
    outcome::decide,
};

/// Status code and body produced for one simulated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    pub status: u16,
    pub message: String,
    /// Set when the processing delay was interrupted.
    pub interrupted: bool,
}

impl SimulationResult {
    fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            interrupted: false,
        }
    }

    fn interrupted(message: String) -> Self {
        Self {
            status: 500,
            message,
            interrupted: true,
        }
    }
}

/// Raised instead of returning a response when a server error takes the fault path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub endpoint: Endpoint,
    pub message: &'static str,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl std::error::Error for Fault {}

/// Error returned when simulating a request by endpoint name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    UnknownEndpoint(UnknownEndpoint),
    Fault(Fault),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEndpoint(err) => err.fmt(f),
            Self::Fault(fault) => write!(f, "simulated fault in /{}: {fault}", fault.endpoint),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnknownEndpoint(err) => Some(err),
            Self::Fault(fault) => Some(fault),
        }
    }
}

impl From<UnknownEndpoint> for SimulationError {
    fn from(err: UnknownEndpoint) -> Self {
        Self::UnknownEndpoint(err)
    }
}

impl From<Fault> for SimulationError {
    fn from(fault: Fault) -> Self {
        Self::Fault(fault)
    }
}

/// Simulates processing time and failures for the registered endpoints.
#[derive(Debug, Clone)]
pub struct RequestSimulator<R = ThreadRandom> {
    registry: Arc<PolicyRegistry>,
    random: R,
}

impl RequestSimulator {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self::new_with_random(registry, ThreadRandom::new())
    }
}

impl<R: RandomSource> RequestSimulator<R> {
    pub fn new_with_random(registry: Arc<PolicyRegistry>, random: R) -> Self {
        Self { registry, random }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Simulate one call to `endpoint`.
    ///
    /// The processing delay is cut short once `interrupt` resolves,
    /// in which case a 500 result is returned and no outcome is drawn.
    pub async fn handle<F>(
        &self,
        endpoint: Endpoint,
        interrupt: F,
    ) -> Result<SimulationResult, Fault>
    where
        F: Future,
    {
        self.simulate(self.registry.get(endpoint), interrupt).await
    }

    /// Like [`Self::handle`], with the endpoint given by name, e.g. `loan-request`.
    pub async fn handle_named<F>(
        &self,
        name: &str,
        interrupt: F,
    ) -> Result<SimulationResult, SimulationError>
    where
        F: Future,
    {
        let policy = self.registry.lookup(name)?;
        Ok(self.simulate(policy, interrupt).await?)
    }

    async fn simulate<F>(
        &self,
        policy: &EndpointPolicy,
        interrupt: F,
    ) -> Result<SimulationResult, Fault>
    where
        F: Future,
    {
        let endpoint = policy.endpoint;
        let messages = endpoint.messages();
        let delay = sample_delay(policy.latency, &self.random);
        if let Err(err) = suspend(delay, interrupt).await {
            tracing::warn!(
                endpoint = %endpoint,
                requested = ?err.requested,
                elapsed = ?err.elapsed,
                "simulated processing interrupted",
            );
            return Ok(SimulationResult::interrupted(
                messages.interrupted_body(err),
            ));
        }

        let outcome = self.decide_outcome(policy);
        tracing::debug!(
            endpoint = %endpoint,
            ?delay,
            %outcome,
            failure = outcome.is_failure(),
            "simulated request",
        );

        match outcome {
            Outcome::Success => Ok(SimulationResult::new(200, messages.success)),
            Outcome::ClientError { code } => Ok(SimulationResult::new(
                code,
                messages.client_error_body(code),
            )),
            Outcome::ServerError {
                code,
                fault_path: false,
            } => Ok(SimulationResult::new(
                code,
                messages.server_error_body(code),
            )),
            Outcome::ServerError {
                fault_path: true, ..
            } => Err(Fault {
                endpoint,
                message: messages.fault,
            }),
        }
    }

    /// Like [`Self::handle`], but a raised [`Fault`] is caught
    /// and turned into a generic internal error result.
    pub async fn respond<F>(&self, endpoint: Endpoint, interrupt: F) -> SimulationResult
    where
        F: Future,
    {
        match self.handle(endpoint, interrupt).await {
            Ok(result) => result,
            Err(fault) => {
                tracing::error!("simulated error in /{}: {fault}", fault.endpoint);
                SimulationResult::new(500, fault.endpoint.messages().fault_response)
            }
        }
    }

    fn decide_outcome(&self, policy: &EndpointPolicy) -> Outcome {
        match &policy.failure {
            Some(failure) => decide(failure, &self.random),
            None => Outcome::Success,
        }
    }
}

#[cfg(test)]
#[path = "simulator_tests.rs"]
mod tests;

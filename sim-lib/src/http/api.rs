use std::{convert::Infallible, fmt, sync::Arc};

use rama::{
    Service,
    graceful::WeakShutdownGuard,
    http::{
        Request, Response,
        service::web::{Router, extract::State},
    },
};

use crate::engine::{Endpoint, ProcessRandom, RequestSimulator};

use super::response::simulation_result_into_response;

/// Shared state of the api routes.
#[derive(Clone)]
pub struct ApiState {
    simulator: RequestSimulator<ProcessRandom>,
    shutdown: Option<WeakShutdownGuard>,
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("simulator", &self.simulator)
            .field("graceful", &self.shutdown.is_some())
            .finish()
    }
}

impl ApiState {
    pub fn new(simulator: RequestSimulator<ProcessRandom>) -> Self {
        Self {
            simulator,
            shutdown: None,
        }
    }

    /// Interrupt pending delays once a graceful shutdown is initiated.
    pub fn with_shutdown(mut self, guard: WeakShutdownGuard) -> Self {
        self.shutdown = Some(guard);
        self
    }

    async fn simulate(self, endpoint: Endpoint) -> Response {
        let Self {
            simulator,
            shutdown,
        } = self;
        let interrupt = async move {
            match shutdown {
                Some(guard) => {
                    guard.into_cancelled().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        simulation_result_into_response(simulator.respond(endpoint, interrupt).await)
    }
}

/// Routes of the simulated api, all under `/api`, plus a `/ping` liveness check.
pub fn api_svc(
    state: ApiState,
) -> impl Service<Request, Output = Response, Error = Infallible> + Clone {
    Arc::new(
        Router::new_with_state(state)
            .with_get("/ping", ping)
            .with_get("/api/payments", payments)
            .with_get("/api/cashout", cashout)
            .with_get("/api/credit-analysis", credit_analysis)
            .with_get("/api/loan-request", loan_request),
    )
}

async fn ping() -> &'static str {
    "pong"
}

async fn payments(State(state): State<ApiState>) -> Response {
    state.simulate(Endpoint::Payments).await
}

async fn cashout(State(state): State<ApiState>) -> Response {
    state.simulate(Endpoint::Cashout).await
}

async fn credit_analysis(State(state): State<ApiState>) -> Response {
    state.simulate(Endpoint::CreditAnalysis).await
}

async fn loan_request(State(state): State<ApiState>) -> Response {
    state.simulate(Endpoint::LoanRequest).await
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;

use std::{fmt, str::FromStr};

use super::{FailurePolicy, LatencyRange};

/// The simulated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Payments,
    Cashout,
    CreditAnalysis,
    LoanRequest,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Payments,
        Endpoint::Cashout,
        Endpoint::CreditAnalysis,
        Endpoint::LoanRequest,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Payments => "payments",
            Endpoint::Cashout => "cashout",
            Endpoint::CreditAnalysis => "credit-analysis",
            Endpoint::LoanRequest => "loan-request",
        }
    }

    pub const fn messages(&self) -> &'static EndpointMessages {
        match self {
            Endpoint::Payments => &PAYMENTS_MESSAGES,
            Endpoint::Cashout => &CASHOUT_MESSAGES,
            Endpoint::CreditAnalysis => &CREDIT_ANALYSIS_MESSAGES,
            Endpoint::LoanRequest => &LOAN_REQUEST_MESSAGES,
        }
    }

    const fn index(&self) -> usize {
        match self {
            Endpoint::Payments => 0,
            Endpoint::Cashout => 1,
            Endpoint::CreditAnalysis => 2,
            Endpoint::LoanRequest => 3,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|endpoint| endpoint.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownEndpoint(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEndpoint(pub String);

impl fmt::Display for UnknownEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown endpoint: '{}'", self.0)
    }
}

impl std::error::Error for UnknownEndpoint {}

/// Text templates used to build the response of an endpoint.
#[derive(Debug)]
pub struct EndpointMessages {
    pub success: &'static str,
    /// Followed by ` (simulated error <code>).`
    pub server_error: &'static str,
    /// Followed by ` (simulated error <code>).`
    pub client_error: &'static str,
    /// Message of the raised fault.
    pub fault: &'static str,
    /// Body returned once a raised fault is caught.
    pub fault_response: &'static str,
    /// Followed by `: <reason>`.
    pub interrupted: &'static str,
}

impl EndpointMessages {
    pub fn server_error_body(&self, code: u16) -> String {
        format!("{} (simulated error {code}).", self.server_error)
    }

    pub fn client_error_body(&self, code: u16) -> String {
        format!("{} (simulated error {code}).", self.client_error)
    }

    pub fn interrupted_body(&self, reason: impl fmt::Display) -> String {
        format!("{}: {reason}", self.interrupted)
    }
}

static PAYMENTS_MESSAGES: EndpointMessages = EndpointMessages {
    success: "Payment processed successfully.",
    server_error: "Payment service temporarily unavailable",
    client_error: "Payment request rejected",
    fault: "Internal system error processing payment (simulated error).",
    fault_response: "Failed to process payment due to an internal error (simulated).",
    interrupted: "Error during payment processing",
};

static CASHOUT_MESSAGES: EndpointMessages = EndpointMessages {
    success: "Cashout request successful.",
    server_error: "Cashout service temporarily unavailable",
    client_error: "Cashout request rejected",
    fault: "Internal system error processing cashout request (simulated error).",
    fault_response: "Failed to process cashout request due to an internal error (simulated).",
    interrupted: "Error during cashout request",
};

static CREDIT_ANALYSIS_MESSAGES: EndpointMessages = EndpointMessages {
    success: "Credit analysis completed.",
    server_error: "Credit analysis service temporarily unavailable",
    client_error: "Credit analysis request rejected",
    fault: "Internal system error performing credit analysis (simulated error).",
    fault_response: "Failed to perform credit analysis due to an internal error (simulated).",
    interrupted: "Error during credit analysis",
};

static LOAN_REQUEST_MESSAGES: EndpointMessages = EndpointMessages {
    success: "Loan request submitted successfully.",
    server_error: "Loan service temporarily unavailable",
    client_error: "Loan request rejected",
    fault: "Internal system error processing loan request (simulated error).",
    fault_response: "Failed to process loan request due to an internal error (simulated).",
    interrupted: "Interrupted error during loan request",
};

/// Delay and failure behaviour of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPolicy {
    pub endpoint: Endpoint,
    pub latency: LatencyRange,
    pub failure: Option<FailurePolicy>,
}

impl EndpointPolicy {
    pub fn new(endpoint: Endpoint, latency: LatencyRange, failure: Option<FailurePolicy>) -> Self {
        Self {
            endpoint,
            latency,
            failure,
        }
    }

    pub fn name(&self) -> &'static str {
        self.endpoint.as_str()
    }

    /// True when a server error of this endpoint is raised as a fault
    /// rather than returned as a crafted response.
    pub fn unconditional_failure_override(&self) -> bool {
        self.failure
            .as_ref()
            .is_some_and(FailurePolicy::faults_on_server_error)
    }
}

/// Immutable set of all endpoint policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRegistry {
    policies: [EndpointPolicy; 4],
}

impl PolicyRegistry {
    /// Build a registry from one policy per endpoint, in any order.
    ///
    /// Returns `None` if an endpoint is missing or listed twice.
    pub fn try_from_policies(policies: impl IntoIterator<Item = EndpointPolicy>) -> Option<Self> {
        let mut slots: [Option<EndpointPolicy>; 4] = Default::default();
        for policy in policies {
            let slot = &mut slots[policy.endpoint.index()];
            if slot.is_some() {
                return None;
            }
            *slot = Some(policy);
        }

        let [payments, cashout, credit_analysis, loan_request] = slots;
        Some(Self {
            policies: [payments?, cashout?, credit_analysis?, loan_request?],
        })
    }

    pub fn get(&self, endpoint: Endpoint) -> &EndpointPolicy {
        &self.policies[endpoint.index()]
    }

    /// Find a policy by endpoint name, e.g. `credit-analysis`.
    pub fn lookup(&self, name: &str) -> Result<&EndpointPolicy, UnknownEndpoint> {
        name.parse().map(|endpoint| self.get(endpoint))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointPolicy> {
        self.policies.iter()
    }
}

/// Default latency ranges and failure models, used for every value left unconfigured.
pub mod defaults {
    use crate::engine::{FailurePolicy, LatencyRange};

    pub const PAYMENTS_LATENCY: LatencyRange = LatencyRange::new(50, 200);

    pub const CASHOUT_LATENCY: LatencyRange = LatencyRange::new(100, 300);
    pub const CASHOUT_FAILURE: FailurePolicy = FailurePolicy::new_unchecked(20, 70, 503, 400);

    pub const CREDIT_ANALYSIS_LATENCY: LatencyRange = LatencyRange::new(1500, 3000);

    pub const LOAN_REQUEST_LATENCY: LatencyRange = LatencyRange::new(50, 150);
    pub const LOAN_REQUEST_FAILURE: FailurePolicy = FailurePolicy::new_unchecked(100, 100, 500, 400);
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self {
            policies: [
                EndpointPolicy::new(Endpoint::Payments, defaults::PAYMENTS_LATENCY, None),
                EndpointPolicy::new(
                    Endpoint::Cashout,
                    defaults::CASHOUT_LATENCY,
                    Some(defaults::CASHOUT_FAILURE),
                ),
                EndpointPolicy::new(
                    Endpoint::CreditAnalysis,
                    defaults::CREDIT_ANALYSIS_LATENCY,
                    None,
                ),
                EndpointPolicy::new(
                    Endpoint::LoanRequest,
                    defaults::LOAN_REQUEST_LATENCY,
                    Some(defaults::LOAN_REQUEST_FAILURE),
                ),
            ],
        }
    }
}

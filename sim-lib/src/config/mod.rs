use std::path::Path;

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing,
};

use serde::Deserialize;

use crate::engine::{
    Endpoint, EndpointPolicy, FailurePolicy, LatencyRange, PolicyRegistry, policy::defaults,
};

/// Tunables of all simulated endpoints.
///
/// Every value is optional, anything left undefined falls back
/// to the default policy of its endpoint. Values can be passed as
/// cli flags, environment variables or a JSON config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Minimum processing time of /payments.
    #[arg(long, env, value_name = "MS", allow_negative_numbers = true)]
    pub payments_latency_min_ms: Option<i64>,

    /// Maximum (exclusive) processing time of /payments.
    #[arg(long, env, value_name = "MS", allow_negative_numbers = true)]
    pub payments_latency_max_ms: Option<i64>,

    /// Minimum processing time of /cashout.
    #[arg(long, env, value_name = "MS", allow_negative_numbers = true)]
    pub cashout_latency_min_ms: Option<i64>,

    /// Maximum (exclusive) processing time of /cashout.
    #[arg(long, env, value_name = "MS", allow_negative_numbers = true)]
    pub cashout_latency_max_ms: Option<i64>,

    /// Chance (0-100) that a /cashout request fails.
    #[arg(long, env, value_name = "PERCENT", allow_negative_numbers = true)]
    pub cashout_failure_percentage: Option<i64>,

    /// Chance (0-100) that a failed /cashout request is a server error.
    #[arg(long, env, value_name = "PERCENT", allow_negative_numbers = true)]
    pub cashout_five_xx_percentage: Option<i64>,

    /// Status code of a /cashout server error.
    #[arg(long, env, value_name = "CODE")]
    pub cashout_five_xx_code: Option<i64>,

    /// Status code of a /cashout client error.
    #[arg(long, env, value_name = "CODE")]
    pub cashout_four_xx_code: Option<i64>,

    /// Minimum processing time of /credit-analysis.
    #[arg(long, env, value_name = "MS", allow_negative_numbers = true)]
    pub credit_analysis_latency_min_ms: Option<i64>,

    /// Maximum (exclusive) processing time of /credit-analysis.
    #[arg(long, env, value_name = "MS", allow_negative_numbers = true)]
    pub credit_analysis_latency_max_ms: Option<i64>,

    /// Minimum processing time of /loan-request.
    #[arg(long, env, value_name = "MS", allow_negative_numbers = true)]
    pub loan_request_latency_min_ms: Option<i64>,

    /// Maximum (exclusive) processing time of /loan-request.
    #[arg(long, env, value_name = "MS", allow_negative_numbers = true)]
    pub loan_request_latency_max_ms: Option<i64>,

    /// Chance (0-100) that a /loan-request request fails.
    #[arg(long, env, value_name = "PERCENT", allow_negative_numbers = true)]
    pub loan_request_failure_percentage: Option<i64>,

    /// Chance (0-100) that a failed /loan-request request is a server error.
    #[arg(long, env, value_name = "PERCENT", allow_negative_numbers = true)]
    pub loan_request_five_xx_percentage: Option<i64>,

    /// Status code of a /loan-request server error (500 is raised as a fault).
    #[arg(long, env, value_name = "CODE")]
    pub loan_request_five_xx_code: Option<i64>,

    /// Status code of a /loan-request client error.
    #[arg(long, env, value_name = "CODE")]
    pub loan_request_four_xx_code: Option<i64>,
}

impl SimulatorConfig {
    /// Read a config from a JSON file.
    pub async fn try_load_file(path: &Path) -> Result<Self, BoxError> {
        let raw = tokio::fs::read(path)
            .await
            .context("read simulator config file")
            .with_context_debug_field("path", || path.to_owned())?;
        serde_json::from_slice(&raw)
            .context("parse simulator config file as json")
            .with_context_debug_field("path", || path.to_owned())
    }

    /// Apply the defaults and validate the failure models.
    ///
    /// Invalid latency ranges are accepted: they are logged and
    /// replaced by the default window each time they are sampled.
    pub fn try_build_registry(&self) -> Result<PolicyRegistry, BoxError> {
        let payments = EndpointPolicy::new(
            Endpoint::Payments,
            latency_range(
                Endpoint::Payments,
                self.payments_latency_min_ms,
                self.payments_latency_max_ms,
                defaults::PAYMENTS_LATENCY,
            ),
            None,
        );

        let cashout = EndpointPolicy::new(
            Endpoint::Cashout,
            latency_range(
                Endpoint::Cashout,
                self.cashout_latency_min_ms,
                self.cashout_latency_max_ms,
                defaults::CASHOUT_LATENCY,
            ),
            Some(failure_policy(
                Endpoint::Cashout,
                [
                    self.cashout_failure_percentage,
                    self.cashout_five_xx_percentage,
                    self.cashout_five_xx_code,
                    self.cashout_four_xx_code,
                ],
                defaults::CASHOUT_FAILURE,
            )?),
        );

        let credit_analysis = EndpointPolicy::new(
            Endpoint::CreditAnalysis,
            latency_range(
                Endpoint::CreditAnalysis,
                self.credit_analysis_latency_min_ms,
                self.credit_analysis_latency_max_ms,
                defaults::CREDIT_ANALYSIS_LATENCY,
            ),
            None,
        );

        let loan_request = EndpointPolicy::new(
            Endpoint::LoanRequest,
            latency_range(
                Endpoint::LoanRequest,
                self.loan_request_latency_min_ms,
                self.loan_request_latency_max_ms,
                defaults::LOAN_REQUEST_LATENCY,
            ),
            Some(failure_policy(
                Endpoint::LoanRequest,
                [
                    self.loan_request_failure_percentage,
                    self.loan_request_five_xx_percentage,
                    self.loan_request_five_xx_code,
                    self.loan_request_four_xx_code,
                ],
                defaults::LOAN_REQUEST_FAILURE,
            )?),
        );

        PolicyRegistry::try_from_policies([payments, cashout, credit_analysis, loan_request])
            .context("build endpoint policy registry")
    }
}

fn latency_range(
    endpoint: Endpoint,
    min_ms: Option<i64>,
    max_ms: Option<i64>,
    default: LatencyRange,
) -> LatencyRange {
    let range = LatencyRange::new(
        min_ms.unwrap_or(default.min_ms),
        max_ms.unwrap_or(default.max_ms),
    );
    if !range.is_valid() {
        tracing::warn!(
            %endpoint,
            "invalid latency range {range}: requests fall back to the default window {}",
            range.effective(),
        );
    }
    range
}

fn failure_policy(
    endpoint: Endpoint,
    [failure_percentage, five_xx_percentage, five_xx_code, four_xx_code]: [Option<i64>; 4],
    default: FailurePolicy,
) -> Result<FailurePolicy, BoxError> {
    FailurePolicy::try_new(
        failure_percentage.unwrap_or(default.failure_percentage().into()),
        five_xx_percentage.unwrap_or(default.five_xx_percentage().into()),
        five_xx_code.unwrap_or(default.five_xx_code().into()),
        four_xx_code.unwrap_or(default.four_xx_code().into()),
    )
    .context("create failure policy")
    .context_str_field("endpoint", endpoint.as_str())
}

/// Merge two configs, per property: `overwrite` wins over `base`.
pub fn merge_config(base: SimulatorConfig, overwrite: SimulatorConfig) -> SimulatorConfig {
    macro_rules! merge_config {
        ($base:ident, $overwrite:ident, {$($property:ident),+ $(,)?}) => {
            SimulatorConfig {
                $(
                    $property: if let Some(value) = $overwrite.$property {
                        tracing::info!("property '{}': use overwrite: {value}", stringify!($property));
                        Some(value)
                    } else if let Some(value) = $base.$property {
                        tracing::info!("property '{}': use config file: {value}", stringify!($property));
                        Some(value)
                    } else {
                        tracing::debug!("property '{}': undefined, use default", stringify!($property));
                        None
                    },
                )+
            }
        };
    }

    merge_config!(
        base, overwrite,
        {
            payments_latency_min_ms,
            payments_latency_max_ms,
            cashout_latency_min_ms,
            cashout_latency_max_ms,
            cashout_failure_percentage,
            cashout_five_xx_percentage,
            cashout_five_xx_code,
            cashout_four_xx_code,
            credit_analysis_latency_min_ms,
            credit_analysis_latency_max_ms,
            loan_request_latency_min_ms,
            loan_request_latency_max_ms,
            loan_request_failure_percentage,
            loan_request_five_xx_percentage,
            loan_request_five_xx_code,
            loan_request_four_xx_code,
        }
    )
}

use std::fmt;

use super::RandomSource;

/// Server error code which is raised as a fault instead of returned as a response.
pub const FAULT_STATUS_CODE: u16 = 500;

/// Weighted failure model of an endpoint.
///
/// `failure_percentage` is the chance that a request fails at all.
/// `five_xx_percentage` is the chance, given a failure,
/// that it is a server error rather than a client error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    failure_percentage: u8,
    five_xx_percentage: u8,
    five_xx_code: u16,
    four_xx_code: u16,
}

impl FailurePolicy {
    pub fn try_new(
        failure_percentage: i64,
        five_xx_percentage: i64,
        five_xx_code: i64,
        four_xx_code: i64,
    ) -> Result<Self, FailurePolicyError> {
        Ok(Self {
            failure_percentage: try_percentage("failure_percentage", failure_percentage)?,
            five_xx_percentage: try_percentage("five_xx_percentage", five_xx_percentage)?,
            five_xx_code: try_status_code("five_xx_code", five_xx_code, 500..=599)?,
            four_xx_code: try_status_code("four_xx_code", four_xx_code, 400..=499)?,
        })
    }

    /// Construct a policy from already validated parts.
    pub(crate) const fn new_unchecked(
        failure_percentage: u8,
        five_xx_percentage: u8,
        five_xx_code: u16,
        four_xx_code: u16,
    ) -> Self {
        Self {
            failure_percentage,
            five_xx_percentage,
            five_xx_code,
            four_xx_code,
        }
    }

    pub fn failure_percentage(&self) -> u8 {
        self.failure_percentage
    }

    pub fn five_xx_percentage(&self) -> u8 {
        self.five_xx_percentage
    }

    pub fn five_xx_code(&self) -> u16 {
        self.five_xx_code
    }

    pub fn four_xx_code(&self) -> u16 {
        self.four_xx_code
    }

    /// Whether a server error chosen by this policy takes the fault path.
    pub fn faults_on_server_error(&self) -> bool {
        self.five_xx_code == FAULT_STATUS_CODE
    }
}

fn try_percentage(field: &'static str, value: i64) -> Result<u8, FailurePolicyError> {
    if (0..=100).contains(&value) {
        Ok(value as u8)
    } else {
        Err(FailurePolicyError::PercentageOutOfRange { field, value })
    }
}

fn try_status_code(
    field: &'static str,
    value: i64,
    class: std::ops::RangeInclusive<i64>,
) -> Result<u16, FailurePolicyError> {
    if class.contains(&value) {
        Ok(value as u16)
    } else {
        Err(FailurePolicyError::StatusCodeOutOfClass {
            field,
            value,
            class_start: *class.start(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePolicyError {
    PercentageOutOfRange {
        field: &'static str,
        value: i64,
    },
    StatusCodeOutOfClass {
        field: &'static str,
        value: i64,
        class_start: i64,
    },
}

impl fmt::Display for FailurePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PercentageOutOfRange { field, value } => write!(
                f,
                "FailurePolicyError: {field} must be within [0, 100], got {value}"
            ),
            Self::StatusCodeOutOfClass {
                field,
                value,
                class_start,
            } => write!(
                f,
                "FailurePolicyError: {field} must be a {}xx status code, got {value}",
                class_start / 100
            ),
        }
    }
}

impl std::error::Error for FailurePolicyError {}

/// Per-request decision of the outcome selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ClientError { code: u16 },
    ServerError { code: u16, fault_path: bool },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::ClientError { code } => write!(f, "client error {code}"),
            Self::ServerError {
                code,
                fault_path: true,
            } => write!(f, "server error {code} (fault)"),
            Self::ServerError {
                code,
                fault_path: false,
            } => write!(f, "server error {code}"),
        }
    }
}

/// Decide the outcome of one request.
///
/// Two independent draws in `[0, 100)`: first failure or not,
/// then (only on failure) server or client error.
pub fn decide(policy: &FailurePolicy, random: &impl RandomSource) -> Outcome {
    if random.random_range(0..100) >= u64::from(policy.failure_percentage) {
        return Outcome::Success;
    }

    if random.random_range(0..100) < u64::from(policy.five_xx_percentage) {
        Outcome::ServerError {
            code: policy.five_xx_code,
            fault_path: policy.faults_on_server_error(),
        }
    } else {
        Outcome::ClientError {
            code: policy.four_xx_code,
        }
    }
}

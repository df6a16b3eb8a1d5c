//! Human-readable requisition numbers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use reqtrack_core::{DomainError, ValueObject};

/// Sequential requisition number, rendered as `REQ-NNNNN`.
///
/// Assigned once at creation from a strictly increasing sequence and
/// immutable afterwards. The width grows past five digits rather than
/// wrapping.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequirementNumber(u64);

impl RequirementNumber {
    pub fn new(seq: u64) -> Result<Self, DomainError> {
        if seq == 0 {
            return Err(DomainError::validation("requirement numbers start at 1"));
        }
        Ok(Self(seq))
    }

    pub fn seq(&self) -> u64 {
        self.0
    }
}

impl ValueObject for RequirementNumber {}

impl core::fmt::Display for RequirementNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "REQ-{:05}", self.0)
    }
}

impl FromStr for RequirementNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("REQ-")
            .ok_or_else(|| DomainError::invalid_id(format!("RequirementNumber: '{s}'")))?;
        let seq: u64 = digits
            .parse()
            .map_err(|_| DomainError::invalid_id(format!("RequirementNumber: '{s}'")))?;
        Self::new(seq)
    }
}

impl From<RequirementNumber> for String {
    fn from(value: RequirementNumber) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for RequirementNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

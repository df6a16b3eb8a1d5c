//! Requisition number issuance.

use std::sync::atomic::{AtomicU64, Ordering};

use reqtrack_core::DomainError;
use reqtrack_requisitions::RequirementNumber;

/// Strictly increasing `REQ-NNNNN` sequence.
///
/// Numbers are issued once at creation and never reused; a number issued for
/// a command that later fails validation leaves a gap, which is acceptable
/// (gaps are not ambiguity). Process-wide; a deployment with a durable store
/// seeds this from the highest committed number at startup.
#[derive(Debug)]
pub struct RequirementNumberSequence {
    next: AtomicU64,
}

impl RequirementNumberSequence {
    pub fn new() -> Self {
        Self::seeded(0)
    }

    /// Start issuing after `highest_issued`.
    pub fn seeded(highest_issued: u64) -> Self {
        Self {
            next: AtomicU64::new(highest_issued + 1),
        }
    }

    pub fn issue(&self) -> Result<RequirementNumber, DomainError> {
        let seq = self.next.fetch_add(1, Ordering::SeqCst);
        RequirementNumber::new(seq)
    }
}

impl Default for RequirementNumberSequence {
    fn default() -> Self {
        Self::new()
    }
}

//! Safety classification tiers for moderated content.

use serde::{Deserialize, Serialize};

/// Safety tier assigned to a piece of content.
///
/// Ordered by severity: `Safe < PotentiallyUnsafe < Unsafe`. The order is
/// used for display message selection only, not for numeric scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyStatus {
    /// No dangerous content detected.
    Safe,
    /// Questionable elements that need a human look.
    PotentiallyUnsafe,
    /// Clearly dangerous content.
    Unsafe,
}

impl SafetyStatus {
    /// Returns all tiers in severity order.
    pub fn all() -> &'static [SafetyStatus] {
        &[
            SafetyStatus::Safe,
            SafetyStatus::PotentiallyUnsafe,
            SafetyStatus::Unsafe,
        ]
    }

    /// Database/wire string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyStatus::Safe => "safe",
            SafetyStatus::PotentiallyUnsafe => "potentially_unsafe",
            SafetyStatus::Unsafe => "unsafe",
        }
    }

    /// Parse from the wire string. Returns `None` for anything outside the
    /// three valid tiers; callers own the fallback policy.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "safe" => Some(SafetyStatus::Safe),
            "potentially_unsafe" => Some(SafetyStatus::PotentiallyUnsafe),
            "unsafe" => Some(SafetyStatus::Unsafe),
            _ => None,
        }
    }

    /// User-facing message shown to the uploader for this tier.
    pub fn display_message(&self) -> &'static str {
        match self {
            SafetyStatus::Safe => "Your content passed the safety check :)",
            SafetyStatus::PotentiallyUnsafe => {
                "Your content may contain unsafe material :O"
            }
            SafetyStatus::Unsafe => "Your content contains unsafe material :(",
        }
    }
}

impl std::fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

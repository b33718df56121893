use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Entitlement tier of an account.
///
/// Variants are declared in ascending order, so `Ord` ranks tiers:
/// a grant never moves an account to a lower tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum BasePlan {
    #[default]
    Free,
    Basic,
}

impl BasePlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
        }
    }
}

impl fmt::Display for BasePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown base plan: {0}")]
pub struct UnknownPlan(pub String);

impl FromStr for BasePlan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            other => Err(UnknownPlan(other.to_string())),
        }
    }
}

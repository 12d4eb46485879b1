//! Subscription tiers and what each one unlocks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use template_catalog::{TemplateCatalog, Tier};

/// The caller's subscription tier, as assigned by the account layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserTier {
    #[default]
    Free,
    Pro,
    Premium,
    Platinum,
}

impl UserTier {
    /// Maximum number of source files per batch.
    pub fn file_limit(self) -> u32 {
        match self {
            Self::Free => 5,
            Self::Pro => 20,
            Self::Premium | Self::Platinum => 50,
        }
    }

    /// Highest catalog tier this subscription can render.
    pub fn catalog_tier(self) -> Tier {
        match self {
            Self::Free => Tier::Free,
            Self::Pro | Self::Premium | Self::Platinum => Tier::Pro,
        }
    }

    /// The part of `catalog` this subscription may pick from.
    pub fn catalog(self, catalog: &TemplateCatalog) -> TemplateCatalog {
        catalog.restricted_to(self.catalog_tier())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Premium => "premium",
            Self::Platinum => "platinum",
        }
    }
}

impl fmt::Display for UserTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "premium" => Ok(Self::Premium),
            "platinum" => Ok(Self::Platinum),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

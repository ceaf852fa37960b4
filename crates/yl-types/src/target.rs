use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A logical fetch target: every pool a provider knows for one protocol on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IngestTarget {
    pub protocol: String,
    pub chain: String,
}

impl IngestTarget {
    pub fn new(protocol: impl Into<String>, chain: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            chain: chain.into(),
        }
    }

    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IngestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.chain)
    }
}

impl FromStr for IngestTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (protocol, chain) = s.trim().split_once(':').ok_or_else(|| {
            ConfigError::invalid("target", format!("expected protocol:chain, got '{s}'"))
        })?;
        if protocol.is_empty() || chain.is_empty() || chain.contains(':') {
            return Err(ConfigError::invalid(
                "target",
                format!("expected protocol:chain, got '{s}'"),
            ));
        }
        Ok(Self::new(protocol, chain))
    }
}

/// Targets addressed by a manual (admin) ingestion trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    All,
    One(IngestTarget),
}

impl FromStr for TargetSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::One)
        }
    }
}

/// Parses a comma separated target list such as `aave-v3:ethereum,morpho-blue:base`.
pub fn parse_target_list(raw: &str) -> Result<Vec<IngestTarget>, ConfigError> {
    let mut targets: Vec<IngestTarget> = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()?;
    targets.sort();
    targets.dedup();
    if targets.is_empty() {
        return Err(ConfigError::invalid("POOL_TARGETS", "no targets configured"));
    }
    Ok(targets)
}

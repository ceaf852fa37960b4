use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Closed set of data providers selectable at startup.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
    Hash,
    Eq,
    PartialEq,
    Display,
    AsRefStr,
    EnumString,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Mock,
    Dune,
    TheGraph,
}

impl ProviderKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Dune => "dune",
            Self::TheGraph => "thegraph",
        }
    }
}

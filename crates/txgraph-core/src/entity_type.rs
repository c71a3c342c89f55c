use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Classification of a graph node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    OtcDesk,
    Institutional,
    Exchange,
    MarketMaker,
    Cex,
    #[default]
    Unknown,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid EntityType value: {0}")]
pub struct EntityTypeParseError(pub String);

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::OtcDesk,
        EntityType::Institutional,
        EntityType::Exchange,
        EntityType::MarketMaker,
        EntityType::Cex,
        EntityType::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::OtcDesk => "otc_desk",
            EntityType::Institutional => "institutional",
            EntityType::Exchange => "exchange",
            EntityType::MarketMaker => "market_maker",
            EntityType::Cex => "cex",
            EntityType::Unknown => "unknown",
        }
    }

    /// Human readable label for legends and tooltips.
    pub fn label(self) -> &'static str {
        match self {
            EntityType::OtcDesk => "OTC Desk",
            EntityType::Institutional => "Institutional",
            EntityType::Exchange => "Exchange",
            EntityType::MarketMaker => "Market Maker",
            EntityType::Cex => "CEX",
            EntityType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = EntityTypeParseError;

    /// Accepts snake_case, kebab-case, spaced and upper-case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "otc_desk" | "otc" => Ok(EntityType::OtcDesk),
            "institutional" | "institution" => Ok(EntityType::Institutional),
            "exchange" | "dex" => Ok(EntityType::Exchange),
            "market_maker" | "marketmaker" => Ok(EntityType::MarketMaker),
            "cex" | "centralized_exchange" => Ok(EntityType::Cex),
            "unknown" | "" => Ok(EntityType::Unknown),
            _ => Err(EntityTypeParseError(s.to_string())),
        }
    }
}

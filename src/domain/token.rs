//! Token metadata and the cached USD price.

use crate::domain::{Amount, AssetId, Decimal};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_TOKEN_NAME: &str = "unknown";
pub const UNKNOWN_TOKEN_SYMBOL: &str = "UNKNOWN";
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: AssetId,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    /// Extra precision the lending contract indexes this asset with.
    pub extra_decimals: u32,
    #[serde(rename = "lastPriceUSD")]
    pub last_price_usd: Option<Decimal>,
    pub last_price_block_number: Option<u64>,
}

impl Token {
    pub fn new(id: AssetId, name: String, symbol: String, decimals: u32) -> Self {
        Token {
            id,
            name,
            symbol,
            decimals,
            extra_decimals: 0,
            last_price_usd: None,
            last_price_block_number: None,
        }
    }

    /// Placeholder used when the metadata collaborator cannot answer.
    pub fn unknown(id: AssetId) -> Self {
        Token::new(
            id,
            UNKNOWN_TOKEN_NAME.to_string(),
            UNKNOWN_TOKEN_SYMBOL.to_string(),
            DEFAULT_TOKEN_DECIMALS,
        )
    }

    /// Digits of precision of the raw amounts recorded for this asset.
    pub fn precision(&self) -> u32 {
        self.decimals + self.extra_decimals
    }

    /// Cached price, or zero when no price has been seen yet.
    pub fn price_or_zero(&self) -> Decimal {
        self.last_price_usd.unwrap_or_default()
    }

    /// USD value of a raw amount at the cached price.
    pub fn to_usd(&self, amount: Amount) -> Decimal {
        amount
            .to_decimal_units(self.precision())
            .saturating_mul(self.price_or_zero())
    }
}

//! Price and token-metadata collaborators.
//!
//! Both are synchronous: the engine blocks on them while an event is in
//! flight. [`StaticOracle`] answers from tables loaded out of CSV files.

use super::SourceError;
use crate::domain::{Amount, AssetId};
use std::collections::HashMap;
use std::path::Path;

/// Raw oracle answer: one whole token is worth `price / 10^decimals` USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub price: Amount,
    pub decimals: u32,
    /// The oracle call failed; `price` is meaningless.
    pub reverted: bool,
}

impl PriceQuote {
    pub fn reverted() -> Self {
        PriceQuote {
            price: Amount::zero(),
            decimals: 0,
            reverted: true,
        }
    }
}

pub trait PriceSource: Send + Sync {
    fn usd_price(&self, asset: &AssetId) -> PriceQuote;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

pub trait TokenMetadataSource: Send + Sync {
    /// `None` when the asset is unknown to the source.
    fn metadata(&self, asset: &AssetId) -> Option<TokenMetadata>;
}

/// Fixed price and metadata tables.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    prices: HashMap<String, (Amount, u32)>,
    tokens: HashMap<String, TokenMetadata>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, asset: &str, price: Amount, decimals: u32) -> Self {
        self.prices.insert(asset.to_string(), (price, decimals));
        self
    }

    pub fn with_token(mut self, asset: &str, name: &str, symbol: &str, decimals: u32) -> Self {
        self.tokens.insert(
            asset.to_string(),
            TokenMetadata {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
            },
        );
        self
    }

    /// Load `asset,price,decimals` rows.
    pub fn load_prices(mut self, path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path)?;
        for (asset, price, decimals) in parse_prices_csv(&bytes)? {
            self.prices.insert(asset, (price, decimals));
        }
        Ok(self)
    }

    /// Load `asset,name,symbol,decimals` rows.
    pub fn load_tokens(mut self, path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path)?;
        for (asset, meta) in parse_tokens_csv(&bytes)? {
            self.tokens.insert(asset, meta);
        }
        Ok(self)
    }
}

impl PriceSource for StaticOracle {
    fn usd_price(&self, asset: &AssetId) -> PriceQuote {
        match self.prices.get(asset.as_str()) {
            Some((price, decimals)) => PriceQuote {
                price: *price,
                decimals: *decimals,
                reverted: false,
            },
            None => PriceQuote::reverted(),
        }
    }
}

impl TokenMetadataSource for StaticOracle {
    fn metadata(&self, asset: &AssetId) -> Option<TokenMetadata> {
        self.tokens.get(asset.as_str()).cloned()
    }
}

fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes)
}

pub fn parse_prices_csv(bytes: &[u8]) -> Result<Vec<(String, Amount, u32)>, SourceError> {
    #[derive(Debug, serde::Deserialize)]
    struct Row {
        asset: String,
        price: String,
        decimals: u32,
    }

    let mut rows = Vec::new();
    for record in csv_reader(bytes).deserialize::<Row>() {
        let row = record.map_err(|e| SourceError::Csv(e.to_string()))?;
        let price = Amount::from_dec_str(&row.price)
            .map_err(|e| SourceError::Csv(format!("invalid price for {}: {}", row.asset, e)))?;
        rows.push((row.asset, price, row.decimals));
    }
    Ok(rows)
}

pub fn parse_tokens_csv(bytes: &[u8]) -> Result<Vec<(String, TokenMetadata)>, SourceError> {
    #[derive(Debug, serde::Deserialize)]
    struct Row {
        asset: String,
        name: String,
        symbol: String,
        decimals: u32,
    }

    let mut rows = Vec::new();
    for record in csv_reader(bytes).deserialize::<Row>() {
        let row = record.map_err(|e| SourceError::Csv(e.to_string()))?;
        rows.push((
            row.asset,
            TokenMetadata {
                name: row.name,
                symbol: row.symbol,
                decimals: row.decimals,
            },
        ));
    }
    Ok(rows)
}

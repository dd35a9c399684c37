use crate::domain::{AssetId, Decimal, PositionSide, SnapshotPeriod};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RateType {
    Variable,
}

impl RateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::Variable => "VARIABLE",
        }
    }
}

/// Annualized rate, in percent, for one side of a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRate {
    pub id: String,
    pub market: AssetId,
    pub side: PositionSide,
    #[serde(rename = "type")]
    pub rate_type: RateType,
    pub rate: Decimal,
}

impl InterestRate {
    /// `{SIDE}-VARIABLE-{market}`.
    pub fn current_id(side: PositionSide, market: &AssetId) -> String {
        format!("{}-{}-{}", side, RateType::Variable.as_str(), market)
    }

    pub fn current(side: PositionSide, market: &AssetId, rate: Decimal) -> Self {
        InterestRate {
            id: InterestRate::current_id(side, market),
            market: market.clone(),
            side,
            rate_type: RateType::Variable,
            rate,
        }
    }

    /// Frozen copy of this rate for a snapshot bucket: `{id}-{period}-{bucket}`.
    pub fn for_bucket(&self, period: SnapshotPeriod, bucket: i64) -> Self {
        InterestRate {
            id: format!("{}-{}-{}", self.id, period.as_str(), bucket),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_ids() {
        let m = AssetId::new("usdc");
        let r = InterestRate::current(PositionSide::Borrower, &m, Decimal::from(5i64));
        assert_eq!(r.id, "BORROWER-VARIABLE-usdc");
        assert_eq!(
            r.for_bucket(SnapshotPeriod::Daily, 19000).id,
            "BORROWER-VARIABLE-usdc-daily-19000"
        );
        assert_eq!(
            InterestRate::current_id(PositionSide::Lender, &m),
            "LENDER-VARIABLE-usdc"
        );
    }
}

use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Balance of a single asset within an [`Account`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct AssetBalance {
    pub asset: SmolStr,
    pub free: Decimal,
    pub locked: Decimal,
}

impl AssetBalance {
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

/// Account-wide balance and margin snapshot, streamed from the venue.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Account {
    pub balances: Vec<AssetBalance>,
    pub margin_used: Decimal,
    pub margin_level: Option<Decimal>,
}

impl Account {
    pub fn equity(&self) -> Decimal {
        self.balances.iter().map(AssetBalance::total).sum()
    }

    pub fn balance(&self, asset: &str) -> Option<&AssetBalance> {
        self.balances.iter().find(|b| b.asset == asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn equity_sums_every_asset_balance() {
        let account = Account::new(
            vec![
                AssetBalance::new("USDT".into(), dec!(100), dec!(10)),
                AssetBalance::new("BTC".into(), dec!(1), dec!(0)),
            ],
            dec!(0),
            None,
        );
        assert_eq!(account.equity(), dec!(111));
    }
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::normalize::last_day_of_preceding_month;

/// Source categories of the input workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionKind {
    Dividend,
    Buy,
    Sale,
    AssetEvent,
    CashEvent,
}

impl TransactionKind {
    /// Date whose reference rate converts a transaction of this kind.
    ///
    /// Dividends and ESPP/RSU buys and sales use the last day of the month
    /// before the transaction; ledger events use their own date.
    pub fn reference_date(&self, transaction_date: NaiveDate) -> NaiveDate {
        match self {
            TransactionKind::Dividend | TransactionKind::Buy | TransactionKind::Sale => {
                last_day_of_preceding_month(transaction_date)
            }
            TransactionKind::AssetEvent | TransactionKind::CashEvent => transaction_date,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Dividend => "DIVIDEND",
            TransactionKind::Buy => "BUY",
            TransactionKind::Sale => "SALE",
            TransactionKind::AssetEvent => "ASSET_EVENT",
            TransactionKind::CashEvent => "CASH_EVENT",
        }
    }
}

/// Equity compensation programs tracked separately for FIFO and Schedule FA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Instrument {
    Espp,
    Rsu,
}

impl Instrument {
    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::Espp => "ESPP",
            Instrument::Rsu => "RSU",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dividend {
    pub date: NaiveDate,
    pub amount_usd: Decimal,
    pub tax_usd: Decimal,
}

/// ESPP purchase, RSU vest, or a sale of either
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquityTrade {
    pub date: NaiveDate,
    pub price_per_share_usd: Decimal,
    pub shares: Decimal,
}

impl EquityTrade {
    pub fn total_usd(&self) -> Decimal {
        self.price_per_share_usd * self.shares
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AssetEventKind {
    Opening,
    Closing,
    ShareAddition,
    Cash,
    Other(String),
}

impl AssetEventKind {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "opening" => AssetEventKind::Opening,
            "closing" => AssetEventKind::Closing,
            "share" => AssetEventKind::ShareAddition,
            "cash" => AssetEventKind::Cash,
            _ => AssetEventKind::Other(label.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            AssetEventKind::Opening => "Opening",
            AssetEventKind::Closing => "Closing",
            AssetEventKind::ShareAddition => "Share",
            AssetEventKind::Cash => "Cash",
            AssetEventKind::Other(label) => label,
        }
    }
}

/// Row of an ESPP/RSU asset ledger used for Schedule FA
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetEvent {
    pub date: NaiveDate,
    pub kind: AssetEventKind,
    pub shares: Decimal,
    pub cash_usd: Decimal,
    pub market_value_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CashEventKind {
    Opening,
    Closing,
    Cash,
    Other(String),
}

impl CashEventKind {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "opening" => CashEventKind::Opening,
            "closing" => CashEventKind::Closing,
            "cash" => CashEventKind::Cash,
            _ => CashEventKind::Other(label.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CashEventKind::Opening => "Opening",
            CashEventKind::Closing => "Closing",
            CashEventKind::Cash => "Cash",
            CashEventKind::Other(label) => label,
        }
    }
}

/// Row of the combined ESPP + RSU cash ledger.
///
/// Opening and closing rows carry balances; cash rows carry deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashEvent {
    pub date: NaiveDate,
    pub kind: CashEventKind,
    pub espp_usd: Decimal,
    pub rsu_usd: Decimal,
}

impl CashEvent {
    pub fn combined_usd(&self) -> Decimal {
        self.espp_usd + self.rsu_usd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reference_date_policy() {
        let d = date(2023, 5, 17);
        assert_eq!(TransactionKind::Dividend.reference_date(d), date(2023, 4, 30));
        assert_eq!(TransactionKind::Buy.reference_date(d), date(2023, 4, 30));
        assert_eq!(TransactionKind::Sale.reference_date(d), date(2023, 4, 30));
        assert_eq!(TransactionKind::AssetEvent.reference_date(d), d);
        assert_eq!(TransactionKind::CashEvent.reference_date(d), d);
    }

    #[test]
    fn test_asset_kind_labels() {
        assert_eq!(AssetEventKind::from_label(" Opening "), AssetEventKind::Opening);
        assert_eq!(AssetEventKind::from_label("SHARE"), AssetEventKind::ShareAddition);
        assert_eq!(
            AssetEventKind::from_label("Dividend reinvest"),
            AssetEventKind::Other("Dividend reinvest".to_string())
        );
        assert_eq!(CashEventKind::from_label("closing"), CashEventKind::Closing);
    }

    #[test]
    fn test_trade_and_cash_totals() {
        let trade = EquityTrade {
            date: date(2023, 5, 17),
            price_per_share_usd: dec!(72.35),
            shares: dec!(12.5),
        };
        assert_eq!(trade.total_usd(), dec!(904.375));

        let cash = CashEvent {
            date: date(2023, 5, 17),
            kind: CashEventKind::Cash,
            espp_usd: dec!(10.25),
            rsu_usd: dec!(-3),
        };
        assert_eq!(cash.combined_usd(), dec!(7.25));
    }
}

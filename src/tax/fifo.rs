use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::valuation::ValuedTrade;

/// Average days per month used to express holding periods in months
pub const DAYS_PER_MONTH: Decimal = Decimal::from_parts(3044, 0, 0, false, 2);

/// Holding period (in months) from which a gain is long term
pub const LTCG_THRESHOLD_MONTHS: Decimal = Decimal::from_parts(24, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GainType {
    Ltcg,
    Stcg,
}

impl GainType {
    pub fn from_holding_months(months: Decimal) -> Self {
        if months >= LTCG_THRESHOLD_MONTHS {
            GainType::Ltcg
        } else {
            GainType::Stcg
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GainType::Ltcg => "LTCG",
            GainType::Stcg => "STCG",
        }
    }
}

/// An ESPP purchase or RSU vest with the shares still available to sell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseLot {
    pub purchase_date: NaiveDate,
    pub price_per_share_inr: Decimal,
    pub shares_original: Decimal,
    pub shares_remaining: Decimal,
}

impl PurchaseLot {
    pub fn new(purchase_date: NaiveDate, price_per_share_inr: Decimal, shares: Decimal) -> Self {
        Self {
            purchase_date,
            price_per_share_inr,
            shares_original: shares,
            shares_remaining: shares,
        }
    }
}

impl From<&ValuedTrade> for PurchaseLot {
    fn from(v: &ValuedTrade) -> Self {
        PurchaseLot::new(v.trade.date, v.price_per_share_inr, v.trade.shares)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleEvent {
    pub sale_date: NaiveDate,
    pub shares: Decimal,
    pub price_per_share_inr: Decimal,
}

impl From<&ValuedTrade> for SaleEvent {
    fn from(v: &ValuedTrade) -> Self {
        SaleEvent {
            sale_date: v.trade.date,
            shares: v.trade.shares,
            price_per_share_inr: v.price_per_share_inr,
        }
    }
}

/// Shares of one sale allocated against one lot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedGain {
    pub sale_date: NaiveDate,
    pub purchase_date: NaiveDate,
    pub holding_days: i64,
    pub holding_months: Decimal,
    pub gain_type: GainType,
    pub shares_matched: Decimal,
    pub purchase_price_per_share_inr: Decimal,
    pub sale_price_per_share_inr: Decimal,
    pub purchase_cost_inr: Decimal,
    pub sale_proceeds_inr: Decimal,
    pub gain_inr: Decimal,
}

impl MatchedGain {
    fn new(sale: &SaleEvent, lot: &PurchaseLot, shares_matched: Decimal) -> Self {
        let holding_days = (sale.sale_date - lot.purchase_date).num_days();
        let holding_months = Decimal::from(holding_days) / DAYS_PER_MONTH;
        let purchase_cost_inr = shares_matched * lot.price_per_share_inr;
        let sale_proceeds_inr = shares_matched * sale.price_per_share_inr;

        Self {
            sale_date: sale.sale_date,
            purchase_date: lot.purchase_date,
            holding_days,
            holding_months,
            gain_type: GainType::from_holding_months(holding_months),
            shares_matched,
            purchase_price_per_share_inr: lot.price_per_share_inr,
            sale_price_per_share_inr: sale.price_per_share_inr,
            purchase_cost_inr,
            sale_proceeds_inr,
            gain_inr: sale_proceeds_inr - purchase_cost_inr,
        }
    }

    pub fn ltcg_inr(&self) -> Decimal {
        match self.gain_type {
            GainType::Ltcg => self.gain_inr,
            GainType::Stcg => Decimal::ZERO,
        }
    }

    pub fn stcg_inr(&self) -> Decimal {
        match self.gain_type {
            GainType::Stcg => self.gain_inr,
            GainType::Ltcg => Decimal::ZERO,
        }
    }
}

/// Part of a sale left over once every lot is exhausted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedSale {
    pub sale_date: NaiveDate,
    pub shares: Decimal,
}

/// Matches produced for a single sale
#[derive(Debug, Clone, Default)]
pub struct SaleMatch {
    pub matches: Vec<MatchedGain>,
    pub unmatched_shares: Decimal,
}

/// FIFO matcher over an ordered arena of purchase lots.
///
/// Lots are consumed in the order they were supplied; sales must be fed in
/// their input order because each one sees the lots depleted by the previous.
#[derive(Debug, Clone, Default)]
pub struct FifoMatcher {
    lots: Vec<PurchaseLot>,
}

impl FifoMatcher {
    pub fn new(lots: Vec<PurchaseLot>) -> Self {
        Self { lots }
    }

    /// Append a lot after the existing ones
    pub fn add_purchase(&mut self, lot: PurchaseLot) {
        self.lots.push(lot);
    }

    pub fn match_sale(&mut self, sale: &SaleEvent) -> SaleMatch {
        let mut outstanding = sale.shares;
        let mut matches = Vec::new();

        for lot in self.lots.iter_mut() {
            if outstanding <= Decimal::ZERO {
                break;
            }
            if lot.shares_remaining <= Decimal::ZERO {
                continue;
            }

            let shares_matched = outstanding.min(lot.shares_remaining);
            matches.push(MatchedGain::new(sale, lot, shares_matched));

            lot.shares_remaining -= shares_matched;
            outstanding -= shares_matched;
        }

        SaleMatch {
            matches,
            unmatched_shares: outstanding.max(Decimal::ZERO),
        }
    }

    pub fn lots(&self) -> &[PurchaseLot] {
        &self.lots
    }

    pub fn remaining_shares(&self) -> Decimal {
        self.lots.iter().map(|l| l.shares_remaining).sum()
    }

    pub fn into_lots(self) -> Vec<PurchaseLot> {
        self.lots
    }
}

/// Result of matching a whole instrument class
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub lots: Vec<PurchaseLot>,
    pub matches: Vec<MatchedGain>,
    pub unmatched: Vec<UnmatchedSale>,
}

impl MatchOutcome {
    pub fn shares_matched(&self) -> Decimal {
        self.matches.iter().map(|m| m.shares_matched).sum()
    }

    pub fn shares_unmatched(&self) -> Decimal {
        self.unmatched.iter().map(|u| u.shares).sum()
    }
}

/// Fold `sales` over `lots` in order, returning the depleted lots and every match
pub fn match_sales(lots: Vec<PurchaseLot>, sales: &[SaleEvent]) -> MatchOutcome {
    let (matcher, matches, unmatched) = sales.iter().fold(
        (FifoMatcher::new(lots), Vec::new(), Vec::new()),
        |(mut matcher, mut matches, mut unmatched), sale| {
            let result = matcher.match_sale(sale);
            matches.extend(result.matches);
            if result.unmatched_shares > Decimal::ZERO {
                unmatched.push(UnmatchedSale {
                    sale_date: sale.sale_date,
                    shares: result.unmatched_shares,
                });
            }
            (matcher, matches, unmatched)
        },
    );

    MatchOutcome {
        lots: matcher.into_lots(),
        matches,
        unmatched,
    }
}

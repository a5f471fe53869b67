// Tax module - FIFO cost basis and Indian capital gains classification

pub mod capital_gains;
pub mod fifo;

pub use capital_gains::{CapitalGainsReport, GainsSummary};
pub use fifo::{match_sales, FifoMatcher, GainType, MatchOutcome, MatchedGain, PurchaseLot, SaleEvent};

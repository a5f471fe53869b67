//! itr-calc - Indian ITR values for foreign ESPP/RSU holdings
//!
//! This library converts dividends, purchases, vests and sales to INR at SBI
//! TT buying rates, matches sales to lots FIFO for capital gains, and derives
//! the Schedule FA opening, closing and peak values.

pub mod calculator;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod importers;
pub mod models;
pub mod normalize;
pub mod portfolio;
pub mod pricing;
pub mod rates;
pub mod reports;
pub mod tax;
pub mod utils;
pub mod valuation;

use rust_decimal::Decimal;
use serde::Serialize;

use super::fifo::MatchedGain;

/// Gain totals for a set of matched sales
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GainsSummary {
    pub total_gain: Decimal,
    pub ltcg: Decimal,
    pub stcg: Decimal,
}

impl GainsSummary {
    pub fn from_matches(matches: &[MatchedGain]) -> Self {
        matches.iter().fold(Self::default(), |acc, m| Self {
            total_gain: acc.total_gain + m.gain_inr,
            ltcg: acc.ltcg + m.ltcg_inr(),
            stcg: acc.stcg + m.stcg_inr(),
        })
    }

    pub fn combine(&self, other: &GainsSummary) -> GainsSummary {
        GainsSummary {
            total_gain: self.total_gain + other.total_gain,
            ltcg: self.ltcg + other.ltcg,
            stcg: self.stcg + other.stcg,
        }
    }
}

/// Capital gains per instrument class and combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapitalGainsReport {
    pub espp: Option<GainsSummary>,
    pub rsu: Option<GainsSummary>,
    pub combined: GainsSummary,
}

impl CapitalGainsReport {
    /// Classes without any match are reported as `None`
    pub fn new(espp_matches: &[MatchedGain], rsu_matches: &[MatchedGain]) -> Self {
        let espp = (!espp_matches.is_empty()).then(|| GainsSummary::from_matches(espp_matches));
        let rsu = (!rsu_matches.is_empty()).then(|| GainsSummary::from_matches(rsu_matches));
        let combined = espp
            .unwrap_or_default()
            .combine(&rsu.unwrap_or_default());

        Self {
            espp,
            rsu,
            combined,
        }
    }

    pub fn has_gains(&self) -> bool {
        self.espp.is_some() || self.rsu.is_some()
    }
}

// Portfolio module - Schedule FA opening/closing/peak values

pub mod cash;
pub mod schedule_fa;
pub mod timeline;

pub use cash::CashSummary;
pub use schedule_fa::ScheduleFaSummary;
pub use timeline::{
    cash_snapshots, find_share_peak, peak_snapshot, CashSnapshot, PeakSkipReason, PeakValue,
    SharePeak, ShareStep, ShareTimeline, TimelineEntry,
};

//! Read-only summaries of the household's transactions.

mod monthly;
mod split;
mod trend;

pub use monthly::{CategoryTotal, MonthlyReport, get_monthly_report, get_monthly_report_endpoint};
pub use split::{DateRangeQuery, SplitReport, UserSplit, get_split_report, get_split_report_endpoint};
pub use trend::{Grouping, TrendPoint, TrendReport, get_trend_report, get_trend_report_endpoint};

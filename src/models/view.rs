//! Page view models

use super::chart::ChartSeries;

/// Everything a channel page displays, derived from one `RequestState`
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub ticker: Option<String>,
    pub submit_label: &'static str,
    pub submit_enabled: bool,
    pub error_banner: Option<String>,
    pub readout: Option<String>,
    pub last_close: Option<String>,
    pub change_pct: Option<String>,
    pub history_len: usize,
    pub series: Option<ChartSeries>,
}

use crate::error::{HistoryError, Result};
use crate::model::PlayEvent;
use crate::stats::Metric;
use crate::table::HistoryTable;
use serde::Serialize;

pub const SMARTPHONE_KEYWORDS: [&str; 4] = ["android", "ios", "iphone", "galaxy"];
pub const PC_KEYWORDS: [&str; 4] = ["windows", "linux", "mac", "macintosh"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Smartphone,
    Pc,
    /// Platform string hits keywords from both sets.
    Ambiguous,
    Other,
}

pub fn classify_platform(platform: &str) -> DeviceClass {
    let platform = platform.to_lowercase();
    let phone = SMARTPHONE_KEYWORDS
        .iter()
        .any(|keyword| platform.contains(keyword));
    let pc = PC_KEYWORDS.iter().any(|keyword| platform.contains(keyword));
    match (phone, pc) {
        (true, false) => DeviceClass::Smartphone,
        (false, true) => DeviceClass::Pc,
        (true, true) => DeviceClass::Ambiguous,
        (false, false) => DeviceClass::Other,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceShare {
    pub metric: Metric,
    pub smartphone_percent: f64,
    pub pc_percent: f64,
    /// Plays left out of the percentages (ambiguous or unknown platforms).
    pub unclassified_plays: u64,
}

/// Smartphone vs PC split of `table`, by play count or listening time. Only
/// plays that fall cleanly into one class count toward the percentages.
pub fn device_share(table: &HistoryTable, metric: Metric) -> Result<DeviceShare> {
    let mut smartphone = 0_u64;
    let mut pc = 0_u64;
    let mut unclassified_plays = 0_u64;

    for event in table {
        let weight = weight(event, metric);
        match classify_platform(&event.platform) {
            DeviceClass::Smartphone => smartphone = smartphone.saturating_add(weight),
            DeviceClass::Pc => pc = pc.saturating_add(weight),
            DeviceClass::Ambiguous | DeviceClass::Other => {
                unclassified_plays = unclassified_plays.saturating_add(1)
            }
        }
    }

    let total = smartphone.saturating_add(pc);
    if total == 0 {
        return Err(HistoryError::DivisionByZero);
    }
    if unclassified_plays > 0 {
        tracing::debug!(unclassified_plays, "plays left out of device share");
    }

    Ok(DeviceShare {
        metric,
        smartphone_percent: 100.0 * smartphone as f64 / total as f64,
        pc_percent: 100.0 * pc as f64 / total as f64,
        unclassified_plays,
    })
}

fn weight(event: &PlayEvent, metric: Metric) -> u64 {
    match metric {
        Metric::Plays => 1,
        Metric::ListenTime => event.ms_played,
    }
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use tune_history::HistoryTable;
use tune_history::config::AnalysisSettings;
use tune_history::filter::{self, DateRange, SkipThreshold};
use tune_history::stats::{self, Granularity, Metric};

fuzz_target!(|data: &[u8]| {
    let Ok(serde_json::Value::Array(records)) = serde_json::from_slice(data) else {
        return;
    };
    let Ok(table) = HistoryTable::from_records(records) else {
        return;
    };

    let (skipped, kept) = filter::partition_skips(&table, SkipThreshold::default());
    assert_eq!(skipped.len() + kept.len(), table.len());

    let _ = stats::top_groups(&table, Granularity::Track, Metric::ListenTime, 10);
    let _ = stats::summarize(&table, SkipThreshold::default());
    if let Ok(interval) = AnalysisSettings::default().bucket_interval() {
        let _ = stats::bucket_series(&table, interval, DateRange::ALL);
    }
    let _ = tune_history::devices::device_share(&table, Metric::Plays);
});

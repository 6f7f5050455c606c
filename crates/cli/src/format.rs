//! Output formatting for trial reports.

use tally_concurrency::StrategyKind;
use tally_engine::TrialReport;

/// How to print results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub fn format_report(report: &TrialReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
        OutputMode::Human => {
            let cached = report
                .counter
                .cached
                .map_or_else(|| "(absent)".to_string(), |v| v.to_string());
            let mut out = String::new();
            out.push_str(&format!("strategy:        {}\n", report.strategy));
            out.push_str(&format!("calls attempted: {}\n", report.total_calls));
            out.push_str(&format!("calls succeeded: {}\n", report.succeeded));
            out.push_str(&format!("calls failed:    {}\n", report.failed));
            out.push_str(&format!("elapsed:         {} ms\n", report.elapsed_ms));
            out.push_str(&format!("expected value:  {}\n", report.expected()));
            out.push_str(&format!("durable value:   {}\n", report.counter.durable));
            out.push_str(&format!("cached value:    {}\n", cached));
            out.push_str(&format!("optimistic conflicts: {}\n", report.metrics.conflicts));
            out.push_str(&format!("verdict:         {}", verdict(report)));
            out
        }
    }
}

pub fn format_comparison(reports: &[TrialReport], mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(reports).unwrap_or_default(),
        OutputMode::Human => {
            let mut out = format!(
                "{:<18} {:>9} {:>9} {:>9} {:>9} {:>10}  {}\n",
                "strategy", "ok", "durable", "cached", "lag", "ms", "verdict"
            );
            for r in reports {
                let cached = r.counter.cached.map_or_else(|| "-".to_string(), |v| v.to_string());
                out.push_str(&format!(
                    "{:<18} {:>9} {:>9} {:>9} {:>9} {:>10}  {}\n",
                    r.strategy.as_str(),
                    r.succeeded,
                    r.counter.durable,
                    cached,
                    r.cache_lag(),
                    r.elapsed_ms,
                    verdict(r)
                ));
            }
            out.trim_end().to_string()
        }
    }
}

pub fn format_strategies(mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => {
            let entries: Vec<_> = StrategyKind::ALL
                .iter()
                .map(|k| {
                    serde_json::json!({
                        "name": k.as_str(),
                        "prevents_lost_updates": k.prevents_lost_updates(),
                    })
                })
                .collect();
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        }
        OutputMode::Human => StrategyKind::ALL
            .iter()
            .map(|k| {
                let note = if k.prevents_lost_updates() {
                    "coherent"
                } else {
                    "can lose cache updates"
                };
                format!("{:<18} {}", k.as_str(), note)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn format_error(message: &str, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::json!({ "error": message }).to_string(),
        OutputMode::Human => format!("(error) {}", message),
    }
}

fn verdict(report: &TrialReport) -> &'static str {
    match (report.store_consistent(), report.cache_consistent()) {
        (true, true) => "consistent",
        (true, false) => "cache diverged",
        (false, _) => "store diverged",
    }
}

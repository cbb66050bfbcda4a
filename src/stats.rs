//! Run-wide statistics: atomic counters plus mutex-protected aggregate maps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use colored::Colorize;

use crate::colors::ThemeColor;

/// Outcome category recorded against the *losing* (or faulting) side, per
/// spec §3/§8 — e.g. `"black resign"`, `"white illegal move"`, `"out of time"`.
#[derive(Default)]
pub struct Statistics {
    ok: AtomicU64,
    error: AtomicU64,
    ok_total_ms: AtomicU64,
    /// "<a> versus <b>" -> fault count
    errors: Mutex<HashMap<String, u64>>,
    /// engine name -> category -> count
    results: Mutex<HashMap<String, HashMap<String, u64>>>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ok(&self, elapsed_ms: u64) {
        self.ok.fetch_add(1, Ordering::Relaxed);
        self.ok_total_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    pub fn record_fault(&self, pair_name: &str) {
        self.error.fetch_add(1, Ordering::Relaxed);
        let mut errors = self.errors.lock().unwrap();
        *errors.entry(pair_name.to_string()).or_insert(0) += 1;
    }

    pub fn record_category(&self, engine_name: &str, category: &str) {
        let mut results = self.results.lock().unwrap();
        let entry = results.entry(engine_name.to_string()).or_default();
        *entry.entry(category.to_string()).or_insert(0) += 1;
    }

    pub fn ok_count(&self) -> u64 {
        self.ok.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error.load(Ordering::Relaxed)
    }

    pub fn print_summary(&self) {
        println!("{}", "=".repeat(60).info().bold());
        println!(
            "{} {}  {} {}",
            "Completed:".text().bold(),
            self.ok_count().to_string().success(),
            "Faulted:".text().bold(),
            self.error_count().to_string().failure(),
        );

        let errors = self.errors.lock().unwrap();
        if !errors.is_empty() {
            println!("{}", "Faults by pairing:".text().bold());
            for (pair, count) in errors.iter() {
                println!("  {} {}", pair.subtext(), count.to_string().warning());
            }
        }

        let results = self.results.lock().unwrap();
        if !results.is_empty() {
            println!("{}", "Results by engine:".text().bold());
            for (engine, categories) in results.iter() {
                println!("  {}", engine.info().bold());
                for (category, count) in categories.iter() {
                    println!("    {} {}", category.subtext(), count.to_string().success());
                }
            }
        }
        println!("{}", "=".repeat(60).info().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Statistics::new();
        stats.record_ok(100);
        stats.record_ok(200);
        stats.record_fault("a versus b");
        assert_eq!(stats.ok_count(), 2);
        assert_eq!(stats.error_count(), 1);
    }

    #[test]
    fn categories_tally_per_engine() {
        let stats = Statistics::new();
        stats.record_category("engineA", "black resign");
        stats.record_category("engineA", "black resign");
        stats.record_category("engineB", "white illegal move");

        let results = stats.results.lock().unwrap();
        assert_eq!(results["engineA"]["black resign"], 2);
        assert_eq!(results["engineB"]["white illegal move"], 1);
    }
}

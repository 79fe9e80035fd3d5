use serde::Serialize;
use std::collections::BTreeMap;

/// Counters collected by a simulation while it evaluates variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationStats {
    /// Formula executions per variable. A memoized variable stays at one per period.
    pub formula_calls: BTreeMap<String, usize>,
    /// Requests answered from the ledger.
    pub cache_hits: usize,
    /// Requests answered from a bound input column.
    pub input_reads: usize,
    /// Requests answered with the default value (no formula applies, or neutralized).
    pub default_fills: usize,
    /// Ledger entries dropped after an input changed.
    pub invalidations: usize,
}

impl EvaluationStats {
    pub(crate) fn record_formula_call(&mut self, variable: &str) {
        *self.formula_calls.entry(variable.to_string()).or_insert(0) += 1;
    }

    pub fn formula_calls_for(&self, variable: &str) -> usize {
        self.formula_calls.get(variable).copied().unwrap_or(0)
    }

    pub fn total_formula_calls(&self) -> usize { self.formula_calls.values().sum() }

    /// Share of requests served without running a formula.
    pub fn hit_rate(&self) -> f64 {
        let served = self.cache_hits + self.total_formula_calls() + self.input_reads + self.default_fills;
        if served == 0 { 0.0 } else { self.cache_hits as f64 / served as f64 }
    }

    pub fn summary(&self) -> String {
        let busiest = self.formula_calls.iter()
            .max_by_key(|(_, &n)| n)
            .map(|(name, n)| format!(", busiest {} ({})", name, n))
            .unwrap_or_default();
        format!(
            "{} formula runs, {} cache hits ({:.1}% hit rate), {} input reads, {} defaults, {} invalidations{}",
            self.total_formula_calls(),
            self.cache_hits,
            self.hit_rate() * 100.0,
            self.input_reads,
            self.default_fills,
            self.invalidations,
            busiest
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_hit_rate() {
        let mut stats = EvaluationStats::default();
        stats.record_formula_call("ticpe_totale");
        stats.record_formula_call("ticpe_totale");
        stats.record_formula_call("diesel_ticpe");
        stats.cache_hits = 3;
        stats.input_reads = 2;

        assert_eq!(stats.formula_calls_for("ticpe_totale"), 2);
        assert_eq!(stats.formula_calls_for("absent"), 0);
        assert!((stats.hit_rate() - 3.0 / 8.0).abs() < 1e-12);
        assert!(stats.summary().contains("busiest ticpe_totale (2)"), "{}", stats.summary());
    }
}

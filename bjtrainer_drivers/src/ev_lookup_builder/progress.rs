use std::time::Instant;

use bjtrainer::{BuildEventHandler, CanonicalKey, EvLookupEntry, EvLookupTable};
use tracing::{info, warn};

/// Logs build progress every `every` entries and summarizes the finished table.
pub struct ProgressLogger {
    every: usize,
    mismatches: usize,
    started: Option<Instant>,
}

impl ProgressLogger {
    pub fn new(every: usize) -> Self {
        ProgressLogger {
            every: every.max(1),
            mismatches: 0,
            started: None,
        }
    }

    pub fn mismatches(&self) -> usize {
        self.mismatches
    }
}

impl BuildEventHandler for ProgressLogger {
    fn on_build_begin(&mut self, total: usize) {
        self.started = Some(Instant::now());
        self.mismatches = 0;
        info!(total, "simulating canonical hands");
    }

    fn on_entry(&mut self, done: usize, total: usize, key: &CanonicalKey, entry: &EvLookupEntry) {
        if !entry.matches_strategy {
            self.mismatches += 1;
        }
        if done % self.every == 0 || done == total {
            let percent = done as f64 * 100.0 / total.max(1) as f64;
            info!(done, total, last = %key, "{:.1}% complete", percent);
        }
    }

    fn on_build_end(&mut self, table: &EvLookupTable) {
        let elapsed = self.started.map(|started| started.elapsed().as_secs_f64());
        let distribution = table.difficulty_distribution();
        let [easy, medium, hard] = distribution.percentages();
        info!(
            entries = table.len(),
            elapsed_secs = elapsed.unwrap_or_default(),
            "easy {}% / medium {}% / hard {}%",
            easy,
            medium,
            hard
        );
        if self.mismatches > 0 {
            warn!(
                mismatches = self.mismatches,
                "simulated best action disagrees with the strategy chart"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bjtrainer::{LookupTableBuilder, Rank, Rule};

    #[test]
    fn counts_chart_disagreements() {
        let keys = [
            CanonicalKey::new(Rank::Ten, Rank::Six, Rank::Ten),
            CanonicalKey::new(Rank::Eight, Rank::Eight, Rank::Six),
        ];
        let mut progress = ProgressLogger::new(1);
        let table = LookupTableBuilder::new(Rule::default())
            .with_trials(50)
            .with_seed(3)
            .build_keys(&keys, &mut progress)
            .unwrap();
        let expected = table.iter().filter(|(_, entry)| !entry.matches_strategy).count();
        assert_eq!(progress.mismatches(), expected);
        assert_eq!(table.len(), 2);
    }
}

//! Offline construction of the EV lookup table.
//!
//! Every canonical key is simulated for each legal action. Work is dealt
//! round-robin to worker threads; each (key, action) pair runs on its own
//! shoe seeded from the base seed, so the table is the same whatever the
//! thread count.

use std::sync::mpsc;

use crate::{
    lookup::{CanonicalKey, EvLookupEntry, EvLookupTable},
    shoe::InfiniteShoe,
    simulation::{EvSimulator, EvStats, SimulationError},
    strategy::BASIC_STRATEGY,
    Action, Rule, TABLE_TRIALS,
};

/// Receives progress while a table is built. All methods default to no-ops.
pub trait BuildEventHandler {
    fn on_build_begin(&mut self, _total: usize) {}
    /// `done` counts finished entries including this one.
    fn on_entry(&mut self, _done: usize, _total: usize, _key: &CanonicalKey, _entry: &EvLookupEntry) {
    }
    fn on_build_end(&mut self, _table: &EvLookupTable) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBuildEventHandler;

impl BuildEventHandler for NoopBuildEventHandler {}

/// Hit, Stand and Double always; Split only for a pair.
pub fn legal_actions(key: &CanonicalKey) -> Vec<Action> {
    let mut actions = vec![Action::Hit, Action::Stand, Action::Double];
    let (a, b) = key.player_ranks();
    if a.pair_class() == b.pair_class() {
        actions.push(Action::Split);
    }
    actions
}

/// Seed for one (key, action) simulation, stable across platforms.
pub fn entry_seed(base: u64, key: &CanonicalKey, action: Action) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let text = format!("{}:{}", key, action);
    for byte in text.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    splitmix64(base ^ hash)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

#[derive(Debug, Clone, Copy)]
pub struct LookupTableBuilder {
    rule: Rule,
    trials: u32,
    number_of_threads: usize,
    seed: u64,
}

impl LookupTableBuilder {
    pub fn new(rule: Rule) -> Self {
        LookupTableBuilder {
            rule,
            trials: TABLE_TRIALS,
            number_of_threads: 1,
            seed: 0,
        }
    }

    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials;
        self
    }

    /// 0 means one thread per available core.
    pub fn with_number_of_threads(mut self, number_of_threads: usize) -> Self {
        self.number_of_threads = if number_of_threads == 0 {
            match std::thread::available_parallelism() {
                Ok(n) => n.get(),
                Err(_) => 1,
            }
        } else {
            number_of_threads
        };
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

    pub fn number_of_threads(&self) -> usize {
        self.number_of_threads
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulates every legal action for one key and picks the best.
    pub fn build_entry(&self, key: &CanonicalKey) -> Result<EvLookupEntry, SimulationError> {
        let simulator = EvSimulator::new(self.rule, &BASIC_STRATEGY);
        let player = key.player_cards();
        let dealer_up = key.dealer_card();

        let mut results: Vec<(Action, EvStats)> = Vec::with_capacity(4);
        for action in legal_actions(key) {
            let mut shoe = InfiniteShoe::with_seed(entry_seed(self.seed, key, action));
            let stats = simulator.estimate(&player, &dealer_up, action, self.trials, &mut shoe)?;
            results.push((action, stats));
        }

        // Stable sort: ties keep the Hit, Stand, Double, Split order.
        let mut ranked = results.clone();
        ranked.sort_by(|a, b| b.1.ev.total_cmp(&a.1.ev));
        let (best_action, best) = ranked[0];
        let ev_delta = match ranked.get(1) {
            Some((_, second)) => (best.ev - second.ev).abs(),
            None => 0.0,
        };
        let strategy_action = BASIC_STRATEGY.best_action(&player, &dealer_up, true).action;

        Ok(EvLookupEntry {
            best_action,
            ev_values: results.into_iter().collect(),
            ev_delta,
            strategy_action,
            matches_strategy: best_action == strategy_action,
        })
    }

    pub fn build<H: BuildEventHandler>(&self, handler: &mut H) -> Result<EvLookupTable, SimulationError> {
        self.build_keys(&CanonicalKey::all(), handler)
    }

    pub fn build_keys<H: BuildEventHandler>(
        &self,
        keys: &[CanonicalKey],
        handler: &mut H,
    ) -> Result<EvLookupTable, SimulationError> {
        if self.trials == 0 {
            return Err(SimulationError::ZeroTrials);
        }
        let total = keys.len();
        let number_of_threads = self.number_of_threads.clamp(1, total.max(1));
        tracing::info!(
            entries = total,
            trials = self.trials,
            threads = number_of_threads,
            "building EV lookup table"
        );
        handler.on_build_begin(total);

        let mut dispatched_keys: Vec<Vec<CanonicalKey>> = vec![Vec::new(); number_of_threads];
        for (index, key) in keys.iter().enumerate() {
            dispatched_keys[index % number_of_threads].push(*key);
        }

        let (sender, receiver) = mpsc::channel();
        let mut threads = Vec::with_capacity(number_of_threads);
        for keys_for_thread in dispatched_keys {
            let sender = sender.clone();
            let builder = *self;
            let thread = std::thread::spawn(move || {
                for key in keys_for_thread {
                    let result = builder.build_entry(&key);
                    if sender.send((key, result)).is_err() {
                        break;
                    }
                }
            });
            threads.push(thread);
        }
        drop(sender);

        let mut table = EvLookupTable::default();
        let mut error = None;
        for (key, result) in receiver {
            match result {
                Ok(entry) => {
                    handler.on_entry(table.len() + 1, total, &key, &entry);
                    table.insert(key, entry);
                }
                Err(e) => {
                    error.get_or_insert(e);
                }
            }
        }
        for thread in threads {
            if thread.join().is_err() {
                error.get_or_insert(SimulationError::WorkerStopped);
            }
        }
        if let Some(e) = error {
            return Err(e);
        }

        let mismatches = table.mismatches();
        tracing::info!(
            entries = table.len(),
            mismatches = mismatches.len(),
            "EV lookup table built"
        );
        for (key, entry) in mismatches.iter().take(5) {
            tracing::info!(
                key = *key,
                simulated = %entry.best_action,
                strategy = %entry.strategy_action,
                ev_delta = entry.ev_delta,
                "simulation disagrees with basic strategy"
            );
        }
        handler.on_build_end(&table);
        Ok(table)
    }
}

//! Decision engine for a blackjack basic-strategy trainer.
//!
//! The engine answers three questions about a two-card decision point: what
//! basic strategy says to do ([`strategy`]), how hard the decision is
//! ([`difficulty`], [`generator`]) and how much a deviation costs in expected
//! value ([`simulation`], [`lookup`], [`builder`]). The shoe is infinite, so
//! every draw is independent and uniform over the 13 ranks.

pub mod builder;
pub mod card;
pub mod decision;
pub mod difficulty;
pub mod generator;
pub mod hand;
pub mod lookup;
pub mod resolution;
pub mod shoe;
pub mod simulation;
pub mod stats;
pub mod strategy;
pub mod trial;
pub mod worker;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use strum_macros::EnumIter;

pub use builder::{BuildEventHandler, LookupTableBuilder};
pub use card::{Card, CardParseError, Rank, Suit};
pub use decision::{grade, Decision};
pub use difficulty::{Classifier, Difficulty, EvDeltaClassifier, PatternClassifier};
pub use generator::{Scenario, ScenarioGenerator, TableScenarioGenerator};
pub use hand::{Hand, Totals};
pub use lookup::{CanonicalKey, EvLookupEntry, EvLookupTable, TableError};
pub use shoe::{CardSource, InfiniteShoe, StackedShoe};
pub use simulation::{EvComparison, EvSimulator, EvStats, SimulationError};
pub use stats::{JsonFileStatsStore, Stats, StatsError, StatsStore};
pub use strategy::{Advice, BasicStrategy, Category, ChartRow, Policy, StrategyChart, BASIC_STRATEGY};
pub use trial::{SpeedTrial, TrialMode};
pub use worker::{BackgroundEstimator, EvRequest};

/// House rules the engine plays under. The defaults are S17, double after
/// split allowed and a single split per hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub split_all_limits: u8,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            dealer_hit_on_soft17: false,
            allow_das: true,
            split_all_limits: 1,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    Serialize_enum_str,
    Deserialize_enum_str,
)]
pub enum Action {
    Hit,
    Stand,
    Double,
    Split,
    Surrender,
}

/// Trials used for the on-demand "what did that mistake cost" estimate.
pub const INTERACTIVE_TRIALS: u32 = 1200;
/// Trials per action used when building the lookup table.
pub const TABLE_TRIALS: u32 = 5000;

/// Basic-strategy advice for a hand against a dealer upcard.
pub fn best_action(hand: &[Card], dealer_up: &Card, allow_split: bool) -> Advice {
    BASIC_STRATEGY.best_action(hand, dealer_up, allow_split)
}

/// Pattern-based difficulty of a two-card decision.
pub fn classify(hand: &[Card], dealer_up: &Card) -> Difficulty {
    PatternClassifier.classify(hand, dealer_up)
}

/// Draws a scenario of the requested difficulty using the thread-local RNG.
pub fn generate_scenario(difficulty: Difficulty) -> Scenario {
    ScenarioGenerator::new(PatternClassifier).generate(difficulty, &mut rand::thread_rng())
}

/// Monte Carlo estimate of `action` followed by basic strategy, under the
/// default rules and a freshly seeded infinite shoe.
pub fn estimate_ev(
    hand: &[Card],
    dealer_up: &Card,
    action: Action,
    trials: u32,
) -> Result<EvStats, SimulationError> {
    let mut shoe = InfiniteShoe::new(rand::thread_rng());
    EvSimulator::new(Rule::default(), &BASIC_STRATEGY).estimate(
        hand, dealer_up, action, trials, &mut shoe,
    )
}

/// Precomputed EV entry for a two-card hand, if the table has one.
pub fn lookup_ev<'a>(
    table: &'a EvLookupTable,
    hand: &[Card],
    dealer_up: &Card,
) -> Option<&'a EvLookupEntry> {
    table.lookup(hand, dealer_up)
}

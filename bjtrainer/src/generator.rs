//! Draws training scenarios of a requested difficulty.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    card::Card,
    difficulty::{is_over_represented_hard, Classifier, Difficulty},
    hand::{compute_totals, Hand},
    lookup::{CanonicalKey, EvLookupTable},
    shoe::CardSource,
    strategy::{Advice, BASIC_STRATEGY},
};

/// Rejection sampling gives up after this many draws.
pub const MAX_ATTEMPTS: u32 = 400;

/// A player hand facing a dealer upcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub player: Hand,
    pub dealer_up: Card,
}

impl Scenario {
    pub fn new(player: impl Into<Hand>, dealer_up: Card) -> Self {
        Scenario {
            player: player.into(),
            dealer_up,
        }
    }

    pub fn player_cards(&self) -> &[Card] {
        self.player.cards()
    }

    pub fn best_action(&self, allow_split: bool) -> Advice {
        BASIC_STRATEGY.best_action(self.player.cards(), &self.dealer_up, allow_split)
    }

    /// Adds one card to the player hand and returns it.
    pub fn hit<S: CardSource + ?Sized>(&mut self, shoe: &mut S) -> Card {
        let card = shoe.deal_card();
        self.player.receive_card(card);
        card
    }

    /// Splits a pair into two scenarios against the same upcard, each dealt
    /// one new card. `None` when the hand is not a pair.
    pub fn split<S: CardSource + ?Sized>(&self, shoe: &mut S) -> Option<(Scenario, Scenario)> {
        if !self.player.is_pair() {
            return None;
        }
        let cards = self.player.cards();
        let left = Scenario::new(vec![cards[0], shoe.deal_card()], self.dealer_up);
        let right = Scenario::new(vec![cards[1], shoe.deal_card()], self.dealer_up);
        Some((left, right))
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} vs {}", self.player, self.dealer_up)
    }
}

/// A generated scenario with how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub scenario: Scenario,
    pub attempts: u32,
    /// False when the attempt cap was hit and the scenario is off target.
    pub on_target: bool,
}

/// Rejection sampler over uniformly random two-card hands and upcards.
pub struct ScenarioGenerator<C: Classifier> {
    classifier: C,
    max_attempts: u32,
}

impl<C: Classifier> ScenarioGenerator<C> {
    pub fn new(classifier: C) -> Self {
        ScenarioGenerator {
            classifier,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn generate<R: Rng + ?Sized>(&self, difficulty: Difficulty, rng: &mut R) -> Scenario {
        self.generate_with_report(difficulty, rng).scenario
    }

    /// Always terminates within the attempt cap. On the cap the last
    /// non-natural draw is returned with `on_target` false.
    pub fn generate_with_report<R: Rng + ?Sized>(
        &self,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Generation {
        let mut fallback: Option<Scenario> = None;
        let mut last = None;
        for attempt in 1..=self.max_attempts {
            let player = [Card::random(rng), Card::random(rng)];
            let dealer_up = Card::random(rng);
            if compute_totals(&player).best() == 21 {
                last = Some(Scenario::new(player.to_vec(), dealer_up));
                continue;
            }
            if self.classifier.classify(&player, &dealer_up) == difficulty {
                let thinned = difficulty == Difficulty::Hard
                    && is_over_represented_hard(&player, &dealer_up)
                    && rng.gen_bool(0.5);
                if !thinned {
                    return Generation {
                        scenario: Scenario::new(player.to_vec(), dealer_up),
                        attempts: attempt,
                        on_target: true,
                    };
                }
            }
            fallback = Some(Scenario::new(player.to_vec(), dealer_up));
        }

        tracing::warn!(
            difficulty = %difficulty,
            attempts = self.max_attempts,
            "scenario generator hit its attempt cap, returning an off-target scenario"
        );
        let scenario = match fallback.or(last) {
            Some(scenario) => scenario,
            // Unreachable: max_attempts is at least 1.
            None => Scenario::new(vec![Card::random(rng), Card::random(rng)], Card::random(rng)),
        };
        Generation {
            scenario,
            attempts: self.max_attempts,
            on_target: false,
        }
    }
}

/// Samples canonical keys from the lookup table whose EV gap puts them in
/// the requested bucket.
pub struct TableScenarioGenerator<'a> {
    table: &'a EvLookupTable,
}

impl<'a> TableScenarioGenerator<'a> {
    pub fn new(table: &'a EvLookupTable) -> Self {
        TableScenarioGenerator { table }
    }

    /// Cards come back as spades. `None` only for an empty table.
    pub fn generate<R: Rng + ?Sized>(&self, difficulty: Difficulty, rng: &mut R) -> Option<Scenario> {
        let candidates = self.table.keys_with_difficulty(difficulty);
        if candidates.is_empty() {
            tracing::warn!(difficulty = %difficulty, "no table entries in bucket, using a random key");
            let keys = self.table.keys();
            return keys.choose(rng).map(scenario_for);
        }

        let filtered: Vec<CanonicalKey> = if difficulty == Difficulty::Hard {
            candidates
                .iter()
                .copied()
                .filter(|key| {
                    !is_over_represented_hard(&key.player_cards(), &key.dealer_card())
                        || rng.gen_bool(0.5)
                })
                .collect()
        } else {
            Vec::new()
        };
        let pool = if filtered.is_empty() {
            &candidates
        } else {
            &filtered
        };
        pool.choose(rng).map(scenario_for)
    }
}

fn scenario_for(key: &CanonicalKey) -> Scenario {
    Scenario::new(key.player_cards().to_vec(), key.dealer_card())
}

//! Monte Carlo estimation of the expected value of forcing one action now and
//! following basic strategy afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    card::Card,
    hand::Hand,
    resolution::{resolve_dealer, Leaf, Outcome, PlayerResolver},
    shoe::CardSource,
    strategy::Policy,
    Action, Rule,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("number of trials must be at least 1")]
    ZeroTrials,
    #[error("player hand has no cards")]
    EmptyHand,
    #[error("only a two-card hand can be split, got {0} cards")]
    SplitNeedsTwoCards(usize),
    #[error("simulation worker thread stopped unexpectedly")]
    WorkerStopped,
}

/// Aggregated result of repeated trials for one candidate action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvStats {
    pub ev: f64,
    #[serde(alias = "wr")]
    pub win_rate: f64,
    #[serde(alias = "pr")]
    pub push_rate: f64,
    #[serde(alias = "lr")]
    pub loss_rate: f64,
    #[serde(default = "default_avg_bet")]
    pub avg_bet: f64,
}

fn default_avg_bet() -> f64 {
    1.0
}

/// One trial: the signed units won over every sub-hand, and the units bet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialResult {
    pub won: f64,
    pub bet: u32,
}

impl TrialResult {
    pub fn outcome(&self) -> Outcome {
        if self.won > 0.0 {
            Outcome::Win
        } else if self.won < 0.0 {
            Outcome::Loss
        } else {
            Outcome::Push
        }
    }
}

/// EV of the basic-strategy action next to the EV of what was actually
/// chosen. `delta` is how much the choice gave up per unit bet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvComparison {
    pub best_action: Action,
    pub chosen_action: Action,
    pub best: EvStats,
    pub chosen: EvStats,
    pub delta: f64,
}

pub struct EvSimulator<'a, P: Policy> {
    resolver: PlayerResolver<'a, P>,
}

impl<'a, P: Policy> EvSimulator<'a, P> {
    pub fn new(rule: Rule, policy: &'a P) -> Self {
        EvSimulator {
            resolver: PlayerResolver::new(rule, policy),
        }
    }

    pub fn rule(&self) -> &Rule {
        self.resolver.rule()
    }

    /// Plays a single trial with `action` forced as the first move. The dealer
    /// is dealt fresh from `shoe` after the player is done.
    pub fn simulate_once<S: CardSource + ?Sized>(
        &self,
        hand: &[Card],
        dealer_up: &Card,
        action: Action,
        shoe: &mut S,
    ) -> Result<TrialResult, SimulationError> {
        if hand.is_empty() {
            return Err(SimulationError::EmptyHand);
        }
        let rule = *self.rule();
        let up_value = dealer_up.value();
        let mut player = Hand::from(hand);

        let leaves = match action {
            Action::Surrender => {
                return Ok(TrialResult { won: -0.5, bet: 1 });
            }
            Action::Stand => vec![Leaf {
                hand: player,
                bet: 1,
            }],
            Action::Hit => {
                player.receive_card(shoe.deal_card());
                if player.bust() {
                    return Ok(TrialResult { won: -1.0, bet: 1 });
                }
                self.resolver
                    .resolve(player, up_value, false, 0, shoe)
                    .flatten()
            }
            Action::Double => {
                player.receive_card(shoe.deal_card());
                if player.bust() {
                    return Ok(TrialResult { won: -2.0, bet: 2 });
                }
                vec![Leaf {
                    hand: player,
                    bet: 2,
                }]
            }
            Action::Split => {
                if hand.len() != 2 {
                    return Err(SimulationError::SplitNeedsTwoCards(hand.len()));
                }
                let splits_left = rule.split_all_limits.saturating_sub(1);
                self.resolver
                    .split(&player, up_value, splits_left, shoe)
                    .flatten()
            }
        };

        // A busted sub-hand loses even if the dealer busts too, but the
        // dealer still plays when any sub-hand is alive.
        let dealer_best = if leaves.iter().all(|leaf| leaf.hand.bust()) {
            0
        } else {
            resolve_dealer(&rule, *dealer_up, shoe)
        };

        let mut won = 0.0;
        let mut bet = 0;
        for leaf in &leaves {
            let outcome = Outcome::compare(leaf.hand.best_total(), dealer_best);
            won += (outcome.sign() * leaf.bet as i32) as f64;
            bet += leaf.bet;
        }
        Ok(TrialResult { won, bet })
    }

    /// Averages `trials` independent trials of `action`.
    pub fn estimate<S: CardSource + ?Sized>(
        &self,
        hand: &[Card],
        dealer_up: &Card,
        action: Action,
        trials: u32,
        shoe: &mut S,
    ) -> Result<EvStats, SimulationError> {
        if trials == 0 {
            return Err(SimulationError::ZeroTrials);
        }
        let mut total_won = 0.0;
        let mut total_bet: u64 = 0;
        let (mut wins, mut pushes, mut losses) = (0u32, 0u32, 0u32);
        for _ in 0..trials {
            let result = self.simulate_once(hand, dealer_up, action, shoe)?;
            total_won += result.won;
            total_bet += result.bet as u64;
            match result.outcome() {
                Outcome::Win => wins += 1,
                Outcome::Push => pushes += 1,
                Outcome::Loss => losses += 1,
            }
        }
        let n = trials as f64;
        Ok(EvStats {
            ev: total_won / n,
            win_rate: wins as f64 / n,
            push_rate: pushes as f64 / n,
            loss_rate: losses as f64 / n,
            avg_bet: total_bet as f64 / n,
        })
    }

    /// Estimates both `best` and `chosen` from the same shoe.
    pub fn compare<S: CardSource + ?Sized>(
        &self,
        hand: &[Card],
        dealer_up: &Card,
        best: Action,
        chosen: Action,
        trials: u32,
        shoe: &mut S,
    ) -> Result<EvComparison, SimulationError> {
        let best_stats = self.estimate(hand, dealer_up, best, trials, shoe)?;
        let chosen_stats = if chosen == best {
            best_stats
        } else {
            self.estimate(hand, dealer_up, chosen, trials, shoe)?
        };
        Ok(EvComparison {
            best_action: best,
            chosen_action: chosen,
            best: best_stats,
            chosen: chosen_stats,
            delta: best_stats.ev - chosen_stats.ev,
        })
    }
}

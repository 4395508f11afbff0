use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

use crate::{
    card::{Card, Rank},
    hand::{compute_totals, is_pair},
    Action,
};

/// Which chart a hand is read from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_enum_str, Deserialize_enum_str,
)]
pub enum Category {
    #[serde(rename = "HARD")]
    Hard,
    #[serde(rename = "SOFT")]
    Soft,
    #[serde(rename = "PAIR")]
    Pair,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advice {
    pub action: Action,
    pub category: Category,
    pub note: String,
}

/// A fixed playing policy consulted while a hand is played out.
pub trait Policy {
    /// `dealer_up` is the upcard value, 2..=11 with 11 for an Ace.
    fn make_decision(
        &self,
        hand: &[Card],
        dealer_up: u8,
        allow_double: bool,
        allow_split: bool,
    ) -> Action;
}

/// Each chart cell holds the preferred action and the one to take when the
/// preferred action is not available (doubling after the first card).
type Cell = (Action, Action);

const H: Cell = (Action::Hit, Action::Hit);
const S: Cell = (Action::Stand, Action::Stand);
const P: Cell = (Action::Split, Action::Split);
const DH: Cell = (Action::Double, Action::Hit);
const DS: Cell = (Action::Double, Action::Stand);

/// Basic strategy for S17, double after split, infinite shoe.
///
/// Columns are dealer upcards A, 2, 3, ..., 10.
pub struct BasicStrategy {
    hard_charts: [[Cell; 10]; 14],
    soft_charts: [[Cell; 10]; 9],
    pair_charts: [[Cell; 10]; 10],
}

pub static BASIC_STRATEGY: BasicStrategy = BasicStrategy::new();

impl BasicStrategy {
    pub const fn new() -> BasicStrategy {
        BasicStrategy {
            hard_charts: [
                [H, H, H, H, H, H, H, H, H, H], // 5 and below
                [H, H, H, H, H, H, H, H, H, H],
                [H, H, H, H, H, H, H, H, H, H],
                [H, H, H, H, H, H, H, H, H, H], // 8
                [H, H, DH, DH, DH, DH, H, H, H, H],
                [H, DH, DH, DH, DH, DH, DH, DH, DH, H],
                [H, DH, DH, DH, DH, DH, DH, DH, DH, DH], // 11
                [H, H, H, S, S, S, H, H, H, H],
                [H, S, S, S, S, S, H, H, H, H],
                [H, S, S, S, S, S, H, H, H, H],
                [H, S, S, S, S, S, H, H, H, H],
                [H, S, S, S, S, S, H, H, H, H], // 16
                [S, S, S, S, S, S, S, S, S, S], // 17
                [S, S, S, S, S, S, S, S, S, S], // 18 and above
            ],
            soft_charts: [
                [H, H, H, H, DH, DH, H, H, H, H], // Soft 13
                [H, H, H, H, DH, DH, H, H, H, H],
                [H, H, H, DH, DH, DH, H, H, H, H],
                [H, H, H, DH, DH, DH, H, H, H, H],
                [H, H, DH, DH, DH, DH, H, H, H, H],
                [H, S, DS, DS, DS, DS, S, S, H, H],
                [S, S, S, S, S, DS, S, S, S, S],
                [S, S, S, S, S, S, S, S, S, S], // Soft 20
                [S, S, S, S, S, S, S, S, S, S], // Soft 21
            ],
            pair_charts: [
                [P, P, P, P, P, P, P, P, P, P], // Double Ace
                [H, P, P, P, P, P, P, H, H, H], // Double 2
                [H, P, P, P, P, P, P, H, H, H],
                [H, H, H, H, P, P, H, H, H, H],
                [H, DH, DH, DH, DH, DH, DH, DH, DH, H],
                [H, P, P, P, P, P, H, H, H, H],
                [H, P, P, P, P, P, P, H, H, H],
                [P, P, P, P, P, P, P, P, P, P],
                [S, P, P, P, P, P, S, P, P, S],
                [S, S, S, S, S, S, S, S, S, S], // Double 10
            ],
        }
    }

    /// The graded basic-strategy action. With `allow_split` false the pair
    /// chart is skipped and pairs are read as hard or soft totals.
    pub fn best_action(&self, hand: &[Card], dealer_up: &Card, allow_split: bool) -> Advice {
        let (cell, category, note) = self.lookup(hand, dealer_up.value(), allow_split);
        Advice {
            action: cell.0,
            category,
            note,
        }
    }

    pub fn best_action_no_split(&self, hand: &[Card], dealer_up: &Card) -> Advice {
        self.best_action(hand, dealer_up, false)
    }

    /// The preferred action in one chart cell. `total` is the hard or soft
    /// total, or for pairs the value of the paired card (11 for aces).
    pub fn cell(&self, category: Category, total: u8, dealer_up: u8) -> Action {
        let col = column(dealer_up);
        let cell = match category {
            Category::Hard => self.hard_charts[(total.clamp(5, 18) - 5) as usize][col],
            Category::Soft if total < 13 => H,
            Category::Soft => self.soft_charts[(total.min(21) - 13) as usize][col],
            Category::Pair => {
                let row = match total.clamp(2, 11) {
                    11 => 0,
                    value => (value - 1) as usize,
                };
                self.pair_charts[row][col]
            }
        };
        cell.0
    }

    /// The full printable chart: hard 20 down to 4, soft 21 down to 13 and
    /// pairs from aces down to twos, each against upcards 2 through A.
    pub fn chart(&self) -> StrategyChart {
        let row = |category: Category, total: u8| ChartRow {
            category,
            total,
            actions: std::array::from_fn(|i| self.cell(category, total, i as u8 + 2)),
        };
        StrategyChart {
            hard: (4..=20).rev().map(|total| row(Category::Hard, total)).collect(),
            soft: (13..=21).rev().map(|total| row(Category::Soft, total)).collect(),
            pairs: [11, 10, 9, 8, 7, 6, 5, 4, 3, 2]
                .into_iter()
                .map(|value| row(Category::Pair, value))
                .collect(),
        }
    }

    fn lookup(&self, hand: &[Card], dealer_up: u8, allow_split: bool) -> (Cell, Category, String) {
        let col = column(dealer_up);
        if allow_split && is_pair(hand) {
            let row = pair_row(hand[0].rank);
            return (
                self.pair_charts[row][col],
                Category::Pair,
                String::from("Pair strategy (S17/DAS)"),
            );
        }

        let totals = compute_totals(hand);
        match totals.soft {
            Some(soft) => {
                let cell = if soft < 13 {
                    H
                } else {
                    self.soft_charts[(soft - 13) as usize][col]
                };
                (cell, Category::Soft, format!("Soft total {}", soft))
            }
            None => {
                let row = (totals.hard.clamp(5, 18) - 5) as usize;
                (
                    self.hard_charts[row][col],
                    Category::Hard,
                    format!("Hard total {}", totals.hard),
                )
            }
        }
    }
}

/// One chart row. `actions[i]` is the play against upcard value `i + 2`, so
/// the last column is the Ace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRow {
    pub category: Category,
    /// Hard or soft total, or the paired card's value.
    pub total: u8,
    pub actions: [Action; 10],
}

impl ChartRow {
    /// `16`, `A,7` or `8,8`.
    pub fn label(&self) -> String {
        match self.category {
            Category::Hard => self.total.to_string(),
            Category::Soft => format!("A,{}", self.total - 11),
            Category::Pair if self.total == 11 => String::from("A,A"),
            Category::Pair => format!("{},{}", self.total, self.total),
        }
    }

    pub fn action_against(&self, dealer_up: u8) -> Option<Action> {
        match dealer_up {
            2..=11 => Some(self.actions[(dealer_up - 2) as usize]),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyChart {
    pub hard: Vec<ChartRow>,
    pub soft: Vec<ChartRow>,
    pub pairs: Vec<ChartRow>,
}

impl StrategyChart {
    pub fn rows(&self) -> impl Iterator<Item = &ChartRow> {
        self.hard.iter().chain(&self.soft).chain(&self.pairs)
    }
}

/// The basic-strategy chart.
pub fn chart() -> StrategyChart {
    BASIC_STRATEGY.chart()
}

impl Default for BasicStrategy {
    fn default() -> Self {
        BasicStrategy::new()
    }
}

impl Policy for BasicStrategy {
    fn make_decision(
        &self,
        hand: &[Card],
        dealer_up: u8,
        allow_double: bool,
        allow_split: bool,
    ) -> Action {
        let (cell, _, _) = self.lookup(hand, dealer_up, allow_split);
        match cell.0 {
            Action::Double if !allow_double => cell.1,
            action => action,
        }
    }
}

fn column(dealer_up: u8) -> usize {
    match dealer_up {
        11 | 1 => 0,
        v => (v.clamp(2, 10) - 1) as usize,
    }
}

fn pair_row(rank: Rank) -> usize {
    match rank.pair_class() {
        Rank::Ace => 0,
        other => (other.value() - 1) as usize,
    }
}

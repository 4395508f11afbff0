use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use strum_macros::EnumIter;

use crate::{
    card::{Card, Rank},
    hand::{compute_totals, is_pair},
    lookup::EvLookupTable,
};

/// EV gaps below this are coin flips.
pub const HARD_EV_DELTA: f64 = 0.02;
/// EV gaps below this (and not below [`HARD_EV_DELTA`]) are moderate.
pub const MEDIUM_EV_DELTA: f64 = 0.05;

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
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Buckets a decision point by how close the call is.
pub trait Classifier {
    fn classify(&self, hand: &[Card], dealer_up: &Card) -> Difficulty;
}

impl<T: Classifier + ?Sized> Classifier for &T {
    fn classify(&self, hand: &[Card], dealer_up: &Card) -> Difficulty {
        (**self).classify(hand, dealer_up)
    }
}

pub fn classify_by_ev_delta(ev_delta: f64) -> Difficulty {
    let ev_delta = ev_delta.abs();
    if ev_delta < HARD_EV_DELTA {
        Difficulty::Hard
    } else if ev_delta < MEDIUM_EV_DELTA {
        Difficulty::Medium
    } else {
        Difficulty::Easy
    }
}

/// Shape of a hand as the pattern rules see it.
enum Shape {
    Pair(Rank),
    Soft(u8),
    Hard(u8),
}

fn shape(hand: &[Card]) -> Shape {
    if is_pair(hand) {
        return Shape::Pair(hand[0].rank.pair_class());
    }
    let totals = compute_totals(hand);
    match totals.soft {
        Some(soft) => Shape::Soft(soft),
        None => Shape::Hard(totals.hard),
    }
}

/// Textbook close calls are Hard, borderline plays Medium, clear plays Easy.
/// Anything the rules do not recognise is Medium.
pub fn classify_by_pattern(hand: &[Card], dealer_up: &Card) -> Difficulty {
    let up = dealer_up.value();
    let shape = shape(hand);

    let hard = match shape {
        Shape::Hard(12) => up == 2 || up == 3,
        Shape::Hard(15) | Shape::Hard(16) => up == 10,
        Shape::Soft(18) => up >= 9,
        Shape::Pair(Rank::Nine) => up == 7 || up == 10 || up == 11,
        Shape::Hard(11) => up == 11,
        Shape::Pair(Rank::Four) => up == 5 || up == 6,
        _ => false,
    };
    if hard {
        return Difficulty::Hard;
    }

    let medium = match shape {
        Shape::Pair(Rank::Two | Rank::Three | Rank::Six | Rank::Seven) => (2..=7).contains(&up),
        Shape::Hard(12) => (4..=6).contains(&up),
        Shape::Hard(9) => (3..=6).contains(&up),
        Shape::Soft(17) => (3..=6).contains(&up),
        Shape::Soft(18) => up == 2 || up == 7 || up == 8,
        Shape::Pair(Rank::Eight) => up >= 9,
        _ => false,
    };
    if medium {
        return Difficulty::Medium;
    }

    let easy = match shape {
        Shape::Pair(rank) => matches!(rank, Rank::Ace | Rank::Eight | Rank::Five | Rank::Ten),
        Shape::Hard(total) if total >= 17 || total <= 8 => true,
        Shape::Hard(11) => up != 11,
        Shape::Hard(10) => (2..=9).contains(&up),
        Shape::Hard(13..=16) => (2..=6).contains(&up),
        Shape::Hard(12) => (4..=6).contains(&up),
        Shape::Soft(total) if total >= 19 => true,
        Shape::Soft(13 | 14) => up == 5 || up == 6,
        Shape::Soft(15 | 16) => (4..=6).contains(&up),
        Shape::Soft(17) => (3..=6).contains(&up),
        _ => false,
    };
    if easy {
        Difficulty::Easy
    } else {
        Difficulty::Medium
    }
}

/// Hard 12 against a 2 or 3 is the most common Hard pattern; samplers thin
/// it out so the other Hard cases show up as often.
pub fn is_over_represented_hard(hand: &[Card], dealer_up: &Card) -> bool {
    let up = dealer_up.value();
    matches!(shape(hand), Shape::Hard(12)) && (up == 2 || up == 3)
}

/// Static textbook-pattern classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternClassifier;

impl Classifier for PatternClassifier {
    fn classify(&self, hand: &[Card], dealer_up: &Card) -> Difficulty {
        classify_by_pattern(hand, dealer_up)
    }
}

/// Classifier backed by the precomputed lookup table. A key the table does
/// not hold is Medium.
#[derive(Debug, Clone, Copy)]
pub struct EvDeltaClassifier<'a> {
    table: &'a EvLookupTable,
}

impl<'a> EvDeltaClassifier<'a> {
    pub fn new(table: &'a EvLookupTable) -> Self {
        EvDeltaClassifier { table }
    }
}

impl<'a> Classifier for EvDeltaClassifier<'a> {
    fn classify(&self, hand: &[Card], dealer_up: &Card) -> Difficulty {
        match self.table.lookup(hand, dealer_up) {
            Some(entry) => classify_by_ev_delta(entry.ev_delta),
            None => {
                tracing::debug!(
                    hand = ?hand.iter().map(|c| c.rank.label()).collect::<Vec<_>>(),
                    dealer = dealer_up.rank.label(),
                    "no EV data, defaulting to Medium"
                );
                Difficulty::Medium
            }
        }
    }
}

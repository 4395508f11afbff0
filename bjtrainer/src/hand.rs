use crate::card::{Card, Rank};

/// Hard and (when it exists) soft totals of a hand.
///
/// A soft total exists only when the hand holds an Ace and counting one Ace
/// as 11 stays at or below 21, so `soft == Some(hard + 10)` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub hard: u8,
    pub soft: Option<u8>,
}

impl Totals {
    /// The soft total if valid, else the hard total.
    pub fn best(&self) -> u8 {
        self.soft.unwrap_or(self.hard)
    }

    pub fn is_soft(&self) -> bool {
        self.soft.is_some()
    }

    pub fn bust(&self) -> bool {
        self.hard > 21
    }
}

pub fn compute_totals(cards: &[Card]) -> Totals {
    let mut hard: u8 = 0;
    let mut has_ace = false;
    for card in cards {
        if card.rank == Rank::Ace {
            has_ace = true;
        }
        hard = hard.saturating_add(card.rank.hard_value());
    }
    let soft = if has_ace && hard <= 11 {
        Some(hard + 10)
    } else {
        None
    };
    Totals { hard, soft }
}

/// Exactly two cards of the same pair class (10/J/Q/K pair with each other).
pub fn is_pair(cards: &[Card]) -> bool {
    cards.len() == 2 && cards[0].rank.pair_class() == cards[1].rank.pair_class()
}

pub fn is_soft(cards: &[Card]) -> bool {
    compute_totals(cards).is_soft()
}

/// An ordered run of cards. Order only matters for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Hand {
        Hand {
            cards: Vec::with_capacity(4),
        }
    }

    pub fn receive_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn totals(&self) -> Totals {
        compute_totals(&self.cards)
    }

    pub fn best_total(&self) -> u8 {
        self.totals().best()
    }

    pub fn is_pair(&self) -> bool {
        is_pair(&self.cards)
    }

    pub fn is_soft(&self) -> bool {
        self.totals().is_soft()
    }

    pub fn bust(&self) -> bool {
        self.totals().bust()
    }

    /// A two-card 21.
    pub fn is_natural(&self) -> bool {
        self.cards.len() == 2 && self.best_total() == 21
    }
}

impl From<Vec<Card>> for Hand {
    fn from(cards: Vec<Card>) -> Self {
        Hand { cards }
    }
}

impl From<&[Card]> for Hand {
    fn from(cards: &[Card]) -> Self {
        Hand {
            cards: cards.to_vec(),
        }
    }
}

impl std::fmt::Display for Hand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, card) in self.cards.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", card)?;
        }
        Ok(())
    }
}

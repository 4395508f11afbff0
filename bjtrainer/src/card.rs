use std::str::FromStr;

use rand::Rng;
use strum_macros::EnumIter;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardParseError {
    #[error("invalid rank {0:?}, expected one of A,2-10,J,Q,K")]
    Rank(String),
    #[error("invalid suit {0:?}")]
    Suit(String),
    #[error("invalid card {0:?}")]
    Card(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Blackjack value with the Ace counted high: 2..=11.
    pub fn value(self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
        }
    }

    /// Value with the Ace counted as 1, used for hard totals.
    pub fn hard_value(self) -> u8 {
        match self {
            Rank::Ace => 1,
            _ => self.value(),
        }
    }

    pub fn is_ten_like(self) -> bool {
        matches!(self, Rank::Ten | Rank::Jack | Rank::Queen | Rank::King)
    }

    /// Collapses J/Q/K onto Ten, the class used for pairing.
    pub fn pair_class(self) -> Rank {
        if self.is_ten_like() {
            Rank::Ten
        } else {
            self
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Rank {
        Rank::ALL[rng.gen_range(0..Rank::ALL.len())]
    }

    /// The rank standing for a card value: 11 (or 1) is an Ace, 10 a Ten.
    pub fn from_value(value: u8) -> Option<Rank> {
        match value {
            1 | 11 => Some(Rank::Ace),
            2..=10 => Some(Rank::ALL[(value - 1) as usize]),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rank {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rank = match s.trim().to_ascii_uppercase().as_str() {
            "A" | "1" | "11" => Rank::Ace,
            "2" => Rank::Two,
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "10" | "T" => Rank::Ten,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            _ => return Err(CardParseError::Rank(s.to_string())),
        };
        Ok(rank)
    }
}

/// Suits are cosmetic and never affect value or strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Suit {
    Spade,
    Heart,
    Diamond,
    Club,
}

impl Suit {
    pub fn symbol(self) -> char {
        match self {
            Suit::Spade => '♠',
            Suit::Heart => '♥',
            Suit::Diamond => '♦',
            Suit::Club => '♣',
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Suit {
        match rng.gen_range(0..4) {
            0 => Suit::Spade,
            1 => Suit::Heart,
            2 => Suit::Diamond,
            _ => Suit::Club,
        }
    }
}

impl FromStr for Suit {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "♠" | "S" | "s" => Ok(Suit::Spade),
            "♥" | "H" | "h" => Ok(Suit::Heart),
            "♦" | "D" | "d" => Ok(Suit::Diamond),
            "♣" | "C" | "c" => Ok(Suit::Club),
            other => Err(CardParseError::Suit(other.to_string())),
        }
    }
}

/// Represents a card in the real world with a suit and a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Card { rank, suit }
    }

    /// A spade of the given rank. Used wherever the suit is irrelevant.
    pub fn of(rank: Rank) -> Self {
        Card {
            rank,
            suit: Suit::Spade,
        }
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Card {
            rank: Rank::random(rng),
            suit: Suit::random(rng),
        }
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.rank, self.suit.symbol())
    }
}

/// Parses "A", "10", "K♥" or "Qh". A bare rank yields a spade.
impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(rank) = s.parse::<Rank>() {
            return Ok(Card::of(rank));
        }
        let split_at = s
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .ok_or_else(|| CardParseError::Card(s.to_string()))?;
        let (rank, suit) = s.split_at(split_at);
        match (rank.parse::<Rank>(), suit.parse::<Suit>()) {
            (Ok(rank), Ok(suit)) => Ok(Card { rank, suit }),
            _ => Err(CardParseError::Card(s.to_string())),
        }
    }
}

/// `rankValue` of the trainer: Ace 11, ten-likes 10, else the pip count.
pub fn rank_value(rank: Rank) -> u8 {
    rank.value()
}

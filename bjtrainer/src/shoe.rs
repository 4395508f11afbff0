use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::card::{Card, Rank};

/// Where the engine gets its cards from.
pub trait CardSource {
    fn deal_card(&mut self) -> Card;
}

impl<T: CardSource + ?Sized> CardSource for &mut T {
    fn deal_card(&mut self) -> Card {
        (**self).deal_card()
    }
}

/// An infinite shoe: every card is drawn independently and uniformly over
/// 13 ranks and 4 suits.
#[derive(Debug, Clone)]
pub struct InfiniteShoe<R: Rng> {
    rng: R,
}

impl<R: Rng> InfiniteShoe<R> {
    pub fn new(rng: R) -> Self {
        InfiniteShoe { rng }
    }
}

impl InfiniteShoe<StdRng> {
    pub fn with_seed(seed: u64) -> Self {
        InfiniteShoe::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        InfiniteShoe::new(StdRng::from_entropy())
    }
}

impl<R: Rng> CardSource for InfiniteShoe<R> {
    fn deal_card(&mut self) -> Card {
        Card::random(&mut self.rng)
    }
}

/// Deals the given cards first, in order, then continues from an infinite
/// shoe. Lets tests pin down exactly which cards a playout sees.
#[derive(Debug, Clone)]
pub struct StackedShoe<R: Rng> {
    firsts: VecDeque<Card>,
    rest: InfiniteShoe<R>,
}

impl<R: Rng> StackedShoe<R> {
    pub fn new(firsts: Vec<Card>, rng: R) -> Self {
        StackedShoe {
            firsts: firsts.into(),
            rest: InfiniteShoe::new(rng),
        }
    }

    pub fn remaining_firsts(&self) -> usize {
        self.firsts.len()
    }
}

impl StackedShoe<StdRng> {
    /// Stacks spades of the given ranks on top of a seeded infinite shoe.
    pub fn with_ranks(ranks: &[Rank], seed: u64) -> Self {
        StackedShoe::new(
            ranks.iter().map(|&rank| Card::of(rank)).collect(),
            StdRng::seed_from_u64(seed),
        )
    }
}

impl<R: Rng> CardSource for StackedShoe<R> {
    fn deal_card(&mut self) -> Card {
        match self.firsts.pop_front() {
            Some(card) => card,
            None => self.rest.deal_card(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_shoes_deal_the_same_cards() {
        let mut a = InfiniteShoe::with_seed(99);
        let mut b = InfiniteShoe::with_seed(99);
        let xs: Vec<Card> = (0..20).map(|_| a.deal_card()).collect();
        let ys: Vec<Card> = (0..20).map(|_| b.deal_card()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn infinite_shoe_is_roughly_uniform_over_ranks() {
        let mut shoe = InfiniteShoe::with_seed(3);
        let mut counts = [0u32; 13];
        let n = 130_000;
        for _ in 0..n {
            let card = shoe.deal_card();
            counts[card.rank as usize] += 1;
        }
        for count in counts {
            let share = count as f64 / n as f64;
            assert!((share - 1.0 / 13.0).abs() < 0.005);
        }
    }

    #[test]
    fn stacked_shoe_deals_firsts_in_order() {
        let mut shoe = StackedShoe::with_ranks(&[Rank::Ace, Rank::Four, Rank::Four], 1);
        assert_eq!(shoe.deal_card().rank, Rank::Ace);
        assert_eq!(shoe.remaining_firsts(), 2);
        assert_eq!(shoe.deal_card().rank, Rank::Four);
        assert_eq!(shoe.deal_card().rank, Rank::Four);
        assert_eq!(shoe.remaining_firsts(), 0);
        // Falls through to the infinite shoe without running dry.
        for _ in 0..100 {
            shoe.deal_card();
        }
    }
}

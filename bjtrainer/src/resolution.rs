//! Plays a hand out to a terminal state under a fixed policy, and plays the
//! dealer out under the house rule.

use crate::{
    card::Card,
    hand::Hand,
    shoe::CardSource,
    strategy::Policy,
    Action, Rule,
};

/// A finished sub-hand and the units wagered on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub hand: Hand,
    pub bet: u32,
}

/// Result of resolving a hand: either a single finished hand, or a split
/// whose two halves were each resolved on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Leaf(Leaf),
    Split {
        left: Box<Resolution>,
        right: Box<Resolution>,
    },
}

impl Resolution {
    /// All terminal hands, left to right.
    pub fn flatten(self) -> Vec<Leaf> {
        let mut leaves = Vec::with_capacity(2);
        self.flatten_into(&mut leaves);
        leaves
    }

    fn flatten_into(self, leaves: &mut Vec<Leaf>) {
        match self {
            Resolution::Leaf(leaf) => leaves.push(leaf),
            Resolution::Split { left, right } => {
                left.flatten_into(leaves);
                right.flatten_into(leaves);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Push,
    Loss,
}

impl Outcome {
    /// Player bust loses before the dealer's total is considered.
    pub fn compare(player_best: u8, dealer_best: u8) -> Outcome {
        if player_best > 21 {
            Outcome::Loss
        } else if dealer_best > 21 || player_best > dealer_best {
            Outcome::Win
        } else if player_best < dealer_best {
            Outcome::Loss
        } else {
            Outcome::Push
        }
    }

    pub fn sign(self) -> i32 {
        match self {
            Outcome::Win => 1,
            Outcome::Push => 0,
            Outcome::Loss => -1,
        }
    }
}

/// Deals the hole card and draws until the dealer must stand. Returns the
/// dealer's best total, which is above 21 on a bust.
pub fn resolve_dealer<S: CardSource + ?Sized>(rule: &Rule, up: Card, shoe: &mut S) -> u8 {
    let mut dealer = Hand::new();
    dealer.receive_card(up);
    dealer.receive_card(shoe.deal_card());
    loop {
        let totals = dealer.totals();
        if totals.bust() || dealer_must_stand(rule, totals.best(), totals.is_soft()) {
            return totals.best();
        }
        dealer.receive_card(shoe.deal_card());
    }
}

fn dealer_must_stand(rule: &Rule, total: u8, is_soft: bool) -> bool {
    if total > 17 {
        true
    } else if total < 17 {
        false
    } else {
        !is_soft || !rule.dealer_hit_on_soft17
    }
}

/// Resolves player hands by following a policy without deviation.
pub struct PlayerResolver<'a, P: Policy> {
    rule: Rule,
    policy: &'a P,
}

impl<'a, P: Policy> PlayerResolver<'a, P> {
    pub fn new(rule: Rule, policy: &'a P) -> Self {
        PlayerResolver { rule, policy }
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Plays `hand` to completion. `splits_left` is how many more times this
    /// hand may be split; hands produced by a split get one less.
    pub fn resolve<S: CardSource + ?Sized>(
        &self,
        mut hand: Hand,
        dealer_up: u8,
        mut allow_double: bool,
        splits_left: u8,
        shoe: &mut S,
    ) -> Resolution {
        loop {
            let allow_split = splits_left > 0 && hand.is_pair();
            let action =
                self.policy
                    .make_decision(hand.cards(), dealer_up, allow_double, allow_split);
            match action {
                Action::Stand | Action::Surrender => {
                    return Resolution::Leaf(Leaf { hand, bet: 1 });
                }
                Action::Hit => {
                    hand.receive_card(shoe.deal_card());
                    allow_double = false;
                    if hand.bust() {
                        return Resolution::Leaf(Leaf { hand, bet: 1 });
                    }
                }
                Action::Double => {
                    hand.receive_card(shoe.deal_card());
                    return Resolution::Leaf(Leaf { hand, bet: 2 });
                }
                Action::Split if allow_split => {
                    return self.split(&hand, dealer_up, splits_left - 1, shoe);
                }
                // Splitting was not offered, so the hand stays as dealt.
                Action::Split => {
                    return Resolution::Leaf(Leaf { hand, bet: 1 });
                }
            }
        }
    }

    /// Splits a two-card hand: each half receives one card, then both are
    /// resolved independently with `splits_left` further splits allowed.
    pub fn split<S: CardSource + ?Sized>(
        &self,
        hand: &Hand,
        dealer_up: u8,
        splits_left: u8,
        shoe: &mut S,
    ) -> Resolution {
        let cards = hand.cards();
        let mut left = Hand::new();
        left.receive_card(cards[0]);
        left.receive_card(shoe.deal_card());
        let mut right = Hand::new();
        right.receive_card(cards[1]);
        right.receive_card(shoe.deal_card());

        let allow_double = self.rule.allow_das;
        let left = self.resolve(left, dealer_up, allow_double, splits_left, shoe);
        let right = self.resolve(right, dealer_up, allow_double, splits_left, shoe);
        Resolution::Split {
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Rank;
    use crate::shoe::StackedShoe;
    use crate::strategy::BASIC_STRATEGY;

    fn hand(ranks: &[Rank]) -> Hand {
        Hand::from(ranks.iter().map(|&r| Card::of(r)).collect::<Vec<_>>())
    }

    #[test]
    fn outcome_comparison() {
        assert_eq!(Outcome::compare(22, 25), Outcome::Loss);
        assert_eq!(Outcome::compare(12, 22), Outcome::Win);
        assert_eq!(Outcome::compare(19, 18), Outcome::Win);
        assert_eq!(Outcome::compare(17, 18), Outcome::Loss);
        assert_eq!(Outcome::compare(20, 20), Outcome::Push);
    }

    #[test]
    fn dealer_stands_on_soft_seventeen_under_s17() {
        let rule = Rule::default();
        let mut shoe = StackedShoe::with_ranks(&[Rank::Six, Rank::Ten], 0);
        assert_eq!(resolve_dealer(&rule, Card::of(Rank::Ace), &mut shoe), 17);
        assert_eq!(shoe.remaining_firsts(), 1);
    }

    #[test]
    fn dealer_hits_soft_seventeen_under_h17() {
        let rule = Rule {
            dealer_hit_on_soft17: true,
            ..Rule::default()
        };
        // A,6 hits: +10 makes hard 17, which stands.
        let mut shoe = StackedShoe::with_ranks(&[Rank::Six, Rank::Ten], 0);
        assert_eq!(resolve_dealer(&rule, Card::of(Rank::Ace), &mut shoe), 17);
        assert_eq!(shoe.remaining_firsts(), 0);
    }

    #[test]
    fn dealer_draws_to_seventeen_and_can_bust() {
        let rule = Rule::default();
        let mut shoe = StackedShoe::with_ranks(&[Rank::Six, Rank::Seven], 0);
        assert_eq!(resolve_dealer(&rule, Card::of(Rank::King), &mut shoe), 23);

        let mut shoe = StackedShoe::with_ranks(&[Rank::Two, Rank::Two, Rank::Three], 0);
        assert_eq!(resolve_dealer(&rule, Card::of(Rank::Ten), &mut shoe), 17);
    }

    #[test]
    fn dealer_soft_hand_becomes_hard_instead_of_busting() {
        let rule = Rule::default();
        // A,5 = soft 16, +9 = hard 15, +3 = 18.
        let mut shoe = StackedShoe::with_ranks(&[Rank::Five, Rank::Nine, Rank::Three], 0);
        assert_eq!(resolve_dealer(&rule, Card::of(Rank::Ace), &mut shoe), 18);
    }

    #[test]
    fn policy_playout_hits_until_standing() {
        let resolver = PlayerResolver::new(Rule::default(), &BASIC_STRATEGY);
        // 10,2 vs 10 hits; +3 = 15 hits; +4 = 19 stands.
        let mut shoe = StackedShoe::with_ranks(&[Rank::Three, Rank::Four], 0);
        let resolution = resolver.resolve(hand(&[Rank::Ten, Rank::Two]), 10, true, 0, &mut shoe);
        let leaves = resolution.flatten();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].hand.best_total(), 19);
        assert_eq!(leaves[0].bet, 1);
    }

    #[test]
    fn double_draws_exactly_one_card() {
        let resolver = PlayerResolver::new(Rule::default(), &BASIC_STRATEGY);
        let mut shoe = StackedShoe::with_ranks(&[Rank::Two, Rank::Ten], 0);
        let leaves = resolver
            .resolve(hand(&[Rank::Five, Rank::Six]), 6, true, 0, &mut shoe)
            .flatten();
        assert_eq!(leaves[0].hand.len(), 3);
        assert_eq!(leaves[0].hand.best_total(), 13);
        assert_eq!(leaves[0].bet, 2);
    }

    #[test]
    fn split_eights_yields_two_leaves() {
        let resolver = PlayerResolver::new(Rule::default(), &BASIC_STRATEGY);
        // Left 8,3 = 11 doubles onto a 10; right 8,10 = 18 stands.
        let mut shoe = StackedShoe::with_ranks(&[Rank::Three, Rank::Ten, Rank::Ten], 0);
        let resolution = resolver.split(&hand(&[Rank::Eight, Rank::Eight]), 6, 0, &mut shoe);
        let leaves = resolution.flatten();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].hand.best_total(), 21);
        assert_eq!(leaves[0].bet, 2);
        assert_eq!(leaves[1].hand.best_total(), 18);
        assert_eq!(leaves[1].bet, 1);
    }

    #[test]
    fn resplit_is_disabled_below_first_level() {
        let resolver = PlayerResolver::new(Rule::default(), &BASIC_STRATEGY);
        // Both halves catch another 8 and must play 8,8 as hard 16 vs 10.
        let mut shoe = StackedShoe::with_ranks(
            &[Rank::Eight, Rank::Eight, Rank::Ten, Rank::Ten],
            0,
        );
        let leaves = resolver
            .split(&hand(&[Rank::Eight, Rank::Eight]), 10, 0, &mut shoe)
            .flatten();
        assert_eq!(leaves.len(), 2);
        assert!(leaves.iter().all(|leaf| leaf.hand.bust()));
    }

    struct AlwaysSplit;

    impl Policy for AlwaysSplit {
        fn make_decision(&self, _: &[Card], _: u8, _: bool, _: bool) -> Action {
            Action::Split
        }
    }

    #[test]
    fn split_without_permission_keeps_the_hand() {
        let resolver = PlayerResolver::new(Rule::default(), &AlwaysSplit);
        let mut shoe = StackedShoe::with_ranks(&[Rank::Five], 0);
        let leaves = resolver
            .resolve(hand(&[Rank::Ten, Rank::Six]), 10, true, 1, &mut shoe)
            .flatten();
        assert_eq!(leaves, vec![Leaf { hand: hand(&[Rank::Ten, Rank::Six]), bet: 1 }]);
        assert_eq!(shoe.remaining_firsts(), 1);

        let leaves = resolver
            .resolve(hand(&[Rank::Nine, Rank::Nine]), 10, true, 0, &mut shoe)
            .flatten();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].hand.len(), 2);
        assert_eq!(shoe.remaining_firsts(), 1);
    }

    #[test]
    fn nested_splits_flatten_when_resplitting_is_allowed() {
        let rule = Rule {
            split_all_limits: 2,
            ..Rule::default()
        };
        let resolver = PlayerResolver::new(rule, &BASIC_STRATEGY);
        // Left half catches an 8 and splits again; everything else stands on 18.
        let mut shoe = StackedShoe::with_ranks(
            &[Rank::Eight, Rank::Ten, Rank::Ten, Rank::Ten],
            0,
        );
        let resolution = resolver.split(&hand(&[Rank::Eight, Rank::Eight]), 6, 1, &mut shoe);
        match &resolution {
            Resolution::Split { left, .. } => {
                assert!(matches!(**left, Resolution::Split { .. }));
            }
            Resolution::Leaf(_) => panic!("expected a split"),
        }
        let leaves = resolution.flatten();
        assert_eq!(leaves.len(), 3);
        assert!(leaves.iter().all(|leaf| leaf.hand.best_total() == 18));
    }
}

//! Grading a single move against basic strategy, plus the canned explanations
//! shown next to close calls.

use crate::{
    card::{Card, Rank},
    hand::compute_totals,
    strategy::{Category, BASIC_STRATEGY},
    Action,
};

/// One graded move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub category: Category,
    /// Hard or soft total; `None` for pairs.
    pub total: Option<u8>,
    /// Pair class with ten-likes collapsed to Ten; `None` unless a pair.
    pub pair_rank: Option<Rank>,
    pub dealer_up_value: u8,
    pub chosen_action: Action,
    pub correct_action: Action,
    pub correct: bool,
}

/// Grades `chosen` against the basic-strategy action for the hand.
pub fn grade(hand: &[Card], dealer_up: &Card, chosen: Action, allow_split: bool) -> Decision {
    let advice = BASIC_STRATEGY.best_action(hand, dealer_up, allow_split);
    let totals = compute_totals(hand);
    let (total, pair_rank) = match advice.category {
        Category::Pair => (None, hand.first().map(|card| card.rank.pair_class())),
        Category::Soft => (totals.soft, None),
        Category::Hard => (Some(totals.hard), None),
    };
    Decision {
        category: advice.category,
        total,
        pair_rank,
        dealer_up_value: dealer_up.value(),
        chosen_action: chosen,
        correct_action: advice.action,
        correct: chosen == advice.action,
    }
}

impl Decision {
    /// `PAIR-9-7`, `SOFT-18-11`, `HARD-16-10`. The dealer part is the upcard
    /// value, so an Ace is 11.
    pub fn key(&self) -> String {
        match self.category {
            Category::Pair => format!(
                "PAIR-{}-{}",
                self.pair_rank.map(Rank::label).unwrap_or("?"),
                self.dealer_up_value
            ),
            Category::Soft => format!("SOFT-{}-{}", self.total.unwrap_or(0), self.dealer_up_value),
            Category::Hard => format!("HARD-{}-{}", self.total.unwrap_or(0), self.dealer_up_value),
        }
    }

    pub fn hint(&self) -> Option<&'static EvHint> {
        hint(&self.key())
    }

    pub fn tip(&self) -> Option<&'static str> {
        tip(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvHint {
    pub edge: Edge,
    pub blurb: &'static str,
}

const fn small(blurb: &'static str) -> EvHint {
    EvHint {
        edge: Edge::Small,
        blurb,
    }
}

static EV_HINTS: [(&str, EvHint); 13] = [
    ("HARD-12-2", small("12 vs 2 is close. Hitting saves some hands that would lose when the dealer makes 20 or better.")),
    ("HARD-12-3", small("12 vs 3 plays the same way: standing leaves too many losing totals when the dealer improves.")),
    ("HARD-16-10", small("16 vs 10 is a big underdog either way. Standing only wins on a dealer bust; hitting rescues the hands where you catch a small card.")),
    ("HARD-15-10", small("15 vs 10 follows 16 vs 10: hitting is slightly better than freezing on 15.")),
    ("SOFT-18-9", small("A,7 vs 9: the dealer often makes 19 or more, so hit rather than sit on 18.")),
    ("SOFT-18-10", small("A,7 vs 10: many dealer 19s and 20s beat 18; hitting can reach 19 to 21 without risk of busting.")),
    ("SOFT-18-11", small("A,7 vs A: hitting is slightly better; standing loses too often to 19 through 21.")),
    ("HARD-11-11", small("11 vs A under S17: hitting edges out doubling, since a double stops you at one card while paying twice on a loss.")),
    ("PAIR-9-7", small("9,9 vs 7: standing on 18 beats splitting, because a dealer 17 already loses to it.")),
    ("PAIR-9-10", small("9,9 vs 10: stand; splitting puts two weak hands against a strong upcard.")),
    ("PAIR-9-11", small("9,9 vs A: stand; splitting does worse against an ace.")),
    ("PAIR-4-5", small("4,4 vs 5: splitting leads to more good doubles and fewer weak totals. Close, but favorable.")),
    ("PAIR-4-6", small("4,4 vs 6: same idea as against a 5; splitting opens strong doubling chances.")),
];

/// The close-call explanation for a decision key, if there is one.
pub fn hint(key: &str) -> Option<&'static EvHint> {
    EV_HINTS
        .iter()
        .find(|(hint_key, _)| *hint_key == key)
        .map(|(_, hint)| hint)
}

pub fn hints() -> impl Iterator<Item = (&'static str, &'static EvHint)> {
    EV_HINTS.iter().map(|(key, hint)| (*key, hint))
}

pub fn edge_text(edge: Edge) -> &'static str {
    match edge {
        Edge::Large => "ΔEV ≈ large (~5%+)",
        Edge::Medium => "ΔEV ≈ moderate (~2–4%)",
        Edge::Small => "ΔEV ≈ small (~1%)",
    }
}

/// A one-line rule of thumb for the spots players most often miss.
pub fn tip(decision: &Decision) -> Option<&'static str> {
    let up = decision.dealer_up_value;
    match (decision.category, decision.total, decision.pair_rank) {
        (Category::Pair, _, Some(Rank::Ace)) => Some("Tip: Always split A,A."),
        (Category::Pair, _, Some(Rank::Eight)) => Some("Tip: Always split 8,8."),
        (Category::Pair, _, Some(Rank::Ten)) => Some("Tip: Don't split 10s (keep 20)."),
        (Category::Hard, Some(11), _) if up != 11 => Some("Tip: Double 11 against 2–10 (S17)."),
        (Category::Hard, Some(12), _) => Some("Tip: Hard 12: stand vs 4–6, otherwise hit."),
        (Category::Hard, Some(16), _) if up == 10 => {
            Some("Tip: 16 vs 10: hit (or surrender where allowed).")
        }
        (Category::Soft, Some(18), _) => {
            Some("Tip: Soft 18: double vs 3–6, stand vs 2/7/8, hit vs 9/10/A.")
        }
        _ => None,
    }
}

//! The precomputed EV table: one entry per canonical two-card hand against a
//! dealer upcard, read from and written to a single JSON object.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    card::{Card, Rank},
    difficulty::{classify_by_ev_delta, Difficulty},
    simulation::EvStats,
    strategy::Category,
    Action,
};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot access lookup table: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed lookup table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("lookup table is missing {missing} of {expected} keys (first: {first})")]
    MissingKeys {
        missing: usize,
        expected: usize,
        first: String,
    },
    #[error("invalid lookup key {0:?}")]
    InvalidKey(String),
}

/// Two player ranks and a dealer rank, with the player ranks ordered by their
/// label so that `8,A` and `A,8` are the same key. Suits never appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalKey {
    first: Rank,
    second: Rank,
    dealer: Rank,
}

impl CanonicalKey {
    pub fn new(a: Rank, b: Rank, dealer: Rank) -> Self {
        let (first, second) = if a.label() <= b.label() { (a, b) } else { (b, a) };
        CanonicalKey {
            first,
            second,
            dealer,
        }
    }

    /// `None` unless the hand has exactly two cards.
    pub fn from_cards(hand: &[Card], dealer_up: &Card) -> Option<Self> {
        match hand {
            [a, b] => Some(CanonicalKey::new(a.rank, b.rank, dealer_up.rank)),
            _ => None,
        }
    }

    /// Every key the builder produces: unordered rank pairs against every
    /// dealer rank, naturals excluded.
    pub fn all() -> Vec<CanonicalKey> {
        let mut keys = Vec::with_capacity(1131);
        for (i, &a) in Rank::ALL.iter().enumerate() {
            for &b in &Rank::ALL[i..] {
                for &dealer in &Rank::ALL {
                    let key = CanonicalKey::new(a, b, dealer);
                    if !key.is_natural() {
                        keys.push(key);
                    }
                }
            }
        }
        keys
    }

    pub fn player_ranks(&self) -> (Rank, Rank) {
        (self.first, self.second)
    }

    pub fn dealer_rank(&self) -> Rank {
        self.dealer
    }

    /// Dealer value recovered from the key: A is 11, ten-likes are 10.
    pub fn dealer_value(&self) -> u8 {
        self.dealer.value()
    }

    pub fn is_natural(&self) -> bool {
        let (a, b) = (self.first, self.second);
        (a == Rank::Ace && b.is_ten_like()) || (b == Rank::Ace && a.is_ten_like())
    }

    /// The two-card hand that stands for a strategy chart cell. Hard totals
    /// avoid pairs where a non-pair hand exists (hard 4 and 20 do not have
    /// one); soft totals are an Ace plus the rest; pairs take the paired
    /// card's value with 11 for aces.
    pub fn representative(category: Category, total: u8, dealer_up: u8) -> Option<Self> {
        let dealer = match dealer_up {
            2..=11 => Rank::from_value(dealer_up)?,
            _ => return None,
        };
        let (a, b) = match (category, total) {
            (Category::Hard, 4) => (2, 2),
            (Category::Hard, 5..=11) => (2, total - 2),
            (Category::Hard, 12..=19) => (10, total - 10),
            (Category::Hard, 20) => (10, 10),
            (Category::Soft, 13..=21) => (11, total - 11),
            (Category::Pair, 2..=11) => (total, total),
            _ => return None,
        };
        Some(CanonicalKey::new(
            Rank::from_value(a)?,
            Rank::from_value(b)?,
            dealer,
        ))
    }

    /// Representative spades for the player hand.
    pub fn player_cards(&self) -> [Card; 2] {
        [Card::of(self.first), Card::of(self.second)]
    }

    pub fn dealer_card(&self) -> Card {
        Card::of(self.dealer)
    }
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}vs{}", self.first, self.second, self.dealer)
    }
}

impl FromStr for CanonicalKey {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TableError::InvalidKey(s.to_string());
        let (player, dealer) = s.split_once("vs").ok_or_else(invalid)?;
        let (a, b) = player.split_once(',').ok_or_else(invalid)?;
        let a = a.parse::<Rank>().map_err(|_| invalid())?;
        let b = b.parse::<Rank>().map_err(|_| invalid())?;
        let dealer = dealer.parse::<Rank>().map_err(|_| invalid())?;
        Ok(CanonicalKey::new(a, b, dealer))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvLookupEntry {
    pub best_action: Action,
    pub ev_values: BTreeMap<Action, EvStats>,
    pub ev_delta: f64,
    pub strategy_action: Action,
    pub matches_strategy: bool,
}

impl EvLookupEntry {
    pub fn difficulty(&self) -> Difficulty {
        classify_by_ev_delta(self.ev_delta)
    }

    pub fn ev_of(&self, action: Action) -> Option<&EvStats> {
        self.ev_values.get(&action)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifficultyDistribution {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl DifficultyDistribution {
    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }

    /// Rounded whole percentages, in Easy/Medium/Hard order.
    pub fn percentages(&self) -> [u32; 3] {
        let total = self.total();
        if total == 0 {
            return [0; 3];
        }
        let pct = |n: usize| (n as f64 * 100.0 / total as f64).round() as u32;
        [pct(self.easy), pct(self.medium), pct(self.hard)]
    }
}

/// Read-only at runtime. Keys that do not parse are kept as-is and simply
/// never match a hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvLookupTable {
    entries: BTreeMap<String, EvLookupEntry>,
}

impl EvLookupTable {
    pub fn from_json_str(json: &str) -> Result<Self, TableError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path)?;
        EvLookupTable::from_reader(BufReader::new(file))
    }

    pub fn to_json_pretty(&self) -> Result<String, TableError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn lookup(&self, hand: &[Card], dealer_up: &Card) -> Option<&EvLookupEntry> {
        let key = CanonicalKey::from_cards(hand, dealer_up)?;
        let entry = self.get(&key);
        if entry.is_none() {
            tracing::debug!(key = %key, "EV lookup miss");
        }
        entry
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&EvLookupEntry> {
        self.entries.get(&key.to_string())
    }

    pub fn insert(&mut self, key: CanonicalKey, entry: EvLookupEntry) -> Option<EvLookupEntry> {
        self.entries.insert(key.to_string(), entry)
    }

    /// EV of the best play in a strategy chart cell, read from the cell's
    /// representative hand. Hard and soft cells ignore the Split figure,
    /// since a pair standing in for a total is played as that total.
    pub fn cell_ev(&self, category: Category, total: u8, dealer_up: u8) -> Option<f64> {
        let key = CanonicalKey::representative(category, total, dealer_up)?;
        let entry = self.get(&key)?;
        match category {
            Category::Pair => entry.ev_of(entry.best_action).map(|stats| stats.ev),
            Category::Hard | Category::Soft => entry
                .ev_values
                .iter()
                .filter(|(action, _)| **action != Action::Split)
                .map(|(_, stats)| stats.ev)
                .max_by(|a, b| a.total_cmp(b)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EvLookupEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parsed keys of every entry whose EV gap falls in `difficulty`.
    pub fn keys_with_difficulty(&self, difficulty: Difficulty) -> Vec<CanonicalKey> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.difficulty() == difficulty)
            .filter_map(|(key, _)| key.parse().ok())
            .collect()
    }

    pub fn keys(&self) -> Vec<CanonicalKey> {
        self.entries.keys().filter_map(|key| key.parse().ok()).collect()
    }

    /// A table is only usable when it holds every canonical key; partial
    /// tables are rejected rather than patched.
    pub fn validate(&self) -> Result<(), TableError> {
        let expected = CanonicalKey::all();
        let missing: Vec<&CanonicalKey> = expected
            .iter()
            .filter(|key| !self.entries.contains_key(&key.to_string()))
            .collect();
        match missing.first() {
            None => Ok(()),
            Some(first) => Err(TableError::MissingKeys {
                missing: missing.len(),
                expected: expected.len(),
                first: first.to_string(),
            }),
        }
    }

    pub fn difficulty_distribution(&self) -> DifficultyDistribution {
        let mut distribution = DifficultyDistribution::default();
        for entry in self.entries.values() {
            match entry.difficulty() {
                Difficulty::Easy => distribution.easy += 1,
                Difficulty::Medium => distribution.medium += 1,
                Difficulty::Hard => distribution.hard += 1,
            }
        }
        distribution
    }

    /// Entries where the simulated best action disagrees with basic strategy.
    pub fn mismatches(&self) -> Vec<(&str, &EvLookupEntry)> {
        self.iter().filter(|(_, entry)| !entry.matches_strategy).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;

    fn stats(ev: f64) -> EvStats {
        EvStats {
            ev,
            win_rate: 0.4,
            push_rate: 0.1,
            loss_rate: 0.5,
            avg_bet: 1.0,
        }
    }

    fn entry(best: Action, ev_delta: f64, matches: bool) -> EvLookupEntry {
        let mut ev_values = BTreeMap::new();
        ev_values.insert(Action::Hit, stats(-0.2));
        ev_values.insert(Action::Stand, stats(-0.2 - ev_delta));
        EvLookupEntry {
            best_action: best,
            ev_values,
            ev_delta,
            strategy_action: Action::Hit,
            matches_strategy: matches,
        }
    }

    #[test]
    fn keys_sort_player_ranks_by_label() {
        let key = CanonicalKey::new(Rank::Ace, Rank::Eight, Rank::Six);
        assert_eq!(key.to_string(), "8,Avs6");
        let key = CanonicalKey::new(Rank::Two, Rank::Ten, Rank::Five);
        assert_eq!(key.to_string(), "10,2vs5");
        let key = CanonicalKey::new(Rank::Queen, Rank::Jack, Rank::Ace);
        assert_eq!(key.to_string(), "J,QvsA");
        assert_eq!(key.dealer_value(), 11);
    }

    #[test]
    fn keys_parse_in_either_order() {
        let a: CanonicalKey = "A,8vs6".parse().unwrap();
        let b: CanonicalKey = "8,Avs6".parse().unwrap();
        assert_eq!(a, b);
        assert!("8,A6".parse::<CanonicalKey>().is_err());
        assert!("8vs6".parse::<CanonicalKey>().is_err());
        assert!("8,Xvs6".parse::<CanonicalKey>().is_err());
    }

    #[test]
    fn there_are_1131_canonical_keys_without_naturals() {
        let keys = CanonicalKey::all();
        assert_eq!(keys.len(), 1131);
        assert!(keys.iter().all(|key| !key.is_natural()));
        let unique: std::collections::HashSet<String> =
            keys.iter().map(|key| key.to_string()).collect();
        assert_eq!(unique.len(), 1131);
    }

    #[test]
    fn from_cards_ignores_suit_and_order() {
        let hand = [
            Card::new(Rank::Six, Suit::Heart),
            Card::new(Rank::Ten, Suit::Club),
        ];
        let key = CanonicalKey::from_cards(&hand, &Card::new(Rank::Ten, Suit::Diamond)).unwrap();
        assert_eq!(key.to_string(), "10,6vs10");
        assert_eq!(key.player_cards()[0].suit, Suit::Spade);
        assert!(CanonicalKey::from_cards(&hand[..1], &Card::of(Rank::Two)).is_none());
    }

    #[test]
    fn reads_tables_with_extra_fields_and_legacy_rate_names() {
        let json = r#"{
            "10,6vs10": {
                "playerHand": "10,6",
                "dealerUp": "10",
                "category": "HARD",
                "total": 16,
                "bestAction": "Hit",
                "evValues": {
                    "Hit": {"ev": -0.54, "wr": 0.23, "pr": 0.0, "lr": 0.77},
                    "Stand": {"ev": -0.54, "winRate": 0.23, "pushRate": 0.0, "lossRate": 0.77, "avgBet": 1},
                    "Double": {"ev": -1.08, "winRate": 0.23, "pushRate": 0.0, "lossRate": 0.77, "avgBet": 2}
                },
                "evDelta": 0.003,
                "strategyAction": "Hit",
                "matchesStrategy": true
            }
        }"#;
        let table = EvLookupTable::from_json_str(json).unwrap();
        let hand = [Card::of(Rank::Ten), Card::of(Rank::Six)];
        let entry = table.lookup(&hand, &Card::of(Rank::Ten)).unwrap();
        assert_eq!(entry.best_action, Action::Hit);
        assert_eq!(entry.difficulty(), Difficulty::Hard);
        assert_eq!(entry.ev_of(Action::Double).unwrap().avg_bet, 2.0);
        assert!(entry.ev_of(Action::Split).is_none());
    }

    #[test]
    fn missing_keys_are_not_errors_at_lookup() {
        let table = EvLookupTable::default();
        let natural = [Card::of(Rank::Ace), Card::of(Rank::King)];
        assert!(table.lookup(&natural, &Card::of(Rank::Nine)).is_none());
        let three_cards = [Card::of(Rank::Two); 3];
        assert!(table.lookup(&three_cards, &Card::of(Rank::Nine)).is_none());
    }

    #[test]
    fn partial_tables_fail_validation() {
        let mut table = EvLookupTable::default();
        table.insert("10,6vs10".parse().unwrap(), entry(Action::Hit, 0.01, true));
        match table.validate() {
            Err(TableError::MissingKeys {
                missing, expected, ..
            }) => {
                assert_eq!(expected, 1131);
                assert_eq!(missing, 1130);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut full = EvLookupTable::default();
        for key in CanonicalKey::all() {
            full.insert(key, entry(Action::Hit, 0.1, true));
        }
        assert!(full.validate().is_ok());
    }

    #[test]
    fn distribution_and_mismatches() {
        let mut table = EvLookupTable::default();
        table.insert("10,2vs2".parse().unwrap(), entry(Action::Hit, 0.01, true));
        table.insert("10,2vs4".parse().unwrap(), entry(Action::Stand, 0.03, false));
        table.insert("10,8vs6".parse().unwrap(), entry(Action::Stand, 0.9, true));
        table.insert("5,6vs6".parse().unwrap(), entry(Action::Double, 0.4, true));

        let distribution = table.difficulty_distribution();
        assert_eq!(
            distribution,
            DifficultyDistribution {
                easy: 2,
                medium: 1,
                hard: 1
            }
        );
        assert_eq!(distribution.percentages(), [50, 25, 25]);

        let mismatches = table.mismatches();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].0, "10,2vs4");

        let hard = table.keys_with_difficulty(Difficulty::Hard);
        assert_eq!(hard, vec!["10,2vs2".parse::<CanonicalKey>().unwrap()]);
    }

    #[test]
    fn chart_cells_map_to_representative_keys() {
        let text = |category, total, up| {
            CanonicalKey::representative(category, total, up).map(|key| key.to_string())
        };
        assert_eq!(text(Category::Hard, 16, 10).as_deref(), Some("10,6vs10"));
        assert_eq!(text(Category::Hard, 7, 5).as_deref(), Some("2,5vs5"));
        assert_eq!(text(Category::Hard, 4, 2).as_deref(), Some("2,2vs2"));
        assert_eq!(text(Category::Hard, 20, 11).as_deref(), Some("10,10vsA"));
        assert_eq!(text(Category::Soft, 18, 9).as_deref(), Some("7,Avs9"));
        assert_eq!(text(Category::Pair, 11, 6).as_deref(), Some("A,Avs6"));
        assert_eq!(text(Category::Pair, 10, 10).as_deref(), Some("10,10vs10"));
        assert_eq!(text(Category::Hard, 21, 10), None);
        assert_eq!(text(Category::Soft, 12, 10), None);
        assert_eq!(text(Category::Hard, 16, 12), None);
        assert!(CanonicalKey::representative(Category::Soft, 21, 10)
            .unwrap()
            .is_natural());
    }

    #[test]
    fn cell_ev_reads_the_representative_entry() {
        let mut table = EvLookupTable::default();
        let mut twos = entry(Action::Split, 0.07, true);
        twos.ev_values.insert(Action::Split, stats(0.05));
        table.insert("2,2vs6".parse().unwrap(), twos);
        table.insert("10,6vs10".parse().unwrap(), entry(Action::Hit, 0.01, true));

        assert_eq!(table.cell_ev(Category::Pair, 2, 6), Some(0.05));
        assert_eq!(table.cell_ev(Category::Hard, 4, 6), Some(-0.2));
        assert_eq!(table.cell_ev(Category::Hard, 16, 10), Some(-0.2));
        assert_eq!(table.cell_ev(Category::Hard, 16, 9), None);
        assert_eq!(table.cell_ev(Category::Soft, 21, 10), None);
    }

    #[test]
    fn tables_round_trip_through_a_file() {
        let mut table = EvLookupTable::default();
        table.insert("9,9vs7".parse().unwrap(), entry(Action::Stand, 0.015, false));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evLookup.json");
        table.write_to_path(&path).unwrap();
        let read = EvLookupTable::from_path(&path).unwrap();
        assert_eq!(read, table);
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"evDelta\""));
    }
}

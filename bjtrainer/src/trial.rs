//! Timed drills: a fixed batch of pre-generated scenarios of mixed
//! difficulty, one graded decision each, scored for accuracy and speed.

use std::time::Duration;

use rand::Rng;
use strum_macros::EnumIter;

use crate::{
    decision::grade,
    difficulty::{Classifier, Difficulty},
    generator::{Scenario, ScenarioGenerator},
    Action,
};

pub const CORRECT_POINTS: i32 = 100;
pub const WRONG_POINTS: i32 = -50;
/// Answers within this many seconds carry no time penalty.
pub const FREE_SECONDS: f64 = 2.0;
pub const PENALTY_PER_SECOND: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum TrialMode {
    /// 10 decisions in 30 seconds.
    Sprint,
    /// 50 decisions in 150 seconds.
    Marathon,
}

impl TrialMode {
    pub fn scenario_count(self) -> usize {
        match self {
            TrialMode::Sprint => 10,
            TrialMode::Marathon => 50,
        }
    }

    pub fn time_limit(self) -> Duration {
        match self {
            TrialMode::Sprint => Duration::from_secs(30),
            TrialMode::Marathon => Duration::from_secs(150),
        }
    }
}

/// Points for one answer: +100 or -50, less 5 points per second taken
/// beyond the first two, rounded down.
pub fn score_decision(correct: bool, time_taken: Duration) -> i32 {
    let base = if correct { CORRECT_POINTS } else { WRONG_POINTS };
    let over = (time_taken.as_secs_f64() - FREE_SECONDS).max(0.0);
    base - (over * PENALTY_PER_SECOND).floor() as i32
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrialDecision {
    pub scenario: Scenario,
    pub chosen: Action,
    pub correct_action: Action,
    pub correct: bool,
    pub time_taken: Duration,
    pub points: i32,
}

#[derive(Debug, Clone)]
pub struct SpeedTrial {
    mode: TrialMode,
    scenarios: Vec<Scenario>,
    decisions: Vec<TrialDecision>,
    elapsed: Duration,
    score: i32,
}

impl SpeedTrial {
    /// Pre-generates every scenario, each at a uniformly drawn difficulty.
    pub fn new<C: Classifier, R: Rng + ?Sized>(
        mode: TrialMode,
        generator: &ScenarioGenerator<C>,
        rng: &mut R,
    ) -> Self {
        const DIFFICULTIES: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
        let mut scenarios = Vec::with_capacity(mode.scenario_count());
        for _ in 0..mode.scenario_count() {
            let difficulty = DIFFICULTIES[rng.gen_range(0..DIFFICULTIES.len())];
            scenarios.push(generator.generate(difficulty, rng));
        }
        SpeedTrial::from_scenarios(mode, scenarios)
    }

    pub fn from_scenarios(mode: TrialMode, scenarios: Vec<Scenario>) -> Self {
        SpeedTrial {
            mode,
            scenarios,
            decisions: Vec::new(),
            elapsed: Duration::ZERO,
            score: 0,
        }
    }

    pub fn mode(&self) -> TrialMode {
        self.mode
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// The scenario awaiting an answer, if the trial is still running.
    pub fn current(&self) -> Option<&Scenario> {
        if self.is_finished() {
            return None;
        }
        self.scenarios.get(self.decisions.len())
    }

    /// Grades `chosen` for the current scenario. `time_taken` is measured
    /// from the previous answer (or the start). An answer that would land
    /// after the time limit ends the trial instead and is not scored.
    pub fn answer(&mut self, chosen: Action, time_taken: Duration) -> Option<&TrialDecision> {
        let scenario = self.current()?.clone();
        let elapsed = self.elapsed + time_taken;
        if elapsed > self.mode.time_limit() {
            self.elapsed = self.mode.time_limit();
            return None;
        }
        self.elapsed = elapsed;

        let graded = grade(scenario.player_cards(), &scenario.dealer_up, chosen, true);
        let points = score_decision(graded.correct, time_taken);
        self.score += points;
        self.decisions.push(TrialDecision {
            scenario,
            chosen,
            correct_action: graded.correct_action,
            correct: graded.correct,
            time_taken,
            points,
        });
        self.decisions.last()
    }

    /// Lets the clock run without an answer, e.g. on a timer tick.
    pub fn advance(&mut self, by: Duration) {
        self.elapsed = (self.elapsed + by).min(self.mode.time_limit());
    }

    pub fn time_left(&self) -> Duration {
        self.mode.time_limit().saturating_sub(self.elapsed)
    }

    pub fn is_finished(&self) -> bool {
        self.decisions.len() >= self.scenarios.len() || self.time_left().is_zero()
    }

    pub fn decisions(&self) -> &[TrialDecision] {
        &self.decisions
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn correct_count(&self) -> usize {
        self.decisions.iter().filter(|decision| decision.correct).count()
    }

    /// Percentage of answered scenarios that were correct; 0 before any.
    pub fn accuracy(&self) -> f64 {
        if self.decisions.is_empty() {
            return 0.0;
        }
        self.correct_count() as f64 * 100.0 / self.decisions.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Card, Rank};
    use crate::difficulty::PatternClassifier;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scenario(a: Rank, b: Rank, up: Rank) -> Scenario {
        Scenario::new(vec![Card::of(a), Card::of(b)], Card::of(up))
    }

    #[test]
    fn scoring_rewards_accuracy_and_speed() {
        assert_eq!(score_decision(true, Duration::from_millis(1500)), 100);
        assert_eq!(score_decision(true, Duration::from_secs(2)), 100);
        assert_eq!(score_decision(true, Duration::from_millis(3500)), 93);
        assert_eq!(score_decision(false, Duration::from_millis(500)), -50);
        assert_eq!(score_decision(false, Duration::from_secs(4)), -60);
    }

    #[test]
    fn modes_set_batch_size_and_clock() {
        assert_eq!(TrialMode::Sprint.scenario_count(), 10);
        assert_eq!(TrialMode::Sprint.time_limit(), Duration::from_secs(30));
        assert_eq!(TrialMode::Marathon.scenario_count(), 50);
        assert_eq!(TrialMode::Marathon.time_limit(), Duration::from_secs(150));
    }

    #[test]
    fn pre_generates_non_natural_scenarios() {
        let generator = ScenarioGenerator::new(PatternClassifier);
        let mut rng = StdRng::seed_from_u64(21);
        let trial = SpeedTrial::new(TrialMode::Marathon, &generator, &mut rng);
        assert_eq!(trial.scenarios().len(), 50);
        assert!(trial
            .scenarios()
            .iter()
            .all(|scenario| !scenario.player.is_natural()));
        assert_eq!(trial.current(), trial.scenarios().first());
    }

    #[test]
    fn answers_are_graded_and_summed() {
        let scenarios = vec![
            scenario(Rank::Ten, Rank::Six, Rank::Ten),
            scenario(Rank::Eight, Rank::Eight, Rank::Six),
            scenario(Rank::Five, Rank::Six, Rank::Five),
        ];
        let mut trial = SpeedTrial::from_scenarios(TrialMode::Sprint, scenarios);

        let first = trial.answer(Action::Stand, Duration::from_secs(1)).unwrap();
        assert!(!first.correct);
        assert_eq!(first.correct_action, Action::Hit);
        assert_eq!(first.points, -50);

        let second = trial.answer(Action::Split, Duration::from_secs(3)).unwrap();
        assert!(second.correct);
        assert_eq!(second.points, 95);

        trial.answer(Action::Double, Duration::from_secs(1)).unwrap();
        assert!(trial.is_finished());
        assert!(trial.current().is_none());
        assert!(trial.answer(Action::Hit, Duration::from_secs(1)).is_none());
        assert_eq!(trial.score(), -50 + 95 + 100);
        assert_eq!(trial.correct_count(), 2);
        assert!((trial.accuracy() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(trial.time_left(), Duration::from_secs(25));
    }

    #[test]
    fn the_clock_ends_the_trial() {
        let scenarios = vec![
            scenario(Rank::Ten, Rank::Six, Rank::Ten),
            scenario(Rank::Ten, Rank::Seven, Rank::Ten),
        ];
        let mut trial = SpeedTrial::from_scenarios(TrialMode::Sprint, scenarios);
        assert_eq!(trial.accuracy(), 0.0);
        trial.advance(Duration::from_secs(20));
        assert!(trial.answer(Action::Hit, Duration::from_secs(5)).is_some());
        assert!(trial.answer(Action::Stand, Duration::from_secs(6)).is_none());
        assert!(trial.is_finished());
        assert_eq!(trial.decisions().len(), 1);
        assert_eq!(trial.time_left(), Duration::ZERO);
    }
}

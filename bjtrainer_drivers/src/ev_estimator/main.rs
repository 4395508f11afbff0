use std::path::PathBuf;

use anyhow::{bail, Context};
use bjtrainer::{
    grade, Action, Card, Classifier, EvDeltaClassifier, EvLookupTable, EvSimulator, InfiniteShoe,
    PatternClassifier, Rule, BASIC_STRATEGY,
};
use bjtrainer_drivers::{init_logging, load_config, DEFAULT_CONFIG_PATH};
use clap::{Parser, ValueEnum};
use tracing::debug;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
    Hit,
    Stand,
    Double,
    Split,
    Surrender,
}

impl From<ActionArg> for Action {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Hit => Action::Hit,
            ActionArg::Stand => Action::Stand,
            ActionArg::Double => Action::Double,
            ActionArg::Split => Action::Split,
            ActionArg::Surrender => Action::Surrender,
        }
    }
}

/// Grades a move and estimates what it costs against basic strategy.
#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// Player cards, e.g. `8,8` or `A♠,7♥`
    #[arg(long, value_delimiter = ',', required = true)]
    hand: Vec<Card>,

    /// Dealer upcard
    #[arg(short, long)]
    dealer: Card,

    /// The move to grade; defaults to the basic-strategy move
    #[arg(short, long, value_enum)]
    action: Option<ActionArg>,

    /// Monte Carlo trials per action
    #[arg(short, long, value_name = "N")]
    trials: Option<u32>,

    /// Precomputed EV lookup table
    #[arg(long, value_name = "PATH")]
    table: Option<PathBuf>,

    /// Seed the shoe for a reproducible estimate
    #[arg(short, long)]
    seed: Option<u64>,

    /// Treat the hand as already split (no further splitting)
    #[arg(long)]
    no_split: bool,
}

fn main() -> anyhow::Result<()> {
    let args = CommandLineArgs::parse();
    let config = load_config(&args.config)?;
    init_logging(&config.logging)?;
    if args.hand.len() < 2 {
        bail!("a hand needs at least two cards");
    }

    let rule: Rule = config.rule.clone().try_into()?;
    let allow_split = !args.no_split;
    let hand = args.hand.as_slice();
    let dealer_up = &args.dealer;
    let hand_text = hand
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    println!("{} vs {}", hand_text, dealer_up);

    let advice = BASIC_STRATEGY.best_action(hand, dealer_up, allow_split);
    println!("Basic strategy: {} ({})", advice.action, advice.note);

    let table_path = args.table.or_else(|| config.ev_estimator.table.clone());
    let table = match table_path {
        Some(path) => Some(
            EvLookupTable::from_path(&path)
                .with_context(|| format!("failed to load {}", path.display()))?,
        ),
        None => None,
    };
    let difficulty = match &table {
        Some(table) => EvDeltaClassifier::new(table).classify(hand, dealer_up),
        None => PatternClassifier.classify(hand, dealer_up),
    };
    println!("Difficulty: {:?}", difficulty);

    if let Some(entry) = table.as_ref().and_then(|table| table.lookup(hand, dealer_up)) {
        println!(
            "Table: best {} by {:.4} (chart says {})",
            entry.best_action, entry.ev_delta, entry.strategy_action
        );
        for (action, stats) in &entry.ev_values {
            println!(
                "  {:<8} EV {:+.4}  W {:.3} P {:.3} L {:.3}",
                action.to_string(),
                stats.ev,
                stats.win_rate,
                stats.push_rate,
                stats.loss_rate
            );
        }
    }

    let chosen: Action = args.action.map(Action::from).unwrap_or(advice.action);
    let decision = grade(hand, dealer_up, chosen, allow_split);
    println!(
        "{}: {} is {}",
        decision.key(),
        chosen,
        if decision.correct { "correct" } else { "a mistake" }
    );
    if let Some(tip) = decision.tip() {
        println!("{}", tip);
    }
    if let Some(hint) = decision.hint() {
        println!("{} {}", bjtrainer::decision::edge_text(hint.edge), hint.blurb);
    }

    let trials = args.trials.unwrap_or(config.ev_estimator.trials);
    let mut shoe = match args.seed {
        Some(seed) => InfiniteShoe::with_seed(seed),
        None => InfiniteShoe::from_entropy(),
    };
    debug!(trials, seed = ?args.seed, "estimating EV");
    let comparison = EvSimulator::new(rule, &BASIC_STRATEGY).compare(
        hand,
        dealer_up,
        advice.action,
        chosen,
        trials,
        &mut shoe,
    )?;
    println!(
        "EV {} {:+.4} vs {} {:+.4} (cost {:.4} over {} trials)",
        comparison.best_action,
        comparison.best.ev,
        comparison.chosen_action,
        comparison.chosen.ev,
        comparison.delta,
        trials
    );
    Ok(())
}

//! Runs the interactive EV comparison off the caller's thread.
//!
//! Each submission gets a ticket. Only the newest ticket's result is ever
//! handed back, and only once; older results are dropped when they arrive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    card::Card,
    shoe::InfiniteShoe,
    simulation::{EvComparison, EvSimulator, SimulationError},
    strategy::BASIC_STRATEGY,
    Action, Rule, INTERACTIVE_TRIALS,
};

/// "What did choosing `chosen` cost here?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvRequest {
    pub hand: Vec<Card>,
    pub dealer_up: Card,
    pub chosen: Action,
    pub allow_split: bool,
    pub trials: u32,
}

impl EvRequest {
    pub fn new(hand: &[Card], dealer_up: Card, chosen: Action) -> Self {
        EvRequest {
            hand: hand.to_vec(),
            dealer_up,
            chosen,
            allow_split: true,
            trials: INTERACTIVE_TRIALS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvAnswer {
    pub ticket: u64,
    pub result: Result<EvComparison, SimulationError>,
}

type Message = (u64, Result<EvComparison, SimulationError>);

pub struct BackgroundEstimator {
    rule: Rule,
    seed: Option<u64>,
    latest: Arc<AtomicU64>,
    delivered: u64,
    sender: Sender<Message>,
    receiver: Receiver<Message>,
}

impl BackgroundEstimator {
    pub fn new(rule: Rule) -> Self {
        let (sender, receiver) = mpsc::channel();
        BackgroundEstimator {
            rule,
            seed: None,
            latest: Arc::new(AtomicU64::new(0)),
            delivered: 0,
            sender,
            receiver,
        }
    }

    /// Seeds every request's shoe from `seed` and its ticket.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Starts estimating `request` and supersedes anything still running.
    pub fn submit(&mut self, request: EvRequest) -> u64 {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.latest);
        let sender = self.sender.clone();
        let rule = self.rule;
        let seed = self.seed;
        std::thread::spawn(move || {
            let mut shoe = match seed {
                Some(seed) => InfiniteShoe::with_seed(seed.wrapping_add(ticket)),
                None => InfiniteShoe::from_entropy(),
            };
            let best = BASIC_STRATEGY
                .best_action(&request.hand, &request.dealer_up, request.allow_split)
                .action;
            let result = EvSimulator::new(rule, &BASIC_STRATEGY).compare(
                &request.hand,
                &request.dealer_up,
                best,
                request.chosen,
                request.trials,
                &mut shoe,
            );
            if latest.load(Ordering::SeqCst) == ticket {
                // The estimator may already be gone; nothing to report then.
                let _ = sender.send((ticket, result));
            } else {
                tracing::debug!(ticket, "discarding superseded EV estimate");
            }
        });
        ticket
    }

    pub fn latest_ticket(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    fn accept(&mut self, (ticket, result): Message) -> Option<EvAnswer> {
        if ticket == self.latest_ticket() && ticket > self.delivered {
            self.delivered = ticket;
            Some(EvAnswer { ticket, result })
        } else {
            None
        }
    }

    /// The latest result if it has arrived and was not handed out before.
    pub fn poll(&mut self) -> Option<EvAnswer> {
        let mut answer = None;
        while let Ok(message) = self.receiver.try_recv() {
            if let Some(accepted) = self.accept(message) {
                answer = Some(accepted);
            }
        }
        answer
    }

    /// Blocks up to `timeout` for the latest result.
    pub fn wait(&mut self, timeout: Duration) -> Option<EvAnswer> {
        if self.delivered == self.latest_ticket() {
            return None;
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(message) => {
                    if let Some(answer) = self.accept(message) {
                        return Some(answer);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }
}

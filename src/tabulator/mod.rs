//! Single Transferable Vote counting.
//!
//! A count runs in rounds. Each round either elects the highest candidate
//! that reached the threshold and transfers its surplus, elects every
//! continuing candidate when they no more than fill the open seats, or
//! eliminates the lowest candidate. When electing all of them would break a
//! constituency quota, only the highest is elected that round. Constituency
//! quotas are enforced after every election, and orphan constituencies are
//! served round robin once no candidate is continuing.

pub mod constituency;
pub mod quota;
pub mod round_robin;
pub mod state;
pub mod tie_break;
pub mod transfer;

pub use quota::ThresholdFormula;
pub use state::{CountState, Seat, StateSnapshot};
pub use tie_break::{TieBreakMode, TieBreaker};

use crate::model::election::{CandidateId, CandidateStatus, Election};
use crate::model::votes::Votes;
use crate::model::ModelError;
use crate::report::trace::{Entry, Tag, Trace, TraceEvent};
use num_bigint::BigInt;
use num_rational::BigRational;
use serde::{Deserialize, Serialize};
use tracing::debug;
use transfer::TransferMode;

#[derive(Debug, thiserror::Error)]
pub enum CountError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("No manual choice left to break the tie among [{}] for {action}", .options.join(", "))]
    MissingManualChoice { action: Tag, options: Vec<String> },
    #[error("Manual choice {index} is out of range for [{}]", .options.join(", "))]
    InvalidManualChoice { index: usize, options: Vec<String> },
    #[error("Count deadlocked in round {}: {reason}", .snapshot.round)]
    Deadlock {
        reason: String,
        snapshot: Box<StateSnapshot>,
    },
}

impl From<ModelError> for CountError {
    fn from(err: ModelError) -> Self {
        CountError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CountError>;

/// Everything a count needs besides the election itself.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub seats: usize,
    pub threshold: ThresholdFormula,
    pub tie_break: TieBreakMode,
}

impl Options {
    pub fn new(seats: usize) -> Self {
        Options {
            seats,
            ..Options::default()
        }
    }

    pub fn with_threshold(mut self, threshold: ThresholdFormula) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.tie_break = TieBreakMode::Seeded(Some(seed));
        self
    }

    pub fn with_manual_choices(mut self, choices: Vec<usize>) -> Self {
        self.tie_break = TieBreakMode::Manual(choices);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Every seat was filled.
    Filled,
    /// Every candidate was elected and seats are still open.
    Undersubscribed { unfilled: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub candidate: CandidateId,
    pub status: CandidateStatus,
    pub votes: Votes,
}

#[derive(Debug, Clone)]
pub struct CountResult {
    pub threshold: u64,
    pub seats: usize,
    pub seed: Option<u64>,
    pub rounds: u32,
    pub outcome: Outcome,
    /// Seats in the order they were filled.
    pub elected: Vec<Seat>,
    /// Final status of every candidate, in registration order.
    pub standings: Vec<Standing>,
    pub exhausted: Votes,
    pub trace: Trace,
}

impl CountResult {
    pub fn elected_names<'a>(&self, election: &'a Election) -> Vec<&'a str> {
        self.elected
            .iter()
            .map(|seat| election.name(seat.candidate))
            .collect()
    }
}

/// Elects `candidate` with `votes` and applies its constituency's quota.
pub(crate) fn elect(
    state: &mut CountState,
    election: &Election,
    candidate: CandidateId,
    votes: BigRational,
    trace: &mut Trace,
) {
    trace.record(TraceEvent::Elect(Entry::new(election.name(candidate), &votes)));
    state.mark_elected(election, candidate, votes);
    constituency::enforce_quota(state, election, candidate, trace);
}

/// Rounds after which a count is declared stuck: `(candidates + 1)^2 + seats`.
fn round_limit(candidates: usize, seats: usize) -> u64 {
    let side = (candidates as u64).saturating_add(1);
    side.saturating_mul(side).saturating_add(seats as u64)
}

/// Runs one count over a borrowed election.
pub struct CountEngine<'e> {
    election: &'e Election,
    state: CountState,
    tie: TieBreaker,
    trace: Trace,
    threshold: BigRational,
    max_rounds: u64,
    outcome: Option<Outcome>,
}

impl<'e> CountEngine<'e> {
    pub fn new(election: &'e Election, options: &Options) -> Result<Self> {
        let threshold = options
            .threshold
            .threshold(election.ballots().len(), options.seats)?;
        let tie = TieBreaker::new(&options.tie_break);
        let mut trace = Trace::new();
        if let Some(seed) = tie.seed() {
            trace.record(TraceEvent::Seed(seed));
        }
        trace.record(TraceEvent::Threshold(threshold));

        Ok(CountEngine {
            election,
            state: CountState::new(election, options.seats, threshold),
            tie,
            trace,
            threshold: BigRational::from_integer(BigInt::from(threshold)),
            max_rounds: round_limit(election.candidates().len(), options.seats),
            outcome: None,
        })
    }

    pub fn state(&self) -> &CountState {
        &self.state
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Runs one round. Returns the outcome once the count is over.
    pub fn step(&mut self) -> Result<Option<Outcome>> {
        if let Some(outcome) = self.outcome {
            return Ok(Some(outcome));
        }
        if self.state.seats_remaining() == 0 {
            return Ok(Some(self.finish(Outcome::Filled)));
        }
        if u64::from(self.state.round) > self.max_rounds {
            return Err(self.deadlock(format!(
                "no decision after {} rounds",
                self.max_rounds
            )));
        }

        if self.state.continuing_count() == 0 {
            if !round_robin::orphans(&self.state, self.election).is_empty() {
                self.trace.record(TraceEvent::Round(self.state.round));
                round_robin::allocate(
                    &mut self.state,
                    self.election,
                    &mut self.tie,
                    &mut self.trace,
                )?;
                return Ok(self.end_round());
            }
            let zombies_available = self
                .state
                .eliminated()
                .iter()
                .any(|c| self.state.has_capacity(self.election, *c));
            if !zombies_available {
                return self.stall().map(Some);
            }
            self.trace.record(TraceEvent::Round(self.state.round));
            constituency::reinstate_zombies(&mut self.state, self.election, &mut self.trace);
        } else {
            self.trace.record(TraceEvent::Round(self.state.round));
        }

        self.count_round()?;
        Ok(self.end_round())
    }

    /// Runs the count to completion.
    pub fn run(mut self) -> Result<CountResult> {
        while self.step()?.is_none() {}
        Ok(self.into_result())
    }

    fn count_round(&mut self) -> Result<()> {
        let continuing = self.state.continuing();
        self.record_count(&continuing);

        let mut ranked = continuing.clone();
        ranked.sort_by(|a, b| self.state.total(*b).cmp(self.state.total(*a)));

        let top = self.state.total(ranked[0]).clone();
        if top >= self.threshold {
            let tied = self.tied(ranked.iter().copied(), &top);
            let winner = self.choose(&tied, Tag::Elect)?;
            let votes = self.state.total(winner).clone();
            let surplus = &votes - &self.threshold;
            elect(&mut self.state, self.election, winner, votes, &mut self.trace);
            transfer::transfer(
                &mut self.state,
                self.election,
                winner,
                TransferMode::Surplus(surplus),
                &mut self.trace,
            );
            return Ok(());
        }

        if continuing.len() <= self.state.seats_remaining() {
            if self.all_fit(&continuing) {
                return self.elect_all(ranked);
            }
            self.trace.record(TraceEvent::Comment(
                "constituency quotas prevent electing every continuing candidate".to_string(),
            ));
            return self.elect_highest(&ranked, top);
        }

        let bottom = self.state.total(ranked[ranked.len() - 1]).clone();
        let tied = self.tied(ranked.iter().rev().copied(), &bottom);
        let loser = self.choose(&tied, Tag::Eliminate)?;
        self.trace.record(TraceEvent::Eliminate(Entry::new(
            self.election.name(loser),
            self.state.total(loser),
        )));
        self.state.mark_eliminated(loser);
        transfer::transfer(
            &mut self.state,
            self.election,
            loser,
            TransferMode::Full,
            &mut self.trace,
        );
        Ok(())
    }

    /// Elects continuing candidates highest first until none are left.
    fn elect_all(&mut self, mut ranked: Vec<CandidateId>) -> Result<()> {
        while !ranked.is_empty() && self.state.seats_remaining() > 0 {
            let top = self.state.total(ranked[0]).clone();
            let tied = self.tied(ranked.iter().copied(), &top);
            let winner = self.choose(&tied, Tag::Elect)?;
            elect(&mut self.state, self.election, winner, top, &mut self.trace);
            let state = &self.state;
            ranked.retain(|c| *c != winner && state.is_continuing(*c));
        }
        Ok(())
    }

    /// Elects the highest of `ranked` below the threshold. Its constituency
    /// rivals are removed, and any seats the rest cannot fill go round robin
    /// once nobody is continuing.
    fn elect_highest(&mut self, ranked: &[CandidateId], top: BigRational) -> Result<()> {
        let tied = self.tied(ranked.iter().copied(), &top);
        let winner = self.choose(&tied, Tag::Elect)?;
        self.trace.record(TraceEvent::Elect(Entry::new(self.election.name(winner), &top)));
        self.state.mark_elected(self.election, winner, top);
        constituency::remove_rivals(&mut self.state, self.election, winner, &mut self.trace);
        Ok(())
    }

    /// Whether electing every one of `continuing` keeps each constituency
    /// within its quota.
    fn all_fit(&self, continuing: &[CandidateId]) -> bool {
        self.election.constituency_ids().all(|id| {
            let constituency = self.election.constituency(id);
            match constituency.seat_quota {
                None => true,
                Some(quota) => {
                    let running = continuing
                        .iter()
                        .filter(|c| self.election.constituency_of(**c) == Some(id))
                        .count();
                    self.state.elected_in(id) + running <= quota
                }
            }
        })
    }

    fn tied<I>(&self, ranked: I, value: &BigRational) -> Vec<CandidateId>
    where
        I: Iterator<Item = CandidateId>,
    {
        ranked
            .take_while(|c| self.state.total(*c) == value)
            .collect()
    }

    fn choose(&mut self, tied: &[CandidateId], action: Tag) -> Result<CandidateId> {
        if tied.len() == 1 {
            return Ok(tied[0]);
        }
        let names: Vec<String> = tied
            .iter()
            .map(|c| self.election.name(*c).to_string())
            .collect();
        let index = self.tie.pick(action, &names)?;
        self.trace.record(TraceEvent::Random {
            selected: names[index].clone(),
            among: names,
            action,
        });
        Ok(tied[index])
    }

    fn record_count(&mut self, continuing: &[CandidateId]) {
        let mut tallies: Vec<Entry> = continuing
            .iter()
            .map(|c| Entry::new(self.election.name(*c), self.state.total(*c)))
            .collect();
        tallies.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));
        self.trace.record(TraceEvent::Count(tallies));
    }

    fn end_round(&mut self) -> Option<Outcome> {
        debug!(
            "Round {} done: {} elected, {} continuing",
            self.state.round,
            self.state.elected().len(),
            self.state.continuing_count()
        );
        self.state.round += 1;
        if self.state.seats_remaining() == 0 {
            Some(self.finish(Outcome::Filled))
        } else {
            None
        }
    }

    /// No candidate is continuing and nobody can be brought back.
    fn stall(&mut self) -> Result<Outcome> {
        let blocked = self
            .election
            .candidate_ids()
            .any(|c| self.state.status(c) != CandidateStatus::Elected);
        if blocked {
            return Err(self.deadlock(format!(
                "{} seats remain but constituency quotas exclude every remaining candidate",
                self.state.seats_remaining()
            )));
        }
        Ok(self.finish(Outcome::Undersubscribed {
            unfilled: self.state.seats_remaining(),
        }))
    }

    fn deadlock(&self, reason: String) -> CountError {
        CountError::Deadlock {
            reason,
            snapshot: Box::new(self.state.snapshot(self.election)),
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Outcome {
        self.outcome = Some(outcome);
        outcome
    }

    fn into_result(self) -> CountResult {
        let state = &self.state;
        let standings = self
            .election
            .candidate_ids()
            .map(|c| {
                let status = state.status(c);
                let votes = if status.is_continuing() {
                    state.total(c)
                } else {
                    state.final_total(c)
                };
                Standing {
                    candidate: c,
                    status,
                    votes: Votes::from(votes),
                }
            })
            .collect();
        CountResult {
            threshold: state.threshold(),
            seats: state.seats(),
            seed: self.tie.seed(),
            rounds: state.round().saturating_sub(1),
            outcome: self.outcome.unwrap_or(Outcome::Filled),
            elected: state.elected().to_vec(),
            standings,
            exhausted: Votes::from(state.exhausted_weight()),
            trace: self.trace,
        }
    }
}

/// Counts `election` to completion.
pub fn count(election: &Election, options: &Options) -> Result<CountResult> {
    CountEngine::new(election, options)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn election(ballots: &[&[&str]]) -> Election {
        let mut builder = Election::builder();
        for ballot in ballots {
            builder.add_ballot(ballot.iter()).unwrap();
        }
        builder.build().unwrap()
    }

    fn desserts() -> Election {
        election(&[
            &["Chocolate", "Strawberry"],
            &["Banana", "Sweets"],
            &["Banana", "Sweets"],
            &["Banana", "Strawberry"],
        ])
    }

    #[test]
    fn single_seat_elected_on_first_preferences() {
        let election = desserts();
        let result = count(&election, &Options::new(1).with_manual_choices(vec![])).unwrap();

        assert_eq!(result.threshold, 3);
        assert_eq!(result.elected_names(&election), vec!["Banana"]);
        assert_eq!(result.outcome, Outcome::Filled);
        assert_eq!(
            result.trace.lines().collect::<Vec<_>>(),
            vec![
                "^THRESHOLD 3",
                "@ROUND 1",
                ".COUNT Banana = 3;Chocolate = 1;Strawberry = 0;Sweets = 0",
                "+ELECT Banana = 3",
            ]
        );
    }

    #[test]
    fn two_seats_transfer_surplus_then_shortcut() {
        let election = desserts();
        let result = count(&election, &Options::new(2).with_manual_choices(vec![])).unwrap();

        assert_eq!(result.threshold, 2);
        assert_eq!(result.elected_names(&election), vec!["Banana", "Chocolate"]);
        assert_eq!(result.elected[1].round, 4);
        assert_eq!(result.exhausted, Votes::whole(1));
        assert_eq!(
            result.trace.lines().collect::<Vec<_>>(),
            vec![
                "^THRESHOLD 2",
                "@ROUND 1",
                ".COUNT Banana = 3;Chocolate = 1;Strawberry = 0;Sweets = 0",
                "+ELECT Banana = 3",
                ">TRANSFER from Banana to Sweets 2 * 1/3 = 2/3",
                ">TRANSFER from Banana to Strawberry 1 * 1/3 = 1/3",
                "@ROUND 2",
                ".COUNT Chocolate = 1;Sweets = 2/3;Strawberry = 1/3",
                "-ELIMINATE Strawberry = 1/3",
                "@ROUND 3",
                ".COUNT Chocolate = 1;Sweets = 2/3",
                "-ELIMINATE Sweets = 2/3",
                "@ROUND 4",
                ".COUNT Chocolate = 1",
                "+ELECT Chocolate = 1",
            ]
        );
    }

    #[test]
    fn weight_is_conserved_after_every_round() {
        let election = desserts();
        let mut engine = CountEngine::new(&election, &Options::new(2).with_seed(3)).unwrap();
        loop {
            let done = engine.step().unwrap();
            assert_eq!(
                &engine.state().accounted_weight(),
                engine.state().initial_weight()
            );
            if done.is_some() {
                break;
            }
        }
    }

    #[test]
    fn seeded_run_starts_with_seed_record() {
        let election = desserts();
        let result = count(&election, &Options::new(1).with_seed(0xbeef)).unwrap();
        assert_eq!(result.trace.events()[0], TraceEvent::Seed(0xbeef));
        assert_eq!(result.seed, Some(0xbeef));
    }

    #[test]
    fn more_seats_than_candidates_is_undersubscribed() {
        let election = election(&[&["A"], &["A"], &["B"]]);
        let result = count(&election, &Options::new(3).with_manual_choices(vec![])).unwrap();

        assert_eq!(result.elected_names(&election), vec!["A", "B"]);
        assert_eq!(result.outcome, Outcome::Undersubscribed { unfilled: 1 });
    }

    #[test]
    fn round_limit_saturates() {
        assert_eq!(round_limit(4, 2), 27);
        assert_eq!(round_limit(usize::MAX, usize::MAX), u64::MAX);
    }

    #[test]
    fn zero_seats_is_rejected_before_counting() {
        let election = desserts();
        assert!(matches!(
            CountEngine::new(&election, &Options::new(0)),
            Err(CountError::Configuration(_))
        ));
    }
}

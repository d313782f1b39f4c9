use crate::model::election::{CandidateId, CandidateStatus, ConstituencyId, Election};
use crate::model::votes::Votes;
use num_rational::BigRational;
use num_traits::{One, Zero};
use serde::Serialize;

/// A ballot as the count sees it: fixed preferences plus mutable weight and
/// cursor.
#[derive(Debug, Clone)]
pub struct LiveBallot {
    pub(crate) preferences: Vec<CandidateId>,
    pub(crate) weight: BigRational,
    pub(crate) cursor: usize,
    pub(crate) exhausted: bool,
}

impl LiveBallot {
    pub fn weight(&self) -> &BigRational {
        &self.weight
    }

    /// The candidate currently holding the ballot, if it is not exhausted.
    pub fn holder(&self) -> Option<CandidateId> {
        if self.exhausted {
            None
        } else {
            self.preferences.get(self.cursor).copied()
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// One elected seat, in election order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Seat {
    pub candidate: CandidateId,
    pub round: u32,
    pub votes: Votes,
}

/// The mutable working set of a single count.
///
/// Owned by one count run; every component receives it by reference.
#[derive(Debug, Clone)]
pub struct CountState {
    pub(crate) round: u32,
    pub(crate) seats: usize,
    pub(crate) threshold: u64,
    statuses: Vec<CandidateStatus>,
    pub(crate) totals: Vec<BigRational>,
    final_totals: Vec<BigRational>,
    pub(crate) piles: Vec<Vec<usize>>,
    pub(crate) ballots: Vec<LiveBallot>,
    pub(crate) exhausted: BigRational,
    initial_weight: BigRational,
    elected: Vec<Seat>,
    eliminated: Vec<CandidateId>,
    constituency_elected: Vec<usize>,
}

impl CountState {
    /// Places every ballot with its first preference.
    pub fn new(election: &Election, seats: usize, threshold: u64) -> Self {
        let candidates = election.candidates().len();
        let mut totals = vec![BigRational::zero(); candidates];
        let mut piles = vec![Vec::new(); candidates];
        let mut ballots = Vec::with_capacity(election.ballots().len());
        let mut initial_weight = BigRational::zero();

        for (index, ballot) in election.ballots().iter().enumerate() {
            let first = ballot.preferences()[0];
            let weight = BigRational::one();
            totals[first.0] += &weight;
            initial_weight += &weight;
            piles[first.0].push(index);
            ballots.push(LiveBallot {
                preferences: ballot.preferences().to_vec(),
                weight,
                cursor: 0,
                exhausted: false,
            });
        }

        CountState {
            round: 1,
            seats,
            threshold,
            statuses: vec![CandidateStatus::Continuing; candidates],
            totals,
            final_totals: vec![BigRational::zero(); candidates],
            piles,
            ballots,
            exhausted: BigRational::zero(),
            initial_weight,
            elected: Vec::new(),
            eliminated: Vec::new(),
            constituency_elected: vec![0; election.constituencies().len()],
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn seats(&self) -> usize {
        self.seats
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn status(&self, id: CandidateId) -> CandidateStatus {
        self.statuses[id.0]
    }

    pub fn is_continuing(&self, id: CandidateId) -> bool {
        self.statuses[id.0].is_continuing()
    }

    pub fn total(&self, id: CandidateId) -> &BigRational {
        &self.totals[id.0]
    }

    /// The total a candidate held when it stopped continuing.
    pub fn final_total(&self, id: CandidateId) -> &BigRational {
        &self.final_totals[id.0]
    }

    /// Continuing candidates in registration order.
    pub fn continuing(&self) -> Vec<CandidateId> {
        (0..self.statuses.len())
            .map(CandidateId)
            .filter(|id| self.is_continuing(*id))
            .collect()
    }

    pub fn continuing_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_continuing()).count()
    }

    pub fn elected(&self) -> &[Seat] {
        &self.elected
    }

    pub fn seats_remaining(&self) -> usize {
        self.seats.saturating_sub(self.elected.len())
    }

    pub fn elected_in(&self, constituency: ConstituencyId) -> usize {
        self.constituency_elected[constituency.0]
    }

    /// Eliminated candidates, oldest elimination first.
    pub fn eliminated(&self) -> &[CandidateId] {
        &self.eliminated
    }

    pub fn ballots(&self) -> &[LiveBallot] {
        &self.ballots
    }

    pub fn exhausted_weight(&self) -> &BigRational {
        &self.exhausted
    }

    pub fn initial_weight(&self) -> &BigRational {
        &self.initial_weight
    }

    /// Candidate totals plus exhausted weight. Always equals
    /// [`CountState::initial_weight`] between rounds.
    pub fn accounted_weight(&self) -> BigRational {
        self.totals
            .iter()
            .fold(self.exhausted.clone(), |sum, total| sum + total)
    }

    /// Whether the constituency of `id` can still take a seat.
    pub fn has_capacity(&self, election: &Election, id: CandidateId) -> bool {
        match election.constituency_of(id) {
            None => true,
            Some(constituency) => match election.constituency(constituency).seat_quota {
                None => true,
                Some(quota) => self.elected_in(constituency) < quota,
            },
        }
    }

    pub(crate) fn mark_elected(&mut self, election: &Election, id: CandidateId, votes: BigRational) {
        self.statuses[id.0] = CandidateStatus::Elected;
        self.final_totals[id.0] = votes.clone();
        if let Some(constituency) = election.constituency_of(id) {
            self.constituency_elected[constituency.0] += 1;
        }
        self.elected.push(Seat {
            candidate: id,
            round: self.round,
            votes: Votes(votes),
        });
    }

    pub(crate) fn mark_eliminated(&mut self, id: CandidateId) {
        self.statuses[id.0] = CandidateStatus::Eliminated;
        self.final_totals[id.0] = self.totals[id.0].clone();
        self.eliminated.push(id);
    }

    pub(crate) fn mark_removed(&mut self, id: CandidateId) {
        self.statuses[id.0] = CandidateStatus::RemovedByQuota;
        self.final_totals[id.0] = self.totals[id.0].clone();
    }

    /// Brings an eliminated candidate back. Its total restarts from whatever
    /// ballots reach it from now on.
    pub(crate) fn reinstate(&mut self, id: CandidateId) {
        debug_assert_eq!(self.statuses[id.0], CandidateStatus::Eliminated);
        self.eliminated.retain(|other| *other != id);
        self.statuses[id.0] = CandidateStatus::Reinstated;
        self.totals[id.0] = BigRational::zero();
    }

    pub fn snapshot(&self, election: &Election) -> StateSnapshot {
        StateSnapshot {
            round: self.round,
            seats_remaining: self.seats_remaining(),
            candidates: election
                .candidate_ids()
                .map(|id| CandidateSnapshot {
                    name: election.name(id).to_string(),
                    status: self.status(id),
                    votes: Votes::from(self.total(id)),
                })
                .collect(),
            constituencies: election
                .constituency_ids()
                .map(|id| ConstituencySnapshot {
                    name: election.constituency(id).name.clone(),
                    elected: self.elected_in(id),
                    quota: election.constituency(id).seat_quota,
                })
                .collect(),
        }
    }
}

/// Point-in-time view of a count, attached to deadlock errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub round: u32,
    pub seats_remaining: usize,
    pub candidates: Vec<CandidateSnapshot>,
    pub constituencies: Vec<ConstituencySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateSnapshot {
    pub name: String,
    pub status: CandidateStatus,
    pub votes: Votes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstituencySnapshot {
    pub name: String,
    pub elected: usize,
    pub quota: Option<usize>,
}

use super::state::CountState;
use crate::model::election::{CandidateId, Election};
use crate::model::votes::Votes;
use crate::report::trace::{Trace, TraceEvent, Transfer};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use std::collections::HashMap;
use tracing::debug;

/// How much of each ballot moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferMode {
    /// The whole ballot weight (eliminations and quota removals).
    Full,
    /// Each ballot moves on at `surplus / total` of its weight.
    Surplus(BigRational),
}

struct Move {
    to: CandidateId,
    weight: BigRational,
    ballots: usize,
}

/// Moves every ballot held by `from` to its next continuing preference.
///
/// Ballots with no continuing preference left become exhausted; the share
/// they would have carried leaves the count for good. `from` keeps exactly the
/// part of its total that did not move.
pub fn transfer(
    state: &mut CountState,
    election: &Election,
    from: CandidateId,
    mode: TransferMode,
    trace: &mut Trace,
) {
    let total = state.totals[from.0].clone();
    let factor = match mode {
        TransferMode::Full => BigRational::one(),
        TransferMode::Surplus(surplus) => {
            if total.is_zero() || surplus.is_zero() {
                return;
            }
            surplus / &total
        }
    };

    let pile = std::mem::take(&mut state.piles[from.0]);
    let mut moves: Vec<Move> = Vec::new();
    let mut groups: HashMap<(CandidateId, BigRational), usize> = HashMap::new();
    let mut moved_out = BigRational::zero();
    let mut exhausted_ballots = 0usize;

    for index in pile {
        let next = {
            let ballot = &state.ballots[index];
            (ballot.cursor + 1..ballot.preferences.len())
                .find(|&position| state.is_continuing(ballot.preferences[position]))
        };
        let ballot = &mut state.ballots[index];
        let share = &ballot.weight * &factor;
        moved_out += &share;
        ballot.weight = share.clone();

        match next {
            Some(position) => {
                ballot.cursor = position;
                let to = ballot.preferences[position];
                state.piles[to.0].push(index);
                state.totals[to.0] += &share;
                let key = (to, share);
                let existing = groups.get(&key).copied();
                match existing {
                    Some(group) => moves[group].ballots += 1,
                    None => {
                        groups.insert(key.clone(), moves.len());
                        moves.push(Move {
                            to,
                            weight: key.1,
                            ballots: 1,
                        });
                    }
                }
            }
            None => {
                ballot.cursor = ballot.preferences.len();
                ballot.exhausted = true;
                state.exhausted += &share;
                exhausted_ballots += 1;
            }
        }
    }

    state.totals[from.0] -= moved_out;

    if exhausted_ballots > 0 {
        debug!(
            "{} ballots from {} exhausted",
            exhausted_ballots,
            election.name(from)
        );
    }

    for group in moves {
        let amount = &group.weight * BigRational::from_integer(BigInt::from(group.ballots));
        trace.record(TraceEvent::Transfer(Transfer {
            from: election.name(from).to_string(),
            to: election.name(group.to).to_string(),
            ballots: group.ballots,
            weight: Votes(group.weight),
            amount: Votes(amount),
        }));
    }
}

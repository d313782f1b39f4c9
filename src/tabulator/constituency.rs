//! Constituency seat limits and zombie reinstatement.

use super::state::CountState;
use super::transfer::{transfer, TransferMode};
use crate::model::election::{CandidateId, Election};
use crate::report::trace::{Entry, Trace, TraceEvent};

/// Runs after every election.
///
/// If the winner's constituency has reached its quota, the constituency's
/// other continuing candidates are removed, zombies are reinstated if too few
/// candidates remain, and the removed candidates' ballots move on at full
/// weight.
pub fn enforce_quota(
    state: &mut CountState,
    election: &Election,
    elected: CandidateId,
    trace: &mut Trace,
) {
    let removed = remove_filled(state, election, elected, trace);
    if removed.is_empty() {
        return;
    }
    reinstate_zombies(state, election, trace);
    transfer_removed(state, election, removed, trace);
}

/// Removes the winner's constituency rivals as [`enforce_quota`] does, but
/// brings back no zombies. Seats the continuing candidates cannot fill are
/// left to the round-robin allocator.
pub fn remove_rivals(
    state: &mut CountState,
    election: &Election,
    elected: CandidateId,
    trace: &mut Trace,
) {
    let removed = remove_filled(state, election, elected, trace);
    transfer_removed(state, election, removed, trace);
}

fn transfer_removed(
    state: &mut CountState,
    election: &Election,
    removed: Vec<CandidateId>,
    trace: &mut Trace,
) {
    for candidate in removed {
        transfer(state, election, candidate, TransferMode::Full, trace);
    }
}

fn remove_filled(
    state: &mut CountState,
    election: &Election,
    elected: CandidateId,
    trace: &mut Trace,
) -> Vec<CandidateId> {
    let constituency_id = match election.constituency_of(elected) {
        Some(id) => id,
        None => return Vec::new(),
    };
    let constituency = election.constituency(constituency_id);
    let quota = match constituency.seat_quota {
        Some(quota) => quota,
        None => return Vec::new(),
    };
    let filled = state.elected_in(constituency_id);
    if filled < quota {
        return Vec::new();
    }

    let removed: Vec<CandidateId> = constituency
        .members()
        .iter()
        .copied()
        .filter(|member| state.is_continuing(*member))
        .collect();
    for member in &removed {
        state.mark_removed(*member);
        trace.record(TraceEvent::Quota {
            candidate: election.name(*member).to_string(),
            constituency: constituency.name.clone(),
            elected: filled,
            quota,
        });
    }
    removed
}

/// Reinstates eliminated candidates, most recent first, until enough are
/// continuing to fill the open seats. Candidates whose constituency is full
/// stay eliminated.
pub fn reinstate_zombies(
    state: &mut CountState,
    election: &Election,
    trace: &mut Trace,
) -> Vec<CandidateId> {
    let mut reinstated = Vec::new();
    while state.continuing_count() < state.seats_remaining() {
        let zombie = state
            .eliminated()
            .iter()
            .rev()
            .copied()
            .find(|candidate| state.has_capacity(election, *candidate));
        match zombie {
            Some(candidate) => {
                state.reinstate(candidate);
                reinstated.push(candidate);
            }
            None => break,
        }
    }
    if !reinstated.is_empty() {
        trace.record(TraceEvent::Zombies(
            reinstated
                .iter()
                .map(|candidate| Entry::new(election.name(*candidate), state.total(*candidate)))
                .collect(),
        ));
    }
    reinstated
}

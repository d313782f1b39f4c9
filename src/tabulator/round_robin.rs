//! Seats for constituencies left with nobody elected and nobody continuing.

use super::state::CountState;
use super::tie_break::TieBreaker;
use super::{elect, Result};
use crate::model::election::{CandidateId, CandidateStatus, ConstituencyId, Election};
use crate::report::trace::{ConstituencySize, Entry, Tag, Trace, TraceEvent};

/// Constituencies with no elected member, no continuing member, and at least
/// one eliminated member that could still take a seat.
pub fn orphans(state: &CountState, election: &Election) -> Vec<ConstituencyId> {
    election
        .constituency_ids()
        .filter(|id| state.elected_in(*id) == 0)
        .filter(|id| {
            let members = election.constituency(*id).members();
            !members.iter().any(|m| state.is_continuing(*m))
                && members
                    .iter()
                    .any(|m| state.status(*m) == CandidateStatus::Eliminated)
        })
        .collect()
}

fn sized(election: &Election, id: ConstituencyId) -> ConstituencySize {
    let constituency = election.constituency(id);
    ConstituencySize {
        name: constituency.name.clone(),
        size: constituency.size,
    }
}

fn entries(state: &CountState, election: &Election, candidates: &[CandidateId]) -> Vec<Entry> {
    candidates
        .iter()
        .map(|c| Entry::new(election.name(*c), state.final_total(*c)))
        .collect()
}

/// Visits orphan constituencies, largest first, electing one member from
/// each per pass until the seats run out or no orphan has anyone left.
///
/// Members are ranked by the total they held when they were eliminated.
pub fn allocate(
    state: &mut CountState,
    election: &Election,
    tie: &mut TieBreaker,
    trace: &mut Trace,
) -> Result<()> {
    let mut order = orphans(state, election);
    if order.is_empty() {
        return Ok(());
    }

    let before: Vec<_> = order.iter().map(|id| sized(election, *id)).collect();
    tie.shuffle(&mut order, |id| election.constituency(*id).name.clone())?;
    let shuffled: Vec<_> = order.iter().map(|id| sized(election, *id)).collect();
    trace.record(TraceEvent::Shuffle {
        before,
        after: shuffled.clone(),
    });
    order.sort_by(|a, b| election.constituency(*b).size.cmp(&election.constituency(*a).size));
    let sorted: Vec<_> = order.iter().map(|id| sized(election, *id)).collect();
    trace.record(TraceEvent::Sort {
        before: shuffled,
        after: sorted.clone(),
    });
    trace.record(TraceEvent::RoundRobin(sorted));

    let mut pools: Vec<Vec<CandidateId>> = order
        .iter()
        .map(|id| {
            let mut pool: Vec<CandidateId> = election
                .constituency(*id)
                .members()
                .iter()
                .copied()
                .filter(|m| state.status(*m) == CandidateStatus::Eliminated)
                .collect();
            pool.sort_by(|a, b| state.final_total(*b).cmp(state.final_total(*a)));
            pool
        })
        .collect();
    let mut remaining: usize = pools.iter().map(Vec::len).sum();
    let mut turn = 0;

    while state.seats_remaining() > 0 && remaining > 0 {
        let (visited, chosen) = loop {
            let visited = turn;
            turn = (turn + 1) % order.len();
            let pool = &pools[visited];
            trace.record(TraceEvent::ConstituencyTurn {
                constituency: election.constituency(order[visited]).name.clone(),
                candidates: entries(state, election, pool),
            });
            if pool.is_empty() {
                continue;
            }
            let best = state.final_total(pool[0]).clone();
            let tied: Vec<CandidateId> = pool
                .iter()
                .copied()
                .take_while(|c| state.final_total(*c) == &best)
                .collect();
            let pick = if tied.len() > 1 {
                let among = entries(state, election, &tied);
                let labels: Vec<String> = among.iter().map(|e| e.name.clone()).collect();
                let index = tie.pick(Tag::Elect, &labels)?;
                trace.record(TraceEvent::RandomEntry {
                    selected: among[index].clone(),
                    among,
                    action: Tag::Elect,
                });
                tied[index]
            } else {
                tied[0]
            };
            break (visited, pick);
        };

        pools[visited].retain(|c| *c != chosen);
        remaining -= 1;
        let votes = state.final_total(chosen).clone();
        state.reinstate(chosen);
        elect(state, election, chosen, votes, trace);

        if !state.has_capacity(election, chosen) {
            remaining -= pools[visited].len();
            pools[visited].clear();
        }
    }
    Ok(())
}

use crate::model::election::{CandidateStatus, Election};
use crate::model::votes::Votes;
use crate::tabulator::{CountResult, Outcome};
use serde::{Deserialize, Serialize};
use trace::{Entry, Tag, Trace, TraceEvent};

pub mod parser;
pub mod trace;

/// Serializable summary of a finished count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountReport {
    pub threshold: u64,
    pub seats: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    pub rounds: u32,
    pub outcome: Outcome,
    pub elected: Vec<ElectedSeat>,
    pub candidates: Vec<CandidateResult>,
    pub exhausted: Votes,
    pub trace: Trace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectedSeat {
    pub candidate: String,
    pub round: u32,
    pub votes: Votes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constituency: Option<String>,
    pub status: CandidateStatus,
    pub votes: Votes,
}

impl CountReport {
    pub fn new(election: &Election, result: &CountResult) -> Self {
        let elected = result
            .elected
            .iter()
            .map(|seat| ElectedSeat {
                candidate: election.name(seat.candidate).to_string(),
                round: seat.round,
                votes: seat.votes.clone(),
            })
            .collect();
        let candidates = result
            .standings
            .iter()
            .map(|standing| CandidateResult {
                name: election.name(standing.candidate).to_string(),
                constituency: election
                    .constituency_of(standing.candidate)
                    .map(|id| election.constituency(id).name.clone()),
                status: standing.status,
                votes: standing.votes.clone(),
            })
            .collect();

        CountReport {
            threshold: result.threshold,
            seats: result.seats,
            seed: result.seed.map(|seed| format!("{:x}", seed)),
            rounds: result.rounds,
            outcome: result.outcome,
            elected,
            candidates,
            exhausted: result.exhausted.clone(),
            trace: result.trace.clone(),
        }
    }
}

/// What a saved trace says happened, without the election it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceSummary {
    pub seed: Option<u64>,
    pub threshold: Option<u64>,
    pub rounds: u32,
    pub elected: Vec<Entry>,
    pub eliminated: Vec<Entry>,
    pub removed_by_quota: Vec<String>,
    pub reinstated: Vec<String>,
    pub transfers: usize,
    pub random_choices: usize,
    pub round_robin: bool,
    pub comments: Vec<String>,
}

impl TraceSummary {
    pub fn from_trace(trace: &Trace) -> Self {
        let mut summary = TraceSummary::default();
        for event in trace.events() {
            match event {
                TraceEvent::Seed(seed) => summary.seed = Some(*seed),
                TraceEvent::Threshold(threshold) => summary.threshold = Some(*threshold),
                TraceEvent::Round(round) => summary.rounds = summary.rounds.max(*round),
                TraceEvent::Elect(entry) => summary.elected.push(entry.clone()),
                TraceEvent::Eliminate(entry) => summary.eliminated.push(entry.clone()),
                TraceEvent::Quota { candidate, .. } => {
                    summary.removed_by_quota.push(candidate.clone())
                }
                TraceEvent::Zombies(entries) => summary
                    .reinstated
                    .extend(entries.iter().map(|e| e.name.clone())),
                TraceEvent::Transfer(_) => summary.transfers += 1,
                TraceEvent::Random { .. } | TraceEvent::RandomEntry { .. } => {
                    summary.random_choices += 1
                }
                TraceEvent::RoundRobin(_) => summary.round_robin = true,
                TraceEvent::Comment(text) => summary.comments.push(text.clone()),
                _ => {}
            }
        }
        summary
    }

    /// Number of records of each kind, in sigil order, skipping absent ones.
    pub fn tag_counts(trace: &Trace) -> Vec<(Tag, usize)> {
        Tag::ALL
            .iter()
            .map(|tag| {
                let n = trace.events().iter().filter(|e| e.tag() == *tag).count();
                (*tag, n)
            })
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabulator::{count, Options};

    fn desserts() -> Election {
        let mut builder = Election::builder();
        builder.add_ballot(&["Chocolate", "Strawberry"]).unwrap();
        builder.add_ballot(&["Banana", "Sweets"]).unwrap();
        builder.add_ballot(&["Banana", "Sweets"]).unwrap();
        builder.add_ballot(&["Banana", "Strawberry"]).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn report_serializes_exact_votes_as_strings() {
        let election = desserts();
        let result = count(&election, &Options::new(2).with_seed(7)).unwrap();
        let report = CountReport::new(&election, &result);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["threshold"], 2);
        assert_eq!(json["seed"], "7");
        assert_eq!(json["elected"][0]["candidate"], "Banana");
        assert_eq!(json["elected"][0]["votes"], "3");
        assert_eq!(json["outcome"]["kind"], "filled");
        assert_eq!(json["trace"][0]["tag"], "SEED");

        let back: CountReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn summary_follows_the_trace() {
        let election = desserts();
        let result = count(&election, &Options::new(2).with_manual_choices(vec![])).unwrap();
        let summary = TraceSummary::from_trace(&result.trace);

        assert_eq!(summary.threshold, Some(2));
        assert_eq!(summary.seed, None);
        assert_eq!(summary.rounds, 4);
        let elected: Vec<_> = summary.elected.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(elected, vec!["Banana", "Chocolate"]);
        assert_eq!(summary.eliminated.len(), 2);
        assert_eq!(summary.transfers, 2);
        assert_eq!(summary.random_choices, 0);

        let counts = TraceSummary::tag_counts(&result.trace);
        assert!(counts.contains(&(Tag::Round, 4)));
        assert!(!counts.iter().any(|(tag, _)| *tag == Tag::Seed));
    }
}

use super::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstituencyId(pub usize);

/// Where a candidate stands in the count.
///
/// `Reinstated` is a previously eliminated candidate brought back into the
/// count; it behaves exactly like `Continuing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Continuing,
    Reinstated,
    Elected,
    Eliminated,
    RemovedByQuota,
}

impl CandidateStatus {
    pub fn is_continuing(self) -> bool {
        matches!(self, CandidateStatus::Continuing | CandidateStatus::Reinstated)
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateStatus::Continuing => write!(f, "continuing"),
            CandidateStatus::Reinstated => write!(f, "reinstated"),
            CandidateStatus::Elected => write!(f, "elected"),
            CandidateStatus::Eliminated => write!(f, "eliminated"),
            CandidateStatus::RemovedByQuota => write!(f, "removed_by_quota"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub constituency: Option<ConstituencyId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituency {
    pub name: String,
    /// Member count as given in the constituency file; orders the round robin.
    pub size: u64,
    /// Maximum number of seats this constituency may fill. `None` is unlimited.
    pub seat_quota: Option<usize>,
    members: Vec<CandidateId>,
}

impl Constituency {
    pub fn members(&self) -> &[CandidateId] {
        &self.members
    }
}

/// A ranked ballot. Preferences are fixed once the ballot is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    preferences: Vec<CandidateId>,
}

impl Ballot {
    pub fn preferences(&self) -> &[CandidateId] {
        &self.preferences
    }
}

/// The read-only registry a count runs against.
#[derive(Debug, Clone)]
pub struct Election {
    candidates: Vec<Candidate>,
    constituencies: Vec<Constituency>,
    ballots: Vec<Ballot>,
    index: HashMap<String, CandidateId>,
}

impl Election {
    pub fn builder() -> ElectionBuilder {
        ElectionBuilder::default()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, id: CandidateId) -> &Candidate {
        &self.candidates[id.0]
    }

    pub fn name(&self, id: CandidateId) -> &str {
        &self.candidates[id.0].name
    }

    pub fn lookup(&self, name: &str) -> Option<CandidateId> {
        self.index.get(name).copied()
    }

    pub fn candidate_ids(&self) -> impl Iterator<Item = CandidateId> {
        (0..self.candidates.len()).map(CandidateId)
    }

    pub fn constituencies(&self) -> &[Constituency] {
        &self.constituencies
    }

    pub fn constituency(&self, id: ConstituencyId) -> &Constituency {
        &self.constituencies[id.0]
    }

    pub fn constituency_ids(&self) -> impl Iterator<Item = ConstituencyId> {
        (0..self.constituencies.len()).map(ConstituencyId)
    }

    pub fn constituency_of(&self, id: CandidateId) -> Option<ConstituencyId> {
        self.candidates[id.0].constituency
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }
}

/// Assembles an [`Election`].
///
/// Candidates are registered in the order they are first seen: constituency
/// members first, then candidates that only appear on ballots. That order is
/// the stable order every later ranking falls back on.
#[derive(Debug, Default)]
pub struct ElectionBuilder {
    candidates: Vec<Candidate>,
    index: HashMap<String, CandidateId>,
    constituencies: Vec<Constituency>,
    constituency_index: HashMap<String, ConstituencyId>,
    ballots: Vec<Ballot>,
    default_seat_quota: Option<usize>,
    explicit_quota: Vec<bool>,
    skipped_ballots: usize,
}

impl ElectionBuilder {
    pub fn add_constituency<I, S>(
        &mut self,
        name: &str,
        size: u64,
        members: I,
    ) -> Result<ConstituencyId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.constituency_index.contains_key(name) {
            return Err(ModelError::DuplicateConstituency(name.to_string()));
        }
        let id = ConstituencyId(self.constituencies.len());
        let mut member_ids = Vec::new();
        for member in members {
            let member = member.as_ref();
            let candidate = self.intern(member);
            let slot = &mut self.candidates[candidate.0];
            if let Some(existing) = slot.constituency {
                return Err(ModelError::DuplicateMembership {
                    candidate: member.to_string(),
                    first: self.constituencies[existing.0].name.clone(),
                    second: name.to_string(),
                });
            }
            slot.constituency = Some(id);
            member_ids.push(candidate);
        }
        self.constituencies.push(Constituency {
            name: name.to_string(),
            size,
            seat_quota: None,
            members: member_ids,
        });
        self.explicit_quota.push(false);
        self.constituency_index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Caps the seats one constituency may fill.
    pub fn set_seat_quota(&mut self, constituency: &str, quota: usize) -> Result<()> {
        let id = *self
            .constituency_index
            .get(constituency)
            .ok_or_else(|| ModelError::UnknownConstituency(constituency.to_string()))?;
        if quota == 0 {
            return Err(ModelError::ZeroSeatQuota(constituency.to_string()));
        }
        self.constituencies[id.0].seat_quota = Some(quota);
        self.explicit_quota[id.0] = true;
        Ok(())
    }

    /// Quota applied at build time to every constituency without its own.
    pub fn default_seat_quota(&mut self, quota: Option<usize>) -> &mut Self {
        self.default_seat_quota = quota;
        self
    }

    /// Adds a ballot. Ballots without any preference are not valid votes and
    /// are skipped.
    pub fn add_ballot<I, S>(&mut self, preferences: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = preferences.into_iter().collect();
        for (position, name) in names.iter().enumerate() {
            if names[..position].iter().any(|earlier| earlier.as_ref() == name.as_ref()) {
                return Err(ModelError::DuplicatePreference {
                    ballot: self.ballots.len() + self.skipped_ballots + 1,
                    candidate: name.as_ref().to_string(),
                });
            }
        }
        let ranked: Vec<CandidateId> = names.iter().map(|name| self.intern(name.as_ref())).collect();
        if ranked.is_empty() {
            self.skipped_ballots += 1;
            warn!(
                "Skipping empty ballot {}",
                self.ballots.len() + self.skipped_ballots
            );
            return Ok(());
        }
        self.ballots.push(Ballot {
            preferences: ranked,
        });
        Ok(())
    }

    pub fn build(mut self) -> Result<Election> {
        if let Some(quota) = self.default_seat_quota {
            for (constituency, explicit) in self.constituencies.iter_mut().zip(&self.explicit_quota) {
                if quota == 0 {
                    return Err(ModelError::ZeroSeatQuota(constituency.name.clone()));
                }
                if !explicit {
                    constituency.seat_quota = Some(quota);
                }
            }
        }
        Ok(Election {
            candidates: self.candidates,
            constituencies: self.constituencies,
            ballots: self.ballots,
            index: self.index,
        })
    }

    fn intern(&mut self, name: &str) -> CandidateId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = CandidateId(self.candidates.len());
        self.candidates.push(Candidate {
            name: name.to_string(),
            constituency: None,
        });
        self.index.insert(name.to_string(), id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_members_before_ballot_only_candidates() {
        let mut builder = Election::builder();
        builder.add_constituency("K", 10, &["Zed", "Amy"]).unwrap();
        builder.add_ballot(&["Bob", "Amy"]).unwrap();
        let election = builder.build().unwrap();

        let names: Vec<_> = election.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Bob"]);
        assert_eq!(election.constituency_of(election.lookup("Amy").unwrap()), Some(ConstituencyId(0)));
        assert_eq!(election.constituency_of(election.lookup("Bob").unwrap()), None);
    }

    #[test]
    fn rejects_duplicate_preferences() {
        let mut builder = Election::builder();
        let err = builder.add_ballot(&["A", "B", "A"]).unwrap_err();
        assert!(matches!(err, ModelError::DuplicatePreference { ballot: 1, .. }));
    }

    #[test]
    fn rejected_ballot_registers_nobody() {
        let mut builder = Election::builder();
        builder.add_ballot(&["Amy"]).unwrap();
        assert!(builder.add_ballot(&["Bob", "Cat", "Bob"]).is_err());
        builder.add_ballot(&["Cat"]).unwrap();
        let election = builder.build().unwrap();

        let names: Vec<_> = election.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Cat"]);
        assert_eq!(election.lookup("Bob"), None);
        assert_eq!(election.ballots().len(), 2);
    }

    #[test]
    fn rejects_candidate_in_two_constituencies() {
        let mut builder = Election::builder();
        builder.add_constituency("K", 1, &["A"]).unwrap();
        let err = builder.add_constituency("L", 1, &["A"]).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateMembership { .. }));
    }

    #[test]
    fn skips_empty_ballots() {
        let mut builder = Election::builder();
        builder.add_ballot(&["A"]).unwrap();
        builder.add_ballot(Vec::<String>::new()).unwrap();
        let election = builder.build().unwrap();
        assert_eq!(election.ballots().len(), 1);
    }

    #[test]
    fn default_quota_does_not_override_explicit_quota() {
        let mut builder = Election::builder();
        builder.add_constituency("K", 3, &["A"]).unwrap();
        builder.add_constituency("L", 2, &["B"]).unwrap();
        builder.set_seat_quota("L", 2).unwrap();
        builder.default_seat_quota(Some(1));
        let election = builder.build().unwrap();

        assert_eq!(election.constituency(ConstituencyId(0)).seat_quota, Some(1));
        assert_eq!(election.constituency(ConstituencyId(1)).seat_quota, Some(2));
    }

    #[test]
    fn zero_quota_is_rejected() {
        let mut builder = Election::builder();
        builder.add_constituency("K", 3, &["A"]).unwrap();
        assert!(matches!(
            builder.set_seat_quota("K", 0),
            Err(ModelError::ZeroSeatQuota(_))
        ));
        assert!(matches!(
            builder.set_seat_quota("Nope", 1),
            Err(ModelError::UnknownConstituency(_))
        ));
    }
}

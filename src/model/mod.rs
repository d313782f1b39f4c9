pub mod election;
pub mod votes;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Ballot {ballot} ranks {candidate} more than once")]
    DuplicatePreference { ballot: usize, candidate: String },
    #[error("Candidate {candidate} is listed in both {first} and {second}")]
    DuplicateMembership {
        candidate: String,
        first: String,
        second: String,
    },
    #[error("Constituency {0} is defined more than once")]
    DuplicateConstituency(String),
    #[error("Unknown constituency: {0}")]
    UnknownConstituency(String),
    #[error("Seat quota for {0} must be at least one")]
    ZeroSeatQuota(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

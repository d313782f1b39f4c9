//! Readers for the ballot and constituency files.

use crate::model::election::Election;
use crate::model::ModelError;
use std::io::Read;
use tracing::info;

pub mod ballots;
pub mod constituencies;

pub use ballots::read_ballots;
pub use constituencies::{read_constituencies, ConstituencyRow};

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {message}")]
    Invalid { line: u64, message: String },
    #[error("Election error: {0}")]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, FormatError>;

/// Both files share one dialect: comma separated, double quoted, padding
/// around fields ignored, rows of any length.
pub(crate) fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader)
}

/// Builds an election from a ballot file and an optional constituency file.
///
/// Candidates named in the constituency file are registered first, in file
/// order; candidates that only appear on ballots follow in order of first
/// appearance and belong to no constituency.
pub fn load_election<B, C>(
    ballots: B,
    constituencies: Option<C>,
    seat_quota: Option<usize>,
) -> Result<Election>
where
    B: Read,
    C: Read,
{
    let mut builder = Election::builder();
    builder.default_seat_quota(seat_quota);

    if let Some(source) = constituencies {
        let rows = read_constituencies(source)?;
        info!("Read {} constituencies", rows.len());
        for row in rows {
            builder.add_constituency(&row.name, row.size, &row.members)?;
        }
    }

    let ballots = read_ballots(ballots)?;
    info!("Read {} ballots", ballots.len());
    for ballot in ballots {
        builder.add_ballot(&ballot)?;
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constituency_members_register_before_ballot_only_names() {
        let ballots = "Zed, A2\nA1\n";
        let constituencies = "K, 2, A1, A2\n";
        let election =
            load_election(ballots.as_bytes(), Some(constituencies.as_bytes()), Some(1)).unwrap();

        let names: Vec<_> = election.candidate_ids().map(|id| election.name(id)).collect();
        assert_eq!(names, vec!["A1", "A2", "Zed"]);
        assert_eq!(election.constituency_of(election.lookup("Zed").unwrap()), None);
        assert_eq!(election.constituencies()[0].seat_quota, Some(1));
        assert_eq!(election.ballots().len(), 2);
    }

    #[test]
    fn duplicate_preference_is_reported() {
        let err = load_election("A, B, A\n".as_bytes(), None::<&[u8]>, None).unwrap_err();
        assert!(matches!(
            err,
            FormatError::Model(ModelError::DuplicatePreference { .. })
        ));
    }
}

use super::{csv_reader, Result};
use std::io::Read;

/// Reads one ballot per row, preferences in rank order. Empty fields are
/// dropped; rows left with no preference are kept so the caller decides what
/// to do with them.
pub fn read_ballots<R: Read>(reader: R) -> Result<Vec<Vec<String>>> {
    let mut ballots = Vec::new();
    for record in csv_reader(reader).records() {
        let record = record?;
        ballots.push(
            record
                .iter()
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect(),
        );
    }
    Ok(ballots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_names_and_padding() {
        let input = "Chocolate, Strawberry\n\"Doe, Jane\",  Banana\nBanana,,Sweets\n";
        let ballots = read_ballots(input.as_bytes()).unwrap();
        assert_eq!(
            ballots,
            vec![
                vec!["Chocolate", "Strawberry"],
                vec!["Doe, Jane", "Banana"],
                vec!["Banana", "Sweets"],
            ]
        );
    }

    #[test]
    fn ragged_rows_are_accepted() {
        let ballots = read_ballots("a\na, b, c\n".as_bytes()).unwrap();
        assert_eq!(ballots[0].len(), 1);
        assert_eq!(ballots[1].len(), 3);
    }
}

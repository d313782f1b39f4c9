use super::{csv_reader, FormatError, Result};
use std::io::Read;

/// `name, size, candidate, candidate, ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstituencyRow {
    pub name: String,
    pub size: u64,
    pub members: Vec<String>,
}

pub fn read_constituencies<R: Read>(reader: R) -> Result<Vec<ConstituencyRow>> {
    let mut rows = Vec::new();
    for record in csv_reader(reader).records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let name = match record.get(0) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(FormatError::Invalid {
                    line,
                    message: "missing constituency name".to_string(),
                })
            }
        };
        let size = record
            .get(1)
            .ok_or_else(|| FormatError::Invalid {
                line,
                message: format!("constituency {} has no size", name),
            })?
            .parse::<u64>()
            .map_err(|e| FormatError::Invalid {
                line,
                message: format!("constituency {} has an invalid size: {}", name, e),
            })?;
        let members = record
            .iter()
            .skip(2)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect();
        rows.push(ConstituencyRow {
            name,
            size,
            members,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_members_after_name_and_size() {
        let rows = read_constituencies("North, 120, Ann, Bob\nSouth, 80, Cy\n".as_bytes()).unwrap();
        assert_eq!(
            rows[0],
            ConstituencyRow {
                name: "North".to_string(),
                size: 120,
                members: vec!["Ann".to_string(), "Bob".to_string()],
            }
        );
        assert_eq!(rows[1].members, vec!["Cy".to_string()]);
    }

    #[test]
    fn bad_size_names_the_line() {
        let err = read_constituencies("North, 1, Ann\nSouth, many, Cy\n".as_bytes()).unwrap_err();
        match err {
            FormatError::Invalid { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("South"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

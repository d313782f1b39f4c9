//! Reads rendered trace text back into records.

use super::trace::{ConstituencySize, Entry, Tag, Trace, TraceEvent, Transfer};
use crate::model::votes::Votes;
use nom::{
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, digit1, hex_digit1},
    combinator::{all_consuming, map, map_opt, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    IResult,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unknown record tag {tag:?}")]
    UnknownTag { line: usize, tag: String },
    #[error("line {line}: malformed {tag} record {text:?}")]
    Malformed { line: usize, tag: Tag, text: String },
}

pub type Result<T> = std::result::Result<T, ParseError>;

type Res<'a, T> = IResult<&'a str, T>;

fn votes(input: &str) -> Res<Votes> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, opt(pair(char('/'), digit1))))),
        |s: &str| s.parse::<Votes>(),
    )(input)
}

fn count(input: &str) -> Res<usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

fn entry(input: &str) -> Res<Entry> {
    map(
        separated_pair(take_until(" = "), tag(" = "), votes),
        |(name, votes)| Entry::new(name, votes),
    )(input)
}

fn entries(input: &str) -> Res<Vec<Entry>> {
    separated_list0(char(';'), entry)(input)
}

fn tuple_entry(input: &str) -> Res<Entry> {
    map(
        delimited(
            char('('),
            separated_pair(take_until(", "), tag(", "), votes),
            char(')'),
        ),
        |(name, votes)| Entry::new(name, votes),
    )(input)
}

fn size_entry(input: &str) -> Res<ConstituencySize> {
    map(
        delimited(
            char('('),
            separated_pair(
                take_until(", "),
                tag(", "),
                map_res(digit1, |s: &str| s.parse::<u64>()),
            ),
            char(')'),
        ),
        |(name, size): (&str, u64)| ConstituencySize {
            name: name.to_string(),
            size,
        },
    )(input)
}

fn bracketed<'a, T, F>(item: F) -> impl FnMut(&'a str) -> Res<'a, Vec<T>>
where
    F: FnMut(&'a str) -> Res<'a, T>,
{
    delimited(char('['), separated_list0(tag(", "), item), char(']'))
}

fn action(input: &str) -> Res<Tag> {
    map_opt(take_while1(|c: char| !c.is_whitespace()), Tag::from_sigil)(input)
}

fn transfer(input: &str) -> Res<Transfer> {
    let (input, from) = preceded(tag("from "), take_until(" to "))(input)?;
    let (input, head) = preceded(tag(" to "), take_until(" * "))(input)?;
    let (input, weight) = preceded(tag(" * "), votes)(input)?;
    let (input, amount) = preceded(tag(" = "), votes)(input)?;

    // The recipient name may contain spaces, the ballot count never does.
    let (to, ballots) = match head.rsplit_once(' ') {
        Some((to, ballots)) => (to, ballots),
        None => {
            return Err(nom::Err::Error(nom::error::Error::new(
                head,
                nom::error::ErrorKind::Space,
            )))
        }
    };
    let (_, ballots) = all_consuming(count)(ballots)?;
    Ok((
        input,
        Transfer {
            from: from.to_string(),
            to: to.to_string(),
            ballots,
            weight,
            amount,
        },
    ))
}

fn quota(text: &str) -> Option<TraceEvent> {
    let mut parts = text.rsplitn(5, ' ');
    let quota = parts.next()?.parse().ok()?;
    if parts.next()? != ">=" {
        return None;
    }
    let elected = parts.next()?.parse().ok()?;
    let constituency = parts.next()?.to_string();
    let candidate = parts.next()?.to_string();
    Some(TraceEvent::Quota {
        candidate,
        constituency,
        elected,
        quota,
    })
}

fn random(text: &str) -> Option<TraceEvent> {
    if text.starts_with('(') {
        let parsed = all_consuming(tuple((
            tuple_entry,
            tag(" from "),
            bracketed(tuple_entry),
            tag(" to "),
            action,
        )))(text);
        let (_, (selected, _, among, _, action)) = parsed.ok()?;
        return Some(TraceEvent::RandomEntry {
            selected,
            among,
            action,
        });
    }
    let (head, action) = text.rsplit_once(" to ")?;
    let action = Tag::from_sigil(action)?;
    let (selected, among) = head.split_once(" from ")?;
    Some(TraceEvent::Random {
        selected: selected.to_string(),
        among: among.split(", ").map(str::to_string).collect(),
        action,
    })
}

fn reordering(text: &str) -> Option<(Vec<ConstituencySize>, Vec<ConstituencySize>)> {
    let parsed = all_consuming(tuple((
        tag("from "),
        bracketed(size_entry),
        tag(" to "),
        bracketed(size_entry),
    )))(text);
    parsed.ok().map(|(_, (_, before, _, after))| (before, after))
}

fn full<'a, T, F>(parser: F, text: &'a str) -> Option<T>
where
    F: FnMut(&'a str) -> Res<'a, T>,
{
    all_consuming(parser)(text).ok().map(|(_, value)| value)
}

fn payload(kind: Tag, text: &str) -> Option<TraceEvent> {
    match kind {
        Tag::Seed => full(
            map_res(hex_digit1, |s: &str| u64::from_str_radix(s, 16)),
            text,
        )
        .map(TraceEvent::Seed),
        Tag::Threshold => full(map_res(digit1, |s: &str| s.parse::<u64>()), text)
            .map(TraceEvent::Threshold),
        Tag::Round => {
            full(map_res(digit1, |s: &str| s.parse::<u32>()), text).map(TraceEvent::Round)
        }
        Tag::Count => full(entries, text).map(TraceEvent::Count),
        Tag::Zombies => full(entries, text).map(TraceEvent::Zombies),
        Tag::Elect => full(entry, text).map(TraceEvent::Elect),
        Tag::Eliminate => full(entry, text).map(TraceEvent::Eliminate),
        Tag::Transfer => full(transfer, text).map(TraceEvent::Transfer),
        Tag::Quota => quota(text),
        Tag::Random => random(text),
        Tag::Shuffle => reordering(text).map(|(before, after)| TraceEvent::Shuffle { before, after }),
        Tag::Sort => reordering(text).map(|(before, after)| TraceEvent::Sort { before, after }),
        Tag::RoundRobin => full(bracketed(size_entry), text).map(TraceEvent::RoundRobin),
        Tag::ConstituencyTurn => full(
            separated_pair(take_until(" ["), char(' '), bracketed(tuple_entry)),
            text,
        )
        .map(|(constituency, candidates)| TraceEvent::ConstituencyTurn {
            constituency: constituency.to_string(),
            candidates,
        }),
        Tag::Comment => Some(TraceEvent::Comment(text.to_string())),
    }
}

fn parse_numbered(line: usize, text: &str) -> Result<TraceEvent> {
    let (sigil, rest) = text.split_once(' ').unwrap_or((text, ""));
    let kind = Tag::from_sigil(sigil).ok_or_else(|| ParseError::UnknownTag {
        line,
        tag: sigil.to_string(),
    })?;
    payload(kind, rest).ok_or_else(|| ParseError::Malformed {
        line,
        tag: kind,
        text: text.to_string(),
    })
}

/// Parses a single rendered record.
pub fn parse_line(text: &str) -> Result<TraceEvent> {
    parse_numbered(1, text.trim_end_matches(&['\r', '\n'][..]))
}

/// Parses a whole trace, skipping blank lines.
pub fn parse_trace(text: &str) -> Result<Trace> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_numbered(index + 1, line.trim_end_matches('\r')))
        .collect::<Result<Vec<_>>>()
        .map(Trace::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transfer_with_fractions() {
        let event = parse_line(">TRANSFER from Banana to Sweets 2 * 1/3 = 2/3").unwrap();
        assert_eq!(
            event,
            TraceEvent::Transfer(Transfer {
                from: "Banana".to_string(),
                to: "Sweets".to_string(),
                ballots: 2,
                weight: Votes::ratio(1, 3),
                amount: Votes::ratio(2, 3),
            })
        );
    }

    #[test]
    fn names_may_contain_spaces() {
        let event = parse_line(">TRANSFER from Mary Ann to Jo Lee 1 * 1 = 1").unwrap();
        match event {
            TraceEvent::Transfer(t) => {
                assert_eq!(t.from, "Mary Ann");
                assert_eq!(t.to, "Jo Lee");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            parse_line("+ELECT Mary Ann = 7/2").unwrap(),
            TraceEvent::Elect(Entry::new("Mary Ann", Votes::ratio(7, 2)))
        );
    }

    #[test]
    fn parses_both_random_forms() {
        assert_eq!(
            parse_line("*RANDOM C from D, C, B to -ELIMINATE").unwrap(),
            TraceEvent::Random {
                selected: "C".to_string(),
                among: vec!["D".to_string(), "C".to_string(), "B".to_string()],
                action: Tag::Eliminate,
            }
        );
        assert_eq!(
            parse_line("*RANDOM (B, 1) from [(A, 1), (B, 1)] to +ELECT").unwrap(),
            TraceEvent::RandomEntry {
                selected: Entry::new("B", Votes::whole(1)),
                among: vec![Entry::new("A", Votes::whole(1)), Entry::new("B", Votes::whole(1))],
                action: Tag::Elect,
            }
        );
    }

    #[test]
    fn rendered_trace_parses_back() {
        let text = "\
%SEED 1f
^THRESHOLD 6
@ROUND 1
.COUNT A1 = 5;A2 = 4;B1 = 3
-ELIMINATE B1 = 3
!QUOTA A2 K 1 >= 1
~ZOMBIES E1 = 0
?COMMENT constituency quotas prevent electing every continuing candidate
xSHUFFLE from [(L, 30), (M, 20)] to [(M, 20), (L, 30)]
/SORT from [(M, 20), (L, 30)] to [(L, 30), (M, 20)]
oROUND_ROBIN [(L, 30), (M, 20)]
#CONSTITUENCY_TURN L [(B1, 3)]
";
        let trace = parse_trace(text).unwrap();
        assert_eq!(trace.len(), 12);
        assert_eq!(trace.render(), text);
    }

    #[test]
    fn empty_count_round_trips() {
        let event = TraceEvent::Count(vec![]);
        assert_eq!(parse_line(&event.to_string()).unwrap(), event);
    }

    #[test]
    fn reports_line_numbers() {
        let err = parse_trace("^THRESHOLD 3\n\n+ELECT nobody\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::Malformed {
                line: 3,
                tag: Tag::Elect,
                text: "+ELECT nobody".to_string(),
            }
        );
        assert!(matches!(
            parse_line("Results:"),
            Err(ParseError::UnknownTag { line: 1, .. })
        ));
    }
}

use crate::model::votes::Votes;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Target every trace record is logged on.
pub const TRACE_TARGET: &str = "stv::trace";

/// Record kinds, rendered with the sigil prefixes downstream tooling keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tag {
    Seed,
    Threshold,
    Round,
    Count,
    Elect,
    Transfer,
    Eliminate,
    Quota,
    Zombies,
    Random,
    Shuffle,
    Sort,
    RoundRobin,
    ConstituencyTurn,
    Comment,
}

impl Tag {
    pub const ALL: [Tag; 15] = [
        Tag::Seed,
        Tag::Threshold,
        Tag::Round,
        Tag::Count,
        Tag::Elect,
        Tag::Transfer,
        Tag::Eliminate,
        Tag::Quota,
        Tag::Zombies,
        Tag::Random,
        Tag::Shuffle,
        Tag::Sort,
        Tag::RoundRobin,
        Tag::ConstituencyTurn,
        Tag::Comment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Seed => "%SEED",
            Tag::Threshold => "^THRESHOLD",
            Tag::Round => "@ROUND",
            Tag::Count => ".COUNT",
            Tag::Elect => "+ELECT",
            Tag::Transfer => ">TRANSFER",
            Tag::Eliminate => "-ELIMINATE",
            Tag::Quota => "!QUOTA",
            Tag::Zombies => "~ZOMBIES",
            Tag::Random => "*RANDOM",
            Tag::Shuffle => "xSHUFFLE",
            Tag::Sort => "/SORT",
            Tag::RoundRobin => "oROUND_ROBIN",
            Tag::ConstituencyTurn => "#CONSTITUENCY_TURN",
            Tag::Comment => "?COMMENT",
        }
    }

    pub fn from_sigil(s: &str) -> Option<Tag> {
        Tag::ALL.iter().copied().find(|tag| tag.as_str() == s)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate with a vote total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub votes: Votes,
}

impl Entry {
    pub fn new(name: impl Into<String>, votes: impl Into<Votes>) -> Self {
        Entry {
            name: name.into(),
            votes: votes.into(),
        }
    }
}

/// A constituency with its member count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstituencySize {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    /// Number of ballots moved.
    pub ballots: usize,
    /// Weight each moved ballot carries after the move.
    pub weight: Votes,
    /// `ballots * weight`, the amount added to the recipient.
    pub amount: Votes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceEvent {
    Seed(u64),
    Threshold(u64),
    Round(u32),
    Count(Vec<Entry>),
    Elect(Entry),
    Transfer(Transfer),
    Eliminate(Entry),
    Quota {
        candidate: String,
        constituency: String,
        elected: usize,
        quota: usize,
    },
    Zombies(Vec<Entry>),
    Random {
        selected: String,
        among: Vec<String>,
        action: Tag,
    },
    /// A tie among candidates shown with their totals, as in round robin
    /// turns. Both random variants render as `*RANDOM` text, but in JSON
    /// this one is tagged `RANDOM_ENTRY` so the payload shape is known.
    RandomEntry {
        selected: Entry,
        among: Vec<Entry>,
        action: Tag,
    },
    Shuffle {
        before: Vec<ConstituencySize>,
        after: Vec<ConstituencySize>,
    },
    Sort {
        before: Vec<ConstituencySize>,
        after: Vec<ConstituencySize>,
    },
    RoundRobin(Vec<ConstituencySize>),
    ConstituencyTurn {
        constituency: String,
        candidates: Vec<Entry>,
    },
    Comment(String),
}

impl TraceEvent {
    pub fn tag(&self) -> Tag {
        match self {
            TraceEvent::Seed(_) => Tag::Seed,
            TraceEvent::Threshold(_) => Tag::Threshold,
            TraceEvent::Round(_) => Tag::Round,
            TraceEvent::Count(_) => Tag::Count,
            TraceEvent::Elect(_) => Tag::Elect,
            TraceEvent::Transfer(_) => Tag::Transfer,
            TraceEvent::Eliminate(_) => Tag::Eliminate,
            TraceEvent::Quota { .. } => Tag::Quota,
            TraceEvent::Zombies(_) => Tag::Zombies,
            TraceEvent::Random { .. } | TraceEvent::RandomEntry { .. } => Tag::Random,
            TraceEvent::Shuffle { .. } => Tag::Shuffle,
            TraceEvent::Sort { .. } => Tag::Sort,
            TraceEvent::RoundRobin(_) => Tag::RoundRobin,
            TraceEvent::ConstituencyTurn { .. } => Tag::ConstituencyTurn,
            TraceEvent::Comment(_) => Tag::Comment,
        }
    }
}

fn entries(list: &[Entry]) -> String {
    list.iter()
        .map(|entry| format!("{} = {}", entry.name, entry.votes))
        .join(";")
}

fn tuple(name: &str, value: &dyn fmt::Display) -> String {
    format!("({}, {})", name, value)
}

fn tuples(list: &[Entry]) -> String {
    list.iter().map(|entry| tuple(&entry.name, &entry.votes)).join(", ")
}

fn sizes(list: &[ConstituencySize]) -> String {
    list.iter().map(|c| tuple(&c.name, &c.size)).join(", ")
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.tag())?;
        match self {
            TraceEvent::Seed(seed) => write!(f, "{:x}", seed),
            TraceEvent::Threshold(threshold) => write!(f, "{}", threshold),
            TraceEvent::Round(round) => write!(f, "{}", round),
            TraceEvent::Count(list) | TraceEvent::Zombies(list) => f.write_str(&entries(list)),
            TraceEvent::Elect(entry) | TraceEvent::Eliminate(entry) => {
                write!(f, "{} = {}", entry.name, entry.votes)
            }
            TraceEvent::Transfer(t) => write!(
                f,
                "from {} to {} {} * {} = {}",
                t.from, t.to, t.ballots, t.weight, t.amount
            ),
            TraceEvent::Quota {
                candidate,
                constituency,
                elected,
                quota,
            } => write!(f, "{} {} {} >= {}", candidate, constituency, elected, quota),
            TraceEvent::Random {
                selected,
                among,
                action,
            } => write!(f, "{} from {} to {}", selected, among.join(", "), action),
            TraceEvent::RandomEntry {
                selected,
                among,
                action,
            } => write!(
                f,
                "{} from [{}] to {}",
                tuple(&selected.name, &selected.votes),
                tuples(among),
                action
            ),
            TraceEvent::Shuffle { before, after } | TraceEvent::Sort { before, after } => {
                write!(f, "from [{}] to [{}]", sizes(before), sizes(after))
            }
            TraceEvent::RoundRobin(order) => write!(f, "[{}]", sizes(order)),
            TraceEvent::ConstituencyTurn {
                constituency,
                candidates,
            } => write!(f, "{} [{}]", constituency, tuples(candidates)),
            TraceEvent::Comment(text) => f.write_str(text),
        }
    }
}

/// The ordered decision record of one count.
///
/// Every record is also logged on [`TRACE_TARGET`]: transfers at debug,
/// everything else at info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: TraceEvent) {
        match event.tag() {
            Tag::Transfer => debug!(target: TRACE_TARGET, "{}", event),
            _ => info!(target: TRACE_TARGET, "{}", event),
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.events.iter().map(|event| event.to_string())
    }

    /// The trace as text, one record per line.
    pub fn render(&self) -> String {
        self.lines().map(|line| line + "\n").collect()
    }
}

impl From<Vec<TraceEvent>> for Trace {
    fn from(events: Vec<TraceEvent>) -> Self {
        Trace { events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_count_and_transfer_lines() {
        let count = TraceEvent::Count(vec![
            Entry::new("Banana", Votes::whole(3)),
            Entry::new("Chocolate", Votes::whole(1)),
        ]);
        assert_eq!(count.to_string(), ".COUNT Banana = 3;Chocolate = 1");

        let transfer = TraceEvent::Transfer(Transfer {
            from: "Banana".to_string(),
            to: "Sweets".to_string(),
            ballots: 2,
            weight: Votes::ratio(1, 3),
            amount: Votes::ratio(2, 3),
        });
        assert_eq!(
            transfer.to_string(),
            ">TRANSFER from Banana to Sweets 2 * 1/3 = 2/3"
        );
    }

    #[test]
    fn renders_random_selections() {
        let plain = TraceEvent::Random {
            selected: "B".to_string(),
            among: vec!["A".to_string(), "B".to_string()],
            action: Tag::Eliminate,
        };
        assert_eq!(plain.to_string(), "*RANDOM B from A, B to -ELIMINATE");

        let tupled = TraceEvent::RandomEntry {
            selected: Entry::new("B", Votes::whole(1)),
            among: vec![Entry::new("A", Votes::whole(1)), Entry::new("B", Votes::whole(1))],
            action: Tag::Elect,
        };
        assert_eq!(
            tupled.to_string(),
            "*RANDOM (B, 1) from [(A, 1), (B, 1)] to +ELECT"
        );
    }

    #[test]
    fn random_variants_share_a_sigil_but_not_a_json_tag() {
        let plain = TraceEvent::Random {
            selected: "B".to_string(),
            among: vec!["A".to_string(), "B".to_string()],
            action: Tag::Eliminate,
        };
        let tupled = TraceEvent::RandomEntry {
            selected: Entry::new("B", Votes::whole(1)),
            among: vec![Entry::new("A", Votes::whole(1)), Entry::new("B", Votes::whole(1))],
            action: Tag::Elect,
        };
        assert_eq!(plain.tag(), Tag::Random);
        assert_eq!(tupled.tag(), Tag::Random);

        let json = serde_json::to_value(&tupled).unwrap();
        assert_eq!(json["tag"], "RANDOM_ENTRY");
        assert_eq!(json["payload"]["selected"]["name"], "B");
        assert_eq!(serde_json::to_value(&plain).unwrap()["tag"], "RANDOM");
    }

    #[test]
    fn renders_round_robin_records() {
        let order = vec![
            ConstituencySize {
                name: "K".to_string(),
                size: 3,
            },
            ConstituencySize {
                name: "L".to_string(),
                size: 2,
            },
        ];
        assert_eq!(
            TraceEvent::RoundRobin(order.clone()).to_string(),
            "oROUND_ROBIN [(K, 3), (L, 2)]"
        );
        let reversed: Vec<_> = order.iter().rev().cloned().collect();
        assert_eq!(
            TraceEvent::Sort {
                before: reversed,
                after: order,
            }
            .to_string(),
            "/SORT from [(L, 2), (K, 3)] to [(K, 3), (L, 2)]"
        );
        assert_eq!(
            TraceEvent::ConstituencyTurn {
                constituency: "K".to_string(),
                candidates: vec![Entry::new("a", Votes::ratio(1, 2))],
            }
            .to_string(),
            "#CONSTITUENCY_TURN K [(a, 1/2)]"
        );
    }

    #[test]
    fn quota_and_seed_lines() {
        let quota = TraceEvent::Quota {
            candidate: "A2".to_string(),
            constituency: "K".to_string(),
            elected: 1,
            quota: 1,
        };
        assert_eq!(quota.to_string(), "!QUOTA A2 K 1 >= 1");
        assert_eq!(TraceEvent::Seed(255).to_string(), "%SEED ff");
    }

    #[test]
    fn every_sigil_maps_back_to_its_tag() {
        for tag in Tag::ALL.iter() {
            assert_eq!(Tag::from_sigil(tag.as_str()), Some(*tag));
        }
        assert_eq!(Tag::from_sigil("ELECT"), None);
    }
}

use super::{CountError, Result};
use crate::report::trace::Tag;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// How ties are resolved for a whole count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakMode {
    /// Reproducible pseudo-random choices. Without a seed one is drawn from
    /// the OS and reported in the trace.
    Seeded(Option<u64>),
    /// Pre-supplied indices, one consumed per tie.
    Manual(Vec<usize>),
}

impl Default for TieBreakMode {
    fn default() -> Self {
        TieBreakMode::Seeded(None)
    }
}

#[derive(Debug)]
enum Source {
    Seeded { seed: u64, rng: ChaCha8Rng },
    Manual { choices: Vec<usize>, next: usize },
}

/// The only source of choice in a count. Every decision that is not unique
/// goes through [`TieBreaker::pick`], in the order the count makes them.
#[derive(Debug)]
pub struct TieBreaker {
    source: Source,
}

impl TieBreaker {
    pub fn new(mode: &TieBreakMode) -> Self {
        match mode {
            TieBreakMode::Seeded(Some(seed)) => Self::seeded(*seed),
            TieBreakMode::Seeded(None) => Self::seeded(rand::random()),
            TieBreakMode::Manual(choices) => Self::manual(choices.clone()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        TieBreaker {
            source: Source::Seeded {
                seed,
                rng: ChaCha8Rng::seed_from_u64(seed),
            },
        }
    }

    pub fn manual(choices: Vec<usize>) -> Self {
        TieBreaker {
            source: Source::Manual { choices, next: 0 },
        }
    }

    pub fn seed(&self) -> Option<u64> {
        match &self.source {
            Source::Seeded { seed, .. } => Some(*seed),
            Source::Manual { .. } => None,
        }
    }

    /// Manual choices used so far.
    pub fn consumed(&self) -> usize {
        match &self.source {
            Source::Seeded { .. } => 0,
            Source::Manual { next, .. } => *next,
        }
    }

    /// Picks an index into `options`, the labels of the tied set.
    pub fn pick(&mut self, action: Tag, options: &[String]) -> Result<usize> {
        let len = options.len();
        if len <= 1 {
            return Ok(0);
        }
        match &mut self.source {
            Source::Seeded { rng, .. } => Ok(rng.gen_range(0..len)),
            Source::Manual { choices, next } => {
                let index = *choices
                    .get(*next)
                    .ok_or_else(|| CountError::MissingManualChoice {
                        action,
                        options: options.to_vec(),
                    })?;
                if index >= len {
                    return Err(CountError::InvalidManualChoice {
                        index,
                        options: options.to_vec(),
                    });
                }
                *next += 1;
                Ok(index)
            }
        }
    }

    /// Fisher-Yates shuffle drawing each swap from [`TieBreaker::pick`].
    pub fn shuffle<T, F>(&mut self, items: &mut [T], label: F) -> Result<()>
    where
        F: Fn(&T) -> String,
    {
        for last in (1..items.len()).rev() {
            let options: Vec<String> = items[..=last].iter().map(&label).collect();
            let swap = self.pick(Tag::Shuffle, &options)?;
            items.swap(last, swap);
        }
        Ok(())
    }
}

use super::Result;
use crate::util::write_serialized;
use clap::Args;
use colored::Colorize;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use stv_count::config::{parse_seed, CountConfig, ThresholdKind};
use stv_count::formats::load_election;
use stv_count::report::CountReport;
use stv_count::tabulator::{self, Outcome};

#[derive(Debug, Args)]
pub struct CountArgs {
    /// Ballot file, one ballot per line. Reads stdin when absent or `-`.
    #[clap(long, short = 'b')]
    pub ballots: Option<PathBuf>,
    /// Constituency file, `name, size, candidate, ...` per line.
    #[clap(long, short = 'c')]
    pub constituencies: Option<PathBuf>,
    /// Seats to fill [default: half the ballot count]
    #[clap(long, short = 's')]
    pub seats: Option<usize>,
    /// Seat limit per constituency, 0 for none.
    #[clap(long, short = 'q')]
    pub quota: Option<usize>,
    /// Hexadecimal seed for random tie-breaking.
    #[clap(long, short = 'r', conflicts_with = "manual")]
    pub seed: Option<String>,
    /// Tie-break index, given once per tie in the order ties occur.
    #[clap(long, short = 'm')]
    pub manual: Vec<usize>,
    /// Threshold formula: droop or alternate.
    #[clap(long, short = 't')]
    pub threshold: Option<ThresholdKind>,
    /// TOML configuration file. Flags override its values.
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Write a JSON report to this file.
    #[clap(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Write the decision trace to this file.
    #[clap(long)]
    pub trace: Option<PathBuf>,
}

impl CountArgs {
    fn config(&self) -> Result<CountConfig> {
        let mut config = match &self.config {
            Some(path) => CountConfig::load(path)?,
            None => CountConfig::new(),
        };
        if let Some(seats) = self.seats {
            config.seats = Some(seats);
        }
        if let Some(quota) = self.quota {
            config.seat_quota = if quota == 0 { None } else { Some(quota) };
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(seed) = &self.seed {
            parse_seed(seed)?;
            config.tie_break.seed = Some(seed.clone());
            config.tie_break.manual = None;
        }
        if !self.manual.is_empty() {
            config.tie_break.manual = Some(self.manual.clone());
            config.tie_break.seed = None;
        }
        config.validate()?;
        Ok(config)
    }
}

fn open_ballots(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) if path != Path::new("-") => Ok(Box::new(File::open(path)?)),
        _ => Ok(Box::new(io::stdin())),
    }
}

pub fn count(args: &CountArgs) -> Result<()> {
    let config = args.config()?;

    let ballots = open_ballots(args.ballots.as_deref())?;
    let constituencies = match &args.constituencies {
        Some(path) => Some(File::open(path)?),
        None => None,
    };
    let election = load_election(ballots, constituencies, config.seat_quota)?;
    let options = config.to_options(election.ballots().len())?;

    eprintln!(
        "🗳️  Counting {} ballots for {} seats among {} candidates",
        election.ballots().len().to_string().bright_cyan(),
        options.seats.to_string().bright_cyan(),
        election.candidates().len().to_string().bright_cyan()
    );

    let start = instant::Instant::now();
    let result = tabulator::count(&election, &options)?;
    let elapsed = start.elapsed();

    eprintln!("Results:");
    for seat in &result.elected {
        eprintln!("{}, {}, {}", election.name(seat.candidate), seat.round, seat.votes);
    }

    if let Outcome::Undersubscribed { unfilled } = result.outcome {
        eprintln!(
            "⚠️  Ran out of candidates: {} seats left unfilled",
            unfilled.to_string().bright_yellow()
        );
    }

    if let Some(path) = &args.trace {
        fs::write(path, result.trace.render())?;
        eprintln!("📝 Wrote trace to {}", path.display().to_string().bright_green());
    }
    if let Some(path) = &args.output {
        write_serialized(path, &CountReport::new(&election, &result))?;
        eprintln!("📊 Wrote report to {}", path.display().to_string().bright_green());
    }

    eprintln!(
        "✅ Count finished in {} rounds ({:.2} ms)",
        result.rounds.to_string().bright_green().bold(),
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}

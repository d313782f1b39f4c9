use stv_count::config::ConfigError;
use stv_count::formats::FormatError;
use stv_count::report::parser::ParseError;
use stv_count::tabulator::CountError;

mod count;
mod inspect;

pub use count::{count, CountArgs};
pub use inspect::inspect;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Format(#[from] FormatError),
    #[error("{0}")]
    Count(#[from] CountError),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

//! Single Transferable Vote counting with constituency seat quotas.
//!
//! ```
//! use stv_count::model::election::Election;
//! use stv_count::tabulator::{count, Options};
//!
//! let mut builder = Election::builder();
//! builder.add_ballot(&["Banana", "Sweets"]).unwrap();
//! builder.add_ballot(&["Banana"]).unwrap();
//! builder.add_ballot(&["Chocolate"]).unwrap();
//! let election = builder.build().unwrap();
//!
//! let result = count(&election, &Options::new(1).with_seed(1)).unwrap();
//! assert_eq!(result.elected_names(&election), vec!["Banana"]);
//! ```

pub mod config;
pub mod formats;
pub mod logging;
pub mod model;
pub mod report;
pub mod tabulator;

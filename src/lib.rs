pub mod config;
pub mod error;
pub mod inspire;
pub mod latex;

pub use config::InspireConfig;
pub use error::InspireError;
pub use inspire::{resolve_keys, InspireClient, LiteratureService, LookupOutcome, Resolution};
pub use latex::bibliography::{join_entries, write_bibliography, WriteReport};
pub use latex::parser::{aux_to_texkeys, blg_to_texkeys, parse_aux, parse_blg, BlgScan};
pub use latex::Blacklist;

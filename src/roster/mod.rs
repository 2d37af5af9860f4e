mod client;
mod fetch;
mod state;
mod types;

pub use client::{DirectoryClient, HttpDirectoryClient};
pub use fetch::{RosterEvent, RosterFetcher};
pub use state::{LoadPhase, RosterState};
pub use types::{Member, PAGE_LIMIT, RosterPage};

// ABOUTME: Command module aggregator for the shipline CLI.
// ABOUTME: Re-exports run, status, and identity command handlers.

mod identity;
mod run;
mod status;

pub use identity::identity;
pub use run::{RunOptions, run};
pub use status::status;

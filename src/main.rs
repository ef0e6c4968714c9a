//! # media-vault CLI
//!
//! Command-line interface for the media vault.
//!
//! ## Usage
//! ```bash
//! media-vault import ~/Downloads/Takeout/Photos
//! media-vault scan --dispose --output json
//! ```

mod cli;

use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

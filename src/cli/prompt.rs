//! Yes/no confirmations.

use console::{style, Term};
use media_vault::MediaVaultError;
use std::io;

/// Invalid answers tolerated before giving up
pub const MAX_ATTEMPTS: usize = 2;

pub struct Prompter {
    term: Term,
    assume_yes: bool,
}

impl Prompter {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            term: Term::stderr(),
            assume_yes,
        }
    }

    /// Ask on the terminal; `--yes` answers every question with yes
    pub fn confirm(&self, question: &str) -> Result<bool, MediaVaultError> {
        if self.assume_yes {
            return Ok(true);
        }
        ask_yes_no(question, |prompt| {
            self.term.write_str(&format!("{} ", style(prompt).bold()))?;
            self.term.read_line()
        })
    }

    /// Like `confirm`, but a "no" aborts with `reason`
    pub fn require(&self, question: &str, reason: &str) -> Result<(), MediaVaultError> {
        if self.confirm(question)? {
            Ok(())
        } else {
            Err(MediaVaultError::Aborted(reason.to_string()))
        }
    }
}

/// Ask `question` through `read` until a yes/no answer or `MAX_ATTEMPTS`
/// invalid replies
pub fn ask_yes_no<F>(question: &str, mut read: F) -> Result<bool, MediaVaultError>
where
    F: FnMut(&str) -> io::Result<String>,
{
    let prompt = format!("{question} [y/n]");
    for _ in 0..MAX_ATTEMPTS {
        let reply = read(&prompt)
            .map_err(|e| MediaVaultError::Aborted(format!("cannot read answer: {e}")))?;
        if let Some(answer) = parse_answer(&reply) {
            return Ok(answer);
        }
    }
    Err(MediaVaultError::InvalidArgument(format!(
        "no valid answer after {MAX_ATTEMPTS} attempts"
    )))
}

fn parse_answer(reply: &str) -> Option<bool> {
    match reply.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

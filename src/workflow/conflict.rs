//! Merge conflict resolution strategies
//!
//! When a release merge stops on conflicts the orchestrator asks a
//! [`ConflictResolver`] whether to try the same merge again. The interactive
//! implementation waits for the operator to fix the working tree and confirm.

use std::cell::RefCell;
use std::io::{BufRead, StdinLock, Stdout, Write};

use tracing::warn;

use crate::errors::MergeConflict;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeVerdict {
    /// Conflicts were handled, run the merge step again
    Retry,
    /// Give up and report the conflict
    Abort,
}

/// Decides what happens after a merge conflict
pub trait ConflictResolver {
    fn resolve(&self, conflict: &MergeConflict) -> MergeVerdict;
}

/// Asks the operator on a terminal
pub struct PromptResolver<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
    confirm_word: String,
}

impl PromptResolver<StdinLock<'static>, Stdout> {
    pub fn stdio(confirm_word: impl Into<String>) -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout(), confirm_word)
    }
}

impl<R: BufRead, W: Write> PromptResolver<R, W> {
    pub fn new(input: R, output: W, confirm_word: impl Into<String>) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
            confirm_word: confirm_word.into(),
        }
    }

    fn prompt(&self, conflict: &MergeConflict) -> std::io::Result<Option<String>> {
        {
            let mut output = self.output.borrow_mut();
            writeln!(output, "⚠️  {conflict}")?;
            write!(
                output,
                "Resolve the conflicts and stage the files, then type '{}' and press enter: ",
                self.confirm_word
            )?;
            output.flush()?;
        }

        let mut line = String::new();
        let read = self.input.borrow_mut().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

impl<R: BufRead, W: Write> ConflictResolver for PromptResolver<R, W> {
    fn resolve(&self, conflict: &MergeConflict) -> MergeVerdict {
        match self.prompt(conflict) {
            Ok(Some(answer)) if answer.trim() == self.confirm_word => MergeVerdict::Retry,
            Ok(_) => MergeVerdict::Abort,
            Err(e) => {
                warn!(error = %e, "could not read conflict confirmation");
                MergeVerdict::Abort
            }
        }
    }
}

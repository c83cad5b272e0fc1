//! Logging without process-wide state.
//!
//! Every component receives a `Logger` value explicitly; there is no global
//! logger to initialize or mutate.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, Default)]
pub struct Logger {
    verbose: bool,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Progress messages, always shown.
    pub fn info(&self, message: impl Display) {
        println!("{message}");
    }

    /// Detail messages, shown only with --verbose.
    pub fn debug(&self, message: impl Display) {
        if self.verbose {
            println!("{message}");
        }
    }

    /// Errors, written to stderr.
    pub fn error(&self, message: impl Display) {
        eprintln!("error: {message}");
    }
}

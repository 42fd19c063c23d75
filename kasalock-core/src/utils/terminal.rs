//! # Terminal Input Helper
//!
//! Utilities for requesting user input from the terminal. The prompt is
//! repeated until the input satisfies the caller's accept closure, which
//! returns a human-readable rejection message on failure.
//!
//! ## Example
//! ```rust,no_run
//! use kasalock_core::utils::Terminal;
//!
//! let input = Terminal::ask("Enter a digit:", |s| {
//!     if s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty() {
//!         Ok(())
//!     } else {
//!         Err("Digits only, try again!".to_string())
//!     }
//! });
//! println!("Accepted: {}", input.answer);
//! ```

use std::io;

/// A helper for repeatedly asking the user for input until it passes the
/// provided accept closure. The accepted answer is trimmed.
pub struct Terminal {
    pub answer: String,
}

impl Terminal {
    /// Prints a question and loops until a valid answer is received.
    pub fn ask<A>(question: &str, accept: A) -> Terminal
    where
        A: Fn(&str) -> Result<(), String>,
    {
        let answer = loop {
            println!("{}", question);
            let mut line = String::new();

            match io::stdin().read_line(&mut line) {
                Ok(_) => {
                    let trimmed = line.trim();
                    match accept(trimmed) {
                        Ok(()) => break trimmed.to_string(),
                        Err(e) => {
                            println!("{}", e);
                            continue;
                        }
                    }
                }
                Err(_) => {
                    eprintln!("Couldn't read line..");
                    continue;
                }
            }
        };

        Terminal { answer }
    }

    /// Asks without constraints; any line (including an empty one) is
    /// accepted.
    pub fn any(question: &str) -> Terminal {
        Self::ask(question, |_| Ok(()))
    }
}

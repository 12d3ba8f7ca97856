// Review Console
// Confirmation channel between the review loop and the operator

use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const AFFIRMATIVE: &[&str] = &["y", "yes", "yeah", "yea", "yep", "sure", "ok"];
const NEGATIVE: &[&str] = &["n", "no", "nope", "nah"];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Answer {
    Affirmative,
    Negative,
    Unrecognized,
}

/// Classify one operator response. Surrounding whitespace and case are ignored.
pub fn parse_answer(input: &str) -> Answer {
    let answer = input.trim().to_lowercase();
    if AFFIRMATIVE.contains(&answer.as_str()) {
        Answer::Affirmative
    } else if NEGATIVE.contains(&answer.as_str()) {
        Answer::Negative
    } else {
        Answer::Unrecognized
    }
}

#[allow(async_fn_in_trait)]
pub trait ReviewConsole {
    /// Ask one question. `Ok(None)` means the operator interrupted or the
    /// input channel closed; no further answers will arrive.
    async fn ask(&mut self, question: &str) -> io::Result<Option<String>>;

    /// Emit one result line for the operator.
    fn report(&mut self, line: &str) -> io::Result<()>;
}

/// Prompts on stdout and reads answers from stdin. Ctrl-C while waiting for
/// an answer is reported as a closed channel.
pub struct TerminalConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewConsole for TerminalConsole {
    async fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        {
            let mut out = io::stdout().lock();
            write!(out, "{} ", question)?;
            out.flush()?;
        }

        tokio::select! {
            line = self.lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                println!();
                Ok(None)
            }
        }
    }

    fn report(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line)
    }
}

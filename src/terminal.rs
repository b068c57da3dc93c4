//! @acp:module "Terminal"
//! @acp:summary "Injectable terminal for prompts, output lines and batch outcomes"
//! @acp:domain cli
//! @acp:layer service
//!
//! Every interactive read and every line of output goes through [`Console`],
//! so a scripted implementation can replace standard input/output in tests.

use std::collections::VecDeque;
use std::io::{self, BufRead};

use ::console::{style, Term};

use crate::batch::BatchOutcome;

/// Line-oriented terminal
pub trait Console {
    /// Write one line of output
    fn say(&mut self, line: &str);

    /// Write `prompt` without a newline and read one line of input.
    /// The returned line has its trailing newline removed.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;

    /// Write one batch outcome as it is produced
    fn report(&mut self, outcome: &BatchOutcome) {
        self.say(&outcome.to_string());
    }

    /// Write a warning line
    fn warn(&mut self, line: &str) {
        self.say(line);
    }
}

/// Console bound to the process terminal
pub struct TerminalConsole {
    term: Term,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn say(&mut self, line: &str) {
        if self.term.write_line(line).is_err() {
            println!("{}", line);
        }
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.term.write_str(prompt)?;
        self.term.flush()?;
        let line = if self.term.is_term() {
            self.term.read_line()?
        } else {
            // Term::read_line yields "" off a tty; read piped input directly
            read_piped_line(&mut io::stdin().lock())?
        };
        self.term.write_line("")?;
        Ok(line)
    }

    fn report(&mut self, outcome: &BatchOutcome) {
        let mark = if outcome.is_success() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        self.say(&format!("{} {}", mark, outcome));
    }

    fn warn(&mut self, line: &str) {
        self.say(&format!("{} {}", style("!").yellow(), line));
    }
}

/// Read one line from non-interactive input. Closed input is `UnexpectedEof`.
pub(crate) fn read_piped_line(input: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before an answer",
        ));
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(line)
}

/// Console replaying queued answers and recording all output
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    /// Every line written, prompts included
    pub lines: Vec<String>,
    /// Outcomes in the order they were reported
    pub outcomes: Vec<BatchOutcome>,
    /// Number of prompts shown
    pub prompts: usize,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console answering prompts with `answers`, in order
    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// All output joined by newlines
    pub fn transcript(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether any output line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn say(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts += 1;
        self.lines.push(prompt.to_string());
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left")
        })
    }

    fn report(&mut self, outcome: &BatchOutcome) {
        self.outcomes.push(outcome.clone());
        self.lines.push(outcome.to_string());
    }
}

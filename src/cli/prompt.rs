use colored::Colorize;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::common::errors::FixError;

/// An operator's reply to a yes/no question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Anything else, trimmed, as typed
    Other(String),
}

impl Answer {
    /// Parse free text: `y`/`yes` and `n`/`no` in any case, everything else is `Other`
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "y" | "yes" => Answer::Yes,
            "n" | "no" => Answer::No,
            _ => Answer::Other(trimmed.to_string()),
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Answer::Yes)
    }
}

/// Asks the operator yes/no questions
pub trait Prompter {
    fn ask(&mut self, question: &str) -> Result<Answer, FixError>;
}

/// Prompts on stdout and reads a line from stdin
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn ask(&mut self, question: &str) -> Result<Answer, FixError> {
        let stdin = std::io::stdin();
        ask_on(&mut stdin.lock(), &mut std::io::stdout(), question)
    }
}

/// Write `question` to `out` and read one answer line from `input`.
///
/// End of input reads as an empty `Other` answer.
pub fn ask_on<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    question: &str,
) -> Result<Answer, FixError> {
    write!(out, "\n  {} {} ", "?".cyan().bold(), question).map_err(FixError::PromptFailed)?;
    out.flush().map_err(FixError::PromptFailed)?;

    let mut line = String::new();
    let read = input.read_line(&mut line).map_err(FixError::PromptFailed)?;
    if read == 0 {
        // Keep the transcript readable when stdin is closed
        writeln!(out).map_err(FixError::PromptFailed)?;
    }

    let answer = Answer::parse(&line);
    tracing::debug!(question, ?answer, "prompt answered");
    Ok(answer)
}

/// Replays canned answers; used to drive the workflow without a console
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    /// Every question asked, in order
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> Result<Answer, FixError> {
        self.asked.push(question.to_string());
        Ok(self
            .answers
            .pop_front()
            .unwrap_or_else(|| Answer::Other(String::new())))
    }
}

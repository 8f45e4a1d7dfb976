//! User-prompt primitive: present N labeled choices, return the one picked

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use tracing::warn;

pub trait Prompt {
    /// Returns the index of the chosen option, `None` when dismissed
    fn choose(&mut self, title: &str, message: &str, options: &[String]) -> Option<usize>;

    /// Informational message with no choice
    fn notify(&mut self, title: &str, message: &str);

    fn confirm(&mut self, title: &str, message: &str) -> bool {
        let options = ["Cancel".to_string(), "Confirm".to_string()];
        self.choose(title, message, &options) == Some(1)
    }
}

/// Numbered menu on a writer, answers read line by line from a reader.
/// End of input dismisses the prompt.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, title: &str, message: &str, options: &[String]) -> io::Result<Option<usize>> {
        writeln!(self.output, "\n== {title} ==")?;
        if !message.is_empty() {
            writeln!(self.output, "{message}")?;
        }
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  [{}] {option}", i + 1)?;
        }

        loop {
            write!(self.output, "Choose 1-{}: ", options.len())?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match line.trim().parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => writeln!(self.output, "Please enter a number between 1 and {}", options.len())?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn choose(&mut self, title: &str, message: &str, options: &[String]) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        self.ask(title, message, options).unwrap_or_else(|e| {
            warn!(error = ?e, "Prompt failed, treating as cancel");
            None
        })
    }

    fn notify(&mut self, title: &str, message: &str) {
        if let Err(e) = writeln!(self.output, "{title}: {message}") {
            warn!(error = ?e, "Failed to write notification");
        }
    }
}

/// Pre-recorded answers, for tests and non-interactive runs
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<Option<usize>>,
    /// Titles of every prompt shown, in order
    pub asked: Vec<String>,
    /// `title: message` of every notification, in order
    pub notices: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = Option<usize>>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompt for ScriptedPrompt {
    fn choose(&mut self, title: &str, _message: &str, options: &[String]) -> Option<usize> {
        self.asked.push(title.to_string());
        self.answers
            .pop_front()
            .flatten()
            .filter(|&i| i < options.len())
    }

    fn notify(&mut self, title: &str, message: &str) {
        self.notices.push(format!("{title}: {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn options(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_terminal_prompt_reads_choice() {
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new(Cursor::new("2\n"), &mut out);
        let picked = prompt.choose("Duplicate", "Already exists", &options(&["Cancel", "Aggregate", "Create"]));
        assert_eq!(picked, Some(1));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[2] Aggregate"));
    }

    #[test]
    fn test_terminal_prompt_retries_invalid_input() {
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new(Cursor::new("9\nabc\n1\n"), &mut out);
        assert_eq!(prompt.choose("t", "", &options(&["a", "b"])), Some(0));
        assert!(String::from_utf8(out).unwrap().contains("between 1 and 2"));
    }

    #[test]
    fn test_terminal_prompt_eof_is_cancel() {
        let mut prompt = TerminalPrompt::new(Cursor::new(""), Vec::new());
        assert_eq!(prompt.choose("t", "", &options(&["a"])), None);
        assert!(!prompt.confirm("t", "sure?"));
    }

    #[test]
    fn test_scripted_prompt_records_and_answers() {
        let mut prompt = ScriptedPrompt::new([Some(1), Some(7), None]);
        assert!(prompt.confirm("First", ""));
        assert_eq!(prompt.choose("Second", "", &options(&["a", "b"])), None);
        assert_eq!(prompt.choose("Third", "", &options(&["a"])), None);
        assert_eq!(prompt.choose("Exhausted", "", &options(&["a"])), None);
        prompt.notify("Done", "ok");

        assert_eq!(prompt.asked, vec!["First", "Second", "Third", "Exhausted"]);
        assert_eq!(prompt.notices, vec!["Done: ok"]);
    }
}

//! Data-driven interactive prompts on stdin/stderr.
//!
//! Prompts render to stderr so stdout stays clean for data output. TTY
//! detection gates interactivity; every prompt has an explicit
//! non-interactive answer.

use std::io::{self, BufRead, IsTerminal, Write};

/// A yes/no confirmation prompt.
pub struct YesNoPrompt {
    pub question: String,
    /// true = default yes [Y/n], false = default no [y/N]
    pub default: bool,
}

/// Pick any subset of a list of options.
pub struct MultiSelectPrompt {
    pub title: String,
    pub options: Vec<MultiSelectOption>,
}

pub struct MultiSelectOption {
    pub value: String,
    pub label: String,
}

pub struct PromptEngine {
    interactive: bool,
}

impl PromptEngine {
    /// Create engine with automatic TTY detection.
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal() && io::stderr().is_terminal(),
        }
    }

    /// Create engine with explicit interactive mode.
    pub fn with_interactive(interactive: bool) -> Self {
        Self { interactive }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Run a yes/no prompt. Returns default if non-interactive.
    pub fn yes_no(&self, prompt: &YesNoPrompt) -> bool {
        if !self.interactive {
            return prompt.default;
        }

        let suffix = if prompt.default { "[Y/n]" } else { "[y/N]" };
        eprint!("{} {}: ", prompt.question, suffix);
        io::stderr().flush().ok();

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input).is_err() {
            return prompt.default;
        }

        let trimmed = input.trim().to_lowercase();
        if trimmed.is_empty() {
            return prompt.default;
        }

        trimmed.starts_with('y')
    }

    /// Display a message to stderr (only in interactive mode).
    pub fn message(&self, msg: &str) {
        if self.interactive {
            eprintln!("{}", msg);
        }
    }

    /// Run a multi-select prompt.
    ///
    /// Accepts space/comma-separated entry numbers or option values, or
    /// `all`. Empty input selects nothing. Returns `None` when the prompt
    /// cannot run (non-interactive) or input was cancelled; callers treat
    /// that as a dismissed dialog rather than an empty pick.
    pub fn multi_select(&self, prompt: &MultiSelectPrompt) -> Option<Vec<String>> {
        if !self.interactive || prompt.options.is_empty() {
            return None;
        }

        eprintln!("{}", prompt.title);
        for (i, opt) in prompt.options.iter().enumerate() {
            eprintln!("  [{}] {}", i + 1, opt.label);
        }
        eprint!(
            "Enter choices (1-{}, space separated, 'all', empty for none): ",
            prompt.options.len()
        );
        io::stderr().flush().ok();

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }

        Some(Self::parse_multi_select_input(input.trim(), &prompt.options))
    }

    fn parse_multi_select_input(input: &str, options: &[MultiSelectOption]) -> Vec<String> {
        if input.is_empty() {
            return Vec::new();
        }
        if input.eq_ignore_ascii_case("all") {
            return options.iter().map(|o| o.value.clone()).collect();
        }

        let mut picked = Vec::new();
        for token in input.split([' ', ',']).filter(|t| !t.is_empty()) {
            let value = if let Ok(index) = token.parse::<usize>() {
                index
                    .checked_sub(1)
                    .and_then(|i| options.get(i))
                    .map(|o| o.value.clone())
            } else {
                options
                    .iter()
                    .find(|o| o.value == token)
                    .map(|o| o.value.clone())
            };

            if let Some(value) = value {
                if !picked.contains(&value) {
                    picked.push(value);
                }
            }
        }
        picked
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

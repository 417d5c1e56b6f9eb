//! The fixed, ordered list of prompts sent to the GP.

use std::path::Path;

use crate::error::ConfigError;

/// Built-in prompt rotation.
pub const DEFAULT_PROMPTS: &[&str] = &[
    "What's one thing a founder said to you this week that genuinely surprised you?",
    "What's a deal you passed on recently, and what was your gut reason?",
    "What do you believe about Canadian startups that most people get wrong?",
    "What's a trend you're excited about that nobody is talking about yet?",
    "What's the most common mistake you're seeing pre-seed founders make right now?",
    "What's something that changed your mind recently, about a market, a founder type, anything?",
    "What's a pattern you've noticed across multiple founder pitches this month?",
    "If you could give one piece of advice to a Canadian founder trying to break into the US market, what would it be?",
    "What's a narrative in VC Twitter right now that you disagree with?",
    "What's something about your investment thesis that's evolved since you started the fund?",
];

/// Immutable, non-empty, ordered prompt list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptList {
    prompts: Vec<String>,
}

#[allow(clippy::len_without_is_empty)]
impl PromptList {
    /// Build a list from owned prompts. Fails on an empty list.
    pub fn new(prompts: Vec<String>) -> Result<Self, ConfigError> {
        if prompts.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "prompts".into(),
                message: "prompt list must contain at least one prompt".into(),
            });
        }
        Ok(Self { prompts })
    }

    /// Parse a prompt file: one prompt per line, `#` comments and blank lines skipped.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let prompts = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        Self::new(prompts)
    }

    /// Read and parse a prompt file.
    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Self::parse(&contents)
    }

    /// Number of prompts (always >= 1).
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Prompt at `index`, wrapping modulo the list length.
    pub fn get(&self, index: usize) -> &str {
        &self.prompts[index % self.prompts.len()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.prompts.iter().map(String::as_str)
    }
}

impl Default for PromptList {
    fn default() -> Self {
        Self {
            prompts: DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

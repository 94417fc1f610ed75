//! Source vocabulary for round content

use crate::error::Result;
use anyhow::Context;
use std::collections::HashSet;
use std::path::Path;

/// Flag names shipped with the service
const DEFAULT_FLAGS: &[&str] = &[
    "Argentina", "Australia", "Austria", "Belgium", "Brazil", "Bulgaria", "Canada", "Chile",
    "China", "Colombia", "Croatia", "Cuba", "Czechia", "Denmark", "Egypt", "Estonia",
    "Finland", "France", "Germany", "Ghana", "Greece", "Hungary", "Iceland", "India",
    "Indonesia", "Ireland", "Israel", "Italy", "Jamaica", "Japan", "Kenya", "Latvia",
    "Lithuania", "Luxembourg", "Mexico", "Morocco", "Netherlands", "New Zealand", "Nigeria",
    "Norway", "Peru", "Poland", "Portugal", "Romania", "Senegal", "Slovakia", "Slovenia",
    "South Africa", "South Korea", "Spain", "Sweden", "Switzerland", "Thailand", "Tunisia",
    "Turkey", "Ukraine", "United Kingdom", "United States", "Uruguay", "Vietnam",
];

/// Ordered set of distinct tokens that round content is drawn from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Build from arbitrary tokens; blanks are dropped and repeats keep their first position
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let tokens = tokens
            .into_iter()
            .map(|token| token.as_ref().trim().to_string())
            .filter(|token| !token.is_empty())
            .filter(|token| seen.insert(token.clone()))
            .collect();

        Self { tokens }
    }

    /// Parse a `;`-separated list such as `France; Japan; Peru`
    pub fn from_delimited(raw: &str) -> Self {
        Self::new(raw.split(';'))
    }

    /// Read a `;`-separated vocabulary file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary file {}", path.display()))?;
        Ok(Self::from_delimited(&raw))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_FLAGS.iter())
    }
}

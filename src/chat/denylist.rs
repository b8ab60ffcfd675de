use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::DenylistError;

/// Ordered list of words masked out of every chat message.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    words: Vec<String>,
}

impl Denylist {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words
                .into_iter()
                .map(Into::into)
                .filter(|w: &String| !w.is_empty())
                .collect(),
        }
    }

    /// Parses one word per line. Surrounding whitespace is trimmed and blank
    /// lines are dropped.
    pub fn parse(contents: &str) -> Self {
        Self::from_words(contents.lines().map(str::trim))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DenylistError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| DenylistError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let denylist = Self::parse(&contents);
        info!("Loaded {} denylist words from {}", denylist.len(), path.display());
        Ok(denylist)
    }

    /// Replaces every occurrence of each word with one `*` per character.
    ///
    /// Matching is literal and case-sensitive with no word boundaries, so a
    /// word also matches inside longer words. Words are applied in list order.
    pub fn mask(&self, input: &str) -> String {
        let mut message = input.to_string();
        for word in &self.words {
            if message.contains(word.as_str()) {
                let stars = "*".repeat(word.chars().count());
                message = message.replace(word.as_str(), &stars);
            }
        }
        message
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

use rand::seq::SliceRandom;

use crate::decoder::ALPHABET;
use crate::error::GameError;

/// Three letter words spellable with the glove's ten letters
pub const WORDS: [&str; 20] = [
    "ART", "TIN", "SIN", "RAN", "ANT", "LID", "RID", "SAD", "TAR", "ARC", "CAR", "RAT", "CAT",
    "LAD", "DIN", "RAD", "SAT", "AID", "SIR", "AND",
];

/// A word is playable when it is non-empty and every letter is on the keypad.
pub fn validate_word(word: &str) -> Result<(), GameError> {
    if word.is_empty() || !word.chars().all(|c| ALPHABET.contains(&c)) {
        return Err(GameError::InvalidWord(word.to_string()));
    }
    Ok(())
}

/// Picks the target word for each round
#[derive(Debug, Clone, Default)]
pub struct WordPicker {
    fixed: Option<String>,
}

impl WordPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always play the same word. Useful for practice and for replays.
    pub fn fixed(word: &str) -> Result<Self, GameError> {
        let word = word.trim().to_uppercase();
        validate_word(&word)?;
        Ok(Self { fixed: Some(word) })
    }

    pub fn pick(&self) -> String {
        if let Some(ref word) = self.fixed {
            return word.clone();
        }

        WORDS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(WORDS[0])
            .to_string()
    }
}

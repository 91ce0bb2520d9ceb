use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

use crate::decoder::Symbol;
use crate::error::GameError;
use crate::words::validate_word;

/// What applying one symbol did to the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    /// The typed buffer changed
    Typed,
    /// Nothing changed (full buffer, empty backspace, telemetry, finished round)
    Ignored,
    /// Enter with the wrong word; buffer cleared, round continues
    Mismatch,
    /// Enter with the right word; the round is over
    Completed(Duration),
}

/// One round of play, from the start trigger to completion
#[derive(Debug, Clone)]
pub struct Session {
    word: String,
    typed: Vec<char>,
    started_at: DateTime<Local>,
    started: Instant,
    running: bool,
}

impl Session {
    pub fn start(word: &str) -> Result<Self, GameError> {
        Self::start_at(word, Local::now(), Instant::now())
    }

    pub fn start_at(
        word: &str,
        started_at: DateTime<Local>,
        started: Instant,
    ) -> Result<Self, GameError> {
        validate_word(word)?;
        Ok(Self {
            word: word.to_string(),
            typed: Vec::with_capacity(word.chars().count()),
            started_at,
            started,
            running: true,
        })
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn typed(&self) -> String {
        self.typed.iter().collect()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn apply(&mut self, symbol: &Symbol) -> Applied {
        self.apply_at(symbol, Instant::now())
    }

    pub fn apply_at(&mut self, symbol: &Symbol, now: Instant) -> Applied {
        if !self.running {
            return Applied::Ignored;
        }

        match symbol {
            Symbol::Letter(c) => {
                if self.typed.len() < self.word.chars().count() {
                    self.typed.push(*c);
                    Applied::Typed
                } else {
                    Applied::Ignored
                }
            }
            Symbol::Backspace => match self.typed.pop() {
                Some(_) => Applied::Typed,
                None => Applied::Ignored,
            },
            Symbol::Enter => {
                if self.typed() == self.word {
                    self.running = false;
                    Applied::Completed(now.saturating_duration_since(self.started))
                } else {
                    self.typed.clear();
                    Applied::Mismatch
                }
            }
            Symbol::Telemetry(_) => Applied::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn session(word: &str) -> Session {
        Session::start(word).unwrap()
    }

    fn type_word(s: &mut Session, word: &str) {
        for c in word.chars() {
            s.apply(&Symbol::Letter(c));
        }
    }

    #[test]
    fn test_start_resets_state() {
        let s = session("TAR");
        assert_eq!(s.word(), "TAR");
        assert_eq!(s.typed(), "");
        assert!(s.is_running());
    }

    #[test]
    fn test_start_rejects_bad_word() {
        assert_matches!(Session::start("CUP"), Err(GameError::InvalidWord(_)));
    }

    #[test]
    fn test_letters_fill_up_to_word_length() {
        let mut s = session("TAR");
        assert_eq!(s.apply(&Symbol::Letter('T')), Applied::Typed);
        type_word(&mut s, "AR");
        assert_eq!(s.typed(), "TAR");

        // buffer is full, extra letters are dropped
        assert_eq!(s.apply(&Symbol::Letter('S')), Applied::Ignored);
        assert_eq!(s.typed(), "TAR");
    }

    #[test]
    fn test_buffer_never_exceeds_word_length() {
        let mut s = session("ANT");
        let symbols = [
            Symbol::Letter('A'),
            Symbol::Letter('N'),
            Symbol::Backspace,
            Symbol::Letter('N'),
            Symbol::Letter('T'),
            Symbol::Letter('T'),
            Symbol::Letter('E'),
            Symbol::Backspace,
            Symbol::Letter('D'),
            Symbol::Letter('D'),
        ];
        for symbol in &symbols {
            s.apply(symbol);
            assert!(s.typed().len() <= s.word().len());
        }
        assert_eq!(s.typed(), "AND");
    }

    #[test]
    fn test_backspace_on_empty_buffer_is_noop() {
        let mut s = session("TAR");
        assert_eq!(s.apply(&Symbol::Backspace), Applied::Ignored);
        assert_eq!(s.typed(), "");

        s.apply(&Symbol::Letter('T'));
        assert_eq!(s.apply(&Symbol::Backspace), Applied::Typed);
        assert_eq!(s.typed(), "");
    }

    #[test]
    fn test_enter_with_matching_word_completes() {
        let start = Instant::now();
        let mut s = Session::start_at("TAR", Local::now(), start).unwrap();
        type_word(&mut s, "TAR");

        let applied = s.apply_at(&Symbol::Enter, start + Duration::from_millis(42_500));
        assert_eq!(applied, Applied::Completed(Duration::from_millis(42_500)));
        assert!(!s.is_running());
    }

    #[test]
    fn test_completed_session_is_frozen() {
        let mut s = session("TAR");
        type_word(&mut s, "TAR");
        assert_matches!(s.apply(&Symbol::Enter), Applied::Completed(_));

        assert_eq!(s.apply(&Symbol::Backspace), Applied::Ignored);
        assert_eq!(s.apply(&Symbol::Enter), Applied::Ignored);
        assert_eq!(s.typed(), "TAR");
    }

    #[test]
    fn test_enter_with_wrong_word_clears_and_keeps_running() {
        let mut s = session("TAR");
        type_word(&mut s, "RAT");
        assert_eq!(s.apply(&Symbol::Enter), Applied::Mismatch);
        assert_eq!(s.typed(), "");
        assert_eq!(s.word(), "TAR");
        assert!(s.is_running());

        type_word(&mut s, "TAR");
        assert_matches!(s.apply(&Symbol::Enter), Applied::Completed(_));
    }

    #[test]
    fn test_enter_on_partial_word_is_mismatch() {
        let mut s = session("TAR");
        type_word(&mut s, "TA");
        assert_eq!(s.apply(&Symbol::Enter), Applied::Mismatch);
        assert!(s.is_running());
    }

    #[test]
    fn test_telemetry_does_not_touch_buffer() {
        let mut s = session("TAR");
        s.apply(&Symbol::Letter('T'));
        assert_eq!(
            s.apply(&Symbol::Telemetry("F1".to_string())),
            Applied::Ignored
        );
        assert_eq!(s.typed(), "T");
    }
}

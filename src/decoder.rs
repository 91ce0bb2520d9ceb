use std::collections::HashMap;

/// Tags that mark a token as sensor telemetry: four flex channels, three axes.
pub const TELEMETRY_TAGS: [&str; 7] = ["F1", "F2", "F3", "F4", "X", "Y", "Z"];

/// Raw keypad codes sent by the glove and what each one means.
pub const KEYPAD: [(&str, Key); 12] = [
    ("A", Key::Letter('T')),
    ("B", Key::Letter('R')),
    ("C", Key::Letter('A')),
    ("D", Key::Backspace),
    ("E", Key::Letter('S')),
    ("F", Key::Letter('L')),
    ("G", Key::Letter('I')),
    ("H", Key::Letter('N')),
    ("I", Key::Enter),
    ("J", Key::Letter('D')),
    ("K", Key::Letter('C')),
    ("L", Key::Letter('E')),
];

/// The ten letters reachable from the keypad.
pub const ALPHABET: [char; 10] = ['T', 'R', 'A', 'S', 'L', 'I', 'N', 'D', 'C', 'E'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Letter(char),
    Backspace,
    Enter,
}

/// One decoded token of a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Letter(char),
    Backspace,
    Enter,
    Telemetry(String),
}

impl From<Key> for Symbol {
    fn from(key: Key) -> Self {
        match key {
            Key::Letter(c) => Symbol::Letter(c),
            Key::Backspace => Symbol::Backspace,
            Key::Enter => Symbol::Enter,
        }
    }
}

pub fn is_telemetry_token(token: &str) -> bool {
    TELEMETRY_TAGS.iter().any(|tag| token.contains(tag))
}

/// Stateless frame decoder over a fixed keypad table.
#[derive(Debug, Clone)]
pub struct Decoder {
    keypad: HashMap<String, Key>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::with_keypad(KEYPAD)
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a decoder for a glove with a different keypad wiring.
    pub fn with_keypad<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Key)>,
        S: Into<String>,
    {
        Self {
            keypad: entries
                .into_iter()
                .map(|(code, key)| (code.into(), key))
                .collect(),
        }
    }

    /// Classify a single token. Telemetry wins over the keypad table, unknown
    /// tokens yield nothing.
    pub fn decode_token(&self, token: &str) -> Option<Symbol> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }

        if is_telemetry_token(token) {
            return Some(Symbol::Telemetry(token.to_string()));
        }

        self.keypad.get(token).copied().map(Symbol::from)
    }

    /// Lazily decode one frame (a comma separated line) into symbols, in order.
    pub fn decode_line<'a>(&'a self, line: &'a str) -> impl Iterator<Item = Symbol> + 'a {
        line.trim()
            .split(',')
            .filter_map(move |token| self.decode_token(token))
    }
}

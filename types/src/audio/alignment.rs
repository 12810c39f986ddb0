/// Character-level timing that accompanies an audio chunk.
///
/// The three arrays are parallel: `chars[i]` starts at `char_start_times_ms[i]`
/// and lasts `char_durations_ms[i]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Alignment {
    chars: Vec<String>,
    char_start_times_ms: Vec<u32>,
    char_durations_ms: Vec<u32>,
}

impl Alignment {
    pub fn new(chars: Vec<String>, char_start_times_ms: Vec<u32>, char_durations_ms: Vec<u32>) -> Self {
        Self {
            chars,
            char_start_times_ms,
            char_durations_ms,
        }
    }

    pub fn chars(&self) -> &[String] {
        &self.chars
    }

    pub fn char_start_times_ms(&self) -> &[u32] {
        &self.char_start_times_ms
    }

    pub fn char_durations_ms(&self) -> &[u32] {
        &self.char_durations_ms
    }

    /// True when all three arrays have the same length.
    pub fn is_consistent(&self) -> bool {
        self.chars.len() == self.char_start_times_ms.len()
            && self.chars.len() == self.char_durations_ms.len()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The aligned text, in order.
    pub fn text(&self) -> String {
        self.chars.concat()
    }
}

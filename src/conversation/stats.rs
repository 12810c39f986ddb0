/// Counters for one conversation handle, kept across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionStats {
    frames_received: u64,
    frames_malformed: u64,
    frames_ignored: u64,
    audio_chunks: u64,
    pings_answered: u64,
}

impl SessionStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_frame(&mut self) {
        self.frames_received += 1;
    }

    pub(crate) fn record_malformed(&mut self) {
        self.frames_malformed += 1;
    }

    pub(crate) fn record_ignored(&mut self) {
        self.frames_ignored += 1;
    }

    pub(crate) fn record_audio_chunk(&mut self) {
        self.audio_chunks += 1;
    }

    pub(crate) fn record_pong(&mut self) {
        self.pings_answered += 1;
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn frames_malformed(&self) -> u64 {
        self.frames_malformed
    }

    pub fn frames_ignored(&self) -> u64 {
        self.frames_ignored
    }

    pub fn audio_chunks(&self) -> u64 {
        self.audio_chunks
    }

    pub fn pings_answered(&self) -> u64 {
        self.pings_answered
    }
}

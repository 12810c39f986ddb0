mod alignment;
mod consts;

pub use alignment::Alignment;
pub use consts::*;
/// Audio data encoded as base64
pub type Base64EncodedAudioBytes = String;

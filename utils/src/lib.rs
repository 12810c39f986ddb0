pub mod audio;
pub mod playback;

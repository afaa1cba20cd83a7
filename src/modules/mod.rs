pub mod encode;
pub mod playback;

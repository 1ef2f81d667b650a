// Playback side: the loaded playlist, the external player contract, the
// controller driving it, and the rodio-backed player

pub mod audio;
pub mod controller;
pub mod handle;
pub mod playlist;
pub mod progress;
pub mod speed;

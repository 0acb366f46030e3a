pub mod classifier;
pub mod decoder;
pub mod gate;
pub mod gemini;
pub mod preview;

// Synth module - Click sound generation

pub mod click;
pub mod envelope;
pub mod filter;
pub mod noise;
pub mod oscillator;

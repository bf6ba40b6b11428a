//! Audio module for voice note handling
//!
//! Inspects downloaded Opus/Ogg voice notes

pub mod processor;

pub use processor::AudioProcessor;

//! Live camera + voice chat with Gemini's native audio model.
//!
//! Microphone audio and periodic camera stills stream up to the Gemini Live
//! API; the model's spoken replies stream back and are played gap-free, with
//! transcripts of both sides collected into a conversation log.

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod upload;

#[cfg(test)]
mod testing;

//! Quiz generator service - streams AI-generated quiz questions as they are produced
//!
//! Questions are requested from a chat-completion API as newline-separated JSON
//! objects; the streamed reply is reassembled into complete objects and each one
//! is forwarded to the client as a server-sent event the moment it is parseable.

pub mod ai;
pub mod error;
pub mod models;
pub mod prompts;
pub mod server;
pub mod stream;

pub use error::{Error, Result};

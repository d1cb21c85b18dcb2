//! Typed wire schemas for the gateway.
//!
//! Three protocol families live here:
//! - `openai`: the OpenAI chat-completions surface exposed to clients.
//! - `gemini`: the Gemini generate-content request/response shapes.
//! - `antigravity`: the internal upstream envelope wrapped around a Gemini
//!   request.
//!
//! Every struct carries an `extra` catch-all map so unknown fields survive a
//! round-trip instead of breaking deserialization when either side of the
//! protocol grows new fields.

pub mod antigravity;
pub mod gemini;
pub mod openai;

pub mod chat;
pub mod gemini;
pub mod models;
pub mod respond;

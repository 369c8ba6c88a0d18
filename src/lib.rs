pub mod chunking;
pub mod cli;
pub mod config;
pub mod documents;
pub mod download;
pub mod driver;
pub mod extract;
pub mod global;
pub mod media;
pub mod naming;
pub mod pipeline;
pub mod transcription;

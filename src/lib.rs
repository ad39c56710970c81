// src/lib.rs — Library root for Deja Q

pub mod api;
pub mod cli;
pub mod index;
pub mod infra;
pub mod intake;
pub mod integrations;
pub mod provider;
pub mod summarizer;
pub mod util;

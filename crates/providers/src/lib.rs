//! Language-model provider implementations for Concierge.
//!
//! All providers implement the `concierge_core::Provider` trait.
//! `router::build_from_config` selects the configured one.

pub mod openai_compat;
pub mod router;
pub mod workers_ai;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
pub use workers_ai::WorkersAiProvider;

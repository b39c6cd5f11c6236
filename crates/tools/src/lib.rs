//! Tool implementations for Concierge.
//!
//! A tool is invoked at most once per cycle, when the user's message hits
//! one of its trigger keywords. Its output reaches the prompt as a one-line
//! `ToolNote`.

pub mod weather;

pub use weather::WeatherInvoker;

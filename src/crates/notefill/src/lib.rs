//! # notefill
//!
//! Bulk LLM field filling for flashcard note exports. Takes a row file
//! exported from a collection (JSON or CSV), renders a prompt per row from a
//! template, drives the rows through a completion provider concurrently with
//! retries, and writes results back crash-safely so interrupted jobs resume
//! where they left off.
//!
//! The heavy lifting lives in the `engine` crate; this crate is the
//! command-line surface: argument parsing, preferences, the progress
//! display, interrupt handling, and the final report.

// Core modules
pub mod cli;
pub mod prefs;
pub mod shutdown;

// Re-export key types for convenience
pub use prefs::Preferences;
pub use shutdown::{ShutdownCoordinator, INTERRUPT_EXIT_CODE};

//! CLI command handlers.

pub mod fields;
pub mod models;
pub mod report;
pub mod run;

pub use fields::FieldsArgs;
pub use run::RunArgs;

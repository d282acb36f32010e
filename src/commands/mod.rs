//! CLI commands for ticketeval

pub mod analyze;
pub mod dispatch;
pub mod failures;
pub mod list;
pub mod provider;
pub mod render;
pub mod run;
pub mod show;

//! Ticketeval Core Library
//!
//! Evaluation run engine for model-generated bug tickets: dataset ingestion,
//! output parsing, rule checking, severity scoring, failure classification,
//! metrics aggregation and durable run artifacts.

pub mod classify;
pub mod compliance;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod logging;
pub mod metrics;
pub mod parse;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod rules;
pub mod run;
pub mod severity;
pub mod store;
pub mod ticket;
pub mod validate;

//! Canvas editor for directed, acyclic chains of rules.

mod component;
mod config;
mod cycle;
mod error;
mod history;
mod interaction;
mod pan;
mod render;
mod schedule;
mod state;
mod store;
mod types;

pub use component::RuleCanvas;

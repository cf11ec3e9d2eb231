//! Core library for the agent relay
//!
//! This crate contains the data model and collaborators shared by the
//! gateway dispatcher, including:
//! - Agent event and chat payload wire types
//! - Gateway configuration and its loaders
//! - Heartbeat ack-token classification and visibility rules
//! - Run-context and session-entry stores

pub mod chat;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod heartbeat;
pub mod run_context;
pub mod session;
pub mod verbose;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

//! # QuickBooks Web Connector Bridge Library
//!
//! Core functionality for the bridge service: the QBXML adapter, the durable
//! sync log, the Web Connector SOAP protocol, and the sync orchestrator.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod db;
pub mod domain;
pub mod error;
pub mod event_consumer;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod protocol;
pub mod qbxml;
pub mod repositories;
pub mod server;
pub mod sessions;
pub mod soap;
pub mod telemetry;
pub use migration;

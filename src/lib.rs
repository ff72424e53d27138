//! Flight Agent - conversational dual-source flight search
//!
//! This library provides provider adapters for Sky Scrapper and Google
//! Flights, a comparator merging their offers, the tools exposing them to a
//! Gemini-backed agent loop, and the CLI front end.

pub mod agent;
pub mod adapters;
pub mod config;
pub mod error;
pub mod providers;
pub mod search;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};

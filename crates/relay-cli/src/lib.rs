//! Relay CLI library.
//!
//! This crate provides the `relay` command-line harness for booting the
//! application controller and exercising the event bus.

pub mod cli;
pub mod commands;

//! Payrun - HR/payroll record administration.
//!
//! This crate provides both the `payrun` CLI and a library exposing the
//! built-in payroll dependency schema, repository configuration and the
//! application context that wires a JSONL record store to the cascade engine
//! from [`payrun_cascade`].

#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod schema;

//! Terminal host for the GTP runtime.
//!
//! Two surfaces drive games through [`gtp_runtime::SessionRegistry`]: an
//! interactive `play` loop and an NDJSON `batch` stream whose operations
//! mirror the start and move request handlers of a web host.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod protocol;

#[cfg(test)]
pub(crate) mod testing;

//! knn-router server: HTTP gateway and command-line entrypoints.

pub mod cli;
pub mod commands;
pub mod gateway;

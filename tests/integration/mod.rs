//! Integration tests for traced_hello
//!
//! Each test starts the server in-process on ephemeral ports, with spans
//! collected in memory, and drives it over real HTTP with reqwest.
//! Run with: cargo test --test integration

mod helpers;

mod http_basic;
mod internal_server;
mod propagation;

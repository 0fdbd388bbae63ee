//! Single-node proof-of-work ledger: a transaction pool sealed into
//! hash-linked blocks, wallet bookkeeping, adaptive difficulty and an
//! integrity check, exposed over a REST API.

pub mod api;
pub mod blockchain;
pub mod config;

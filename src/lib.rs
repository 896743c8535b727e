//! TapWallet Backend Library
//!
//! Wallet ledger, purchase orchestration and provider clients for the
//! TapWallet VTU platform. The binary in `main.rs` wires these together;
//! integration tests drive the router directly.

pub mod api;
pub mod catalog;
pub mod config;
pub mod providers;
pub mod purchase;
pub mod wallet;
pub mod webhook;

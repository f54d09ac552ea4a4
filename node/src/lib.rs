// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod api;
pub mod capture;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod server;
pub mod sync;
pub mod telemetry;
pub mod verifier;

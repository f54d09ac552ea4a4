// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    pub ledger_url: String,
    /// None disables offline durability (degraded mode).
    pub queue_path: Option<PathBuf>,
    pub window_size: usize,
    pub auth_token: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            ledger_url: "http://127.0.0.1:8000".to_string(),
            queue_path: Some(PathBuf::from("provena-pending.log")),
            window_size: provena_core::DEFAULT_WINDOW_SIZE,
            auth_token: None,
        }
    }
}

impl NodeConfig {
    /// Defaults with environment overrides: PROVENA_BIND_ADDR,
    /// PROVENA_LEDGER_URL, PROVENA_QUEUE_PATH, PROVENA_WINDOW_SIZE,
    /// PROVENA_AUTH_TOKEN.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(addr) = std::env::var("PROVENA_BIND_ADDR") {
            if let Ok(parsed) = addr.parse() {
                cfg.bind_addr = parsed;
            }
        }
        if let Ok(url) = std::env::var("PROVENA_LEDGER_URL") {
            cfg.ledger_url = url;
        }
        if let Ok(path) = std::env::var("PROVENA_QUEUE_PATH") {
            cfg.queue_path = Some(PathBuf::from(path));
        }
        if let Ok(size) = std::env::var("PROVENA_WINDOW_SIZE") {
            if let Ok(parsed) = size.parse() {
                cfg.window_size = parsed;
            }
        }
        if let Ok(token) = std::env::var("PROVENA_AUTH_TOKEN") {
            cfg.auth_token = Some(token);
        }
        cfg
    }
}

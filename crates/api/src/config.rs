use std::time::Duration;

use wayside_dispatch::DispatchConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Dispatch engine tunables.
    pub dispatch: DispatchConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `3000`                  |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                    |
    /// | `DISPATCH_RADIUS_KM`         | `15`                    |
    /// | `DISPATCH_MAX_CANDIDATES`    | `5`                     |
    /// | `DISPATCH_ACCEPT_WINDOW_SECS`| `20`                    |
    /// | `DISPATCH_MAX_ROUNDS`        | `3`                     |
    /// | `DISPATCH_WIDEN_FACTOR`      | `1.5`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();
        let dispatch = dispatch_config_from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            dispatch,
        }
    }
}

fn dispatch_config_from_env() -> DispatchConfig {
    let defaults = DispatchConfig::default();

    let search_radius_km: f64 = std::env::var("DISPATCH_RADIUS_KM")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.search_radius_km);
    let max_candidates: usize = std::env::var("DISPATCH_MAX_CANDIDATES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.max_candidates);
    let accept_window = std::env::var("DISPATCH_ACCEPT_WINDOW_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(defaults.accept_window);
    let max_rounds: u32 = std::env::var("DISPATCH_MAX_ROUNDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.max_rounds);
    let widen_factor: f64 = std::env::var("DISPATCH_WIDEN_FACTOR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.widen_factor);

    DispatchConfig {
        search_radius_km,
        max_candidates,
        accept_window,
        max_rounds,
        widen_factor,
    }
}

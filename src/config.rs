//! Runtime configuration, loaded once and shared by both servers.
//!
//! Mirrors the singleton pattern in the app module this crate started
//! from: a `Lazy`-initialized instance behind a lock, with an explicit
//! `init` escape hatch for callers (tests) that want to override defaults
//! before first use.

use std::sync::RwLock;

use once_cell::sync::Lazy;

/// What a stub RPC (`BatchWrite`, `BeginTransaction`, `Rollback`) does when
/// invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnUnimplemented {
    /// Log and return `UNIMPLEMENTED` (default).
    Warn,
    /// Panic the process.
    Throw,
}

impl OnUnimplemented {
    fn from_env(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "throw" => Self::Throw,
            _ => Self::Warn,
        }
    }
}

/// Process-wide configuration for the Firestore and Identity Toolkit
/// servers.
#[derive(Debug, Clone)]
pub struct Config {
    /// gRPC listen port for the Firestore service.
    pub port: u16,
    /// Listen host for the Firestore service.
    pub host: String,
    /// Informational project id; requests may specify any project.
    pub project_id: String,
    /// Emit a debug line per incoming gRPC request.
    pub verbose_grpc_logs: bool,
    /// Behavior when a stub RPC is invoked.
    pub on_unimplemented: OnUnimplemented,
    /// HTTP listen port for the Identity Toolkit emulator.
    pub auth_port: u16,
    /// Listen host for the Identity Toolkit emulator.
    pub auth_host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3333,
            host: "localhost".to_string(),
            project_id: "demo-project".to_string(),
            verbose_grpc_logs: false,
            on_unimplemented: OnUnimplemented::Warn,
            auth_port: 9099,
            auth_host: "localhost".to_string(),
        }
    }
}

impl Config {
    /// Build the default configuration, overridden by `PORT`, `HOST`,
    /// `PROJECT_ID` and `LOGS_VERBOSE_GRPC_LOGS` when those environment
    /// variables are present.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        if let Ok(project_id) = std::env::var("PROJECT_ID") {
            config.project_id = project_id;
        }
        if let Ok(verbose) = std::env::var("LOGS_VERBOSE_GRPC_LOGS") {
            config.verbose_grpc_logs = matches!(verbose.as_str(), "1" | "true" | "TRUE");
        }
        if let Ok(on_unimplemented) = std::env::var("LOGS_ON_UNIMPLEMENTED") {
            config.on_unimplemented = OnUnimplemented::from_env(&on_unimplemented);
        }

        config
    }

    /// The socket address the Firestore gRPC server should bind.
    ///
    /// Binding `localhost` widens to `[::]` so both IPv4 and IPv6 clients
    /// reach the same port; any other configured host is used verbatim.
    pub fn bind_addr(&self) -> String {
        if self.host == "localhost" {
            format!("[::]:{}", self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The socket address the Identity Toolkit HTTP server should bind.
    pub fn auth_bind_addr(&self) -> String {
        if self.auth_host == "localhost" {
            format!("[::]:{}", self.auth_port)
        } else {
            format!("{}:{}", self.auth_host, self.auth_port)
        }
    }
}

static INSTANCE: Lazy<RwLock<Option<Config>>> = Lazy::new(|| RwLock::new(None));

impl Config {
    /// Explicitly seed the global config. Only has an effect the first
    /// time it is called; later calls are ignored so that the instance
    /// stays immutable for the lifetime of the process, per spec.
    pub fn init(config: Config) {
        let mut guard = INSTANCE.write().unwrap();
        if guard.is_none() {
            *guard = Some(config);
        }
    }

    /// Return the global config, initializing it from the environment on
    /// first access if nobody called [`Config::init`] first.
    pub fn global() -> Config {
        {
            let guard = INSTANCE.read().unwrap();
            if let Some(config) = guard.as_ref() {
                return config.clone();
            }
        }
        let mut guard = INSTANCE.write().unwrap();
        if guard.is_none() {
            *guard = Some(Config::from_env());
        }
        guard.as_ref().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3333);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.project_id, "demo-project");
        assert!(!config.verbose_grpc_logs);
        assert_eq!(config.on_unimplemented, OnUnimplemented::Warn);
        assert_eq!(config.auth_port, 9099);
    }

    #[test]
    fn localhost_binds_dual_stack() {
        let config = Config {
            host: "localhost".to_string(),
            port: 4000,
            ..Config::default()
        };
        assert_eq!(config.bind_addr(), "[::]:4000");
    }

    #[test]
    fn explicit_host_is_used_verbatim() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 4000,
            ..Config::default()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:4000");
    }

    #[test]
    fn on_unimplemented_parses_throw() {
        assert_eq!(OnUnimplemented::from_env("throw"), OnUnimplemented::Throw);
        assert_eq!(OnUnimplemented::from_env("warn"), OnUnimplemented::Warn);
        assert_eq!(OnUnimplemented::from_env("garbage"), OnUnimplemented::Warn);
    }
}

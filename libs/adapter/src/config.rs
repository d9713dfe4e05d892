//! Environment-based configuration for one subsystem's adapter.
//!
//! Each subsystem carries exactly two optional overrides - an explicit native
//! module path and an explicit worker binary path - plus its own loopback
//! port. Everything else defaults to the conventions below.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AdapterError, Result};

/// Configuration for one adapter instance.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Subsystem name, lowercase; used for environment prefixes and default
    /// artifact names.
    pub subsystem: String,

    /// Loopback port the subsystem's worker binds. Each subsystem owns its
    /// own fixed port; this is configuration, not a universal constant.
    pub port: u16,

    /// Native module to try for the linked tier.
    pub native_module: PathBuf,

    /// Worker binary to try for the subprocess tier.
    pub worker_bin: PathBuf,

    /// Timeout for the single probe connection during resolution.
    pub probe_timeout: Duration,

    /// Dial and read timeout for each subprocess call.
    pub call_timeout: Duration,

    /// Fixed wait after spawning the worker, before the probe connection.
    pub spawn_grace: Duration,
}

impl AdapterConfig {
    /// Build the configuration for `subsystem`, honoring the
    /// `<SUBSYSTEM>_NATIVE_LIB` and `<SUBSYSTEM>_WORKER_BIN` environment
    /// overrides and falling back to the default artifact locations.
    pub fn from_env(subsystem: &str, port: u16) -> Self {
        let prefix = subsystem.to_ascii_uppercase();

        let native_module = env::var(format!("{prefix}_NATIVE_LIB"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_native_module(subsystem));

        let worker_bin = env::var(format!("{prefix}_WORKER_BIN"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_worker_bin(subsystem));

        Self {
            subsystem: subsystem.to_string(),
            port,
            native_module,
            worker_bin,
            probe_timeout: Duration::from_millis(300),
            call_timeout: Duration::from_millis(500),
            spawn_grace: Duration::from_millis(300),
        }
    }

    /// Reject configurations the adapter cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.subsystem.is_empty() {
            return Err(AdapterError::InvalidConfig(
                "subsystem name cannot be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(AdapterError::InvalidConfig(
                "port 0 cannot be dialed".to_string(),
            ));
        }
        if self.call_timeout.is_zero() || self.probe_timeout.is_zero() {
            return Err(AdapterError::InvalidConfig(
                "timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_native_module(subsystem: &str) -> PathBuf {
    PathBuf::from(format!(
        "{}{}_native{}",
        env::consts::DLL_PREFIX,
        subsystem,
        env::consts::DLL_SUFFIX
    ))
}

fn default_worker_bin(subsystem: &str) -> PathBuf {
    PathBuf::from("target/debug").join(format!("{}-worker{}", subsystem, env::consts::EXE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_platform_conventions() {
        let config = AdapterConfig::from_env("engine", 9094);
        assert_eq!(config.subsystem, "engine");
        assert_eq!(config.port, 9094);
        let module = config.native_module.to_string_lossy().into_owned();
        assert!(module.contains("engine_native"), "got {module}");
        let worker = config.worker_bin.to_string_lossy().into_owned();
        assert!(worker.contains("engine-worker"), "got {worker}");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_win() {
        env::set_var("CFGTEST_NATIVE_LIB", "/opt/native/libcfg.so");
        env::set_var("CFGTEST_WORKER_BIN", "/opt/bin/cfg-worker");

        let config = AdapterConfig::from_env("cfgtest", 9099);
        assert_eq!(config.native_module, PathBuf::from("/opt/native/libcfg.so"));
        assert_eq!(config.worker_bin, PathBuf::from("/opt/bin/cfg-worker"));

        env::remove_var("CFGTEST_NATIVE_LIB");
        env::remove_var("CFGTEST_WORKER_BIN");
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let mut config = AdapterConfig::from_env("engine", 9094);
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = AdapterConfig::from_env("engine", 9094);
        config.subsystem.clear();
        assert!(config.validate().is_err());

        let mut config = AdapterConfig::from_env("engine", 9094);
        config.call_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}

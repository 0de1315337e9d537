//! Process-wide settings of the engine.
//!
//! An [`AIConfig`] is built once at startup and handed to the pool, the coordinator and the
//! runner. It can be created programmatically with [`AIConfig::new()`] and the `with_*` methods,
//! or read from the environment with [`AIConfig::from_env()`].
//!
//! # Environment Variables
//!
//! The production knobs are required; `from_env` fails when one is missing or unparsable:
//!
//! - `MAX_CONCURRENT_WORKERS`: size of the match worker pool
//! - `AGENT_POOL_SIZE`: idle agents created per difficulty/personality pair
//! - `MOVE_TIMEOUT_MS`: hard per-move limit, usually `100`
//! - `MIN_THINKING_TIME_MS`: decisions faster than this raise the fraud score
//! - `STRESS_TEST_TIMEOUT_S`: wall-clock limit of a stress run
//!
//! Optional flags (set to `"true"`, case-insensitive):
//!
//! - `ENGINE_VERBOSE`: print stress progress to stdout (default: `true`)
//! - `ENGINE_LOG`: write a log file in the working directory (default: `false`)

use std::{env, str::FromStr, time::Duration};

use anyhow::{ensure, Context};

/// Hard real-time limit of a single decision.
pub const REALTIME_LIMIT_MS: f32 = 100.0;

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AIConfig {
    pub(crate) max_concurrent_workers: usize,
    pub(crate) agent_pool_size: usize,
    pub(crate) move_timeout_ms: f32,
    pub(crate) min_thinking_time_ms: f32,
    pub(crate) stress_test_timeout: Duration,
    pub(crate) verbose: bool,
    pub(crate) log: bool,
}

impl AIConfig {
    /// Create a configuration suited to development and tests.
    ///
    /// By default:
    /// - one worker per logical CPU, at most 10
    /// - 3 idle agents per difficulty/personality pair
    /// - a 100ms move timeout and a 5ms minimum thinking time
    /// - a 60s stress test timeout
    /// - verbose output, no log file
    pub fn new() -> Self {
        Self {
            max_concurrent_workers: num_cpus::get().clamp(1, 10),
            agent_pool_size: 3,
            move_timeout_ms: REALTIME_LIMIT_MS,
            min_thinking_time_ms: 5.0,
            stress_test_timeout: Duration::from_secs(60),
            verbose: true,
            log: false,
        }
    }

    /// Read the configuration from environment variables.
    ///
    /// # Errors
    /// Returns an error naming the first required variable that is missing or cannot be parsed,
    /// or when the values are inconsistent (see [`validate`](Self::validate)).
    pub fn from_env() -> anyhow::Result<Self> {
        fn required<T>(var: &str) -> anyhow::Result<T>
        where
            T: FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            let raw = env::var(var).with_context(|| format!("{var} must be set"))?;
            raw.trim()
                .parse()
                .with_context(|| format!("could not parse {var}='{raw}'"))
        }

        fn get_env_flag(var: &str, default: bool) -> bool {
            match env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        let config = Self {
            max_concurrent_workers: required("MAX_CONCURRENT_WORKERS")?,
            agent_pool_size: required("AGENT_POOL_SIZE")?,
            move_timeout_ms: required("MOVE_TIMEOUT_MS")?,
            min_thinking_time_ms: required("MIN_THINKING_TIME_MS")?,
            stress_test_timeout: Duration::from_secs(required("STRESS_TEST_TIMEOUT_S")?),
            verbose: get_env_flag("ENGINE_VERBOSE", true),
            log: get_env_flag("ENGINE_LOG", false),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values can actually run matches.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.max_concurrent_workers >= 1,
            "MAX_CONCURRENT_WORKERS must be at least 1"
        );
        ensure!(self.agent_pool_size >= 1, "AGENT_POOL_SIZE must be at least 1");
        ensure!(
            self.move_timeout_ms.is_finite() && self.move_timeout_ms > 0.0,
            "MOVE_TIMEOUT_MS must be positive, got {}",
            self.move_timeout_ms
        );
        ensure!(
            self.min_thinking_time_ms.is_finite() && self.min_thinking_time_ms >= 0.0,
            "MIN_THINKING_TIME_MS must not be negative, got {}",
            self.min_thinking_time_ms
        );
        Ok(())
    }

    /// Size of the match worker pool.
    pub fn with_max_concurrent_workers(mut self, value: usize) -> Self {
        self.max_concurrent_workers = value;
        self
    }

    /// Idle agents created up front per difficulty/personality pair.
    pub fn with_agent_pool_size(mut self, value: usize) -> Self {
        self.agent_pool_size = value;
        self
    }

    /// Hard per-move limit in milliseconds. Agents never get more than this.
    pub fn with_move_timeout_ms(mut self, value: f32) -> Self {
        self.move_timeout_ms = value;
        self
    }

    /// Minimum plausible thinking time in milliseconds.
    pub fn with_min_thinking_time_ms(mut self, value: f32) -> Self {
        self.min_thinking_time_ms = value;
        self
    }

    /// Wall-clock limit of a stress run.
    pub fn with_stress_test_timeout(mut self, value: Duration) -> Self {
        self.stress_test_timeout = value;
        self
    }

    /// Enable or disable progress output.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Size of the match worker pool.
    pub fn max_concurrent_workers(&self) -> usize {
        self.max_concurrent_workers
    }

    /// Idle agents per pair.
    pub fn agent_pool_size(&self) -> usize {
        self.agent_pool_size
    }

    /// Hard per-move limit.
    pub fn move_timeout_ms(&self) -> f32 {
        self.move_timeout_ms
    }

    /// Minimum plausible thinking time.
    pub fn min_thinking_time_ms(&self) -> f32 {
        self.min_thinking_time_ms
    }

    /// Stress run limit.
    pub fn stress_test_timeout(&self) -> Duration {
        self.stress_test_timeout
    }
}

impl Default for AIConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod configuration_tests {
    use super::*;

    const VARS: [&str; 5] = [
        "MAX_CONCURRENT_WORKERS",
        "AGENT_POOL_SIZE",
        "MOVE_TIMEOUT_MS",
        "MIN_THINKING_TIME_MS",
        "STRESS_TEST_TIMEOUT_S",
    ];

    // the only test touching the environment
    #[test]
    fn from_env_requires_every_knob() {
        for var in VARS {
            env::remove_var(var);
        }
        let err = AIConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("MAX_CONCURRENT_WORKERS"));

        for (var, value) in VARS.iter().zip(["4", "2", "100", "3.5", "30"]) {
            env::set_var(var, value);
        }
        let config = AIConfig::from_env().unwrap();
        assert_eq!(config.max_concurrent_workers(), 4);
        assert_eq!(config.agent_pool_size(), 2);
        assert_eq!(config.move_timeout_ms(), 100.0);
        assert_eq!(config.min_thinking_time_ms(), 3.5);
        assert_eq!(config.stress_test_timeout(), Duration::from_secs(30));

        env::set_var("AGENT_POOL_SIZE", "lots");
        let err = AIConfig::from_env().unwrap_err();
        assert!(format!("{err:#}").contains("AGENT_POOL_SIZE"));

        env::set_var("AGENT_POOL_SIZE", "0");
        assert!(AIConfig::from_env().is_err());

        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = AIConfig::new()
            .with_max_concurrent_workers(2)
            .with_move_timeout_ms(80.0)
            .with_verbose(false);
        assert_eq!(config.max_concurrent_workers(), 2);
        assert_eq!(config.move_timeout_ms(), 80.0);
        assert!(config.validate().is_ok());
        assert!(config.with_max_concurrent_workers(0).validate().is_err());
    }
}

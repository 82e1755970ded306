use envconfig::Envconfig;
use lazy_static::lazy_static;
use std::{str::FromStr, time::Duration};

lazy_static! {
    pub static ref ENV_VARS: EnvVars = EnvVars::from_env()
        .unwrap_or_else(|e| panic!("invalid environment configuration: {}", e));
}

/// Process configuration, read once from the environment.
#[derive(Clone, Debug)]
pub struct EnvVars {
    inner: Inner,
}

impl EnvVars {
    pub fn from_env() -> Result<Self, envconfig::Error> {
        let inner = Inner::init_from_env()?;
        Ok(Self { inner })
    }

    /// Set by the environment variable `TRELLIS_GRAPHQL_QUERY_TIMEOUT`
    /// (expressed in seconds). No default value is provided.
    pub fn graphql_query_timeout(&self) -> Option<Duration> {
        self.inner
            .graphql_query_timeout_in_secs
            .map(Duration::from_secs)
    }

    /// Set by the environment variable `TRELLIS_GRAPHQL_MAX_DEPTH`. The
    /// default value is 255.
    pub fn graphql_max_depth(&self) -> u8 {
        self.inner.graphql_max_depth
    }

    /// How many sibling fields or list elements are evaluated at the same
    /// time. Set by the environment variable
    /// `TRELLIS_GRAPHQL_FIELD_CONCURRENCY`; the default value is 32.
    pub fn graphql_field_concurrency(&self) -> usize {
        self.inner.graphql_field_concurrency.max(1)
    }

    /// Whether a schema field without a resolver capability is an error
    /// when resolvers are verified. Set by `TRELLIS_STRICT_BINDINGS`.
    pub fn strict_bindings(&self) -> bool {
        self.inner.strict_bindings.0
    }

    /// Set by `TRELLIS_LOG_QUERY_TIMING`.
    pub fn log_query_timing(&self) -> bool {
        self.inner.log_query_timing.0
    }
}

impl Default for EnvVars {
    fn default() -> Self {
        Self {
            inner: Inner {
                graphql_query_timeout_in_secs: None,
                graphql_max_depth: 255,
                graphql_field_concurrency: 32,
                strict_bindings: EnvVarBoolean(false),
                log_query_timing: EnvVarBoolean(false),
            },
        }
    }
}

#[derive(Clone, Debug, Envconfig)]
struct Inner {
    #[envconfig(from = "TRELLIS_GRAPHQL_QUERY_TIMEOUT")]
    graphql_query_timeout_in_secs: Option<u64>,
    #[envconfig(from = "TRELLIS_GRAPHQL_MAX_DEPTH", default = "255")]
    graphql_max_depth: u8,
    #[envconfig(from = "TRELLIS_GRAPHQL_FIELD_CONCURRENCY", default = "32")]
    graphql_field_concurrency: usize,
    #[envconfig(from = "TRELLIS_STRICT_BINDINGS", default = "false")]
    strict_bindings: EnvVarBoolean,
    #[envconfig(from = "TRELLIS_LOG_QUERY_TIMING", default = "false")]
    log_query_timing: EnvVarBoolean,
}

#[derive(Copy, Clone, Debug)]
struct EnvVarBoolean(pub bool);

impl FromStr for EnvVarBoolean {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" | "1" => Ok(Self(true)),
            "false" | "0" => Ok(Self(false)),
            _ => Err("Invalid env. var. flag, expected true / false / 1 / 0".to_string()),
        }
    }
}

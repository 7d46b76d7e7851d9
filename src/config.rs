use crate::errors::RuntimeError;

/// Environment variable naming the `host:port` of the runtime API.
pub const ENV_RUNTIME_API: &str = "AWS_LAMBDA_RUNTIME_API";
pub const ENV_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";
pub const ENV_FUNCTION_VERSION: &str = "AWS_LAMBDA_FUNCTION_VERSION";
pub const ENV_LOG_GROUP_NAME: &str = "AWS_LAMBDA_LOG_GROUP_NAME";
pub const ENV_LOG_STREAM_NAME: &str = "AWS_LAMBDA_LOG_STREAM_NAME";
pub const ENV_MEMORY_SIZE: &str = "AWS_LAMBDA_FUNCTION_MEMORY_SIZE";
/// Handler selection, as configured on the function.
pub const ENV_HANDLER: &str = "_HANDLER";

/// Runtime API version segment of every protocol path.
pub const DEFAULT_API_VERSION: &str = "2018-06-01";

/// Memory limit reported when the environment does not provide a usable one.
pub const DEFAULT_MEMORY_LIMIT_MB: u32 = 256;

/// Connection settings for the host's runtime API.
///
/// # Example
///
/// ```rust
/// use s3_notify_runtime::RuntimeConfig;
///
/// let config = RuntimeConfig::new("127.0.0.1:9001");
/// assert_eq!(config.base_url(), "http://127.0.0.1:9001/2018-06-01/runtime");
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// `host:port` of the runtime API, or a full `http://` origin.
    pub runtime_api: String,
    /// Protocol version path segment.
    pub api_version: String,
}

impl RuntimeConfig {
    /// Create a config pointing at the given runtime API address.
    pub fn new(runtime_api: impl Into<String>) -> Self {
        Self {
            runtime_api: runtime_api.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Override the protocol version path segment.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Read the config from the process environment.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the config through an arbitrary variable lookup.
    ///
    /// A missing or blank runtime API address is a startup error.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let runtime_api = lookup(ENV_RUNTIME_API)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RuntimeError::Config(format!("{} is not set", ENV_RUNTIME_API)))?;

        let stray_path = runtime_api.contains('/') && !has_scheme(&runtime_api);
        if stray_path || runtime_api.contains(char::is_whitespace) {
            return Err(RuntimeError::Config(format!(
                "{} is malformed: {:?}",
                ENV_RUNTIME_API, runtime_api
            )));
        }

        Ok(Self::new(runtime_api))
    }

    /// The base URL every protocol path is appended to.
    pub fn base_url(&self) -> String {
        let origin = self.runtime_api.trim_end_matches('/');
        if has_scheme(origin) {
            format!("{}/{}/runtime", origin, self.api_version)
        } else {
            format!("http://{}/{}/runtime", origin, self.api_version)
        }
    }
}

fn has_scheme(addr: &str) -> bool {
    addr.starts_with("http://") || addr.starts_with("https://")
}

// ---------------------------------------------------------------------------
// Function metadata
// ---------------------------------------------------------------------------

/// Process-wide function metadata, read once at startup.
///
/// Absent values are empty strings; the memory limit falls back to
/// [`DEFAULT_MEMORY_LIMIT_MB`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionMetadata {
    pub function_name: String,
    pub function_version: String,
    pub log_group_name: String,
    pub log_stream_name: String,
    pub memory_limit_mb: u32,
}

impl Default for FunctionMetadata {
    fn default() -> Self {
        Self {
            function_name: String::new(),
            function_version: String::new(),
            log_group_name: String::new(),
            log_stream_name: String::new(),
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
        }
    }
}

impl FunctionMetadata {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).unwrap_or_default();
        let memory_limit_mb = lookup(ENV_MEMORY_SIZE)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_MEMORY_LIMIT_MB);

        Self {
            function_name: text(ENV_FUNCTION_NAME),
            function_version: text(ENV_FUNCTION_VERSION),
            log_group_name: text(ENV_LOG_GROUP_NAME),
            log_stream_name: text(ENV_LOG_STREAM_NAME),
            memory_limit_mb,
        }
    }
}

// ---------------------------------------------------------------------------
// Handler selection
// ---------------------------------------------------------------------------

/// Which event shape the bootstrap binary dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// S3 notifications delivered straight to the function.
    Direct,
    /// S3 notifications relayed through an SNS topic.
    Sns,
}

impl HandlerKind {
    /// Resolve the handler from the `_HANDLER` value.
    ///
    /// No value selects [`HandlerKind::Sns`]. Class-style names such as
    /// `com.example.handler.S3EventHandler::handleRequest` are accepted.
    pub fn from_setting(value: Option<&str>) -> crate::Result<Self> {
        let value = match value.map(str::trim) {
            None | Some("") => return Ok(HandlerKind::Sns),
            Some(v) => v,
        };

        let name = value
            .split("::")
            .next()
            .unwrap_or(value)
            .rsplit('.')
            .next()
            .unwrap_or(value)
            .to_ascii_lowercase();

        match name.as_str() {
            "s3snseventhandler" | "sns" => Ok(HandlerKind::Sns),
            "s3eventhandler" | "direct" | "s3" => Ok(HandlerKind::Direct),
            _ => Err(RuntimeError::Config(format!(
                "unknown handler {:?} in {}",
                value, ENV_HANDLER
            ))),
        }
    }

    pub fn from_env() -> crate::Result<Self> {
        Self::from_setting(std::env::var(ENV_HANDLER).ok().as_deref())
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;

/// Struct to represent IO errors.
#[derive(Debug)]
pub struct IoErrorStruct {
    /// The type of IO error.
    error_type: String,

    /// The error message.
    msg: String,
}

/// Struct to represent validation / configuration errors.
#[derive(Debug)]
pub struct ValidationErrorStruct {
    /// The error message.
    msg: String,
}

/// Struct to represent request errors (ASN lookups, HTTP collaborators).
#[derive(Debug)]
pub struct RequestErrorStruct {
    /// The error message.
    msg: String,
}

/// Struct to represent DNS errors.
#[derive(Debug)]
pub struct DNSErrorStruct {
    /// The error message.
    msg: String,
}

/// Struct to represent resolver construction failures.
#[derive(Debug)]
pub struct ResolverInitErrorStruct {
    msg: String,
}

/// Fatal errors that abort the pipeline before (or during) a run.
///
/// Per-host resolution failures are never represented here: those are
/// swallowed by the worker that produced them, and logged as a [`Notice`]
/// instead. This enum is reserved for configuration/IO/initialization
/// failures that the top-level run surfaces to the caller with a non-zero
/// exit code.
#[derive(Debug)]
pub enum RunnerError {
    IoError(IoErrorStruct),
    /// Bad flags, missing input source, conflicting options.
    ConfigError(ValidationErrorStruct),
    /// IO failure reading an input source mid-stream.
    InputReadError(IoErrorStruct),
    /// The DNS client (or its transport) could not be constructed.
    ResolverInitError(ResolverInitErrorStruct),
    RequestError(RequestErrorStruct),
    DNSError(DNSErrorStruct),
}

impl RunnerError {
    /// Create a new configuration error.
    pub fn config_error(msg: impl Into<String>) -> Self {
        RunnerError::ConfigError(ValidationErrorStruct { msg: msg.into() })
    }

    /// Create a new input-read error carrying the offending IO error kind.
    pub fn input_read_error(error: &std::io::Error) -> Self {
        RunnerError::InputReadError(IoErrorStruct {
            error_type: error.kind().to_string(),
            msg: error.to_string(),
        })
    }

    /// Create a new resolver initialization error.
    pub fn resolver_init_error(msg: impl Into<String>) -> Self {
        RunnerError::ResolverInitError(ResolverInitErrorStruct { msg: msg.into() })
    }
}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerError::IoError(io_err) => {
                write!(f, "IO {} Error: {}", io_err.error_type, io_err.msg)
            }
            RunnerError::ConfigError(validation_err) => {
                write!(f, "Config Error: {}", validation_err.msg)
            }
            RunnerError::InputReadError(io_err) => {
                write!(f, "Input Read {} Error: {}", io_err.error_type, io_err.msg)
            }
            RunnerError::ResolverInitError(err) => {
                write!(f, "Resolver Init Error: {}", err.msg)
            }
            RunnerError::RequestError(request_err) => {
                write!(f, "Request Error: {}", request_err.msg)
            }
            RunnerError::DNSError(dns_err) => {
                write!(f, "DNS Error: {}", dns_err.msg)
            }
        }
    }
}

impl std::error::Error for RunnerError {}

impl From<std::io::Error> for RunnerError {
    fn from(error: std::io::Error) -> Self {
        RunnerError::IoError(IoErrorStruct {
            error_type: error.kind().to_string(),
            msg: error.to_string(),
        })
    }
}

impl From<reqwest::Error> for RunnerError {
    fn from(error: reqwest::Error) -> Self {
        RunnerError::RequestError(RequestErrorStruct {
            msg: error.to_string(),
        })
    }
}

impl From<hickory_resolver::ResolveError> for RunnerError {
    fn from(error: hickory_resolver::ResolveError) -> Self {
        RunnerError::DNSError(DNSErrorStruct {
            msg: error.to_string(),
        })
    }
}

/// Non-fatal conditions logged during a run. These never reach a
/// `Result::Err` — they are constructed purely so call sites can log a
/// consistent, typed message at the right severity.
#[derive(Debug)]
pub enum Notice {
    /// A query returned a non-empty but incomplete answer; the partial
    /// result is used as-is.
    QueryPartial { host: String, detail: String },
    /// A query returned nothing usable; the host is dropped silently.
    QueryEmpty { host: String },
    /// Writing an answer into the work set failed.
    StoreError { host: String, detail: String },
    /// The resume file could not be parsed; it is ignored.
    ResumeCorrupt { detail: String },
}

impl Notice {
    pub fn log(&self) {
        match self {
            Notice::QueryPartial { host, detail } => {
                log::debug!("partial answer for {host}: {detail}");
            }
            Notice::QueryEmpty { host } => {
                log::debug!("empty answer for {host}, dropping");
            }
            Notice::StoreError { host, detail } => {
                log::debug!("failed to store answer for {host}: {detail}");
            }
            Notice::ResumeCorrupt { detail } => {
                log::warn!("resume file corrupt, ignoring: {detail}");
            }
        }
    }
}

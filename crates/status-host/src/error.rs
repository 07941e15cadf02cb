//! Error types for the status host binary.
//!
//! [`HostError`] is the top-level error type that wraps all possible
//! failure modes during host startup, the game loop, and shutdown.

/// Top-level error for the status host binary.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Status server configuration loading failed.
    #[error("status config error: {source}")]
    StatusConfig {
        /// The underlying config error.
        #[from]
        source: status_server::ConfigError,
    },

    /// Game configuration loading failed.
    #[error("game config error: {message}")]
    Config {
        /// Description of the config failure.
        message: String,
    },

    /// The serving runtime could not be built.
    #[error("runtime error: {source}")]
    Runtime {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The status page template failed to compile.
    #[error("template error: {source}")]
    Template {
        /// The underlying template error.
        #[from]
        source: status_server::template::TemplateError,
    },

    /// The status server failed to start, stopped unexpectedly, or its
    /// lifecycle signal was lost.
    #[error("status server error: {message}")]
    StatusServer {
        /// Description of the server failure.
        message: String,
    },
}


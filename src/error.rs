/// Errors raised at the I/O edges (config file, score tables).
///
/// The simulation core itself has no error paths: rejected commands are
/// reported as `false` and exhausted maze generation degrades to the
/// fallback maze.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("config.toml parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid rules: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("score table I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

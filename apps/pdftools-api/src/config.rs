//! Settings read from the environment

use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3002;
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Largest accepted request body; base64 inflates payloads by a third
    pub max_body_bytes: usize,
    /// When set, every result is also written here
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            output_dir: None,
        }
    }
}

impl Config {
    /// `PORT`, `PDFTOOLS_MAX_BODY_BYTES` and `PDFTOOLS_OUTPUT_DIR`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            max_body_bytes: lookup("PDFTOOLS_MAX_BODY_BYTES")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            output_dir: lookup("PDFTOOLS_OUTPUT_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

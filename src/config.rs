use std::path::PathBuf;

pub const LOG_ENV: &str = "PRAIRIED_LOG";
pub const STANDARDS_ENV: &str = "PRAIRIED_STANDARDS";
pub const WORKSPACE_ENV: &str = "PRAIRIED_WORKSPACE";

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_filter: String,
    /// Alternate standards document; the bundled table is used when unset.
    pub standards_path: Option<PathBuf>,
    /// Workspace opened before the first request.
    pub workspace: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            standards_path: None,
            workspace: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            log_filter: non_blank(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            standards_path: non_blank(STANDARDS_ENV).map(PathBuf::from),
            workspace: non_blank(WORKSPACE_ENV).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.log_filter, "warn");
    }

    #[test]
    fn reads_and_trims_values() {
        let env: HashMap<&str, &str> = [
            (LOG_ENV, " prairied=debug "),
            (STANDARDS_ENV, "/tmp/standards.json"),
            (WORKSPACE_ENV, "   "),
        ]
        .into_iter()
        .collect();
        let cfg = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.log_filter, "prairied=debug");
        assert_eq!(cfg.standards_path, Some(PathBuf::from("/tmp/standards.json")));
        assert_eq!(cfg.workspace, None);
    }
}

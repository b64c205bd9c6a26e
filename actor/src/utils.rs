//! Utility functions

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::warnings::Warnings;

/// Version information for cfactor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Render warnings for the terminal, one highlighted line each
pub fn format_warnings(warnings: &Warnings) -> Vec<String> {
    warnings.iter().map(|w| w.yellow().bold().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let version = version_info();
        assert_eq!(version.version, env!("CARGO_PKG_VERSION"));
        // A short commit hash inside a checkout, "unknown" outside one
        let hash = &version.git_hash;
        assert!(
            hash == "unknown" || (!hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit())),
            "unexpected git hash {:?}",
            hash
        );
        assert!(!version.build_time.is_empty());
    }

    #[test]
    fn test_format_warnings_keeps_order() {
        colored::control::set_override(false);
        let lines = format_warnings(&Warnings::from(vec!["w1", "w2"]));
        assert_eq!(lines, vec!["w1", "w2"]);
    }
}

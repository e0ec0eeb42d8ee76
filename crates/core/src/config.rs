use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub output: OutputConfig,
    pub analysis: AnalysisConfig,
    pub log: LogConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `REVIEW_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("REVIEW_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            output: OutputConfig::from_env_profiled(p),
            analysis: AnalysisConfig::from_env_profiled(p),
            log: LogConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  output:      dir={}, write_json={}",
            self.output.dir.display(),
            self.output.write_json
        );
        tracing::info!(
            "  analysis:    thresholds={}",
            self.analysis
                .thresholds_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in defaults)".to_string())
        );
        tracing::info!("  log:         filter={}", self.log.filter);
    }
}

// ── Output ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the markdown reports and JSON side files.
    pub dir: PathBuf,
    /// Also write `analysis_results.json` and `chart_data.json`.
    pub write_json: bool,
}

impl OutputConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dir: PathBuf::from(profiled_env_or(p, "REVIEW_OUTPUT_DIR", "output")),
            write_json: profiled_env_bool(p, "REVIEW_WRITE_JSON", true),
        }
    }
}

// ── Analysis ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// `AnalysisThresholds` YAML; built-in defaults when unset.
    pub thresholds_path: Option<PathBuf>,
}

impl AnalysisConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            thresholds_path: profiled_env_opt(p, "REVIEW_THRESHOLDS").map(PathBuf::from),
        }
    }
}

// ── Logging ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
}

impl LogConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            filter: profiled_env_or(p, "REVIEW_LOG", "info"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own profile prefix so parallel tests don't collide.

    #[test]
    fn defaults_without_env() {
        let config = Config::for_profile("CFGTESTDEFAULTS");
        assert_eq!(config.profile_label(), "CFGTESTDEFAULTS");
        assert!(config.output.write_json || env_opt("REVIEW_WRITE_JSON").is_some());
    }

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("CFGTESTPROF_REVIEW_OUTPUT_DIR", "/tmp/review-prof");
        let config = Config::for_profile("cfgtestprof");
        assert_eq!(config.output.dir, PathBuf::from("/tmp/review-prof"));
        env::remove_var("CFGTESTPROF_REVIEW_OUTPUT_DIR");
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        env::set_var("CFGTESTBOOL_REVIEW_WRITE_JSON", "no");
        assert!(!Config::for_profile("CFGTESTBOOL").output.write_json);
        env::set_var("CFGTESTBOOL_REVIEW_WRITE_JSON", "Yes");
        assert!(Config::for_profile("CFGTESTBOOL").output.write_json);
        env::remove_var("CFGTESTBOOL_REVIEW_WRITE_JSON");
    }

    #[test]
    fn empty_profile_label_is_default() {
        let config = Config::for_profile("");
        assert_eq!(config.profile_label(), "default");
    }
}

use std::env;

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

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Comma-separated list; blank items are dropped.
fn profiled_env_list(profile: &str, key: &str, default: &[&str]) -> Vec<String> {
    match profiled_env_opt(profile, key) {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}

const DEFAULT_EDGE_KINDS: &[&str] = &["Result", "Lookup"];
const DEFAULT_EXCLUDED_LABELS: &[&str] = &["Type", "Concept", "fail"];
const DEFAULT_TYPE_PREFIXES: &[&str] = &["NAME.DISEASE.", "NAME.DRUG."];

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub compiler: CompilerConfig,
    pub executor: ExecutorConfig,
    pub catalog: CatalogConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `KGPATH_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("KGPATH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            compiler: CompilerConfig::from_env_profiled(p),
            executor: ExecutorConfig::from_env_profiled(p),
            catalog: CatalogConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  compiler:  edge_kinds={}, name={}, type={}",
            self.compiler.edge_kinds.join("|"),
            self.compiler.name_property,
            self.compiler.type_property
        );
        tracing::info!(
            "  executor:  slow_query_ms={}, cache_capacity={}",
            self.executor.slow_query_ms,
            self.executor.cache_capacity
        );
        tracing::info!(
            "  catalog:   excluded={}, prefixes={}",
            self.catalog.excluded_labels.join("|"),
            self.catalog.type_prefixes.join("|")
        );
    }
}

// ── Compiler ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Relationship kinds every compiled edge is restricted to.
    pub edge_kinds: Vec<String>,
    pub name_property: String,
    pub type_property: String,
    pub id_property: String,
    /// Column name of the projected `{id, bound}` list.
    pub projection_column: String,
}

impl CompilerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            edge_kinds: profiled_env_list(p, "KGPATH_EDGE_KINDS", DEFAULT_EDGE_KINDS),
            name_property: profiled_env_or(p, "KGPATH_NAME_PROPERTY", "name"),
            type_property: profiled_env_or(p, "KGPATH_TYPE_PROPERTY", "node_type"),
            id_property: profiled_env_or(p, "KGPATH_ID_PROPERTY", "id"),
            projection_column: profiled_env_or(p, "KGPATH_PROJECTION_COLUMN", "nodes"),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            edge_kinds: DEFAULT_EDGE_KINDS.iter().map(|s| s.to_string()).collect(),
            name_property: "name".to_string(),
            type_property: "node_type".to_string(),
            id_property: "id".to_string(),
            projection_column: "nodes".to_string(),
        }
    }
}

// ── Executor ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Executions slower than this are logged at warn level.
    pub slow_query_ms: u64,
    /// Capacity of the compiled-query cache.
    pub cache_capacity: usize,
}

impl ExecutorConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            slow_query_ms: profiled_env_u64(p, "KGPATH_SLOW_QUERY_MS", 5000),
            cache_capacity: profiled_env_usize(p, "KGPATH_CACHE_CAPACITY", 128),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            slow_query_ms: 5000,
            cache_capacity: 128,
        }
    }
}

// ── Catalog ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Structural labels; a label row containing any of them is skipped.
    pub excluded_labels: Vec<String>,
    /// Prefixes stripped from looked-up template values.
    pub type_prefixes: Vec<String>,
}

impl CatalogConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            excluded_labels: profiled_env_list(p, "KGPATH_EXCLUDED_LABELS", DEFAULT_EXCLUDED_LABELS),
            type_prefixes: profiled_env_list(p, "KGPATH_TYPE_PREFIXES", DEFAULT_TYPE_PREFIXES),
        }
    }

    /// Strip the first matching type prefix from a looked-up value.
    pub fn strip_type_prefix<'a>(&self, value: &'a str) -> &'a str {
        self.type_prefixes
            .iter()
            .find_map(|prefix| value.strip_prefix(prefix.as_str()))
            .unwrap_or(value)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            excluded_labels: DEFAULT_EXCLUDED_LABELS.iter().map(|s| s.to_string()).collect(),
            type_prefixes: DEFAULT_TYPE_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

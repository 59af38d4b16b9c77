//! Configuration file support for Flowlens
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.flowlensrc.json` in project root
//! 3. `flowlens.config.json` in project root
//! 4. `"flowlens"` key in `package.json`
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::batch::DEFAULT_MAX_FILE_SIZE;
use crate::language::Language;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default exclude patterns applied when no config is specified
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*.test.ts",
    "**/*.test.tsx",
    "**/*.test.js",
    "**/*.test.jsx",
    "**/*.spec.ts",
    "**/*.spec.tsx",
    "**/*.spec.js",
    "**/*.spec.jsx",
    "**/node_modules/**",
    "**/__tests__/**",
    "**/__mocks__/**",
    "**/dist/**",
    "**/build/**",
];

/// Flowlens configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowlensConfig {
    /// Glob patterns for files to include (default: all supported extensions)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for files to exclude (default: test files, node_modules, dist)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Keep only call targets defined in the analyzed files (default: false)
    #[serde(default)]
    pub resolve_calls: Option<bool>,

    /// Language for files without a recognized extension (default: typescript)
    #[serde(default)]
    pub default_language: Option<String>,

    /// Skip files larger than this many bytes (default: 1 MiB)
    #[serde(default)]
    pub max_file_size: Option<u64>,

    /// Worker threads for batch analysis (default: one per core)
    #[serde(default)]
    pub jobs: Option<usize>,
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Compiled include patterns (empty means include all)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    /// True when the config supplied its own excludes instead of the defaults
    pub custom_exclude: bool,
    pub resolve_calls: bool,
    pub default_language: Language,
    pub max_file_size: u64,
    /// None leaves the choice to rayon
    pub jobs: Option<usize>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
    /// Directory include/exclude patterns are relative to (None: the analyzed directory)
    pub project_root: Option<PathBuf>,
}

impl FlowlensConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(jobs) = self.jobs {
            if jobs == 0 {
                anyhow::bail!("jobs must be at least 1 (got 0)");
            }
        }

        if let Some(size) = self.max_file_size {
            if size == 0 {
                anyhow::bail!("max_file_size must be positive (got 0)");
            }
        }

        if let Some(ref name) = self.default_language {
            if Language::from_name(name).is_none() {
                anyhow::bail!(
                    "default_language must be one of typescript, tsx, javascript, jsx (got {:?})",
                    name
                );
            }
        }

        // Validate glob patterns compile
        for pattern in &self.include {
            Glob::new(pattern).with_context(|| format!("invalid include pattern: {}", pattern))?;
        }
        for pattern in &self.exclude {
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        // Compile include patterns
        let include = if self.include.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &self.include {
                builder.add(Glob::new(pattern)?);
            }
            Some(builder.build()?)
        };

        // Compile exclude patterns, falling back to the defaults
        let exclude = {
            let mut builder = GlobSetBuilder::new();
            if self.exclude.is_empty() {
                for pattern in DEFAULT_EXCLUDES {
                    builder.add(Glob::new(pattern)?);
                }
            } else {
                for pattern in &self.exclude {
                    builder.add(Glob::new(pattern)?);
                }
            }
            builder.build()?
        };

        let default_language = self
            .default_language
            .as_deref()
            .and_then(Language::from_name)
            .unwrap_or_default();

        Ok(ResolvedConfig {
            include,
            exclude,
            custom_exclude: !self.exclude.is_empty(),
            resolve_calls: self.resolve_calls.unwrap_or(false),
            default_language,
            max_file_size: self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE),
            jobs: self.jobs,
            config_path: None,
            project_root: None,
        })
    }
}

impl ResolvedConfig {
    /// Check if a file path should be included based on include/exclude patterns
    pub fn should_include(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        // Check exclude first
        if self.exclude.is_match(path_str.as_ref()) {
            return false;
        }

        // If include patterns exist, file must match at least one
        if let Some(ref include) = self.include {
            return include.is_match(path_str.as_ref());
        }

        true
    }

    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        FlowlensConfig::default().resolve()
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.flowlensrc.json`
/// 2. `flowlens.config.json`
/// 3. `"flowlens"` key in `package.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(FlowlensConfig, PathBuf)>> {
    // 1. .flowlensrc.json
    let rc_path = project_root.join(".flowlensrc.json");
    if rc_path.exists() {
        let config = load_config_file(&rc_path)?;
        return Ok(Some((config, rc_path)));
    }

    // 2. flowlens.config.json
    let config_path = project_root.join("flowlens.config.json");
    if config_path.exists() {
        let config = load_config_file(&config_path)?;
        return Ok(Some((config, config_path)));
    }

    // 3. package.json "flowlens" key
    let pkg_path = project_root.join("package.json");
    if pkg_path.exists() {
        if let Some(config) = load_from_package_json(&pkg_path)? {
            return Ok(Some((config, pkg_path)));
        }
    }

    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<FlowlensConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: FlowlensConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load flowlens config from the "flowlens" key in package.json
fn load_from_package_json(path: &Path) -> Result<Option<FlowlensConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let pkg: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    match pkg.get("flowlens") {
        Some(value) => {
            let config: FlowlensConfig = serde_json::from_value(value.clone())
                .with_context(|| format!("invalid flowlens config in {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid flowlens config in {}", path.display()))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (FlowlensConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    resolved.project_root = Some(project_root.to_path_buf());
    Ok(resolved)
}

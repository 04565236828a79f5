//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of external CLI
//! tools (ffmpeg, ffprobe) and provides lookup methods for the rest of the
//! crate.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Configuration for a single external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string, if the tool reported one.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the config supplies a custom path **and**
    /// that path exists, it is used directly. Otherwise [`which::which`]
    /// locates the tool in `PATH`. Tools that are not found are silently
    /// omitted from the registry.
    pub fn discover(tools_config: &fw_core::config::ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                "ffprobe" => tools_config.ffprobe_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                _ => which::which(name).ok(),
            };

            match resolved {
                Some(path) => {
                    tracing::debug!(tool = name, path = %path.display(), "tool discovered");
                    tools.insert(
                        name.to_string(),
                        ToolConfig {
                            name: name.to_string(),
                            path,
                        },
                    );
                }
                None => {
                    tracing::debug!(tool = name, "tool not found");
                }
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit paths (primarily for tests).
    pub fn from_paths(paths: impl IntoIterator<Item = (String, PathBuf)>) -> Self {
        let tools = paths
            .into_iter()
            .map(|(name, path)| (name.clone(), ToolConfig { name, path }))
            .collect();
        Self { tools }
    }

    /// Look up a tool, if discovered.
    pub fn get(&self, name: &str) -> Option<&ToolConfig> {
        self.tools.get(name)
    }

    /// Look up a tool, failing with a tool error when missing.
    pub fn require(&self, name: &str) -> fw_core::Result<&ToolConfig> {
        self.tools.get(name).ok_or_else(|| {
            fw_core::Error::tool(name, "not found on PATH and no configured path")
        })
    }

    /// Report availability and versions for every known tool.
    pub async fn check_all(&self) -> Vec<ToolInfo> {
        let mut infos = Vec::with_capacity(KNOWN_TOOLS.len());
        for &name in KNOWN_TOOLS {
            let info = match self.tools.get(name) {
                Some(config) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: query_version(&config.path).await,
                    path: Some(config.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            };
            infos.push(info);
        }
        infos
    }
}

/// Run `<tool> -version` and pull a semver-ish version out of the first
/// line. Returns the raw first line when no parseable version is found.
async fn query_version(path: &PathBuf) -> Option<String> {
    let output = crate::command::ToolCommand::new(path.clone())
        .arg("-version")
        .timeout(std::time::Duration::from_secs(10))
        .execute()
        .await
        .ok()?;

    let first_line = output.stdout.lines().next()?.to_string();
    for token in first_line.split_whitespace() {
        let trimmed = token.trim_start_matches(|c: char| !c.is_ascii_digit());
        if semver::Version::parse(trimmed).is_ok() {
            return Some(trimmed.to_string());
        }
    }
    Some(first_line)
}

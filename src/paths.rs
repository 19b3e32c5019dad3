/// Centralized platform-specific path computation
///
/// Provides consistent path handling across Windows, macOS, and Linux following
/// XDG Base Directory specification on Unix-like systems.
use std::path::PathBuf;

const APP_DIR: &str = "java-rag";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

/// Which base directory to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseDir {
    Data,
    Cache,
    Config,
}

impl BaseDir {
    fn xdg_var(self) -> &'static str {
        match self {
            BaseDir::Data => "XDG_DATA_HOME",
            BaseDir::Cache => "XDG_CACHE_HOME",
            BaseDir::Config => "XDG_CONFIG_HOME",
        }
    }

    fn home_suffix(self) -> &'static str {
        match self {
            BaseDir::Data => ".local/share",
            BaseDir::Cache => ".cache",
            BaseDir::Config => ".config",
        }
    }

    fn macos_suffix(self) -> &'static str {
        match self {
            BaseDir::Cache => "Library/Caches",
            BaseDir::Data | BaseDir::Config => "Library/Application Support",
        }
    }

    fn windows_var(self) -> &'static str {
        match self {
            BaseDir::Config => "APPDATA",
            BaseDir::Data | BaseDir::Cache => "LOCALAPPDATA",
        }
    }
}

/// Linux/Unix resolution: `$XDG_*_HOME`, then `$HOME/<suffix>`, then `.`
fn resolve_unix(base: BaseDir, lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup(base.xdg_var())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| lookup("HOME").map(|home| PathBuf::from(home).join(base.home_suffix())))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn resolve(base: BaseDir) -> PathBuf {
    let env = |key: &str| std::env::var(key).ok();
    if cfg!(target_os = "windows") {
        env(base.windows_var())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    } else if cfg!(target_os = "macos") {
        env("HOME")
            .map(|home| PathBuf::from(home).join(base.macos_suffix()))
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        resolve_unix(base, env)
    }
}

impl PlatformPaths {
    /// Get the appropriate data directory for the current platform
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_DATA_HOME or ~/.local/share
    pub fn data_dir() -> PathBuf {
        resolve(BaseDir::Data)
    }

    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Caches
    /// - Linux/Unix: $XDG_CACHE_HOME or ~/.cache
    pub fn cache_dir() -> PathBuf {
        resolve(BaseDir::Cache)
    }

    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        resolve(BaseDir::Config)
    }

    /// Returns: {data_dir}/java-rag
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR)
    }

    /// Returns: {cache_dir}/java-rag
    pub fn project_cache_dir() -> PathBuf {
        Self::cache_dir().join(APP_DIR)
    }

    /// Returns: {config_dir}/java-rag
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR)
    }

    /// Returns: {data_dir}/java-rag/lancedb
    pub fn default_lancedb_path() -> PathBuf {
        Self::project_data_dir().join("lancedb")
    }

    /// Where downloaded embedding models are kept
    ///
    /// Returns: {cache_dir}/java-rag/models
    pub fn default_model_cache_path() -> PathBuf {
        Self::project_cache_dir().join("models")
    }

    /// Returns: {config_dir}/java-rag/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

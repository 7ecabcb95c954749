use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".gj.json";

/// Commands used to talk to the id-utils index.
///
/// Every field may be an absolute path or a bare program name resolved through `PATH`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Lookup command. When unset, `gid` is used (or `gid32` on macOS if `gid` is missing).
    pub gid: Option<String>,
    pub lid: String,
    pub mkid: String,
    /// Language map passed to `mkid -m` when building the index.
    pub lang_map: Option<PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            gid: None,
            lid: "lid".to_string(),
            mkid: "mkid".to_string(),
            lang_map: None,
        }
    }
}

/// Controls how match lists and symbol listings are drawn.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Symbol-listing rows longer than this are wrapped.
    pub max_width: usize,
    /// Padding in front of wrapped continuation rows.
    pub indent: usize,
    pub color: bool,
    /// Clear the terminal before redrawing the match list.
    pub clear_screen: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_width: 120,
            indent: 8,
            color: true,
            clear_screen: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub display: DisplayConfig,
    /// Editor command line; the file position is appended as `+LINE FILE`.
    pub editor: Option<String>,
}

impl Config {
    /// Editor from config, then `$EDITOR`, then `vim`.
    pub fn editor_command(&self) -> String {
        self.editor
            .clone()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
            .unwrap_or_else(|| "vim".to_string())
    }
}

fn read_config(path: &Path) -> Option<Config> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Config>(&text) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            crate::debug_log!("[gj] ignoring malformed {}: {e}", path.display());
            None
        }
    }
}

/// Load `.gj.json` from `repo_root`, falling back to `~/.gj.json`, then to defaults.
pub fn load_config(repo_root: &Path) -> Config {
    if let Some(cfg) = read_config(&repo_root.join(CONFIG_FILE_NAME)) {
        return cfg;
    }

    dirs::home_dir()
        .and_then(|home| read_config(&home.join(CONFIG_FILE_NAME)))
        .unwrap_or_default()
}

use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{LiftError, LiftResult};

/// Knobs shared by every rule of a lifter and by the recipes nested in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiftConfig {
    /// Leading character that redirects a path to the local scratch store.
    #[serde(default = "default_local_sigil")]
    pub local_sigil: char,

    /// Treat paths without a leading `$` (or sigil) as relative to the root.
    #[serde(default = "default_true")]
    pub implicit_root: bool,

    #[serde(default)]
    pub overwrite: OverwritePolicy,
}

/// What happens when two non-multivalue writes hit the same destination in
/// one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    #[default]
    LastWriteWins,
    Reject,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            local_sigil: default_local_sigil(),
            implicit_root: default_true(),
            overwrite: OverwritePolicy::default(),
        }
    }
}

impl LiftConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> LiftResult<Self> {
        from_file(path)
    }

    pub fn strict() -> Self {
        Self {
            overwrite: OverwritePolicy::Reject,
            ..Self::default()
        }
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> LiftResult<T> {
    let file = File::open(path)
        .map_err(|e| LiftError::Config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| LiftError::Config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> LiftResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| LiftError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_local_sigil() -> char {
    '@'
}

fn default_true() -> bool {
    true
}

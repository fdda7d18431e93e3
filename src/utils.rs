//! Directory lookup following the XDG Base Directory specification
//!
//! - Config: `~/.config/fwgate/` - `config.json`

use directories::ProjectDirs;
use std::path::PathBuf;

pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "fwgate", "fwgate").map(|pd| pd.config_dir().to_path_buf())
}

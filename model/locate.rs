use crate::model::artifact::ModelError;
use std::env;
use std::path::{Path, PathBuf};

/// File name of the deployed model artifact.
pub const DEFAULT_MODEL_FILE: &str = "diabetes_model.toml";

/// The conventional artifact location: next to the running executable.
pub fn default_model_path() -> Result<PathBuf, ModelError> {
    let exe = env::current_exe()?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(DEFAULT_MODEL_FILE))
}

/// An explicit path wins; otherwise fall back to the conventional location.
pub fn resolve_model_path(explicit: Option<&Path>) -> Result<PathBuf, ModelError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_model_path(),
    }
}

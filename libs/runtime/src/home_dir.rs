use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("cannot determine the user home directory (set {0})")]
    NoUserHome(&'static str),

    #[error("cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(not(target_os = "windows"))]
const HOME_ENV: &str = "HOME";
#[cfg(target_os = "windows")]
const HOME_ENV: &str = "APPDATA";

fn user_home() -> Result<PathBuf, HomeDirError> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(HomeDirError::NoUserHome(HOME_ENV))
}

/// Resolve the service home directory to an absolute path.
///
/// - `None` falls back to `<user home>/<default_subdir>`.
/// - A leading `~` is expanded to the user home.
/// - Other relative paths are joined onto the current directory.
///
/// With `create` set, the directory (and its parents) is created.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match configured.as_deref().map(str::trim) {
        None | Some("") => user_home()?.join(default_subdir),
        Some("~") => user_home()?,
        Some(p) => match p.strip_prefix("~/").or_else(|| p.strip_prefix("~\\")) {
            Some(rest) => user_home()?.join(rest),
            None => absolute(Path::new(p))?,
        },
    };

    if create {
        std::fs::create_dir_all(&path).map_err(|source| HomeDirError::Create {
            path: path.clone(),
            source,
        })?;
    }
    Ok(path)
}

fn absolute(p: &Path) -> Result<PathBuf, HomeDirError> {
    if p.is_absolute() {
        return Ok(p.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(HomeDirError::CurrentDir)?;
    Ok(cwd.join(p))
}

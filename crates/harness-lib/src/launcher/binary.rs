//! External binary validation

use crate::error::{HarnessError, Result};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Expand a leading `~/` against `$HOME`
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Resolve a bare program name against `$PATH`; anything with a directory part is only home-expanded
pub fn resolve_program(program: &Path) -> PathBuf {
    if program.components().count() > 1 {
        return expand_home(program);
    }
    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(program))
                .find(|candidate| candidate.is_file())
        })
        .unwrap_or_else(|| program.to_path_buf())
}

/// Check that `path` is a regular, executable file and return its expanded form
pub fn validate_binary(role: &str, path: &Path) -> Result<PathBuf> {
    let expanded = expand_home(path);

    let metadata = match std::fs::metadata(&expanded) {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => {
            return Err(HarnessError::MissingBinary {
                role: role.to_string(),
                path: expanded,
            })
        }
    };

    if metadata.permissions().mode() & 0o111 == 0 {
        return Err(HarnessError::NotExecutable {
            role: role.to_string(),
            path: expanded,
        });
    }

    Ok(expanded)
}

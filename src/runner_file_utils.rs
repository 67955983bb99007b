use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Lists the regular files directly inside a directory, sorted by name
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Path is not a directory: {}",
            dir.display()
        ));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).context("Failed to read directory")? {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Lists every entry (files and directories) directly inside a directory
pub fn list_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .map(|entry| {
            entry
                .map(|e| e.path())
                .context("Failed to read directory entry")
        })
        .collect()
}

/// Submission identifier: the file name up to its first '.'
pub fn base_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_string_lossy();
    let base = file_name.split('.').next().unwrap_or_default();
    (!base.is_empty()).then(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn base_name_stops_at_first_dot() {
        assert_eq!(base_name(Path::new("subs/alice.c")), Some("alice".into()));
        assert_eq!(
            base_name(Path::new("subs/bob.v2.c")),
            Some("bob".into())
        );
        assert_eq!(base_name(Path::new("compiled/carol")), Some("carol".into()));
        assert_eq!(base_name(Path::new("subs/.hidden")), None);
    }

    #[test]
    fn lists_only_files_in_name_order() {
        let dir = TempDir::new("autocompiler_list").unwrap();
        fs::write(dir.path().join("b.c"), "").unwrap();
        fs::write(dir.path().join("a.c"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let files = list_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.c", "b.c"]);
        assert_eq!(list_entries(dir.path()).unwrap().len(), 3);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new("autocompiler_list").unwrap();
        assert!(list_files(&dir.path().join("nope")).is_err());
    }
}

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read a UTF-8 text file. Invalid UTF-8 is an error.
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid UTF-8.
pub fn read_text(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Create the parent directory of `path` if it does not exist yet.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}

/// Write UTF-8 text to `path` atomically, creating missing parent directories.
///
/// The text goes to a sibling temp file first and is renamed over the
/// destination, so readers see either the old or the new contents.
///
/// # Errors
/// Returns an error if the directory, the temp file or the rename fails.
pub fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let temp_path = temp_sibling(path);

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Windows refuses to rename over an existing file.
            if cfg!(windows) {
                fs::copy(&temp_path, path)?;
                let _ = fs::remove_file(&temp_path);
                Ok(())
            } else {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("out");
    parent.join(format!(".{name}.pkgbridge.{}", std::process::id()))
}

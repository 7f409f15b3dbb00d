//! Member photo files kept beside the workbook.

use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::keys::RollNumber;

#[derive(Clone, Debug)]
pub struct Uploads {
    dir: PathBuf,
}

impl Uploads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Uploads { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// `<RollNumber><.ext>` with anything outside `[A-Za-z0-9_-]` dropped, so a
    /// roll number can never escape the uploads directory.
    pub fn photo_name(roll: &RollNumber, original: Option<&str>) -> String {
        let stem: String = roll
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        let stem = if stem.is_empty() { "photo".to_string() } else { stem };

        let ext = original
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

        match ext {
            Some(ext) => format!("{stem}.{}", ext.to_ascii_lowercase()),
            None => stem,
        }
    }

    pub fn save(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.dir.join(file_component(name));
        fs::write(&path, bytes)?;
        info!("Photo {} saved", path.display());
        Ok(path)
    }

    /// Removes a stored photo. Missing files are not an error.
    pub fn remove(&self, name: &str) -> bool {
        let component = file_component(name);
        if component.is_empty() {
            return false;
        }
        let path = self.dir.join(component);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Photo {name} deleted");
                true
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => {
                warn!("Could not delete photo {}: {err}", path.display());
                false
            }
        }
    }
}

fn file_component(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
}

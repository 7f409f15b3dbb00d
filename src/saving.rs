use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::range::Range;
use crate::store::{MemoryStore, StoreError, TabularStore};
use crate::workbook::{Row, Workbook};

pub fn save_workbook(workbook: &Workbook, path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // Written beside the target and renamed so a crash never leaves half a workbook.
    let staging = path.with_extension("tmp");
    let file = File::create(&staging)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

    serialize_into(&mut encoder, workbook).map_err(|e| StoreError::Encoding(e.to_string()))?;

    let mut writer = encoder.finish()?;
    writer.flush()?;
    drop(writer);

    fs::rename(&staging, path)?;
    Ok(())
}

pub fn load_workbook(path: &Path) -> Result<Workbook, StoreError> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    deserialize_from(&mut reader).map_err(|e| StoreError::Encoding(e.to_string()))
}

/// A [`MemoryStore`] that saves the whole workbook to disk after every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Opens the workbook at `path`, creating a seeded one if the file is absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let workbook = if path.exists() {
            let workbook = load_workbook(&path)?;
            info!("Loaded workbook from {}", path.display());
            workbook
        } else {
            let workbook = Workbook::seeded();
            save_workbook(&workbook, &path)?;
            info!("Created new workbook at {}", path.display());
            workbook
        };

        Ok(FileStore {
            path,
            inner: MemoryStore::new(workbook),
        })
    }

    /// Applies `change` and saves. If the save fails the in-memory workbook is
    /// put back, so memory never runs ahead of the file.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Workbook) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.inner.update(|workbook| {
            let before = workbook.clone();
            let value = change(workbook)?;
            if let Err(err) = save_workbook(workbook, &self.path) {
                warn!("Saving {} failed, change discarded: {err}", self.path.display());
                *workbook = before;
                return Err(err);
            }
            debug!("Workbook saved to {}", self.path.display());
            Ok(value)
        })
    }
}

impl TabularStore for FileStore {
    fn read_range(&self, sheet: &str, range: &Range) -> Result<Vec<Row>, StoreError> {
        self.inner.read_range(sheet, range)
    }

    fn write_range(&self, sheet: &str, range: &Range, rows: &[Row]) -> Result<(), StoreError> {
        self.mutate(|workbook| workbook.write(sheet, range, rows))
    }

    fn append_row(&self, sheet: &str, range: &Range, row: &[String]) -> Result<usize, StoreError> {
        self.mutate(|workbook| workbook.append(sheet, range, row))
    }

    fn clear_range(&self, sheet: &str, range: &Range) -> Result<(), StoreError> {
        self.mutate(|workbook| workbook.clear(sheet, range))
    }

    fn delete_row(&self, sheet: &str, index: usize) -> Result<(), StoreError> {
        self.mutate(|workbook| workbook.delete_row(sheet, index))
    }
}

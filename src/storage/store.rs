//! Durable state file for the database
//!
//! File layout:
//!
//! ```text
//! +------------------+
//! | Body Length      | (u32 LE)
//! +------------------+
//! | Body             | (JSON-encoded Database)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of body)
//! +------------------+
//! ```
//!
//! Saves write a sibling temp file, fsync it, then rename over the old file.
//! A reader therefore sees either the previous or the new state, never a mix.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::checksum::{compute_checksum, verify_checksum};
use super::database::Database;
use super::errors::{StorageError, StorageResult};

const STATE_FILE: &str = "state.db";
const HEADER_LEN: usize = 4;
const TRAILER_LEN: usize = 4;

/// Loads and saves the database at `<data_dir>/data/state.db`.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("data").join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the database. A missing file yields an empty database.
    ///
    /// # Errors
    ///
    /// `DELTA_DATA_CORRUPTION` if the framing or checksum is wrong.
    pub fn load(&self) -> StorageResult<Database> {
        if !self.path.exists() {
            return Ok(Database::new());
        }

        let bytes = fs::read(&self.path).map_err(|e| {
            StorageError::read_failed(format!("Failed to read {}", self.path.display()), e)
        })?;
        let display = self.path.display().to_string();

        if bytes.len() < HEADER_LEN + TRAILER_LEN {
            return Err(StorageError::corruption_in_file(&display, "truncated state file"));
        }

        let mut len_bytes = [0u8; HEADER_LEN];
        len_bytes.copy_from_slice(&bytes[..HEADER_LEN]);
        let body_len = u32::from_le_bytes(len_bytes) as usize;

        if bytes.len() != HEADER_LEN + body_len + TRAILER_LEN {
            return Err(StorageError::corruption_in_file(
                &display,
                format!(
                    "length mismatch: header says {} bytes, file holds {}",
                    body_len,
                    bytes.len().saturating_sub(HEADER_LEN + TRAILER_LEN)
                ),
            ));
        }

        let body = &bytes[HEADER_LEN..HEADER_LEN + body_len];
        let mut sum_bytes = [0u8; TRAILER_LEN];
        sum_bytes.copy_from_slice(&bytes[HEADER_LEN + body_len..]);
        let expected = u32::from_le_bytes(sum_bytes);

        if !verify_checksum(body, expected) {
            return Err(StorageError::corruption_in_file(&display, "checksum mismatch"));
        }

        serde_json::from_slice(body).map_err(|e| {
            StorageError::corruption_in_file(&display, format!("undecodable body: {}", e))
        })
    }

    /// Atomically replaces the state file with `db`.
    pub fn save(&self, db: &Database) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to create data directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        let body = serde_json::to_vec(db).map_err(|e| {
            StorageError::write_failed_no_source(format!("Failed to encode state: {}", e))
        })?;
        let body_len = u32::try_from(body.len()).map_err(|_| {
            StorageError::write_failed_no_source("State exceeds maximum file size")
        })?;

        let mut buf = Vec::with_capacity(HEADER_LEN + body.len() + TRAILER_LEN);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&body);
        buf.extend_from_slice(&compute_checksum(&body).to_le_bytes());

        let tmp_path = self.path.with_extension("db.tmp");
        let mut file = File::create(&tmp_path).map_err(|e| {
            StorageError::write_failed(format!("Failed to create {}", tmp_path.display()), e)
        })?;
        file.write_all(&buf)
            .map_err(|e| StorageError::write_failed("Failed to write state", e))?;
        file.sync_all()
            .map_err(|e| StorageError::io_error("Failed to fsync state", e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            StorageError::write_failed(format!("Failed to replace {}", self.path.display()), e)
        })
    }
}

//! Core contract storage: no Hyper types here.
//!
//! Every contract is a pair of files in one directory: the PDF under its
//! stored name and a JSON sidecar under the same name plus `.json`. Writes go
//! through a hidden temp file and a rename, so readers never see a half
//! written PDF. The pair itself is not atomic; a PDF without a sidecar lists
//! with empty partner fields.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

use super::metadata::{ContractMetadata, MetadataStore, PartnerFields};
use super::naming;

/// The only media type `store` accepts.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Errors from contract storage.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The upload was not declared as a PDF.
    #[error("only PDF files can be uploaded (got {0:?})")]
    InvalidMediaType(String),

    /// No stored contract under this name.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Filesystem failure.
    #[error("storage error: {0}")]
    Io(#[from] io::Error),
}

/// One stored contract as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    #[serde(rename = "filename")]
    pub stored_name: String,
    pub original_name: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Modification time of the stored PDF.
    #[serde(rename = "uploadDate")]
    pub upload_timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub partner: PartnerFields,
}

/// Owns the storage directory and the stored-name to file-pair mapping.
#[derive(Debug, Clone)]
pub struct ContractRepository {
    dir: PathBuf,
    metadata: MetadataStore,
}

impl ContractRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            metadata: MetadataStore::new(dir.clone()),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory if it does not exist yet.
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Save an uploaded PDF and its partner metadata.
    ///
    /// Rejects anything not declared as `application/pdf` before touching the
    /// disk. An existing contract with the same stored name is replaced.
    pub async fn store(
        &self,
        bytes: &[u8],
        original_filename: &str,
        media_type: &str,
        partner: PartnerFields,
    ) -> Result<ContractRecord, RepoError> {
        if !is_pdf_media_type(media_type) {
            return Err(RepoError::InvalidMediaType(media_type.to_string()));
        }

        let original_name = naming::recover_mojibake(original_filename);
        let stored_name = naming::sanitize(original_filename);
        let path = self.dir.join(&stored_name);

        write_atomic(&path, bytes).await?;
        let stat = fs::metadata(&path).await?;

        let record = ContractRecord {
            stored_name,
            original_name,
            size_bytes: stat.len(),
            upload_timestamp: modified_at(&stat),
            partner,
        };
        let sidecar = ContractMetadata {
            filename: record.stored_name.clone(),
            original_name: record.original_name.clone(),
            size: record.size_bytes,
            path: path.display().to_string(),
            upload_date: Utc::now().to_rfc3339(),
            partner: record.partner.clone(),
        };
        self.metadata.write(&record.stored_name, &sidecar).await?;

        info!(
            stored_name = %record.stored_name,
            original_name = %record.original_name,
            size = record.size_bytes,
            "contract stored"
        );
        Ok(record)
    }

    /// Every stored PDF merged with its sidecar, newest first.
    pub async fn list(&self) -> Result<Vec<ContractRecord>, RepoError> {
        let mut dir = fs::read_dir(&self.dir).await?;
        let mut records = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || !naming::has_pdf_extension(&name) {
                continue;
            }
            let stat = match entry.metadata().await {
                Ok(stat) if stat.is_file() => stat,
                Ok(_) => continue,
                // Removed between read_dir and stat.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let sidecar = self.metadata.read(&name).await;
            records.push(merge(name, &stat, sidecar));
        }

        records.sort_by(|a, b| {
            b.upload_timestamp
                .cmp(&a.upload_timestamp)
                .then_with(|| a.stored_name.cmp(&b.stored_name))
        });
        Ok(records)
    }

    /// Open a stored PDF for streaming. Returns the file and its length.
    pub async fn fetch(&self, stored_name: &str) -> Result<(fs::File, u64), RepoError> {
        let path = self.resolve(stored_name)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RepoError::NotFound(stored_name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let stat = file.metadata().await?;
        if !stat.is_file() {
            return Err(RepoError::NotFound(stored_name.to_string()));
        }
        Ok((file, stat.len()))
    }

    /// Delete a stored PDF and its sidecar.
    ///
    /// A missing PDF is `NotFound` and leaves any sidecar alone.
    pub async fn remove(&self, stored_name: &str) -> Result<(), RepoError> {
        let path = self.resolve(stored_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RepoError::NotFound(stored_name.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        let had_sidecar = self.metadata.remove(stored_name).await?;
        info!(stored_name, had_sidecar, "contract removed");
        Ok(())
    }

    fn resolve(&self, stored_name: &str) -> Result<PathBuf, RepoError> {
        if !naming::is_stored_pdf_name(stored_name) {
            debug!(stored_name, "rejected stored name");
            return Err(RepoError::NotFound(stored_name.to_string()));
        }
        Ok(self.dir.join(stored_name))
    }
}

/// Accepts `application/pdf` with any parameters, ignoring case.
pub fn is_pdf_media_type(media_type: &str) -> bool {
    media_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
}

fn merge(stored_name: String, stat: &Metadata, sidecar: ContractMetadata) -> ContractRecord {
    let original_name = if sidecar.original_name.is_empty() {
        stored_name.clone()
    } else {
        sidecar.original_name
    };
    ContractRecord {
        stored_name,
        original_name,
        size_bytes: stat.len(),
        upload_timestamp: modified_at(stat),
        partner: sidecar.partner,
    }
}

fn modified_at(stat: &Metadata) -> DateTime<Utc> {
    stat.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

/// Write `bytes` to a hidden sibling of `path`, then rename it into place.
///
/// The temp name has a fixed length so it fits wherever `path` does.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(temp_name());

    if let Err(e) = write_then_rename(&tmp, path, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

fn temp_name() -> String {
    format!(".{:016x}.part", rand::random::<u64>())
}

async fn write_then_rename(tmp: &Path, dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp, dest).await
}

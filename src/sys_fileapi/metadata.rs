//! Sidecar metadata: one JSON record next to each stored contract.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use super::core::write_atomic;

/// Appended to a stored name to locate its sidecar.
pub const SIDECAR_SUFFIX: &str = ".json";

/// Partner details submitted with an upload. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartnerFields {
    pub partner_name: String,
    pub partner_address: String,
    pub partner_representative: String,
    pub partner_email: String,
    pub contract_date: String,
}

impl PartnerFields {
    /// Assign a multipart form field by name.
    ///
    /// Returns `false` for names that are not partner fields.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "partnerName" => &mut self.partner_name,
            "partnerAddress" => &mut self.partner_address,
            "partnerRepresentative" => &mut self.partner_representative,
            "partnerEmail" => &mut self.partner_email,
            "contractDate" => &mut self.contract_date,
            _ => return false,
        };
        *slot = value;
        true
    }
}

/// Contents of a sidecar file.
///
/// `upload_date` records when the sidecar was written and is informational;
/// listings take their timestamp from the stored PDF itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractMetadata {
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub path: String,
    pub upload_date: String,
    #[serde(flatten)]
    pub partner: PartnerFields,
}

/// Reads and writes sidecars inside the storage directory.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sidecar_path(&self, stored_name: &str) -> PathBuf {
        self.dir.join(format!("{stored_name}{SIDECAR_SUFFIX}"))
    }

    /// Replace the sidecar for `stored_name`.
    pub async fn write(&self, stored_name: &str, record: &ContractMetadata) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.sidecar_path(stored_name), &json).await
    }

    /// Load the sidecar for `stored_name`.
    ///
    /// A missing or unreadable sidecar yields the default record so a listing
    /// never fails because of one bad file.
    pub async fn read(&self, stored_name: &str) -> ContractMetadata {
        let path = self.sidecar_path(stored_name);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return ContractMetadata::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read sidecar");
                return ContractMetadata::default();
            }
        };
        serde_json::from_slice(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "corrupt sidecar ignored");
            ContractMetadata::default()
        })
    }

    /// Delete the sidecar if present. Returns whether one was removed.
    pub async fn remove(&self, stored_name: &str) -> io::Result<bool> {
        remove_if_present(&self.sidecar_path(stored_name)).await
    }
}

async fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ContractMetadata {
        ContractMetadata {
            filename: "계약서.pdf".into(),
            original_name: "계약서.pdf".into(),
            size: 10,
            path: "uploads/계약서.pdf".into(),
            upload_date: "2024-05-01T09:00:00Z".into(),
            partner: PartnerFields {
                partner_name: "Acme".into(),
                partner_email: "legal@acme.test".into(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());

        store.write("계약서.pdf", &sample()).await.unwrap();

        assert!(dir.path().join("계약서.pdf.json").exists());
        assert_eq!(store.read("계약서.pdf").await, sample());
    }

    #[tokio::test]
    async fn write_overwrites_without_merge() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        store.write("a.pdf", &sample()).await.unwrap();

        let replacement = ContractMetadata {
            filename: "a.pdf".into(),
            ..Default::default()
        };
        store.write("a.pdf", &replacement).await.unwrap();

        let read = store.read("a.pdf").await;
        assert_eq!(read, replacement);
        assert!(read.partner.partner_name.is_empty());
    }

    #[tokio::test]
    async fn missing_sidecar_reads_as_default() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        assert_eq!(store.read("nothing.pdf").await, ContractMetadata::default());
    }

    #[tokio::test]
    async fn corrupt_sidecar_reads_as_default() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.pdf.json"), b"{not json").unwrap();
        let store = MetadataStore::new(dir.path());
        assert_eq!(store.read("bad.pdf").await, ContractMetadata::default());
    }

    #[tokio::test]
    async fn partial_sidecar_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("old.pdf.json"), br#"{"partnerName":"Legacy"}"#).unwrap();
        let store = MetadataStore::new(dir.path());
        let read = store.read("old.pdf").await;
        assert_eq!(read.partner.partner_name, "Legacy");
        assert!(read.partner.contract_date.is_empty());
        assert_eq!(read.size, 0);
    }

    #[test]
    fn serialized_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        for key in [
            "filename",
            "originalName",
            "size",
            "path",
            "uploadDate",
            "partnerName",
            "partnerAddress",
            "partnerRepresentative",
            "partnerEmail",
            "contractDate",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        store.write("a.pdf", &sample()).await.unwrap();
        assert!(store.remove("a.pdf").await.unwrap());
        assert!(!store.remove("a.pdf").await.unwrap());
    }

    #[test]
    fn set_routes_known_fields() {
        let mut fields = PartnerFields::default();
        assert!(fields.set("partnerName", "Acme".into()));
        assert!(fields.set("contractDate", "2024-05-01".into()));
        assert!(!fields.set("pdf", "ignored".into()));
        assert_eq!(fields.partner_name, "Acme");
        assert_eq!(fields.contract_date, "2024-05-01");
    }
}

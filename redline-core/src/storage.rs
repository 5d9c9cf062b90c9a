use crate::document::InMemoryDocument;
use crate::types::Document;
use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk encoding of a document snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// `.yaml`/`.yml` is YAML, everything else JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => SnapshotFormat::Yaml,
            _ => SnapshotFormat::Json,
        }
    }
}

/// Storage abstraction for document snapshots
pub trait DocumentStorage {
    fn load(&self, path: &Path) -> Result<InMemoryDocument>;
    fn save(&self, path: &Path, document: &InMemoryDocument) -> Result<()>;
}

/// File-based storage: JSON or YAML snapshots, replaced atomically on save
#[derive(Debug, Default, Clone)]
pub struct FileStorage;

impl FileStorage {
    pub fn new() -> Self {
        Self
    }

    fn temp_path(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        path.with_file_name(format!(".{file_name}.redline-tmp"))
    }
}

impl DocumentStorage for FileStorage {
    fn load(&self, path: &Path) -> Result<InMemoryDocument> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read document {}", path.display()))?;

        let document: Document = match SnapshotFormat::from_path(path) {
            SnapshotFormat::Json => serde_json::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse JSON snapshot {}: {}", path.display(), e))?,
            SnapshotFormat::Yaml => serde_yaml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse YAML snapshot {}: {}", path.display(), e))?,
        };

        let name = document.title.clone().unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        });
        Ok(InMemoryDocument::new(name, document))
    }

    fn save(&self, path: &Path, document: &InMemoryDocument) -> Result<()> {
        let serialized = match SnapshotFormat::from_path(path) {
            SnapshotFormat::Json => serde_json::to_string_pretty(document.document())
                .map_err(|e| anyhow!("Failed to serialize document: {}", e))?,
            SnapshotFormat::Yaml => serde_yaml::to_string(document.document())
                .map_err(|e| anyhow!("Failed to serialize document: {}", e))?,
        };

        // Write a sibling first so a failed write never truncates the original
        let temp_path = Self::temp_path(path);
        fs::write(&temp_path, serialized)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        if let Err(e) = fs::rename(&temp_path, path) {
            fs::remove_file(&temp_path).ok();
            return Err(anyhow!("Failed to replace {}: {}", path.display(), e));
        }
        Ok(())
    }
}

/// Content fingerprint of a document snapshot
pub fn calculate_document_hash(document: &Document) -> Result<String> {
    let json = serde_json::to_string(document)
        .map_err(|e| anyhow!("Failed to serialize document for hashing: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint of a rule file or any other raw input
pub fn calculate_content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.len().to_le_bytes());
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

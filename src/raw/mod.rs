// src/raw/mod.rs

use anyhow::{Context, Result};
use glob::{glob, Pattern};
use serde_json::Value as JsonValue;
use std::{fs::File, io::BufReader, path::Path};
use tracing::{debug, info, instrument};

/// One source file: its name plus the parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub source_id: String,
    pub document: JsonValue,
}

impl RawRecord {
    pub fn new(source_id: impl Into<String>, document: JsonValue) -> Self {
        Self {
            source_id: source_id.into(),
            document,
        }
    }
}

/// Immutable snapshot of the raw feed handed to the projector.
#[derive(Debug, Clone, Default)]
pub struct RawStore {
    records: Vec<RawRecord>,
}

impl RawStore {
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// Load every `*.json` file directly under `dir`, ordered by path.
    ///
    /// Any unreadable or unparsable file fails the whole load.
    #[instrument(level = "info", skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            anyhow::bail!("raw directory {} does not exist", dir.display());
        }
        let pattern = format!("{}/*.json", Pattern::escape(&dir.display().to_string()));
        let mut paths = glob(&pattern)
            .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("listing {}", dir.display()))?;
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let source_id = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let file =
                File::open(&path).with_context(|| format!("opening {}", path.display()))?;
            let document: JsonValue = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing {}", path.display()))?;
            debug!(source_id = %source_id, "loaded raw document");
            records.push(RawRecord::new(source_id, document));
        }

        info!(documents = records.len(), "raw store loaded");
        Ok(Self { records })
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_dir_sorted_by_name() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("b.json"), r#"{"data": []}"#)?;
        fs::write(dir.path().join("a.json"), r#"{"data": [[1]]}"#)?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;

        let store = RawStore::load_dir(dir.path())?;
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0].source_id, "a.json");
        assert_eq!(store.records()[0].document, json!({"data": [[1]]}));
        assert_eq!(store.records()[1].source_id, "b.json");
        Ok(())
    }

    #[test]
    fn invalid_json_is_fatal() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("bad.json"), "{ not json")?;
        assert!(RawStore::load_dir(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn dir_name_with_glob_characters() -> Result<()> {
        let root = tempdir()?;
        let dir = root.path().join("feed[1]");
        fs::create_dir(&dir)?;
        fs::write(dir.join("a.json"), r#"{"data": []}"#)?;

        let store = RawStore::load_dir(&dir)?;
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].source_id, "a.json");
        Ok(())
    }

    #[test]
    fn missing_dir_is_fatal() {
        assert!(RawStore::load_dir("/definitely/not/here").is_err());
    }
}

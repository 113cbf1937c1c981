// src/store/mod.rs

use anyhow::{bail, Context, Result};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Pointer file naming the published generation.
const CURRENT: &str = "CURRENT";
const GENERATION_PREFIX: &str = "gen-";
const STAGE_PREFIX: &str = ".stage-";

fn generation_name(seq: u64) -> String {
    format!("{}{:06}", GENERATION_PREFIX, seq)
}

fn next_sequence(current: Option<&str>) -> u64 {
    current
        .and_then(|g| g.strip_prefix(GENERATION_PREFIX))
        .and_then(|n| n.parse::<u64>().ok())
        .map_or(1, |n| n + 1)
}

fn check_table_name(table: &str) -> Result<()> {
    if table.is_empty()
        || !table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        bail!("invalid table name {:?}", table);
    }
    Ok(())
}

/// A directory of whole-table parquet files, published as generations.
///
/// ```text
/// <dir>/CURRENT              -> "gen-000042"
/// <dir>/gen-000042/<table>.parquet
/// ```
///
/// A [`StagedCommit`] builds the next generation beside the live one and
/// publishes it by replacing `CURRENT` with a single rename, so readers see
/// either the whole previous table set or the whole new one.
#[derive(Debug, Clone)]
pub struct TableStore {
    dir: PathBuf,
}

impl TableStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating table directory {:?}", &dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name of the published generation; `None` before the first commit.
    pub fn current_generation(&self) -> Result<Option<String>> {
        let path = self.dir.join(CURRENT);
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Live file of `table` in the published generation, if it exists.
    pub fn table_path(&self, table: &str) -> Result<Option<PathBuf>> {
        let Some(generation) = self.current_generation()? else {
            return Ok(None);
        };
        let path = self
            .dir
            .join(generation)
            .join(format!("{}.parquet", table));
        Ok(path.exists().then_some(path))
    }

    /// Begin building the next generation.
    pub fn stage(&self) -> Result<StagedCommit<'_>> {
        let dir = self.dir.join(format!(
            "{}{}",
            STAGE_PREFIX,
            Utc::now().timestamp_micros()
        ));
        fs::create_dir(&dir).with_context(|| format!("creating staging dir {}", dir.display()))?;
        Ok(StagedCommit {
            store: self,
            dir,
            staged: Vec::new(),
            committed: false,
        })
    }

    /// Read a whole table back as one batch; `None` if it was never written.
    pub fn read(&self, table: &str) -> Result<Option<RecordBatch>> {
        let Some(path) = self.table_path(table)? else {
            return Ok(None);
        };
        let file = File::open(&path).with_context(|| format!("failed to open `{}`", path.display()))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("reading parquet metadata of `{}`", path.display()))?;
        let schema = builder.schema().clone();
        let reader = builder.with_batch_size(8_192).build()?;
        let batches = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("reading batches of `{}`", path.display()))?;
        let batch = concat_batches(&schema, &batches).context("concatenating table batches")?;
        Ok(Some(batch))
    }

    /// Remove generations other than `keep`, leaving one previous generation
    /// for readers that resolved the pointer before the swap.
    fn prune(&self, keep: &[&str]) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(GENERATION_PREFIX) && !keep.contains(&name.as_str()) {
                if let Err(e) = fs::remove_dir_all(entry.path()) {
                    warn!(generation = %name, error = %e, "failed to prune old generation");
                }
            }
        }
    }
}

/// Next generation under construction, invisible to readers.
///
/// Dropping without [`StagedCommit::commit`] removes the staging directory
/// and leaves the published generation untouched.
pub struct StagedCommit<'a> {
    store: &'a TableStore,
    dir: PathBuf,
    staged: Vec<String>,
    committed: bool,
}

impl StagedCommit<'_> {
    /// Write `batch` as the next contents of `table`.
    pub fn put(&mut self, table: &str, batch: &RecordBatch) -> Result<()> {
        check_table_name(table)?;
        let path = self.dir.join(format!("{}.parquet", table));
        let file = File::create(&path)
            .with_context(|| format!("creating staging file for {}", table))?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .context("initializing Parquet writer")?;
        writer
            .write(batch)
            .with_context(|| format!("writing {} batch to Parquet", table))?;
        let file = writer.into_inner().context("closing Parquet writer")?;
        file.sync_all()?;

        debug!(table, rows = batch.num_rows(), path = %path.display(), "staged table");
        if !self.staged.iter().any(|t| t == table) {
            self.staged.push(table.to_string());
        }
        Ok(())
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.staged.iter().map(String::as_str)
    }

    /// Publish the staged tables as the new generation.
    ///
    /// Tables of the previous generation that were not staged are carried
    /// over unchanged. Nothing is visible until `CURRENT` is replaced.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let store = self.store;
        let current = store.current_generation()?;

        if let Some(prev) = &current {
            for entry in fs::read_dir(store.dir.join(prev))
                .with_context(|| format!("listing generation {}", prev))?
            {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                let Some(table) = name.strip_suffix(".parquet") else {
                    continue;
                };
                if !self.staged.iter().any(|t| t == table) {
                    fs::copy(entry.path(), self.dir.join(&name))
                        .with_context(|| format!("carrying over {}", name))?;
                }
            }
        }

        let generation = generation_name(next_sequence(current.as_deref()));
        let gen_dir = store.dir.join(&generation);
        fs::rename(&self.dir, &gen_dir)
            .with_context(|| format!("publishing {} -> {}", self.dir.display(), gen_dir.display()))?;
        self.committed = true;

        if let Err(e) = swap_pointer(store.dir(), &generation) {
            let _ = fs::remove_dir_all(&gen_dir);
            return Err(e);
        }

        let mut keep = vec![generation.as_str()];
        if let Some(prev) = current.as_deref() {
            keep.push(prev);
        }
        store.prune(&keep);

        info!(generation = %generation, tables = self.staged.len(), "committed table set");
        Ok(self
            .staged
            .iter()
            .map(|t| gen_dir.join(format!("{}.parquet", t)))
            .collect())
    }
}

impl Drop for StagedCommit<'_> {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_dir_all(&self.dir) {
                warn!(dir = %self.dir.display(), error = %e, "failed to remove staging dir");
            }
        }
    }
}

/// Atomically point `CURRENT` at `generation`: write tmp, then rename.
fn swap_pointer(dir: &Path, generation: &str) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir).context("creating pointer tmp file")?;
    writeln!(tmp, "{}", generation)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(CURRENT))
        .context("replacing CURRENT pointer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn batch(values: Vec<i64>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]));
        let col: ArrayRef = Arc::new(Int64Array::from(values));
        RecordBatch::try_new(schema, vec![col]).unwrap()
    }

    fn entries_with_prefix(dir: &Path, prefix: &str) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(prefix))
            .count()
    }

    fn commit_pair(store: &TableStore, a: i64, b: i64) -> Result<()> {
        let mut stage = store.stage()?;
        stage.put("a", &batch(vec![a]))?;
        stage.put("b", &batch(vec![b]))?;
        stage.commit()?;
        Ok(())
    }

    #[test]
    fn commit_replaces_whole_table() -> Result<()> {
        let tmp = tempdir()?;
        let store = TableStore::new(tmp.path())?;
        assert!(store.read("t")?.is_none());

        let mut stage = store.stage()?;
        stage.put("t", &batch(vec![1, 2, 3]))?;
        stage.commit()?;
        assert_eq!(store.read("t")?.unwrap(), batch(vec![1, 2, 3]));

        let mut stage = store.stage()?;
        stage.put("t", &batch(vec![9]))?;
        stage.commit()?;
        assert_eq!(store.read("t")?.unwrap(), batch(vec![9]));
        assert_eq!(store.current_generation()?.as_deref(), Some("gen-000002"));
        assert_eq!(entries_with_prefix(tmp.path(), STAGE_PREFIX), 0);
        Ok(())
    }

    #[test]
    fn dropped_stage_leaves_live_tables_alone() -> Result<()> {
        let tmp = tempdir()?;
        let store = TableStore::new(tmp.path())?;
        commit_pair(&store, 1, 2)?;

        {
            let mut stage = store.stage()?;
            stage.put("a", &batch(vec![100]))?;
            assert_eq!(stage.tables().collect::<Vec<_>>(), vec!["a"]);
            // abandoned before `b` could be produced
        }

        assert_eq!(store.read("a")?.unwrap(), batch(vec![1]));
        assert_eq!(store.read("b")?.unwrap(), batch(vec![2]));
        assert_eq!(entries_with_prefix(tmp.path(), STAGE_PREFIX), 0);
        Ok(())
    }

    #[test]
    fn failed_publish_keeps_every_previous_table() -> Result<()> {
        let tmp = tempdir()?;
        let store = TableStore::new(tmp.path())?;
        commit_pair(&store, 1, 1)?;

        // the next generation's directory is occupied, so publishing fails
        let blocker = tmp.path().join("gen-000002");
        fs::create_dir(&blocker)?;
        fs::write(blocker.join("junk"), "x")?;

        let mut stage = store.stage()?;
        stage.put("a", &batch(vec![2]))?;
        stage.put("b", &batch(vec![2]))?;
        assert!(stage.commit().is_err());

        assert_eq!(store.current_generation()?.as_deref(), Some("gen-000001"));
        assert_eq!(store.read("a")?.unwrap(), batch(vec![1]));
        assert_eq!(store.read("b")?.unwrap(), batch(vec![1]));
        assert_eq!(entries_with_prefix(tmp.path(), STAGE_PREFIX), 0);
        Ok(())
    }

    #[test]
    fn bad_table_name_fails_staging() -> Result<()> {
        let tmp = tempdir()?;
        let store = TableStore::new(tmp.path())?;
        commit_pair(&store, 1, 1)?;

        let mut stage = store.stage()?;
        stage.put("a", &batch(vec![7]))?;
        assert!(stage.put("../b", &batch(vec![7])).is_err());
        drop(stage);

        assert_eq!(store.read("a")?.unwrap(), batch(vec![1]));
        Ok(())
    }

    #[test]
    fn unstaged_tables_carry_over() -> Result<()> {
        let tmp = tempdir()?;
        let store = TableStore::new(tmp.path())?;
        commit_pair(&store, 1, 1)?;

        let mut stage = store.stage()?;
        stage.put("a", &batch(vec![5]))?;
        stage.commit()?;

        assert_eq!(store.read("a")?.unwrap(), batch(vec![5]));
        assert_eq!(store.read("b")?.unwrap(), batch(vec![1]));
        Ok(())
    }

    #[test]
    fn keeps_current_and_previous_generation() -> Result<()> {
        let tmp = tempdir()?;
        let store = TableStore::new(tmp.path())?;
        for n in 1..=4 {
            commit_pair(&store, n, n)?;
        }
        assert_eq!(entries_with_prefix(tmp.path(), GENERATION_PREFIX), 2);
        assert_eq!(store.read("b")?.unwrap(), batch(vec![4]));
        Ok(())
    }

    #[test]
    fn empty_table_round_trips_schema() -> Result<()> {
        let tmp = tempdir()?;
        let store = TableStore::new(tmp.path())?;
        let mut stage = store.stage()?;
        stage.put("empty", &batch(vec![]))?;
        stage.commit()?;

        let read = store.read("empty")?.unwrap();
        assert_eq!(read.num_rows(), 0);
        assert_eq!(read.schema().field(0).name(), "n");
        Ok(())
    }
}

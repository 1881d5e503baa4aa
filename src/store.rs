//! Per-instance JSON result files.
//!
//! Results live in `<root>/<family>/<n>.json`, one object per file keyed by
//! configuration name. A write reads the file, replaces its own key and
//! writes the whole object back; there is no locking.

use crate::certify::BenchmarkRecord;
use log::*;
use serde_json::{Map, Value};
use std::fs::{rename, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io { path :String, source :std::io::Error },
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_error(path :&Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io { path: path.display().to_string(), source }
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    root :PathBuf,
}

impl ResultStore {
    pub fn new(root :impl Into<PathBuf>) -> Self {
        ResultStore { root: root.into() }
    }

    pub fn path_for(&self, family :&str, n :usize) -> PathBuf {
        self.root.join(family).join(format!("{}.json", n))
    }

    /// All records of one file. A missing file is empty; so is a file with
    /// invalid contents, after a warning.
    pub fn load(&self, family :&str, n :usize) -> Result<Map<String, Value>, StoreError> {
        let path = self.path_for(family, n);
        if !path.exists() {
            return Ok(Map::new());
        }
        let contents = std::fs::read_to_string(&path).map_err(io_error(&path))?;
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!("Ignoring unreadable result file {:?}", path);
                Ok(Map::new())
            }
        }
    }

    pub fn record(&self, family :&str, n :usize, name :&str) -> Result<Option<BenchmarkRecord>, StoreError> {
        match self.load(family, n)?.remove(name) {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite `name`, keeping every other key of the file.
    pub fn merge(&self, family :&str, n :usize, name :&str, record :&BenchmarkRecord) -> Result<PathBuf, StoreError> {
        let path = self.path_for(family, n);
        let mut map = self.load(family, n)?;
        map.insert(name.to_string(), serde_json::to_value(record)?);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        let data = serde_json::to_string_pretty(&Value::Object(map))?;

        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path).map_err(io_error(&temp_path))?;
            file.write_all(data.as_bytes()).map_err(io_error(&temp_path))?;
            file.sync_all().map_err(io_error(&temp_path))?;
        }
        rename(&temp_path, &path).map_err(io_error(&path))?;

        debug!("Stored {} in {:?}", name, path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::tests::{from_grid, schedule6};
    use crate::schedule::Schedule;
    use tempfile::TempDir;

    fn solved() -> BenchmarkRecord {
        BenchmarkRecord { time: 1.25, optimal: true, obj: Some(4), sol: from_grid(&schedule6()) }
    }

    #[test]
    fn merge_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path());

        let path = store.merge("SAT", 6, "sat_opt", &solved()).unwrap();
        assert_eq!(path, dir.path().join("SAT").join("6.json"));
        let failed = BenchmarkRecord { time: 300.0, optimal: false, obj: None, sol: Schedule::empty() };
        store.merge("SAT", 6, "sat_satisf", &failed).unwrap();

        let map = store.load("SAT", 6).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(store.record("SAT", 6, "sat_opt").unwrap(), Some(solved()));
        assert_eq!(store.record("SAT", 6, "sat_satisf").unwrap(), Some(failed));
        assert!(!path.with_extension("tmp").exists());

        // Overwrite by key.
        store.merge("SAT", 6, "sat_opt", &BenchmarkRecord { optimal: false, ..solved() }).unwrap();
        assert_eq!(store.load("SAT", 6).unwrap().len(), 2);
        assert!(!store.record("SAT", 6, "sat_opt").unwrap().unwrap().optimal);
    }

    #[test]
    fn persisted_layout() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path());
        let path = store.merge("CP", 6, "gecode_opt", &solved()).unwrap();
        let value :Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        let rec = &value["gecode_opt"];
        assert_eq!(rec["time"], serde_json::json!(1.25));
        assert_eq!(rec["optimal"], Value::Bool(true));
        assert_eq!(rec["obj"], serde_json::json!(4));
        assert_eq!(rec["sol"][0][0], serde_json::json!([6, 1]));
        assert_eq!(rec["sol"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn unreadable_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("MIP")).unwrap();
        std::fs::write(store.path_for("MIP", 4), "{ not json").unwrap();
        assert!(store.load("MIP", 4).unwrap().is_empty());
        store.merge("MIP", 4, "mip_satisf_CBC", &solved()).unwrap();
        assert_eq!(store.load("MIP", 4).unwrap().len(), 1);
        assert_eq!(store.record("MIP", 4, "missing").unwrap(), None);
    }
}

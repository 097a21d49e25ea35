//! Durable checkpoint format.
//!
//! A checkpoint is a directory:
//!
//! ```text
//! shac/
//! ├── meta.json            engine version, epoch, config, cascade metadata
//! ├── parameters.json      search-space schema
//! ├── dataset.csv          one row per evaluated sample, append order
//! └── classifiers/
//!     ├── cls_000.bin      serialized classifier, cascade index 0
//!     └── cls_001.bin
//! ```
//!
//! Every file is written to a temp name in the same directory and renamed
//! into place, and `meta.json` is written last, so a crash mid-write leaves
//! the previous good checkpoint readable. A restore succeeds iff the meta
//! parses, the schema loads, every referenced classifier file exists, and
//! every dataset row matches the schema.

use std::fs;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierMeta;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::space::SearchSpace;
use crate::types::Direction;

pub(crate) const ENGINE_VERSION: u32 = 1;

/// Default checkpoint directory name.
pub(crate) const DEFAULT_DIR: &str = "shac";

/// The boolean training flags, grouped for `meta.json`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Flags {
    pub skip_cv_checks: bool,
    pub early_stop: bool,
    pub relax_checks: bool,
}

/// Contents of `meta.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Meta {
    pub engine_version: u32,
    /// Number of fully completed epochs.
    pub epoch: u64,
    pub objective: Direction,
    pub total_budget: usize,
    pub num_batches: usize,
    pub max_classifiers: usize,
    /// The resolved seed, so a restored engine continues the same streams.
    pub seed: u64,
    pub flags: Flags,
    /// Metadata per cascade entry; entry `i` references `classifiers/cls_<i>.bin`.
    pub classifiers: Vec<ClassifierMeta>,
}

fn classifier_file(index: usize) -> String {
    format!("cls_{index:03}.bin")
}

/// Write `bytes` to `path` atomically (temp file in the same directory,
/// then rename).
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));
    fs::write(&tmp_path, bytes).map_err(|e| Error::Persistence(e.to_string()))?;
    fs::rename(&tmp_path, path).map_err(|e| Error::Persistence(e.to_string()))
}

/// Writes a full checkpoint. `meta.json` is the commit point and goes last.
pub(crate) fn save_checkpoint<C: Serialize>(
    dir: &Path,
    meta: &Meta,
    space: &SearchSpace,
    dataset: &Dataset,
    cascade: &[C],
) -> Result<()> {
    let cls_dir = dir.join("classifiers");
    fs::create_dir_all(&cls_dir).map_err(|e| Error::Persistence(e.to_string()))?;

    let schema =
        serde_json::to_vec_pretty(space).map_err(|e| Error::Persistence(e.to_string()))?;
    write_atomic(&dir.join("parameters.json"), &schema)?;

    let mut csv = Vec::new();
    dataset
        .write_csv(&mut csv, space)
        .map_err(|e| Error::Persistence(e.to_string()))?;
    write_atomic(&dir.join("dataset.csv"), &csv)?;

    for (i, classifier) in cascade.iter().enumerate() {
        let bytes =
            serde_json::to_vec(classifier).map_err(|e| Error::Persistence(e.to_string()))?;
        write_atomic(&cls_dir.join(classifier_file(i)), &bytes)?;
    }

    let meta_bytes =
        serde_json::to_vec_pretty(meta).map_err(|e| Error::Persistence(e.to_string()))?;
    write_atomic(&dir.join("meta.json"), &meta_bytes)?;

    tracing::debug!(dir = %dir.display(), epoch = meta.epoch, "checkpoint written");
    Ok(())
}

/// Reads a checkpoint written by [`save_checkpoint`].
pub(crate) fn load_checkpoint<C: DeserializeOwned>(
    dir: &Path,
) -> Result<(Meta, SearchSpace, Dataset, Vec<C>)> {
    let meta_file =
        fs::File::open(dir.join("meta.json")).map_err(|e| Error::Persistence(e.to_string()))?;
    let meta: Meta = serde_json::from_reader(BufReader::new(meta_file))
        .map_err(|e| Error::Persistence(format!("meta.json: {e}")))?;
    if meta.engine_version != ENGINE_VERSION {
        return Err(Error::Persistence(format!(
            "unsupported engine version {} (expected {ENGINE_VERSION})",
            meta.engine_version
        )));
    }

    let schema_file = fs::File::open(dir.join("parameters.json"))
        .map_err(|e| Error::Persistence(e.to_string()))?;
    let space: SearchSpace = serde_json::from_reader(BufReader::new(schema_file))
        .map_err(|e| Error::Persistence(format!("parameters.json: {e}")))?;

    let csv_file =
        fs::File::open(dir.join("dataset.csv")).map_err(|e| Error::Persistence(e.to_string()))?;
    let dataset = Dataset::read_csv(BufReader::new(csv_file), &space)?;

    let mut cascade = Vec::with_capacity(meta.classifiers.len());
    for i in 0..meta.classifiers.len() {
        let path = dir.join("classifiers").join(classifier_file(i));
        let file = fs::File::open(&path).map_err(|e| {
            Error::Persistence(format!("missing classifier file {}: {e}", path.display()))
        })?;
        let classifier: C = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Persistence(format!("{}: {e}", path.display())))?;
        cascade.push(classifier);
    }

    Ok((meta, space, dataset, cascade))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::classifier::forest::ForestClassifier;
    use crate::parameter::Parameter;

    fn temp_dir() -> std::path::PathBuf {
        use core::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let mut path = std::env::temp_dir();
        path.push(format!(
            "shac_persist_test_{}_{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        path
    }

    fn fixture() -> (Meta, SearchSpace, Dataset, Vec<ForestClassifier>) {
        let space = SearchSpace::new(vec![
            Parameter::uniform("x", 0.0, 1.0),
            Parameter::discrete("k", vec![1.into(), 2.into(), 3.into()]),
        ])
        .unwrap();

        let mut rng = fastrand::Rng::with_seed(0);
        let mut dataset = Dataset::new();
        for i in 0..10 {
            dataset.push(space.sample(&mut rng), f64::from(i));
        }

        let data: Vec<Vec<f64>> = dataset
            .records()
            .iter()
            .map(|r| space.encode(&r.sample).unwrap())
            .collect();
        let labels: Vec<bool> = (0..10).map(|i| i < 5).collect();
        let mut forest = ForestClassifier::default();
        forest.fit(&data, &labels, 0).unwrap();

        let meta = Meta {
            engine_version: ENGINE_VERSION,
            epoch: 1,
            objective: Direction::Minimize,
            total_budget: 10,
            num_batches: 10,
            max_classifiers: 18,
            seed: 42,
            flags: Flags::default(),
            classifiers: vec![ClassifierMeta {
                version: 0,
                trained_on: 10,
                validation_accuracy: None,
            }],
        };

        (meta, space, dataset, vec![forest])
    }

    #[test]
    fn checkpoint_round_trip() {
        let dir = temp_dir();
        let (meta, space, dataset, cascade) = fixture();

        save_checkpoint(&dir, &meta, &space, &dataset, &cascade).unwrap();
        let (meta2, space2, dataset2, cascade2) =
            load_checkpoint::<ForestClassifier>(&dir).unwrap();

        assert_eq!(meta2.epoch, meta.epoch);
        assert_eq!(meta2.seed, meta.seed);
        assert_eq!(meta2.classifiers, meta.classifiers);
        assert_eq!(space2, space);
        assert_eq!(dataset2, dataset);
        assert_eq!(cascade2, cascade);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_classifier_file_fails_restore() {
        let dir = temp_dir();
        let (meta, space, dataset, cascade) = fixture();
        save_checkpoint(&dir, &meta, &space, &dataset, &cascade).unwrap();

        fs::remove_file(dir.join("classifiers").join(classifier_file(0))).unwrap();
        assert!(matches!(
            load_checkpoint::<ForestClassifier>(&dir),
            Err(Error::Persistence(_))
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn corrupt_meta_fails_restore() {
        let dir = temp_dir();
        let (meta, space, dataset, cascade) = fixture();
        save_checkpoint(&dir, &meta, &space, &dataset, &cascade).unwrap();

        fs::write(dir.join("meta.json"), b"{ not json").unwrap();
        assert!(matches!(
            load_checkpoint::<ForestClassifier>(&dir),
            Err(Error::Persistence(_))
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn edited_dataset_row_is_schema_mismatch() {
        let dir = temp_dir();
        let (meta, space, dataset, cascade) = fixture();
        save_checkpoint(&dir, &meta, &space, &dataset, &cascade).unwrap();

        // Append a row whose discrete value is outside the declared list.
        let mut csv = fs::read_to_string(dir.join("dataset.csv")).unwrap();
        csv.push_str("0.5,9,1.0\n");
        fs::write(dir.join("dataset.csv"), csv).unwrap();

        assert!(matches!(
            load_checkpoint::<ForestClassifier>(&dir),
            Err(Error::SchemaMismatch(_))
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn no_temp_files_remain() {
        let dir = temp_dir();
        let (meta, space, dataset, cascade) = fixture();
        save_checkpoint(&dir, &meta, &space, &dataset, &cascade).unwrap();

        for entry in fs::read_dir(&dir).unwrap() {
            let name = entry.unwrap().file_name();
            assert!(!name.to_string_lossy().ends_with(".tmp"));
        }

        fs::remove_dir_all(&dir).ok();
    }
}

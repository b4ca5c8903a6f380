//! Canonical locations of store and dataset files.
//!
//! ```text
//! <data.dir>/<store>/<dataset>/data.vcf.gz | data.bcf.gz
//!                             /data.vcf.gz.tbi | data.bcf.gz.csi
//!                             /samples.txt
//!                             /statistics.tsv
//!                             /vcf.properties
//!                             /exec.log
//! <work.dir>/<store>/<dataset>/   scratch space for exported files
//! ```

use crate::{constants::*, core::format::VcfFormat, error::VcfStoreError, utils::util::Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Rejects names that cannot be used as a single directory component.
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(VcfStoreError::InvalidInput(format!(
            "Invalid {kind} name: '{name}'"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    store_dir: PathBuf,
    work_dir: PathBuf,
}

impl StoreLayout {
    pub fn new(data_root: &Path, work_root: &Path, store_name: &str) -> Self {
        Self {
            store_dir: data_root.join(store_name),
            work_dir: work_root.join(store_name),
        }
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    pub fn dataset_dir(&self, dataset: &str) -> PathBuf {
        self.store_dir.join(dataset)
    }

    /// Scratch directory of a dataset, created if missing. Nothing here removes it.
    pub fn work_dir(&self, dataset: &str) -> Result<PathBuf> {
        let dir = self.work_dir.join(dataset);
        fs::create_dir_all(&dir).map_err(|error| {
            crate::vcfstore_error!("Failed to create work directory {}: {error}", dir.display())
        })?;
        Ok(dir)
    }

    pub fn raw_data_file(&self, dataset: &str, format: VcfFormat) -> PathBuf {
        self.dataset_dir(dataset).join(format.raw_file_name())
    }

    pub fn data_file(&self, dataset: &str, format: VcfFormat) -> PathBuf {
        self.dataset_dir(dataset).join(format.compressed_file_name())
    }

    pub fn index_file(&self, dataset: &str, format: VcfFormat) -> PathBuf {
        self.dataset_dir(dataset).join(format!(
            "{}.{}",
            format.compressed_file_name(),
            format.index_extension()
        ))
    }

    pub fn samples_file(&self, dataset: &str) -> PathBuf {
        self.dataset_dir(dataset).join(SAMPLES_FILE)
    }

    pub fn stats_file(&self, dataset: &str) -> PathBuf {
        self.dataset_dir(dataset).join(STATS_FILE)
    }

    pub fn properties_file(&self, dataset: &str) -> PathBuf {
        self.dataset_dir(dataset).join(VCF_PROPERTIES_FILE)
    }

    pub fn exec_log(&self, dataset: &str) -> PathBuf {
        self.dataset_dir(dataset).join(EXEC_LOG)
    }

    /// Format of a stored dataset, from whichever compressed data file exists. VCF wins when both
    /// exist, `None` when neither does.
    pub fn stored_format(&self, dataset: &str) -> Option<VcfFormat> {
        VcfFormat::ALL
            .into_iter()
            .find(|format| self.data_file(dataset, *format).is_file())
    }
}

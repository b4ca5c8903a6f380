//! A named store of VCF/BCF datasets, one subdirectory per dataset.
//!
//! Writing a dataset runs a fixed pipeline of external tools:
//!
//! ```text
//! absent -> written -> compressed (bgzip, raw input only) -> indexed (tabix)
//!        -> sampled (bcftools query) -> summarized (bcftools stats) -> ready (vcf.properties)
//! ```
//!
//! A failing tool aborts the remaining steps and leaves no properties cache, so the dataset is
//! never listed as ready. Writes to the same dataset must be serialized by the caller.

use crate::{
    config::StoreConfig,
    core::{
        format::{detect_source, VcfFormat},
        layout::{validate_name, StoreLayout},
        summary::{merge_sample_ids, read_sample_ids, SummaryBuilder, VcfSummary},
    },
    error::VcfStoreError,
    io::exec::{ProcessRunner, Tool, ToolInvoker, ToolOutput},
    utils::{
        util::{absolute_path, format_number_with_commas, remove_dir_all_if_exists, Result},
        util_intern::readable_size,
    },
};
use rayon::prelude::*;
use std::{
    fmt,
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::Path,
    sync::Arc,
    time,
};
use tempfile::TempPath;

#[cfg(test)]
mod tests;

/// External tool steps a dataset operation can fail in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Compress,
    Index,
    ListSamples,
    Statistics,
    Convert,
    Subset,
}

impl PipelineStep {
    pub fn tool(&self) -> Tool {
        match self {
            PipelineStep::Compress => Tool::Bgzip,
            PipelineStep::Index => Tool::Tabix,
            PipelineStep::ListSamples
            | PipelineStep::Statistics
            | PipelineStep::Convert
            | PipelineStep::Subset => Tool::Bcftools,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::Compress => "compress",
            PipelineStep::Index => "index",
            PipelineStep::ListSamples => "list samples",
            PipelineStep::Statistics => "statistics",
            PipelineStep::Convert => "convert",
            PipelineStep::Subset => "subset",
        };
        f.write_str(name)
    }
}

/// Readable content of a dataset. Temporary files backing the stream are removed when it is
/// dropped.
#[derive(Debug)]
pub struct VcfStream {
    file: File,
    _artifacts: Vec<TempPath>,
}

impl VcfStream {
    fn from_file(path: &Path) -> Result<Self> {
        Self::with_artifacts(path, Vec::new())
    }

    fn with_artifacts(path: &Path, artifacts: Vec<TempPath>) -> Result<Self> {
        let file = File::open(path).map_err(|error| {
            crate::vcfstore_error!("Failed to open {}: {error}", path.display())
        })?;
        Ok(Self {
            file,
            _artifacts: artifacts,
        })
    }
}

impl Read for VcfStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[derive(Clone)]
pub struct VcfStore {
    name: String,
    layout: StoreLayout,
    config: Arc<StoreConfig>,
    invoker: ToolInvoker,
}

impl VcfStore {
    pub fn new(
        name: impl Into<String>,
        config: Arc<StoreConfig>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self> {
        let name = name.into();
        validate_name("VCF store", &name)?;
        // Tools run inside the dataset directory, so every path handed to them must be absolute.
        let layout = StoreLayout::new(
            &absolute_path(&config.data_dir)?,
            &absolute_path(&config.work_dir)?,
            &name,
        );
        let invoker = ToolInvoker::new(config.clone(), runner);
        Ok(Self {
            name,
            layout,
            config,
            invoker,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Names of the fully processed datasets, sorted.
    pub fn vcf_names(&self) -> Result<Vec<String>> {
        let mut names = crate::utils::util::list_subdirectories(self.layout.store_dir())?;
        names.retain(|name| self.layout.properties_file(name).is_file());
        Ok(names)
    }

    /// Whether the compressed data file of `vcf_name` exists, processed or not.
    pub fn has_vcf(&self, vcf_name: &str) -> bool {
        validate_name("VCF", vcf_name).is_ok() && self.layout.stored_format(vcf_name).is_some()
    }

    fn stored_format(&self, vcf_name: &str) -> Result<VcfFormat> {
        validate_name("VCF", vcf_name)?;
        self.layout
            .stored_format(vcf_name)
            .ok_or_else(|| VcfStoreError::dataset_not_found(vcf_name))
    }

    /// Summary of a dataset, read back from its properties cache without running any tool.
    ///
    /// A dataset whose pipeline did not complete has no counts and yields
    /// [`VcfStoreError::NotReady`].
    pub fn vcf_summary(&self, vcf_name: &str) -> Result<VcfSummary> {
        let format = self.stored_format(vcf_name)?;
        let properties_file = self.layout.properties_file(vcf_name);
        if !properties_file.is_file() {
            log::warn!(
                "VCF {} in store {} has not been fully processed",
                vcf_name,
                self.name
            );
            return Err(VcfStoreError::NotReady {
                name: vcf_name.to_string(),
            });
        }
        Ok(SummaryBuilder::new(vcf_name)
            .format(format)
            .size(&self.layout.data_file(vcf_name, format))
            .samples(&self.layout.samples_file(vcf_name))?
            .properties(&properties_file)?
            .build())
    }

    /// Sample identifiers of all ready datasets, in first-seen order.
    pub fn sample_ids(&self) -> Result<Vec<String>> {
        let names = self.vcf_names()?;
        let lists = names
            .par_iter()
            .map(|name| read_sample_ids(&self.layout.samples_file(name)))
            .collect::<Result<Vec<_>>>()?;
        Ok(merge_sample_ids(lists))
    }

    /// Stores `input` under the dataset named after `file_name` (minus its format suffix),
    /// replacing any previous dataset of that name, and runs the processing pipeline.
    pub fn write_vcf<R: Read>(&self, file_name: &str, mut input: R) -> Result<VcfSummary> {
        let source = detect_source(file_name)?;
        validate_name("VCF", &source.name)?;
        let vcf_name = source.name.as_str();
        let format = source.format;
        let start_timer = time::Instant::now();
        log::info!(
            "Writing {} as {} VCF {} in store {}",
            file_name,
            format,
            vcf_name,
            self.name
        );

        let dataset_dir = self.layout.dataset_dir(vcf_name);
        remove_dir_all_if_exists(&dataset_dir).map_err(|error| {
            crate::vcfstore_error!(
                "Failed to replace VCF directory {}: {error}",
                dataset_dir.display()
            )
        })?;
        fs::create_dir_all(&dataset_dir)?;

        let destination = if source.compressed {
            self.layout.data_file(vcf_name, format)
        } else {
            self.layout.raw_data_file(vcf_name, format)
        };
        {
            let mut writer = BufWriter::new(File::create(&destination)?);
            let copied = io::copy(&mut input, &mut writer)?;
            writer.flush()?;
            log::debug!("{}: copied {} bytes", vcf_name, format_number_with_commas(copied));
        }

        if !source.compressed {
            self.compress(vcf_name, format)?;
        }
        self.index(vcf_name, format)?;
        self.list_samples(vcf_name, format)?;
        self.statistics(vcf_name, format)?;

        let summary = SummaryBuilder::new(vcf_name)
            .format(format)
            .size(&self.layout.data_file(vcf_name, format))
            .samples(&self.layout.samples_file(vcf_name))?
            .statistics(&self.layout.stats_file(vcf_name))?
            .build();
        self.persist_summary(&summary, file_name);

        let (size, unit) = readable_size(summary.size);
        log::info!(
            "Stored VCF {}: {} samples, {} variants, {:.2} {} in {:.2?}",
            vcf_name,
            summary.sample_ids.len(),
            format_number_with_commas(summary.variants_count),
            size,
            unit,
            start_timer.elapsed()
        );
        Ok(summary)
    }

    /// Removes a dataset. Missing datasets and removal failures are not errors.
    pub fn delete_vcf(&self, vcf_name: &str) -> Result<()> {
        validate_name("VCF", vcf_name)?;
        let dataset_dir = self.layout.dataset_dir(vcf_name);
        if let Err(error) = remove_dir_all_if_exists(&dataset_dir) {
            log::warn!("Failed to delete {}: {error}", dataset_dir.display());
        }
        Ok(())
    }

    /// Streams the stored compressed data, converted by bcftools when `format` differs from the
    /// stored one.
    pub fn read_vcf(&self, vcf_name: &str, format: Option<VcfFormat>) -> Result<VcfStream> {
        let stored = self.stored_format(vcf_name)?;
        let data_file = self.layout.data_file(vcf_name, stored);
        let target = match format {
            Some(target) if target != stored => target,
            _ => return VcfStream::from_file(&data_file),
        };

        let work_dir = self.layout.work_dir(vcf_name)?;
        let output = self.temp_path(&work_dir, "data_", &format!(".{}.gz", target.extension()))?;
        self.run_step(
            vcf_name,
            PipelineStep::Convert,
            &[
                "view".to_string(),
                "--output-type".to_string(),
                target.output_type().to_string(),
                "--output-file".to_string(),
                path_arg(&output),
                path_arg(&data_file),
            ],
            ToolOutput::ExecLog(self.layout.exec_log(vcf_name)),
        )?;
        VcfStream::with_artifacts(&output.to_path_buf(), vec![output])
    }

    /// Streams the dataset restricted to `samples`, in `format` or the stored format.
    pub fn read_vcf_samples<S: AsRef<str>>(
        &self,
        vcf_name: &str,
        format: Option<VcfFormat>,
        samples: &[S],
    ) -> Result<VcfStream> {
        let stored = self.stored_format(vcf_name)?;
        if samples.is_empty() {
            return Err(VcfStoreError::InvalidInput(
                "At least one sample is required to subset a VCF".to_string(),
            ));
        }
        let target = format.unwrap_or(stored);
        let data_file = self.layout.data_file(vcf_name, stored);
        let work_dir = self.layout.work_dir(vcf_name)?;

        let samples_file = self.temp_path(&work_dir, "samples_", ".txt")?;
        {
            let mut writer = BufWriter::new(File::create(&samples_file)?);
            for sample in samples {
                writeln!(writer, "{}", sample.as_ref())?;
            }
            writer.flush()?;
        }

        let output = self.temp_path(&work_dir, "data_", &format!(".{}.gz", target.extension()))?;
        self.run_step(
            vcf_name,
            PipelineStep::Subset,
            &[
                "view".to_string(),
                "--samples-file".to_string(),
                path_arg(&samples_file),
                "--output-type".to_string(),
                target.output_type().to_string(),
                "--output-file".to_string(),
                path_arg(&output),
                path_arg(&data_file),
            ],
            ToolOutput::ExecLog(self.layout.exec_log(vcf_name)),
        )?;
        VcfStream::with_artifacts(&output.to_path_buf(), vec![output, samples_file])
    }

    /// Streams the raw `bcftools stats` report of a dataset.
    pub fn read_vcf_statistics(&self, vcf_name: &str) -> Result<VcfStream> {
        self.stored_format(vcf_name)?;
        let stats_file = self.layout.stats_file(vcf_name);
        if !stats_file.is_file() {
            return Err(VcfStoreError::NotFound {
                what: "statistics for VCF",
                name: vcf_name.to_string(),
            });
        }
        VcfStream::from_file(&stats_file)
    }

    //
    // Pipeline steps
    //

    fn compress(&self, vcf_name: &str, format: VcfFormat) -> Result<()> {
        self.run_step(
            vcf_name,
            PipelineStep::Compress,
            &[
                "-f".to_string(),
                path_arg(&self.layout.raw_data_file(vcf_name, format)),
            ],
            ToolOutput::ExecLog(self.layout.exec_log(vcf_name)),
        )
    }

    fn index(&self, vcf_name: &str, format: VcfFormat) -> Result<()> {
        self.run_step(
            vcf_name,
            PipelineStep::Index,
            &[
                "-f".to_string(),
                "-p".to_string(),
                format.index_preset().to_string(),
                path_arg(&self.layout.data_file(vcf_name, format)),
            ],
            ToolOutput::ExecLog(self.layout.exec_log(vcf_name)),
        )
    }

    fn list_samples(&self, vcf_name: &str, format: VcfFormat) -> Result<()> {
        self.run_step(
            vcf_name,
            PipelineStep::ListSamples,
            &[
                "query".to_string(),
                "--list-samples".to_string(),
                path_arg(&self.layout.data_file(vcf_name, format)),
            ],
            ToolOutput::File(self.layout.samples_file(vcf_name)),
        )
    }

    fn statistics(&self, vcf_name: &str, format: VcfFormat) -> Result<()> {
        self.run_step(
            vcf_name,
            PipelineStep::Statistics,
            &[
                "stats".to_string(),
                path_arg(&self.layout.data_file(vcf_name, format)),
            ],
            ToolOutput::File(self.layout.stats_file(vcf_name)),
        )
    }

    /// A lost properties cache only leaves the dataset unready, so failures are logged.
    fn persist_summary(&self, summary: &VcfSummary, original_name: &str) {
        let path = self.layout.properties_file(&summary.name);
        let properties = summary.to_properties(original_name, &self.config.version);
        if let Err(error) = properties.store(&path) {
            log::warn!("Failed to write {}: {error}", path.display());
        }
    }

    fn run_step(
        &self,
        vcf_name: &str,
        step: PipelineStep,
        args: &[String],
        output: ToolOutput,
    ) -> Result<()> {
        let status = self.invoker.run(
            &self.layout.dataset_dir(vcf_name),
            step.tool(),
            args,
            &output,
        );
        if status != 0 {
            log::error!("VCF {} in store {}: {} step failed", vcf_name, self.name, step);
            return Err(VcfStoreError::Processing { step, status });
        }
        log::debug!("VCF {} in store {}: {} step done", vcf_name, self.name, step);
        Ok(())
    }

    fn temp_path(&self, dir: &Path, prefix: &str, suffix: &str) -> Result<TempPath> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)
            .map_err(|error| {
                crate::vcfstore_error!(
                    "Failed to create a temporary file in {}: {error}",
                    dir.display()
                )
            })?;
        Ok(file.into_temp_path())
    }
}

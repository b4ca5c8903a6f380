use crate::{
    constants::*,
    core::format::VcfFormat,
    io::properties::Properties,
    utils::util::Result,
};
use serde::Serialize;
use std::{
    collections::HashSet,
    fs::{self, File},
    io::{self, BufRead, BufReader},
    path::Path,
};

/// Derived description of a stored dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VcfSummary {
    pub name: String,
    pub format: VcfFormat,
    pub sample_ids: Vec<String>,
    pub variants_count: u64,
    /// `samples x variants` when computed from statistics; it ignores missing calls.
    pub genotypes_count: u64,
    /// Byte size of the compressed data file.
    pub size: u64,
}

impl VcfSummary {
    /// Properties cache content for this summary.
    pub fn to_properties(&self, original_name: &str, version: &str) -> Properties {
        let mut properties = Properties::new();
        properties.set(NAME_KEY, self.name.as_str());
        properties.set(NAME_ORIGINAL_KEY, original_name);
        properties.set(VERSION_PROPERTY, version);
        properties.set(SUMMARY_FORMAT_KEY, self.format.to_string());
        properties.set(SUMMARY_VARIANTS_COUNT_KEY, self.variants_count.to_string());
        properties.set(SUMMARY_GENOTYPES_COUNT_KEY, self.genotypes_count.to_string());
        properties.set(SUMMARY_SIZE_KEY, self.size.to_string());
        properties.set(SUMMARY_SAMPLES_COUNT_KEY, self.sample_ids.len().to_string());
        properties
    }
}

/// Whether a properties cache was written by a release that stored the variant count under the
/// genotypes count key.
pub fn is_legacy_version(version: &str) -> bool {
    version == LEGACY_COUNT_VERSION || version.starts_with(LEGACY_COUNT_VERSION_PREFIX)
}

/// Counts read from `bcftools stats` summary lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsCounts {
    pub records: Option<u64>,
    pub samples: Option<u64>,
}

impl StatisticsCounts {
    fn is_complete(&self) -> bool {
        self.records.is_some() && self.samples.is_some()
    }
}

fn parse_marker_value(line: &str, marker: &str) -> Option<u64> {
    line.strip_prefix(marker)?.trim().parse::<u64>().ok()
}

/// Scans a statistics report for the record and sample counts, stopping once both are known.
/// Lines whose value does not parse as an integer are ignored.
pub fn parse_statistics<R: BufRead>(reader: R) -> Result<StatisticsCounts> {
    let mut counts = StatisticsCounts::default();
    for line in reader.lines() {
        let line = line?;
        if counts.records.is_none() {
            counts.records = parse_marker_value(&line, STATS_RECORDS_MARKER);
        }
        if counts.samples.is_none() {
            counts.samples = parse_marker_value(&line, STATS_SAMPLES_MARKER);
        }
        if counts.is_complete() {
            break;
        }
    }
    Ok(counts)
}

/// Reads a newline-delimited list of sample identifiers in file order. A missing file has no
/// samples.
pub fn read_sample_ids(path: &Path) -> Result<Vec<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut sample_ids = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let sample_id = line.trim_end_matches('\r');
        if !sample_id.is_empty() {
            sample_ids.push(sample_id.to_string());
        }
    }
    Ok(sample_ids)
}

/// Concatenates sample lists, keeping the first occurrence of each identifier.
pub fn merge_sample_ids<I>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for sample_id in lists.into_iter().flatten() {
        if seen.insert(sample_id.clone()) {
            merged.push(sample_id);
        }
    }
    merged
}

/// Assembles a [`VcfSummary`] either from a fresh statistics report or from a properties cache.
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    summary: VcfSummary,
}

impl SummaryBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            summary: VcfSummary {
                name: name.into(),
                format: VcfFormat::Vcf,
                sample_ids: Vec::new(),
                variants_count: 0,
                genotypes_count: 0,
                size: 0,
            },
        }
    }

    pub fn format(mut self, format: VcfFormat) -> Self {
        self.summary.format = format;
        self
    }

    pub fn size(mut self, data_file: &Path) -> Self {
        self.summary.size = match fs::metadata(data_file) {
            Ok(metadata) => metadata.len(),
            Err(error) => {
                log::debug!("No size for {}: {error}", data_file.display());
                0
            }
        };
        self
    }

    pub fn samples(mut self, samples_file: &Path) -> Result<Self> {
        self.summary.sample_ids = read_sample_ids(samples_file)?;
        Ok(self)
    }

    pub fn statistics(mut self, stats_file: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(stats_file).map_err(|error| {
            crate::vcfstore_error!(
                "Failed to open statistics {}: {error}",
                stats_file.display()
            )
        })?);
        let counts = parse_statistics(reader)?;
        let variants = counts.records.unwrap_or(0);
        self.summary.variants_count = variants;
        self.summary.genotypes_count = counts.samples.unwrap_or(0).saturating_mul(variants);
        Ok(self)
    }

    pub fn properties(mut self, properties_file: &Path) -> Result<Self> {
        let properties = Properties::load(properties_file)?;
        if let Some(format) = properties.get(SUMMARY_FORMAT_KEY) {
            self.summary.format = format.parse()?;
        }
        if let Some(size) = properties.get_parsed::<u64>(SUMMARY_SIZE_KEY)? {
            self.summary.size = size;
        }
        let variants = properties
            .get_parsed::<u64>(SUMMARY_VARIANTS_COUNT_KEY)?
            .unwrap_or(0);
        let genotypes = properties
            .get_parsed::<u64>(SUMMARY_GENOTYPES_COUNT_KEY)?
            .unwrap_or(0);

        let version = properties.get_or(VERSION_PROPERTY, "");
        if is_legacy_version(version) {
            let samples_count = match properties.get_parsed::<u64>(SUMMARY_SAMPLES_COUNT_KEY)? {
                Some(count) => count,
                None => self.summary.sample_ids.len() as u64,
            };
            log::debug!(
                "Correcting counts of {} written by legacy version {version}",
                self.summary.name
            );
            self.summary.variants_count = genotypes;
            self.summary.genotypes_count = samples_count.saturating_mul(genotypes);
        } else {
            self.summary.variants_count = variants;
            self.summary.genotypes_count = genotypes;
        }
        Ok(self)
    }

    pub fn build(self) -> VcfSummary {
        self.summary
    }
}

pub const SERVICE_NAME: &str = "vcf-store";

// Dataset directory content
pub const SAMPLES_FILE: &str = "samples.txt";
pub const STATS_FILE: &str = "statistics.tsv";
pub const VCF_PROPERTIES_FILE: &str = "vcf.properties";
pub const EXEC_LOG: &str = "exec.log";

// Service configuration keys
pub const DATA_DIR_PROPERTY: &str = "data.dir";
pub const WORK_DIR_PROPERTY: &str = "work.dir";
pub const VERSION_PROPERTY: &str = "version";
pub const EXEC_PROPERTY_PREFIX: &str = "exec.";
pub const EXEC_TIMEOUT_PROPERTY: &str = "exec.timeout";

pub const DEFAULT_EXEC_DIR: &str = "/usr/local/bin";
pub const DEFAULT_WORK_DIR_NAME: &str = "vcfstore-work";

// Properties cache keys
pub const NAME_KEY: &str = "name";
pub const NAME_ORIGINAL_KEY: &str = "name.original";
pub const SUMMARY_FORMAT_KEY: &str = "summary.format";
pub const SUMMARY_VARIANTS_COUNT_KEY: &str = "summary.variants.count";
pub const SUMMARY_GENOTYPES_COUNT_KEY: &str = "summary.genotypes.count";
pub const SUMMARY_SIZE_KEY: &str = "summary.size";
pub const SUMMARY_SAMPLES_COUNT_KEY: &str = "summary.samples.count";

// Releases that persisted the variant count under the genotypes count key
pub const LEGACY_COUNT_VERSION: &str = "1.0.0";
pub const LEGACY_COUNT_VERSION_PREFIX: &str = "1.0-SNAPSHOT";

// bcftools stats summary lines
pub const STATS_RECORDS_MARKER: &str = "SN\t0\tnumber of records:\t";
pub const STATS_SAMPLES_MARKER: &str = "SN\t0\tnumber of samples:\t";

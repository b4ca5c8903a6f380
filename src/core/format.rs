use crate::{error::VcfStoreError, utils::util::Result};
use serde::Serialize;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VcfFormat {
    Vcf,
    Bcf,
}

impl VcfFormat {
    /// Lookup order when inferring the format of a stored dataset.
    pub const ALL: [VcfFormat; 2] = [VcfFormat::Vcf, VcfFormat::Bcf];

    pub fn extension(&self) -> &'static str {
        match self {
            VcfFormat::Vcf => "vcf",
            VcfFormat::Bcf => "bcf",
        }
    }

    /// Name of the uncompressed data file, before bgzip runs on it.
    pub fn raw_file_name(&self) -> String {
        format!("data.{}", self.extension())
    }

    pub fn compressed_file_name(&self) -> String {
        format!("data.{}.gz", self.extension())
    }

    pub fn index_extension(&self) -> &'static str {
        match self {
            VcfFormat::Vcf => "tbi",
            VcfFormat::Bcf => "csi",
        }
    }

    /// `-p` preset passed to tabix.
    pub fn index_preset(&self) -> &'static str {
        self.extension()
    }

    /// `--output-type` passed to `bcftools view` for compressed output.
    pub fn output_type(&self) -> &'static str {
        match self {
            VcfFormat::Vcf => "z",
            VcfFormat::Bcf => "b",
        }
    }

    pub fn from_output_type(s: &str) -> Option<Self> {
        match s {
            "z" => Some(VcfFormat::Vcf),
            "b" => Some(VcfFormat::Bcf),
            _ => None,
        }
    }
}

impl fmt::Display for VcfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcfFormat::Vcf => f.write_str("VCF"),
            VcfFormat::Bcf => f.write_str("BCF"),
        }
    }
}

impl FromStr for VcfFormat {
    type Err = VcfStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "VCF" => Ok(VcfFormat::Vcf),
            "BCF" => Ok(VcfFormat::Bcf),
            _ => Err(VcfStoreError::InvalidInput(format!(
                "Unknown variant file format: {s}"
            ))),
        }
    }
}

/// What a submitted file name says about its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKind {
    /// Dataset name with the format suffix stripped.
    pub name: String,
    pub format: VcfFormat,
    pub compressed: bool,
}

/// Detects format and compression from the suffix of a submitted file name.
///
/// Suffixes are checked in the order `.vcf`, `.vcf.gz`, `.bcf`, `.bcf.gz`. Any other name is
/// rejected rather than assumed to be compressed VCF.
pub fn detect_source(file_name: &str) -> Result<SourceKind> {
    const SUFFIXES: [(&str, VcfFormat, bool); 4] = [
        (".vcf", VcfFormat::Vcf, false),
        (".vcf.gz", VcfFormat::Vcf, true),
        (".bcf", VcfFormat::Bcf, false),
        (".bcf.gz", VcfFormat::Bcf, true),
    ];
    for (suffix, format, compressed) in SUFFIXES {
        if let Some(name) = file_name.strip_suffix(suffix) {
            return Ok(SourceKind {
                name: name.to_string(),
                format,
                compressed,
            });
        }
    }
    Err(VcfStoreError::InvalidInput(format!(
        "Cannot detect the variant file format of '{file_name}': expected a .vcf, .vcf.gz, .bcf or .bcf.gz suffix"
    )))
}

use crate::{config::StoreConfig, core::format::VcfFormat};
use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

/// Full version string including the crate version and git description.
///
/// This is the default version stamped into the properties cache of every written VCF.
/// # Examples
/// * `0.1.0-1ba958a-dirty` - while on a dirty branch
/// * `0.1.0-1ba958a` - with a fresh commit
pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    match option_env!("VERGEN_GIT_DESCRIBE") {
        Some(git_describe) if !git_describe.is_empty() => {
            format!("{}-{}", env!("CARGO_PKG_VERSION"), git_describe)
        }
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
});

#[derive(Parser, Debug)]
#[command(name="vcfstore",
          version=&**FULL_VERSION,
          about="Directory-backed store of VCF/BCF datasets",
          long_about = None,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// Properties file with data.dir, work.dir, version and exec.<tool> settings
    #[arg(
        long = "config",
        value_name = "PROPERTIES",
        global = true,
        value_parser = check_file_exists
    )]
    pub config: Option<PathBuf>,

    /// Root directory of the stores (overrides data.dir)
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Scratch directory for exported files (overrides work.dir)
    #[arg(long = "work-dir", value_name = "DIR", global = true)]
    pub work_dir: Option<PathBuf>,

    /// Maximum run time of an external tool in seconds, 0 to wait indefinitely (overrides exec.timeout)
    #[arg(
        long = "exec-timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "Advanced"
    )]
    pub exec_timeout: Option<u64>,
}

impl ServiceArgs {
    pub fn store_config(&self) -> crate::utils::util::Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::from_properties_file(path)?,
            None => StoreConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        match self.exec_timeout {
            Some(0) => config.exec_timeout = None,
            Some(seconds) => config.exec_timeout = Some(Duration::from_secs(seconds)),
            None => {}
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the stores
    Stores,
    /// Create a store
    CreateStore(StoreNameArgs),
    /// Delete a store and all its VCFs
    DeleteStore(StoreNameArgs),
    /// Add or replace a VCF in a store
    Write(WriteArgs),
    /// List the fully processed VCFs of a store
    List(StoreArgs),
    /// Print the summary of a VCF as JSON
    Summary(VcfArgs),
    /// List the sample IDs of all VCFs of a store
    Samples(StoreArgs),
    /// Export a VCF, optionally converted or restricted to some samples
    Read(ReadArgs),
    /// Print the bcftools statistics of a VCF
    Stats(VcfArgs),
    /// Delete a VCF
    Delete(VcfArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Stores => "stores",
            Command::CreateStore(_) => "create-store",
            Command::DeleteStore(_) => "delete-store",
            Command::Write(_) => "write",
            Command::List(_) => "list",
            Command::Summary(_) => "summary",
            Command::Samples(_) => "samples",
            Command::Read(_) => "read",
            Command::Stats(_) => "stats",
            Command::Delete(_) => "delete",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct StoreNameArgs {
    /// Store name
    #[arg(value_name = "STORE")]
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Store name
    #[arg(short = 's', long = "store", value_name = "STORE")]
    pub store: String,
}

#[derive(Args, Debug, Clone)]
pub struct VcfArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// VCF name
    #[arg(value_name = "VCF")]
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// VCF or BCF file (.vcf, .vcf.gz, .bcf or .bcf.gz)
    #[arg(value_name = "FILE", value_parser = check_file_exists)]
    pub file: PathBuf,

    /// File name to store the VCF under, its suffix sets the format [default: name of FILE]
    #[arg(long = "name", value_name = "NAME")]
    pub name: Option<String>,
}

impl WriteArgs {
    pub fn file_name(&self) -> crate::utils::util::Result<String> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        self.file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                crate::vcfstore_error!("Cannot derive a VCF name from {}", self.file.display())
            })
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    #[command(flatten)]
    pub vcf: VcfArgs,

    /// Output type: z|b, z: compressed VCF, b: compressed BCF [default: stored format]
    #[arg(
        short = 'O',
        long = "output-type",
        value_name = "OUTPUT_TYPE",
        value_parser = validate_output_type
    )]
    pub output_type: Option<VcfFormat>,

    /// Restrict the output to these samples (comma-separated list)
    #[arg(long = "samples", value_name = "SAMPLES", value_delimiter = ',')]
    pub samples: Option<Vec<String>>,

    /// Write output to a file [default: standard output]
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        value_parser = check_prefix_path
    )]
    pub output: Option<PathBuf>,
}

/// Initializes the verbosity level for logging based on the command-line arguments.
///
/// Sets up the logger with a specific verbosity level that is determined
/// by the number of occurrences of the `-v` or `--verbose` flag in the command-line arguments.
pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.module_path().unwrap_or("unknown_module"),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

/// Checks if the provided file path exists.
fn check_file_exists(s: &str) -> anyhow::Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        return Err(anyhow!("File does not exist: {}", path.display()));
    }
    Ok(path.to_path_buf())
}

fn check_prefix_path(s: &str) -> anyhow::Result<PathBuf> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(anyhow!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(path.to_path_buf())
}

fn validate_output_type(s: &str) -> anyhow::Result<VcfFormat> {
    VcfFormat::from_output_type(s)
        .ok_or_else(|| anyhow!("Invalid output type: {}. Must be one of z, b.", s))
}

use crate::io::exec::{ProcessRunner, ToolOutput};
use flate2::{write::GzEncoder, Compression};
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

/// A recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub workdir: PathBuf,
    pub argv: Vec<String>,
    pub output: ToolOutput,
}

impl Invocation {
    /// `bgzip`, `tabix` or `bcftools <subcommand>`.
    pub fn key(&self) -> String {
        tool_key(&self.argv)
    }
}

fn tool_key(argv: &[String]) -> String {
    let program = argv
        .first()
        .and_then(|program| Path::new(program).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match (program.as_str(), argv.get(1)) {
        ("bcftools", Some(subcommand)) => format!("bcftools {subcommand}"),
        _ => program,
    }
}

fn option_value<'a>(argv: &'a [String], option: &str) -> Option<&'a str> {
    argv.iter()
        .position(|arg| arg == option)
        .and_then(|i| argv.get(i + 1))
        .map(String::as_str)
}

/// Emulates bgzip, tabix and the bcftools subcommands used by the store.
///
/// * `bgzip -f FILE` gzips FILE into FILE.gz and removes FILE
/// * `tabix -f -p vcf|bcf FILE` writes an empty FILE.tbi or FILE.csi
/// * `bcftools query --list-samples` prints the configured samples
/// * `bcftools stats` prints a report with the configured record count
/// * `bcftools view` writes `view:<type>:<samples>\n` followed by the input bytes
#[derive(Debug)]
pub struct FakeRunner {
    samples: Mutex<Vec<String>>,
    records: Mutex<u64>,
    failing: Mutex<Option<String>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            samples: Mutex::new(vec!["NA12878".to_string(), "NA12891".to_string()]),
            records: Mutex::new(100),
            failing: Mutex::new(None),
            invocations: Mutex::new(Vec::new()),
        }
    }
}

impl FakeRunner {
    pub fn set_samples(&self, samples: &[&str]) {
        *self.samples.lock().expect("samples lock") =
            samples.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_records(&self, records: u64) {
        *self.records.lock().expect("records lock") = records;
    }

    /// Makes every invocation with this key exit with status 1.
    pub fn fail_on(&self, key: Option<&str>) {
        *self.failing.lock().expect("failing lock") = key.map(str::to_string);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().expect("invocations lock").clone()
    }

    pub fn invocation_keys(&self) -> Vec<String> {
        self.invocations().iter().map(Invocation::key).collect()
    }

    pub fn clear(&self) {
        self.invocations.lock().expect("invocations lock").clear();
    }

    fn emulate(&self, argv: &[String], output: &ToolOutput) -> io::Result<i32> {
        let mut out = match output {
            ToolOutput::ExecLog(path) => OpenOptions::new().create(true).append(true).open(path)?,
            ToolOutput::File(path) => fs::File::create(path)?,
        };
        let key = tool_key(argv);
        if self.failing.lock().expect("failing lock").as_deref() == Some(key.as_str()) {
            writeln!(out, "[E::{key}] simulated failure")?;
            return Ok(1);
        }
        let input = PathBuf::from(argv.last().cloned().unwrap_or_default());

        match key.as_str() {
            "bgzip" => {
                let raw = fs::read(&input)?;
                let mut compressed = input.clone().into_os_string();
                compressed.push(".gz");
                let mut encoder = GzEncoder::new(fs::File::create(compressed)?, Compression::default());
                encoder.write_all(&raw)?;
                encoder.finish()?;
                fs::remove_file(&input)?;
            }
            "tabix" => {
                let extension = match option_value(argv, "-p") {
                    Some("bcf") => "csi",
                    _ => "tbi",
                };
                let mut index = input.into_os_string();
                index.push(format!(".{extension}"));
                fs::write(index, b"")?;
            }
            "bcftools query" => {
                for sample in self.samples.lock().expect("samples lock").iter() {
                    writeln!(out, "{sample}")?;
                }
            }
            "bcftools stats" => {
                let samples = self.samples.lock().expect("samples lock").len();
                let records = *self.records.lock().expect("records lock");
                write!(
                    out,
                    "# This file was produced by bcftools stats\n\
                     ID\t0\t{}\n\
                     SN\t0\tnumber of samples:\t{samples}\n\
                     SN\t0\tnumber of records:\t{records}\n\
                     SN\t0\tnumber of SNPs:\t{records}\n",
                    input.display()
                )?;
            }
            "bcftools view" => {
                let output_type = option_value(argv, "--output-type").unwrap_or("v");
                let samples = match option_value(argv, "--samples-file") {
                    Some(path) => {
                        let listed = fs::read_to_string(path)?;
                        listed.lines().collect::<Vec<_>>().join(",")
                    }
                    None => String::new(),
                };
                let destination = option_value(argv, "--output-file").ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "missing --output-file")
                })?;
                let mut content = format!("view:{output_type}:{samples}\n").into_bytes();
                content.extend(fs::read(&input)?);
                fs::write(destination, content)?;
            }
            _ => return Ok(127),
        }
        Ok(0)
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, workdir: &Path, argv: &[String], output: &ToolOutput) -> i32 {
        self.invocations
            .lock()
            .expect("invocations lock")
            .push(Invocation {
                workdir: workdir.to_path_buf(),
                argv: argv.to_vec(),
                output: output.clone(),
            });
        self.emulate(argv, output).unwrap_or(-1)
    }
}

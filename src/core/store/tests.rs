use super::*;
use crate::core::test_utils::FakeRunner;
use crate::io::properties::Properties;
use crate::utils::util::init_logger;
use flate2::read::GzDecoder;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

const RAW_VCF: &str = "##fileformat=VCFv4.2\n\
    #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA12878\tNA12891\n\
    chr1\t100\t.\tA\tG\t50\tPASS\t.\tGT\t0/1\t1/1\n";

struct Fixture {
    _temp_dir: TempDir,
    runner: Arc<FakeRunner>,
    store: VcfStore,
}

impl Fixture {
    fn new() -> Self {
        init_logger();
        let temp_dir = tempdir().expect("temp dir should be created");
        let config = StoreConfig::new(temp_dir.path().join("data"), temp_dir.path().join("work"))
            .with(|config| config.version = "2.0.0".to_string());
        let runner = Arc::new(FakeRunner::default());
        let store = VcfStore::new("cohorts", Arc::new(config), runner.clone())
            .expect("store should open");
        Self {
            _temp_dir: temp_dir,
            runner,
            store,
        }
    }

    fn write(&self, file_name: &str, content: &[u8]) -> Result<VcfSummary> {
        self.store.write_vcf(file_name, content)
    }

    fn dataset_file(&self, vcf_name: &str, file_name: &str) -> PathBuf {
        self.store.layout().dataset_dir(vcf_name).join(file_name)
    }
}

fn read_all(mut stream: VcfStream) -> Vec<u8> {
    let mut content = Vec::new();
    stream
        .read_to_end(&mut content)
        .expect("stream should be readable");
    content
}

fn gunzip(content: &[u8]) -> String {
    let mut decoded = String::new();
    GzDecoder::new(content)
        .read_to_string(&mut decoded)
        .expect("content should be gzip");
    decoded
}

#[test]
fn write_raw_vcf_runs_full_pipeline() {
    let fixture = Fixture::new();
    let summary = fixture
        .write("cohort.vcf", RAW_VCF.as_bytes())
        .expect("write should succeed");

    assert_eq!(
        fixture.runner.invocation_keys(),
        vec!["bgzip", "tabix", "bcftools query", "bcftools stats"]
    );
    let dataset_dir = fixture.store.layout().dataset_dir("cohort");
    assert!(fixture
        .runner
        .invocations()
        .iter()
        .all(|invocation| invocation.workdir == dataset_dir));

    assert_eq!(summary.name, "cohort");
    assert_eq!(summary.format, VcfFormat::Vcf);
    assert_eq!(summary.sample_ids, vec!["NA12878", "NA12891"]);
    assert_eq!(summary.variants_count, 100);
    assert_eq!(summary.genotypes_count, 200);
    assert!(summary.size > 0);

    assert!(fixture.dataset_file("cohort", "data.vcf.gz").is_file());
    assert!(fixture.dataset_file("cohort", "data.vcf.gz.tbi").is_file());
    assert!(!fixture.dataset_file("cohort", "data.vcf").exists());
    assert!(fixture.store.has_vcf("cohort"));
    assert_eq!(
        fixture.store.vcf_names().expect("names should be listed"),
        vec!["cohort"]
    );
}

#[test]
fn write_uses_tool_command_lines() {
    let fixture = Fixture::new();
    fixture
        .write("cohort.bcf", b"BCF\x02\x02")
        .expect("write should succeed");

    let data_file = path_arg(&fixture.dataset_file("cohort", "data.bcf.gz"));
    let raw_file = path_arg(&fixture.dataset_file("cohort", "data.bcf"));
    let argvs: Vec<Vec<String>> = fixture
        .runner
        .invocations()
        .into_iter()
        .map(|invocation| invocation.argv)
        .collect();
    assert_eq!(
        argvs,
        vec![
            vec!["/usr/local/bin/bgzip".to_string(), "-f".to_string(), raw_file],
            vec![
                "/usr/local/bin/tabix".to_string(),
                "-f".to_string(),
                "-p".to_string(),
                "bcf".to_string(),
                data_file.clone()
            ],
            vec![
                "/usr/local/bin/bcftools".to_string(),
                "query".to_string(),
                "--list-samples".to_string(),
                data_file.clone()
            ],
            vec![
                "/usr/local/bin/bcftools".to_string(),
                "stats".to_string(),
                data_file
            ],
        ]
    );
    assert!(fixture.dataset_file("cohort", "data.bcf.gz.csi").is_file());

    let outputs: Vec<ToolOutput> = fixture
        .runner
        .invocations()
        .into_iter()
        .map(|invocation| invocation.output)
        .collect();
    let exec_log = fixture.dataset_file("cohort", "exec.log");
    assert_eq!(outputs[0], ToolOutput::ExecLog(exec_log.clone()));
    assert_eq!(outputs[1], ToolOutput::ExecLog(exec_log));
    assert_eq!(
        outputs[2],
        ToolOutput::File(fixture.dataset_file("cohort", "samples.txt"))
    );
    assert_eq!(
        outputs[3],
        ToolOutput::File(fixture.dataset_file("cohort", "statistics.tsv"))
    );
}

#[test]
fn write_compressed_input_skips_compression() {
    let fixture = Fixture::new();
    fixture
        .write("cohort.vcf.gz", b"already compressed")
        .expect("write should succeed");
    assert_eq!(
        fixture.runner.invocation_keys(),
        vec!["tabix", "bcftools query", "bcftools stats"]
    );
}

#[test]
fn write_persists_properties_cache() {
    let fixture = Fixture::new();
    fixture.runner.set_samples(&["a", "b", "c"]);
    fixture.runner.set_records(7);
    fixture
        .write("cohort.bcf.gz", b"bcf bytes")
        .expect("write should succeed");

    let properties = Properties::load(&fixture.dataset_file("cohort", "vcf.properties"))
        .expect("properties should load");
    assert_eq!(properties.get("name"), Some("cohort"));
    assert_eq!(properties.get("name.original"), Some("cohort.bcf.gz"));
    assert_eq!(properties.get("version"), Some("2.0.0"));
    assert_eq!(properties.get("summary.format"), Some("BCF"));
    assert_eq!(properties.get("summary.variants.count"), Some("7"));
    assert_eq!(properties.get("summary.genotypes.count"), Some("21"));
    assert_eq!(properties.get("summary.samples.count"), Some("3"));
    assert_eq!(properties.get("summary.size"), Some("9"));
}

#[test]
fn write_rejects_unknown_suffix() {
    let fixture = Fixture::new();
    let err = fixture.write("cohort.txt", b"content").unwrap_err();
    assert!(matches!(err, VcfStoreError::InvalidInput(_)), "{err}");
    assert!(fixture.runner.invocations().is_empty());
    assert!(!fixture.store.layout().dataset_dir("cohort.txt").exists());
}

#[test]
fn write_rejects_names_escaping_the_store() {
    let fixture = Fixture::new();
    for file_name in ["../escape.vcf", ".vcf", "a/b.vcf.gz"] {
        let err = fixture.write(file_name, b"content").unwrap_err();
        assert!(matches!(err, VcfStoreError::InvalidInput(_)), "{file_name}: {err}");
    }
}

#[test]
fn failing_step_aborts_pipeline_and_leaves_dataset_unready() {
    let fixture = Fixture::new();
    fixture.runner.fail_on(Some("tabix"));
    let err = fixture
        .write("cohort.vcf", RAW_VCF.as_bytes())
        .unwrap_err();
    assert!(err.is_processing_failure(), "{err}");
    assert!(matches!(
        err,
        VcfStoreError::Processing {
            step: PipelineStep::Index,
            status: 1
        }
    ));
    assert_eq!(fixture.runner.invocation_keys(), vec!["bgzip", "tabix"]);

    assert!(fixture.store.has_vcf("cohort"));
    assert!(!fixture.dataset_file("cohort", "vcf.properties").exists());
    assert!(fixture
        .store
        .vcf_names()
        .expect("names should be listed")
        .is_empty());
    let exec_log = fs::read_to_string(fixture.dataset_file("cohort", "exec.log"))
        .expect("exec log should be readable");
    assert!(exec_log.contains("simulated failure"));
}

#[test]
fn each_failing_step_is_named() {
    let cases = [
        ("bgzip", PipelineStep::Compress),
        ("bcftools query", PipelineStep::ListSamples),
        ("bcftools stats", PipelineStep::Statistics),
    ];
    for (key, expected) in cases {
        let fixture = Fixture::new();
        fixture.runner.fail_on(Some(key));
        match fixture.write("cohort.vcf", RAW_VCF.as_bytes()) {
            Err(VcfStoreError::Processing { step, .. }) => assert_eq!(step, expected, "{key}"),
            other => panic!("{key}: expected processing failure, got {other:?}"),
        }
        assert!(fixture.store.vcf_names().expect("names").is_empty());
    }
}

#[test]
fn rewrite_replaces_previous_dataset() {
    let fixture = Fixture::new();
    fixture.runner.set_samples(&["a", "b"]);
    fixture
        .write("cohort.vcf", RAW_VCF.as_bytes())
        .expect("first write should succeed");
    fs::write(fixture.dataset_file("cohort", "stale.txt"), "stale").expect("stale file");

    fixture.runner.set_samples(&["c"]);
    fixture
        .write("cohort.bcf.gz", b"bcf bytes")
        .expect("second write should succeed");

    assert!(!fixture.dataset_file("cohort", "data.vcf.gz").exists());
    assert!(!fixture.dataset_file("cohort", "data.vcf.gz.tbi").exists());
    assert!(!fixture.dataset_file("cohort", "stale.txt").exists());
    let summary = fixture
        .store
        .vcf_summary("cohort")
        .expect("summary should be read");
    assert_eq!(summary.format, VcfFormat::Bcf);
    assert_eq!(summary.sample_ids, vec!["c"]);
    assert_eq!(summary.genotypes_count, 100);
}

#[test]
fn summary_is_read_from_cache_without_running_tools() {
    let fixture = Fixture::new();
    let written = fixture
        .write("cohort.vcf", RAW_VCF.as_bytes())
        .expect("write should succeed");
    fixture.runner.clear();

    let summary = fixture
        .store
        .vcf_summary("cohort")
        .expect("summary should be read");
    assert_eq!(summary, written);
    assert!(fixture.runner.invocations().is_empty());
}

#[test]
fn summary_of_missing_dataset_is_not_found() {
    let fixture = Fixture::new();
    let err = fixture.store.vcf_summary("missing").unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[test]
fn summary_of_legacy_cache_is_corrected() {
    let fixture = Fixture::new();
    fixture
        .write("cohort.vcf.gz", b"vcf bytes")
        .expect("write should succeed");
    fs::write(
        fixture.dataset_file("cohort", "vcf.properties"),
        "name=cohort\nversion=1.0.0\nsummary.genotypes.count=50\nsummary.variants.count=0\n\
         summary.samples.count=2\nsummary.size=9\n",
    )
    .expect("legacy properties should be written");

    let summary = fixture
        .store
        .vcf_summary("cohort")
        .expect("summary should be read");
    assert_eq!(summary.variants_count, 50);
    assert_eq!(summary.genotypes_count, 100);
}

#[test]
fn summary_without_cached_size_uses_data_file_length() {
    let fixture = Fixture::new();
    fixture
        .write("cohort.vcf.gz", b"vcf bytes")
        .expect("write should succeed");
    fs::write(
        fixture.dataset_file("cohort", "vcf.properties"),
        "version=1.0.0\nsummary.genotypes.count=50\nsummary.samples.count=2\n",
    )
    .expect("properties should be written");

    let summary = fixture
        .store
        .vcf_summary("cohort")
        .expect("summary should be read");
    let data_len = fs::metadata(fixture.dataset_file("cohort", "data.vcf.gz"))
        .expect("data file should exist")
        .len();
    assert_eq!(data_len, 9);
    assert_eq!(summary.size, data_len);
    assert_eq!(summary.variants_count, 50);
}

#[test]
fn summary_of_unready_dataset_is_not_ready() {
    let fixture = Fixture::new();
    fixture.runner.fail_on(Some("bcftools stats"));
    fixture
        .write("cohort.vcf.gz", b"vcf bytes")
        .expect_err("write should fail");
    assert!(fixture.store.has_vcf("cohort"));

    let err = fixture.store.vcf_summary("cohort").unwrap_err();
    assert!(err.is_not_ready(), "{err}");
    assert!(!err.is_not_found());
}

#[test]
fn sample_ids_merge_datasets_in_first_seen_order() {
    let fixture = Fixture::new();
    fixture.runner.set_samples(&["a", "b"]);
    fixture
        .write("first.vcf", RAW_VCF.as_bytes())
        .expect("write should succeed");
    fixture.runner.set_samples(&["b", "c"]);
    fixture
        .write("second.vcf.gz", b"vcf bytes")
        .expect("write should succeed");

    assert_eq!(
        fixture.store.sample_ids().expect("samples should be listed"),
        vec!["a", "b", "c"]
    );
}

#[test]
fn sample_ids_ignore_unready_datasets() {
    let fixture = Fixture::new();
    fixture.runner.set_samples(&["a"]);
    fixture
        .write("ready.vcf.gz", b"vcf bytes")
        .expect("write should succeed");
    fixture.runner.set_samples(&["z"]);
    fixture.runner.fail_on(Some("bcftools stats"));
    assert!(fixture.write("broken.vcf.gz", b"vcf bytes").is_err());

    assert_eq!(
        fixture.store.sample_ids().expect("samples should be listed"),
        vec!["a"]
    );
}

#[test]
fn delete_is_idempotent() {
    let fixture = Fixture::new();
    fixture
        .store
        .delete_vcf("missing")
        .expect("deleting a missing VCF should succeed");

    fixture
        .write("cohort.vcf", RAW_VCF.as_bytes())
        .expect("write should succeed");
    fixture.store.delete_vcf("cohort").expect("delete should succeed");
    assert!(!fixture.store.has_vcf("cohort"));
    assert!(!fixture.store.layout().dataset_dir("cohort").exists());
    fixture
        .store
        .delete_vcf("cohort")
        .expect("second delete should succeed");
    assert!(!fixture.store.has_vcf("cohort"));
}

#[test]
fn read_without_conversion_returns_stored_bytes() {
    let fixture = Fixture::new();
    fixture
        .write("packed.vcf.gz", b"compressed payload")
        .expect("write should succeed");
    fixture.runner.clear();
    let content = read_all(fixture.store.read_vcf("packed", None).expect("read"));
    assert_eq!(content, b"compressed payload");

    let same_format = read_all(
        fixture
            .store
            .read_vcf("packed", Some(VcfFormat::Vcf))
            .expect("read"),
    );
    assert_eq!(same_format, b"compressed payload");
    assert!(fixture.runner.invocations().is_empty());

    fixture
        .write("raw.vcf", RAW_VCF.as_bytes())
        .expect("write should succeed");
    let content = read_all(fixture.store.read_vcf("raw", None).expect("read"));
    assert_eq!(gunzip(&content), RAW_VCF);
}

#[test]
fn read_with_conversion_streams_temporary_file() {
    let fixture = Fixture::new();
    fixture
        .write("cohort.vcf.gz", b"vcf payload")
        .expect("write should succeed");
    fixture.runner.clear();

    let stream = fixture
        .store
        .read_vcf("cohort", Some(VcfFormat::Bcf))
        .expect("conversion should succeed");
    let invocations = fixture.runner.invocations();
    assert_eq!(invocations.len(), 1);
    let argv = &invocations[0].argv;
    assert_eq!(&argv[1..4], &["view", "--output-type", "b"]);
    assert_eq!(argv[4], "--output-file");
    let temp_output = PathBuf::from(&argv[5]);
    let work_dir = fixture
        .store
        .layout()
        .work_dir("cohort")
        .expect("work dir should exist");
    assert_eq!(temp_output.parent(), Some(work_dir.as_path()));
    assert!(argv[5].ends_with(".bcf.gz"));
    assert_eq!(
        argv[6],
        path_arg(&fixture.dataset_file("cohort", "data.vcf.gz"))
    );

    assert_eq!(read_all(stream), b"view:b:\nvcf payload");
    assert!(!temp_output.exists());
}

#[test]
fn failed_conversion_is_a_processing_failure() {
    let fixture = Fixture::new();
    fixture
        .write("cohort.vcf.gz", b"vcf payload")
        .expect("write should succeed");
    fixture.runner.fail_on(Some("bcftools view"));
    let err = fixture
        .store
        .read_vcf("cohort", Some(VcfFormat::Bcf))
        .unwrap_err();
    assert!(matches!(
        err,
        VcfStoreError::Processing {
            step: PipelineStep::Convert,
            ..
        }
    ));
}

#[test]
fn read_samples_subsets_with_samples_file() {
    let fixture = Fixture::new();
    fixture
        .write("cohort.bcf.gz", b"bcf payload")
        .expect("write should succeed");
    fixture.runner.clear();

    let stream = fixture
        .store
        .read_vcf_samples("cohort", Some(VcfFormat::Vcf), &["NA12878", "NA12891"])
        .expect("subset should succeed");
    let argv = fixture.runner.invocations()[0].argv.clone();
    assert_eq!(&argv[1..3], &["view", "--samples-file"]);
    assert_eq!(&argv[4..7], &["--output-type", "z", "--output-file"]);
    let samples_file = PathBuf::from(&argv[3]);
    assert!(samples_file.exists());

    assert_eq!(read_all(stream), b"view:z:NA12878,NA12891\nbcf payload");
    assert!(!samples_file.exists());
}

#[test]
fn read_samples_defaults_to_stored_format() {
    let fixture = Fixture::new();
    fixture
        .write("cohort.bcf.gz", b"bcf payload")
        .expect("write should succeed");
    let content = read_all(
        fixture
            .store
            .read_vcf_samples("cohort", None, &["NA12878"])
            .expect("subset should succeed"),
    );
    assert_eq!(content, b"view:b:NA12878\nbcf payload");
}

#[test]
fn read_samples_failures() {
    let fixture = Fixture::new();
    let err = fixture
        .store
        .read_vcf_samples("missing", None, &["a"])
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");

    fixture
        .write("cohort.vcf.gz", b"vcf payload")
        .expect("write should succeed");
    let no_samples: [&str; 0] = [];
    assert!(matches!(
        fixture.store.read_vcf_samples("cohort", None, &no_samples),
        Err(VcfStoreError::InvalidInput(_))
    ));

    fixture.runner.fail_on(Some("bcftools view"));
    let err = fixture
        .store
        .read_vcf_samples("cohort", None, &["a"])
        .unwrap_err();
    assert!(matches!(
        err,
        VcfStoreError::Processing {
            step: PipelineStep::Subset,
            ..
        }
    ));
}

#[test]
fn read_statistics_streams_report() {
    let fixture = Fixture::new();
    let err = fixture.store.read_vcf_statistics("missing").unwrap_err();
    assert!(err.is_not_found(), "{err}");

    fixture
        .write("cohort.vcf.gz", b"vcf payload")
        .expect("write should succeed");
    let report = String::from_utf8(read_all(
        fixture
            .store
            .read_vcf_statistics("cohort")
            .expect("statistics should be readable"),
    ))
    .expect("report should be UTF-8");
    assert!(report.contains("SN\t0\tnumber of records:\t100"));
}

#[test]
fn read_of_missing_dataset_is_not_found() {
    let fixture = Fixture::new();
    let err = fixture.store.read_vcf("missing", None).unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

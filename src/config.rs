use crate::{
    cli::FULL_VERSION,
    constants::*,
    io::{exec::Tool, properties::Properties},
    utils::util::Result,
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

/// Service configuration, as supplied by the host through a flat properties map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub work_dir: PathBuf,
    /// Stamped into every properties cache written by this service.
    pub version: String,
    pub executables: BTreeMap<String, PathBuf>,
    /// Upper bound on a single external tool run, `None` waits indefinitely.
    pub exec_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            work_dir: std::env::temp_dir().join(DEFAULT_WORK_DIR_NAME),
            version: FULL_VERSION.clone(),
            executables: BTreeMap::new(),
            exec_timeout: None,
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    pub fn with(mut self, updates: impl FnOnce(&mut Self)) -> Self {
        updates(&mut self);
        self
    }

    pub fn from_properties_file(path: &Path) -> Result<Self> {
        Self::from_properties(&Properties::load(path)?)
    }

    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let mut config = Self::default();
        if let Some(data_dir) = properties.get(DATA_DIR_PROPERTY) {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(work_dir) = properties.get(WORK_DIR_PROPERTY) {
            config.work_dir = PathBuf::from(work_dir);
        }
        if let Some(version) = properties.get(VERSION_PROPERTY) {
            config.version = version.to_string();
        }
        config.exec_timeout = match properties.get_parsed::<u64>(EXEC_TIMEOUT_PROPERTY)? {
            None | Some(0) => None,
            Some(seconds) => Some(Duration::from_secs(seconds)),
        };
        for (key, value) in properties.iter() {
            if key == EXEC_TIMEOUT_PROPERTY {
                continue;
            }
            if let Some(tool) = key.strip_prefix(EXEC_PROPERTY_PREFIX) {
                config
                    .executables
                    .insert(tool.to_string(), PathBuf::from(value));
            }
        }
        Ok(config)
    }

    /// Resolves the executable for `tool`, defaulting to `/usr/local/bin/<tool>`.
    pub fn executable(&self, tool: Tool) -> PathBuf {
        self.executables
            .get(tool.name())
            .cloned()
            .unwrap_or_else(|| Path::new(DEFAULT_EXEC_DIR).join(tool.name()))
    }
}

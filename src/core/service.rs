use crate::{
    config::StoreConfig,
    constants::SERVICE_NAME,
    core::{layout::validate_name, store::VcfStore},
    error::VcfStoreError,
    io::exec::{ProcessRunner, SystemRunner},
    utils::util::{absolute_path, list_subdirectories, log_warning, remove_dir_all_if_exists, Result},
};
use std::{fs, path::PathBuf, sync::Arc};

/// Registry of VCF stores, each one a directory under the configured data root.
///
/// Store operations are only available once the service has been both configured and started.
pub struct VcfStoreService {
    config: Option<Arc<StoreConfig>>,
    runner: Arc<dyn ProcessRunner>,
    running: bool,
}

impl Default for VcfStoreService {
    fn default() -> Self {
        Self::new(Arc::new(SystemRunner::default()))
    }
}

impl VcfStoreService {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config: None,
            runner,
            running: false,
        }
    }

    /// A service running external tools with the system runner, bounded by the configured timeout.
    pub fn with_config(config: StoreConfig) -> Self {
        let runner = Arc::new(SystemRunner::new(config.exec_timeout));
        let mut service = Self::new(runner);
        service.configure(config);
        service
    }

    pub fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    pub fn configure(&mut self, config: StoreConfig) {
        self.config = Some(Arc::new(config));
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn checked_config(&self) -> Result<&Arc<StoreConfig>> {
        if !self.running {
            return Err(VcfStoreError::InvalidState(format!(
                "{SERVICE_NAME} service has not been started"
            )));
        }
        self.config.as_ref().ok_or_else(|| {
            VcfStoreError::InvalidState(format!("{SERVICE_NAME} service has not been configured"))
        })
    }

    /// Data root, created if missing.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = absolute_path(&self.checked_config()?.data_dir)?;
        fs::create_dir_all(&data_dir).map_err(|error| {
            crate::vcfstore_error!("Failed to create data directory {}: {error}", data_dir.display())
        })?;
        Ok(data_dir)
    }

    fn store_dir(&self, name: &str) -> Result<PathBuf> {
        validate_name("VCF store", name)?;
        Ok(self.data_dir()?.join(name))
    }

    pub fn store_names(&self) -> Result<Vec<String>> {
        list_subdirectories(&self.data_dir()?)
    }

    pub fn has_store(&self, name: &str) -> Result<bool> {
        Ok(self.store_dir(name)?.is_dir())
    }

    pub fn get_store(&self, name: &str) -> Result<VcfStore> {
        if !self.store_dir(name)?.is_dir() {
            return Err(VcfStoreError::store_not_found(name));
        }
        self.open_store(name)
    }

    pub fn create_store(&self, name: &str) -> Result<VcfStore> {
        let store_dir = self.store_dir(name)?;
        if store_dir.exists() {
            return Err(VcfStoreError::AlreadyExists {
                name: name.to_string(),
            });
        }
        fs::create_dir_all(&store_dir)?;
        log::info!("Created VCF store {name} in {}", store_dir.display());
        self.open_store(name)
    }

    /// Removes a store and all its datasets. Removal failures are logged, not returned.
    pub fn delete_store(&self, name: &str) -> Result<()> {
        let store_dir = self.store_dir(name)?;
        remove_dir_all_if_exists(&store_dir).unwrap_or_else(|error| {
            log_warning(
                format!("Failed to delete VCF store {}: {error}", store_dir.display()),
                (),
            )
        });
        Ok(())
    }

    fn open_store(&self, name: &str) -> Result<VcfStore> {
        VcfStore::new(name, self.checked_config()?.clone(), self.runner.clone())
    }
}

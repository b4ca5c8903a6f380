use crate::{cli::ServiceArgs, core::service::VcfStoreService, utils::util::Result};

mod dataset;
mod store;

pub use dataset::{delete, list, read, samples, stats, summary, write};
pub use store::{create_store, delete_store, stores};

/// Configured and started service for a single command run.
pub fn start_service(args: &ServiceArgs) -> Result<VcfStoreService> {
    let config = args.store_config()?;
    log::debug!("Service configuration: {:#?}", config);
    let mut service = VcfStoreService::with_config(config);
    service.start();
    Ok(service)
}

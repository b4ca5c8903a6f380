use crate::{cli::StoreNameArgs, core::service::VcfStoreService, utils::util::Result};
use std::io::{self, Write};

pub fn stores(service: &VcfStoreService) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for name in service.store_names()? {
        writeln!(stdout, "{name}")?;
    }
    Ok(())
}

pub fn create_store(service: &VcfStoreService, args: StoreNameArgs) -> Result<()> {
    service.create_store(&args.name)?;
    Ok(())
}

pub fn delete_store(service: &VcfStoreService, args: StoreNameArgs) -> Result<()> {
    if !service.has_store(&args.name)? {
        log::warn!("No VCF store named {} to delete", args.name);
        return Ok(());
    }
    service.delete_store(&args.name)?;
    log::info!("Deleted VCF store {}", args.name);
    Ok(())
}

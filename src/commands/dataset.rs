use crate::{
    cli::{ReadArgs, StoreArgs, VcfArgs, WriteArgs},
    core::service::VcfStoreService,
    utils::util::Result,
};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
};

pub fn write(service: &VcfStoreService, args: WriteArgs) -> Result<()> {
    let store = service.get_store(&args.store.store)?;
    let file_name = args.file_name()?;
    let input = BufReader::new(File::open(&args.file).map_err(|error| {
        crate::vcfstore_error!("Failed to open {}: {error}", args.file.display())
    })?);
    store.write_vcf(&file_name, input)?;
    Ok(())
}

pub fn list(service: &VcfStoreService, args: StoreArgs) -> Result<()> {
    let store = service.get_store(&args.store)?;
    let mut stdout = io::stdout().lock();
    for name in store.vcf_names()? {
        writeln!(stdout, "{name}")?;
    }
    Ok(())
}

pub fn summary(service: &VcfStoreService, args: VcfArgs) -> Result<()> {
    let store = service.get_store(&args.store.store)?;
    let summary = store.vcf_summary(&args.name)?;
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|error| crate::vcfstore_error!("Failed to serialize summary: {error}"))?;
    writeln!(io::stdout().lock(), "{json}")?;
    Ok(())
}

pub fn samples(service: &VcfStoreService, args: StoreArgs) -> Result<()> {
    let store = service.get_store(&args.store)?;
    let mut stdout = io::stdout().lock();
    for sample_id in store.sample_ids()? {
        writeln!(stdout, "{sample_id}")?;
    }
    Ok(())
}

pub fn read(service: &VcfStoreService, args: ReadArgs) -> Result<()> {
    let store = service.get_store(&args.vcf.store.store)?;
    let mut stream = match &args.samples {
        Some(samples) => store.read_vcf_samples(&args.vcf.name, args.output_type, samples.as_slice())?,
        None => store.read_vcf(&args.vcf.name, args.output_type)?,
    };
    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let copied = io::copy(&mut stream, &mut writer)?;
    writer.flush()?;
    log::debug!("Exported {} bytes of VCF {}", copied, args.vcf.name);
    Ok(())
}

pub fn stats(service: &VcfStoreService, args: VcfArgs) -> Result<()> {
    let store = service.get_store(&args.store.store)?;
    let mut stream = store.read_vcf_statistics(&args.name)?;
    let mut stdout = io::stdout().lock();
    io::copy(&mut stream, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

pub fn delete(service: &VcfStoreService, args: VcfArgs) -> Result<()> {
    let store = service.get_store(&args.store.store)?;
    if !store.has_vcf(&args.name) {
        log::warn!("No VCF named {} in store {}", args.name, store.name());
    }
    store.delete_vcf(&args.name)?;
    Ok(())
}

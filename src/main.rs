use clap::Parser;
use std::time;
use vcfstore::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands,
    utils::util::{handle_error_and_exit, Result},
};

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    log::trace!("CLI options set: {:?}", cli);

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        &**FULL_VERSION,
        cli.command.name()
    );

    let start_timer = time::Instant::now();
    let service = commands::start_service(&cli.service)?;
    match cli.command {
        Command::Stores => commands::stores(&service)?,
        Command::CreateStore(args) => commands::create_store(&service, args)?,
        Command::DeleteStore(args) => commands::delete_store(&service, args)?,
        Command::Write(args) => {
            log::trace!("Write arguments: {:#?}", args);
            commands::write(&service, args)?
        }
        Command::List(args) => commands::list(&service, args)?,
        Command::Summary(args) => commands::summary(&service, args)?,
        Command::Samples(args) => commands::samples(&service, args)?,
        Command::Read(args) => {
            log::trace!("Read arguments: {:#?}", args);
            commands::read(&service, args)?
        }
        Command::Stats(args) => commands::stats(&service, args)?,
        Command::Delete(args) => commands::delete(&service, args)?,
    }
    log::info!("Total execution time: {:.2?}", start_timer.elapsed());

    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}

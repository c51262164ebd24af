use anyhow::Result;
use env_logger::Env;
use log::info;
use pgaccounts::cli;
use pgaccounts::config::Settings;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = cli::parse();
    let settings = Settings::from_command(args.cmd)?;
    info!(
        "{} accounts from {:?}{}",
        settings.mode,
        settings.roster,
        if settings.dryrun { " (dry-run)" } else { "" }
    );

    let summary = pgaccounts::execute(&settings)?;
    summary.print_table();

    Ok(())
}

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    dailypoem::logging::init().context("init logging")?;

    let cli = dailypoem::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let settings = dailypoem::config::Settings::resolve(&cli.global).context("resolve settings")?;
    tracing::debug!(data_dir = %settings.data_dir.display(), "resolved settings");

    match cli.command {
        dailypoem::cli::Command::Fetch(args) => {
            dailypoem::commands::fetch(&settings, args).context("fetch")?;
        }
        dailypoem::cli::Command::Today(args) => {
            dailypoem::commands::today(&settings, args).context("today")?;
        }
        dailypoem::cli::Command::Next(args) => {
            dailypoem::commands::next(&settings, args).context("next")?;
        }
        dailypoem::cli::Command::Genres => {
            dailypoem::commands::genres(&settings).context("genres")?;
        }
        dailypoem::cli::Command::Trigger(args) => {
            dailypoem::commands::trigger(&settings, args).context("trigger")?;
        }
    }

    Ok(())
}

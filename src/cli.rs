use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Directory holding the corpus, today cache, history log and preferences.
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// ZIP archive to download the corpus from (must be http/https).
    #[arg(long, global = true)]
    pub archive_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download and extract the corpus if it is missing.
    Fetch(FetchArgs),
    /// Show the poem of the day.
    Today(ShowArgs),
    /// Show another random poem.
    Next(ShowArgs),
    /// List genres with poem counts.
    Genres,
    /// Show the poem of the day once the daily trigger time has passed.
    Trigger(TriggerArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Re-download even if a corpus is already present.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Genre, dynasty or form filter (substring; `all` clears the saved one).
    #[arg(long)]
    pub genre: Option<String>,

    /// Print the poem as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TriggerArgs {
    /// Wall-clock trigger time (HH:MM).
    #[arg(long)]
    pub at: Option<String>,

    /// Genre, dynasty or form filter.
    #[arg(long)]
    pub genre: Option<String>,

    /// Print the poem as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Keep polling instead of checking once.
    #[arg(long, default_value_t = false)]
    pub watch: bool,

    /// Seconds between polls with `--watch`.
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,
}

use std::time::Duration;

use anyhow::Context as _;
use rand::SeedableRng as _;
use rand::rngs::StdRng;

use crate::cli::{FetchArgs, ShowArgs, TriggerArgs};
use crate::config::Settings;
use crate::formats::{Poem, Preferences};
use crate::history::HistoryLog;
use crate::loader;
use crate::schedule::{DailyTrigger, parse_trigger_time};
use crate::selector::PoemService;
use crate::today_cache::TodayCache;

/// Makes sure the corpus is on disk, loads it and restores today's poem.
/// A missing corpus that cannot be fetched is the one fatal startup error.
pub fn open_service(settings: &Settings) -> anyhow::Result<PoemService<StdRng>> {
    let corpus_dir = settings
        .corpus_store()
        .ensure_available()
        .context("corpus is not available locally and could not be downloaded")?;
    let corpus = loader::load(&corpus_dir);

    let mut service = PoemService::new(
        corpus,
        HistoryLog::new(settings.history_path()),
        TodayCache::new(settings.today_cache_path()),
        StdRng::from_entropy(),
    );
    service.restore(chrono::Local::now().date_naive());
    Ok(service)
}

pub fn fetch(settings: &Settings, args: FetchArgs) -> anyhow::Result<()> {
    let store = settings.corpus_store();
    let dir = if args.force {
        store.refresh()?
    } else {
        store.ensure_available()?
    };
    println!("{}", dir.display());
    Ok(())
}

pub fn today(settings: &Settings, args: ShowArgs) -> anyhow::Result<()> {
    let genre = remembered_genre(settings, args.genre.as_deref());
    let mut service = open_service(settings)?;
    let poem = service
        .today_poem(genre.as_deref())
        .ok_or_else(|| anyhow::anyhow!("no poems loaded from corpus"))?;
    print_poem(&poem, args.json)
}

pub fn next(settings: &Settings, args: ShowArgs) -> anyhow::Result<()> {
    let genre = remembered_genre(settings, args.genre.as_deref());
    let mut service = open_service(settings)?;
    let poem = service
        .random_poem(genre.as_deref())
        .ok_or_else(|| anyhow::anyhow!("no poems loaded from corpus"))?;
    print_poem(&poem, args.json)
}

pub fn genres(settings: &Settings) -> anyhow::Result<()> {
    let service = open_service(settings)?;
    for (genre, count) in service.corpus().genres() {
        println!("{genre}\t{count}");
    }
    Ok(())
}

pub fn trigger(settings: &Settings, args: TriggerArgs) -> anyhow::Result<()> {
    let at = match args.at.as_deref() {
        Some(at) => parse_trigger_time(at)?,
        None => settings.trigger_at,
    };
    let genre = remembered_genre(settings, args.genre.as_deref());
    let mut service = open_service(settings)?;
    let mut daily = DailyTrigger::new(at, settings.trigger_state_path());

    loop {
        let now = chrono::Local::now().naive_local();
        match daily.poll(now, &mut service, genre.as_deref()) {
            Some(poem) => print_poem(&poem, args.json)?,
            None if !args.watch && !daily.is_due(now) => {
                tracing::info!(%at, last = ?daily.state().last_triggered, "daily trigger not due");
            }
            None => {}
        }
        if !args.watch {
            return Ok(());
        }
        std::thread::sleep(Duration::from_secs(args.interval_secs.max(1)));
    }
}

fn remembered_genre(settings: &Settings, requested: Option<&str>) -> Option<String> {
    let path = settings.preferences_path();
    let mut prefs = Preferences::load(&path);
    let (genre, changed) = prefs.resolve_genre(requested);
    if changed && let Err(err) = prefs.save(&path) {
        tracing::warn!(%err, "failed to save preferences");
    }
    genre
}

fn print_poem(poem: &Poem, json: bool) -> anyhow::Result<()> {
    if json {
        let out = serde_json::to_string_pretty(poem).context("serialize poem")?;
        println!("{out}");
    } else {
        print!("{}", poem.render());
    }
    Ok(())
}

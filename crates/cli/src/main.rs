mod render;
mod session;

use anyhow::{bail, Context};
use chrono::Utc;
use log::{info, warn};
use loteria_core::{
    Card, CardRepository, Deck, DeckError, DeckManager, ImportMode, RngState, StorageProvider,
    Tabla,
};
use loteria_data::{
    card_name_from_file, default_home, export_filename, export_snapshot, import_snapshot,
    list_images, load_config, load_image_data_uri, snapshot_to_json, AppConfig, KeyValueStorage,
    OfflineCache, RecordStorage, StorageKind, HOME_ENV,
};
use session::{confirm, StdinInput};
use std::path::{Path, PathBuf};

const USAGE: &str = "\
usage: loteria [--home DIR] [--storage key_value|records] [--seed N] <command>

deck:
  list                      show every card
  add <image> [name]        add one card from an image file
  add-dir <dir>             add every image in a directory
  remove <number|name>      delete a card
  renumber                  renumber cards 1..n in deck order
  clear --yes               delete every card

game:
  tabla [--count N]         print random tablas
  print-cards               print a sheet with every card
  draw                      call cards interactively
  play                      mark a tabla interactively

transfer:
  export [path]             write the deck as JSON
  import <path> [--mode replace|merge|append] [--yes]

other:
  stats                     deck size and storage usage
  cache warm|status|clear|restore";

#[derive(Debug, Default)]
struct CliOptions {
    home: Option<PathBuf>,
    storage: Option<StorageKind>,
    seed: Option<u64>,
    mode: ImportMode,
    count: usize,
    yes: bool,
    command: Vec<String>,
}

fn parse_cli_options(args: &[String]) -> CliOptions {
    let mut options = CliOptions {
        count: 1,
        ..CliOptions::default()
    };
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--home" => {
                if let Some(value) = args.get(idx + 1) {
                    options.home = Some(PathBuf::from(value));
                    idx += 1;
                }
            }
            "--storage" => {
                if let Some(value) = args.get(idx + 1) {
                    options.storage = StorageKind::parse(value);
                    if options.storage.is_none() {
                        warn!("unknown storage {value:?}, using the configured one");
                    }
                    idx += 1;
                }
            }
            "--seed" => {
                if let Some(value) = args.get(idx + 1) {
                    options.seed = value.parse::<u64>().ok();
                    idx += 1;
                }
            }
            "--mode" => {
                if let Some(value) = args.get(idx + 1) {
                    match ImportMode::parse(value) {
                        Some(mode) => options.mode = mode,
                        None => warn!("unknown import mode {value:?}, using replace"),
                    }
                    idx += 1;
                }
            }
            "--count" | "-n" => {
                if let Some(value) = args.get(idx + 1) {
                    options.count = value.parse::<usize>().unwrap_or(1).max(1);
                    idx += 1;
                }
            }
            "--yes" | "-y" => options.yes = true,
            "--help" | "-h" => options.command.push("help".to_string()),
            other => options.command.push(other.to_string()),
        }
        idx += 1;
    }
    options
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_cli_options(&args);
    if let Err(err) = run(options).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(options: CliOptions) -> anyhow::Result<()> {
    if options.command.is_empty() || options.command[0] == "help" {
        println!("{USAGE}");
        return Ok(());
    }
    let home = options
        .home
        .clone()
        .or_else(default_home)
        .with_context(|| format!("no home directory; pass --home or set {HOME_ENV}"))?;
    let mut config = load_config(&home)?;
    if let Some(storage) = options.storage {
        config.storage = storage;
    }

    let cache = OfflineCache::new(&config.cache_dir);
    let warm_cache = cache.clone();
    let assets = config.assets.clone();
    tokio::spawn(async move {
        warm_cache.prune_stale().await;
        if !assets.is_empty() {
            warm_cache.warm_up(&assets).await;
        }
    });

    let rng = options
        .seed
        .map_or_else(RngState::from_entropy, RngState::from_seed);
    if let Some(notice) = seed_notice(&options, &rng) {
        info!("{notice}");
        eprintln!("{notice}");
    }
    let app = App {
        config,
        cache,
        options,
    };
    match app.config.storage {
        StorageKind::KeyValue => {
            let provider = KeyValueStorage::new(&app.config.data_dir)
                .with_quota(app.config.quota_bytes);
            app.execute(&provider, rng).await
        }
        StorageKind::Records => {
            let provider = RecordStorage::new(&app.config.data_dir);
            app.execute(&provider, rng).await
        }
    }
}

struct App {
    config: AppConfig,
    cache: OfflineCache,
    options: CliOptions,
}

impl App {
    async fn execute<P: StorageProvider>(&self, provider: &P, rng: RngState) -> anyhow::Result<()> {
        let mut manager = DeckManager::load(provider, rng).await?;
        let command = self.options.command[0].as_str();
        let args = &self.options.command[1..];
        match command {
            "list" | "ls" => print!("{}", render::deck_list(manager.deck())),
            "add" => self.add(&mut manager, args).await?,
            "add-dir" => self.add_dir(&mut manager, args).await?,
            "remove" | "rm" => self.remove(&mut manager, args).await?,
            "renumber" => {
                manager.renumber().await?;
                self.backup(manager.deck()).await;
                println!("Renumbered {} cards", manager.deck().len());
            }
            "clear" => {
                let count = manager.deck().len();
                if !self.options.yes {
                    bail!("refusing to delete all {count} cards without --yes");
                }
                manager.clear().await?;
                self.backup(manager.deck()).await;
                println!("Deleted {count} cards");
            }
            "tabla" => {
                let (deck, rng) = manager.deck_and_rng();
                for n in 1..=self.options.count {
                    let tabla = Tabla::generate(deck, rng)?;
                    print!("{}", render::tabla_grid(&tabla, None, &format!("Tabla {n}")));
                }
            }
            "print-cards" => {
                if manager.deck().is_empty() {
                    println!("No cards available to print. Add some cards first.");
                } else {
                    print!("{}", render::card_sheet(manager.deck()));
                }
            }
            "draw" => {
                let (deck, rng) = manager.deck_and_rng();
                session::run_draw(deck, rng, &mut StdinInput, &mut std::io::stdout())?;
            }
            "play" => {
                let (deck, rng) = manager.deck_and_rng();
                session::run_play(deck, rng, &mut StdinInput, &mut std::io::stdout())?;
            }
            "export" => self.export(manager.deck(), args).await?,
            "import" => self.import(&mut manager, args).await?,
            "stats" => self.stats(&manager).await?,
            "cache" => self.cache_command(&mut manager, args).await?,
            other => bail!("unknown command {other:?}; run `loteria help`"),
        }
        Ok(())
    }

    async fn add<R: CardRepository>(
        &self,
        manager: &mut DeckManager<R>,
        args: &[String],
    ) -> anyhow::Result<()> {
        let Some(path) = args.first().map(PathBuf::from) else {
            bail!("usage: loteria add <image> [name]");
        };
        let image = load_image_data_uri(&path).await?;
        let name = if args.len() > 1 {
            args[1..].join(" ")
        } else {
            card_name_from_file(&path)
        };
        let card = manager.add_card(&name, image).await?;
        self.backup(manager.deck()).await;
        println!("Card {:?} added as #{}", card.name, card.number);
        Ok(())
    }

    async fn add_dir<R: CardRepository>(
        &self,
        manager: &mut DeckManager<R>,
        args: &[String],
    ) -> anyhow::Result<()> {
        let Some(dir) = args.first().map(PathBuf::from) else {
            bail!("usage: loteria add-dir <dir>");
        };
        let images = list_images(&dir).await?;
        if images.is_empty() {
            bail!("no images found in {}", dir.display());
        }
        let mut added = 0usize;
        for path in &images {
            let image = match load_image_data_uri(path).await {
                Ok(image) => image,
                Err(err) => {
                    eprintln!("skipped {}: {err:#}", path.display());
                    continue;
                }
            };
            match manager.add_card(&card_name_from_file(path), image).await {
                Ok(_) => added += 1,
                Err(err @ (DeckError::EmptyName | DeckError::DuplicateName(_))) => {
                    eprintln!("skipped {}: {err}", path.display());
                }
                Err(err) => {
                    if added > 0 {
                        self.backup(manager.deck()).await;
                    }
                    return Err(anyhow::Error::new(err).context(format!(
                        "stopped after adding {added} of {} images",
                        images.len()
                    )));
                }
            }
        }
        if added > 0 {
            self.backup(manager.deck()).await;
        }
        println!("Added {added} of {} images", images.len());
        Ok(())
    }

    async fn remove<R: CardRepository>(
        &self,
        manager: &mut DeckManager<R>,
        args: &[String],
    ) -> anyhow::Result<()> {
        if args.is_empty() {
            bail!("usage: loteria remove <number|name>");
        }
        let target = args.join(" ");
        let deck = manager.deck();
        let card = target
            .parse::<u32>()
            .ok()
            .and_then(|number| deck.find_by_number(number))
            .or_else(|| deck.find_by_name(&target))
            .with_context(|| format!("no card matches {target:?}"))?;
        let id = card.id.clone();
        let removed = manager.remove_card(&id).await?;
        self.backup(manager.deck()).await;
        println!("Deleted #{} {}", removed.number, removed.name);
        Ok(())
    }

    async fn export(&self, deck: &Deck, args: &[String]) -> anyhow::Result<()> {
        if deck.is_empty() {
            bail!("no cards available to export; add some cards first");
        }
        let snapshot = export_snapshot(deck, &self.config.deck_name);
        let json = snapshot_to_json(&snapshot)?;
        let path = match args.first().map(PathBuf::from) {
            Some(path) if path.is_dir() => path.join(export_filename(Utc::now())),
            Some(path) => path,
            None => PathBuf::from(export_filename(Utc::now())),
        };
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        println!(
            "Deck exported successfully! {} cards saved as {}",
            snapshot.card_count,
            path.display()
        );
        Ok(())
    }

    async fn import<R: CardRepository>(
        &self,
        manager: &mut DeckManager<R>,
        args: &[String],
    ) -> anyhow::Result<()> {
        let Some(path) = args.first().map(PathBuf::from) else {
            bail!("usage: loteria import <path> [--mode replace|merge|append] [--yes]");
        };
        if !is_json_file(&path) {
            bail!("{} is not a JSON file", path.display());
        }
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        let imported = import_snapshot(&raw)?;
        print!("{}", render::import_preview(&imported.preview(manager.deck())));

        let mode = self.options.mode;
        let question = format!(
            "Import {} cards using {} mode?",
            imported.cards.len(),
            mode.as_str()
        );
        if !self.options.yes && !confirm(&mut StdinInput, &question) {
            println!("Import cancelled");
            return Ok(());
        }
        let cards = imported.reconcile(manager.deck(), mode);
        manager.replace_all(cards).await?;
        self.backup(manager.deck()).await;
        let mut message = format!(
            "Successfully imported {} cards! Deck now has {} cards.",
            imported.cards.len(),
            manager.deck().len()
        );
        if imported.skipped > 0 {
            message.push_str(&format!(" ({} invalid cards skipped)", imported.skipped));
        }
        println!("{message}");
        Ok(())
    }

    async fn stats<R: CardRepository>(&self, manager: &DeckManager<R>) -> anyhow::Result<()> {
        let usage = manager.usage().await?;
        println!("Cards:   {}", manager.deck().len());
        println!("Storage: {}", render::storage_usage(&usage));
        println!("Data:    {}", self.config.data_dir.display());
        Ok(())
    }

    async fn cache_command<R: CardRepository>(
        &self,
        manager: &mut DeckManager<R>,
        args: &[String],
    ) -> anyhow::Result<()> {
        match args.first().map(String::as_str) {
            Some("warm") => {
                let report = self.cache.warm_up(&self.config.assets).await;
                println!("Cached {} assets", report.cached.len());
                for failed in &report.failed {
                    eprintln!("could not cache {failed}");
                }
            }
            Some("status") | None => print!("{}", render::cache_status(&self.cache.status().await)),
            Some("clear") => {
                if !self.options.yes {
                    bail!("refusing to clear the cache without --yes");
                }
                let removed = self.cache.clear_all().await;
                println!("Removed {removed} caches");
            }
            Some("restore") => {
                let bytes = self
                    .cache
                    .restore_backup()
                    .await
                    .context("no deck backup in the cache")?;
                let cards: Vec<Card> =
                    serde_json::from_slice(&bytes).context("parse deck backup")?;
                let question = format!(
                    "Replace the current {} cards with {} backed up cards?",
                    manager.deck().len(),
                    cards.len()
                );
                if !self.options.yes && !confirm(&mut StdinInput, &question) {
                    println!("Restore cancelled");
                    return Ok(());
                }
                manager.replace_all(cards).await?;
                println!("Restored {} cards", manager.deck().len());
            }
            Some(other) => bail!("unknown cache command {other:?}"),
        }
        Ok(())
    }

    async fn backup(&self, deck: &Deck) {
        match serde_json::to_vec(deck.cards()) {
            Ok(bytes) => {
                self.cache.backup(&bytes).await;
            }
            Err(err) => warn!("deck backup skipped: {err}"),
        }
    }
}

/// Commands that shuffle or mint ids. Their output can be replayed with
/// `--seed`, so an entropy seed is reported for them.
const SEEDED_COMMANDS: [&str; 5] = ["tabla", "draw", "play", "add", "add-dir"];

fn seed_notice(options: &CliOptions, rng: &RngState) -> Option<String> {
    let command = options.command.first()?;
    if options.seed.is_some() || !SEEDED_COMMANDS.contains(&command.as_str()) {
        return None;
    }
    Some(format!("seed {} (replay with --seed {})", rng.seed(), rng.seed()))
}

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
#[path = "../../data/src/test_support.rs"]
mod test_support;

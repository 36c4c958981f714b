mod backend;
mod cache;
mod config;
mod error;
mod geo;
mod retry;
mod service;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use tracing_subscriber::EnvFilter;

use backend::types::{CoordinatePatch, EventInput, PublishedEvent};

#[derive(Parser, Debug)]
#[command(name = "jamhub")]
#[command(about = "Browse and maintain Global Goals Jam event listings")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/jamhub/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List published events
  List {
    /// Group events by continent
    #[arg(long)]
    by_continent: bool,

    /// Override the cache freshness window in seconds
    #[arg(long)]
    max_age_secs: Option<u64>,
  },
  /// Refetch the event listing
  Refresh {
    /// Fetch even while the rate-limit countdown is running
    #[arg(long)]
    force: bool,
  },
  /// Create an event from a YAML file
  Create {
    /// YAML file with the event fields
    file: PathBuf,
  },
  /// Update an event from a YAML file
  Update {
    /// Id of the event to update
    id: String,
    /// YAML file with the event fields
    file: PathBuf,
  },
  /// Apply coordinate corrections from a YAML file
  FixCoords {
    /// YAML file with a list of {id, latitude, longitude} entries
    file: PathBuf,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;

  let client = backend::BackendClient::new(&config)?;
  let max_age = Duration::from_secs(config.cache.max_age_secs);
  let service = service::EventsService::new(client, max_age);

  match args.command {
    Command::List {
      by_continent,
      max_age_secs,
    } => {
      let events = service
        .list_events(max_age_secs.map(Duration::from_secs))
        .await
        .map_err(|e| eyre!("Failed to list events: {}", e))?;

      if by_continent {
        print_by_continent(&events);
      } else {
        for event in events.iter() {
          print_event(event);
        }
      }
    }

    Command::Refresh { force } => {
      let view = service.cache().view();
      if !force && service.cache().retry_countdown_secs() > 0 {
        if let Some(err) = &view.error {
          eprintln!("Last fetch failed: {}", err);
        }
        println!(
          "Rate limited; retry allowed in {}s (use --force to override)",
          view.retry_in_secs
        );
      } else {
        service
          .refresh(force)
          .await
          .map_err(|e| eyre!("Refresh failed: {}", e))?;
        println!("Refreshed {} events", service.cache().view().events.len());
      }
    }

    Command::Create { file } => {
      let input: EventInput = read_yaml(&file)?;
      let created = service
        .create_event(&input)
        .await
        .map_err(|e| eyre!("Failed to create event: {}", e))?;
      println!("Created event {}", created.id);
    }

    Command::Update { id, file } => {
      let input: EventInput = read_yaml(&file)?;
      let updated = service
        .update_event(&id, &input)
        .await
        .map_err(|e| eyre!("Failed to update event {}: {}", id, e))?;
      println!("Updated event {}", updated.id);
    }

    Command::FixCoords { file } => {
      let patches: Vec<CoordinatePatch> = read_yaml(&file)?;

      service
        .fix_coordinates(&patches)
        .await
        .map_err(|e| eyre!("Failed to fix coordinates: {}", e))?;
      println!("Applied {} coordinate corrections", patches.len());
    }
  }

  Ok(())
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  serde_yaml::from_str(&contents).map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))
}

fn print_event(event: &PublishedEvent) {
  println!(
    "{}  [{}]  {}  ({})",
    event.event_date.format("%Y-%m-%d"),
    event.status.as_str(),
    event.title,
    event.location
  );
}

fn print_by_continent(events: &[PublishedEvent]) {
  let mut groups: BTreeMap<String, Vec<&PublishedEvent>> = BTreeMap::new();
  for event in events {
    let key = match geo::continent_for(event) {
      Some(continent) => continent.to_string(),
      None => "Unknown".to_string(),
    };
    groups.entry(key).or_default().push(event);
  }

  for (continent, group) in groups {
    println!("{} ({})", continent, group.len());
    for event in group {
      print!("  ");
      print_event(event);
    }
    println!();
  }
}

//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::client::Client;
use crate::config::{ClientSettings, HubConfig, ServerSettings};
use crate::engine::SyncEngine;
use crate::error::{Error, Result, ResultExt};
use crate::handler::PageHandler;
use crate::reader::MemoryReader;
use crate::state::CursorStore;
use crate::types::PartitionId;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Serve {
                file,
                port,
                path,
                partitions,
                page_size,
                seal,
                concurrent,
            } => {
                let base = config.map(|c| c.server);
                let reader = MemoryReader::from_ndjson_file(file)
                    .await
                    .with_context(|| format!("Failed to load events from {}", file.display()))?;

                // Without a config file or flag, serve every partition the file has
                let inferred = match reader.partitions().await.last() {
                    Some(last) => *last as usize + 1,
                    None => 1,
                };
                let partitions = (*partitions).or_else(|| base.is_none().then_some(inferred));
                let settings = serve_settings(
                    base,
                    ServeOverrides {
                        port: *port,
                        path: path.clone(),
                        partitions,
                        page_size: *page_size,
                        concurrent: *concurrent,
                    },
                );

                if *seal {
                    reader.seal_all().await;
                    for index in 0..settings.handler.partition_count {
                        let partition = PartitionId::try_from(index).map_err(|_| {
                            Error::config(format!("partition {index} out of range"))
                        })?;
                        reader.seal(partition).await;
                    }
                }

                let handler = PageHandler::new(settings.handler.clone())
                    .with_shared_reader(Arc::new(reader));
                crate::cli::serve(handler, &settings.path, settings.port).await
            }
            Commands::Fetch {
                url,
                partition_count,
                partitions,
                state,
                headers,
                page_size_hint,
                follow,
            } => {
                let settings = fetch_settings(
                    config.map(|c| c.client),
                    FetchOverrides {
                        url: url.clone(),
                        partition_count: *partition_count,
                        partitions: partitions.clone(),
                        state: state.clone(),
                        headers: headers.clone(),
                        page_size_hint: *page_size_hint,
                    },
                );
                self.fetch(&settings, *follow).await
            }
            Commands::Cursors { state } => {
                let path = state
                    .clone()
                    .or_else(|| config.and_then(|c| c.client.state_file))
                    .ok_or_else(|| Error::config("State file not specified (use --state)"))?;
                self.cursors(&path).await
            }
        }
    }

    /// Load the configuration file, if one was given
    fn load_config(&self) -> Result<Option<HubConfig>> {
        self.cli
            .config
            .as_ref()
            .map(HubConfig::from_file)
            .transpose()
    }

    /// Follow a feed, writing events to stdout
    async fn fetch(&self, settings: &ClientSettings, follow: bool) -> Result<()> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| Error::config("Feed URL not specified (use --url)"))?;
        let client = Client::with_config(url, settings.partition_count, settings.http_config())?;

        let store = match &settings.state_file {
            Some(path) => CursorStore::from_file(path)?,
            None => CursorStore::in_memory(),
        };

        let mut sync = settings.sync_config();
        if !follow {
            sync = sync.with_max_idle_pages(1);
        }

        let mut engine = SyncEngine::new(client, store).with_config(sync);
        let stdout = std::io::stdout();
        let stats = engine
            .run(|page| {
                let mut out = stdout.lock();
                for event in &page.events {
                    writeln!(out, "{}", serde_json::to_string(event)?)?;
                }
                out.flush()?;
                Ok(())
            })
            .await?;

        tracing::info!(
            events = stats.events_received,
            pages = stats.pages_fetched,
            exhausted = stats.partitions_exhausted,
            duration_ms = stats.duration_ms,
            "Fetch finished"
        );
        Ok(())
    }

    /// Print a cursor table
    async fn cursors(&self, path: &Path) -> Result<()> {
        let store = CursorStore::from_file(path)?;
        println!("{}", store.to_json_pretty().await?);
        Ok(())
    }
}

/// Serve flags that override the configuration file
#[derive(Debug, Default)]
struct ServeOverrides {
    port: Option<u16>,
    path: Option<String>,
    partitions: Option<usize>,
    page_size: Option<usize>,
    concurrent: bool,
}

fn serve_settings(base: Option<ServerSettings>, overrides: ServeOverrides) -> ServerSettings {
    let mut settings = base.unwrap_or_default();
    if let Some(port) = overrides.port {
        settings.port = port;
    }
    if let Some(path) = overrides.path {
        settings.path = path;
    }
    if let Some(count) = overrides.partitions {
        settings.handler.partition_count = count;
    }
    if let Some(size) = overrides.page_size {
        settings.handler.default_page_size = size;
    }
    if overrides.concurrent {
        settings.handler.concurrent = true;
    }
    settings
}

/// Fetch flags that override the configuration file
#[derive(Debug, Default)]
struct FetchOverrides {
    url: Option<String>,
    partition_count: Option<usize>,
    partitions: Vec<u32>,
    state: Option<PathBuf>,
    headers: Option<String>,
    page_size_hint: Option<usize>,
}

fn fetch_settings(base: Option<ClientSettings>, overrides: FetchOverrides) -> ClientSettings {
    let mut settings = base.unwrap_or_default();
    if overrides.url.is_some() {
        settings.url = overrides.url;
    }
    if let Some(count) = overrides.partition_count {
        settings.partition_count = count;
    }
    if !overrides.partitions.is_empty() {
        settings.partitions = overrides.partitions;
    }
    if overrides.state.is_some() {
        settings.state_file = overrides.state;
    }
    if let Some(headers) = overrides.headers {
        settings.headers = headers
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .collect();
    }
    if overrides.page_size_hint.is_some() {
        settings.page_size_hint = overrides.page_size_hint;
    }
    settings
}

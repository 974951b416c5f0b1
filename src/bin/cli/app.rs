use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use studymate_lib::ai::{AiError, StudyAssistant};
use studymate_lib::storage::{FileBackend, KeyValueStore, KnowledgePoint, LearningStore, Topic};
use studymate_lib::sync::{start_debounced_sync, SyncConfig, SyncDebouncer, TableSync};
use studymate_lib::tables::{OpenPlatformClient, DEFAULT_BASE_URL};

/// Shared application state for CLI commands
pub struct App {
    pub data_dir: PathBuf,
    pub backend: Arc<dyn KeyValueStore>,
    pub store: LearningStore,
    offline: bool,
    sync: Option<Arc<SyncDebouncer>>,
}

impl App {
    /// Open the data directory and start background sync when it is configured
    pub fn new(data_dir: Option<PathBuf>, offline: bool) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => FileBackend::default_data_dir().context("Failed to get data directory")?,
        };

        let file_backend = FileBackend::new(data_dir.clone());
        file_backend
            .init()
            .with_context(|| format!("Failed to initialize {}", data_dir.display()))?;
        let backend: Arc<dyn KeyValueStore> = Arc::new(file_backend);

        let mut store = LearningStore::new(backend.clone());
        let sync_config = SyncConfig::load(backend.as_ref()).context("Failed to load sync config")?;
        let sync = if sync_config.is_complete() {
            let delay = sync_config.delay();
            let target = Arc::new(Self::build_table_sync(sync_config)?);
            let debouncer = Arc::new(start_debounced_sync(target, delay));
            store = store.with_notifier(debouncer.clone());
            Some(debouncer)
        } else {
            None
        };

        Ok(Self {
            data_dir,
            backend,
            store,
            offline,
            sync,
        })
    }

    fn build_table_sync(config: SyncConfig) -> Result<TableSync> {
        let api = OpenPlatformClient::new(DEFAULT_BASE_URL)
            .context("Failed to create table API client")?;
        Ok(TableSync::new(Arc::new(api), config))
    }

    /// Sync target for an explicit push; errors when sync is not fully configured
    pub fn table_sync(&self) -> Result<TableSync> {
        let config = SyncConfig::load(self.backend.as_ref()).context("Failed to load sync config")?;
        if !config.is_complete() {
            bail!("Table sync is not configured. Run `config set-sync` with --enabled true and all ids.");
        }
        Self::build_table_sync(config)
    }

    /// The AI front door: heuristics only with `--offline`, otherwise the configured model
    pub fn assistant(&self) -> Result<StudyAssistant> {
        if self.offline {
            return Ok(StudyAssistant::offline());
        }
        match StudyAssistant::from_backend(self.backend.clone()) {
            Ok(assistant) => Ok(assistant),
            Err(AiError::ConfigurationMissing(msg)) => {
                bail!("{}. Configure a provider or pass --offline.", msg)
            }
            Err(e) => Err(e).context("Failed to set up AI provider"),
        }
    }

    /// Push pending sync work before exit
    pub async fn finish(&self) {
        if let Some(sync) = &self.sync {
            sync.shutdown().await;
        }
    }

    /// Find a topic by title (case-insensitive exact, then prefix match)
    pub fn find_topic(&self, name: &str) -> Result<Topic> {
        let data = self.store.get_all().context("Failed to load learning data")?;
        let name_lower = name.trim().to_lowercase();

        if let Some(topic) = data.topics.iter().find(|t| t.title.to_lowercase() == name_lower) {
            return Ok(topic.clone());
        }

        let matches: Vec<&Topic> = data
            .topics
            .iter()
            .filter(|t| t.title.to_lowercase().starts_with(&name_lower))
            .collect();

        match matches.len() {
            0 => bail!(
                "No topic matching '{}'. Available topics:\n{}",
                name,
                data.topics
                    .iter()
                    .map(|t| format!("  - {}", t.title))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
            1 => Ok(matches[0].clone()),
            _ => bail!(
                "Ambiguous topic name '{}'. Matches:\n{}",
                name,
                matches
                    .iter()
                    .map(|t| format!("  - {}", t.title))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }

    /// Find a knowledge point by id, id prefix, or title
    pub fn find_point(&self, key: &str) -> Result<KnowledgePoint> {
        let data = self.store.get_all().context("Failed to load learning data")?;
        let key = key.trim();

        if let Ok(id) = Uuid::parse_str(key) {
            return data
                .knowledge_point(id)
                .cloned()
                .with_context(|| format!("Knowledge point {} not found", id));
        }

        let key_lower = key.to_lowercase();
        // Id prefixes are only tried for hex-looking keys of four or more characters
        let looks_like_id =
            key_lower.len() >= 4 && key_lower.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
        let by_id: Vec<&KnowledgePoint> = if looks_like_id {
            data.knowledge_points
                .iter()
                .filter(|kp| kp.id.to_string().starts_with(&key_lower))
                .collect()
        } else {
            Vec::new()
        };
        let candidates = if by_id.is_empty() {
            let exact: Vec<&KnowledgePoint> = data
                .knowledge_points
                .iter()
                .filter(|kp| kp.title.to_lowercase() == key_lower)
                .collect();
            if exact.is_empty() {
                data.knowledge_points
                    .iter()
                    .filter(|kp| kp.title.to_lowercase().starts_with(&key_lower))
                    .collect()
            } else {
                exact
            }
        } else {
            by_id
        };

        match candidates.len() {
            0 => bail!("No knowledge point matching '{}'", key),
            1 => Ok(candidates[0].clone()),
            _ => bail!(
                "Ambiguous knowledge point '{}'. Matches:\n{}",
                key,
                candidates
                    .iter()
                    .map(|kp| format!("  - {} {}", &kp.id.to_string()[..8], kp.title))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }
}

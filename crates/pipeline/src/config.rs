use std::path::PathBuf;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub graph_db: GraphDbConfig,
    pub model: ModelConfig,
    pub paths: PathsConfig,
    pub upsert: UpsertConfig,
    pub retry: RetryConfig,
    pub concurrency: ConcurrencyConfig,
    /// Write into an in-memory graph instead of Neo4j.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GraphDbConfig {
    pub uri: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub endpoint: String,
    pub credential: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub extension: String,
    pub recursive: bool,
    pub artifact: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct UpsertConfig {
    pub base_entity_label: bool,
    pub include_source: bool,
    pub resume_from: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyConfig {
    pub max_concurrent_extractions: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            graph_db: GraphDbConfig::default(),
            model: ModelConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                credential: None,
                name: "gpt-4o-mini".to_string(),
            },
            paths: PathsConfig {
                input_dir: PathBuf::from("data/raw"),
                extension: "txt".to_string(),
                recursive: false,
                artifact: PathBuf::from(artifact::DEFAULT_ARTIFACT_PATH),
            },
            upsert: UpsertConfig {
                base_entity_label: true,
                include_source: true,
                resume_from: 0,
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
                request_timeout_secs: 60,
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_extractions: 1,
            },
            dry_run: false,
        }
    }
}

impl PipelineConfig {
    /// Read configuration from the process environment, after loading `.env`
    /// if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.graph_db = GraphDbConfig {
            uri: get("NEO4J_URI"),
            user: get("NEO4J_USERNAME"),
            password: get("NEO4J_PASSWORD"),
        };

        if let Some(endpoint) = get("OPENAI_BASE_URL") {
            config.model.endpoint = endpoint;
        }
        config.model.credential = get("OPENAI_API_KEY");
        if let Some(name) = get("OPENAI_MODEL") {
            config.model.name = name;
        }

        if let Some(dir) = get("GRAPH_INPUT_DIR") {
            config.paths.input_dir = PathBuf::from(dir);
        }
        if let Some(extension) = get("GRAPH_INPUT_EXTENSION") {
            config.paths.extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(path) = get("GRAPH_ARTIFACT_PATH") {
            config.paths.artifact = PathBuf::from(path);
        }

        parse_into(&get, "GRAPH_RECURSIVE", parse_bool, &mut config.paths.recursive)?;
        parse_into(&get, "GRAPH_BASE_ENTITY_LABEL", parse_bool, &mut config.upsert.base_entity_label)?;
        parse_into(&get, "GRAPH_INCLUDE_SOURCE", parse_bool, &mut config.upsert.include_source)?;
        parse_into(&get, "GRAPH_RESUME_FROM", parse_number, &mut config.upsert.resume_from)?;
        parse_into(&get, "GRAPH_MAX_RETRIES", parse_number, &mut config.retry.max_retries)?;
        parse_into(&get, "GRAPH_REQUEST_TIMEOUT_SECS", parse_number, &mut config.retry.request_timeout_secs)?;
        parse_into(
            &get,
            "GRAPH_MAX_CONCURRENT_EXTRACTIONS",
            parse_number,
            &mut config.concurrency.max_concurrent_extractions,
        )?;
        parse_into(&get, "GRAPH_DRY_RUN", parse_bool, &mut config.dry_run)?;

        if config.concurrency.max_concurrent_extractions == 0 {
            return Err(ConfigError::Invalid {
                var: "GRAPH_MAX_CONCURRENT_EXTRACTIONS",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }

    /// Connection settings for the graph database: (uri, user, password).
    pub fn require_graph_db(&self) -> Result<(&str, &str, &str), ConfigError> {
        let uri = self.graph_db.uri.as_deref().ok_or(ConfigError::Missing("NEO4J_URI"))?;
        let user = self.graph_db.user.as_deref().ok_or(ConfigError::Missing("NEO4J_USERNAME"))?;
        let password = self
            .graph_db
            .password
            .as_deref()
            .ok_or(ConfigError::Missing("NEO4J_PASSWORD"))?;
        Ok((uri, user, password))
    }

    pub fn require_model(&self) -> Result<&str, ConfigError> {
        self.model
            .credential
            .as_deref()
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))
    }
}

fn parse_into<G, P, T>(get: &G, var: &'static str, parse: P, target: &mut T) -> Result<(), ConfigError>
where
    G: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    if let Some(value) = get(var) {
        *target = parse(value.trim()).ok_or(ConfigError::Invalid { var, value })?;
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Option<T> {
    value.parse().ok()
}

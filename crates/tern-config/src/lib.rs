//! Compiler options and tracing setup for the Tern lookup engine.

use std::path::Path;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

/// Language release the sources are compiled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLevel(pub u16);

impl SourceLevel {
    pub const JAVA_8: SourceLevel = SourceLevel(8);
    pub const JAVA_9: SourceLevel = SourceLevel(9);
    pub const JAVA_16: SourceLevel = SourceLevel(16);
    pub const JAVA_17: SourceLevel = SourceLevel(17);

    pub fn supports_modules(self) -> bool {
        self >= Self::JAVA_9
    }

    pub fn supports_records(self) -> bool {
        self >= Self::JAVA_16
    }
}

impl Default for SourceLevel {
    fn default() -> Self {
        Self::JAVA_17
    }
}

/// Qualified names of the annotation types that carry nullness information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NullnessAnnotations {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "NullnessAnnotations::default_non_null")]
    pub non_null: String,
    #[serde(default = "NullnessAnnotations::default_nullable")]
    pub nullable: String,
}

impl NullnessAnnotations {
    fn default_non_null() -> String {
        "org.eclipse.jdt.annotation.NonNull".to_owned()
    }

    fn default_nullable() -> String {
        "org.eclipse.jdt.annotation.Nullable".to_owned()
    }

    /// Whether `qualified_name` (dotted) is one of the configured nullness annotations.
    pub fn is_nullness_annotation(&self, qualified_name: &str) -> bool {
        self.enabled && (qualified_name == self.non_null || qualified_name == self.nullable)
    }
}

impl Default for NullnessAnnotations {
    fn default() -> Self {
        Self {
            enabled: false,
            non_null: Self::default_non_null(),
            nullable: Self::default_nullable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// The effective filter: the configured level merged with `RUST_LOG` when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

/// Options that change how names resolve and which bindings get built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerOptions {
    /// Resolve through module descriptors. Ignored below release 9.
    #[serde(default = "CompilerOptions::default_true")]
    pub use_module_system: bool,

    /// Intern type annotations as part of a binding's identity.
    #[serde(default)]
    pub annotated_type_system: bool,

    #[serde(default)]
    pub source_level: SourceLevel,

    /// Keep declaration annotations on binary bindings.
    #[serde(default)]
    pub store_annotations: bool,

    /// Run annotation processing; implies `store_annotations`.
    #[serde(default)]
    pub process_annotations: bool,

    #[serde(default)]
    pub nullness: NullnessAnnotations,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CompilerOptions {
    fn default_true() -> bool {
        true
    }

    /// Whether module descriptors participate in lookup.
    pub fn uses_module_system(&self) -> bool {
        self.use_module_system && self.source_level.supports_modules()
    }

    /// Whether binary declaration annotations are resolved and kept.
    pub fn stores_annotations(&self) -> bool {
        self.store_annotations || self.process_annotations
    }

    /// Type annotations take part in identity when either explicitly enabled or
    /// required for nullness analysis.
    pub fn uses_annotated_type_system(&self) -> bool {
        self.annotated_type_system || self.nullness.enabled
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load options from a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let options = Self::from_toml_str(&text)?;
        if options.use_module_system && !options.source_level.supports_modules() {
            tracing::warn!(
                target: "tern.config",
                path = %path.display(),
                source_level = options.source_level.0,
                "module system requested below release 9; modules will be ignored"
            );
        }
        Ok(options)
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            use_module_system: true,
            annotated_type_system: false,
            source_level: SourceLevel::default(),
            store_annotations: false,
            process_annotations: false,
            nullness: NullnessAnnotations::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // Keep only the message; the default `Display` embeds a source snippet.
        ConfigError::Toml(err.message().to_owned())
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the global tracing subscriber. Later calls are no-ops.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let fmt_layer = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!(target: "tern.config", level = %config.level, "tracing initialized");
        }
    });
}

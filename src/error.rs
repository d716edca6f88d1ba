use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // Registration errors
    #[error("Plugin already exists: {0}")]
    DuplicatePlugin(String),

    #[error("Missing dependency: plugin {plugin} depends on {dependency} which is not registered")]
    MissingDependency { plugin: String, dependency: String },

    #[error("Circular dependency: {0}")]
    CircularDependency(String),

    #[error("Registration aborted after {} plugin(s) succeeded: {source}", registered.len())]
    PartialRegistration {
        registered: Vec<String>,
        #[source]
        source: Box<Error>,
    },

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    // Initialization errors
    #[error("Invalid configuration for plugin {plugin}: {}", errors.join("; "))]
    ConfigValidation {
        plugin: String,
        errors: Vec<String>,
        initialized: Vec<String>,
    },

    #[error("Plugin {plugin} failed to initialize: {message}")]
    Initialization {
        plugin: String,
        message: String,
        initialized: Vec<String>,
    },

    #[error("Plugin execution error: {0}")]
    PluginExecution(String),

    #[error("Plugin cleanup error: {0}")]
    Cleanup(String),
}

impl Error {
    /// Duplicate names and missing dependencies, the errors that reject a
    /// single registration call.
    pub fn is_registration_error(&self) -> bool {
        match self {
            Error::DuplicatePlugin(_) | Error::MissingDependency { .. } => true,
            Error::PartialRegistration { source, .. } => source.is_registration_error(),
            _ => false,
        }
    }

    /// Names of the plugins that completed before a fail-fast batch
    /// operation stopped.
    pub fn completed_plugins(&self) -> &[String] {
        match self {
            Error::PartialRegistration { registered, .. } => registered,
            Error::ConfigValidation { initialized, .. } => initialized,
            Error::Initialization { initialized, .. } => initialized,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

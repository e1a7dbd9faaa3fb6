pub mod cli;
pub mod toml_config;

pub use cli::ServerArgs;
pub use toml_config::TomlConfig;

use crate::domain::model::ContextId;
use crate::utils::error::Result;
use crate::utils::validation::Validate;

/// 命令列覆蓋 TOML 之後的最終設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub verbose: bool,
    pub json_logs: bool,
    pub request_scoped: bool,
    pub context_id: Option<ContextId>,
}

impl ServerConfig {
    pub fn load(args: &ServerArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        Self::merge(file, args)
    }

    pub fn merge(file: TomlConfig, args: &ServerArgs) -> Result<Self> {
        file.validate()?;

        let config = Self {
            host: args.host.clone().unwrap_or_else(|| file.server.host.clone()),
            port: args.port.unwrap_or(file.server.port),
            verbose: args.verbose || file.logging.verbose.unwrap_or(false),
            json_logs: args.json_logs || file.logging.json.unwrap_or(false),
            request_scoped: file.request_scoped(),
            context_id: file.transform.context_id.map(ContextId::from_raw),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        crate::utils::validation::validate_host("host", &self.host)?;
        crate::utils::validation::validate_range("port", self.port, 1, u16::MAX)
    }
}

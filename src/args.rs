use crate::config::Config;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Path to a config.toml file
    #[arg(short = 'c', long, value_name = "PATH", env = "MATCHER_CONFIG")]
    pub config: Option<PathBuf>,
    /// Base URL of the matcher backend (http://host:port/)
    #[arg(long = "backend", alias = "url", value_name = "URL", env = "MATCHER_BACKEND")]
    pub backend: Option<String>,
    /// Directory for log files
    #[arg(long, value_name = "DIR", env = "MATCHER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl CommonArgs {
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone()
    }

    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(backend) = &self.backend {
            config.backend_url = backend.clone();
        }

        if let Some(log_dir) = &self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let args = CommonArgs {
            config: None,
            backend: Some("http://matcher:9000/".into()),
            log_dir: Some(PathBuf::from("/tmp/matcher-logs")),
        };
        let mut config = Config::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.backend_url, "http://matcher:9000/");
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/matcher-logs"));
    }

    #[test]
    fn absent_overrides_keep_config() {
        let args = CommonArgs {
            config: None,
            backend: None,
            log_dir: None,
        };
        let mut config = Config::default();
        args.apply_overrides(&mut config);
        assert_eq!(config, Config::default());
    }
}

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "data";

/// Runtime settings. The business configuration itself lives in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("SALON_DATA_DIR")
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let port = lookup("SALON_PORT")
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        Settings {
            data_dir: PathBuf::from(data_dir),
            port,
        }
    }

    /// `web [port]`: a port given on the command line wins over the environment.
    pub fn with_port_arg(mut self, arg: Option<&String>) -> Self {
        if let Some(port) = arg.and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
        self
    }
}

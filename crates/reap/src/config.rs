use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use once_cell::sync::Lazy;
use serde::Deserialize;

pub const DEFAULT_REFRESH_SECS: u64 = 2;
pub const FALLBACK_COLOR: &str = "dim";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Pink,
    Serious,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Port,
    Pid,
    Process,
    User,
    Memory,
    Uptime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// seconds between rescans.
    pub refresh_interval: u64,
    pub show_system: bool,
    pub theme: Theme,
    pub sort_by: SortField,
    /// port number (as a string key) → color name.
    pub port_colors: HashMap<String, String>,
    /// port number (as a string key) → short label.
    pub port_labels: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_SECS,
            show_system: false,
            theme: Theme::default(),
            sort_by: SortField::default(),
            port_colors: HashMap::new(),
            port_labels: HashMap::new(),
        }
    }
}

static DEFAULT_PORT_COLORS: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    let groups: [(&[u16], &str); 7] = [
        (&[3000, 3001, 4200, 5173, 8080], "green"),
        (&[4000, 5000, 8000, 8081, 9000], "yellow"),
        (&[5001, 5174, 5175], "cyan"),
        (&[5432], "magenta"),
        (&[6379], "red"),
        (&[3306, 27017], "blue"),
        (&[80, 443], "white"),
    ];
    groups
        .iter()
        .flat_map(|(ports, color)| ports.iter().map(move |port| (*port, *color)))
        .collect()
});

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("reap").join("config.toml"))
    }

    /// Loads the user config, falling back to defaults when the file is
    /// missing or malformed.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Self::default(),
            },
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                log::debug!("no config at {}: {}", path.display(), err);
                return Self::default();
            }
        };

        Self::parse(&content).unwrap_or_else(|err| {
            log::warn!("ignoring malformed config {}: {}", path.display(), err);
            Self::default()
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;
        if config.refresh_interval < 1 {
            config.refresh_interval = DEFAULT_REFRESH_SECS;
        }
        Ok(config)
    }

    /// User overrides first, then the built-in table, then `dim`.
    pub fn port_color(&self, port: u16) -> &str {
        if let Some(color) = self.port_colors.get(&port.to_string()) {
            return color;
        }
        DEFAULT_PORT_COLORS
            .get(&port)
            .copied()
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn port_label(&self, port: u16) -> Option<&str> {
        self.port_labels.get(&port.to_string()).map(String::as_str)
    }
}

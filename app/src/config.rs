use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: String,
    pub library_path: PathBuf,
    pub data_path: PathBuf,
    pub viewport_width: f32,
}

#[derive(Debug, Default)]
pub struct AppConfigOverrides {
    pub log_level: Option<String>,
    pub library_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub viewport_width: Option<f32>,
}

fn default_data_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".photosweep")
}

fn default_library_path() -> PathBuf {
    dirs::picture_dir().unwrap_or_else(|| PathBuf::from("Pictures"))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            library_path: default_library_path(),
            data_path: default_data_path(),
            viewport_width: 390.0,
        }
    }
}

impl AppConfig {
    pub fn default_config_path() -> PathBuf {
        default_data_path().join("config")
    }

    pub fn load_from(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(Self::default_config_path);
        let defaults = Self::default();
        let cfg = config::Config::builder()
            .add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .build()
            .unwrap_or_else(|e| {
                eprintln!("Ignoring unreadable config {}: {}", path.display(), e);
                config::Config::default()
            });

        let log_level = cfg.get_string("log_level").unwrap_or(defaults.log_level);
        let library_path = cfg
            .get_string("library_path")
            .map(PathBuf::from)
            .unwrap_or(defaults.library_path);
        let data_path = cfg
            .get_string("data_path")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);
        let viewport_width = cfg
            .get_float("viewport_width")
            .map(|w| w as f32)
            .unwrap_or(defaults.viewport_width);

        Self {
            log_level,
            library_path,
            data_path,
            viewport_width,
        }
    }

    pub fn apply_overrides(mut self, ov: &AppConfigOverrides) -> Self {
        if let Some(l) = &ov.log_level {
            self.log_level = l.clone();
        }
        if let Some(p) = &ov.library_path {
            self.library_path = p.clone();
        }
        if let Some(p) = &ov.data_path {
            self.data_path = p.clone();
        }
        if let Some(w) = ov.viewport_width {
            self.viewport_width = w;
        }
        self
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, data)
    }

    pub fn preferences_db(&self) -> PathBuf {
        self.data_path.join("preferences.sqlite")
    }
}

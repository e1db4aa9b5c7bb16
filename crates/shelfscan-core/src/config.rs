use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/shelfscan/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub metadata: MetadataConfig,
    pub extraction: ExtractionConfig,
    pub capture: CaptureConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub database_path: String,
}

/// Remote bibliographic provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Whole-request timeout. Expiry is treated as "no metadata".
    pub timeout_secs: u64,
    pub min_interval_ms: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub max_pdf_pages: u32,
    pub dpi: u32,
    pub pdftoppm_command: String,
    pub tesseract_command: String,
    pub ocr_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub interval_ms: u64,
    /// Program and arguments that write one PNG frame to stdout.
    pub camera_command: Vec<String>,
    pub zbar_command: String,
    /// Stored as the record path for books catalogued from the camera.
    pub source_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub books_directory: String,
    pub recursive: bool,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CatalogConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("shelfscan");
        Self {
            database_path: data_dir.join("catalog.db").to_string_lossy().to_string(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://openlibrary.org".to_string(),
            timeout_secs: 10,
            min_interval_ms: 500,
            max_retries: 2,
            user_agent: concat!("shelfscan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pdf_pages: 10,
            dpi: 200,
            pdftoppm_command: "pdftoppm".to_string(),
            tesseract_command: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            camera_command: ["fswebcam", "-q", "--no-banner", "--png", "0", "-"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
            zbar_command: "zbarimg".to_string(),
            source_label: "camera".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Self {
            books_directory: home.join("Books").to_string_lossy().to_string(),
            recursive: true,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/shelfscan/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SHELFSCAN_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("shelfscan")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = Self::load_from(&path)?;
        if let Ok(db) = std::env::var("SHELFSCAN_DB") {
            config.catalog.database_path = db;
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.catalog.database_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.extraction.max_pdf_pages, 10);
        assert_eq!(cfg.metadata.base_url, "https://openlibrary.org");
        assert!(cfg.metadata.timeout_secs > 0);
        assert!(cfg.database_path().to_string_lossy().ends_with("catalog.db"));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.capture.interval_ms = 250;
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.capture.interval_ms, 250);
        assert_eq!(loaded.capture.camera_command, cfg.capture.camera_command);
        assert_eq!(loaded.catalog.database_path, cfg.catalog.database_path);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[extraction]\nmax_pdf_pages = 3\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.extraction.max_pdf_pages, 3);
        assert_eq!(loaded.extraction.dpi, 200);
        assert!(loaded.metadata.enabled);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_shelfscan_config.toml")).unwrap();
        assert_eq!(cfg.capture.zbar_command, "zbarimg");
    }
}

//! Service configuration.
//!
//! Everything is read from the environment once at startup (after `dotenvy` has
//! loaded `.env`). Parsing goes through a key lookup so tests never touch the
//! real process environment.

use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;

/// Top-level configuration handed to the HTTP surface and the record store.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `host:port`; the host may be a name, resolved when the listener binds.
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub store: StoreConfig,
    pub ocr: OcrConfig,
    pub raster: RasterConfig,
}

/// Which record store backs `/upload` and `/files`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Supabase {
        url: String,
        service_role_key: String,
        schema: String,
        table: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub tesseract_bin: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterConfig {
    pub pdftoppm_bin: String,
    pub dpi: u32,
    /// Longest page edge in pixels, passed as `-scale-to`.
    pub scale_to: Option<u32>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(get("PORT"), "PORT", 5000)?;
        let bind_addr = format!("{}:{}", host.trim(), port);

        let upload_dir = PathBuf::from(get("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()));
        let max_upload_bytes = parse_or(get("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES", 100 * 1024 * 1024)?;

        let backend = get("RECORD_STORE").unwrap_or_else(|| {
            if get("SUPABASE_URL").is_some() {
                "supabase".to_string()
            } else {
                "memory".to_string()
            }
        });

        let store = match backend.as_str() {
            "memory" => StoreConfig::Memory,
            "supabase" => StoreConfig::Supabase {
                url: get("SUPABASE_URL")
                    .ok_or_else(|| anyhow!("SUPABASE_URL not set"))?
                    .trim_end_matches('/')
                    .to_string(),
                service_role_key: get("SUPABASE_SERVICE_ROLE_KEY")
                    .ok_or_else(|| anyhow!("SUPABASE_SERVICE_ROLE_KEY not set"))?,
                schema: get("SUPABASE_SCHEMA").unwrap_or_else(|| "public".to_string()),
                table: get("SUPABASE_TABLE").unwrap_or_else(|| "files".to_string()),
            },
            other => bail!("Unknown RECORD_STORE: {} (expected memory or supabase)", other),
        };

        let ocr = OcrConfig {
            tesseract_bin: get("TESSERACT_BIN").unwrap_or_else(|| "tesseract".to_string()),
            language: get("OCR_LANGUAGE").unwrap_or_else(|| "eng".to_string()),
        };

        let raster = RasterConfig {
            pdftoppm_bin: get("PDFTOPPM_BIN").unwrap_or_else(|| "pdftoppm".to_string()),
            dpi: parse_or(get("RASTER_DPI"), "RASTER_DPI", 300)?,
            scale_to: get("RASTER_SCALE_TO")
                .map(|v| v.parse().with_context(|| format!("Invalid RASTER_SCALE_TO: {}", v)))
                .transpose()?,
        };

        Ok(Self {
            bind_addr,
            upload_dir,
            max_upload_bytes,
            store,
            ocr,
            raster,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, v)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.raster.dpi, 300);
        assert_eq!(config.raster.scale_to, None);
    }

    #[test]
    fn test_supabase_selected_when_url_present() {
        let config = load(&[
            ("SUPABASE_URL", "https://db.example.com/"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Supabase {
                url: "https://db.example.com".to_string(),
                service_role_key: "secret".to_string(),
                schema: "public".to_string(),
                table: "files".to_string(),
            }
        );
    }

    #[test]
    fn test_supabase_requires_key() {
        let err = load(&[("RECORD_STORE", "supabase"), ("SUPABASE_URL", "http://x")]).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_SERVICE_ROLE_KEY"));
    }

    #[test]
    fn test_explicit_memory_overrides_supabase_url() {
        let config = load(&[("RECORD_STORE", "memory"), ("SUPABASE_URL", "http://x")]).unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(load(&[("PORT", "eighty")]).is_err());
        assert!(load(&[("RASTER_DPI", "-1")]).is_err());
        assert!(load(&[("RECORD_STORE", "mongo")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("UPLOAD_DIR", "/tmp/scratch"),
            ("OCR_LANGUAGE", "por"),
            ("RASTER_SCALE_TO", "1000"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/scratch"));
        assert_eq!(config.ocr.language, "por");
        assert_eq!(config.raster.scale_to, Some(1000));
    }

    #[test]
    fn test_host_may_be_a_name() {
        let config = load(&[("HOST", "localhost"), ("PORT", "7000")]).unwrap();
        assert_eq!(config.bind_addr, "localhost:7000");
    }
}

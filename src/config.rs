//! Explicit configuration values passed into each operation

use crate::types::{Beam, BoundingBox, SimError, SimResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// OpenAltimetry level-3A endpoint
pub const DEFAULT_BASE_URL: &str = "https://openaltimetry.org/data/api/icesat2/level3a";

/// Nodata sentinel written outside polygons when clipping
pub const CLIP_NODATA: f64 = -9999.0;

/// Load any configuration value from a JSON file
pub fn from_json_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> SimResult<T> {
    log::debug!("Loading configuration from: {}", path.as_ref().display());
    let text = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&text)?)
}

/// OpenAltimetry request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_beams")]
    pub beams: Vec<Beam>,
    /// Region of interest in geodetic lon/lat
    pub bbox: BoundingBox,
    #[serde(default = "default_product")]
    pub product: String,
    /// Request timeout; `None` waits indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_beams() -> Vec<Beam> {
    Beam::ALL.to_vec()
}

fn default_product() -> String {
    "atl06".to_string()
}

impl ApiConfig {
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            base_url: default_base_url(),
            beams: default_beams(),
            bbox,
            product: default_product(),
            timeout_secs: None,
        }
    }
}

/// Settings for the ATL06 extraction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// EPSG code the reduced x/y coordinates are projected into
    pub target_epsg: u32,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Optional lon/lat region of interest
    #[serde(default)]
    pub region: Option<BoundingBox>,
    /// Segment-difference tolerance in meters
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_tolerance() -> f64 {
    crate::core::segment_filter::DEFAULT_TOLERANCE
}

impl ExtractionConfig {
    pub fn new(target_epsg: u32) -> Self {
        Self {
            target_epsg,
            output_dir: default_output_dir(),
            region: None,
            tolerance: default_tolerance(),
        }
    }

    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_region(mut self, region: BoundingBox) -> Self {
        self.region = Some(region);
        self
    }
}

/// Polygon masking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    /// "clip" or "sign"; required
    #[serde(default)]
    pub method: Option<String>,
}

impl MaskConfig {
    pub fn new(method: &str) -> Self {
        Self { method: Some(method.to_string()) }
    }

    pub fn method(&self) -> SimResult<&str> {
        self.method
            .as_deref()
            .ok_or_else(|| SimError::Config("masking method keyword is required".to_string()))
    }
}

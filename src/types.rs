use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// EPSG code of geodetic longitude/latitude (WGS 84)
pub const EPSG_GEODETIC: u32 = 4326;

/// ATL06 ground track (beam) identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Beam {
    Gt1l,
    Gt1r,
    Gt2l,
    Gt2r,
    Gt3l,
    Gt3r,
}

impl Beam {
    /// All six beams, in the order they are processed
    pub const ALL: [Beam; 6] = [
        Beam::Gt1l,
        Beam::Gt1r,
        Beam::Gt2l,
        Beam::Gt2r,
        Beam::Gt3l,
        Beam::Gt3r,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Beam::Gt1l => "gt1l",
            Beam::Gt1r => "gt1r",
            Beam::Gt2l => "gt2l",
            Beam::Gt2r => "gt2r",
            Beam::Gt3l => "gt3l",
            Beam::Gt3r => "gt3r",
        }
    }
}

impl std::fmt::Display for Beam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Beam {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim_start_matches('/').to_lowercase();
        Beam::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == name)
            .ok_or_else(|| SimError::InvalidFormat(format!("Unknown beam: {}", s)))
    }
}

/// Axis-aligned bounding box in a stated spatial reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub epsg: u32,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, epsg: u32) -> SimResult<Self> {
        if !(min_x <= max_x && min_y <= max_y) {
            return Err(SimError::Processing(format!(
                "Invalid bounding box: ({}, {}, {}, {})",
                min_x, min_y, max_x, max_y
            )));
        }
        Ok(Self { min_x, min_y, max_x, max_y, epsg })
    }

    /// Bounding box of a set of coordinates, `None` for empty input
    pub fn from_points(x: &[f64], y: &[f64], epsg: u32) -> Option<Self> {
        if x.is_empty() || y.is_empty() {
            return None;
        }
        let (min_x, max_x) = min_max(x);
        let (min_y, max_y) = min_max(y);
        Some(Self { min_x, min_y, max_x, max_y, epsg })
    }

    /// Inclusive containment test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Corners in counter-clockwise order starting at (min_x, min_y)
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ]
    }

    /// (min_x, min_y, max_x, max_y)
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

pub(crate) fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

/// Affine geotransform (GDAL coefficient order)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    pub fn is_north_up(&self) -> bool {
        self.rotation_x == 0.0 && self.rotation_y == 0.0
    }

    /// World coordinate of a (fractional) pixel position
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.top_left_x + col * self.pixel_width + row * self.rotation_x,
            self.top_left_y + col * self.rotation_y + row * self.pixel_height,
        )
    }

    /// Fractional (col, row) of a world coordinate; only valid for north-up transforms
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.top_left_x) / self.pixel_width,
            (y - self.top_left_y) / self.pixel_height,
        )
    }
}

/// Column table of points with mandatory `x`/`y` columns
#[derive(Debug, Clone, Default)]
pub struct PointSet {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    columns: BTreeMap<String, Array1<f64>>,
}

impl PointSet {
    pub fn new(x: Array1<f64>, y: Array1<f64>) -> SimResult<Self> {
        if x.len() != y.len() {
            return Err(SimError::LengthMismatch {
                field: "y".to_string(),
                expected: x.len(),
                actual: y.len(),
            });
        }
        Ok(Self { x, y, columns: BTreeMap::new() })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Attach (or replace) a named column
    pub fn add_column(&mut self, name: &str, values: Array1<f64>) -> SimResult<()> {
        if values.len() != self.len() {
            return Err(SimError::LengthMismatch {
                field: name.to_string(),
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    pub fn with_column(mut self, name: &str, values: Array1<f64>) -> SimResult<Self> {
        self.add_column(name, values)?;
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&Array1<f64>> {
        match name {
            "x" => Some(&self.x),
            "y" => Some(&self.y),
            _ => self.columns.get(name),
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }
}

/// One row of a DEM vs. altimetry comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub x: f64,
    pub y: f64,
    pub dem_elev: f64,
    pub is2_elev: f64,
    /// dem_elev - is2_elev
    pub diff: f64,
}

/// Error types for simlib operations
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Invalid projection EPSG:{epsg}: {reason}")]
    InvalidProjection { epsg: u32, reason: String },

    #[error("Missing field {field} in beam {beam}")]
    MissingField { beam: String, field: String },

    #[error("Length mismatch for {field}: expected {expected}, got {actual}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for simlib operations
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_beam_parsing() {
        assert_eq!("gt2r".parse::<Beam>().unwrap(), Beam::Gt2r);
        assert_eq!("/GT1L".parse::<Beam>().unwrap(), Beam::Gt1l);
        assert!("gt4l".parse::<Beam>().is_err());
        assert_eq!(Beam::ALL.len(), 6);
    }

    #[test]
    fn test_bounding_box_invariant() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0, 3413).is_ok());
        assert!(BoundingBox::new(2.0, 0.0, 1.0, 1.0, 3413).is_err());

        let bbox = BoundingBox::from_points(&[3.0, -1.0, 2.0], &[5.0, 7.0, 6.0], 3031).unwrap();
        assert_eq!(bbox.as_tuple(), (-1.0, 5.0, 3.0, 7.0));
        assert!(bbox.contains(-1.0, 7.0));
        assert!(!bbox.contains(3.1, 6.0));
    }

    #[test]
    fn test_geotransform_inverse() {
        let gt = GeoTransform::from_gdal([100.0, 10.0, 0.0, 500.0, 0.0, -10.0]);
        let (x, y) = gt.pixel_to_world(2.5, 3.5);
        assert_eq!((x, y), (125.0, 465.0));
        assert_eq!(gt.world_to_pixel(x, y), (2.5, 3.5));
    }

    #[test]
    fn test_point_set_columns() {
        let mut points = PointSet::new(array![0.0, 1.0], array![2.0, 3.0]).unwrap();
        points.add_column("h", array![10.0, 11.0]).unwrap();
        assert_eq!(points.column("h").unwrap()[1], 11.0);
        assert_eq!(points.column("x").unwrap()[0], 0.0);
        assert!(points.add_column("bad", array![1.0]).is_err());
        assert!(PointSet::new(array![0.0], Array1::from(Vec::new())).is_err());
    }
}

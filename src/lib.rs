//! simlib: ICESat-2 ATL06 extraction and reference DEM comparison
//!
//! This library splits ATL06 land-ice granules into quality-filtered per-beam
//! files, loads reference DEMs for point sampling and polygon masking, and
//! queries the OpenAltimetry API for along-track elevations.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{Beam, BoundingBox, ComparisonRow, GeoTransform, PointSet, SimError, SimResult};
pub use config::{ApiConfig, ExtractionConfig, MaskConfig};

pub use io::{ReferenceDem, OpenAltimetryClient, file_meta, points_in_polygon, read_h5};
pub use core::{
    gps2dyr, orbit_type, read_atl06, segment_diff_filter, transform_coord,
    Atl06Extractor, CoordinateTransformer,
};

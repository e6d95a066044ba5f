//! I/O modules for ATL06 granules, reference DEMs, polygon files and the OpenAltimetry API

pub mod atl06;
pub mod dem;
pub mod polygon;
pub mod icesat_api;

pub use atl06::{read_beam, read_h5, write_reduced_beam, BeamData, BeamRead, LandIceSegments, ReducedBeam};
pub use dem::{MaskMethod, ReferenceDem, SampleMethod};
pub use polygon::{load_polygons, points_in_polygon, PolygonIndex};
pub use icesat_api::{file_meta, ApiPoint, FileMeta, OpenAltimetryClient};

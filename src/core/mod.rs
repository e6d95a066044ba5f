//! Core ATL06 processing modules

pub mod transform;
pub mod time;
pub mod track;
pub mod segment_filter;
pub mod pipeline;

// Re-export main types
pub use transform::{transform_coord, CoordinateTransformer};
pub use time::{gps2dyr, gps_to_decimal_year};
pub use track::orbit_type;
pub use segment_filter::segment_diff_filter;
pub use pipeline::{read_atl06, Atl06Extractor, BeamOutcome, BeamReport};

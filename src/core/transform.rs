use crate::types::{SimError, SimResult};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use ndarray::Array1;

/// Converts coordinates between two EPSG spatial references.
///
/// Both references use traditional GIS axis order, so geodetic input is
/// (longitude, latitude) and projected input is (easting, northing).
pub struct CoordinateTransformer {
    src_epsg: u32,
    dst_epsg: u32,
    transform: Option<CoordTransform>,
}

impl CoordinateTransformer {
    pub fn new(src_epsg: u32, dst_epsg: u32) -> SimResult<Self> {
        let src = spatial_ref(src_epsg)?;
        let dst = spatial_ref(dst_epsg)?;

        let transform = if src_epsg == dst_epsg {
            None
        } else {
            let ct = CoordTransform::new(&src, &dst).map_err(|e| SimError::InvalidProjection {
                epsg: dst_epsg,
                reason: e.to_string(),
            })?;
            Some(ct)
        };

        Ok(Self { src_epsg, dst_epsg, transform })
    }

    pub fn src_epsg(&self) -> u32 {
        self.src_epsg
    }

    pub fn dst_epsg(&self) -> u32 {
        self.dst_epsg
    }

    /// Transform equal-length coordinate arrays, preserving order
    pub fn transform(&self, x: &[f64], y: &[f64]) -> SimResult<(Array1<f64>, Array1<f64>)> {
        if x.len() != y.len() {
            return Err(SimError::LengthMismatch {
                field: "y".to_string(),
                expected: x.len(),
                actual: y.len(),
            });
        }

        let mut tx = x.to_vec();
        let mut ty = y.to_vec();

        if let Some(ct) = &self.transform {
            if !tx.is_empty() {
                let mut tz: [f64; 0] = [];
                ct.transform_coords(&mut tx, &mut ty, &mut tz)?;
            }
        }

        Ok((Array1::from(tx), Array1::from(ty)))
    }

    pub fn transform_point(&self, x: f64, y: f64) -> SimResult<(f64, f64)> {
        let (tx, ty) = self.transform(&[x], &[y])?;
        Ok((tx[0], ty[0]))
    }
}

/// Build an EPSG spatial reference with traditional GIS axis order
pub fn spatial_ref(epsg: u32) -> SimResult<SpatialRef> {
    let srs = SpatialRef::from_epsg(epsg).map_err(|e| SimError::InvalidProjection {
        epsg,
        reason: e.to_string(),
    })?;
    srs.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
    Ok(srs)
}

/// Transform coordinates from `src_epsg` to `dst_epsg`.
///
/// Common codes: geodetic lon/lat 4326, Antarctic polar stereographic 3031,
/// Greenland polar stereographic 3413.
pub fn transform_coord(
    src_epsg: u32,
    dst_epsg: u32,
    x: &[f64],
    y: &[f64],
) -> SimResult<(Array1<f64>, Array1<f64>)> {
    CoordinateTransformer::new(src_epsg, dst_epsg)?.transform(x, y)
}

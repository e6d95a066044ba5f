//! Polygon vector files (shapefile, GeoJSON, ...) read through GDAL

use crate::core::transform::spatial_ref;
use crate::types::{SimError, SimResult};
use gdal::spatial_ref::CoordTransform;
use gdal::vector::LayerAccess;
use gdal::Dataset;
use geo::{BoundingRect, Contains, MultiPolygon, Point, Polygon, Rect};
use ndarray::{Array1, Array2, Axis};
use std::path::Path;

/// All polygons of a vector file, optionally reprojected into `target_epsg`
pub fn load_polygons<P: AsRef<Path>>(path: P, target_epsg: Option<u32>) -> SimResult<MultiPolygon<f64>> {
    log::info!("Reading polygons from: {}", path.as_ref().display());
    let dataset = Dataset::open(path.as_ref())?;
    let target = target_epsg.map(spatial_ref).transpose()?;

    let mut polygons: Vec<Polygon<f64>> = Vec::new();

    for mut layer in dataset.layers() {
        let transform = match (&target, layer.spatial_ref()) {
            (Some(target), Some(source)) => {
                source.set_axis_mapping_strategy(
                    gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER,
                );
                let same = matches!(
                    (source.auth_code(), target.auth_code()),
                    (Ok(a), Ok(b)) if a == b
                );
                if same {
                    None
                } else {
                    Some(CoordTransform::new(&source, target)?)
                }
            }
            (Some(_), None) => {
                log::warn!("Layer {} has no spatial reference, using coordinates as-is", layer.name());
                None
            }
            (None, _) => None,
        };

        for feature in layer.features() {
            let Some(geometry) = feature.geometry() else {
                continue;
            };
            let geometry = match &transform {
                Some(ct) => geometry.transform(ct)?,
                None => geometry.clone(),
            };
            match geometry.to_geo()? {
                geo::Geometry::Polygon(polygon) => polygons.push(polygon),
                geo::Geometry::MultiPolygon(multi) => polygons.extend(multi.0),
                other => log::warn!("Ignoring non-polygon geometry: {:?}", other),
            }
        }
    }

    if polygons.is_empty() {
        return Err(SimError::InvalidFormat(format!(
            "No polygons found in {}",
            path.as_ref().display()
        )));
    }

    log::debug!("Loaded {} polygons", polygons.len());
    Ok(MultiPolygon(polygons))
}

/// Point-in-polygon test with a bounding-rectangle prefilter
pub struct PolygonIndex {
    polygons: MultiPolygon<f64>,
    bounds: Option<Rect<f64>>,
}

impl PolygonIndex {
    pub fn new(polygons: MultiPolygon<f64>) -> Self {
        let bounds = polygons.bounding_rect();
        Self { polygons, bounds }
    }

    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    /// True when the point lies strictly within any polygon
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        if x < bounds.min().x || x > bounds.max().x || y < bounds.min().y || y > bounds.max().y {
            return false;
        }
        let point = Point::new(x, y);
        self.polygons.0.iter().any(|polygon| polygon.contains(&point))
    }
}

/// Flag the points (N x 2 array of x, y) that fall inside any polygon of `path`.
///
/// Points and polygons must share a spatial reference.
pub fn points_in_polygon<P: AsRef<Path>>(points: &Array2<f64>, path: P) -> SimResult<Array1<bool>> {
    if points.ncols() != 2 {
        return Err(SimError::InvalidFormat(format!(
            "Expected N x 2 point array, got {} columns",
            points.ncols()
        )));
    }
    let index = PolygonIndex::new(load_polygons(path, None)?);
    let coords: Vec<(f64, f64)> = points.axis_iter(Axis(0)).map(|row| (row[0], row[1])).collect();

    #[cfg(feature = "parallel")]
    let inside: Vec<bool> = {
        use rayon::prelude::*;
        coords.par_iter().map(|&(x, y)| index.contains(x, y)).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let inside: Vec<bool> = coords.iter().map(|&(x, y)| index.contains(x, y)).collect();

    log::debug!(
        "{} of {} points inside polygons",
        inside.iter().filter(|&&b| b).count(),
        inside.len()
    );
    Ok(Array1::from(inside))
}

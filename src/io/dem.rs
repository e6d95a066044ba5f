use crate::config::{MaskConfig, CLIP_NODATA};
use crate::core::transform::CoordinateTransformer;
use crate::io::polygon::{load_polygons, PolygonIndex};
use crate::types::{min_max, BoundingBox, ComparisonRow, GeoTransform, PointSet, SimError, SimResult};
use gdal::Dataset;
use ndarray::{Array1, Array2, Zip};
use std::path::{Path, PathBuf};

/// Pixel value lookup strategy for point sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMethod {
    /// Value of the pixel containing the point
    Nearest,
    /// Bilinear interpolation between the four surrounding pixel origins
    Bilinear,
}

/// Polygon masking output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaskMethod {
    /// Elevation inside the polygons, [`CLIP_NODATA`] outside
    Clip,
    /// -1 inside the polygons (ice), 1 outside
    Sign,
}

impl MaskMethod {
    pub fn from_config(config: &MaskConfig) -> SimResult<Self> {
        match config.method()?.to_lowercase().as_str() {
            "clip" => Ok(MaskMethod::Clip),
            "sign" => Ok(MaskMethod::Sign),
            other => Err(SimError::Config(format!("Unknown masking method: {}", other))),
        }
    }
}

/// Reference digital elevation model loaded from a GeoTIFF
#[derive(Debug, Clone)]
pub struct ReferenceDem {
    path: PathBuf,
    elevation: Array2<f64>,
    x: Array1<f64>,
    y: Array1<f64>,
    geo_transform: GeoTransform,
    epsg: u32,
    nodata: Option<f64>,
    bbox: BoundingBox,
    /// Bounding box in one extra spatial reference, computed on demand
    reprojected_bbox: Option<BoundingBox>,
}

impl ReferenceDem {
    /// Load band 1 of a GeoTIFF with its axes, EPSG code and native bounding box
    pub fn open<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let path = path.as_ref();
        let is_tiff = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
            .unwrap_or(false);
        if !is_tiff {
            return Err(SimError::UnsupportedFormat(format!(
                "DEM type not recognized: {}",
                path.display()
            )));
        }

        log::info!("Reading DEM from: {}", path.display());
        let dataset = Dataset::open(path)?;

        let geo_transform = GeoTransform::from_gdal(dataset.geo_transform()?);
        if !geo_transform.is_north_up() {
            return Err(SimError::UnsupportedFormat(format!(
                "Rotated geotransform not supported: {:?}",
                geo_transform
            )));
        }
        let (width, height) = dataset.raster_size();
        log::debug!("DEM size: {}x{}", width, height);
        log::debug!("DEM geotransform: {:?}", geo_transform);

        let rasterband = dataset.rasterband(1)?;
        let nodata = rasterband.no_data_value();
        let band_data = rasterband.read_as::<f64>((0, 0), (width, height), (width, height), None)?;
        let elevation = Array2::from_shape_vec((height, width), band_data.data)
            .map_err(|e| SimError::Processing(format!("Failed to reshape DEM data: {}", e)))?;

        let epsg = Self::read_epsg(&dataset)?;

        let x = Array1::from_shape_fn(width, |i| {
            geo_transform.top_left_x + i as f64 * geo_transform.pixel_width
        });
        let y = Array1::from_shape_fn(height, |j| {
            geo_transform.top_left_y + j as f64 * geo_transform.pixel_height
        });

        let bbox = BoundingBox::from_points(
            x.as_slice().unwrap_or(&[]),
            y.as_slice().unwrap_or(&[]),
            epsg,
        )
        .ok_or_else(|| SimError::InvalidFormat(format!("Empty DEM: {}", path.display())))?;

        Ok(Self {
            path: path.to_path_buf(),
            elevation,
            x,
            y,
            geo_transform,
            epsg,
            nodata,
            bbox,
            reprojected_bbox: None,
        })
    }

    fn read_epsg(dataset: &Dataset) -> SimResult<u32> {
        let mut srs = dataset.spatial_ref()?;
        let code = match srs.auth_code() {
            Ok(code) => code,
            Err(_) => {
                srs.auto_identify_epsg()?;
                srs.auth_code()?
            }
        };
        u32::try_from(code)
            .map_err(|_| SimError::InvalidFormat(format!("Invalid EPSG authority code: {}", code)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn elevation(&self) -> &Array2<f64> {
        &self.elevation
    }

    /// Column coordinates (pixel origins)
    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    /// Row coordinates (pixel origins); usually decreasing
    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo_transform
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Bounding box in the native spatial reference
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Cached bounding box in a non-native spatial reference, if computed
    pub fn reprojected_bbox(&self) -> Option<&BoundingBox> {
        self.reprojected_bbox.as_ref()
    }

    /// Bounding box in `epsg`.
    ///
    /// Non-native boxes bound the four transformed corners only, not the full
    /// transformed edges. The most recent one is cached.
    pub fn bbox_in(&mut self, epsg: u32) -> SimResult<BoundingBox> {
        if epsg == self.epsg {
            return Ok(self.bbox);
        }
        if let Some(cached) = self.reprojected_bbox.filter(|b| b.epsg == epsg) {
            return Ok(cached);
        }

        let corners = self.bbox.corners();
        let cx: Vec<f64> = corners.iter().map(|c| c.0).collect();
        let cy: Vec<f64> = corners.iter().map(|c| c.1).collect();
        let (tx, ty) = CoordinateTransformer::new(self.epsg, epsg)?.transform(&cx, &cy)?;

        let (min_x, max_x) = min_max(tx.as_slice().unwrap_or(&[]));
        let (min_y, max_y) = min_max(ty.as_slice().unwrap_or(&[]));
        let bbox = BoundingBox::new(min_x, min_y, max_x, max_y, epsg)?;

        log::debug!("DEM bbox in EPSG:{}: {:?}", epsg, bbox.as_tuple());
        self.reprojected_bbox = Some(bbox);
        Ok(bbox)
    }

    /// Value used for points that fall outside the grid
    fn fill_value(&self) -> f64 {
        self.nodata.unwrap_or(f64::NAN)
    }

    fn sample_nearest(&self, x: f64, y: f64) -> f64 {
        let (height, width) = self.elevation.dim();
        let (col, row) = self.geo_transform.world_to_pixel(x, y);
        if !(col >= 0.0 && row >= 0.0) {
            return self.fill_value();
        }
        let (col, row) = (col.floor() as usize, row.floor() as usize);
        if col >= width || row >= height {
            return self.fill_value();
        }
        self.elevation[[row, col]]
    }

    fn sample_bilinear(&self, x: f64, y: f64) -> f64 {
        let (height, width) = self.elevation.dim();
        let (col, row) = self.geo_transform.world_to_pixel(x, y);

        if !(col >= 0.0 && col < (width - 1) as f64 && row >= 0.0 && row < (height - 1) as f64) {
            return self.sample_nearest(x, y);
        }

        let x1 = col.floor() as usize;
        let y1 = row.floor() as usize;
        let x2 = x1 + 1;
        let y2 = y1 + 1;

        let v11 = self.elevation[[y1, x1]];
        let v12 = self.elevation[[y2, x1]];
        let v21 = self.elevation[[y1, x2]];
        let v22 = self.elevation[[y2, x2]];

        if let Some(nodata) = self.nodata {
            if [v11, v12, v21, v22].iter().any(|&v| v == nodata) {
                return self.sample_nearest(x, y);
            }
        }

        let dx = col - x1 as f64;
        let dy = row - y1 as f64;

        v11 * (1.0 - dx) * (1.0 - dy) + v21 * dx * (1.0 - dy) + v12 * (1.0 - dx) * dy + v22 * dx * dy
    }

    /// Nearest-pixel elevation at each point.
    ///
    /// Points must already be in the DEM's spatial reference; no check or
    /// reprojection is done here.
    pub fn sample(&self, points: &PointSet) -> Array1<f64> {
        self.sample_with(points, SampleMethod::Nearest)
    }

    pub fn sample_with(&self, points: &PointSet, method: SampleMethod) -> Array1<f64> {
        let mut values = Array1::zeros(points.len());
        Zip::from(&mut values)
            .and(&points.x)
            .and(&points.y)
            .for_each(|v, &x, &y| {
                *v = match method {
                    SampleMethod::Nearest => self.sample_nearest(x, y),
                    SampleMethod::Bilinear => self.sample_bilinear(x, y),
                };
            });
        values
    }

    /// Sample the DEM and attach the result to `points` as column `name`
    pub fn sample_into(&self, points: &mut PointSet, name: &str) -> SimResult<()> {
        let values = self.sample(points);
        points.add_column(name, values)
    }

    /// Mask the DEM with the polygons of a vector file.
    ///
    /// Polygons are reprojected into the DEM's spatial reference; a cell is
    /// inside when its center lies within any polygon.
    pub fn mask_by_polygons<P: AsRef<Path>>(&self, polygon_path: P, method: MaskMethod) -> SimResult<Array2<f64>> {
        let index = PolygonIndex::new(load_polygons(polygon_path, Some(self.epsg))?);
        Ok(self.mask_with_index(&index, method))
    }

    pub fn mask_with_index(&self, index: &PolygonIndex, method: MaskMethod) -> Array2<f64> {
        log::debug!("Masking DEM with {} polygons ({:?})", index.polygons().0.len(), method);

        let gt = self.geo_transform;
        let mut out = Array2::<f64>::zeros(self.elevation.dim());

        let cell = |(row, col): (usize, usize), value: &mut f64, elevation: f64| {
            let (x, y) = gt.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5);
            let inside = index.contains(x, y);
            *value = match method {
                MaskMethod::Clip => {
                    if inside {
                        elevation
                    } else {
                        CLIP_NODATA
                    }
                }
                MaskMethod::Sign => {
                    if inside {
                        -1.0
                    } else {
                        1.0
                    }
                }
            };
        };

        #[cfg(feature = "parallel")]
        {
            Zip::indexed(&mut out)
                .and(&self.elevation)
                .par_for_each(|idx, value, &elevation| cell(idx, value, elevation));
        }

        #[cfg(not(feature = "parallel"))]
        {
            Zip::indexed(&mut out)
                .and(&self.elevation)
                .for_each(|idx, value, &elevation| cell(idx, value, elevation));
        }

        let inside = match method {
            MaskMethod::Sign => out.iter().filter(|&&v| v < 0.0).count(),
            MaskMethod::Clip => out.iter().filter(|&&v| v != CLIP_NODATA).count(),
        };
        log::info!("Masked DEM: {} of {} cells inside polygons", inside, out.len());

        out
    }

    /// Mask using a configuration keyword ("clip" or "sign")
    pub fn mask_with_config<P: AsRef<Path>>(&self, polygon_path: P, config: &MaskConfig) -> SimResult<Array2<f64>> {
        let method = MaskMethod::from_config(config)?;
        self.mask_by_polygons(polygon_path, method)
    }

    /// Co-locate point elevations with the DEM.
    ///
    /// `points` must be in the DEM's spatial reference and carry the point
    /// elevation in column `elevation_column`. Points whose DEM sample is
    /// nodata (or not finite) are dropped.
    pub fn compare(&self, points: &PointSet, elevation_column: &str) -> SimResult<Vec<ComparisonRow>> {
        let is2_elev = points.column(elevation_column).ok_or_else(|| {
            SimError::InvalidFormat(format!("Missing point column: {}", elevation_column))
        })?;
        let dem_elev = self.sample(points);

        let rows: Vec<ComparisonRow> = (0..points.len())
            .filter(|&i| dem_elev[i].is_finite() && Some(dem_elev[i]) != self.nodata)
            .map(|i| ComparisonRow {
                x: points.x[i],
                y: points.y[i],
                dem_elev: dem_elev[i],
                is2_elev: is2_elev[i],
                diff: dem_elev[i] - is2_elev[i],
            })
            .collect();

        log::info!("Compared {} of {} points against DEM", rows.len(), points.len());
        Ok(rows)
    }
}

use crate::config::ExtractionConfig;
use crate::core::segment_filter::segment_diff_filter;
use crate::core::time::{gps2dyr, gps_time};
use crate::core::track::orbit_type;
use crate::core::transform::CoordinateTransformer;
use crate::io::atl06::{output_file_name, read_beam, write_reduced_beam, BeamData, BeamRead, ReducedBeam};
use crate::types::{Beam, BoundingBox, SimError, SimResult, EPSG_GEODETIC};
use ndarray::{Array1, Zip};
use std::path::{Path, PathBuf};

/// Elevations at or beyond this magnitude are treated as invalid (m)
pub const MAX_ABS_ELEVATION: f64 = 10_000.0;

/// What happened to one beam of one file
#[derive(Debug)]
pub enum BeamOutcome {
    Written { path: PathBuf, rows: usize },
    SkippedMissingField { reason: String },
    SkippedEmpty,
}

#[derive(Debug)]
pub struct BeamReport {
    pub file: PathBuf,
    pub beam: Beam,
    pub outcome: BeamOutcome,
}

impl BeamReport {
    pub fn is_written(&self) -> bool {
        matches!(self.outcome, BeamOutcome::Written { .. })
    }
}

/// Inclusion mask: quality flag, elevation bound, region and segment-difference test
pub fn build_mask(data: &BeamData, region: Option<&BoundingBox>, tolerance: f64) -> SimResult<Array1<bool>> {
    let s = &data.segments;
    let diff_mask = segment_diff_filter(&s.dh_fit_dx, &s.h_li, tolerance)?;

    let mut mask = Array1::from_elem(s.len(), false);
    Zip::from(&mut mask)
        .and(&s.q_flag)
        .and(&s.h_li)
        .and(&s.lon)
        .and(&s.lat)
        .and(&diff_mask)
        .for_each(|m, &q, &h, &lon, &lat, &diff| {
            let in_region = region.map_or(true, |r| r.contains(lon, lat));
            *m = q == 0 && h.abs() < MAX_ABS_ELEVATION && in_region && diff;
        });

    Ok(mask)
}

/// Splits ATL06 granules into reduced per-beam files
pub struct Atl06Extractor {
    config: ExtractionConfig,
    transformer: CoordinateTransformer,
}

impl Atl06Extractor {
    /// Fails with `InvalidProjection` when the target EPSG is unknown
    pub fn new(config: ExtractionConfig) -> SimResult<Self> {
        let transformer = CoordinateTransformer::new(EPSG_GEODETIC, config.target_epsg)?;
        Ok(Self { config, transformer })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Filter and augment one beam; `None` when nothing passes the mask
    pub fn reduce_beam(&self, data: BeamData) -> SimResult<Option<ReducedBeam>> {
        let mask = build_mask(&data, self.config.region.as_ref(), self.config.tolerance)?;
        if !mask.iter().any(|&m| m) {
            return Ok(None);
        }

        let segments = data.segments.select(&mask);

        let t_gps = gps_time(data.t_ref, &segments.t_dt);
        let t_year = gps2dyr(&t_gps);
        let is_asc = orbit_type(&t_year, &segments.lat)?;

        let lon = segments.lon.to_vec();
        let lat = segments.lat.to_vec();
        let (x, y) = self.transformer.transform(&lon, &lat)?;

        Ok(Some(ReducedBeam {
            data: BeamData { segments, ..data },
            x,
            y,
            t_gps,
            t_year,
            is_asc,
        }))
    }

    /// Process every beam of one ATL06 file, writing one output per surviving beam
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> SimResult<Vec<BeamReport>> {
        let path = path.as_ref();
        let is_h5 = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("h5"))
            .unwrap_or(false);
        if !is_h5 {
            return Err(SimError::UnsupportedFormat(format!(
                "Not an ATL06 HDF5 file: {}",
                path.display()
            )));
        }

        log::info!("Reading ATL06 file: {}", path.display());
        let file = hdf5::File::open(path)?;
        let mut reports = Vec::with_capacity(Beam::ALL.len());

        for beam in Beam::ALL {
            let outcome = match read_beam(&file, beam) {
                BeamRead::MissingField(e) => {
                    log::warn!("Skipping group {} in file {}: {}", beam, path.display(), e);
                    BeamOutcome::SkippedMissingField { reason: e.to_string() }
                }
                BeamRead::Success(data) => match self.reduce_beam(data)? {
                    None => {
                        log::debug!("No segments left in group {} after filtering", beam);
                        BeamOutcome::SkippedEmpty
                    }
                    Some(reduced) => {
                        let out = self.write(path, &reduced)?;
                        BeamOutcome::Written { path: out, rows: reduced.len() }
                    }
                },
            };
            reports.push(BeamReport { file: path.to_path_buf(), beam, outcome });
        }

        Ok(reports)
    }

    /// Process several files in order; the first fatal error aborts the batch
    pub fn process_files<P: AsRef<Path>>(&self, paths: &[P]) -> SimResult<Vec<BeamReport>> {
        let mut reports = Vec::new();
        for path in paths {
            reports.extend(self.process_file(path)?);
        }
        Ok(reports)
    }

    fn write(&self, input: &Path, reduced: &ReducedBeam) -> SimResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let out = self
            .config
            .output_dir
            .join(output_file_name(input, reduced.data.beam));
        write_reduced_beam(&out, reduced)?;
        log::info!("out -> {}", out.display());
        Ok(out)
    }
}

/// Read one ATL06 file and write up to six reduced per-beam files
pub fn read_atl06<P: AsRef<Path>, Q: Into<PathBuf>>(
    path: P,
    epsg: u32,
    output_dir: Q,
    region: Option<BoundingBox>,
) -> SimResult<Vec<BeamReport>> {
    let mut config = ExtractionConfig::new(epsg).with_output_dir(output_dir);
    config.region = region;
    Atl06Extractor::new(config)?.process_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::atl06::LandIceSegments;
    use ndarray::array;

    fn beam_data() -> BeamData {
        let segments = LandIceSegments {
            lat: array![70.0, 70.1, 70.2, 70.3, 70.4],
            lon: array![-49.0, -49.0, -49.0, -49.0, -49.0],
            h_li: array![1000.0, 1000.0, 1000.0, 1000.0, 1000.0],
            q_flag: array![0, 0, 1, 0, 0],
            dh_fit_dx: Array1::zeros(5),
            ..Default::default()
        };
        BeamData {
            beam: Beam::Gt1l,
            segments,
            rgt: 1,
            t_ref: 1_198_800_018.0,
            beam_type: "strong".to_string(),
            spot_number: "1".to_string(),
        }
    }

    #[test]
    fn test_mask_quality_flag() {
        let mask = build_mask(&beam_data(), None, 2.0).unwrap();
        assert_eq!(mask.to_vec(), vec![true, true, false, true, true]);
    }

    #[test]
    fn test_mask_region() {
        let region = BoundingBox::new(-50.0, 70.05, -48.0, 70.35, EPSG_GEODETIC).unwrap();
        let mask = build_mask(&beam_data(), Some(&region), 2.0).unwrap();
        assert_eq!(mask.to_vec(), vec![false, true, false, true, false]);
    }

    #[test]
    fn test_mask_drops_spike_and_neighbors() {
        let mut data = beam_data();
        data.segments.q_flag = array![0, 0, 0, 0, 0];
        data.segments.h_li = array![1000.0, 1050.0, 1000.0, 1000.0, 1000.0];
        let mask = build_mask(&data, None, 2.0).unwrap();
        assert_eq!(mask.to_vec(), vec![false, false, false, true, true]);

        // a tolerance above the spike keeps every segment
        let mask = build_mask(&data, None, 100.0).unwrap();
        assert!(mask.iter().all(|&m| m));
    }

    #[test]
    fn test_mask_elevation_bound() {
        let mut data = beam_data();
        data.segments.h_li = array![1000.0, 1000.0, 1000.0, 1000.0, -10_000.0];
        data.segments.dh_fit_dx = Array1::zeros(5);
        let mask = build_mask(&data, None, 1.0e9).unwrap();
        assert_eq!(mask.to_vec(), vec![true, true, false, true, false]);
    }

    #[test]
    fn test_unknown_target_epsg_is_fatal() {
        let result = Atl06Extractor::new(ExtractionConfig::new(999_999));
        assert!(matches!(result, Err(SimError::InvalidProjection { .. })));
    }

    #[test]
    fn test_rejects_non_h5_input() {
        let extractor = Atl06Extractor::new(ExtractionConfig::new(3413)).unwrap();
        let result = extractor.process_file("granule.nc");
        assert!(matches!(result, Err(SimError::UnsupportedFormat(_))));
    }
}

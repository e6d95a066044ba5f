use crate::types::{Beam, SimError, SimResult};
use hdf5::types::{FixedAscii, VarLenAscii, VarLenUnicode};
use ndarray::{Array1, Array2};
use std::path::{Path, PathBuf};

/// Land-ice segment variables read for every beam, as (output name, path below the beam group)
const FLOAT_FIELDS: [(&str, &str); 13] = [
    ("lat", "land_ice_segments/latitude"),
    ("lon", "land_ice_segments/longitude"),
    ("h_li", "land_ice_segments/h_li"),
    ("s_li", "land_ice_segments/h_li_sigma"),
    ("t_dt", "land_ice_segments/delta_time"),
    ("snr", "land_ice_segments/fit_statistics/snr_significance"),
    ("h_rb", "land_ice_segments/fit_statistics/h_robust_sprd"),
    ("dac", "land_ice_segments/geophysical/dac"),
    ("dh_fit_dx", "land_ice_segments/fit_statistics/dh_fit_dx"),
    ("tide_earth", "land_ice_segments/geophysical/tide_earth"),
    ("tide_load", "land_ice_segments/geophysical/tide_load"),
    ("tide_ocean", "land_ice_segments/geophysical/tide_ocean"),
    ("tide_pole", "land_ice_segments/geophysical/tide_pole"),
];

const FLAG_FIELDS: [(&str, &str); 3] = [
    ("q_flag", "land_ice_segments/atl06_quality_summary"),
    ("s_fg", "land_ice_segments/fit_statistics/signal_selection_source"),
    ("f_sn", "land_ice_segments/geophysical/bsnow_conf"),
];

const RGT_PATH: &str = "orbit_info/rgt";
const GPS_EPOCH_PATH: &str = "ancillary_data/atlas_sdp_gps_epoch";
const BEAM_TYPE_ATTR: &str = "atlas_beam_type";
const SPOT_NUMBER_ATTR: &str = "atlas_spot_number";

/// Per-segment columns of one beam
#[derive(Debug, Clone, Default)]
pub struct LandIceSegments {
    pub lat: Array1<f64>,
    pub lon: Array1<f64>,
    pub h_li: Array1<f64>,
    pub s_li: Array1<f64>,
    pub t_dt: Array1<f64>,
    pub snr: Array1<f64>,
    pub h_rb: Array1<f64>,
    pub dac: Array1<f64>,
    pub dh_fit_dx: Array1<f64>,
    pub tide_earth: Array1<f64>,
    pub tide_load: Array1<f64>,
    pub tide_ocean: Array1<f64>,
    pub tide_pole: Array1<f64>,
    pub q_flag: Array1<i32>,
    pub s_fg: Array1<i32>,
    pub f_sn: Array1<i32>,
}

impl LandIceSegments {
    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    pub fn float_columns(&self) -> [(&'static str, &Array1<f64>); 13] {
        [
            ("lat", &self.lat),
            ("lon", &self.lon),
            ("h_li", &self.h_li),
            ("s_li", &self.s_li),
            ("t_dt", &self.t_dt),
            ("snr", &self.snr),
            ("h_rb", &self.h_rb),
            ("dac", &self.dac),
            ("dh_fit_dx", &self.dh_fit_dx),
            ("tide_earth", &self.tide_earth),
            ("tide_load", &self.tide_load),
            ("tide_ocean", &self.tide_ocean),
            ("tide_pole", &self.tide_pole),
        ]
    }

    pub fn flag_columns(&self) -> [(&'static str, &Array1<i32>); 3] {
        [("q_flag", &self.q_flag), ("s_fg", &self.s_fg), ("f_sn", &self.f_sn)]
    }

    fn float_column_mut(&mut self, name: &str) -> Option<&mut Array1<f64>> {
        let column = match name {
            "lat" => &mut self.lat,
            "lon" => &mut self.lon,
            "h_li" => &mut self.h_li,
            "s_li" => &mut self.s_li,
            "t_dt" => &mut self.t_dt,
            "snr" => &mut self.snr,
            "h_rb" => &mut self.h_rb,
            "dac" => &mut self.dac,
            "dh_fit_dx" => &mut self.dh_fit_dx,
            "tide_earth" => &mut self.tide_earth,
            "tide_load" => &mut self.tide_load,
            "tide_ocean" => &mut self.tide_ocean,
            "tide_pole" => &mut self.tide_pole,
            _ => return None,
        };
        Some(column)
    }

    fn flag_column_mut(&mut self, name: &str) -> Option<&mut Array1<i32>> {
        let column = match name {
            "q_flag" => &mut self.q_flag,
            "s_fg" => &mut self.s_fg,
            "f_sn" => &mut self.f_sn,
            _ => return None,
        };
        Some(column)
    }

    /// Keep the rows where `mask` is true
    pub fn select(&self, mask: &Array1<bool>) -> Self {
        Self {
            lat: select(&self.lat, mask),
            lon: select(&self.lon, mask),
            h_li: select(&self.h_li, mask),
            s_li: select(&self.s_li, mask),
            t_dt: select(&self.t_dt, mask),
            snr: select(&self.snr, mask),
            h_rb: select(&self.h_rb, mask),
            dac: select(&self.dac, mask),
            dh_fit_dx: select(&self.dh_fit_dx, mask),
            tide_earth: select(&self.tide_earth, mask),
            tide_load: select(&self.tide_load, mask),
            tide_ocean: select(&self.tide_ocean, mask),
            tide_pole: select(&self.tide_pole, mask),
            q_flag: select(&self.q_flag, mask),
            s_fg: select(&self.s_fg, mask),
            f_sn: select(&self.f_sn, mask),
        }
    }
}

/// Boolean-mask row selection
pub fn select<T: Copy>(values: &Array1<T>, mask: &Array1<bool>) -> Array1<T> {
    values
        .iter()
        .zip(mask.iter())
        .filter(|&(_, &keep)| keep)
        .map(|(v, _)| *v)
        .collect()
}

/// One beam of an ATL06 granule
#[derive(Debug, Clone)]
pub struct BeamData {
    pub beam: Beam,
    pub segments: LandIceSegments,
    /// Reference ground track
    pub rgt: i32,
    /// ATLAS SDP GPS epoch, seconds
    pub t_ref: f64,
    /// "strong" or "weak"
    pub beam_type: String,
    pub spot_number: String,
}

/// Filtered beam with derived time, track direction and projected coordinates
#[derive(Debug, Clone)]
pub struct ReducedBeam {
    pub data: BeamData,
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub t_gps: Array1<f64>,
    pub t_year: Array1<f64>,
    pub is_asc: Array1<bool>,
}

impl ReducedBeam {
    pub fn len(&self) -> usize {
        self.data.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.segments.is_empty()
    }
}

/// Outcome of reading one beam group
#[derive(Debug)]
pub enum BeamRead {
    Success(BeamData),
    /// A field or attribute was absent or unreadable; the beam should be skipped
    MissingField(SimError),
}

/// Read all variables of one beam, reporting absent fields as [`BeamRead::MissingField`]
pub fn read_beam(file: &hdf5::File, beam: Beam) -> BeamRead {
    match try_read_beam(file, beam) {
        Ok(data) => BeamRead::Success(data),
        Err(e) => BeamRead::MissingField(e),
    }
}

fn try_read_beam(file: &hdf5::File, beam: Beam) -> SimResult<BeamData> {
    let missing = |field: &str| SimError::MissingField {
        beam: beam.to_string(),
        field: field.to_string(),
    };

    let mut segments = LandIceSegments::default();

    for (name, path) in FLOAT_FIELDS {
        let full_path = format!("{}/{}", beam, path);
        let values = read_column::<f64>(file, &full_path).map_err(|_| missing(&full_path))?;
        if let Some(column) = segments.float_column_mut(name) {
            *column = values;
        }
    }

    for (name, path) in FLAG_FIELDS {
        let full_path = format!("{}/{}", beam, path);
        let values = read_column::<i32>(file, &full_path).map_err(|_| missing(&full_path))?;
        if let Some(column) = segments.flag_column_mut(name) {
            *column = values;
        }
    }

    let n = segments.len();
    for (name, column) in segments.float_columns() {
        if column.len() != n {
            return Err(SimError::LengthMismatch {
                field: name.to_string(),
                expected: n,
                actual: column.len(),
            });
        }
    }
    for (name, column) in segments.flag_columns() {
        if column.len() != n {
            return Err(SimError::LengthMismatch {
                field: name.to_string(),
                expected: n,
                actual: column.len(),
            });
        }
    }

    let rgt = read_first::<i32>(file, RGT_PATH).map_err(|_| missing(RGT_PATH))?;
    let t_ref = read_first::<f64>(file, GPS_EPOCH_PATH).map_err(|_| missing(GPS_EPOCH_PATH))?;

    let group = file.group(beam.as_str()).map_err(|_| missing(beam.as_str()))?;
    let beam_type = read_string_attr(&group, BEAM_TYPE_ATTR).map_err(|_| missing(BEAM_TYPE_ATTR))?;
    let spot_number =
        read_string_attr(&group, SPOT_NUMBER_ATTR).map_err(|_| missing(SPOT_NUMBER_ATTR))?;

    log::debug!("Read {} segments from beam {} ({})", n, beam, beam_type);

    Ok(BeamData {
        beam,
        segments,
        rgt,
        t_ref,
        beam_type,
        spot_number,
    })
}

fn read_column<T: hdf5::H5Type>(file: &hdf5::File, path: &str) -> hdf5::Result<Array1<T>> {
    let values = file.dataset(path)?.read_raw::<T>()?;
    Ok(Array1::from(values))
}

fn read_first<T: hdf5::H5Type + Copy>(file: &hdf5::File, path: &str) -> SimResult<T> {
    let values = file.dataset(path)?.read_raw::<T>()?;
    values
        .first()
        .copied()
        .ok_or_else(|| SimError::InvalidFormat(format!("Empty dataset: {}", path)))
}

/// Read a string attribute stored as variable- or fixed-length text
fn read_string_attr(group: &hdf5::Group, name: &str) -> SimResult<String> {
    let attr = group.attr(name)?;
    if let Ok(value) = attr.read_scalar::<VarLenUnicode>() {
        return Ok(value.as_str().to_string());
    }
    if let Ok(value) = attr.read_scalar::<VarLenAscii>() {
        return Ok(value.as_str().to_string());
    }
    let value = attr.read_scalar::<FixedAscii<64>>()?;
    Ok(value.as_str().trim_end_matches('\0').to_string())
}

/// Output file name for one beam: `<stem>_<beam>.<ext>`
pub fn output_file_name(input: &Path, beam: Beam) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "h5".to_string());
    PathBuf::from(format!("{}_{}.{}", stem, beam, extension))
}

/// Persist a reduced beam, one dataset per column
pub fn write_reduced_beam<P: AsRef<Path>>(path: P, reduced: &ReducedBeam) -> SimResult<()> {
    let file = hdf5::File::create(path.as_ref())?;
    let segments = &reduced.data.segments;

    for (name, column) in segments.float_columns() {
        write_column(&file, name, column)?;
    }
    for (name, column) in segments.flag_columns() {
        write_column(&file, name, column)?;
    }

    write_column(&file, "x", &reduced.x)?;
    write_column(&file, "y", &reduced.y)?;
    write_column(&file, "t_gps", &reduced.t_gps)?;
    write_column(&file, "t_year", &reduced.t_year)?;
    write_column(&file, "is_asc", &reduced.is_asc)?;

    file.new_attr::<i32>()
        .shape(())
        .create("rgt")?
        .write_scalar(&reduced.data.rgt)?;
    file.new_attr::<f64>()
        .shape(())
        .create("t_ref")?
        .write_scalar(&reduced.data.t_ref)?;
    write_string_attr(&file, "beam_type", &reduced.data.beam_type)?;
    write_string_attr(&file, "spot_number", &reduced.data.spot_number)?;

    Ok(())
}

fn write_column<T: hdf5::H5Type>(file: &hdf5::File, name: &str, values: &Array1<T>) -> SimResult<()> {
    let dataset = file.new_dataset::<T>().shape(values.len()).create(name)?;
    if let Some(slice) = values.as_slice() {
        dataset.write_raw(slice)?;
    } else {
        return Err(SimError::Processing(format!("Column {} is not contiguous", name)));
    }
    Ok(())
}

fn write_string_attr(location: &hdf5::Group, name: &str, value: &str) -> SimResult<()> {
    let value: VarLenUnicode = value
        .parse()
        .map_err(|e| SimError::Processing(format!("Invalid attribute {}: {:?}", name, e)))?;
    location
        .new_attr::<VarLenUnicode>()
        .shape(())
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

/// Read 1-D datasets from the root of an HDF5 file as columns of a 2-D array.
///
/// All root datasets are read (sorted by name) when `names` is `None`.
pub fn read_h5<P: AsRef<Path>>(path: P, names: Option<&[&str]>) -> SimResult<(Array2<f64>, Vec<String>)> {
    let file = hdf5::File::open(path.as_ref())?;

    let names: Vec<String> = match names {
        Some(names) => names.iter().map(|n| n.to_string()).collect(),
        None => {
            let mut members: Vec<String> = file
                .member_names()?
                .into_iter()
                .filter(|n| file.dataset(n).is_ok())
                .collect();
            members.sort();
            members
        }
    };

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        let dataset = file.dataset(name)?;
        let values = match dataset.read_raw::<f64>() {
            Ok(values) => values,
            Err(_) => dataset
                .read_raw::<bool>()?
                .into_iter()
                .map(|b| if b { 1.0 } else { 0.0 })
                .collect(),
        };
        columns.push(values);
    }

    let rows = columns.first().map(|c| c.len()).unwrap_or(0);
    let mut table = Array2::<f64>::zeros((rows, columns.len()));
    for (j, (name, column)) in names.iter().zip(columns.iter()).enumerate() {
        if column.len() != rows {
            return Err(SimError::LengthMismatch {
                field: name.clone(),
                expected: rows,
                actual: column.len(),
            });
        }
        for (i, v) in column.iter().enumerate() {
            table[[i, j]] = *v;
        }
    }

    Ok((table, names))
}

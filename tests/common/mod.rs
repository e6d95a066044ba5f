#![allow(dead_code)]

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use hdf5::types::VarLenUnicode;
use std::path::{Path, PathBuf};

pub const GRANULE_NAME: &str = "ATL06_20190221121851_08410203_003_01.h5";
pub const ATLAS_EPOCH: f64 = 1_198_800_018.0;
pub const SEGMENTS: usize = 10;

pub const DEM_NODATA: f64 = -9999.0;
pub const DEM_ORIGIN: (f64, f64) = (-200_000.0, -2_000_000.0);
pub const DEM_PIXEL: f64 = 1000.0;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn group_at(file: &hdf5::File, path: &str) -> hdf5::Group {
    let mut group = file.group("/").expect("Failed to open root group");
    for name in path.split('/').filter(|s| !s.is_empty()) {
        group = match group.group(name) {
            Ok(g) => g,
            Err(_) => group.create_group(name).expect("Failed to create group"),
        };
    }
    group
}

fn write_dataset<T: hdf5::H5Type>(file: &hdf5::File, path: &str, values: &[T]) {
    let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
    group_at(file, parent)
        .new_dataset::<T>()
        .shape(values.len())
        .create(name)
        .expect("Failed to create dataset")
        .write_raw(values)
        .expect("Failed to write dataset");
}

fn write_string_attr(group: &hdf5::Group, name: &str, value: &str) {
    let value: VarLenUnicode = value.parse().expect("Invalid attribute value");
    group
        .new_attr::<VarLenUnicode>()
        .shape(())
        .create(name)
        .expect("Failed to create attribute")
        .write_scalar(&value)
        .expect("Failed to write attribute");
}

/// Along-track elevation profiles on a constant 0.5 m per segment slope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Consistent elevations, segment 4 quality-flagged
    Flagged,
    /// All quality flags clear, 50 m spike at segment 6
    Spiked,
}

/// (h_li, dh_fit_dx, q_flag) for one beam
pub fn segment_profile(profile: Profile) -> (Vec<f64>, Vec<f64>, Vec<i32>) {
    let mut h_li: Vec<f64> = (0..SEGMENTS).map(|i| 1000.0 + 0.5 * i as f64).collect();
    let dh_fit_dx = vec![0.5 / 20.0; SEGMENTS];
    let mut q_flag = vec![0; SEGMENTS];
    match profile {
        Profile::Flagged => q_flag[4] = 1,
        Profile::Spiked => h_li[6] += 50.0,
    }
    (h_li, dh_fit_dx, q_flag)
}

fn write_beam(file: &hdf5::File, beam: &str, profile: Profile, skip: Option<&str>) {
    let (h_li, dh_fit_dx, q_flag) = segment_profile(profile);
    let lat: Vec<f64> = (0..SEGMENTS).map(|i| 70.0 + 0.01 * i as f64).collect();
    let lon = vec![-49.0; SEGMENTS];
    let t_dt: Vec<f64> = (0..SEGMENTS).map(|i| 35_942_400.0 + i as f64).collect();
    let zeros = vec![0.0; SEGMENTS];
    let flags = vec![0i32; SEGMENTS];

    let floats: [(&str, &[f64]); 13] = [
        ("land_ice_segments/latitude", &lat),
        ("land_ice_segments/longitude", &lon),
        ("land_ice_segments/h_li", &h_li),
        ("land_ice_segments/h_li_sigma", &zeros),
        ("land_ice_segments/delta_time", &t_dt),
        ("land_ice_segments/fit_statistics/snr_significance", &zeros),
        ("land_ice_segments/fit_statistics/h_robust_sprd", &zeros),
        ("land_ice_segments/geophysical/dac", &zeros),
        ("land_ice_segments/fit_statistics/dh_fit_dx", &dh_fit_dx),
        ("land_ice_segments/geophysical/tide_earth", &zeros),
        ("land_ice_segments/geophysical/tide_load", &zeros),
        ("land_ice_segments/geophysical/tide_ocean", &zeros),
        ("land_ice_segments/geophysical/tide_pole", &zeros),
    ];
    let ints: [(&str, &[i32]); 3] = [
        ("land_ice_segments/atl06_quality_summary", &q_flag),
        ("land_ice_segments/fit_statistics/signal_selection_source", &flags),
        ("land_ice_segments/geophysical/bsnow_conf", &flags),
    ];

    for (path, values) in floats {
        if Some(path) != skip {
            write_dataset(file, &format!("{}/{}", beam, path), values);
        }
    }
    for (path, values) in ints {
        if Some(path) != skip {
            write_dataset(file, &format!("{}/{}", beam, path), values);
        }
    }

    let group = group_at(file, beam);
    write_string_attr(&group, "atlas_beam_type", "strong");
    write_string_attr(&group, "atlas_spot_number", "1");
}

/// Synthetic granule: gt1l complete, gt1r without h_li, other beams absent
pub fn write_granule(dir: &Path) -> PathBuf {
    write_granule_with(dir, Profile::Flagged)
}

pub fn write_granule_with(dir: &Path, profile: Profile) -> PathBuf {
    let path = dir.join(GRANULE_NAME);
    let file = hdf5::File::create(&path).expect("Failed to create granule");

    write_dataset(&file, "orbit_info/rgt", &[841i32]);
    write_dataset(&file, "ancillary_data/atlas_sdp_gps_epoch", &[ATLAS_EPOCH]);

    write_beam(&file, "gt1l", profile, None);
    write_beam(&file, "gt1r", profile, Some("land_ice_segments/h_li"));

    path
}

/// 4 x 3 GeoTIFF in EPSG:3413, values 10 * (row * 4 + col), last cell nodata
pub fn write_dem(dir: &Path) -> PathBuf {
    let path = dir.join("reference.tif");
    let driver = DriverManager::get_driver_by_name("GTiff").expect("GTiff driver missing");
    let mut dataset = driver
        .create_with_band_type::<f64, _>(&path, 4, 3, 1)
        .expect("Failed to create GeoTIFF");

    dataset
        .set_geo_transform(&[DEM_ORIGIN.0, DEM_PIXEL, 0.0, DEM_ORIGIN.1, 0.0, -DEM_PIXEL])
        .expect("Failed to set geotransform");
    let srs = SpatialRef::from_epsg(3413).expect("Unknown EPSG");
    dataset.set_spatial_ref(&srs).expect("Failed to set spatial reference");

    let mut values: Vec<f64> = (0..12).map(|i| 10.0 * i as f64).collect();
    values[11] = DEM_NODATA;

    let mut band = dataset.rasterband(1).expect("Missing band");
    band.set_no_data_value(Some(DEM_NODATA))
        .expect("Failed to set nodata");
    band.write((0, 0), (4, 3), &Buffer::new((4, 3), values))
        .expect("Failed to write band");

    path
}

/// GeoJSON polygon in EPSG:3413 covering the two western DEM columns
pub fn write_polygon(dir: &Path) -> PathBuf {
    let path = dir.join("outline.geojson");
    let geojson = r#"{
  "type": "FeatureCollection",
  "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3413"}},
  "features": [{
    "type": "Feature",
    "properties": {"name": "outline"},
    "geometry": {
      "type": "Polygon",
      "coordinates": [[
        [-200000.0, -2003000.0],
        [-198000.0, -2003000.0],
        [-198000.0, -1999000.0],
        [-200000.0, -1999000.0],
        [-200000.0, -2003000.0]
      ]]
    }
  }]
}"#;
    std::fs::write(&path, geojson).expect("Failed to write GeoJSON");
    path
}

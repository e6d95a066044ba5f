//! Python bindings, enabled with the `python` feature

use crate::core::pipeline::BeamOutcome;
use crate::types::{BoundingBox, PointSet, SimError, EPSG_GEODETIC};
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
use pyo3::exceptions::{PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(e: SimError) -> PyErr {
    match e {
        SimError::UnsupportedFormat(_) => PyTypeError::new_err(e.to_string()),
        SimError::InvalidProjection { .. } | SimError::Config(_) | SimError::LengthMismatch { .. } => {
            PyValueError::new_err(e.to_string())
        }
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyReferenceDem>()?;
    m.add_function(wrap_pyfunction!(segment_diff_filter, m)?)?;
    m.add_function(wrap_pyfunction!(orbit_type, m)?)?;
    m.add_function(wrap_pyfunction!(transform_coord, m)?)?;
    m.add_function(wrap_pyfunction!(gps2dyr, m)?)?;
    m.add_function(wrap_pyfunction!(read_atl06, m)?)?;
    m.add_function(wrap_pyfunction!(file_meta, m)?)?;
    Ok(())
}

#[pyfunction]
#[pyo3(signature = (dh_fit_dx, h_li, tol = 2.0))]
fn segment_diff_filter<'py>(
    py: Python<'py>,
    dh_fit_dx: PyReadonlyArray1<f64>,
    h_li: PyReadonlyArray1<f64>,
    tol: f64,
) -> PyResult<&'py PyArray1<bool>> {
    let mask = crate::core::segment_diff_filter(
        &dh_fit_dx.as_array().to_owned(),
        &h_li.as_array().to_owned(),
        tol,
    )
    .map_err(to_py_err)?;
    Ok(mask.into_pyarray(py))
}

#[pyfunction]
fn orbit_type<'py>(
    py: Python<'py>,
    time: PyReadonlyArray1<f64>,
    lat: PyReadonlyArray1<f64>,
) -> PyResult<&'py PyArray1<bool>> {
    let is_asc = crate::core::orbit_type(&time.as_array().to_owned(), &lat.as_array().to_owned())
        .map_err(to_py_err)?;
    Ok(is_asc.into_pyarray(py))
}

#[pyfunction]
fn transform_coord<'py>(
    py: Python<'py>,
    proj1: u32,
    proj2: u32,
    x: PyReadonlyArray1<f64>,
    y: PyReadonlyArray1<f64>,
) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
    let x = x.as_array().to_vec();
    let y = y.as_array().to_vec();
    let (tx, ty) = crate::core::transform_coord(proj1, proj2, &x, &y).map_err(to_py_err)?;
    Ok((tx.into_pyarray(py), ty.into_pyarray(py)))
}

#[pyfunction]
fn gps2dyr<'py>(py: Python<'py>, time: PyReadonlyArray1<f64>) -> &'py PyArray1<f64> {
    crate::core::gps2dyr(&time.as_array().to_owned()).into_pyarray(py)
}

/// Returns the paths of the written per-beam files
#[pyfunction]
#[pyo3(signature = (fname, epsg, outdir = "data", bbox = None))]
fn read_atl06(
    fname: &str,
    epsg: u32,
    outdir: &str,
    bbox: Option<(f64, f64, f64, f64)>,
) -> PyResult<Vec<String>> {
    let region = bbox
        .map(|(lonmin, latmin, lonmax, latmax)| {
            BoundingBox::new(lonmin, latmin, lonmax, latmax, EPSG_GEODETIC)
        })
        .transpose()
        .map_err(to_py_err)?;

    let reports = crate::core::read_atl06(fname, epsg, outdir, region).map_err(to_py_err)?;
    Ok(reports
        .into_iter()
        .filter_map(|r| match r.outcome {
            BeamOutcome::Written { path, .. } => Some(path.display().to_string()),
            _ => None,
        })
        .collect())
}

/// (rgt, date, cycle) per matching file name
#[pyfunction]
fn file_meta(filelist: Vec<String>) -> PyResult<Vec<(u32, String, u32)>> {
    let metas = crate::io::file_meta(&filelist).map_err(to_py_err)?;
    Ok(metas
        .into_iter()
        .map(|m| (m.rgt, m.date_string(), m.cycle))
        .collect())
}

/// Python wrapper for ReferenceDem
#[pyclass(name = "ReferenceDem")]
struct PyReferenceDem {
    inner: crate::io::ReferenceDem,
}

#[pymethods]
impl PyReferenceDem {
    #[new]
    fn new(dem_file_path: &str) -> PyResult<Self> {
        let inner = crate::io::ReferenceDem::open(dem_file_path).map_err(to_py_err)?;
        Ok(PyReferenceDem { inner })
    }

    #[getter]
    fn epsg(&self) -> u32 {
        self.inner.epsg()
    }

    #[getter]
    fn bbox(&self) -> (f64, f64, f64, f64) {
        self.inner.bbox().as_tuple()
    }

    fn calculate_bounding_box(&mut self, epsg: u32) -> PyResult<(f64, f64, f64, f64)> {
        let bbox = self.inner.bbox_in(epsg).map_err(to_py_err)?;
        Ok(bbox.as_tuple())
    }

    fn sample<'py>(
        &self,
        py: Python<'py>,
        x: PyReadonlyArray1<f64>,
        y: PyReadonlyArray1<f64>,
    ) -> PyResult<&'py PyArray1<f64>> {
        let points = PointSet::new(x.as_array().to_owned(), y.as_array().to_owned())
            .map_err(to_py_err)?;
        Ok(self.inner.sample(&points).into_pyarray(py))
    }

    /// Rows of (x, y, dem_elev, is2_elev, dem - is2)
    fn colocate_icesat2_dem_points(
        &self,
        x: PyReadonlyArray1<f64>,
        y: PyReadonlyArray1<f64>,
        h: PyReadonlyArray1<f64>,
    ) -> PyResult<Vec<(f64, f64, f64, f64, f64)>> {
        let points = PointSet::new(x.as_array().to_owned(), y.as_array().to_owned())
            .and_then(|p| p.with_column("h", h.as_array().to_owned()))
            .map_err(to_py_err)?;
        let rows = self.inner.compare(&points, "h").map_err(to_py_err)?;
        Ok(rows
            .into_iter()
            .map(|r| (r.x, r.y, r.dem_elev, r.is2_elev, r.diff))
            .collect())
    }

    fn __repr__(&self) -> String {
        let (min_x, min_y, max_x, max_y) = self.inner.bbox().as_tuple();
        format!(
            "ReferenceDem(path='{}', epsg={}, bbox=({}, {}, {}, {}))",
            self.inner.path().display(),
            self.inner.epsg(),
            min_x,
            min_y,
            max_x,
            max_y
        )
    }
}

//! OpenAltimetry ICESat-2 API client

use crate::config::ApiConfig;
use crate::types::{Beam, SimError, SimResult};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifiers parsed from an ATL06 granule name,
/// `ATL06_<datetime>_<rgt:4><cycle:2><region:2>_<release:3>_<version:2>.h5`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub rgt: u32,
    pub date: NaiveDate,
    pub cycle: u32,
    pub region: u32,
    pub release: String,
    pub version: String,
}

impl FileMeta {
    /// Acquisition date as `YYYY-MM-DD`
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

fn granule_regex() -> SimResult<Regex> {
    Regex::new(
        r"ATL06_(?P<date>\d{8})\d*_(?P<rgt>\d{4})(?P<cycle>\d{2})(?P<region>\d{2})_(?P<release>\d{3})_(?P<version>\d{2})\.h5",
    )
    .map_err(|e| SimError::Processing(format!("Invalid granule pattern: {}", e)))
}

/// Parse a single ATL06 granule name; `None` if it does not match
pub fn parse_file_meta(name: &str) -> SimResult<Option<FileMeta>> {
    let re = granule_regex()?;
    let Some(caps) = re.captures(name) else {
        return Ok(None);
    };

    let number = |key: &str| -> SimResult<u32> {
        caps[key]
            .parse()
            .map_err(|e| SimError::InvalidFormat(format!("Bad {} in {}: {}", key, name, e)))
    };

    let date = NaiveDate::parse_from_str(&caps["date"], "%Y%m%d")
        .map_err(|e| SimError::InvalidFormat(format!("Bad date in {}: {}", name, e)))?;

    Ok(Some(FileMeta {
        rgt: number("rgt")?,
        date,
        cycle: number("cycle")?,
        region: number("region")?,
        release: caps["release"].to_string(),
        version: caps["version"].to_string(),
    }))
}

/// Derive request parameters from granule names, skipping names that do not match
pub fn file_meta<S: AsRef<str>>(names: &[S]) -> SimResult<Vec<FileMeta>> {
    let mut metas = Vec::with_capacity(names.len());
    for name in names {
        match parse_file_meta(name.as_ref())? {
            Some(meta) => metas.push(meta),
            None => log::warn!("Not an ATL06 granule name: {}", name.as_ref()),
        }
    }
    Ok(metas)
}

/// One elevation sample returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPoint {
    pub lat: f64,
    pub lon: f64,
    pub h: f64,
    pub beam: Beam,
    pub cycle: u32,
    pub time: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    data: Vec<ApiEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    date: String,
    beams: Vec<ApiBeam>,
}

#[derive(Debug, Deserialize)]
struct ApiBeam {
    lat_lon_elev: Vec<[f64; 3]>,
}

/// Extract the samples of one beam from an API JSON body.
///
/// Only the first entry acquired on `date` is used; an empty result means the
/// beam has no data for that date.
pub fn parse_beam_response(body: &str, date: &str, beam: Beam, cycle: u32) -> SimResult<Vec<ApiPoint>> {
    let response: ApiResponse = serde_json::from_str(body)?;

    let Some(entry) = response.data.into_iter().find(|e| e.date == date) else {
        return Ok(Vec::new());
    };
    let first = entry
        .beams
        .into_iter()
        .next()
        .ok_or_else(|| SimError::InvalidFormat(format!("No beams in response for {}", date)))?;

    Ok(first
        .lat_lon_elev
        .into_iter()
        .map(|[lat, lon, h]| ApiPoint {
            lat,
            lon,
            h,
            beam,
            cycle,
            time: date.to_string(),
        })
        .collect())
}

/// Blocking OpenAltimetry client
pub struct OpenAltimetryClient {
    config: ApiConfig,
    client: reqwest::blocking::Client,
}

impl OpenAltimetryClient {
    pub fn new(config: ApiConfig) -> SimResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .user_agent(concat!("simlib/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Query parameters for one beam of one granule
    pub fn query_params(&self, meta: &FileMeta, beam: Beam) -> Vec<(&'static str, String)> {
        let bbox = &self.config.bbox;
        vec![
            ("product", self.config.product.clone()),
            ("startDate", meta.date_string()),
            ("minx", bbox.min_x.to_string()),
            ("miny", bbox.min_y.to_string()),
            ("maxx", bbox.max_x.to_string()),
            ("maxy", bbox.max_y.to_string()),
            ("trackId", meta.rgt.to_string()),
            ("beamName", beam.to_string()),
            ("outputFormat", "json".to_string()),
        ]
    }

    /// Request one beam; network and decoding errors propagate unchanged
    pub fn request_beam(&self, meta: &FileMeta, beam: Beam) -> SimResult<Vec<ApiPoint>> {
        let params = self.query_params(meta, beam);
        log::debug!("GET {} {:?}", self.config.base_url, params);

        let body = self
            .client
            .get(&self.config.base_url)
            .query(&params)
            .send()?
            .error_for_status()?
            .text()?;

        parse_beam_response(&body, &meta.date_string(), beam, meta.cycle)
    }

    /// Request all configured beams of one reference ground track
    pub fn request_track(&self, meta: &FileMeta) -> SimResult<Vec<ApiPoint>> {
        let mut points = Vec::new();
        for &beam in &self.config.beams {
            let beam_points = self.request_beam(meta, beam)?;
            if beam_points.is_empty() {
                log::info!("No data for RGT {} beam {} on {}", meta.rgt, beam, meta.date_string());
                continue;
            }
            points.extend(beam_points);
        }
        log::info!("Retrieved {} points for RGT {}", points.len(), meta.rgt);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    #[test]
    fn test_parse_file_meta() {
        let meta = parse_file_meta("/tmp/ATL06_20190221121851_08410203_003_01.h5")
            .unwrap()
            .unwrap();
        assert_eq!(meta.rgt, 841);
        assert_eq!(meta.cycle, 2);
        assert_eq!(meta.region, 3);
        assert_eq!(meta.release, "003");
        assert_eq!(meta.version, "01");
        assert_eq!(meta.date_string(), "2019-02-21");
    }

    #[test]
    fn test_rgt_keeps_trailing_zeros() {
        let meta = parse_file_meta("ATL06_20190101000000_01000210_003_01.h5").unwrap().unwrap();
        assert_eq!(meta.rgt, 100);
        assert_eq!(meta.cycle, 2);
    }

    #[test]
    fn test_file_meta_skips_unrelated_names() {
        let metas = file_meta(&["notes.txt", "ATL06_20190221121851_08410203_003_01.h5"]).unwrap();
        assert_eq!(metas.len(), 1);
    }

    #[test]
    fn test_parse_beam_response() {
        let body = r#"{"data": [
            {"date": "2019-02-20", "beams": [{"lat_lon_elev": [[1.0, 2.0, 3.0]]}]},
            {"date": "2019-02-21", "beams": [{"lat_lon_elev": [[69.1, -49.2, 1200.5], [69.2, -49.3, 1201.0]]}]}
        ]}"#;
        let points = parse_beam_response(body, "2019-02-21", Beam::Gt1r, 2).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].lat, 69.1);
        assert_eq!(points[0].lon, -49.2);
        assert_eq!(points[1].h, 1201.0);
        assert_eq!(points[1].beam, Beam::Gt1r);
        assert_eq!(points[1].time, "2019-02-21");
    }

    #[test]
    fn test_parse_beam_response_without_match() {
        let body = r#"{"data": [{"date": "2019-02-20", "beams": [{"lat_lon_elev": []}]}]}"#;
        assert!(parse_beam_response(body, "2019-02-21", Beam::Gt1l, 2).unwrap().is_empty());
        let empty = r#"{"data": [{"date": "2019-02-21", "beams": [{"lat_lon_elev": []}]}]}"#;
        assert!(parse_beam_response(empty, "2019-02-21", Beam::Gt1l, 2).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_response_propagates() {
        assert!(matches!(
            parse_beam_response(r#"{"error": "bad"}"#, "2019-02-21", Beam::Gt1l, 2),
            Err(SimError::Json(_))
        ));
        let no_beams = r#"{"data": [{"date": "2019-02-21", "beams": []}]}"#;
        assert!(parse_beam_response(no_beams, "2019-02-21", Beam::Gt1l, 2).is_err());
    }

    #[test]
    fn test_query_params() {
        let bbox = BoundingBox::new(-50.0, 68.5, -48.0, 70.0, 4326).unwrap();
        let client = OpenAltimetryClient::new(ApiConfig::new(bbox)).unwrap();
        let meta = parse_file_meta("ATL06_20190221121851_08410203_003_01.h5").unwrap().unwrap();
        let params = client.query_params(&meta, Beam::Gt3l);
        let get = |k: &str| params.iter().find(|(key, _)| *key == k).map(|(_, v)| v.clone());
        assert_eq!(get("product").as_deref(), Some("atl06"));
        assert_eq!(get("startDate").as_deref(), Some("2019-02-21"));
        assert_eq!(get("minx").as_deref(), Some("-50"));
        assert_eq!(get("maxy").as_deref(), Some("70"));
        assert_eq!(get("trackId").as_deref(), Some("841"));
        assert_eq!(get("beamName").as_deref(), Some("gt3l"));
        assert_eq!(get("outputFormat").as_deref(), Some("json"));
    }
}

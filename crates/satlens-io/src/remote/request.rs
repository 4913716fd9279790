use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};

use super::error::RemoteError;

/// Closed ring of `(lon, lat)` vertices delimiting the area of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    ring: Vec<[f64; 2]>,
}

impl Polygon {
    /// Create a polygon from a closed ring.
    ///
    /// # Errors
    ///
    /// The ring needs at least 4 finite vertices and its first and last
    /// vertices must be equal.
    pub fn new(ring: Vec<[f64; 2]>) -> Result<Self, RemoteError> {
        if ring.len() < 4 {
            return Err(RemoteError::InvalidRequest(format!(
                "polygon needs at least 4 vertices, got {}",
                ring.len()
            )));
        }

        if ring.iter().flatten().any(|v| !v.is_finite()) {
            return Err(RemoteError::InvalidRequest(
                "polygon has non-finite coordinates".to_string(),
            ));
        }

        if ring.first() != ring.last() {
            return Err(RemoteError::InvalidRequest(
                "polygon ring is not closed".to_string(),
            ));
        }

        Ok(Self { ring })
    }

    /// Axis aligned rectangle from its corners, in degrees.
    pub fn from_bbox(
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> Result<Self, RemoteError> {
        if !(min_lon < max_lon && min_lat < max_lat) {
            return Err(RemoteError::InvalidRequest(format!(
                "empty bounding box [{min_lon}, {min_lat}, {max_lon}, {max_lat}]"
            )));
        }

        Self::new(vec![
            [min_lon, min_lat],
            [max_lon, min_lat],
            [max_lon, max_lat],
            [min_lon, max_lat],
            [min_lon, min_lat],
        ])
    }

    /// Square of side `2 * half_extent` degrees centered on `(lon, lat)`.
    pub fn from_center(lon: f64, lat: f64, half_extent: f64) -> Result<Self, RemoteError> {
        Self::from_bbox(
            lon - half_extent,
            lat - half_extent,
            lon + half_extent,
            lat + half_extent,
        )
    }

    /// The vertices of the ring, first and last equal.
    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.ring
    }
}

/// Serializes as a GeoJSON polygon geometry.
impl Serialize for Polygon {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct GeoJsonPolygon<'a> {
            #[serde(rename = "type")]
            kind: &'static str,
            coordinates: [&'a [[f64; 2]]; 1],
        }

        GeoJsonPolygon {
            kind: "Polygon",
            coordinates: [&self.ring],
        }
        .serialize(serializer)
    }
}

/// Acquisition time interval, bounds included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range, `from` must not be after `to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, RemoteError> {
        if from > to {
            return Err(RemoteError::InvalidRequest(format!(
                "time range starts after it ends: {from} > {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Parse a time range from RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
    ///
    /// A plain `from` date starts at midnight and a plain `to` date ends at
    /// 23:59:59, so `2023-01-01`..`2023-01-31` covers the whole month.
    pub fn parse(from: &str, to: &str) -> Result<Self, RemoteError> {
        let from = parse_timestamp(from, START_OF_DAY)?;
        let to = parse_timestamp(to, END_OF_DAY)?;
        Self::new(from, to)
    }

    /// Start of the interval.
    pub fn start(&self) -> DateTime<Utc> {
        self.from
    }

    /// End of the interval.
    pub fn end(&self) -> DateTime<Utc> {
        self.to
    }
}

/// `(hour, minute, second)` given to a plain date.
const START_OF_DAY: (u32, u32, u32) = (0, 0, 0);
const END_OF_DAY: (u32, u32, u32) = (23, 59, 59);

fn parse_timestamp(s: &str, time_of_day: (u32, u32, u32)) -> Result<DateTime<Utc>, RemoteError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| RemoteError::InvalidRequest(format!("invalid timestamp '{s}': {e}")))?;

    let (h, m, sec) = time_of_day;
    date.and_hms_opt(h, m, sec)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| RemoteError::InvalidRequest(format!("invalid time of day {h}:{m}:{sec}")))
}

/// Data collection served by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DataCollection {
    /// Sentinel-2 level 2A, atmospherically corrected surface reflectance.
    #[default]
    #[serde(rename = "S2L2A")]
    Sentinel2L2A,
    /// Sentinel-2 level 1C, top of atmosphere reflectance.
    #[serde(rename = "S2L1C")]
    Sentinel2L1C,
}

impl FromStr for DataCollection {
    type Err = RemoteError;

    /// Accepts the provider identifiers `S2L2A` and `S2L1C`, or `l2a` and `l1c`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s2l2a" | "l2a" => Ok(DataCollection::Sentinel2L2A),
            "s2l1c" | "l1c" => Ok(DataCollection::Sentinel2L1C),
            _ => Err(RemoteError::InvalidRequest(format!(
                "unknown data collection '{s}', expected S2L2A or S2L1C"
            ))),
        }
    }
}

/// Rendering script evaluated by the provider for every output pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evalscript(String);

impl Evalscript {
    /// Wrap a custom script.
    pub fn new(script: impl Into<String>) -> Self {
        Self(script.into())
    }

    /// Script mapping each band, in order, to one output channel.
    ///
    /// # Errors
    ///
    /// Band names must be non-empty and alphanumeric.
    pub fn from_bands(bands: &[&str]) -> Result<Self, RemoteError> {
        if bands.is_empty() {
            return Err(RemoteError::InvalidRequest(
                "evalscript needs at least one band".to_string(),
            ));
        }

        if let Some(band) = bands
            .iter()
            .find(|b| b.is_empty() || !b.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(RemoteError::InvalidRequest(format!(
                "invalid band name '{band}'"
            )));
        }

        let inputs = bands
            .iter()
            .map(|b| format!("\"{b}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let samples = bands
            .iter()
            .map(|b| format!("sample.{b}"))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self(format!(
            "//VERSION=3\n\
             function setup() {{\n\
             \x20   return {{\n\
             \x20       input: [{inputs}],\n\
             \x20       output: {{ bands: {} }}\n\
             \x20   }};\n\
             }}\n\
             \n\
             function evaluatePixel(sample) {{\n\
             \x20   return [{samples}];\n\
             }}\n",
            bands.len()
        )))
    }

    /// True color rendering from the red, green and blue Sentinel-2 bands.
    pub fn true_color() -> Self {
        Self(
            "//VERSION=3\n\
             function setup() {\n\
             \x20   return {\n\
             \x20       input: [\"B04\", \"B03\", \"B02\"],\n\
             \x20       output: { bands: 3 }\n\
             \x20   };\n\
             }\n\
             \n\
             function evaluatePixel(sample) {\n\
             \x20   return [sample.B04, sample.B03, sample.B02];\n\
             }\n"
                .to_string(),
        )
    }

    /// The script source.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Evalscript {
    fn default() -> Self {
        Self::true_color()
    }
}

/// Parameters of one processing request.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    /// Area of interest.
    pub bounds: Polygon,
    /// Acquisition interval.
    pub time_range: TimeRange,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Data collection to render.
    pub collection: DataCollection,
    /// Rendering script.
    pub evalscript: Evalscript,
}

#[derive(Serialize)]
struct ProcessBody<'a> {
    input: ProcessInput<'a>,
    output: ProcessOutput,
    evalscript: &'a str,
}

#[derive(Serialize)]
struct ProcessInput<'a> {
    bounds: Bounds<'a>,
    data: [DataSource<'a>; 1],
}

#[derive(Serialize)]
struct Bounds<'a> {
    geometry: &'a Polygon,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataSource<'a> {
    #[serde(rename = "type")]
    collection: DataCollection,
    data_filter: DataFilter<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataFilter<'a> {
    time_range: &'a TimeRange,
}

#[derive(Serialize)]
struct ProcessOutput {
    width: u32,
    height: u32,
}

impl TileRequest {
    /// Request a true color tile of the default collection.
    pub fn true_color(bounds: Polygon, time_range: TimeRange, width: u32, height: u32) -> Self {
        Self {
            bounds,
            time_range,
            width,
            height,
            collection: DataCollection::default(),
            evalscript: Evalscript::true_color(),
        }
    }

    /// Check the request before anything is sent.
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.width == 0 || self.height == 0 {
            return Err(RemoteError::InvalidRequest(format!(
                "output size must be positive, got {}x{}",
                self.width, self.height
            )));
        }

        if self.evalscript.as_str().trim().is_empty() {
            return Err(RemoteError::InvalidRequest(
                "evalscript is empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The JSON body of the processing request.
    pub fn to_json(&self) -> Result<serde_json::Value, RemoteError> {
        let body = ProcessBody {
            input: ProcessInput {
                bounds: Bounds {
                    geometry: &self.bounds,
                },
                data: [DataSource {
                    collection: self.collection,
                    data_filter: DataFilter {
                        time_range: &self.time_range,
                    },
                }],
            },
            output: ProcessOutput {
                width: self.width,
                height: self.height,
            },
            evalscript: self.evalscript.as_str(),
        };

        serde_json::to_value(body)
            .map_err(|e| RemoteError::InvalidRequest(format!("failed to serialize request: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_validation() {
        assert!(Polygon::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]).is_err());
        assert!(Polygon::new(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).is_err());
        assert!(Polygon::new(vec![[0.0, 0.0], [f64::NAN, 0.0], [1.0, 1.0], [0.0, 0.0]]).is_err());
        assert!(Polygon::new(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]).is_ok());
        assert!(Polygon::from_bbox(1.0, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_polygon_from_center() -> Result<(), RemoteError> {
        let polygon = Polygon::from_center(-49.3759, -20.8111, 0.005)?;
        let v = polygon.vertices();

        assert_eq!(v.len(), 5);
        assert_eq!(v.first(), v.last());
        approx_eq(v[0][0], -49.3809);
        approx_eq(v[0][1], -20.8161);
        approx_eq(v[2][0], -49.3709);
        approx_eq(v[2][1], -20.8061);

        Ok(())
    }

    fn approx_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_time_range_parse() -> Result<(), RemoteError> {
        let range = TimeRange::parse("2023-01-01", "2023-01-31")?;
        assert_eq!(range.start().to_rfc3339(), "2023-01-01T00:00:00+00:00");
        assert_eq!(range.end().to_rfc3339(), "2023-01-31T23:59:59+00:00");

        let range = TimeRange::parse("2023-01-01T00:00:00Z", "2023-01-01T12:00:00+02:00")?;
        assert_eq!(range.end().to_rfc3339(), "2023-01-01T10:00:00+00:00");

        assert!(TimeRange::parse("2023-02-01", "2023-01-01").is_err());
        assert!(TimeRange::parse("yesterday", "2023-01-01").is_err());

        Ok(())
    }

    #[test]
    fn test_parse_timestamp_time_of_day() -> Result<(), RemoteError> {
        let end = parse_timestamp("2024-02-29", END_OF_DAY)?;
        assert_eq!(end.to_rfc3339(), "2024-02-29T23:59:59+00:00");

        assert!(matches!(
            parse_timestamp("2024-02-29", (24, 0, 0)),
            Err(RemoteError::InvalidRequest(_))
        ));

        Ok(())
    }

    #[test]
    fn test_data_collection_from_str() -> Result<(), RemoteError> {
        assert_eq!("S2L2A".parse::<DataCollection>()?, DataCollection::Sentinel2L2A);
        assert_eq!("l1c".parse::<DataCollection>()?, DataCollection::Sentinel2L1C);
        assert!("landsat".parse::<DataCollection>().is_err());
        Ok(())
    }

    #[test]
    fn test_evalscript_from_bands() -> Result<(), RemoteError> {
        let script = Evalscript::from_bands(&["B04", "B03", "B02"])?;
        assert_eq!(script, Evalscript::true_color());

        let script = Evalscript::from_bands(&["B08"])?;
        assert!(script.as_str().contains("input: [\"B08\"]"));
        assert!(script.as_str().contains("bands: 1"));
        assert!(script.as_str().contains("return [sample.B08];"));

        assert!(Evalscript::from_bands(&[]).is_err());
        assert!(Evalscript::from_bands(&["B04\"); alert("]).is_err());

        Ok(())
    }

    #[test]
    fn test_tile_request_json() -> Result<(), RemoteError> {
        let request = TileRequest::true_color(
            Polygon::from_bbox(0.0, 1.0, 2.0, 3.0)?,
            TimeRange::parse("2023-01-01", "2023-01-31")?,
            512,
            256,
        );
        request.validate()?;

        let body = request.to_json()?;

        assert_eq!(body["input"]["bounds"]["geometry"]["type"], "Polygon");
        assert_eq!(
            body["input"]["bounds"]["geometry"]["coordinates"],
            serde_json::json!([[[0.0, 1.0], [2.0, 1.0], [2.0, 3.0], [0.0, 3.0], [0.0, 1.0]]])
        );
        assert_eq!(body["input"]["data"][0]["type"], "S2L2A");
        assert_eq!(
            body["input"]["data"][0]["dataFilter"]["timeRange"],
            serde_json::json!({
                "from": "2023-01-01T00:00:00Z",
                "to": "2023-01-31T23:59:59Z",
            })
        );
        assert_eq!(body["output"], serde_json::json!({"width": 512, "height": 256}));
        assert_eq!(body["evalscript"], Evalscript::true_color().as_str());

        Ok(())
    }

    #[test]
    fn test_tile_request_zero_size() -> Result<(), RemoteError> {
        let request = TileRequest::true_color(
            Polygon::from_center(0.0, 0.0, 0.01)?,
            TimeRange::parse("2023-01-01", "2023-01-02")?,
            0,
            512,
        );
        assert!(matches!(
            request.validate(),
            Err(RemoteError::InvalidRequest(_))
        ));
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

/// A point in raster coordinates. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Four corner points, in the order the engine produced them.
pub type Quad = [Point; 4];

/// Axis-aligned rectangle as a quad: top-left, top-right, bottom-right, bottom-left.
pub fn rect_quad(left: f64, top: f64, width: f64, height: f64) -> Quad {
    [
        Point::new(left, top),
        Point::new(left + width, top),
        Point::new(left + width, top + height),
        Point::new(left, top + height),
    ]
}

/// One OCR engine output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Detection {
    #[serde(rename = "box")]
    #[schema(value_type = Vec<Vec<f64>>)]
    pub bbox: Quad,
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Detection {
    pub fn new(bbox: Quad, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GREEN: Color = Color::new(0, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn random() -> Self {
        let [r, g, b]: [u8; 3] = rand::random();
        Self { r, g, b }
    }

    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    /// Parses `r,g,b` with each channel in `0..=255`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channels = s
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid color '{s}': {e}"))?;

        match channels.as_slice() {
            [r, g, b] => Ok(Self::new(*r, *g, *b)),
            _ => Err(format!("invalid color '{s}': expected r,g,b")),
        }
    }
}

/// A detection that passed the confidence threshold, with its overlay color.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredDetection {
    pub detection: Detection,
    pub color: Color,
}

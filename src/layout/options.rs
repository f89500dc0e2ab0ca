//! Engraving options recognized by the curve engine
//!
//! Distances are expressed in drawing units (half a staff space) and scaled by
//! the unit of the staff a curve is drawn on.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ConfigError;

/// Configuration for curve positioning
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CurveOptions {
    /// Clearance kept between a curve and colliding obstacles
    pub slur_margin: f64,

    /// How far from the endpoints collisions still shift the endpoints (0..1)
    pub slur_endpoint_flexibility: f64,

    /// How strongly both control points are shifted alike (0..1)
    pub slur_symmetry: f64,

    /// Maximum slope of the chord, in degrees
    pub slur_max_slope: f64,

    /// Thickness at the middle of the curve
    pub slur_midpoint_thickness: f64,

    /// Thickness at the endpoints of the curve
    pub slur_endpoint_thickness: f64,

    pub slur_min_height: f64,
    pub slur_max_height: f64,

    /// Divisor turning the span into the initial height
    pub slur_height_factor: f64,

    /// Divisor turning the span into the initial control point offset
    pub slur_control_points: f64,

    /// Minimal departure angle at the endpoints, in degrees
    pub min_control_angle: f64,

    /// Minimal angle between both control directions seen from an endpoint
    pub convexity_angle: f64,

    /// Near-end collision metric that triggers secondary endpoints
    pub near_end_threshold: f64,
}

impl Default for CurveOptions {
    fn default() -> Self {
        Self {
            slur_margin: 1.0,
            slur_endpoint_flexibility: 0.0,
            slur_symmetry: 0.0,
            slur_max_slope: 60.0,
            slur_midpoint_thickness: 0.6,
            slur_endpoint_thickness: 0.1,
            slur_min_height: 1.2,
            slur_max_height: 3.0,
            slur_height_factor: 5.0,
            slur_control_points: 5.0,
            min_control_angle: 30.0,
            convexity_angle: 3.0,
            near_end_threshold: 1.0,
        }
    }
}

impl CurveOptions {
    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: CurveOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check every option against its admissible range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ranges: [(&'static str, f64, f64, f64); 13] = [
            ("slur_margin", self.slur_margin, 0.1, 3.0),
            ("slur_endpoint_flexibility", self.slur_endpoint_flexibility, 0.0, 1.0),
            ("slur_symmetry", self.slur_symmetry, 0.0, 1.0),
            ("slur_max_slope", self.slur_max_slope, 30.0, 85.0),
            ("slur_midpoint_thickness", self.slur_midpoint_thickness, 0.2, 1.2),
            ("slur_endpoint_thickness", self.slur_endpoint_thickness, 0.05, 0.25),
            ("slur_min_height", self.slur_min_height, 0.3, 10.0),
            ("slur_max_height", self.slur_max_height, self.slur_min_height, 20.0),
            ("slur_height_factor", self.slur_height_factor, 1.0, 100.0),
            ("slur_control_points", self.slur_control_points, 1.0, 10.0),
            ("min_control_angle", self.min_control_angle, 0.0, 60.0),
            ("convexity_angle", self.convexity_angle, 0.0, 20.0),
            ("near_end_threshold", self.near_end_threshold, 0.01, 100.0),
        ];

        for (name, value, min, max) in ranges {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CurveOptions::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = CurveOptions::from_json(r#"{ "slur_symmetry": 0.5 }"#).unwrap();
        assert_eq!(options.slur_symmetry, 0.5);
        assert_eq!(options.slur_margin, 1.0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = CurveOptions::from_json(r#"{ "slur_endpoint_flexibility": 1.5 }"#).unwrap_err();
        match err {
            ConfigError::OutOfRange { name, .. } => assert_eq!(name, "slur_endpoint_flexibility"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            CurveOptions::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "slur_max_slope": 45.0 }}"#).unwrap();
        let options = CurveOptions::from_file(file.path()).unwrap();
        assert_eq!(options.slur_max_slope, 45.0);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CurveOptions::from_file("/nonexistent/curve-options.json"),
            Err(ConfigError::Io(_))
        ));
    }
}

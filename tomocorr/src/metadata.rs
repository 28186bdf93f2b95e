//! Loader for plain-text distortion coefficient files.
//!
//! One value per line; the last whitespace-separated token of each line is
//! the value, anything before it is a free-form label:
//!
//! ```text
//! xcenter   1252.19
//! ycenter   1008.53
//! factor0   1.00021
//! factor1  -1.6e-06
//! ```
//!
//! Line 0 is the x center, line 1 the y center, the remaining lines are the
//! polynomial coefficients in ascending power.

use std::io;
use std::num::ParseFloatError;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("line {line}: can't parse '{text}' as a number")]
    Parse {
        line: usize,
        text: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("line {line} is empty")]
    EmptyLine { line: usize },

    #[error("expected at least 2 values (x center, y center), found {found}")]
    TooFewValues { found: usize },
}

/// Radial distortion model: `r_d = r_u * Σ coefficients[i] * r_u^i` around the center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistortionModel {
    pub x_center: f64,
    pub y_center: f64,
    pub coefficients: Vec<f64>,
}

impl DistortionModel {
    pub fn new(x_center: f64, y_center: f64, coefficients: Vec<f64>) -> Self {
        Self {
            x_center,
            y_center,
            coefficients,
        }
    }

    /// Model that maps every pixel onto itself.
    pub fn identity(x_center: f64, y_center: f64) -> Self {
        Self::new(x_center, y_center, vec![1.0])
    }

    /// Moves the center into the coordinates of a chunk whose origin is at `(x, y)`.
    pub fn shifted(&self, x_offset: f64, y_offset: f64) -> Self {
        Self {
            x_center: self.x_center - x_offset,
            y_center: self.y_center - y_offset,
            coefficients: self.coefficients.clone(),
        }
    }

    /// Evaluates `Σ coefficients[i] * r^i`. An empty coefficient list evaluates to 0.
    #[inline]
    pub fn factor(&self, radius: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * radius + c)
    }
}

/// Parses coefficient file contents.
pub fn parse(text: &str) -> std::result::Result<DistortionModel, MetadataError> {
    let mut values = Vec::new();
    for (line, content) in text.lines().enumerate() {
        let token = content
            .split_whitespace()
            .next_back()
            .ok_or(MetadataError::EmptyLine { line })?;
        let value = token
            .parse::<f64>()
            .map_err(|source| MetadataError::Parse {
                line,
                text: token.to_string(),
                source,
            })?;
        values.push(value);
    }

    if values.len() < 2 {
        return Err(MetadataError::TooFewValues {
            found: values.len(),
        });
    }

    let coefficients = values.split_off(2);
    Ok(DistortionModel::new(values[0], values[1], coefficients))
}

/// Reads and parses a coefficient file. Failures keep the underlying cause.
pub fn load(path: impl AsRef<Path>) -> Result<DistortionModel> {
    let path = path.as_ref();
    let model = std::fs::read_to_string(path)
        .map_err(MetadataError::from)
        .and_then(|text| parse(&text))
        .map_err(|source| Error::ResourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        path = %path.display(),
        x_center = model.x_center,
        y_center = model.y_center,
        coefficients = model.coefficients.len(),
        "distortion coefficients loaded"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_labelled_lines() {
        let model = parse("xc 12.5\nyc 7.25\nf0 1.0\nf1 0.0002\n").unwrap();
        assert_eq!(model.x_center, 12.5);
        assert_eq!(model.y_center, 7.25);
        assert_eq!(model.coefficients, vec![1.0, 0.0002]);
    }

    #[test]
    fn test_parse_takes_last_token() {
        let model = parse("x center = 3\n  y   center:   -4.5e1\n").unwrap();
        assert_eq!(model.x_center, 3.0);
        assert_eq!(model.y_center, -45.0);
        assert!(model.coefficients.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("xc 1\nyc abc\n"),
            Err(MetadataError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse("xc 1\n\nf0 1\n"),
            Err(MetadataError::EmptyLine { line: 1 })
        ));
        assert!(matches!(
            parse("xc 1\n"),
            Err(MetadataError::TooFewValues { found: 1 })
        ));
    }

    #[test]
    fn test_factor_horner() {
        let model = DistortionModel::new(0.0, 0.0, vec![1.0, 0.5, 0.25]);
        assert_eq!(model.factor(2.0), 1.0 + 1.0 + 1.0);
        assert_eq!(model.factor(0.0), 1.0);
        assert_eq!(DistortionModel::new(0.0, 0.0, vec![]).factor(3.0), 0.0);
    }

    #[test]
    fn test_shifted() {
        let model = DistortionModel::identity(10.0, 20.0).shifted(3.0, 5.0);
        assert_eq!((model.x_center, model.y_center), (7.0, 15.0));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "xc 12.5\nyc 7.25\nf0 1.0\nf1 0.0002").unwrap();
        let model = load(file.path()).unwrap();
        assert_eq!(model.coefficients, vec![1.0, 0.0002]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        match load(&path) {
            Err(Error::ResourceUnavailable { path: p, source }) => {
                assert_eq!(p, path);
                assert!(matches!(source, MetadataError::Io(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

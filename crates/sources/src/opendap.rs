//! Parser for OPeNDAP ASCII responses (`.ascii?var[a:b][c:d]...`).
//!
//! The GrADS Data Server prints the requested variable first, one line per
//! innermost row prefixed with its leading indices, followed by each
//! coordinate map as a `name, [len]` header and a single line of values:
//!
//! ```text
//! apcpsfc, [1][2][3]
//! [0][0], 0.0, 0.5, 1.0
//! [0][1], 2.0, 2.5, 3.0
//!
//! time, [1]
//! 738916.125
//! lat, [2]
//! -10.0, -9.75
//! lon, [3]
//! 104.5, 104.75, 105.0
//! ```

use std::collections::HashMap;

use crate::{Result, SourceError};

/// Values at or above this are the server's missing-value marker.
const MISSING_VALUE: f32 = 9.0e20;

/// A decoded array and its coordinate maps.
#[derive(Debug, Clone, PartialEq)]
pub struct OpendapArray {
    pub name: String,
    pub shape: Vec<usize>,
    /// Row-major values. Missing values are NaN.
    pub values: Vec<f32>,
    pub coords: HashMap<String, Vec<f64>>,
}

impl OpendapArray {
    pub fn coord(&self, name: &str) -> Option<&[f64]> {
        self.coords.get(name).map(Vec::as_slice)
    }
}

fn parse_error(message: impl ToString) -> SourceError {
    SourceError::decode("opendap ascii", message)
}

/// Parse `name, [a][b][c]` into the name and its dimensions.
fn parse_header(line: &str) -> Result<(String, Vec<usize>)> {
    let (name, dims) = line
        .split_once(',')
        .ok_or_else(|| parse_error(format!("bad header '{}'", line)))?;

    let shape = dims
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split("][")
        .map(|d| d.parse::<usize>().map_err(|_| parse_error(format!("bad dimensions in '{}'", line))))
        .collect::<Result<Vec<_>>>()?;

    if shape.is_empty() {
        return Err(parse_error(format!("no dimensions in '{}'", line)));
    }
    Ok((name.trim().to_string(), shape))
}

fn parse_values<T: std::str::FromStr>(line: &str) -> Result<Vec<T>> {
    line.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>().map_err(|_| parse_error(format!("bad value '{}'", v))))
        .collect()
}

/// Parse a single-variable ASCII response.
pub fn parse_ascii(body: &str) -> Result<OpendapArray> {
    let mut lines = body.lines().map(str::trim).skip_while(|l| l.is_empty());

    let header = lines.next().ok_or_else(|| parse_error("empty response"))?;
    let (name, shape) = parse_header(header)?;
    let expected: usize = shape.iter().product();
    let row_len = shape.last().copied().unwrap_or(0);

    let mut values = Vec::with_capacity(expected);
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
        // Rows of a 1-D variable carry no index prefix.
        let row = match line.strip_prefix('[') {
            Some(_) => line.split_once("],").map(|(_, rest)| rest).unwrap_or(""),
            None => line,
        };
        let row: Vec<f32> = parse_values(row)?;
        if row.len() != row_len {
            return Err(parse_error(format!("row has {} values, expected {}", row.len(), row_len)));
        }
        values.extend(row.into_iter().map(|v| if v.abs() >= MISSING_VALUE { f32::NAN } else { v }));
    }

    if values.len() != expected {
        return Err(parse_error(format!("{} values for shape {:?}", values.len(), shape)));
    }

    let mut coords = HashMap::new();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }
        let (coord, dims) = parse_header(line)?;
        let data = lines.next().ok_or_else(|| parse_error(format!("missing values for '{}'", coord)))?;
        let data: Vec<f64> = parse_values(data)?;
        if data.len() != dims[0] {
            return Err(parse_error(format!("'{}' has {} values, expected {}", coord, data.len(), dims[0])));
        }
        coords.insert(coord, data);
    }

    Ok(OpendapArray {
        name,
        shape,
        values,
        coords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "apcpsfc, [1][2][3]
[0][0], 0.0, 0.5, 1.0
[0][1], 2.0, 9.999E20, 3.0

time, [1]
738916.125
lat, [2]
-10.0, -9.75
lon, [3]
104.5, 104.75, 105.0
";

    #[test]
    fn test_parse_sample() {
        let array = parse_ascii(SAMPLE).unwrap();
        assert_eq!(array.name, "apcpsfc");
        assert_eq!(array.shape, vec![1, 2, 3]);
        assert_eq!(array.values.len(), 6);
        assert_eq!(array.values[3], 2.0);
        assert!(array.values[4].is_nan());
        assert_eq!(array.coord("lat"), Some(&[-10.0, -9.75][..]));
        assert_eq!(array.coord("lon").map(<[f64]>::len), Some(3));
    }

    #[test]
    fn test_short_row_is_error() {
        let body = "apcpsfc, [1][1][3]\n[0][0], 1.0, 2.0\n";
        assert!(parse_ascii(body).is_err());
    }

    #[test]
    fn test_error_page_is_error() {
        let body = "<html><body>GrADS Data Server error: invalid constraint</body></html>";
        assert!(matches!(parse_ascii(body), Err(SourceError::Decode { .. })));
    }
}

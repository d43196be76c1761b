use crate::error::{FetchError, Result};

/// Parse a station coordinate written as decimal degrees, `D:M:S`, or with a
/// hemisphere suffix (`40.5N`, `105:17:00W`).
///
/// # Examples
/// ```
/// use gridded_fetcher::utils::parse_coordinate;
///
/// assert!((parse_coordinate("40:30:00").unwrap() - 40.5).abs() < 1e-9);
/// assert!((parse_coordinate("105.25W").unwrap() + 105.25).abs() < 1e-9);
/// ```
pub fn parse_coordinate(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidCoordinate("empty coordinate".to_string()));
    }

    let (body, hemisphere_sign) = match trimmed.chars().last() {
        Some('N') | Some('n') | Some('E') | Some('e') => (&trimmed[..trimmed.len() - 1], 1.0),
        Some('S') | Some('s') | Some('W') | Some('w') => (&trimmed[..trimmed.len() - 1], -1.0),
        _ => (trimmed, 1.0),
    };
    let body = body.trim();

    let value = if body.contains(':') {
        sexagesimal_to_decimal(body)?
    } else {
        body.parse::<f64>().map_err(|_| {
            FetchError::InvalidCoordinate(format!("Invalid coordinate value: '{}'", raw))
        })?
    };

    if hemisphere_sign < 0.0 && value < 0.0 {
        return Err(FetchError::InvalidCoordinate(format!(
            "Coordinate '{}' is negative and has a S/W suffix",
            raw
        )));
    }

    Ok(value * hemisphere_sign)
}

fn sexagesimal_to_decimal(dms: &str) -> Result<f64> {
    let parts: Vec<&str> = dms.split(':').map(str::trim).collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(FetchError::InvalidCoordinate(format!(
            "Invalid DMS format: '{}'. Expected 'DD:MM' or 'DD:MM:SS'",
            dms
        )));
    }

    let parse = |s: &str, what: &str| {
        s.parse::<f64>().map_err(|_| {
            FetchError::InvalidCoordinate(format!("Invalid {} value: '{}'", what, s))
        })
    };

    let degrees = parse(parts[0], "degrees")?;
    let minutes = parse(parts[1], "minutes")?;
    let seconds = match parts.get(2) {
        Some(s) => parse(s, "seconds")?,
        None => 0.0,
    };

    for (value, what) in [(minutes, "Minutes"), (seconds, "Seconds")] {
        if !(0.0..60.0).contains(&value) {
            return Err(FetchError::InvalidCoordinate(format!(
                "{} must be between 0 and 60, got: {}",
                what, value
            )));
        }
    }

    let magnitude = degrees.abs() + minutes / 60.0 + seconds / 3600.0;
    if parts[0].starts_with('-') {
        Ok(-magnitude)
    } else {
        Ok(magnitude)
    }
}

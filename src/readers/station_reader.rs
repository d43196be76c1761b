use crate::error::{FetchError, Result};
use crate::models::{Station, StationRegistry};
use crate::utils::coordinates::parse_coordinate;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};
use validator::Validate;

/// Raw row of the station metadata file. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct StationRow {
    id: String,
    #[serde(default)]
    latitude: Option<String>,
    #[serde(default)]
    longitude: Option<String>,
}

pub struct StationReader {
    strict: bool,
}

impl StationReader {
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// In strict mode malformed coordinates fail the whole read instead of dropping the row.
    pub fn with_strict(strict: bool) -> Self {
        Self { strict }
    }

    /// Read the station registry from a headered CSV with `id`, `latitude`, `longitude`.
    pub fn read_stations(&self, path: &Path) -> Result<StationRegistry> {
        if !path.exists() {
            return Err(FetchError::StationRegistry(format!(
                "Station metadata file not found: {}",
                path.display()
            )));
        }
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        let registry = self.read_from(reader)?;
        info!(
            "Loaded {} stations from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn read_stations_from<R: Read>(&self, source: R) -> Result<StationRegistry> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        self.read_from(reader)
    }

    fn read_from<R: Read>(&self, mut reader: csv::Reader<R>) -> Result<StationRegistry> {
        let headers = reader.headers()?.clone();
        for required in ["id", "latitude", "longitude"] {
            if !headers.iter().any(|h| h == required) {
                return Err(FetchError::StationRegistry(format!(
                    "Station metadata is missing required column '{}'",
                    required
                )));
            }
        }

        let mut stations = Vec::new();
        let mut seen = HashSet::new();
        let mut dropped_missing = 0usize;

        for row in reader.deserialize::<StationRow>() {
            let row = row?;
            let (Some(lat), Some(lon)) = (non_empty(&row.latitude), non_empty(&row.longitude))
            else {
                dropped_missing += 1;
                continue;
            };

            let station = match (parse_coordinate(lat), parse_coordinate(lon)) {
                (Ok(latitude), Ok(longitude)) => Station {
                    id: row.id.clone(),
                    latitude,
                    longitude,
                },
                (Err(e), _) | (_, Err(e)) => {
                    if self.strict {
                        return Err(e);
                    }
                    warn!("Dropping station {}: {}", row.id, e);
                    continue;
                }
            };

            if let Err(e) = station.validate() {
                if self.strict {
                    return Err(e.into());
                }
                warn!("Dropping station {}: {}", station.id, e);
                continue;
            }

            if !seen.insert(station.id.clone()) {
                warn!("Dropping duplicate station id {}", station.id);
                continue;
            }
            stations.push(station);
        }

        if dropped_missing > 0 {
            debug!("Dropped {} stations without coordinates", dropped_missing);
        }

        Ok(StationRegistry::new(stations))
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_stations_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "id,name,latitude,longitude,elevation")?;
        writeln!(temp_file, "USC00050848,BOULDER,40.0354,-105.2803,1671")?;
        writeln!(temp_file, "USC00051294,CANON CITY,38:27:36,105:13:48W,1631")?;
        writeln!(temp_file, "USC00059999,NO COORDS,,,")?;

        let registry = StationReader::new().read_stations(temp_file.path())?;

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.stations()[0].id, "USC00050848");
        assert!((registry.stations()[1].latitude - 38.46).abs() < 1e-6);
        assert!((registry.stations()[1].longitude + 105.23).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_out_of_range_and_duplicates_are_dropped() -> Result<()> {
        let data = "id,latitude,longitude\nA,10,10\nB,95,10\nA,11,11\nC,-10,200\n";
        let registry = StationReader::new().read_stations_from(data.as_bytes())?;
        assert_eq!(registry.ids(), vec!["A".to_string()]);
        Ok(())
    }

    #[test]
    fn test_strict_mode_fails_on_bad_coordinate() {
        let data = "id,latitude,longitude\nA,abc,10\n";
        let result = StationReader::with_strict(true).read_stations_from(data.as_bytes());
        assert!(matches!(result, Err(FetchError::InvalidCoordinate(_))));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let data = "id,lat,lon\nA,1,1\n";
        let result = StationReader::new().read_stations_from(data.as_bytes());
        assert!(matches!(result, Err(FetchError::StationRegistry(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = StationReader::new().read_stations(Path::new("does/not/exist.csv"));
        assert!(matches!(result, Err(FetchError::StationRegistry(_))));
    }
}

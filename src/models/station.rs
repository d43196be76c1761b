use crate::service::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Station {
    #[validate(length(min = 1))]
    pub id: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl Station {
    pub fn new(id: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.to_string(),
            latitude,
            longitude,
        }
    }

    pub fn point(&self) -> Point {
        Point {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}

/// Validated, ordered set of sampling targets shared by every dataset in a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl StationRegistry {
    /// Build a registry, keeping the first occurrence of each id.
    pub fn new(stations: Vec<Station>) -> Self {
        let mut seen = HashSet::new();
        let stations = stations
            .into_iter()
            .filter(|s| seen.insert(s.id.clone()))
            .collect();
        Self { stations }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn ids(&self) -> Vec<String> {
        self.stations.iter().map(|s| s.id.clone()).collect()
    }

    pub fn points(&self) -> Vec<Point> {
        self.stations.iter().map(Station::point).collect()
    }

    pub fn get(&self, index: usize) -> Option<&Station> {
        self.stations.get(index)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_validation() {
        let station = Station::new("USC00050848", 40.0354, -105.2803);
        assert!(station.validate().is_ok());
        assert_eq!(station.point().longitude, -105.2803);
    }

    #[test]
    fn test_invalid_coordinates() {
        let station = Station::new("bad", 91.0, -0.1278);
        assert!(station.validate().is_err());

        let station = Station::new("", 10.0, 10.0);
        assert!(station.validate().is_err());
    }

    #[test]
    fn test_registry_drops_duplicate_ids() {
        let registry = StationRegistry::new(vec![
            Station::new("A", 1.0, 1.0),
            Station::new("B", 2.0, 2.0),
            Station::new("A", 3.0, 3.0),
        ]);
        assert_eq!(registry.ids(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(registry.get(0).unwrap().latitude, 1.0);
    }
}

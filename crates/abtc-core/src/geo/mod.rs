//! Barangay locations for the case-count map.
//!
//! Known barangays resolve to surveyed coordinates. Names missing from the
//! table get a stable placeholder point derived from the name, clamped to
//! the municipal bounding box, and are tagged [`LocationSource::Approximate`]
//! so the map can render them differently.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analytics::CountBucket;
use crate::models::Appointment;

/// Surveyed barangay centroids (name, lat, lng).
const KNOWN_BARANGAYS: [(&str, f64, f64); 10] = [
    ("Poblacion", 14.2794, 121.4156),
    ("San Isidro", 14.2861, 121.4239),
    ("San Jose", 14.2712, 121.4098),
    ("San Roque", 14.2903, 121.4071),
    ("Santa Cruz", 14.2657, 121.4212),
    ("Bagong Silang", 14.2968, 121.4302),
    ("Malinao", 14.2589, 121.4035),
    ("Mabini", 14.2826, 121.3987),
    ("Rizal", 14.2731, 121.4335),
    ("Santo Niño", 14.2998, 121.4160),
];

/// Municipal bounding box for placeholder points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min_lat: 14.2500,
            max_lat: 14.3100,
            min_lng: 121.3900,
            max_lng: 121.4400,
        }
    }
}

impl BoundingBox {
    /// Whether the point lies inside (edges included).
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }
}

/// Where a coordinate came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Surveyed coordinate from the table
    Known,
    /// Placeholder derived from the name
    Approximate,
}

/// A map coordinate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub source: LocationSource,
}

/// One map marker: a barangay with its case count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BarangayCases {
    pub name: String,
    pub location: GeoPoint,
    pub count: usize,
    /// count / max count, in 0..=1
    pub intensity: f64,
}

/// Resolves barangay names to coordinates.
pub struct BarangayLocator {
    /// Folded name → (display name, lat, lng)
    known: HashMap<String, (String, f64, f64)>,
    bounds: BoundingBox,
}

impl Default for BarangayLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl BarangayLocator {
    /// Locator over the built-in table and bounding box.
    pub fn new() -> Self {
        let known = KNOWN_BARANGAYS
            .iter()
            .map(|(name, lat, lng)| (fold(name), (name.to_string(), *lat, *lng)))
            .collect();
        Self {
            known,
            bounds: BoundingBox::default(),
        }
    }

    /// Add or replace a surveyed coordinate.
    pub fn add_known(&mut self, name: &str, lat: f64, lng: f64) {
        self.known
            .insert(fold(name), (name.trim().to_string(), lat, lng));
    }

    /// Bounding box used for placeholders.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Coordinate for a barangay name.
    pub fn locate(&self, name: &str) -> GeoPoint {
        let key = fold(name);
        if let Some((_, lat, lng)) = self.known.get(&key) {
            return GeoPoint {
                lat: *lat,
                lng: *lng,
                source: LocationSource::Known,
            };
        }
        self.placeholder(&key)
    }

    /// Display name: the table spelling for known barangays, else the trimmed input.
    pub fn display_name(&self, name: &str) -> String {
        let key = fold(name);
        self.known
            .get(&key)
            .map(|(display, _, _)| display.clone())
            .unwrap_or_else(|| name.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Case counts per barangay with map intensity, highest count first.
    pub fn case_counts(&self, appointments: &[Appointment]) -> Vec<BarangayCases> {
        let mut counts: HashMap<String, (String, usize)> = HashMap::new();
        for name in appointments.iter().filter_map(|a| a.barangay()) {
            counts
                .entry(fold(name))
                .or_insert_with(|| (self.display_name(name), 0))
                .1 += 1;
        }
        let buckets: Vec<CountBucket> = counts
            .into_values()
            .map(|(label, count)| CountBucket { label, count })
            .collect();
        self.markers(&buckets)
    }

    /// Map markers for pre-counted barangays.
    pub fn markers(&self, buckets: &[CountBucket]) -> Vec<BarangayCases> {
        let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);
        let mut markers: Vec<BarangayCases> = buckets
            .iter()
            .map(|b| BarangayCases {
                name: b.label.clone(),
                location: self.locate(&b.label),
                count: b.count,
                intensity: if max == 0 { 0.0 } else { b.count as f64 / max as f64 },
            })
            .collect();
        markers.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        markers
    }

    fn placeholder(&self, key: &str) -> GeoPoint {
        let hash = name_hash(key);
        // Two independent fractions from the low and high halves of the hash
        let lat_frac = (hash & 0xFFFF) as f64 / 65535.0;
        let lng_frac = ((hash >> 16) & 0xFFFF) as f64 / 65535.0;

        let b = &self.bounds;
        let lat = (b.min_lat + lat_frac * (b.max_lat - b.min_lat)).clamp(b.min_lat, b.max_lat);
        let lng = (b.min_lng + lng_frac * (b.max_lng - b.min_lng)).clamp(b.min_lng, b.max_lng);
        GeoPoint {
            lat,
            lng,
            source: LocationSource::Approximate,
        }
    }
}

/// Character-code string hash (h = h * 31 + c), wrapping at 32 bits.
fn name_hash(name: &str) -> u32 {
    name.chars()
        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32))
}

/// Lowercase with runs of whitespace collapsed.
fn fold(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BiteIncident, PatientInfo};
    use proptest::prelude::*;

    #[test]
    fn test_known_barangay_fixed() {
        let locator = BarangayLocator::new();
        let point = locator.locate("Poblacion");
        assert_eq!(point.source, LocationSource::Known);
        assert_eq!((point.lat, point.lng), (14.2794, 121.4156));

        let folded = locator.locate("  san   ISIDRO ");
        assert_eq!(folded.source, LocationSource::Known);
        assert_eq!((folded.lat, folded.lng), (14.2861, 121.4239));
    }

    #[test]
    fn test_unknown_barangay_deterministic() {
        let locator = BarangayLocator::new();
        let a = locator.locate("Barangay Uno");
        let b = locator.locate("Barangay Uno");
        assert_eq!(a, b);
        assert_eq!(a.source, LocationSource::Approximate);
        assert!(locator.bounds().contains(a.lat, a.lng));
        assert_ne!(locator.locate("Barangay Dos"), a);
    }

    #[test]
    fn test_add_known_overrides_placeholder() {
        let mut locator = BarangayLocator::new();
        assert_eq!(locator.locate("Lumbangan").source, LocationSource::Approximate);
        locator.add_known("Lumbangan", 14.26, 121.43);
        assert_eq!(locator.locate("lumbangan").source, LocationSource::Known);
    }

    #[test]
    fn test_case_counts_intensity() {
        let make = |b: &str| {
            let mut patient = PatientInfo::new("P");
            patient.barangay = Some(b.into());
            Appointment::new(patient, BiteIncident::new("dog"))
        };
        let appts = vec![make("Poblacion"), make("poblacion"), make("Mabini"), make("Nowhere")];
        let markers = BarangayLocator::new().case_counts(&appts);

        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].name, "Poblacion");
        assert_eq!(markers[0].count, 2);
        assert_eq!(markers[0].intensity, 1.0);
        assert_eq!(markers[1].intensity, 0.5);
        assert!(markers
            .iter()
            .any(|m| m.name == "Nowhere" && m.location.source == LocationSource::Approximate));
    }

    proptest! {
        #[test]
        fn prop_placeholder_in_bounds_and_stable(name in "[A-Za-z ñ]{1,24}") {
            let locator = BarangayLocator::new();
            let first = locator.locate(&name);
            let second = locator.locate(&name);
            prop_assert_eq!(first, second);
            prop_assert!(locator.bounds().contains(first.lat, first.lng));
        }
    }
}

//! Geospatial index over issue coordinates.
//!
//! Geohash cell buckets with haversine refinement: candidate cells are the
//! 3x3 neighborhood around the query point at a precision matched to the
//! radius, so the neighborhood always covers the query disk. Near the poles
//! the neighbor ring cannot be computed; the index falls back to scanning
//! every point, which stays correct.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use geohash::Coord;
use uuid::Uuid;

use civicsignal_common::{haversine_km, CivicSignalError, GeoPoint};

/// Bucket cells at geohash-6 (~1.2km x 0.6km).
const BUCKET_PRECISION: usize = 6;

/// Minimum cell dimension in km per geohash precision, index 0 = precision 1.
const MIN_CELL_KM: [f64; 6] = [4992.6, 624.1, 156.0, 19.5, 4.9, 0.61];

#[derive(Default)]
struct Cells {
    points: HashMap<Uuid, (f64, f64)>,
    buckets: HashMap<String, HashSet<Uuid>>,
}

pub struct GeoIndex {
    inner: RwLock<Cells>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Cells::default()),
        }
    }

    /// Register (or move) a point. Re-inserting an id replaces its previous
    /// position.
    pub fn insert(&self, id: Uuid, lat: f64, lng: f64) -> Result<(), CivicSignalError> {
        GeoPoint::new(lat, lng).validate()?;
        let cell = geohash::encode(Coord { x: lng, y: lat }, BUCKET_PRECISION)
            .map_err(|e| CivicSignalError::Validation(format!("ungeocodable point: {e}")))?;

        let mut inner = self.inner.write().expect("geo index lock poisoned");
        remove_locked(&mut inner, id);
        inner.points.insert(id, (lat, lng));
        inner.buckets.entry(cell).or_default().insert(id);
        Ok(())
    }

    pub fn remove(&self, id: Uuid) {
        let mut inner = self.inner.write().expect("geo index lock poisoned");
        remove_locked(&mut inner, id);
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("geo index lock poisoned").points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All points within `radius_km` of the query point, ascending by
    /// distance, ties broken by id.
    pub fn nearby(&self, lat: f64, lng: f64, radius_km: f64) -> Vec<(Uuid, f64)> {
        let radius_m = radius_km * 1000.0;
        let inner = self.inner.read().expect("geo index lock poisoned");

        let candidates: Vec<Uuid> = match candidate_ids(&inner, lat, lng, radius_km) {
            Some(ids) => ids,
            None => inner.points.keys().copied().collect(),
        };

        let mut hits: Vec<(Uuid, f64)> = candidates
            .into_iter()
            .filter_map(|id| {
                let (p_lat, p_lng) = inner.points.get(&id)?;
                let dist_km = haversine_km(lat, lng, *p_lat, *p_lng);
                (dist_km * 1000.0 <= radius_m).then_some((id, dist_km))
            })
            .collect();

        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits
    }
}

impl Default for GeoIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_locked(inner: &mut Cells, id: Uuid) {
    if let Some((lat, lng)) = inner.points.remove(&id) {
        if let Ok(cell) = geohash::encode(Coord { x: lng, y: lat }, BUCKET_PRECISION) {
            if let Some(bucket) = inner.buckets.get_mut(&cell) {
                bucket.remove(&id);
                if bucket.is_empty() {
                    inner.buckets.remove(&cell);
                }
            }
        }
    }
}

/// Ids in the 3x3 cell neighborhood around the query point. `None` means
/// the neighborhood is unusable (oversized radius or polar edge) and the
/// caller must scan everything.
fn candidate_ids(inner: &Cells, lat: f64, lng: f64, radius_km: f64) -> Option<Vec<Uuid>> {
    let precision = precision_for_radius(radius_km)?;
    let center = geohash::encode(Coord { x: lng, y: lat }, precision).ok()?;
    let ring = geohash::neighbors(&center).ok()?;

    let prefixes: HashSet<String> = [
        center, ring.n, ring.ne, ring.e, ring.se, ring.s, ring.sw, ring.w, ring.nw,
    ]
    .into_iter()
    .collect();

    let mut ids = Vec::new();
    for (cell, bucket) in &inner.buckets {
        if prefixes.contains(&cell[..precision.min(cell.len())]) {
            ids.extend(bucket.iter().copied());
        }
    }
    Some(ids)
}

/// Finest precision whose cell still dominates the radius. At that
/// precision the 3x3 neighborhood is guaranteed to cover the disk.
fn precision_for_radius(radius_km: f64) -> Option<usize> {
    if radius_km > MIN_CELL_KM[0] {
        return None;
    }
    let mut precision = 1;
    for (i, dim) in MIN_CELL_KM.iter().enumerate() {
        if *dim >= radius_km {
            precision = i + 1;
        } else {
            break;
        }
    }
    Some(precision.min(BUCKET_PRECISION))
}

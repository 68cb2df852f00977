//! Location bucketing and the bounding-box proximity filter.
//!
//! One degree is taken as 111 km on both axes, so boxes get narrower in real
//! longitude as latitude grows.

/// Meters per degree used by the proximity filter.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Search radius applied when only a center is given.
pub const DEFAULT_RADIUS_METERS: f64 = 10.0;

/// Builds the bucket key for a coordinate pair: `"{lat:.6}_{lon:.6}"`.
///
/// Points that agree to six decimals (roughly 0.11 m) share a key.
pub fn location_id(latitude: f64, longitude: f64) -> String {
    // -0.0 + 0.0 == +0.0, evita "-0.000000"
    format!("{:.6}_{:.6}", latitude + 0.0, longitude + 0.0)
}

/// Inclusive `[min, max]` box on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn around(latitude: f64, longitude: f64, radius_meters: f64) -> Self {
        let delta = radius_meters / METERS_PER_DEGREE;
        Self {
            min_lat: latitude - delta,
            max_lat: latitude + delta,
            min_lon: longitude - delta,
            max_lon: longitude + delta,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lon..=self.max_lon).contains(&longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_id_format() {
        assert_eq!(location_id(40.7128, -74.006), "40.712800_-74.006000");
        assert_eq!(location_id(1.0, 2.5), "1.000000_2.500000");
    }

    #[test]
    fn test_location_id_is_stable() {
        let first = location_id(-33.868820, 151.209296);
        for _ in 0..10 {
            assert_eq!(location_id(-33.868820, 151.209296), first);
        }
    }

    #[test]
    fn test_location_id_rounds_to_six_decimals() {
        assert_eq!(location_id(10.1234564, 20.1234566), "10.123456_20.123457");
        // dois pontos a menos de 0.11m caem no mesmo bucket
        assert_eq!(location_id(10.12345601, 20.0), location_id(10.12345604, 20.0));
    }

    #[test]
    fn test_negative_zero_shares_bucket() {
        assert_eq!(location_id(-0.0, -0.0), "0.000000_0.000000");
        assert_eq!(location_id(-0.0, 5.0), location_id(0.0, 5.0));
    }

    #[test]
    fn test_bounding_box_delta() {
        let bbox = BoundingBox::around(0.0, 0.0, 111_000.0);
        assert_eq!(bbox.min_lat, -1.0);
        assert_eq!(bbox.max_lat, 1.0);
        assert_eq!(bbox.min_lon, -1.0);
        assert_eq!(bbox.max_lon, 1.0);
    }

    #[test]
    fn test_bounding_box_is_inclusive() {
        let bbox = BoundingBox::around(10.0, 20.0, 111_000.0);
        assert!(bbox.contains(11.0, 21.0));
        assert!(bbox.contains(9.0, 19.0));
        assert!(bbox.contains(10.0, 20.0));
        assert!(!bbox.contains(11.0001, 20.0));
        assert!(!bbox.contains(10.0, 18.9999));
    }

    #[test]
    fn test_box_corner_is_accepted() {
        // canto do quadrado fica fora do círculo real, mas o filtro aceita
        let bbox = BoundingBox::around(0.0, 0.0, DEFAULT_RADIUS_METERS);
        let delta = DEFAULT_RADIUS_METERS / METERS_PER_DEGREE;
        assert!(bbox.contains(delta, delta));
    }
}

//! Geohash encoding and decoding.
//!
//! Bits alternate longitude/latitude starting with longitude, five bits per
//! base-32 character. A shorter hash of the same point is always a prefix of
//! a longer one.

use crate::error::LocatorError;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Precision used when writing records. Every stored geohash has this length.
pub const MAX_PRECISION: usize = 9;

/// Longest hash `encode` will produce (60 bits).
pub const PRECISION_LIMIT: usize = 12;

pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// The rectangle covered by a geohash cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Reject coordinates outside the WGS84 range (NaN included).
pub fn validate_coordinate(lat: f64, lon: f64) -> Result<(), LocatorError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) || !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(LocatorError::InvalidCoordinate { lat, lon });
    }
    Ok(())
}

/// Encode a coordinate as a geohash of `precision` characters.
pub fn encode(lat: f64, lon: f64, precision: usize) -> Result<String, LocatorError> {
    validate_coordinate(lat, lon)?;
    if !(1..=PRECISION_LIMIT).contains(&precision) {
        return Err(LocatorError::InvalidPrecision(precision));
    }

    let (mut lat_lo, mut lat_hi) = (MIN_LAT, MAX_LAT);
    let (mut lon_lo, mut lon_hi) = (MIN_LON, MAX_LON);
    let mut hash = String::with_capacity(precision);
    let mut even = true;

    while hash.len() < precision {
        let mut idx = 0usize;
        for _ in 0..5 {
            idx <<= 1;
            if even {
                let mid = (lon_lo + lon_hi) / 2.0;
                if lon >= mid {
                    idx |= 1;
                    lon_lo = mid;
                } else {
                    lon_hi = mid;
                }
            } else {
                let mid = (lat_lo + lat_hi) / 2.0;
                if lat >= mid {
                    idx |= 1;
                    lat_lo = mid;
                } else {
                    lat_hi = mid;
                }
            }
            even = !even;
        }
        hash.push(BASE32[idx] as char);
    }

    Ok(hash)
}

/// Encode at the write-time precision.
pub fn encode_full(lat: f64, lon: f64) -> Result<String, LocatorError> {
    encode(lat, lon, MAX_PRECISION)
}

/// Decode a geohash into the cell it covers.
pub fn decode_bbox(hash: &str) -> Result<BoundingBox, LocatorError> {
    if hash.is_empty() || hash.len() > PRECISION_LIMIT {
        return Err(LocatorError::InvalidGeohash(hash.to_string()));
    }

    let mut bbox = BoundingBox {
        min_lat: MIN_LAT,
        max_lat: MAX_LAT,
        min_lon: MIN_LON,
        max_lon: MAX_LON,
    };
    let mut even = true;

    for c in hash.bytes() {
        let value = base32_index(c).ok_or_else(|| LocatorError::InvalidGeohash(hash.to_string()))?;
        for shift in (0..5).rev() {
            let bit = (value >> shift) & 1 == 1;
            if even {
                let mid = (bbox.min_lon + bbox.max_lon) / 2.0;
                if bit {
                    bbox.min_lon = mid;
                } else {
                    bbox.max_lon = mid;
                }
            } else {
                let mid = (bbox.min_lat + bbox.max_lat) / 2.0;
                if bit {
                    bbox.min_lat = mid;
                } else {
                    bbox.max_lat = mid;
                }
            }
            even = !even;
        }
    }

    Ok(bbox)
}

/// Decode a geohash to the center of its cell.
pub fn decode(hash: &str) -> Result<(f64, f64), LocatorError> {
    decode_bbox(hash).map(|b| b.center())
}

fn base32_index(c: u8) -> Option<u8> {
    let c = c.to_ascii_lowercase();
    BASE32.iter().position(|&b| b == c).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_hashes() {
        assert_eq!(encode(57.64911, 10.40744, 11).unwrap(), "u4pruydqqvj");
        assert_eq!(encode(42.6, -5.6, 5).unwrap(), "ezs42");
        assert_eq!(encode_full(40.7128, -74.0060).unwrap(), "dr5regw3p");
    }

    #[test]
    fn test_full_precision_length() {
        assert_eq!(encode_full(0.0, 0.0).unwrap().len(), MAX_PRECISION);
    }

    #[test]
    fn test_coarser_hash_is_prefix() {
        let full = encode_full(-33.8688, 151.2093).unwrap();
        for p in 1..=MAX_PRECISION {
            assert_eq!(encode(-33.8688, 151.2093, p).unwrap(), full[..p]);
        }
    }

    #[test]
    fn test_extreme_corners() {
        assert_eq!(encode(90.0, 180.0, 9).unwrap(), "zzzzzzzzz");
        assert_eq!(encode(-90.0, -180.0, 9).unwrap(), "000000000");
    }

    #[test]
    fn test_invalid_coordinates() {
        assert!(matches!(encode(90.01, 0.0, 5), Err(LocatorError::InvalidCoordinate { .. })));
        assert!(matches!(encode(0.0, -180.5, 5), Err(LocatorError::InvalidCoordinate { .. })));
        assert!(matches!(encode(f64::NAN, 0.0, 5), Err(LocatorError::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_invalid_precision() {
        assert!(matches!(encode(0.0, 0.0, 0), Err(LocatorError::InvalidPrecision(0))));
        assert!(matches!(encode(0.0, 0.0, 13), Err(LocatorError::InvalidPrecision(13))));
    }

    #[test]
    fn test_decode_contains_source_point() {
        let bbox = decode_bbox("u4pruydqqvj").unwrap();
        assert!(bbox.contains(57.64911, 10.40744));
        let (lat, lon) = decode("ezs42").unwrap();
        assert!((lat - 42.605).abs() < 0.001);
        assert!((lon - -5.603).abs() < 0.001);
    }

    #[test]
    fn test_decode_rejects_bad_alphabet() {
        assert!(matches!(decode_bbox("ezs4a"), Err(LocatorError::InvalidGeohash(_))));
        assert!(matches!(decode_bbox(""), Err(LocatorError::InvalidGeohash(_))));
    }
}

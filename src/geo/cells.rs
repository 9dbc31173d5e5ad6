//! Geohash adjacency and the 3×3 candidate cell set around a query point.
//!
//! Neighbors are found by stepping one cell height/width from the cell
//! center and re-encoding at the same precision. Longitude wraps across the
//! antimeridian; latitude clamps at the poles, so the outward neighbor of a
//! polar row is the cell itself.

use serde::Serialize;

use super::geohash::{decode_bbox, encode, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
use crate::error::LocatorError;

/// The eight compass directions, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// (rows north, columns east)
    fn offset(self) -> (f64, f64) {
        match self {
            Self::North => (1.0, 0.0),
            Self::NorthEast => (1.0, 1.0),
            Self::East => (0.0, 1.0),
            Self::SouthEast => (-1.0, 1.0),
            Self::South => (-1.0, 0.0),
            Self::SouthWest => (-1.0, -1.0),
            Self::West => (0.0, -1.0),
            Self::NorthWest => (1.0, -1.0),
        }
    }
}

/// The adjacent cell of `hash` in `direction`, at the same precision.
pub fn neighbor(hash: &str, direction: Direction) -> Result<String, LocatorError> {
    let bbox = decode_bbox(hash)?;
    let (center_lat, center_lon) = bbox.center();
    let (rows, cols) = direction.offset();

    let lat = (center_lat + rows * bbox.height()).clamp(MIN_LAT, MAX_LAT);
    let mut lon = center_lon + cols * bbox.width();
    if lon > MAX_LON {
        lon -= 360.0;
    } else if lon < MIN_LON {
        lon += 360.0;
    }

    encode(lat, lon, hash.len())
}

/// All eight neighbors of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbors {
    pub n: String,
    pub ne: String,
    pub e: String,
    pub se: String,
    pub s: String,
    pub sw: String,
    pub w: String,
    pub nw: String,
}

pub fn neighbors(hash: &str) -> Result<Neighbors, LocatorError> {
    Ok(Neighbors {
        n: neighbor(hash, Direction::North)?,
        ne: neighbor(hash, Direction::NorthEast)?,
        e: neighbor(hash, Direction::East)?,
        se: neighbor(hash, Direction::SouthEast)?,
        s: neighbor(hash, Direction::South)?,
        sw: neighbor(hash, Direction::SouthWest)?,
        w: neighbor(hash, Direction::West)?,
        nw: neighbor(hash, Direction::NorthWest)?,
    })
}

/// The cell containing a query point plus its eight neighbors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellSet {
    pub precision: usize,
    pub center: String,
    pub neighbors: Neighbors,
}

impl CellSet {
    /// All nine cells: center first, then N, NE, E, SE, S, SW, W, NW.
    pub fn cells(&self) -> [&str; 9] {
        let n = &self.neighbors;
        [
            self.center.as_str(),
            n.n.as_str(),
            n.ne.as_str(),
            n.e.as_str(),
            n.se.as_str(),
            n.s.as_str(),
            n.sw.as_str(),
            n.w.as_str(),
            n.nw.as_str(),
        ]
    }

    /// The cells with coincident entries removed, first occurrence kept.
    /// Fewer than nine only near the poles or at very coarse precision.
    pub fn distinct(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(9);
        for cell in self.cells() {
            if !out.iter().any(|c| c == cell) {
                out.push(cell.to_string());
            }
        }
        out
    }
}

/// Compute the candidate cells to scan for a query at `precision`.
pub fn enumerate(lat: f64, lon: f64, precision: usize) -> Result<CellSet, LocatorError> {
    let center = encode(lat, lon, precision)?;
    let neighbors = neighbors(&center)?;
    Ok(CellSet {
        precision,
        center,
        neighbors,
    })
}

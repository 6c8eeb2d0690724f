//! Swarm summary derived from the last known robot positions.

use std::fmt;

use robot::flocking::centroid;
use robot::state::Position;

/// Axis-aligned box around every known robot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    /// Largest extent along either axis.
    pub fn spread(&self) -> f64 {
        (self.max.x - self.min.x).max(self.max.y - self.min.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwarmSummary {
    pub robots: usize,
    pub centroid: Option<Position>,
    pub bounds: Option<Bounds>,
}

pub fn summarize(positions: &[Position]) -> SwarmSummary {
    let bounds = positions.split_first().map(|(first, rest)| {
        rest.iter().fold(
            Bounds {
                min: *first,
                max: *first,
            },
            |b, p| Bounds {
                min: Position::new(b.min.x.min(p.x), b.min.y.min(p.y)),
                max: Position::new(b.max.x.max(p.x), b.max.y.max(p.y)),
            },
        )
    });

    SwarmSummary {
        robots: positions.len(),
        centroid: centroid(positions),
        bounds,
    }
}

impl fmt::Display for SwarmSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.centroid, self.bounds) {
            (Some(c), Some(b)) => write!(
                f,
                "{} robots, centroid ({:.1}, {:.1}), spread {:.1}",
                self.robots,
                c.x,
                c.y,
                b.spread()
            ),
            _ => write!(f, "no robots visible"),
        }
    }
}

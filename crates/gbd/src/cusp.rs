//! Cusp tracking.
//!
//! Cusps are the points of maximum chroma in the six primary and secondary
//! hue sectors. They are found with a three phase protocol:
//!
//! 1. `reset` clears any previous result
//! 2. candidates are added, either *general* points that compete for the
//!    nearest sector on chroma projected onto the sector hue, or *definite*
//!    points taken in red, yellow, green, cyan, blue, magenta order
//! 3. `finish` fixes the six cusps
//!
//! Six definite points take precedence over general candidates.

use tracing::{debug, trace};

use crate::coords::{self, ColorRep};
use crate::error::{GamutError, GamutResult};

/// Hue sector names, in cusp order.
pub const SECTOR_NAMES: [&str; 6] = ["RED", "YELLOW", "GREEN", "CYAN", "BLUE", "MAGENTA"];

/// How a cusp candidate is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuspPoint {
    /// Any boundary point; the best per sector wins.
    General,
    /// The cusp of the next sector in R, Y, G, C, B, M order.
    Definite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Accumulating,
    Finished,
}

/// Accumulates cusp candidates and holds the finished cusps.
#[derive(Debug, Clone, Default)]
pub struct CuspTracker {
    phase: Phase,
    general: [Option<(f64, [f64; 3])>; 6],
    definite: Vec<[f64; 3]>,
    cusps: Option<[[f64; 3]; 6]>,
}

impl CuspTracker {
    /// Clears candidates and cusps and starts accumulating.
    pub fn reset(&mut self) {
        *self = Self {
            phase: Phase::Accumulating,
            ..Self::default()
        };
    }

    /// Adds a candidate `[L, a, b]` point.
    pub fn add(&mut self, rep: ColorRep, lab: [f64; 3], kind: CuspPoint) {
        if self.phase != Phase::Accumulating {
            self.reset();
        }
        match kind {
            CuspPoint::Definite => {
                if self.definite.len() < 6 {
                    self.definite.push(lab);
                }
            }
            CuspPoint::General => {
                let chroma = lab[1].hypot(lab[2]);
                if chroma <= 0.0 || !chroma.is_finite() {
                    return;
                }
                let hue = coords::hue_degrees(lab);
                let (sector, dh) = nearest_sector(rep, hue);
                let score = chroma * dh.to_radians().cos();
                let slot = &mut self.general[sector];
                if slot.is_none_or(|(s, _)| score > s) {
                    trace!(sector = SECTOR_NAMES[sector], score, "cusp candidate");
                    *slot = Some((score, lab));
                }
            }
        }
    }

    /// Fixes the cusps from the accumulated candidates.
    pub fn finish(&mut self) -> GamutResult<()> {
        if self.phase == Phase::Idle {
            return Err(GamutError::NoCusps("no cusp candidates were added".into()));
        }
        let cusps = if self.definite.len() == 6 {
            std::array::from_fn(|i| self.definite[i])
        } else {
            let mut out = [[0.0; 3]; 6];
            for (i, slot) in self.general.iter().enumerate() {
                match slot {
                    Some((_, lab)) => out[i] = *lab,
                    None => {
                        return Err(GamutError::NoCusps(format!(
                            "no candidate in the {} sector",
                            SECTOR_NAMES[i].to_lowercase()
                        )));
                    }
                }
            }
            out
        };
        debug!("cusps finished");
        self.cusps = Some(cusps);
        self.phase = Phase::Finished;
        Ok(())
    }

    /// Installs finished cusps directly.
    pub fn set(&mut self, cusps: [[f64; 3]; 6]) {
        *self = Self {
            phase: Phase::Finished,
            cusps: Some(cusps),
            ..Self::default()
        };
    }

    /// The finished cusps, red to magenta.
    pub fn cusps(&self) -> Option<[[f64; 3]; 6]> {
        self.cusps
    }
}

/// Sector whose hue is closest to `hue`, and the difference in degrees.
fn nearest_sector(rep: ColorRep, hue: f64) -> (usize, f64) {
    let hues = rep.sector_hues();
    let mut best = (0, f64::INFINITY);
    for (i, &h) in hues.iter().enumerate() {
        let d = coords::hue_difference(hue, h);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

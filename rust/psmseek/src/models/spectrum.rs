use super::mass::PROTON;
use serde::{
    Deserialize,
    Serialize,
};

/// An observed MS2 spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub scan: u32,
    pub precursor_mz: f64,
    /// Candidate precursor charges. Empty means "try 2 and 3".
    #[serde(default)]
    pub charges: Vec<u8>,
    pub mz: Vec<f64>,
    pub intensity: Vec<f32>,
}

impl Spectrum {
    pub fn neutral_mass(&self, charge: u8) -> f64 {
        (self.precursor_mz - PROTON) * charge as f64
    }

    pub fn peaks(&self) -> impl Iterator<Item = (f64, f32)> + '_ {
        self.mz.iter().copied().zip(self.intensity.iter().copied())
    }

    pub fn max_peak_mz(&self) -> f64 {
        self.mz.iter().copied().fold(0.0, f64::max)
    }

    pub fn charges_to_search(&self) -> Vec<u8> {
        if self.charges.is_empty() {
            vec![2, 3]
        } else {
            self.charges.clone()
        }
    }
}

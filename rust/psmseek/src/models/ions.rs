use super::mass::{
    MASS_CO_MONO,
    MASS_H2O_MONO,
    PROTON,
    residue_mass,
};
use super::peptide::Peptide;
use crate::traits::IonPredictor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IonType {
    A,
    B,
    Y,
}

/// A single predicted fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ion {
    pub ion_type: IonType,
    pub charge: u8,
    /// Number of residues in the fragment.
    pub cleavage_idx: usize,
    pub mz: f64,
    /// Carries a neutral loss or modification.
    pub modified: bool,
}

/// Which ion types a scorer wants predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IonConstraint {
    /// b and y ions.
    Sp,
    /// b, y and a ions.
    Xcorr,
}

impl IonConstraint {
    pub fn allows(&self, ion_type: IonType) -> bool {
        match self {
            IonConstraint::Sp => matches!(ion_type, IonType::B | IonType::Y),
            IonConstraint::Xcorr => true,
        }
    }
}

/// Reusable buffer of predicted ions for one peptide at one precursor charge.
#[derive(Debug, Clone, Default)]
pub struct IonSeries {
    charge: u8,
    ions: Vec<Ion>,
}

impl IonSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the buffer, keeping the allocation.
    pub fn reset(&mut self, charge: u8) {
        self.charge = charge;
        self.ions.clear();
    }

    pub fn push(&mut self, ion: Ion) {
        self.ions.push(ion);
    }

    pub fn charge(&self) -> u8 {
        self.charge
    }

    pub fn len(&self) -> usize {
        self.ions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ion> {
        self.ions.iter()
    }

    pub fn of_type(&self, ion_type: IonType) -> impl Iterator<Item = &Ion> {
        self.ions.iter().filter(move |x| x.ion_type == ion_type)
    }

    /// Highest fragment charge for a precursor charge.
    pub fn max_ion_charge(precursor_charge: u8) -> u8 {
        precursor_charge.saturating_sub(1).max(1)
    }
}

/// Unmodified b/y/a ladders from monoisotopic residue masses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequestIonPredictor;

impl IonPredictor for SequestIonPredictor {
    fn predict(
        &self,
        peptide: &Peptide,
        charge: u8,
        constraint: IonConstraint,
        series: &mut IonSeries,
    ) {
        series.reset(charge);
        let residues: Vec<f64> = peptide
            .sequence()
            .bytes()
            .map(|r| residue_mass(r).unwrap_or(0.0))
            .collect();
        let n = residues.len();
        if n < 2 {
            return;
        }

        // prefix[i] is the mass of the first i residues.
        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0);
        for r in residues.iter() {
            prefix.push(prefix[prefix.len() - 1] + r);
        }
        let total = prefix[n];

        for z in 1..=IonSeries::max_ion_charge(charge) {
            let zf = z as f64;
            for cleavage_idx in 1..n {
                let b_neutral = prefix[cleavage_idx];
                let y_neutral = total - prefix[n - cleavage_idx] + MASS_H2O_MONO;

                series.push(Ion {
                    ion_type: IonType::B,
                    charge: z,
                    cleavage_idx,
                    mz: (b_neutral + zf * PROTON) / zf,
                    modified: false,
                });
                series.push(Ion {
                    ion_type: IonType::Y,
                    charge: z,
                    cleavage_idx,
                    mz: (y_neutral + zf * PROTON) / zf,
                    modified: false,
                });
                if constraint.allows(IonType::A) {
                    series.push(Ion {
                        ion_type: IonType::A,
                        charge: z,
                        cleavage_idx,
                        mz: (b_neutral - MASS_CO_MONO + zf * PROTON) / zf,
                        modified: false,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladders() {
        let pep = Peptide::new("GAK", vec![]).unwrap();
        let mut series = IonSeries::new();
        SequestIonPredictor.predict(&pep, 2, IonConstraint::Sp, &mut series);
        // Charge 2 precursor only yields singly charged fragments.
        assert_eq!(series.len(), 4);
        assert_eq!(series.of_type(IonType::A).count(), 0);

        let b1 = series.of_type(IonType::B).next().unwrap();
        assert_eq!(b1.cleavage_idx, 1);
        assert!((b1.mz - (57.021_464 + PROTON)).abs() < 1e-6);

        let y1 = series.of_type(IonType::Y).next().unwrap();
        assert!((y1.mz - (128.094_963 + MASS_H2O_MONO + PROTON)).abs() < 1e-6);

        SequestIonPredictor.predict(&pep, 3, IonConstraint::Xcorr, &mut series);
        assert_eq!(series.charge(), 3);
        assert_eq!(series.len(), 12);
        assert_eq!(series.of_type(IonType::A).count(), 4);
    }
}

use super::MatchCollection;
use crate::errors::MatchCollectionError;
use rand::Rng;
use std::ops::{
    Deref,
    DerefMut,
};

/// Matches drawn for distribution fitting. When the request covers the
/// whole collection no copy is made.
#[derive(Debug)]
pub enum Sample<'a> {
    Whole(&'a mut MatchCollection),
    Drawn(MatchCollection),
}

impl Deref for Sample<'_> {
    type Target = MatchCollection;

    fn deref(&self) -> &Self::Target {
        match self {
            Sample::Whole(x) => x,
            Sample::Drawn(x) => x,
        }
    }
}

impl DerefMut for Sample<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Sample::Whole(x) => x,
            Sample::Drawn(x) => x,
        }
    }
}

impl MatchCollection {
    /// Draws `n` matches uniformly with replacement. The drawn collection
    /// shares the matches, so scores written through it are visible here.
    pub fn random_sample<R: Rng + ?Sized>(
        &mut self,
        n: usize,
        rng: &mut R,
    ) -> Result<Sample<'_>, MatchCollectionError> {
        self.check_unlocked("sample")?;
        let total = self.len();
        if n >= total {
            return Ok(Sample::Whole(self));
        }

        let mut drawn = MatchCollection::new(self.charge(), self.is_decoy(), n);
        for _ in 0..n {
            let idx = (rng.gen_range(0.0..1.0) * total as f64) as usize;
            drawn.push_handle(self.matches[idx.min(total - 1)].clone())?;
        }
        drawn.set_experiment_size(self.experiment_size());
        drawn.scored = self.scored;
        Ok(Sample::Drawn(drawn))
    }
}

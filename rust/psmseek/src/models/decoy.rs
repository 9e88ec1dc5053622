use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// The different labels that denote if a sequence is a decoy or not.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, std::hash::Hash, PartialOrd, Ord)]
pub enum DecoyMarking {
    Target,
    ReversedDecoy,
    ShuffledDecoy,
}

impl DecoyMarking {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecoyMarking::Target => "Target",
            DecoyMarking::ReversedDecoy => "Decoy",
            DecoyMarking::ShuffledDecoy => "Decoy",
        }
    }

    pub fn is_decoy(&self) -> bool {
        match self {
            DecoyMarking::Target => false,
            DecoyMarking::ReversedDecoy => true,
            DecoyMarking::ShuffledDecoy => true,
        }
    }

    pub fn is_target(&self) -> bool {
        !self.is_decoy()
    }
}

/// How the peptides of one decoy set are derived from the targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoyStrategy {
    Reverse,
    Shuffle { seed: u64 },
}

impl DecoyStrategy {
    /// Set 1 is reversed, sets 2 and 3 are shuffled with distinct seeds.
    pub fn for_set(set_idx: usize) -> Self {
        match set_idx {
            0 | 1 => DecoyStrategy::Reverse,
            k => DecoyStrategy::Shuffle { seed: k as u64 },
        }
    }

    pub fn marking(&self) -> DecoyMarking {
        match self {
            DecoyStrategy::Reverse => DecoyMarking::ReversedDecoy,
            DecoyStrategy::Shuffle { .. } => DecoyMarking::ShuffledDecoy,
        }
    }

    pub fn apply(&self, sequence: &str) -> String {
        match self {
            DecoyStrategy::Reverse => as_decoy_string(sequence),
            DecoyStrategy::Shuffle { seed } => as_shuffled_string(sequence, *seed),
        }
    }
}

/// Reverses the sequence, keeping both termini in place.
pub(crate) fn as_decoy_string(sequence: &str) -> String {
    if sequence.len() < 3 {
        return sequence.to_string();
    }
    let mut sequence = sequence.to_string();
    let inner_rev = sequence[1..(sequence.len() - 1)]
        .chars()
        .rev()
        .collect::<String>();
    sequence.replace_range(1..(sequence.len() - 1), &inner_rev);
    sequence
}

/// Shuffles the residues between the termini. The seed is mixed with the
/// sequence so equal seeds do not shuffle every peptide the same way.
pub(crate) fn as_shuffled_string(sequence: &str, seed: u64) -> String {
    if sequence.len() < 4 {
        return as_decoy_string(sequence);
    }
    let seq_seed = sequence
        .bytes()
        .fold(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15), |acc, b| {
            acc.rotate_left(5) ^ (b as u64)
        });
    let mut rng = ChaCha8Rng::seed_from_u64(seq_seed);
    let bytes = sequence.as_bytes();
    let mut inner = bytes[1..bytes.len() - 1].to_vec();
    inner.shuffle(&mut rng);

    let mut out = String::with_capacity(sequence.len());
    out.push(bytes[0] as char);
    out.extend(inner.into_iter().map(|b| b as char));
    out.push(bytes[bytes.len() - 1] as char);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoy() {
        let sequence = "PEPTIDEPINK";
        let decoy = as_decoy_string(sequence);
        assert_eq!(sequence, "PEPTIDEPINK");
        assert_eq!(decoy, "PNIPEDITPEK");
    }

    #[test]
    fn test_short_sequences_do_not_panic() {
        assert_eq!(as_decoy_string("K"), "K");
        assert_eq!(as_decoy_string("GK"), "GK");
        assert_eq!(as_shuffled_string("GAK", 3), "GAK");
    }

    #[test]
    fn test_shuffle_keeps_composition_and_termini() {
        let sequence = "PEPTIDEPINK";
        let shuffled = as_shuffled_string(sequence, 2);
        assert_eq!(shuffled.len(), sequence.len());
        assert!(shuffled.starts_with('P'));
        assert!(shuffled.ends_with('K'));

        let mut a: Vec<u8> = shuffled.bytes().collect();
        let mut b: Vec<u8> = sequence.bytes().collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);

        // Deterministic for a given seed.
        assert_eq!(shuffled, as_shuffled_string(sequence, 2));
    }

    #[test]
    fn test_strategy_per_set() {
        assert_eq!(DecoyStrategy::for_set(1), DecoyStrategy::Reverse);
        assert_eq!(DecoyStrategy::for_set(3), DecoyStrategy::Shuffle { seed: 3 });
        assert!(DecoyStrategy::for_set(2).marking().is_decoy());
    }
}

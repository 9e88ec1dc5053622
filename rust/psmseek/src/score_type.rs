use serde::{
    Deserialize,
    Serialize,
};

/// Number of distinct score types. Also the number of scored-type flags
/// written per spectrum in a `.csm` file.
pub const SCORE_TYPE_COUNT: usize = 14;

/// Every score a match can carry.
///
/// The declaration order is significant: it is the index used for the
/// per-match score/rank slots and the order of the scored-type flags on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreType {
    Sp,
    Xcorr,
    Dotp,
    LogpExpSp,
    LogpBonfExpSp,
    LogpWeibullSp,
    LogpBonfWeibullSp,
    LogpWeibullXcorr,
    LogpBonfWeibullXcorr,
    LogpEvdXcorr,
    LogpBonfEvdXcorr,
    QValue,
    PercolatorScore,
    LogpQvalueWeibullXcorr,
}

/// Score types that share one relative ordering. Sorting by any member sorts
/// by the family key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortFamily {
    Xcorr,
    Sp,
    Percolator,
}

impl ScoreType {
    pub const ALL: [ScoreType; SCORE_TYPE_COUNT] = [
        ScoreType::Sp,
        ScoreType::Xcorr,
        ScoreType::Dotp,
        ScoreType::LogpExpSp,
        ScoreType::LogpBonfExpSp,
        ScoreType::LogpWeibullSp,
        ScoreType::LogpBonfWeibullSp,
        ScoreType::LogpWeibullXcorr,
        ScoreType::LogpBonfWeibullXcorr,
        ScoreType::LogpEvdXcorr,
        ScoreType::LogpBonfEvdXcorr,
        ScoreType::QValue,
        ScoreType::PercolatorScore,
        ScoreType::LogpQvalueWeibullXcorr,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// `None` for DOTP, which has no defined order.
    pub fn sort_family(self) -> Option<SortFamily> {
        match self {
            ScoreType::Dotp => None,
            ScoreType::Xcorr
            | ScoreType::LogpEvdXcorr
            | ScoreType::LogpBonfEvdXcorr
            | ScoreType::LogpWeibullXcorr
            | ScoreType::LogpBonfWeibullXcorr => Some(SortFamily::Xcorr),
            ScoreType::Sp
            | ScoreType::LogpExpSp
            | ScoreType::LogpBonfExpSp
            | ScoreType::LogpWeibullSp
            | ScoreType::LogpBonfWeibullSp
            | ScoreType::LogpQvalueWeibullXcorr => Some(SortFamily::Sp),
            ScoreType::QValue | ScoreType::PercolatorScore => Some(SortFamily::Percolator),
        }
    }

    /// The raw score a calibrated p-value is derived from.
    pub fn prerequisite(self) -> Option<ScoreType> {
        match self {
            ScoreType::LogpExpSp
            | ScoreType::LogpBonfExpSp
            | ScoreType::LogpWeibullSp
            | ScoreType::LogpBonfWeibullSp => Some(ScoreType::Sp),
            ScoreType::LogpWeibullXcorr
            | ScoreType::LogpBonfWeibullXcorr
            | ScoreType::LogpEvdXcorr
            | ScoreType::LogpBonfEvdXcorr => Some(ScoreType::Xcorr),
            ScoreType::LogpQvalueWeibullXcorr => Some(ScoreType::LogpBonfWeibullXcorr),
            _ => None,
        }
    }

    pub fn is_p_value(self) -> bool {
        matches!(
            self,
            ScoreType::LogpExpSp
                | ScoreType::LogpBonfExpSp
                | ScoreType::LogpWeibullSp
                | ScoreType::LogpBonfWeibullSp
                | ScoreType::LogpWeibullXcorr
                | ScoreType::LogpBonfWeibullXcorr
                | ScoreType::LogpEvdXcorr
                | ScoreType::LogpBonfEvdXcorr
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreType::Sp => "sp",
            ScoreType::Xcorr => "xcorr",
            ScoreType::Dotp => "dotp",
            ScoreType::LogpExpSp => "logp_exp_sp",
            ScoreType::LogpBonfExpSp => "logp_bonf_exp_sp",
            ScoreType::LogpWeibullSp => "logp_weibull_sp",
            ScoreType::LogpBonfWeibullSp => "logp_bonf_weibull_sp",
            ScoreType::LogpWeibullXcorr => "logp_weibull_xcorr",
            ScoreType::LogpBonfWeibullXcorr => "logp_bonf_weibull_xcorr",
            ScoreType::LogpEvdXcorr => "logp_evd_xcorr",
            ScoreType::LogpBonfEvdXcorr => "logp_bonf_evd_xcorr",
            ScoreType::QValue => "q_value",
            ScoreType::PercolatorScore => "percolator_score",
            ScoreType::LogpQvalueWeibullXcorr => "logp_qvalue_weibull_xcorr",
        }
    }
}

impl std::fmt::Display for ScoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bitmap of the score types computed for every match of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScoredTypes(u16);

impl ScoredTypes {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(&self, score_type: ScoreType) -> bool {
        self.0 & (1 << score_type.index()) != 0
    }

    pub(crate) fn insert(&mut self, score_type: ScoreType) {
        self.0 |= 1 << score_type.index();
    }

    pub(crate) fn set(&mut self, score_type: ScoreType, value: bool) {
        if value {
            self.insert(score_type);
        } else {
            self.0 &= !(1 << score_type.index());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ScoreType> + '_ {
        ScoreType::ALL.into_iter().filter(|x| self.contains(*x))
    }

    /// Flags in declaration order.
    pub fn as_flags(&self) -> [bool; SCORE_TYPE_COUNT] {
        std::array::from_fn(|i| self.0 & (1 << i) != 0)
    }

    pub fn from_flags(flags: &[bool; SCORE_TYPE_COUNT]) -> Self {
        let mut out = Self::empty();
        for (st, flag) in ScoreType::ALL.iter().zip(flags.iter()) {
            out.set(*st, *flag);
        }
        out
    }
}

//! Binary result files (`.csm`).
//!
//! Little endian throughout. A file header (`num_spectra`, a zero spectrum
//! feature count, `matches_per_spectrum`) is followed by one block per
//! spectrum: charge, match count, delta_cn, ln(delta_cn), ln(experiment
//! size), the scored-type flags, and the top match records.

use crate::collection::MatchCollection;
use crate::errors::{
    MatchCollectionError,
    PsmSeekError,
    SerializationError,
};
use crate::models::{
    DecoyMarking,
    Match,
    MatchRecord,
    Peptide,
    SpectrumRef,
};
use crate::score_type::{
    SCORE_TYPE_COUNT,
    ScoreType,
    ScoredTypes,
};
use std::io::{
    Read,
    Seek,
    SeekFrom,
    Write,
};
use std::sync::Arc;
use tracing::{
    debug,
    error,
};

type SerResult<T> = std::result::Result<T, SerializationError>;

/// One spectrum's block, detached from its (non-`Send`) collection so it
/// can be produced on a worker thread and written elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumRecord {
    pub charge: u8,
    pub match_total: usize,
    pub delta_cn: f32,
    pub experiment_size: usize,
    pub scored: ScoredTypes,
    /// Best first by the score type the record was taken by.
    pub matches: Vec<MatchRecord>,
}

impl SpectrumRecord {
    /// Snapshots the top `top_match` matches of `collection` ordered by
    /// `score_type`.
    pub fn from_collection(
        collection: &mut MatchCollection,
        score_type: ScoreType,
        top_match: usize,
    ) -> Result<Self, MatchCollectionError> {
        let matches = collection
            .iter(score_type, true)?
            .take(top_match)
            .map(|m| m.to_record())
            .collect();
        Ok(Self {
            charge: collection.charge(),
            match_total: collection.len(),
            delta_cn: collection.delta_cn(),
            experiment_size: collection.experiment_size(),
            scored: collection.scored_types(),
            matches,
        })
    }
}

pub struct CsmWriter<W: Write + Seek> {
    inner: W,
    num_spectra: i32,
    matches_per_spectrum: usize,
}

impl<W: Write + Seek> CsmWriter<W> {
    /// Writes the header with a placeholder spectrum count, patched by
    /// [`Self::finish`].
    pub fn new(mut inner: W, matches_per_spectrum: usize) -> SerResult<Self> {
        write_i32(&mut inner, 0)?;
        write_i32(&mut inner, 0)?;
        write_i32(&mut inner, matches_per_spectrum as i32)?;
        Ok(Self {
            inner,
            num_spectra: 0,
            matches_per_spectrum,
        })
    }

    pub fn matches_per_spectrum(&self) -> usize {
        self.matches_per_spectrum
    }

    pub fn num_spectra(&self) -> usize {
        self.num_spectra as usize
    }

    pub fn write_collection(
        &mut self,
        collection: &mut MatchCollection,
        score_type: ScoreType,
    ) -> Result<(), PsmSeekError> {
        let record =
            SpectrumRecord::from_collection(collection, score_type, self.matches_per_spectrum)?;
        self.write_record(&record)?;
        Ok(())
    }

    pub fn write_record(&mut self, record: &SpectrumRecord) -> SerResult<()> {
        let w = &mut self.inner;
        write_i32(w, record.charge as i32)?;
        write_i32(w, record.match_total as i32)?;
        write_f32(w, record.delta_cn)?;
        write_f32(w, record.delta_cn.ln())?;
        write_f32(w, (record.experiment_size as f32).ln())?;
        for flag in record.scored.as_flags() {
            write_i32(w, flag as i32)?;
        }
        for m in record.matches.iter().take(self.matches_per_spectrum) {
            write_match(w, m)?;
        }
        self.num_spectra += 1;
        Ok(())
    }

    /// Patches the spectrum count into the header and hands back the sink.
    pub fn finish(mut self) -> SerResult<W> {
        let end = self.inner.stream_position().map_err(io_err("Error seeking result file"))?;
        self.inner
            .seek(SeekFrom::Start(0))
            .map_err(io_err("Error seeking result file"))?;
        write_i32(&mut self.inner, self.num_spectra)?;
        self.inner
            .seek(SeekFrom::Start(end))
            .map_err(io_err("Error seeking result file"))?;
        self.inner.flush().map_err(io_err("Error flushing result file"))?;
        debug!("Wrote {} spectra", self.num_spectra);
        Ok(self.inner)
    }
}

fn write_match<W: Write>(w: &mut W, m: &MatchRecord) -> SerResult<()> {
    let seq = m.peptide.sequence().as_bytes();
    let seq_len = u16::try_from(seq.len()).map_err(|_| SerializationError::InvalidRecord {
        context: format!("sequence longer than {} residues", u16::MAX),
    })?;
    write_bytes(w, &seq_len.to_le_bytes())?;
    write_bytes(w, seq)?;
    write_f32(w, m.peptide.mass() as f32)?;
    write_bytes(w, &[decoy_to_byte(m.peptide.decoy())])?;

    let proteins = m.peptide.proteins();
    let n_prot = u16::try_from(proteins.len()).map_err(|_| SerializationError::InvalidRecord {
        context: format!("more than {} proteins", u16::MAX),
    })?;
    write_bytes(w, &n_prot.to_le_bytes())?;
    for p in proteins {
        write_bytes(w, &p.to_le_bytes())?;
    }

    write_i32(w, m.spectrum.scan as i32)?;
    write_f32(w, m.spectrum.precursor_mz as f32)?;
    for score in m.scores.iter() {
        match score {
            Some(x) => {
                write_bytes(w, &[1])?;
                write_f32(w, *x)?;
            }
            None => {
                write_bytes(w, &[0])?;
                write_f32(w, 0.0)?;
            }
        }
    }
    for rank in m.ranks.iter() {
        write_bytes(w, &rank.to_le_bytes())?;
    }
    write_bytes(w, &m.b_y_ions_matched.to_le_bytes())?;
    write_bytes(w, &m.b_y_ions_possible.to_le_bytes())?;
    Ok(())
}

fn read_match<R: Read>(r: &mut R, charge: u8) -> SerResult<MatchRecord> {
    let seq_len = u16::from_le_bytes(read_array(r, "reading sequence length")?) as usize;
    let mut seq = vec![0u8; seq_len];
    read_exact(r, &mut seq, "reading sequence")?;
    let sequence = String::from_utf8(seq).map_err(|e| SerializationError::InvalidRecord {
        context: format!("sequence is not UTF-8: {}", e),
    })?;
    let mass = read_f32(r, "reading peptide mass")?;
    let [decoy_byte] = read_array(r, "reading decoy flag")?;
    let decoy = decoy_from_byte(decoy_byte)?;

    let n_prot = u16::from_le_bytes(read_array(r, "reading protein count")?) as usize;
    let mut proteins = Vec::with_capacity(n_prot);
    for _ in 0..n_prot {
        proteins.push(u32::from_le_bytes(read_array(r, "reading protein index")?));
    }

    let scan = read_i32(r, "reading scan")?;
    let precursor_mz = read_f32(r, "reading precursor m/z")?;
    let mut scores = [None; SCORE_TYPE_COUNT];
    for score in scores.iter_mut() {
        let [present] = read_array(r, "reading score flag")?;
        let value = read_f32(r, "reading score")?;
        *score = (present != 0).then_some(value);
    }
    let mut ranks = [0u32; SCORE_TYPE_COUNT];
    for rank in ranks.iter_mut() {
        *rank = u32::from_le_bytes(read_array(r, "reading rank")?);
    }
    let b_y_ions_matched = u32::from_le_bytes(read_array(r, "reading matched ions")?);
    let b_y_ions_possible = u32::from_le_bytes(read_array(r, "reading possible ions")?);

    Ok(MatchRecord {
        peptide: Arc::new(Peptide::from_parts(
            &sequence,
            mass as f64,
            proteins,
            decoy,
        )),
        spectrum: SpectrumRef {
            scan: scan as u32,
            precursor_mz: precursor_mz as f64,
        },
        charge,
        scores,
        ranks,
        b_y_ions_matched,
        b_y_ions_possible,
    })
}

impl MatchCollection {
    /// Appends every spectrum of a `.csm` stream to this post-process
    /// collection. Returns the number of spectra read.
    pub fn extend<R: Read>(&mut self, mut reader: R) -> Result<usize, PsmSeekError> {
        self.post_process_state("extend from a result file")?;
        let r = &mut reader;
        let num_spectra = read_i32(r, "reading spectrum count")?;
        let _num_spectrum_features = read_i32(r, "reading spectrum feature count")?;
        let matches_per_spectrum = read_i32(r, "reading matches per spectrum")?;
        if num_spectra < 0 || matches_per_spectrum < 0 {
            return Err(SerializationError::InvalidRecord {
                context: format!(
                    "negative header values ({} spectra, {} matches per spectrum)",
                    num_spectra, matches_per_spectrum
                ),
            }
            .into());
        }

        for _ in 0..num_spectra {
            let charge = read_i32(r, "reading charge")?;
            let match_total = read_i32(r, "reading match total")?;
            let delta_cn = read_f32(r, "reading delta_cn")?;
            let ln_delta_cn = read_f32(r, "reading ln delta_cn")?;
            let ln_experiment_size = read_f32(r, "reading ln experiment size")?;
            let mut flags = [false; SCORE_TYPE_COUNT];
            for flag in flags.iter_mut() {
                *flag = read_i32(r, "reading scored type flags")? != 0;
            }
            let charge = u8::try_from(charge).map_err(|_| SerializationError::InvalidRecord {
                context: format!("charge {} out of range", charge),
            })?;

            if !self.reconcile_scored_types(ScoredTypes::from_flags(&flags))? {
                error!(
                    "Scored types of the spectrum at charge {} do not match the collection",
                    charge
                );
            }
            self.set_charge(charge);
            self.set_delta_cn(delta_cn);

            let to_read = match_total.max(0).min(matches_per_spectrum) as usize;
            for _ in 0..to_read {
                let record = read_match(r, charge)?;
                let m = Match::from_record(record);
                m.stamp_spectrum_fields(delta_cn, ln_delta_cn, ln_experiment_size);
                self.add_match(m)?;
            }
        }
        debug!(
            "Read {} spectra, collection now holds {} matches",
            num_spectra,
            self.len()
        );
        Ok(num_spectra as usize)
    }
}

fn decoy_to_byte(x: DecoyMarking) -> u8 {
    match x {
        DecoyMarking::Target => 0,
        DecoyMarking::ReversedDecoy => 1,
        DecoyMarking::ShuffledDecoy => 2,
    }
}

fn decoy_from_byte(x: u8) -> SerResult<DecoyMarking> {
    match x {
        0 => Ok(DecoyMarking::Target),
        1 => Ok(DecoyMarking::ReversedDecoy),
        2 => Ok(DecoyMarking::ShuffledDecoy),
        other => Err(SerializationError::InvalidRecord {
            context: format!("unknown decoy flag {}", other),
        }),
    }
}

fn io_err(context: &'static str) -> impl Fn(std::io::Error) -> SerializationError {
    move |source| SerializationError::Io { source, context }
}

fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> SerResult<()> {
    w.write_all(bytes).map_err(io_err("Error writing result file"))
}

fn write_i32<W: Write>(w: &mut W, x: i32) -> SerResult<()> {
    write_bytes(w, &x.to_le_bytes())
}

fn write_f32<W: Write>(w: &mut W, x: f32) -> SerResult<()> {
    write_bytes(w, &x.to_le_bytes())
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8], context: &'static str) -> SerResult<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => SerializationError::Truncated { context },
        _ => SerializationError::Io { source: e, context },
    })
}

fn read_array<const N: usize, R: Read>(r: &mut R, context: &'static str) -> SerResult<[u8; N]> {
    let mut buf = [0u8; N];
    read_exact(r, &mut buf, context)?;
    Ok(buf)
}

fn read_i32<R: Read>(r: &mut R, context: &'static str) -> SerResult<i32> {
    Ok(i32::from_le_bytes(read_array(r, context)?))
}

fn read_f32<R: Read>(r: &mut R, context: &'static str) -> SerResult<f32> {
    Ok(f32::from_le_bytes(read_array(r, context)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::P_VALUE_NA;
    use std::io::Cursor;

    fn scored_collection() -> MatchCollection {
        let mut coll = MatchCollection::new(3, false, 100);
        for (i, (seq, xcorr)) in [("PEPTIDEK", 4.0f32), ("ELVISK", 1.5), ("GGGR", 3.0)]
            .iter()
            .enumerate()
        {
            let pep = Arc::new(Peptide::new(seq, vec![i as u32, 10]).unwrap());
            let m = Match::new(
                pep,
                SpectrumRef {
                    scan: 42,
                    precursor_mz: 612.5,
                },
                3,
            )
            .with_ion_stats(3, 8);
            m.set_score(ScoreType::Sp, 50.0 + i as f32);
            m.set_score(ScoreType::Xcorr, *xcorr);
            coll.add_match(m).unwrap();
        }
        coll.set_experiment_size(25);
        coll.mark_scored(ScoreType::Sp).unwrap();
        coll.mark_scored(ScoreType::Xcorr).unwrap();
        coll.populate_ranks(ScoreType::Xcorr).unwrap();
        coll.update_delta_cn().unwrap();
        coll
    }

    #[test]
    fn test_header_is_patched() {
        let mut coll = scored_collection();
        let mut writer = CsmWriter::new(Cursor::new(Vec::new()), 2).unwrap();
        writer.write_collection(&mut coll, ScoreType::Xcorr).unwrap();
        writer.write_collection(&mut coll, ScoreType::Xcorr).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert_eq!(i32::from_le_bytes(bytes[0..4].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(bytes[4..8].try_into().unwrap()), 0);
        assert_eq!(i32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
        // Spectrum block: charge then match_total.
        assert_eq!(i32::from_le_bytes(bytes[12..16].try_into().unwrap()), 3);
        assert_eq!(i32::from_le_bytes(bytes[16..20].try_into().unwrap()), 3);
    }

    #[test]
    fn test_read_back() {
        let mut coll = scored_collection();
        let mut writer = CsmWriter::new(Cursor::new(Vec::new()), 2).unwrap();
        writer.write_collection(&mut coll, ScoreType::Xcorr).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut merged = MatchCollection::new_post_process(false, 100);
        assert_eq!(merged.extend(&bytes[..]).unwrap(), 1);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.charge(), 3);
        assert_eq!(merged.delta_cn(), 1.0);
        assert_eq!(merged.scored_types(), coll.scored_types());
        assert!(merged.scored_types_reconciled());

        let best = &merged.matches()[0];
        assert_eq!(best.peptide().sequence(), "PEPTIDEK");
        assert_eq!(best.score(ScoreType::Xcorr), Some(4.0));
        assert_eq!(best.rank(ScoreType::Xcorr), 1);
        assert_eq!(best.charge(), 3);
        assert_eq!(best.delta_cn(), 1.0);
        assert!((best.ln_experiment_size() - 25f32.ln()).abs() < 1e-6);
        assert_eq!(best.b_y_ions_matched(), 3);
        assert!(!best.has_score(ScoreType::Dotp));
        assert_eq!(merged.protein_counter(10).unwrap(), 2);
    }

    #[test]
    fn test_na_survives() {
        let rec_coll = scored_collection();
        rec_coll.matches()[0].set_score(ScoreType::LogpBonfWeibullXcorr, P_VALUE_NA);
        let mut buf = Vec::new();
        write_match(&mut buf, &rec_coll.matches()[0].to_record()).unwrap();
        let back = read_match(&mut &buf[..], 3).unwrap();
        assert!(back.scores[ScoreType::LogpBonfWeibullXcorr.index()]
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_truncated_input() {
        let mut coll = scored_collection();
        let mut writer = CsmWriter::new(Cursor::new(Vec::new()), 5).unwrap();
        writer.write_collection(&mut coll, ScoreType::Xcorr).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut merged = MatchCollection::new_post_process(false, 100);
        let err = merged.extend(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(
            err,
            PsmSeekError::Serialization(SerializationError::Truncated { .. })
        ));
    }

    #[test]
    fn test_extend_needs_post_process() {
        let mut coll = MatchCollection::new(2, false, 10);
        assert!(matches!(
            coll.extend(&[0u8; 12][..]),
            Err(PsmSeekError::MatchCollection(
                MatchCollectionError::NotPostProcess { .. }
            ))
        ));
    }
}

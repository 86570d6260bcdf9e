//! Mapping 2D basecalled bases to the events of each strand.
//!
//! The basecaller aligns template and complement events to the kmers of the
//! 2D read, one row per alignment column. Rows can lack an event on either
//! strand (`-1` in the raw table), the same kmer can be repeated on consecutive
//! rows, and the 2D sequence itself can drift out of sync with the table. We
//! walk the 2D read once and assign an event of both strands to every base.
use crate::error::MappingError;
use crate::model::Strand;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Number of times the last event is repeated at the end of a 1D strand map.
pub const STRAND_MAP_PADDING: usize = 5;

/// A row of the 2D alignment table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i64, i64, String)", into = "(i64, i64, String)")]
pub struct AlignmentRow {
    pub template: Option<usize>,
    pub complement: Option<usize>,
    pub kmer: String,
}

impl AlignmentRow {
    pub fn new(template: Option<usize>, complement: Option<usize>, kmer: &str) -> Self {
        Self {
            template,
            complement,
            kmer: kmer.to_string(),
        }
    }
}

fn to_index(raw: i64) -> Option<usize> {
    if raw < 0 {
        None
    } else {
        Some(raw as usize)
    }
}

fn to_raw(idx: Option<usize>) -> i64 {
    idx.map(|i| i as i64).unwrap_or(-1)
}

impl std::convert::From<(i64, i64, String)> for AlignmentRow {
    fn from((template, complement, kmer): (i64, i64, String)) -> Self {
        Self {
            template: to_index(template),
            complement: to_index(complement),
            kmer,
        }
    }
}

impl std::convert::From<AlignmentRow> for (i64, i64, String) {
    fn from(row: AlignmentRow) -> Self {
        (to_raw(row.template), to_raw(row.complement), row.kmer)
    }
}

/// Kmers of `seq` with stride one. Windows shorter than `k` are not yielded.
pub fn kmer_iter(seq: &[u8], k: usize) -> impl Iterator<Item = &[u8]> {
    let k = k.max(1);
    seq.windows(k)
}

/// Template and complement event index of every base of a 2D read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventMaps {
    pub template: Vec<usize>,
    pub complement: Vec<usize>,
}

impl EventMaps {
    pub fn len(&self) -> usize {
        self.template.len()
    }
    pub fn is_empty(&self) -> bool {
        self.template.is_empty()
    }
    pub fn get(&self, strand: Strand) -> &[usize] {
        match strand {
            Strand::Template => &self.template,
            Strand::Complement => &self.complement,
        }
    }
}

fn resolve(last: Option<usize>, strand: Strand, position: usize) -> Result<usize, MappingError> {
    last.ok_or(MappingError::Unresolved { strand, position })
}

/// Assign a template and a complement event to each base of `consensus`.
///
/// The kmer length is the length of the kmer on the first row. For each kmer
/// of the consensus, rows repeating the previously consumed kmer are skipped
/// (the first of a run is always the one used). Then,
/// - if the kmer matches the row, the row is consumed. A missing template
///   event opens a gap, which is filled with the next aligned template event;
///   a missing complement event is replaced by the last aligned one.
/// - otherwise, the last aligned events of both strands are reused and the row
///   is kept for the next kmer.
///
/// The last `k-1` bases, which do not start a kmer, take the last aligned
/// events. Every error is fatal for the read.
pub fn map_events(consensus: &[u8], rows: &[AlignmentRow]) -> Result<EventMaps, MappingError> {
    let k = match rows.first() {
        Some(row) if !row.kmer.is_empty() => row.kmer.len(),
        _ => return Err(MappingError::EmptyAlignment),
    };
    let mut template = Vec::with_capacity(consensus.len());
    let mut complement = Vec::with_capacity(consensus.len());
    let mut row = 0;
    let mut prev_kmer: Option<&[u8]> = None;
    let mut template_gaps = 0;
    let mut last_template = None;
    let mut last_complement = None;
    for (position, kmer) in kmer_iter(consensus, k).enumerate() {
        let mut current = rows
            .get(row)
            .ok_or(MappingError::RowsExhausted { position, row })?;
        while prev_kmer == Some(current.kmer.as_bytes()) {
            row += 1;
            current = rows
                .get(row)
                .ok_or(MappingError::RowsExhausted { position, row })?;
        }
        if kmer == current.kmer.as_bytes() {
            match current.template {
                Some(idx) => {
                    template.extend(std::iter::repeat(idx).take(template_gaps + 1));
                    template_gaps = 0;
                    last_template = Some(idx);
                }
                None => template_gaps += 1,
            }
            match current.complement {
                Some(idx) => {
                    complement.push(idx);
                    last_complement = Some(idx);
                }
                None => complement.push(resolve(last_complement, Strand::Complement, position)?),
            }
            prev_kmer = Some(current.kmer.as_bytes());
            row += 1;
        } else {
            trace!("Mismatch at {}, row {}", position, row);
            template.push(resolve(last_template, Strand::Template, position)?);
            complement.push(resolve(last_complement, Strand::Complement, position)?);
        }
    }
    for i in 0..k - 1 {
        let position = (consensus.len() + i + 1).saturating_sub(k);
        let idx = resolve(last_template, Strand::Template, position)?;
        template.extend(std::iter::repeat(idx).take(template_gaps + 1));
        template_gaps = 0;
        complement.push(resolve(last_complement, Strand::Complement, position)?);
    }
    let expected = consensus.len();
    for &(strand, map) in [(Strand::Template, &template), (Strand::Complement, &complement)].iter() {
        if map.len() != expected {
            let len = map.len();
            return Err(MappingError::LengthMismatch {
                strand,
                len,
                expected,
            });
        }
    }
    debug!("Mapped {}bp over {}/{} rows", expected, row, rows.len());
    Ok(EventMaps {
        template,
        complement,
    })
}

/// Write `template\tcomplement\tkmer` for each kmer of the consensus.
pub fn list_event_map<W: Write>(
    wtr: &mut W,
    consensus: &[u8],
    k: usize,
    maps: &EventMaps,
) -> std::io::Result<()> {
    let kmers = kmer_iter(consensus, k);
    for ((t, c), kmer) in maps.template.iter().zip(maps.complement.iter()).zip(kmers) {
        writeln!(wtr, "{}\t{}\t{}", t, c, String::from_utf8_lossy(kmer))?;
    }
    Ok(())
}

/// Map each called base of a single strand to its event, from the `move`
/// column of the event table. A stay (move 0) moves the base onto the current
/// event if its model state is more probable than the previous event's.
/// Returns `None` if the table lacks the needed columns. An empty table
/// gives the padded `[0]`.
pub fn strand_event_map(events: &[crate::event::EventRecord]) -> Option<Vec<usize>> {
    let mut map = vec![0];
    let mut prev_prob = 0f64;
    for (i, event) in events.iter().enumerate().skip(1) {
        let (moves, prob) = (event.moves?, event.p_model_state?);
        match moves {
            0 if prev_prob < prob => {
                if let Some(last) = map.last_mut() {
                    *last = i;
                }
            }
            1 => map.push(i),
            m if 1 < m => {
                map.extend(std::iter::repeat(i - 1).take(m as usize - 1));
                map.push(i);
            }
            _ => {}
        }
        prev_prob = prob;
    }
    let last = *map.last()?;
    map.extend(std::iter::repeat(last).take(STRAND_MAP_PADDING));
    Some(map)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::EventRecord;
    use crate::gen_read;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    fn row(t: i64, c: i64, kmer: &str) -> AlignmentRow {
        AlignmentRow::from((t, c, kmer.to_string()))
    }
    #[test]
    fn kmers() {
        let kmers: Vec<_> = kmer_iter(b"ACGTA", 3).collect();
        assert_eq!(kmers, vec![&b"ACG"[..], b"CGT", b"GTA"]);
        assert_eq!(kmer_iter(b"AC", 3).count(), 0);
    }
    #[test]
    fn perfect_table() {
        let rows = vec![row(0, 9, "ACG"), row(1, 8, "CGT"), row(2, 7, "GTA")];
        let maps = map_events(b"ACGTA", &rows).unwrap();
        assert_eq!(maps.template, vec![0, 1, 2, 2, 2]);
        assert_eq!(maps.complement, vec![9, 8, 7, 7, 7]);
    }
    #[test]
    fn template_gap_backward_fill() {
        let rows = vec![row(-1, 9, "ACG"), row(-1, 8, "CGT"), row(4, 7, "GTA")];
        let maps = map_events(b"ACGTA", &rows).unwrap();
        assert_eq!(&maps.template[..3], &[4, 4, 4]);
        assert_eq!(maps.template.len(), 5);
    }
    #[test]
    fn template_gap_in_the_middle() {
        let rows = vec![
            row(0, 9, "ACG"),
            row(-1, 8, "CGT"),
            row(-1, 7, "GTA"),
            row(3, 6, "TAC"),
        ];
        let maps = map_events(b"ACGTAC", &rows).unwrap();
        assert_eq!(maps.template, vec![0, 3, 3, 3, 3, 3]);
    }
    #[test]
    fn template_gap_discharged_by_padding() {
        let rows = vec![row(0, 9, "ACG"), row(1, 8, "CGT"), row(-1, 7, "GTA")];
        let maps = map_events(b"ACGTA", &rows).unwrap();
        assert_eq!(maps.template, vec![0, 1, 1, 1, 1]);
        assert_eq!(maps.complement, vec![9, 8, 7, 7, 7]);
    }
    #[test]
    fn complement_forward_fill() {
        let rows = vec![row(0, 9, "ACG"), row(1, -1, "CGT"), row(2, -1, "GTA")];
        let maps = map_events(b"ACGTA", &rows).unwrap();
        assert_eq!(maps.complement, vec![9, 9, 9, 9, 9]);
    }
    #[test]
    fn first_complement_absent() {
        let rows = vec![row(0, -1, "ACG"), row(1, 8, "CGT"), row(2, 7, "GTA")];
        let err = map_events(b"ACGTA", &rows).unwrap_err();
        assert_eq!(
            err,
            MappingError::Unresolved {
                strand: Strand::Complement,
                position: 0
            }
        );
    }
    #[test]
    fn mismatch_carries_forward() {
        // CGT is not in the table.
        let rows = vec![row(0, 9, "ACG"), row(2, 7, "GTA")];
        let maps = map_events(b"ACGTA", &rows).unwrap();
        assert_eq!(maps.template, vec![0, 0, 2, 2, 2]);
        assert_eq!(maps.complement, vec![9, 9, 7, 7, 7]);
    }
    #[test]
    fn mismatch_before_any_event() {
        let rows = vec![row(0, 9, "TTT")];
        let err = map_events(b"ACGTA", &rows).unwrap_err();
        assert_eq!(
            err,
            MappingError::Unresolved {
                strand: Strand::Template,
                position: 0
            }
        );
    }
    #[test]
    fn duplicate_rows_take_first() {
        let rows = vec![
            row(0, 9, "ACG"),
            row(1, 8, "ACG"),
            row(2, 7, "ACG"),
            row(3, 6, "CGT"),
            row(4, 5, "GTA"),
        ];
        let maps = map_events(b"ACGTA", &rows).unwrap();
        assert_eq!(maps.template, vec![0, 3, 4, 4, 4]);
        assert_eq!(maps.complement, vec![9, 6, 5, 5, 5]);
    }
    #[test]
    fn duplicate_run_never_resolves() {
        let rows = vec![row(0, 9, "ACG"), row(1, 8, "ACG")];
        let err = map_events(b"ACGTA", &rows).unwrap_err();
        assert_eq!(err, MappingError::RowsExhausted { position: 1, row: 2 });
    }
    #[test]
    fn table_shorter_than_read() {
        let rows = vec![row(0, 9, "ACG")];
        let err = map_events(b"ACGTA", &rows).unwrap_err();
        assert_eq!(err, MappingError::RowsExhausted { position: 1, row: 1 });
    }
    #[test]
    fn empty_table() {
        assert_eq!(map_events(b"ACGTA", &[]), Err(MappingError::EmptyAlignment));
        let rows = vec![row(0, 0, "")];
        assert_eq!(map_events(b"ACGTA", &rows), Err(MappingError::EmptyAlignment));
    }
    #[test]
    fn kmer_length_one_with_trailing_gap() {
        // No padding position is left to discharge the gap.
        let rows = vec![row(0, 1, "A"), row(-1, 0, "C")];
        let err = map_events(b"AC", &rows).unwrap_err();
        assert_eq!(
            err,
            MappingError::LengthMismatch {
                strand: Strand::Template,
                len: 1,
                expected: 2
            }
        );
    }
    #[test]
    fn length_invariant_on_synthetic_reads() {
        let profile = &gen_read::PROFILE;
        for seed in 0..200u64 {
            let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(seed);
            let k = 3 + (seed as usize % 4);
            let read = gen_read::generate_read(&mut rng, 150, k, profile);
            let maps = map_events(&read.consensus, &read.rows).unwrap();
            assert_eq!(maps.template.len(), read.consensus.len());
            assert_eq!(maps.complement.len(), read.consensus.len());
            assert!(maps.template.iter().all(|&i| i < read.template_events));
            assert!(maps.complement.iter().all(|&i| i < read.complement_events));
        }
    }
    #[test]
    fn template_map_is_monotone_on_synthetic_reads() {
        let profile = &gen_read::PROFILE;
        for seed in 0..50u64 {
            let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(seed);
            let read = gen_read::generate_read(&mut rng, 200, 5, profile);
            let maps = map_events(&read.consensus, &read.rows).unwrap();
            assert!(maps.template.windows(2).all(|w| w[0] <= w[1]));
            assert!(maps.complement.windows(2).all(|w| w[0] >= w[1]));
        }
    }
    #[test]
    fn listing() {
        let rows = vec![row(0, 9, "ACG"), row(1, 8, "CGT"), row(2, 7, "GTA")];
        let maps = map_events(b"ACGTA", &rows).unwrap();
        let mut out = vec![];
        list_event_map(&mut out, b"ACGTA", 3, &maps).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "0\t9\tACG\n1\t8\tCGT\n2\t7\tGTA\n");
    }
    fn moved(moves: i64, prob: f64) -> EventRecord {
        EventRecord {
            mean: 50.0,
            start: 0.0,
            stdev: 1.0,
            length: 0.01,
            moves: Some(moves),
            p_model_state: Some(prob),
        }
    }
    #[test]
    fn strand_map() {
        let events = vec![
            moved(0, 0.5),
            moved(1, 0.4),
            moved(0, 0.6),
            moved(2, 0.3),
            moved(0, 0.1),
        ];
        let map = strand_event_map(&events).unwrap();
        assert_eq!(map, vec![0, 2, 2, 3, 3, 3, 3, 3, 3]);
    }
    #[test]
    fn strand_map_without_moves() {
        let mut events = vec![moved(0, 0.5), moved(1, 0.4)];
        events[1].moves = None;
        assert!(strand_event_map(&events).is_none());
        assert_eq!(strand_event_map(&events[..1]), Some(vec![0; 6]));
    }
    #[test]
    fn strand_map_of_empty_table() {
        assert_eq!(strand_event_map(&[]), Some(vec![0; 1 + STRAND_MAP_PADDING]));
    }
}

//! The npRead record: a 2D read, the drift-corrected events of both strands,
//! and the event of each strand assigned to every base.
//!
//! The text form has six lines.
//! 1. `length #template_events #complement_events`, then
//!    `scale shift var scale_sd var_sd` of the template and of the complement.
//! 2. The 2D read.
//! 3. The template event map.
//! 4. `mean stdev length` of each template event.
//! 5. The complement event map.
//! 6. `mean stdev length` of each complement event.
use crate::event::{DriftCorrected, EventRecord, EventTable};
use crate::event_map::{self, AlignmentRow, EventMaps};
use crate::fasta;
use crate::model::Strand;
use crate::orient::Orientation;
use crate::store::{EventStore, TWO_D_ALIGNMENT, TWO_D_FASTQ};
use crate::{MappingError, NpReadError};
use std::fmt;
use std::io::Write;

/// Formats a float as the downstream tools print them: the shortest
/// representation which reads back to the same value, with a trailing `.0`
/// on integral values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Float(pub f64);

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = self.0;
        if x.is_finite() && x.fract() == 0f64 && x.abs() < 1e16 {
            write!(f, "{:.1}", x)
        } else {
            write!(f, "{}", x)
        }
    }
}

/// Scaling parameters of a strand, fitted by the basecaller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrandParams {
    pub scale: f64,
    pub shift: f64,
    pub drift: f64,
    pub var: f64,
    pub scale_sd: f64,
    pub var_sd: f64,
}

impl StrandParams {
    /// `None` unless every parameter is recorded.
    pub fn load<S: EventStore + ?Sized>(store: &S, strand: Strand) -> Option<Self> {
        let path = strand.model_path();
        let get = |name: &str| store.number(path, name);
        Some(Self {
            scale: get("scale")?,
            shift: get("shift")?,
            drift: get("drift")?,
            var: get("var")?,
            scale_sd: get("scale_sd")?,
            var_sd: get("var_sd")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrandData {
    pub events: Option<Vec<EventRecord>>,
    pub params: Option<StrandParams>,
}

/// A basecalled read as found in the store. Each part is `None` when the
/// basecaller did not write it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NanoporeRead {
    pub id: Option<String>,
    pub sequence: Option<Vec<u8>>,
    pub alignment: Option<Vec<AlignmentRow>>,
    pub template: StrandData,
    pub complement: StrandData,
}

impl NanoporeRead {
    pub fn load<S: EventStore + ?Sized>(store: &S) -> Self {
        let (id, sequence) = match store
            .text(TWO_D_FASTQ)
            .and_then(|fastq| fasta::parse_fastq(fastq.as_bytes()).into_iter().next())
        {
            Some((id, seq, _)) => (Some(id), Some(seq)),
            None => (None, None),
        };
        let alignment = store.alignment(TWO_D_ALIGNMENT).map(|rows| rows.to_vec());
        let strand = |strand: Strand| StrandData {
            events: store.events(strand.events_path()).map(|xs| xs.to_vec()),
            params: StrandParams::load(store, strand),
        };
        Self {
            id,
            sequence,
            alignment,
            template: strand(Strand::Template),
            complement: strand(Strand::Complement),
        }
    }
    pub fn strand(&self, strand: Strand) -> &StrandData {
        match strand {
            Strand::Template => &self.template,
            Strand::Complement => &self.complement,
        }
    }
    pub fn kmer_length(&self) -> Option<usize> {
        self.alignment.as_ref()?.first().map(|row| row.kmer.len())
    }
    fn sequence_and_alignment(&self) -> Result<(&[u8], &[AlignmentRow]), NpReadError> {
        let seq = self
            .sequence
            .as_deref()
            .ok_or_else(|| NpReadError::Missing(TWO_D_FASTQ.to_string()))?;
        let rows = self
            .alignment
            .as_deref()
            .ok_or_else(|| NpReadError::Missing(TWO_D_ALIGNMENT.to_string()))?;
        Ok((seq, rows))
    }
    pub fn event_maps(&self) -> Result<EventMaps, NpReadError> {
        let (seq, rows) = self.sequence_and_alignment()?;
        Ok(event_map::map_events(seq, rows)?)
    }
    /// The 1D map of a strand, if its event table has the move columns.
    pub fn strand_event_map(&self, strand: Strand) -> Option<Vec<usize>> {
        event_map::strand_event_map(self.strand(strand).events.as_ref()?)
    }
    /// Tab-separated listing of the 2D event map.
    pub fn list_event_map<W: Write>(&self, wtr: &mut W) -> Result<(), NpReadError> {
        let maps = self.event_maps()?;
        let (seq, rows) = self.sequence_and_alignment()?;
        let k = rows.first().map(|row| row.kmer.len()).unwrap_or(1);
        event_map::list_event_map(wtr, seq, k, &maps)?;
        Ok(())
    }
    /// Write the 2D read as a FASTA record.
    pub fn write_2d_read<W: Write>(
        &self,
        wtr: &mut W,
        orientation: Orientation,
    ) -> Result<(), NpReadError> {
        let id = self
            .id
            .as_ref()
            .ok_or_else(|| NpReadError::Missing(TWO_D_FASTQ.to_string()))?;
        let (seq, _) = self.sequence_and_alignment()?;
        let seq = match orientation {
            Orientation::Forward => seq.to_vec(),
            Orientation::Reverse => fasta::reverse_complement(seq),
        };
        fasta::write_fasta(wtr, &[(id.clone(), seq)])?;
        Ok(())
    }
    pub fn into_npread(self) -> Result<NpRead, NpReadError> {
        let maps = self.event_maps()?;
        let sequence = self
            .sequence
            .ok_or_else(|| NpReadError::Missing(TWO_D_FASTQ.to_string()))?;
        let template = strand_parts(self.template, Strand::Template)?;
        let complement = strand_parts(self.complement, Strand::Complement)?;
        NpRead::new(sequence, maps, template, complement)
    }
}

fn strand_parts(data: StrandData, strand: Strand) -> Result<(EventTable, StrandParams), NpReadError> {
    let events = data
        .events
        .ok_or_else(|| NpReadError::Missing(strand.events_path().to_string()))?;
    let params = data
        .params
        .ok_or_else(|| NpReadError::Missing(strand.model_path().to_string()))?;
    Ok((EventTable::from_records(&events), params))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrandRecord {
    pub params: StrandParams,
    pub events: DriftCorrected,
    pub event_map: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NpRead {
    pub sequence: Vec<u8>,
    pub template: StrandRecord,
    pub complement: StrandRecord,
}

impl NpRead {
    /// Bundle a mapped read. The event tables are corrected for drift with
    /// the drift of their strand here, and only here.
    pub fn new(
        sequence: Vec<u8>,
        maps: EventMaps,
        (template_events, template_params): (EventTable, StrandParams),
        (complement_events, complement_params): (EventTable, StrandParams),
    ) -> Result<Self, NpReadError> {
        let expected = sequence.len();
        for strand in Strand::ALL {
            let len = maps.get(strand).len();
            if len != expected {
                let e = MappingError::LengthMismatch {
                    strand,
                    len,
                    expected,
                };
                return Err(e.into());
            }
        }
        let EventMaps {
            template,
            complement,
        } = maps;
        let template = StrandRecord {
            events: template_events.correct_drift(template_params.drift),
            params: template_params,
            event_map: template,
        };
        let complement = StrandRecord {
            events: complement_events.correct_drift(complement_params.drift),
            params: complement_params,
            event_map: complement,
        };
        Ok(Self {
            sequence,
            template,
            complement,
        })
    }
    pub fn strand(&self, strand: Strand) -> &StrandRecord {
        match strand {
            Strand::Template => &self.template,
            Strand::Complement => &self.complement,
        }
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, p: &StrandParams) -> fmt::Result {
    let (scale, shift, var) = (Float(p.scale), Float(p.shift), Float(p.var));
    let (scale_sd, var_sd) = (Float(p.scale_sd), Float(p.var_sd));
    write!(f, "{} {} {} {} {}", scale, shift, var, scale_sd, var_sd)
}

fn write_strand(f: &mut fmt::Formatter<'_>, record: &StrandRecord) -> fmt::Result {
    for idx in record.event_map.iter() {
        write!(f, "{} ", idx)?;
    }
    writeln!(f)?;
    for e in record.events.events() {
        let (mean, stdev, length) = (Float(e.mean), Float(e.stdev), Float(e.length));
        write!(f, "{} {} {} ", mean, stdev, length)?;
    }
    writeln!(f)
}

impl fmt::Display for NpRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (t, c) = (&self.template, &self.complement);
        write!(
            f,
            "{} {} {} ",
            self.sequence.len(),
            t.events.len(),
            c.events.len()
        )?;
        write_params(f, &t.params)?;
        write!(f, " ")?;
        write_params(f, &c.params)?;
        writeln!(f)?;
        writeln!(f, "{}", String::from_utf8_lossy(&self.sequence))?;
        write_strand(f, t)?;
        write_strand(f, c)
    }
}

/// Parse an event map line (line 3 or 5 of an npRead).
pub fn parse_event_map(line: &str) -> Result<Vec<usize>, NpReadError> {
    line.split_whitespace()
        .map(|x| {
            x.parse()
                .map_err(|_| NpReadError::Malformed(format!("event index {:?}", x)))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::Event;
    use crate::gen_read;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    fn params(drift: f64) -> StrandParams {
        StrandParams {
            scale: 1.0,
            shift: 2.5,
            drift,
            var: 1.25,
            scale_sd: 0.0,
            var_sd: 0.75,
        }
    }
    fn small() -> NpRead {
        let template = EventTable::new(vec![
            Event::new(10.0, 0.0, 1.0, 0.5),
            Event::new(12.0, 2.0, 1.5, 0.25),
            Event::new(9.0, 5.0, 2.0, 0.125),
        ]);
        let complement = EventTable::new(vec![
            Event::new(20.0, 1.0, 1.0, 0.5),
            Event::new(30.0, 3.0, 0.5, 0.5),
        ]);
        let maps = EventMaps {
            template: vec![0, 1, 2, 2, 2],
            complement: vec![1, 1, 0, 0, 0],
        };
        NpRead::new(
            b"ACGTA".to_vec(),
            maps,
            (template, params(0.5)),
            (complement, params(0.0)),
        )
        .unwrap()
    }
    #[test]
    fn float_format() {
        assert_eq!(Float(10.0).to_string(), "10.0");
        assert_eq!(Float(0.0).to_string(), "0.0");
        assert_eq!(Float(-3.0).to_string(), "-3.0");
        assert_eq!(Float(6.5).to_string(), "6.5");
        assert_eq!(Float(0.1).to_string(), "0.1");
        assert_eq!(Float(0.087).to_string(), "0.087");
    }
    #[test]
    fn record_layout() {
        let text = small().to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "5 3 2 1.0 2.5 1.25 0.0 0.75 1.0 2.5 1.25 0.0 0.75");
        assert_eq!(lines[1], "ACGTA");
        assert_eq!(lines[2], "0 1 2 2 2 ");
        assert_eq!(lines[3], "10.0 1.0 0.5 11.0 1.5 0.25 6.5 2.0 0.125 ");
        assert_eq!(lines[4], "1 1 0 0 0 ");
        assert_eq!(lines[5], "20.0 1.0 0.5 30.0 0.5 0.5 ");
        assert!(text.ends_with('\n'));
    }
    #[test]
    fn map_round_trip() {
        let npread = small();
        let text = npread.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(parse_event_map(lines[2]).unwrap(), npread.template.event_map);
        assert_eq!(parse_event_map(lines[4]).unwrap(), npread.complement.event_map);
        assert!(parse_event_map("1 2 x").is_err());
    }
    #[test]
    fn maps_must_cover_the_read() {
        let maps = EventMaps {
            template: vec![0, 1],
            complement: vec![0, 1, 1],
        };
        let table = || (EventTable::new(vec![Event::new(1.0, 0.0, 1.0, 1.0)]), params(0.0));
        match NpRead::new(b"ACG".to_vec(), maps, table(), table()) {
            Err(NpReadError::Mapping(MappingError::LengthMismatch { strand, .. })) => {
                assert_eq!(strand, Strand::Template)
            }
            other => panic!("{:?}", other),
        }
    }
    #[test]
    fn synthetic_read_to_npread() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(3289);
        let read = gen_read::generate_read(&mut rng, 300, 5, &gen_read::PROFILE);
        let store = read.store(&mut rng, "synthetic_0");
        let loaded = NanoporeRead::load(&store);
        assert_eq!(loaded.id.as_deref(), Some("synthetic_0"));
        assert_eq!(loaded.kmer_length(), Some(5));
        let raw_first = loaded.template.events.as_ref().unwrap()[0].mean;
        let npread = loaded.into_npread().unwrap();
        assert_eq!(npread.template.events.len(), read.template_events);
        assert_eq!(npread.complement.events.len(), read.complement_events);
        // The first event is the origin of the drift.
        assert_eq!(npread.template.events.events()[0].mean, raw_first);
        let text = npread.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        let head: Vec<_> = lines[0].split(' ').collect();
        assert_eq!(head.len(), 13);
        assert_eq!(head[0], "300");
        assert_eq!(parse_event_map(lines[2]).unwrap(), npread.template.event_map);
        assert_eq!(parse_event_map(lines[4]).unwrap(), npread.complement.event_map);
        assert_eq!(lines[3].split_whitespace().count(), 3 * read.template_events);
    }
    #[test]
    fn missing_parts() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(4);
        let read = gen_read::generate_read(&mut rng, 50, 4, &gen_read::CLEAN_PROFILE);
        let mut store = read.store(&mut rng, "r");
        store.remove(Strand::Complement.events_path());
        let loaded = NanoporeRead::load(&store);
        assert!(loaded.complement.events.is_none());
        assert!(loaded.complement.params.is_some());
        assert!(loaded.event_maps().is_ok());
        match loaded.into_npread() {
            Err(NpReadError::Missing(path)) => {
                assert_eq!(path, Strand::Complement.events_path())
            }
            other => panic!("{:?}", other),
        }
        store.remove(TWO_D_ALIGNMENT);
        let loaded = NanoporeRead::load(&store);
        assert!(loaded.kmer_length().is_none());
        assert!(matches!(loaded.event_maps(), Err(NpReadError::Missing(_))));
    }
    #[test]
    fn two_d_read_fasta() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(11);
        let read = gen_read::generate_read(&mut rng, 20, 3, &gen_read::CLEAN_PROFILE);
        let loaded = NanoporeRead::load(&read.store(&mut rng, "read_7"));
        let mut out = vec![];
        loaded.write_2d_read(&mut out, Orientation::Forward).unwrap();
        let expected = format!(">read_7\n{}\n", String::from_utf8_lossy(&read.consensus));
        assert_eq!(String::from_utf8(out).unwrap(), expected);
        let mut out = vec![];
        loaded.write_2d_read(&mut out, Orientation::Reverse).unwrap();
        let revcmp = fasta::reverse_complement(&read.consensus);
        let expected = format!(">read_7\n{}\n", String::from_utf8_lossy(&revcmp));
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }
    #[test]
    fn strand_maps_of_synthetic_read() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(5);
        let read = gen_read::generate_read(&mut rng, 40, 4, &gen_read::CLEAN_PROFILE);
        let loaded = NanoporeRead::load(&read.store(&mut rng, "r"));
        for strand in Strand::ALL {
            let map = loaded.strand_event_map(strand).unwrap();
            let events = loaded.strand(strand).events.as_ref().unwrap().len();
            assert!(map.iter().all(|&i| i < events));
            assert!(map.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}

//! This module is to generate synthetic 2D reads to assess the event mapping.
//! Usually, it would not be used in the real-applications.
use crate::event::EventRecord;
use crate::event_map::AlignmentRow;
use crate::model::{KmerRecord, Strand};
use crate::store::{Attr, Dataset, Node, ReadStore, TWO_D_ALIGNMENT, TWO_D_FASTQ};
use rand::seq::SliceRandom;
use rand::Rng;

/// Rates of the irregularities of an alignment table.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    /// Pr{no template event on a row}
    pub template_gap: f64,
    /// Pr{no complement event on a row}
    pub complement_gap: f64,
    /// Pr{a row is repeated}
    pub stutter: f64,
    /// Pr{a kmer of the 2D read has no row}
    pub skip: f64,
}

pub const PROFILE: Profile = Profile {
    template_gap: 0.1,
    complement_gap: 0.1,
    stutter: 0.05,
    skip: 0.03,
};

pub const CLEAN_PROFILE: Profile = Profile {
    template_gap: 0.0,
    complement_gap: 0.0,
    stutter: 0.0,
    skip: 0.0,
};

/// A 2D read together with an alignment table which is consistent with it.
#[derive(Debug, Clone)]
pub struct SyntheticRead {
    pub consensus: Vec<u8>,
    pub rows: Vec<AlignmentRow>,
    pub template_events: usize,
    pub complement_events: usize,
}

/// Random sequence without homopolymers longer than `k`. Longer runs make
/// identical consecutive kmers, which the table can not express.
pub fn generate_seq<T: Rng>(rng: &mut T, len: usize, k: usize) -> Vec<u8> {
    let bases = b"ACTG";
    let mut seq: Vec<u8> = Vec::with_capacity(len);
    while seq.len() < len {
        let base = *bases.choose(rng).unwrap();
        let run = seq.iter().rev().take_while(|&&b| b == base).count();
        if run < k {
            seq.push(base);
        }
    }
    seq
}

pub fn generate_read<T: Rng>(rng: &mut T, len: usize, k: usize, p: &Profile) -> SyntheticRead {
    let consensus = generate_seq(rng, len, k);
    let kmers: Vec<_> = consensus.windows(k).collect();
    let complement_events = 3 * len + 1;
    let (mut template, mut complement) = (0, complement_events - 1);
    let mut rows: Vec<AlignmentRow> = vec![];
    let mut dropped = false;
    for (i, kmer) in kmers.iter().enumerate() {
        let kmer = String::from_utf8_lossy(kmer).to_string();
        let inner = 0 < i && i + 2 < kmers.len();
        // Dropping a row between two identical kmers would make the next row
        // look like a repeat.
        let droppable = inner && !dropped && kmers[i - 1] != kmers[i + 1];
        dropped = droppable && rng.gen_bool(p.skip);
        if dropped {
            continue;
        }
        template += rng.gen_range(1..3);
        complement -= rng.gen_range(1..3);
        let t = match 0 < i && rng.gen_bool(p.template_gap) {
            true => None,
            false => Some(template),
        };
        let c = match 0 < i && rng.gen_bool(p.complement_gap) {
            true => None,
            false => Some(complement),
        };
        rows.push(AlignmentRow {
            template: t,
            complement: c,
            kmer: kmer.clone(),
        });
        if 0 < i && rng.gen_bool(p.stutter) {
            template += 1;
            complement -= 1;
            rows.push(AlignmentRow {
                template: Some(template),
                complement: Some(complement),
                kmer,
            });
        }
    }
    SyntheticRead {
        consensus,
        rows,
        template_events: template + 1,
        complement_events,
    }
}

fn generate_events<T: Rng>(rng: &mut T, num: usize) -> Vec<EventRecord> {
    let mut start = rng.gen_range(100f64..200f64);
    (0..num)
        .map(|i| {
            let length = rng.gen_range(0.005..0.05);
            let event = EventRecord {
                mean: rng.gen_range(40f64..80f64),
                start,
                stdev: rng.gen_range(0.5..2.5),
                length,
                moves: Some(if i == 0 { 0 } else { rng.gen_range(0..3) }),
                p_model_state: Some(rng.gen_range(0f64..1f64)),
            };
            start += length;
            event
        })
        .collect()
}

/// A kmer model with one entry for each kmer in lexicographic order.
pub fn generate_model<T: Rng>(rng: &mut T, k: usize) -> Vec<KmerRecord> {
    let mut kmers = vec![String::new()];
    for _ in 0..k {
        kmers = kmers
            .iter()
            .flat_map(|prefix| b"ACGT".iter().map(move |&b| format!("{}{}", prefix, b as char)))
            .collect();
    }
    kmers
        .into_iter()
        .map(|kmer| KmerRecord {
            kmer,
            level_mean: rng.gen_range(40f64..80f64),
            level_stdev: rng.gen_range(0.5..2.0),
            sd_mean: rng.gen_range(0.5..2.0),
            sd_stdev: rng.gen_range(0.1..0.5),
            weight: rng.gen_range(100f64..1000f64),
        })
        .collect()
}

impl SyntheticRead {
    /// Everything the basecaller would have written for this read.
    pub fn store<T: Rng>(&self, rng: &mut T, id: &str) -> ReadStore {
        let mut store = ReadStore::new();
        let fastq = format!(
            "@{} 2D\n{}\n+\n{}\n",
            id,
            String::from_utf8_lossy(&self.consensus),
            "5".repeat(self.consensus.len())
        );
        store.insert(TWO_D_FASTQ, Node::with_data(Dataset::Text(fastq)));
        store.insert(TWO_D_ALIGNMENT, Node::with_data(Dataset::Alignment(self.rows.clone())));
        let k = self.rows.first().map(|r| r.kmer.len()).unwrap_or(1);
        for (strand, num) in [
            (Strand::Template, self.template_events),
            (Strand::Complement, self.complement_events),
        ] {
            let events = generate_events(rng, num);
            store.insert(strand.events_path(), Node::with_data(Dataset::Events(events)));
            let mut model = Node::with_data(Dataset::Model(generate_model(rng, k)));
            for attr in ["scale", "shift", "var", "scale_sd", "var_sd"] {
                model = model.attr(attr, Attr::Number(rng.gen_range(0.5..2.0)));
            }
            model = model
                .attr("drift", Attr::Number(rng.gen_range(0.0..0.05)))
                .attr("stay_prob", Attr::Number(rng.gen_range(0.05..0.2)));
            store.insert(strand.model_path(), model);
            let file = format!("/opt/chimaera/model/{}_{}mer.model", strand, k);
            let summary = Node::default().attr("model_file", Attr::Text(file));
            store.insert(strand.summary_path(), summary);
        }
        store
    }
}

//! Per-kmer emission models of the basecaller, and their export for the
//! signal-level aligner.
//!
//! The exported file has three lines.
//! 1. `0` (a placeholder for the correlation parameter), then
//!    `level_mean level_sd noise_mean noise_sd noise_lambda` for each kmer.
//! 2. The skip probability of each of the 30 bins.
//! 3. Same as 1, with `level_sd` scaled by [`RELAXED_LEVEL_SD_SCALE`].
use crate::npread::Float;
use crate::store::EventStore;
use crate::NpReadError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SKIP_BINS: usize = 30;
/// Inflation of the level standard deviation in the relaxed copy of the model.
pub const RELAXED_LEVEL_SD_SCALE: f64 = 1.75;

const TEMPLATE_SKIP_PROB_BINS: [f64; SKIP_BINS] = [
    0.487, 0.412, 0.311, 0.229, 0.174, 0.134, 0.115, 0.103, 0.096, 0.092, 0.088, 0.087, 0.084,
    0.085, 0.083, 0.082, 0.085, 0.083, 0.084, 0.082, 0.080, 0.085, 0.088, 0.086, 0.087, 0.089,
    0.085, 0.090, 0.087, 0.096,
];

const COMPLEMENT_SKIP_PROB_BINS: [f64; SKIP_BINS] = [
    0.531, 0.478, 0.405, 0.327, 0.257, 0.207, 0.172, 0.154, 0.138, 0.132, 0.127, 0.123, 0.117,
    0.115, 0.113, 0.113, 0.115, 0.109, 0.109, 0.107, 0.104, 0.105, 0.108, 0.106, 0.111, 0.114,
    0.118, 0.119, 0.110, 0.119,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Template,
    Complement,
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strand::Template => write!(f, "template"),
            Strand::Complement => write!(f, "complement"),
        }
    }
}

impl Strand {
    pub const ALL: [Strand; 2] = [Strand::Template, Strand::Complement];
    /// Prior probability of skipping 0, 1, ..., 29 kmers. Calibration
    /// constants of the basecaller.
    pub fn skip_prob_bins(&self) -> &'static [f64; SKIP_BINS] {
        match self {
            Strand::Template => &TEMPLATE_SKIP_PROB_BINS,
            Strand::Complement => &COMPLEMENT_SKIP_PROB_BINS,
        }
    }
    pub fn events_path(&self) -> &'static str {
        match self {
            Strand::Template => "/Analyses/Basecall_2D_000/BaseCalled_template/Events",
            Strand::Complement => "/Analyses/Basecall_2D_000/BaseCalled_complement/Events",
        }
    }
    /// Kmer table of the model, with the scaling parameters as attributes.
    pub fn model_path(&self) -> &'static str {
        match self {
            Strand::Template => "/Analyses/Basecall_2D_000/BaseCalled_template/Model",
            Strand::Complement => "/Analyses/Basecall_2D_000/BaseCalled_complement/Model",
        }
    }
    /// Holds the `model_file` attribute naming the model.
    pub fn summary_path(&self) -> &'static str {
        match self {
            Strand::Template => "/Analyses/Basecall_2D_000/Summary/basecall_1d_template",
            Strand::Complement => "/Analyses/Basecall_2D_000/Summary/basecall_1d_complement",
        }
    }
}

/// A row of the basecaller's kmer model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmerRecord {
    pub kmer: String,
    pub level_mean: f64,
    pub level_stdev: f64,
    /// Mean of the noise (event stdev).
    pub sd_mean: f64,
    /// Stdev of the noise.
    pub sd_stdev: f64,
    pub weight: f64,
}

/// Shape parameter of an inverse Gaussian with the given mean and stdev.
/// `powf` rounds once, as libm `pow` does; `powi` would not.
pub fn lambda(noise_mean: f64, noise_stdev: f64) -> f64 {
    noise_mean.powf(3f64) / noise_stdev.powf(2f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmissionModel {
    pub strand: Strand,
    /// File name of the model, if recorded.
    pub name: Option<String>,
    /// log2 of the stay probability, if recorded.
    pub stay_prob: Option<f64>,
    kmers: Vec<KmerRecord>,
}

impl EmissionModel {
    pub fn new(strand: Strand, kmers: Vec<KmerRecord>) -> Self {
        Self {
            strand,
            name: None,
            stay_prob: None,
            kmers,
        }
    }
    /// Load the model of `strand`. Only the kmer table is mandatory.
    pub fn load<S: EventStore + ?Sized>(store: &S, strand: Strand) -> Result<Self, NpReadError> {
        let path = strand.model_path();
        let kmers = match store.kmer_model(path) {
            Some(kmers) => kmers.to_vec(),
            None => {
                warn!("No {} model in this read", strand);
                return Err(NpReadError::Missing(path.to_string()));
            }
        };
        let stay_prob = store.number(path, "stay_prob").map(f64::log2);
        let name = store
            .string(strand.summary_path(), "model_file")
            .and_then(|file| file.rsplit('/').next())
            .map(|name| name.to_string());
        debug!("Loaded {} model ({} kmers)", strand, kmers.len());
        Ok(Self {
            strand,
            name,
            stay_prob,
            kmers,
        })
    }
    pub fn kmers(&self) -> &[KmerRecord] {
        &self.kmers
    }
    pub fn skip_prob_bins(&self) -> &'static [f64; SKIP_BINS] {
        self.strand.skip_prob_bins()
    }
    /// kmer -> (level mean, level sd, noise mean, noise sd).
    pub fn lookup(&self) -> HashMap<String, (f64, f64, f64, f64)> {
        self.kmers
            .iter()
            .map(|k| {
                let params = (k.level_mean, k.level_stdev, k.sd_mean, k.sd_stdev);
                (k.kmer.clone(), params)
            })
            .collect()
    }
    fn write_levels<W: Write>(&self, wtr: &mut W, level_sd_scale: f64) -> std::io::Result<()> {
        write!(wtr, "0 ")?;
        for k in self.kmers.iter() {
            let lam = lambda(k.sd_mean, k.sd_stdev);
            let level_stdev = k.level_stdev * level_sd_scale;
            write!(
                wtr,
                "{} {} {} {} {} ",
                Float(k.level_mean),
                Float(level_stdev),
                Float(k.sd_mean),
                Float(k.sd_stdev),
                Float(lam)
            )?;
        }
        writeln!(wtr)
    }
    pub fn export<W: Write>(&self, wtr: &mut W) -> std::io::Result<()> {
        self.write_levels(wtr, 1f64)?;
        for p in self.skip_prob_bins().iter() {
            write!(wtr, "{} ", Float(*p))?;
        }
        writeln!(wtr)?;
        self.write_levels(wtr, RELAXED_LEVEL_SD_SCALE)
    }
    /// Export into `dir`, naming the file after the model.
    pub fn export_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, NpReadError> {
        let name = match self.name.as_ref() {
            Some(name) => name,
            None => {
                warn!("The {} model has no name. Skip exporting.", self.strand);
                return Err(NpReadError::Missing(self.strand.summary_path().to_string()));
            }
        };
        // Reads sharing a model write the same file. Write aside, then rename.
        let path = dir.as_ref().join(name);
        let thread = format!("{:?}", std::thread::current().id());
        let tmp = dir.as_ref().join(format!(".{}.{}.{}", name, std::process::id(), thread));
        let written = std::fs::File::create(&tmp)
            .map(std::io::BufWriter::new)
            .and_then(|mut wtr| {
                self.export(&mut wtr)?;
                wtr.flush()
            })
            .and_then(|_| std::fs::rename(&tmp, &path));
        if let Err(why) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(why.into());
        }
        Ok(path)
    }
}

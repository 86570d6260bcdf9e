//! Preparing many reads for the signal-level aligner at once.
//!
//! Each read is a job. A job loads the read, writes its npRead and its 2D read,
//! exports both strand models, and, if a reference is given, writes the
//! reference oriented the same way as the read. Jobs share nothing; a failed
//! job is reported and the others go on.
use crate::fasta;
use crate::orient::{Orientation, Orienter};
use crate::store::ReadStore;
use crate::NpReadError;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extension of the read dumps picked up from the input directory.
pub const READ_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
/// Configurations
pub struct PipelineConfig {
    /// Where the outputs go.
    pub destination: PathBuf,
    /// Reference to orient each read against.
    pub reference: Option<PathBuf>,
    pub threads: usize,
    /// Maximum number of reads. A random subset is taken if there are more.
    pub max_reads: usize,
    pub seed: u64,
}

impl PipelineConfig {
    pub fn new<P: AsRef<Path>>(destination: P, threads: usize, max_reads: usize, seed: u64) -> Self {
        Self {
            destination: destination.as_ref().to_path_buf(),
            reference: None,
            threads,
            max_reads,
            seed,
        }
    }
    pub fn with_reference<P: AsRef<Path>>(mut self, reference: P) -> Self {
        self.reference = Some(reference.as_ref().to_path_buf());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentJob {
    pub read: PathBuf,
    pub destination: PathBuf,
    pub reference: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOutputs {
    pub npread: PathBuf,
    pub two_d_read: PathBuf,
    pub models: Vec<PathBuf>,
    /// The reference, oriented as the read.
    pub reference: Option<PathBuf>,
    pub orientation: Option<Orientation>,
}

/// One job per read dump in `dir`, at most `config.max_reads` of them.
pub fn collect_jobs<P: AsRef<Path>>(
    dir: P,
    config: &PipelineConfig,
) -> Result<Vec<AlignmentJob>, NpReadError> {
    let mut reads: Vec<_> = std::fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().map_or(false, |ext| ext == READ_EXTENSION))
        .collect();
    reads.sort();
    if config.max_reads < reads.len() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(config.seed);
        reads.shuffle(&mut rng);
        reads.truncate(config.max_reads);
    }
    debug!("Collected {} reads", reads.len());
    let jobs = reads
        .into_iter()
        .map(|read| AlignmentJob {
            read,
            destination: config.destination.clone(),
            reference: config.reference.clone(),
        })
        .collect();
    Ok(jobs)
}

fn create<P: AsRef<Path>>(path: P) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    std::fs::File::create(path).map(std::io::BufWriter::new)
}

/// Process a single read.
pub fn process_read<O: Orienter + ?Sized>(
    job: &AlignmentJob,
    orienter: Option<&O>,
) -> Result<ReadOutputs, NpReadError> {
    let stem = job
        .read
        .file_stem()
        .map(|x| x.to_string_lossy().to_string())
        .ok_or_else(|| NpReadError::Missing(format!("file name of {}", job.read.display())))?;
    let mut outputs = ReadOutputs {
        npread: job.destination.join(format!("{}.npRead", stem)),
        two_d_read: job.destination.join(format!("{}.2d.fa", stem)),
        ..ReadOutputs::default()
    };
    let (mut npread, mut two_d_read) = (vec![], vec![]);
    {
        let store = ReadStore::open(&job.read)?;
        crate::make_npread_and_2d_seq(&store, &mut npread, &mut two_d_read)?;
        outputs.models = crate::export_models(&store, &job.destination);
    }
    std::fs::write(&outputs.npread, &npread)?;
    std::fs::write(&outputs.two_d_read, &two_d_read)?;
    if let (Some(reference), Some(orienter)) = (job.reference.as_ref(), orienter) {
        let orientation = orienter.orient(&outputs.two_d_read)?;
        let records = fasta::read_fasta(reference)?;
        let path = job.destination.join(format!("{}.ref.seq", stem));
        let mut wtr = create(&path)?;
        fasta::write_sequences(&mut wtr, &records, orientation.is_forward())?;
        wtr.flush()?;
        outputs.reference = Some(path);
        outputs.orientation = Some(orientation);
    }
    Ok(outputs)
}

/// Run every job on a pool of `threads` threads. Returns the jobs which
/// failed, with their errors.
pub fn run_jobs<O: Orienter + Sync + ?Sized>(
    jobs: &[AlignmentJob],
    orienter: Option<&O>,
    threads: usize,
) -> Result<Vec<(PathBuf, NpReadError)>, NpReadError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()?;
    let failures: Vec<_> = pool.install(|| {
        jobs.par_iter()
            .filter_map(|job| match process_read(job, orienter) {
                Ok(outputs) => {
                    debug!("Finished {}", outputs.npread.display());
                    None
                }
                Err(why) => {
                    error!("{} failed with {}", job.read.display(), why);
                    Some((job.read.clone(), why))
                }
            })
            .collect()
    });
    info!(
        "Finished {} reads, {} failed",
        jobs.len() - failures.len(),
        failures.len()
    );
    Ok(failures)
}

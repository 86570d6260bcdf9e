//! Orienting a 2D read against the reference with an external short-read
//! aligner (`bwa`). Only the command line contract of the aligner is used.
use crate::sam::Sam;
use crate::NpReadError;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Prefix of the index `bwa index` writes into the output directory.
pub const INDEX_PREFIX: &str = "temp_bwaIndex";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    pub fn is_forward(&self) -> bool {
        *self == Orientation::Forward
    }
}

pub trait Orienter {
    /// Orientation of the (first) read in the FASTA file `query`.
    fn orient(&self, query: &Path) -> Result<Orientation, NpReadError>;
}

/// Orientation of the first mapped record of a SAM stream.
pub fn orientation_from_sam<R: BufRead>(rdr: R) -> Result<Orientation, NpReadError> {
    let sam = Sam::from_reader(rdr)?;
    let record = sam
        .records
        .iter()
        .find(|r| !r.is_unmapped())
        .ok_or_else(|| NpReadError::Aligner("no mapped record".to_string()))?;
    match record.is_reverse() {
        true => Ok(Orientation::Reverse),
        false => Ok(Orientation::Forward),
    }
}

#[derive(Debug, Clone)]
pub struct Bwa {
    binary: PathBuf,
    index: PathBuf,
}

fn run(command: &mut Command) -> Result<Vec<u8>, NpReadError> {
    debug!("Running {:?}", command);
    let output = command.output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NpReadError::Aligner(format!("{:?}:{}", command, stderr.trim())));
    }
    Ok(output.stdout)
}

impl Bwa {
    /// Use an index built beforehand.
    pub fn with_index<P: AsRef<Path>, Q: AsRef<Path>>(binary: P, index: Q) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            index: index.as_ref().to_path_buf(),
        }
    }
    /// Index `reference` into `dir`.
    pub fn build_index<P: AsRef<Path>>(
        binary: P,
        reference: &Path,
        dir: &Path,
    ) -> Result<Self, NpReadError> {
        let index = dir.join(INDEX_PREFIX);
        info!("Indexing {}", reference.display());
        run(Command::new(binary.as_ref())
            .arg("index")
            .arg("-p")
            .arg(&index)
            .arg(reference))?;
        info!("Indexing {}, done", reference.display());
        Ok(Self::with_index(binary, index))
    }
    pub fn index(&self) -> &Path {
        &self.index
    }
}

impl Orienter for Bwa {
    fn orient(&self, query: &Path) -> Result<Orientation, NpReadError> {
        let stdout = run(Command::new(&self.binary)
            .arg("mem")
            .arg("-x")
            .arg("ont2d")
            .arg(&self.index)
            .arg(query))?;
        orientation_from_sam(stdout.as_slice())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn from_sam() {
        let forward = "@SQ\tSN:ref\tLN:100\nr\t0\tref\t1\t60\t10M\t*\t0\t0\t*\t*\n";
        assert_eq!(orientation_from_sam(forward.as_bytes()).unwrap(), Orientation::Forward);
        let reverse = "r\t4\t*\t0\t0\t*\t*\t0\t0\t*\t*\nr\t16\tref\t1\t60\t10M\t*\t0\t0\t*\t*\n";
        assert_eq!(orientation_from_sam(reverse.as_bytes()).unwrap(), Orientation::Reverse);
        let unmapped = "r\t4\t*\t0\t0\t*\t*\t0\t0\t*\t*\n";
        assert!(orientation_from_sam(unmapped.as_bytes()).is_err());
    }
    #[test]
    fn missing_binary() {
        let bwa = Bwa::with_index("/nonexistent/bwa", "/nonexistent/index");
        assert!(bwa.orient(Path::new("/nonexistent/read.fa")).is_err());
    }
}

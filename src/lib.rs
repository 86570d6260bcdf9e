//! Turning basecalled nanopore reads into the inputs of a signal-level
//! aligner: the npRead record, the 2D read, and the emission models.
#[macro_use]
extern crate log;
pub mod error;
pub mod event;
pub mod event_map;
pub mod fasta;
pub mod gen_read;
pub mod model;
pub mod npread;
pub mod orient;
pub mod pipeline;
pub mod sam;
pub mod store;
pub use error::{MappingError, NpReadError};
pub use event::{DriftCorrected, Event, EventTable};
pub use event_map::{map_events, AlignmentRow, EventMaps};
pub use model::{EmissionModel, Strand};
pub use npread::{NanoporeRead, NpRead};
pub use store::{EventStore, ReadStore};

use std::io::Write;

/// Build the npRead of the read in `store` and write it into `npread`, then
/// write the 2D read into `two_d_read` as FASTA.
/// Nothing is written if the read can not be mapped.
pub fn make_npread_and_2d_seq<S, W, V>(
    store: &S,
    npread: &mut W,
    two_d_read: &mut V,
) -> Result<NpRead, NpReadError>
where
    S: EventStore + ?Sized,
    W: Write,
    V: Write,
{
    let read = NanoporeRead::load(store);
    let mut fasta = vec![];
    read.write_2d_read(&mut fasta, orient::Orientation::Forward)?;
    let record = read.into_npread()?;
    write!(npread, "{}", record)?;
    two_d_read.write_all(&fasta)?;
    debug!(
        "{}bp, {} template and {} complement events",
        record.sequence.len(),
        record.template.events.len(),
        record.complement.events.len()
    );
    Ok(record)
}

/// Export the model of both strands into `dir`. Strands without a model, or
/// whose model has no name, are reported and skipped.
pub fn export_models<S, P>(store: &S, dir: P) -> Vec<std::path::PathBuf>
where
    S: EventStore + ?Sized,
    P: AsRef<std::path::Path>,
{
    Strand::ALL
        .iter()
        .filter_map(|&strand| {
            let model = EmissionModel::load(store, strand).ok()?;
            match model.export_to_dir(dir.as_ref()) {
                Ok(path) => Some(path),
                Err(why) => {
                    warn!("{}", why);
                    None
                }
            }
        })
        .collect()
}

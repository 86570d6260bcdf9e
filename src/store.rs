//! Path-addressed access to the contents of a basecalled read.
//!
//! The basecaller keeps everything about a read under slash-separated paths
//! such as `/Analyses/Basecall_2D_000/BaseCalled_2D/Alignment`. Each path may
//! hold a dataset, a set of attributes, or both, and any path may be missing.
//! [`EventStore`] is the interface the rest of the crate reads through;
//! [`ReadStore`] is an in-memory implementation which can be filled by hand or
//! decoded from a JSON dump of a read.
use crate::event::EventRecord;
use crate::event_map::AlignmentRow;
use crate::model::KmerRecord;
use crate::NpReadError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// The 2D basecall in FASTQ form.
pub const TWO_D_FASTQ: &str = "/Analyses/Basecall_2D_000/BaseCalled_2D/Fastq";
/// The table aligning template and complement events to 2D kmers.
pub const TWO_D_ALIGNMENT: &str = "/Analyses/Basecall_2D_000/BaseCalled_2D/Alignment";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attr {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Dataset {
    Events(Vec<EventRecord>),
    Alignment(Vec<AlignmentRow>),
    Model(Vec<KmerRecord>),
    Text(String),
}

/// One path of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub attrs: HashMap<String, Attr>,
    #[serde(default)]
    pub data: Option<Dataset>,
}

impl Node {
    pub fn with_data(data: Dataset) -> Self {
        Self {
            attrs: HashMap::new(),
            data: Some(data),
        }
    }
    pub fn attr<K: Into<String>>(mut self, key: K, value: Attr) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }
}

/// Lookup of datasets and attributes by path. Absence is never an error here;
/// every accessor returns `None` when the path, the attribute, or a dataset of
/// the requested kind is not there.
pub trait EventStore {
    fn node(&self, path: &str) -> Option<&Node>;
    fn contains(&self, path: &str) -> bool {
        self.node(path).is_some()
    }
    fn events(&self, path: &str) -> Option<&[EventRecord]> {
        match self.node(path)?.data.as_ref()? {
            Dataset::Events(events) => Some(events),
            _ => None,
        }
    }
    fn alignment(&self, path: &str) -> Option<&[AlignmentRow]> {
        match self.node(path)?.data.as_ref()? {
            Dataset::Alignment(rows) => Some(rows),
            _ => None,
        }
    }
    fn kmer_model(&self, path: &str) -> Option<&[KmerRecord]> {
        match self.node(path)?.data.as_ref()? {
            Dataset::Model(kmers) => Some(kmers),
            _ => None,
        }
    }
    fn text(&self, path: &str) -> Option<&str> {
        match self.node(path)?.data.as_ref()? {
            Dataset::Text(text) => Some(text),
            _ => None,
        }
    }
    fn number(&self, path: &str, name: &str) -> Option<f64> {
        match self.node(path)?.attrs.get(name)? {
            Attr::Number(x) => Some(*x),
            Attr::Text(_) => None,
        }
    }
    fn string(&self, path: &str, name: &str) -> Option<&str> {
        match self.node(path)?.attrs.get(name)? {
            Attr::Text(x) => Some(x),
            Attr::Number(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadStore {
    nodes: HashMap<String, Node>,
}

impl ReadStore {
    pub fn new() -> Self {
        Self::default()
    }
    /// Open a JSON dump of a read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, NpReadError> {
        let rdr = std::fs::File::open(path.as_ref()).map(std::io::BufReader::new)?;
        Self::from_reader(rdr)
    }
    pub fn from_reader<R: BufRead>(rdr: R) -> Result<Self, NpReadError> {
        let store: Self = serde_json::from_reader(rdr)?;
        debug!("Loaded {} paths", store.nodes.len());
        Ok(store)
    }
    pub fn insert<K: Into<String>>(&mut self, path: K, node: Node) -> Option<Node> {
        self.nodes.insert(path.into(), node)
    }
    pub fn remove(&mut self, path: &str) -> Option<Node> {
        self.nodes.remove(path)
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl EventStore for ReadStore {
    fn node(&self, path: &str) -> Option<&Node> {
        self.nodes.get(path)
    }
}

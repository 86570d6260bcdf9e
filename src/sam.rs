//! Tiny library to read SAM file(read only).
//! Only the mandatory fields needed to orient a read are kept.
use std::io::BufRead;

/// Flag bit of a record aligned to the reverse strand.
pub const REVERSE: u32 = 0x10;
/// Flag bit of an unmapped record.
pub const UNMAPPED: u32 = 0x4;

/// SAM file. Headers are skipped.
#[derive(Debug, Clone)]
pub struct Sam {
    /// SAM records.
    pub records: Vec<Record>,
}

impl Sam {
    /// Read SAM file from the BufferedReader. Malformed lines are skipped.
    pub fn from_reader<R: BufRead>(rdr: R) -> std::io::Result<Sam> {
        let mut records = vec![];
        for line in rdr.lines() {
            let line = line?;
            if line.starts_with('@') || line.is_empty() {
                continue;
            }
            match Record::new(&line) {
                Some(record) => records.push(record),
                None => warn!("Malformed SAM line:{}", line),
            }
        }
        Ok(Self { records })
    }
}

/// SAM Record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    q_name: String,
    flag: u32,
    r_name: String,
    pos: usize,
    mapq: u8,
}

impl Record {
    pub fn new(input: &str) -> Option<Self> {
        let mut contents = input.split('\t');
        let q_name = contents.next()?.to_string();
        let flag = contents.next()?.parse().ok()?;
        let r_name = contents.next()?.to_string();
        let pos = contents.next()?.parse().ok()?;
        let mapq = contents.next()?.parse().ok()?;
        Some(Self {
            q_name,
            flag,
            r_name,
            pos,
            mapq,
        })
    }
    pub fn q_name(&self) -> &str {
        &self.q_name
    }
    pub fn r_name(&self) -> &str {
        &self.r_name
    }
    pub fn flag(&self) -> u32 {
        self.flag
    }
    pub fn pos(&self) -> usize {
        self.pos
    }
    pub fn mapq(&self) -> u8 {
        self.mapq
    }
    pub fn is_reverse(&self) -> bool {
        self.flag & REVERSE == REVERSE
    }
    pub fn is_unmapped(&self) -> bool {
        self.flag & UNMAPPED == UNMAPPED
    }
}

#[cfg(test)]
mod test {
    use super::*;
    const SAM: &str = "@SQ\tSN:ref\tLN:5000\n@PG\tID:bwa\tPN:bwa\n\
        read_1\t16\tref\t120\t60\t30M\t*\t0\t0\tACGT\t*\n\
        read_1\t2064\tref\t900\t0\t20M\t*\t0\t0\tACGT\t*\n";
    #[test]
    fn parse() {
        let sam = Sam::from_reader(SAM.as_bytes()).unwrap();
        assert_eq!(sam.records.len(), 2);
        let first = &sam.records[0];
        assert_eq!(first.q_name(), "read_1");
        assert_eq!(first.r_name(), "ref");
        assert_eq!(first.pos(), 120);
        assert_eq!(first.mapq(), 60);
        assert!(first.is_reverse());
        assert!(!first.is_unmapped());
    }
    #[test]
    fn skip_malformed() {
        let sam = Sam::from_reader("read\tnot_a_flag\n\nread\t4\t*\t0\t0\n".as_bytes()).unwrap();
        assert_eq!(sam.records.len(), 1);
        assert!(sam.records[0].is_unmapped());
    }
}

//! Very thin Fasta reader. Only support batch IO.
use std::io::Write;
use std::path::Path;
pub type FASTARecord = (String, Vec<u8>);
pub type FASTQRecord = (String, Vec<u8>, Vec<u8>);

/// Write records into the writer
pub fn write_fasta<W: Write>(wtr: &mut W, records: &[FASTARecord]) -> std::io::Result<()> {
    for (id, seq) in records {
        writeln!(wtr, ">{}\n{}", id, String::from_utf8_lossy(seq))?;
    }
    Ok(())
}

/// Read and parse a FASTA file. A file not starting with a record gives no records.
pub fn read_fasta<P: AsRef<Path>>(file: P) -> std::io::Result<Vec<FASTARecord>> {
    let contents = std::fs::read(file)?;
    Ok(parse_fasta(&contents))
}

pub fn parse_fasta(contents: &[u8]) -> Vec<FASTARecord> {
    let mut contents = contents.split(|&x| x == b'>');
    match contents.next() {
        Some(first) if !first.iter().all(u8::is_ascii_whitespace) => return vec![],
        _ => {}
    }
    contents
        .filter_map(|record| {
            let mut record = record.splitn(2, |&x| x == b'\n');
            let id = record.next()?.split(|&x| x == b' ').next()?;
            let contents = record.next()?;
            let contents: Vec<_> = contents
                .iter()
                .filter(|x| !x.is_ascii_whitespace())
                .copied()
                .collect();
            Some((String::from_utf8_lossy(id).trim().to_string(), contents))
        })
        .collect()
}

/// Parse FASTQ records. The ID is the first word of the header.
/// Parsing stops at the first incomplete record.
pub fn parse_fastq(contents: &[u8]) -> Vec<FASTQRecord> {
    let mut contents = contents.split(|&x| x == b'\n');
    let parse = || -> Option<(String, Vec<u8>, Vec<u8>)> {
        let header = contents.next()?;
        let header = header.strip_prefix(b"@")?;
        let id = header.split(|x| x.is_ascii_whitespace()).next()?;
        let seq = contents.next()?.to_vec();
        let _id2 = contents.next()?;
        let qual = contents.next()?.to_vec();
        let id: String = String::from_utf8_lossy(id).to_string();
        Some((id, trim_cr(seq), trim_cr(qual)))
    };
    std::iter::from_fn(parse).collect()
}

fn trim_cr(mut xs: Vec<u8>) -> Vec<u8> {
    if xs.last() == Some(&b'\r') {
        xs.pop();
    }
    xs
}

fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' => b'a',
        _ => b'N',
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Write the sequence of each record on its own line, reverse complemented if
/// `forward` is false. The signal-level aligner reads references in this form.
pub fn write_sequences<W: Write>(
    wtr: &mut W,
    records: &[FASTARecord],
    forward: bool,
) -> std::io::Result<()> {
    for (_, seq) in records {
        if forward {
            wtr.write_all(seq)?;
        } else {
            wtr.write_all(&reverse_complement(seq))?;
        }
        writeln!(wtr)?;
    }
    Ok(())
}

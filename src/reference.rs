//! Indexed FASTA access for REF bases in VCF output.
//!
//! Uses the samtools FAI layout (`NAME LENGTH OFFSET LINEBASES LINEWIDTH`).
//! A `<fasta>.fai` next to the FASTA is loaded when present; otherwise the
//! index is built by scanning the FASTA once.

use crate::error::{Result, SvError};
use crate::output::ReferenceBases;
use rustc_hash::FxHashMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One sequence of an FAI index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaiEntry {
    pub name: String,
    /// Sequence length in bases
    pub length: u64,
    /// Byte offset of the first base
    pub offset: u64,
    pub line_bases: u64,
    /// Bytes per line including the line terminator
    pub line_width: u64,
}

impl FaiEntry {
    fn from_line(line: &str, line_num: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 5 {
            return Err(SvError::Parse {
                line: line_num,
                message: format!("FAI entry needs 5 fields, got {}", fields.len()),
            });
        }

        let parse = |s: &str, field: &str| {
            s.trim().parse::<u64>().map_err(|_| SvError::Parse {
                line: line_num,
                message: format!("Invalid FAI {}: '{}'", field, s),
            })
        };

        Ok(FaiEntry {
            name: fields[0].to_string(),
            length: parse(fields[1], "LENGTH")?,
            offset: parse(fields[2], "OFFSET")?,
            line_bases: parse(fields[3], "LINEBASES")?,
            line_width: parse(fields[4], "LINEWIDTH")?,
        })
    }

    /// Byte offset of 0-based `position`, accounting for line wrapping.
    fn position_to_offset(&self, position: u64) -> Option<u64> {
        if position >= self.length || self.line_bases == 0 {
            return None;
        }
        let line = position / self.line_bases;
        Some(self.offset + line * self.line_width + position % self.line_bases)
    }
}

/// Path of the FAI index belonging to `fasta`.
pub fn fai_path(fasta: &Path) -> PathBuf {
    let mut path: OsString = fasta.as_os_str().to_owned();
    path.push(".fai");
    PathBuf::from(path)
}

/// Parse an FAI index.
pub fn read_fai<R: Read>(reader: R) -> Result<FxHashMap<String, FaiEntry>> {
    let mut entries = FxHashMap::default();
    for (line_num, line_result) in BufReader::new(reader).lines().enumerate() {
        let line = line_result?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = FaiEntry::from_line(&line, line_num + 1)?;
        entries.insert(entry.name.clone(), entry);
    }
    Ok(entries)
}

/// Build an FAI index by scanning a FASTA stream.
pub fn build_fai<R: Read>(reader: R) -> Result<FxHashMap<String, FaiEntry>> {
    let mut reader = BufReader::new(reader);
    let mut entries = FxHashMap::default();
    let mut current: Option<FaiEntry> = None;
    let mut buffer = String::new();
    let mut byte_offset: u64 = 0;

    loop {
        buffer.clear();
        let bytes_read = reader.read_line(&mut buffer)? as u64;
        if bytes_read == 0 {
            break;
        }

        if let Some(header) = buffer.strip_prefix('>') {
            if let Some(entry) = current.take() {
                entries.insert(entry.name.clone(), entry);
            }
            let name = header.split_whitespace().next().ok_or_else(|| {
                SvError::InvalidReference("FASTA record with empty name".to_string())
            })?;
            current = Some(FaiEntry {
                name: name.to_string(),
                length: 0,
                offset: byte_offset + bytes_read,
                line_bases: 0,
                line_width: 0,
            });
        } else if let Some(entry) = current.as_mut() {
            let bases = buffer.trim_end_matches(['\n', '\r']).len() as u64;
            if bases > 0 {
                // Line geometry comes from the first sequence line.
                if entry.line_bases == 0 {
                    entry.line_bases = bases;
                    entry.line_width = bytes_read;
                }
                entry.length += bases;
            }
        }

        byte_offset += bytes_read;
    }

    if let Some(entry) = current {
        entries.insert(entry.name.clone(), entry);
    }
    Ok(entries)
}

/// Random base access into a FASTA file through its FAI index.
#[derive(Debug)]
pub struct IndexedFasta {
    entries: FxHashMap<String, FaiEntry>,
    file: Mutex<File>,
}

impl IndexedFasta {
    /// Open `path`, loading `<path>.fai` or building the index in memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fai = fai_path(path);

        let entries = if fai.exists() {
            log::info!("Loading FASTA index {}", fai.display());
            read_fai(File::open(&fai)?)?
        } else {
            log::info!("No index at {}, scanning {}", fai.display(), path.display());
            build_fai(File::open(path)?)?
        };

        if entries.is_empty() {
            return Err(SvError::InvalidReference(format!(
                "no sequences in {}",
                path.display()
            )));
        }

        Ok(Self {
            entries,
            file: Mutex::new(File::open(path)?),
        })
    }

    pub fn entry(&self, name: &str) -> Option<&FaiEntry> {
        self.entries.get(name)
    }

    /// Uppercased base at 0-based `position`, or `None` outside the sequence.
    pub fn fetch_base(&self, name: &str, position: u64) -> Result<Option<u8>> {
        let Some(offset) = self
            .entries
            .get(name)
            .and_then(|entry| entry.position_to_offset(position))
        else {
            return Ok(None);
        };

        let mut file = self
            .file
            .lock()
            .map_err(|_| SvError::InvalidReference("FASTA handle poisoned".to_string()))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut base = [0u8; 1];
        file.read_exact(&mut base)?;
        Ok(Some(base[0].to_ascii_uppercase()))
    }
}

impl ReferenceBases for IndexedFasta {
    fn base(&self, chrom: &str, pos: i64) -> Option<u8> {
        let position = u64::try_from(pos).ok()?;
        match self.fetch_base(chrom, position) {
            Ok(base) => base,
            Err(e) => {
                log::warn!("Failed to fetch {}:{} from reference: {}", chrom, pos, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FASTA: &str = ">1\nACGTACGTAC\ngaTcaaccca\nTT\n>2 second contig\nCCCC\n";

    fn fasta_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_build_fai() {
        let entries = build_fai(FASTA.as_bytes()).unwrap();

        assert_eq!(
            entries["1"],
            FaiEntry {
                name: "1".to_string(),
                length: 22,
                offset: 3,
                line_bases: 10,
                line_width: 11,
            }
        );
        assert_eq!(entries["2"].offset, 45);
        assert_eq!(entries["2"].length, 4);
    }

    #[test]
    fn test_read_fai() {
        let entries = read_fai("1\t22\t3\t10\t11\n2\t4\t45\t4\t5\n".as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["2"].line_width, 5);

        assert!(matches!(
            read_fai("1\t22\t3\n".as_bytes()),
            Err(SvError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_fetch_without_index() {
        let file = fasta_file(FASTA);
        let fasta = IndexedFasta::open(file.path()).unwrap();

        assert_eq!(fasta.base("1", 0), Some(b'A'));
        // Crosses the first line break; lowercase is uppercased.
        assert_eq!(fasta.base("1", 11), Some(b'A'));
        assert_eq!(fasta.base("1", 12), Some(b'T'));
        assert_eq!(fasta.base("1", 21), Some(b'T'));
        assert_eq!(fasta.base("2", 3), Some(b'C'));
    }

    #[test]
    fn test_fetch_out_of_range() {
        let file = fasta_file(FASTA);
        let fasta = IndexedFasta::open(file.path()).unwrap();

        assert_eq!(fasta.base("1", 22), None);
        assert_eq!(fasta.base("1", -1), None);
        assert_eq!(fasta.base("MT", 0), None);
    }

    #[test]
    fn test_open_uses_existing_index() {
        let file = fasta_file(FASTA);
        // An index that only knows contig 2.
        std::fs::write(fai_path(file.path()), "2\t4\t45\t4\t5\n").unwrap();

        let fasta = IndexedFasta::open(file.path()).unwrap();
        assert!(fasta.entry("1").is_none());
        assert_eq!(fasta.base("2", 0), Some(b'C'));

        std::fs::remove_file(fai_path(file.path())).unwrap();
    }

    #[test]
    fn test_open_empty_fasta_fails() {
        let file = fasta_file("");
        assert!(matches!(
            IndexedFasta::open(file.path()),
            Err(SvError::InvalidReference(_))
        ));
    }
}

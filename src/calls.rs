//! Streaming reader for tab-separated SV call tables.
//!
//! One call per line:
//!
//! ```text
//! chrom  start  end  sv_type  length  source  [genotype  [wiggle  [info]]]
//! ```
//!
//! `info` is `KEY=VALUE;FLAG;...`, and `.` marks an absent optional column.
//! The raw line is kept as the call's native payload.

use crate::error::{Result, SvError};
use crate::interval::{InfoMap, SvInterval, SvSource, SvType};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A streaming SV call reader.
pub struct CallReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
    default_wiggle: i64,
}

impl CallReader<File> {
    /// Open a call table from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> CallReader<R> {
    /// Create a new reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
            default_wiggle: 0,
        }
    }

    /// Wiggle applied to calls whose line has no wiggle column.
    pub fn with_default_wiggle(mut self, wiggle: i64) -> Self {
        self.default_wiggle = wiggle;
        self
    }

    /// Read the next call.
    pub fn read_call(&mut self) -> Result<Option<SvInterval>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            // Skip empty lines and comments
            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            return self.parse_line(line).map(Some);
        }
    }

    fn parse_line(&self, line: &str) -> Result<SvInterval> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < 6 {
            return Err(self.parse_error(format!(
                "Expected at least 6 fields, got {}",
                fields.len()
            )));
        }

        let chrom = fields[0];
        let start = self.parse_int(fields[1], "start")?;
        let end = self.parse_int(fields[2], "end")?;
        if start > end {
            return Err(self.parse_error(format!("Start ({}) > end ({})", start, end)));
        }

        let sv_type: SvType = fields[3].parse().unwrap_or_else(|e| match e {});
        let length = self.parse_int(fields[4], "length")?;
        let source: SvSource = fields[5].parse()?;

        let mut call = SvInterval::leaf(chrom, start, end, sv_type, length, source)
            .with_wiggle(self.default_wiggle)
            .with_native(line);

        if let Some(genotype) = optional(&fields, 6) {
            call = call.with_genotype(genotype);
        }
        if let Some(wiggle) = optional(&fields, 7) {
            call = call.with_wiggle(self.parse_int(wiggle, "wiggle")?);
        }
        if let Some(info) = optional(&fields, 8) {
            call = call.with_info(parse_info(info));
        }

        Ok(call)
    }

    fn parse_int(&self, s: &str, field_name: &str) -> Result<i64> {
        s.trim()
            .parse()
            .map_err(|_| self.parse_error(format!("Invalid {}: '{}'", field_name, s)))
    }

    fn parse_error(&self, message: String) -> SvError {
        SvError::Parse {
            line: self.line_number,
            message,
        }
    }

    /// Get an iterator over all calls.
    pub fn calls(self) -> CallIter<R> {
        CallIter { reader: self }
    }
}

fn optional<'a>(fields: &[&'a str], idx: usize) -> Option<&'a str> {
    fields
        .get(idx)
        .map(|field| field.trim())
        .filter(|field| !field.is_empty() && *field != ".")
}

/// Parse `KEY=VALUE;FLAG;...` into an INFO map.
pub fn parse_info(s: &str) -> InfoMap {
    s.split(';')
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (entry.to_string(), None),
        })
        .collect()
}

/// Iterator over SV calls.
pub struct CallIter<R: Read> {
    reader: CallReader<R>,
}

impl<R: Read> Iterator for CallIter<R> {
    type Item = Result<SvInterval>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_call() {
            Ok(Some(call)) => Some(Ok(call)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Read all calls from a file.
pub fn read_calls<P: AsRef<Path>>(path: P, default_wiggle: i64) -> Result<Vec<SvInterval>> {
    let reader = CallReader::from_path(path)?.with_default_wiggle(default_wiggle);
    reader.calls().collect()
}

/// Parse calls from a string (useful for testing).
pub fn parse_calls(content: &str) -> Result<Vec<SvInterval>> {
    CallReader::new(content.as_bytes()).calls().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let content = "1\t100\t200\tDEL\t100\tPindel\n";
        let calls = parse_calls(content).unwrap();

        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.chrom, "1");
        assert_eq!((call.start, call.end, call.length), (100, 200, 100));
        assert_eq!(call.sv_type, SvType::Del);
        assert_eq!(call.source(), Some(SvSource::Pindel));
        assert_eq!(call.genotype, "./1");
        assert_eq!(call.native.as_deref(), Some("1\t100\t200\tDEL\t100\tPindel"));
    }

    #[test]
    fn test_parse_optional_columns() {
        let content = "X\t5000\t5100\tINS\t300\tbreakseq\t0/1\t25\tHOMLEN=4;SOMATIC\n";
        let calls = parse_calls(content).unwrap();
        let call = &calls[0];

        assert_eq!(call.source(), Some(SvSource::BreakSeq));
        assert_eq!(call.genotype, "0/1");
        assert_eq!(call.wiggle, 25);
        let info = call.info.as_ref().unwrap();
        assert_eq!(info.get("HOMLEN"), Some(&Some("4".to_string())));
        assert_eq!(info.get("SOMATIC"), Some(&None));
    }

    #[test]
    fn test_default_wiggle_and_placeholders() {
        let content = "1\t100\t200\tDEL\t100\tBreakDancer\t.\t.\t.\n";
        let reader = CallReader::new(content.as_bytes()).with_default_wiggle(100);
        let calls: Vec<_> = reader.calls().collect::<Result<_>>().unwrap();

        assert_eq!(calls[0].wiggle, 100);
        assert_eq!(calls[0].genotype, "./1");
        assert!(calls[0].info.is_none());
    }

    #[test]
    fn test_skip_comments_and_blank_lines() {
        let content = "# header\n\n1\t100\t200\tDEL\t100\tPindel\n";
        assert_eq!(parse_calls(content).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_source_rejected() {
        let content = "1\t100\t200\tDEL\t100\tLumpy\n";
        assert!(matches!(
            parse_calls(content),
            Err(SvError::UnknownSource(name)) if name == "Lumpy"
        ));
    }

    #[test]
    fn test_bad_rows_report_line() {
        let content = "1\t100\t200\tDEL\t100\tPindel\n1\t300\t200\tDEL\t100\tPindel\n";
        assert!(matches!(
            parse_calls(content),
            Err(SvError::Parse { line: 2, .. })
        ));
        assert!(parse_calls("1\t100\t200\tDEL\n").is_err());
        assert!(parse_calls("1\tabc\t200\tDEL\t100\tPindel\n").is_err());
    }
}

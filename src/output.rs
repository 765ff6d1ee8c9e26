//! Serializers for consolidated calls: VCF, BED and SVP tables.
//!
//! Uses itoa for integer formatting to avoid allocation per field.

use crate::error::Result;
use crate::interval::{InfoMap, SvInterval, SvSource, SvType};
use std::fmt;
use std::io::{BufWriter, Write};
use std::str::FromStr;

/// Buffer size for SvWriter (1MB default).
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

const VCF_HEADER: &str = "##fileformat=VCFv4.1
##INFO=<ID=END,Number=1,Type=Integer,Description=\"End position of the variant described in this record\">
##INFO=<ID=SVLEN,Number=.,Type=Integer,Description=\"Difference in length between REF and ALT alleles\">
##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Type of structural variant\">
##INFO=<ID=SVMETHOD,Number=.,Type=String,Description=\"Evidence classes used to call the variant\">
##INFO=<ID=IMPRECISE,Number=0,Type=Flag,Description=\"Imprecise structural variation\">
##INFO=<ID=CIPOS,Number=2,Type=Integer,Description=\"Confidence interval around POS for imprecise variants\">
##INFO=<ID=CIEND,Number=2,Type=Integer,Description=\"Confidence interval around END for imprecise variants\">
##INFO=<ID=VT,Number=1,Type=String,Description=\"Variant type\">
##INFO=<ID=SVTOOL,Number=1,Type=String,Description=\"Tool used to generate the record\">
##INFO=<ID=NUM_SVMETHODS,Number=1,Type=Integer,Description=\"Number of methods supporting the event\">
##INFO=<ID=SOURCES,Number=.,Type=String,Description=\"Source calls merged into the record\">
##ALT=<ID=DEL,Description=\"Deletion\">
##ALT=<ID=INS,Description=\"Insertion of novel sequence\">
##ALT=<ID=DUP,Description=\"Duplication\">
##ALT=<ID=DUP:TANDEM,Description=\"Tandem Duplication\">
##ALT=<ID=INV,Description=\"Inversion\">
##FILTER=<ID=LowQual,Description=\"Not corroborated by more than one method\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
";

/// Base lookup into a reference sequence. Positions are 0-based.
pub trait ReferenceBases {
    fn base(&self, chrom: &str, pos: i64) -> Option<u8>;
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Vcf,
    Bed,
    Svp,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vcf" => Ok(OutputFormat::Vcf),
            "bed" => Ok(OutputFormat::Bed),
            "svp" => Ok(OutputFormat::Svp),
            _ => Err(format!("Invalid format '{}'. Use: vcf, bed, svp", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Vcf => write!(f, "vcf"),
            OutputFormat::Bed => write!(f, "bed"),
            OutputFormat::Svp => write!(f, "svp"),
        }
    }
}

/// Buffered writer for consolidated SV records.
pub struct SvWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> SvWriter<W> {
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    #[inline]
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.writer.write_all(s.as_bytes())?;
        Ok(())
    }

    #[inline]
    fn write_int(&mut self, n: i64) -> Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    #[inline]
    fn write_tab(&mut self) -> Result<()> {
        self.write_str("\t")
    }

    /// Write the VCF meta lines and column header.
    pub fn write_vcf_header(&mut self, sample: &str) -> Result<()> {
        self.write_str(VCF_HEADER)?;
        self.write_str("##source=svmerge-")?;
        self.write_str(crate::VERSION)?;
        self.write_str("\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t")?;
        self.write_str(sample)?;
        self.write_str("\n")
    }

    /// Write one VCF record. Returns false if the interval is not reportable.
    pub fn write_vcf_record(
        &mut self,
        interval: &SvInterval,
        reference: Option<&dyn ReferenceBases>,
    ) -> Result<bool> {
        if interval.start <= 0 || !interval.sv_type.is_of_interest() {
            return Ok(false);
        }
        // Calls seen only by the local assembler are not reported.
        if interval.sources().only() == Some(SvSource::HaplotypeCaller) {
            return Ok(false);
        }

        let ref_base = reference
            .and_then(|r| r.base(&interval.chrom, interval.start - 1))
            .unwrap_or(b'N');

        self.write_str(&interval.chrom)?;
        self.write_tab()?;
        self.write_int(interval.start)?;
        self.write_str("\t.\t")?;
        self.writer.write_all(&[ref_base])?;
        self.write_str("\t<")?;
        self.write_str(interval.sv_type.as_str())?;
        self.write_str(">\t.\t")?;
        self.write_str(if interval.is_validated() {
            "PASS"
        } else {
            "LowQual"
        })?;
        self.write_tab()?;
        self.write_str(&render_info(&vcf_info(interval)))?;
        self.write_str("\tGT\t1/1\n")?;
        Ok(true)
    }

    /// Write one BED record. Returns false if the interval is not reportable.
    pub fn write_bed_record(&mut self, interval: &SvInterval) -> Result<bool> {
        if interval.start <= 0 || !is_track_type(&interval.sv_type) {
            return Ok(false);
        }

        let end = if interval.sv_type == SvType::Ins {
            interval.end + 1
        } else {
            interval.end
        };

        self.write_str(&interval.chrom)?;
        self.write_tab()?;
        self.write_int(interval.start)?;
        self.write_tab()?;
        self.write_int(end)?;
        self.write_tab()?;
        self.write_str(interval.sv_type.as_str())?;
        self.write_str(",")?;
        self.write_int(interval.length)?;
        self.write_str(",")?;
        self.write_str(&interval.sources().method_codes().join(";"))?;
        self.write_tab()?;
        self.write_int(interval.sources().len() as i64)?;
        self.write_str("\n")?;
        Ok(true)
    }

    /// Write one SVP record. Returns false if the interval is not reportable.
    pub fn write_svp_record(&mut self, interval: &SvInterval, sample: &str, id: i64) -> Result<bool> {
        if interval.start <= 0 || !is_track_type(&interval.sv_type) {
            return Ok(false);
        }
        if interval.sources().only() == Some(SvSource::HaplotypeCaller) {
            return Ok(false);
        }

        self.write_str(&interval.chrom)?;
        // Outer and inner bounds coincide.
        for pos in [interval.start, interval.start, interval.end, interval.end] {
            self.write_tab()?;
            self.write_int(pos)?;
        }
        self.write_tab()?;
        self.write_str(interval.sv_type.as_str())?;
        self.write_tab()?;
        self.write_int(interval.length)?;
        self.write_str("\tBWA\tIllumina\t")?;
        self.write_str(sample)?;
        self.write_tab()?;
        self.write_str(&interval.sources().method_codes().join(","))?;
        self.write_str("\tMetaSV\t")?;
        self.write_int(id)?;
        self.write_str("\n")?;
        Ok(true)
    }

    /// Write every reportable interval in `format`. Returns the record count.
    pub fn write_all(
        &mut self,
        format: OutputFormat,
        intervals: &[SvInterval],
        sample: &str,
        reference: Option<&dyn ReferenceBases>,
    ) -> Result<usize> {
        let mut written = 0usize;
        if format == OutputFormat::Vcf {
            self.write_vcf_header(sample)?;
        }
        for interval in intervals {
            let emitted = match format {
                OutputFormat::Vcf => self.write_vcf_record(interval, reference)?,
                OutputFormat::Bed => self.write_bed_record(interval)?,
                OutputFormat::Svp => {
                    self.write_svp_record(interval, sample, written as i64 + 1)?
                }
            };
            written += usize::from(emitted);
        }
        self.flush()?;
        Ok(written)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn is_track_type(sv_type: &SvType) -> bool {
    matches!(sv_type, SvType::Del | SvType::Ins | SvType::Inv)
}

/// INFO for a VCF record: passthrough info from the interval and its
/// members (later members overwrite), then the consensus annotations.
fn vcf_info(interval: &SvInterval) -> InfoMap {
    let mut info = InfoMap::new();
    if let Some(own) = &interval.info {
        info.extend(own.clone());
    }
    for member in interval.members() {
        if let Some(member_info) = &member.info {
            info.extend(member_info.clone());
        }
    }

    let mut set = |key: &str, value: Option<String>| {
        info.insert(key.to_string(), value);
    };

    let sv_len = if interval.sv_type == SvType::Del {
        -interval.length
    } else {
        interval.length
    };
    set("SVLEN", Some(sv_len.to_string()));
    set("SVTYPE", Some(interval.sv_type.to_string()));
    set(
        "SVMETHOD",
        Some(interval.sources().method_codes().join(",")),
    );
    if matches!(interval.sv_type, SvType::Del | SvType::Dup) {
        set("END", Some(interval.end.to_string()));
    }
    if !interval.is_precise() {
        set("IMPRECISE", None);
    }
    set("VT", Some("SV".to_string()));
    set("SVTOOL", Some("MetaSVMerge".to_string()));
    set("NUM_SVMETHODS", Some(interval.sources().len().to_string()));
    set("SOURCES", Some(interval.to_string()));
    if let Some((lo, hi)) = interval.cipos {
        set("CIPOS", Some(format!("{},{}", lo, hi)));
    }
    if let Some((lo, hi)) = interval.ciend {
        set("CIEND", Some(format!("{},{}", lo, hi)));
    }
    info
}

fn render_info(info: &InfoMap) -> String {
    if info.is_empty() {
        return ".".to_string();
    }
    info.iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{}={}", key, value),
            None => key.clone(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

//! CHARMM/NAMD protein structure files.
//!
//! Only the title and atom blocks are typed. Bond, angle and the other
//! connectivity blocks are kept as text.

use crate::error::Result;
use crate::io::{TextFormat, collect_lines};
use crate::parsing::format::format_value;
use crate::parsing::{
    Align, CountSource, FieldSpec, FormatSpec, Grammar, HeaderTable, ParsedFile, Precision,
    Record, Value, format_record,
};
use crate::transform::{RenumberDict, remap};
use regex::Regex;
use std::io::{BufRead, Write};
use std::sync::LazyLock;
use tracing::debug;

pub const ATOM_ID: usize = 0;
pub const SEGMENT: usize = 1;
pub const RES_ID: usize = 2;
pub const RES_NAME: usize = 3;
pub const ATOM_NAME: usize = 4;
pub const ATOM_TYPE: usize = 5;
pub const CHARGE: usize = 6;
pub const MASS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Title,
    Atoms,
    Other,
}

fn count_pattern(tag: &str) -> Regex {
    Regex::new(&format!(r"^\s*(\d+)\s+!{}", tag))
        .unwrap_or_else(|e| panic!("bad PSF count pattern: {e}"))
}

static GRAMMAR: LazyLock<Grammar<Block>> = LazyLock::new(|| {
    let headers = HeaderTable::new()
        .header(r"^\s*\d+\s+!NTITLE", Block::Title)
        .header(r"^\s*\d+\s+!NATOM", Block::Atoms)
        .header(r"^\s*\d+(\s+\d+)*\s+!\w+", Block::Other);
    Grammar::new(headers)
        .section(Block::Title, "NTITLE", Some(FieldSpec::fixed("NTITLE").tail_from(0)))
        .counted_by(CountSource::Header(count_pattern("NTITLE")))
        .section(
            Block::Atoms,
            "NATOM",
            Some(
                FieldSpec::whitespace("NATOM")
                    .int("atom_id")
                    .str("segment")
                    .int("res_id")
                    .aligned(Align::Left)
                    .str("res_name")
                    .str("atom_name")
                    .str("atom_type")
                    .float("charge")
                    .float("mass")
                    .with_tail(),
            ),
        )
        .counted_by(CountSource::Header(count_pattern("NATOM")))
});

/// Column widths of the atom block: id, the five name columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AtomLayout {
    id: usize,
    name: usize,
    atom_type: usize,
}

const STANDARD: AtomLayout = AtomLayout {
    id: 8,
    name: 4,
    atom_type: 4,
};

const EXTENDED: AtomLayout = AtomLayout {
    id: 10,
    name: 8,
    atom_type: 6,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PsfFile {
    pub file: ParsedFile,
    pub precision: Precision,
}

impl PsfFile {
    pub fn atoms(&self) -> &[Record] {
        self.file.records("NATOM")
    }

    /// `PSF EXT` files use wider atom columns.
    pub fn is_extended(&self) -> bool {
        self.file
            .head()
            .and_then(|h| h.lines.first())
            .is_some_and(|first| first.split_whitespace().any(|w| w == "EXT"))
    }

    pub fn remap_residues(&mut self, dict: &RenumberDict) {
        if let Some(section) = self.file.section_mut("NATOM") {
            section.records = remap(&section.records, RES_ID, dict);
        }
        debug!("Renumbered PSF residues using {} pairs", dict.len());
    }

    fn render_value(&self, value: &Value) -> String {
        match value {
            Value::Float(v) if self.precision == Precision::Preserve => format!("{:.6}", v),
            value => format_value(value, self.precision),
        }
    }

    /// Lines read from the input keep their own column layout; only edited
    /// fields are rewritten in place.
    fn render_atom(&self, atom: &Record, layout: AtomLayout) -> String {
        if self.precision == Precision::Preserve {
            if let Some(line) = atom.splice(|value| self.render_value(value)) {
                return line;
            }
        }
        let field = |i: usize| -> String {
            match (self.precision, atom.raw(i), atom.get(i)) {
                (Precision::Preserve, Some(raw), _) => raw.to_string(),
                (_, _, Some(value)) => self.render_value(value),
                (_, _, None) => String::new(),
            }
        };
        let mut line = format!(
            "{:>id$} {:<w$} {:<w$} {:<w$} {:<w$} {:<t$} {:>14}{:>14}",
            field(ATOM_ID),
            field(SEGMENT),
            field(RES_ID),
            field(RES_NAME),
            field(ATOM_NAME),
            field(ATOM_TYPE),
            field(CHARGE),
            field(MASS),
            id = layout.id,
            w = layout.name,
            t = layout.atom_type,
        );
        if let Some(tail) = &atom.tail {
            line.push_str(&format!(" {:>7}", tail));
        }
        line
    }
}

impl TextFormat for PsfFile {
    fn read_from(reader: &mut impl BufRead, source: &str) -> Result<Self> {
        let lines = collect_lines(reader, source)?;
        let file = GRAMMAR.parse(lines.iter(), source)?;
        debug!("Read {} PSF atoms from {}", file.records("NATOM").len(), source);
        Ok(Self {
            file,
            precision: Precision::Preserve,
        })
    }

    fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        let layout = if self.is_extended() { EXTENDED } else { STANDARD };
        let verbatim = FormatSpec::delimited(" ");
        for section in &self.file.sections {
            if let Some(header) = &section.header {
                writeln!(writer, "{}", header)?;
            }
            if section.records.is_empty() {
                for line in &section.lines {
                    writeln!(writer, "{}", line)?;
                }
                continue;
            }
            for record in &section.records {
                let line = if section.name == "NATOM" {
                    self.render_atom(record, layout)
                } else {
                    format_record(record, &verbatim)
                };
                writeln!(writer, "{}", line)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Cursor;

    fn atom_line(id: i64, resid: i64, name: &str, ty: &str, charge: &str, mass: &str) -> String {
        format!(
            "{:>8} {:<4} {:<4} {:<4} {:<4} {:<4} {:>14}{:>14}{:>8}",
            id, "WAT", resid, "TIP3", name, ty, charge, mass, 0
        )
    }

    fn sample() -> String {
        let mut text = String::from("PSF\n\n       2 !NTITLE\n REMARKS two waters\n REMARKS generated\n\n       6 !NATOM\n");
        for resid in 1..=2 {
            let base = (resid - 1) * 3;
            text.push_str(&atom_line(base + 1, resid, "OH2", "OT", "-0.834000", "15.9994"));
            text.push('\n');
            text.push_str(&atom_line(base + 2, resid, "H1", "HT", "0.417000", "1.0080"));
            text.push('\n');
            text.push_str(&atom_line(base + 3, resid, "H2", "HT", "0.417000", "1.0080"));
            text.push('\n');
        }
        text.push_str("\n       4 !NBOND: bonds\n       1       2       1       3       4       5\n       4       6\n\n");
        text
    }

    fn read(text: &str) -> Result<PsfFile> {
        PsfFile::read_from(&mut Cursor::new(text.as_bytes()), "water.psf")
    }

    fn write(psf: &PsfFile) -> String {
        let mut out = Vec::new();
        psf.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn untouched_file_is_written_back_verbatim() {
        let text = sample();
        let psf = read(&text).unwrap();
        assert_eq!(psf.atoms().len(), 6);
        assert_eq!(psf.file.records("NTITLE").len(), 2);
        assert!(!psf.is_extended());
        assert_eq!(write(&psf), text);
    }

    #[test]
    fn atom_fields_are_typed() {
        let psf = read(&sample()).unwrap();
        let atom = &psf.atoms()[3];
        assert_eq!(atom.int(ATOM_ID), Some(4));
        assert_eq!(atom.int(RES_ID), Some(2));
        assert_eq!(atom.str(ATOM_NAME), Some("OH2"));
        assert_eq!(atom.float(CHARGE), Some(-0.834));
        assert_eq!(atom.float(MASS), Some(15.9994));
    }

    #[test]
    fn residue_renumbering_keeps_the_column_layout() {
        let mut psf = read(&sample()).unwrap();
        psf.remap_residues(&[(2, 11)].into_iter().collect());
        let out = write(&psf);
        assert!(out.contains(&atom_line(4, 11, "OH2", "OT", "-0.834000", "15.9994")));
        assert!(out.contains(&atom_line(1, 1, "OH2", "OT", "-0.834000", "15.9994")));
    }

    fn single_atom_file(atom: &str) -> String {
        format!("PSF CMAP CHEQ\n\n       1 !NTITLE\n REMARKS one atom\n\n       1 !NATOM\n{atom}\n\n       0 !NBOND: bonds\n\n")
    }

    #[test]
    fn cheq_columns_are_written_back_verbatim() {
        let text = single_atom_file(
            "       1 PROA 1    MET  N    NH3   -0.300000       14.0070           0       0.00000 -0.301140E-02",
        );
        let psf = read(&text).unwrap();
        assert_eq!(psf.atoms()[0].float(MASS), Some(14.007));
        assert_eq!(write(&psf), text);
    }

    #[test]
    fn psfgen_columns_are_written_back_verbatim() {
        let text = single_atom_file(
            "       1 O    1    TIP3 OH2  OT    -0.834000       15.9994           0",
        );
        let psf = read(&text).unwrap();
        assert_eq!(psf.atoms()[0].float(CHARGE), Some(-0.834));
        assert_eq!(write(&psf), text);
    }

    #[test]
    fn renumbering_rewrites_only_the_residue_column() {
        let line = "       1 O    1    TIP3 OH2  OT    -0.834000       15.9994           0";
        let mut psf = read(&single_atom_file(line)).unwrap();
        psf.remap_residues(&[(1, 12)].into_iter().collect());
        let expected = "       1 O    12   TIP3 OH2  OT    -0.834000       15.9994           0";
        assert_eq!(write(&psf), single_atom_file(expected));
    }

    #[test]
    fn header_count_mismatch_is_invalid_data() {
        let text = sample().replace("       6 !NATOM", "       7 !NATOM");
        match read(&text).unwrap_err() {
            Error::InvalidData(e) => {
                assert_eq!(e.section.as_deref(), Some("NATOM"));
                assert_eq!(e.file.as_deref(), Some("water.psf"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extended_files_are_detected() {
        let text = sample().replacen("PSF", "PSF EXT", 1);
        assert!(read(&text).unwrap().is_extended());
    }
}

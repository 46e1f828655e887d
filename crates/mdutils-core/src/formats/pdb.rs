use crate::error::{InvalidDataError, Result, with_file};
use crate::io::{TextFormat, collect_lines};
use crate::parsing::{
    ColumnFormat, FieldKind, FieldSpec, FormatSpec, HeaderTable, Precision, Record, ScanEvent,
    ScanState, Value, format_record, scan,
};
use crate::transform::{RenumberDict, Reorder, remap};
use std::io::{BufRead, Write};
use std::sync::LazyLock;
use tracing::{debug, info};

pub const RECORD: usize = 0;
pub const SERIAL: usize = 1;
pub const ATOM_NAME: usize = 2;
pub const RES_NAME: usize = 4;
pub const RES_SEQ: usize = 6;
pub const X: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Coordinates,
    Trailer,
}

static PARTS: LazyLock<HeaderTable<Part>> = LazyLock::new(|| {
    HeaderTable::new()
        .inclusive(r"^(ATOM  |HETATM)", Part::Coordinates)
        .inclusive(r"^(CONECT|MASTER|END)", Part::Trailer)
});

static ATOM_SPEC: LazyLock<FieldSpec> = LazyLock::new(|| {
    FieldSpec::fixed("ATOM")
        .at("record", FieldKind::Str, 0..6)
        .at("serial", FieldKind::Int, 6..11)
        .at("name", FieldKind::Str, 11..16)
        .at("alt_loc", FieldKind::Str, 16..17)
        .at("res_name", FieldKind::Str, 17..20)
        .at("chain", FieldKind::Str, 20..22)
        .at("res_seq", FieldKind::Int, 22..26)
        .at("insertion", FieldKind::Str, 26..30)
        .at("x", FieldKind::Float, 30..38)
        .at("y", FieldKind::Float, 38..46)
        .at("z", FieldKind::Float, 46..54)
        .tail_from(54)
});

const ATOM_COLUMNS: [ColumnFormat; 11] = [
    ColumnFormat::left(6),
    ColumnFormat::right(5),
    ColumnFormat::left(5),
    ColumnFormat::left(1),
    ColumnFormat::left(3),
    ColumnFormat::left(2),
    ColumnFormat::right(4),
    ColumnFormat::left(4),
    ColumnFormat::float(8, 3),
    ColumnFormat::float(8, 3),
    ColumnFormat::float(8, 3),
];

#[derive(Debug, Clone, PartialEq)]
pub enum PdbLine {
    Atom(Record),
    /// Any other record (HEADER, REMARK, TER, CONECT, END...), verbatim.
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbFile {
    pub lines: Vec<PdbLine>,
    pub precision: Precision,
}

impl PdbFile {
    pub fn atoms(&self) -> impl Iterator<Item = &Record> {
        self.lines.iter().filter_map(|l| match l {
            PdbLine::Atom(r) => Some(r),
            PdbLine::Other(_) => None,
        })
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms().count()
    }

    fn replace_atoms(&mut self, atoms: Vec<Record>) {
        let mut atoms = atoms.into_iter();
        for line in &mut self.lines {
            if let PdbLine::Atom(slot) = line {
                if let Some(atom) = atoms.next() {
                    *slot = atom;
                }
            }
        }
    }

    /// Moves atoms between coordinate-record slots and renumbers serials
    /// to the new positions.
    ///
    /// Positions are the order of ATOM/HETATM records in the file; TER and
    /// other records stay where they are.
    pub fn reorder_atoms(&mut self, dict: &RenumberDict) -> Result<()> {
        let atoms: Vec<Record> = self.atoms().cloned().collect();
        let reorder =
            Reorder::from_dict(dict, atoms.len()).map_err(|e| e.in_section("ATOM"))?;
        let mut reordered = reorder.apply(&atoms);
        for (pos, atom) in reordered.iter_mut().enumerate() {
            atom.set(SERIAL, Value::Int(pos as i64 + 1));
        }
        self.replace_atoms(reordered);
        info!("Reordered {} PDB atoms", reorder.len());
        Ok(())
    }

    pub fn remap_residues(&mut self, dict: &RenumberDict) {
        let atoms: Vec<Record> = self.atoms().cloned().collect();
        self.replace_atoms(remap(&atoms, RES_SEQ, dict));
        debug!("Renumbered residues using {} pairs", dict.len());
    }
}

impl TextFormat for PdbFile {
    fn read_from(reader: &mut impl BufRead, source: &str) -> Result<Self> {
        let lines = collect_lines(reader, source)?;
        let mut out = Vec::with_capacity(lines.len());
        for event in scan(lines.iter(), &*PARTS) {
            let ScanEvent::Data {
                state,
                line_num,
                line,
            } = event
            else {
                continue;
            };
            let is_atom = line.starts_with("ATOM  ") || line.starts_with("HETATM");
            if state == ScanState::Section(Part::Coordinates) && is_atom {
                let record = ATOM_SPEC
                    .extract(line)
                    .map_err(|e: InvalidDataError| e.at_line(line_num, line.as_str()))
                    .map_err(|e| with_file(e.into(), source))?;
                if let Some(record) = record {
                    out.push(PdbLine::Atom(record));
                    continue;
                }
            }
            out.push(PdbLine::Other(line.clone()));
        }
        let pdb = Self {
            lines: out,
            precision: Precision::Preserve,
        };
        debug!("Read {} atoms from {}", pdb.num_atoms(), source);
        Ok(pdb)
    }

    fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        let format =
            FormatSpec::fixed_width(ATOM_COLUMNS.to_vec()).with_precision(self.precision);
        for line in &self.lines {
            match line {
                PdbLine::Atom(record) => writeln!(writer, "{}", format_record(record, &format))?,
                PdbLine::Other(text) => writeln!(writer, "{}", text)?,
            }
        }
        Ok(())
    }
}

//! LAMMPS text dump files: a sequence of frames, each introduced by
//! `ITEM:` lines.

use crate::error::{InvalidDataError, Result, with_file};
use crate::io::{TextFormat, collect_lines};
use crate::parsing::{
    FieldKind, FieldSpec, FormatSpec, HeaderTable, Precision, Record, ScanEvent, ScanState,
    Value, format_record, scan,
};
use crate::transform::{RenumberDict, Reorder, remap};
use phf::phf_map;
use std::io::{BufRead, Write};
use std::sync::LazyLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    Timestep,
    NumberOfAtoms,
    BoxBounds,
    Atoms,
    Other,
}

static ITEMS: LazyLock<HeaderTable<Item>> = LazyLock::new(|| {
    HeaderTable::new()
        .header(r"^ITEM:\s*TIMESTEP", Item::Timestep)
        .header(r"^ITEM:\s*NUMBER OF ATOMS", Item::NumberOfAtoms)
        .header(r"^ITEM:\s*BOX BOUNDS", Item::BoxBounds)
        .header(r"^ITEM:\s*ATOMS", Item::Atoms)
        .header(r"^ITEM:", Item::Other)
});

/// Per-atom columns that hold integers or text; everything else is a float.
static COLUMN_KINDS: phf::Map<&'static str, FieldKind> = phf_map! {
    "id" => FieldKind::Int,
    "mol" => FieldKind::Int,
    "type" => FieldKind::Int,
    "proc" => FieldKind::Int,
    "procp1" => FieldKind::Int,
    "ix" => FieldKind::Int,
    "iy" => FieldKind::Int,
    "iz" => FieldKind::Int,
    "element" => FieldKind::Str,
};

fn atoms_spec(columns: &[String]) -> FieldSpec {
    columns
        .iter()
        .fold(FieldSpec::whitespace("ATOMS"), |spec, name| {
            let kind = COLUMN_KINDS
                .get(name.as_str())
                .copied()
                .unwrap_or(FieldKind::Float);
            spec.column(name, kind)
        })
        .with_tail()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumpFrame {
    pub timestep: Option<i64>,
    /// Items such as `ITEM: UNITS` that precede the timestep, verbatim.
    pub preamble: Vec<String>,
    pub declared_atoms: Option<usize>,
    pub box_header: String,
    pub box_bounds: Vec<String>,
    pub atoms_header: String,
    pub columns: Vec<String>,
    pub atoms: Vec<Record>,
}

impl DumpFrame {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require_column(&self, name: &str) -> std::result::Result<usize, InvalidDataError> {
        self.column_index(name).ok_or_else(|| {
            InvalidDataError::new(format!("dump has no '{}' column", name))
                .in_section("ATOMS")
                .with_content(self.atoms_header.clone())
        })
    }

    fn check_count(&self) -> std::result::Result<(), InvalidDataError> {
        match self.declared_atoms {
            None => Err(InvalidDataError::new(format!(
                "frame at timestep {:?} has no NUMBER OF ATOMS item",
                self.timestep
            ))),
            Some(n) if n != self.atoms.len() => Err(InvalidDataError::new(format!(
                "frame at timestep {:?} declares {} atoms but {} were read",
                self.timestep,
                n,
                self.atoms.len()
            ))
            .in_section("ATOMS")),
            Some(_) => Ok(()),
        }
    }

    fn reorder(&mut self, dict: &RenumberDict) -> std::result::Result<(), InvalidDataError> {
        let id = self.require_column("id")?;
        let mut sorted = self.atoms.clone();
        sorted.sort_by_key(|a| a.int(id));
        for (pos, atom) in sorted.iter().enumerate() {
            if atom.int(id) != Some(pos as i64 + 1) {
                return Err(InvalidDataError::new(format!(
                    "atom reordering requires atom ids 1..={} without gaps (timestep {:?})",
                    sorted.len(),
                    self.timestep
                ))
                .in_section("ATOMS"));
            }
        }
        let reorder = Reorder::from_dict(dict, sorted.len()).map_err(|e| e.in_section("ATOMS"))?;
        let mut atoms = reorder.apply(&sorted);
        for (pos, atom) in atoms.iter_mut().enumerate() {
            atom.set(id, Value::Int(pos as i64 + 1));
        }
        self.atoms = atoms;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LammpsDump {
    pub frames: Vec<DumpFrame>,
    pub precision: Precision,
}

impl LammpsDump {
    pub fn keep_last_frame(&mut self) {
        if self.frames.len() > 1 {
            let last = self.frames.split_off(self.frames.len() - 1);
            self.frames = last;
        }
    }

    /// Applies the same positional reorder to every frame.
    pub fn reorder_atoms(&mut self, dict: &RenumberDict) -> Result<()> {
        for frame in &mut self.frames {
            frame.reorder(dict)?;
        }
        info!("Reordered atoms in {} frames", self.frames.len());
        Ok(())
    }

    pub fn remap_atom_types(&mut self, dict: &RenumberDict) -> Result<()> {
        self.remap_column("type", dict)
    }

    pub fn remap_molecules(&mut self, dict: &RenumberDict) -> Result<()> {
        self.remap_column("mol", dict)
    }

    fn remap_column(&mut self, name: &str, dict: &RenumberDict) -> Result<()> {
        for frame in &mut self.frames {
            let index = frame.require_column(name)?;
            frame.atoms = remap(&frame.atoms, index, dict);
        }
        debug!("Remapped dump column '{}' using {} pairs", name, dict.len());
        Ok(())
    }

    fn parse_lines(lines: &[String]) -> Result<Self> {
        let mut frames: Vec<DumpFrame> = Vec::new();
        let mut spec: Option<FieldSpec> = None;

        for event in scan(lines.iter(), &*ITEMS) {
            match event {
                ScanEvent::Enter { state, line, .. } => {
                    let starts_frame = match frames.last() {
                        None => true,
                        Some(f) => {
                            !f.atoms_header.is_empty()
                                || (state == Item::Timestep && f.timestep.is_some())
                        }
                    };
                    if starts_frame {
                        if let Some(done) = frames.last() {
                            done.check_count()?;
                        }
                        frames.push(DumpFrame::default());
                    }
                    let Some(frame) = frames.last_mut() else {
                        continue;
                    };
                    match state {
                        Item::BoxBounds => frame.box_header = line.clone(),
                        Item::Atoms => {
                            frame.atoms_header = line.clone();
                            frame.columns = line
                                .trim_start_matches("ITEM:")
                                .split_whitespace()
                                .skip(1)
                                .map(String::from)
                                .collect();
                            spec = Some(atoms_spec(&frame.columns));
                        }
                        Item::Other => frame.preamble.push(line.clone()),
                        Item::Timestep | Item::NumberOfAtoms => {}
                    }
                }
                ScanEvent::Data {
                    state: ScanState::Head,
                    line_num,
                    line,
                } => {
                    if !line.trim().is_empty() {
                        return Err(InvalidDataError::new("expected an ITEM: line")
                            .at_line(line_num, line.as_str())
                            .into());
                    }
                }
                ScanEvent::Data {
                    state: ScanState::Section(item),
                    line_num,
                    line,
                } => {
                    let Some(frame) = frames.last_mut() else {
                        continue;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let bad = |what: &str| {
                        InvalidDataError::new(format!("could not read {}", what))
                            .at_line(line_num, line.as_str())
                    };
                    match item {
                        Item::Timestep => {
                            frame.timestep =
                                Some(line.trim().parse().map_err(|_| bad("the timestep"))?);
                        }
                        Item::NumberOfAtoms => {
                            frame.declared_atoms =
                                Some(line.trim().parse().map_err(|_| bad("the atom count"))?);
                        }
                        Item::BoxBounds => frame.box_bounds.push(line.clone()),
                        Item::Other => frame.preamble.push(line.clone()),
                        Item::Atoms => {
                            let Some(spec) = spec.as_ref() else {
                                continue;
                            };
                            if frame.declared_atoms == Some(frame.atoms.len()) {
                                return Err(InvalidDataError::new(format!(
                                    "more atoms than the {} declared",
                                    frame.atoms.len()
                                ))
                                .in_section("ATOMS")
                                .at_line(line_num, line.as_str())
                                .into());
                            }
                            if let Some(record) = spec
                                .extract(line)
                                .map_err(|e| e.at_line(line_num, line.as_str()))?
                            {
                                frame.atoms.push(record);
                            }
                        }
                    }
                }
            }
        }

        if let Some(last) = frames.last() {
            last.check_count()?;
        }
        Ok(Self {
            frames,
            precision: Precision::Preserve,
        })
    }
}

impl TextFormat for LammpsDump {
    fn read_from(reader: &mut impl BufRead, source: &str) -> Result<Self> {
        let lines = collect_lines(reader, source)?;
        let dump = Self::parse_lines(&lines).map_err(|e| with_file(e, source))?;
        debug!("Read {} frames from {}", dump.frames.len(), source);
        Ok(dump)
    }

    fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        let format = FormatSpec::delimited(" ").with_precision(self.precision);
        for frame in &self.frames {
            for line in &frame.preamble {
                writeln!(writer, "{}", line)?;
            }
            if let Some(timestep) = frame.timestep {
                writeln!(writer, "ITEM: TIMESTEP\n{}", timestep)?;
            }
            writeln!(writer, "ITEM: NUMBER OF ATOMS\n{}", frame.atoms.len())?;
            if !frame.box_header.is_empty() {
                writeln!(writer, "{}", frame.box_header)?;
                for line in &frame.box_bounds {
                    writeln!(writer, "{}", line)?;
                }
            }
            writeln!(writer, "{}", frame.atoms_header)?;
            for atom in &frame.atoms {
                writeln!(writer, "{}", format_record(atom, &format))?;
            }
        }
        Ok(())
    }
}

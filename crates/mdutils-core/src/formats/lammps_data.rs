//! LAMMPS data files (`atom_style full`).
//!
//! The head holds a title and the `N atoms` / `N atom types` style counts.
//! Each body section starts with a keyword line, is followed by a blank line
//! and then one record per entity. Counts announced in the head are enforced.

use crate::error::{InvalidDataError, Result};
use crate::io::{TextFormat, collect_lines};
use crate::parsing::{
    CountSource, FieldKind, FieldSpec, FormatSpec, Grammar, HeaderTable, ParsedFile, Precision,
    Record, Value, format_section,
};
use crate::transform::{RenumberDict, Reorder, remap};
use phf::phf_map;
use regex::Regex;
use std::io::{BufRead, Write};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

pub const ATOM_ID: usize = 0;
pub const MOL_ID: usize = 1;
pub const ATOM_TYPE: usize = 2;
pub const CHARGE: usize = 3;
pub const X: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSection {
    Masses,
    PairCoeffs,
    BondCoeffs,
    AngleCoeffs,
    DihedralCoeffs,
    ImproperCoeffs,
    OtherCoeffs,
    Atoms,
    Velocities,
    Bonds,
    Angles,
    Dihedrals,
    Impropers,
}

/// Head keyword that announces the record count of each section.
static COUNT_KEYWORDS: phf::Map<&'static str, &'static str> = phf_map! {
    "Masses" => "atom types",
    "Pair Coeffs" => "atom types",
    "Bond Coeffs" => "bond types",
    "Angle Coeffs" => "angle types",
    "Dihedral Coeffs" => "dihedral types",
    "Improper Coeffs" => "improper types",
    "Atoms" => "atoms",
    "Velocities" => "atoms",
    "Bonds" => "bonds",
    "Angles" => "angles",
    "Dihedrals" => "dihedrals",
    "Impropers" => "impropers",
};

const SECTIONS: [(DataSection, &str); 12] = [
    (DataSection::Masses, "Masses"),
    (DataSection::PairCoeffs, "Pair Coeffs"),
    (DataSection::BondCoeffs, "Bond Coeffs"),
    (DataSection::AngleCoeffs, "Angle Coeffs"),
    (DataSection::DihedralCoeffs, "Dihedral Coeffs"),
    (DataSection::ImproperCoeffs, "Improper Coeffs"),
    (DataSection::Atoms, "Atoms"),
    (DataSection::Velocities, "Velocities"),
    (DataSection::Bonds, "Bonds"),
    (DataSection::Angles, "Angles"),
    (DataSection::Dihedrals, "Dihedrals"),
    (DataSection::Impropers, "Impropers"),
];

/// Sections that list the entities counted in the head. Masses, coefficients
/// and velocities may be given in the input script instead.
const ENTITY_SECTIONS: [DataSection; 5] = [
    DataSection::Atoms,
    DataSection::Bonds,
    DataSection::Angles,
    DataSection::Dihedrals,
    DataSection::Impropers,
];

/// Topology sections and the columns in them that hold atom ids.
const ATOM_REFERENCES: [(&str, std::ops::Range<usize>); 4] = [
    ("Bonds", 2..4),
    ("Angles", 2..5),
    ("Dihedrals", 2..6),
    ("Impropers", 2..6),
];

fn field_spec(section: DataSection, name: &str) -> FieldSpec {
    let spec = FieldSpec::whitespace(name);
    let spec = match section {
        DataSection::Masses => spec.int("atom_type").float("mass"),
        DataSection::Atoms => spec
            .int("atom_id")
            .int("mol_id")
            .int("atom_type")
            .float("charge")
            .float("x")
            .float("y")
            .float("z")
            .optional("ix", FieldKind::Int)
            .optional("iy", FieldKind::Int)
            .optional("iz", FieldKind::Int),
        DataSection::Velocities => spec.int("atom_id").float("vx").float("vy").float("vz"),
        DataSection::Bonds => spec.int("bond_id").int("bond_type").int("atom1").int("atom2"),
        DataSection::Angles => spec
            .int("angle_id")
            .int("angle_type")
            .int("atom1")
            .int("atom2")
            .int("atom3"),
        DataSection::Dihedrals | DataSection::Impropers => spec
            .int("id")
            .int("type")
            .int("atom1")
            .int("atom2")
            .int("atom3")
            .int("atom4"),
        _ => spec.int("type"),
    };
    spec.with_tail()
}

fn build_grammar() -> Grammar<DataSection> {
    let mut headers = HeaderTable::new();
    for (state, name) in SECTIONS {
        headers = headers.header(&format!(r"^\s*{}\s*(#.*)?$", name), state);
    }
    headers = headers.header(r"^\s*[A-Z][A-Za-z]* Coeffs\s*(#.*)?$", DataSection::OtherCoeffs);

    let mut grammar = Grammar::new(headers);
    for (state, name) in SECTIONS {
        grammar = grammar.section(state, name, Some(field_spec(state, name)));
        if let Some(keyword) = COUNT_KEYWORDS.get(name) {
            let pattern = format!(r"^\s*(\d+)\s+{}\s*(#.*)?$", keyword);
            grammar = grammar.counted_by(CountSource::Head(
                Regex::new(&pattern).unwrap_or_else(|e| panic!("bad count pattern: {e}")),
            ));
        }
        if ENTITY_SECTIONS.contains(&state) {
            grammar = grammar.required();
        }
    }
    grammar
}

static GRAMMAR: LazyLock<Grammar<DataSection>> = LazyLock::new(build_grammar);

#[derive(Debug, Clone, PartialEq)]
pub struct LammpsData {
    pub file: ParsedFile,
    pub precision: Precision,
}

impl LammpsData {
    pub fn atoms(&self) -> &[Record] {
        self.file.records("Atoms")
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms().len()
    }

    fn atoms_mut(&mut self) -> std::result::Result<&mut Vec<Record>, InvalidDataError> {
        self.file
            .section_mut("Atoms")
            .map(|s| &mut s.records)
            .ok_or_else(|| InvalidDataError::new("file has no Atoms section"))
    }

    /// Moves atoms to new positions and renumbers them to match.
    ///
    /// Atom ids must be exactly `1..=N`. Velocities and every topology
    /// section are renumbered through the same permutation.
    pub fn reorder_atoms(&mut self, dict: &RenumberDict) -> Result<()> {
        let atoms = self.atoms_mut()?;
        let mut sorted = atoms.clone();
        sorted.sort_by_key(|a| a.int(ATOM_ID));
        for (pos, atom) in sorted.iter().enumerate() {
            if atom.int(ATOM_ID) != Some(pos as i64 + 1) {
                return Err(InvalidDataError::new(format!(
                    "atom reordering requires atom ids 1..={} without gaps",
                    sorted.len()
                ))
                .in_section("Atoms")
                .into());
            }
        }

        let reorder = Reorder::from_dict(dict, sorted.len()).map_err(|e| e.in_section("Atoms"))?;
        let mut reordered = reorder.apply(&sorted);
        for (pos, atom) in reordered.iter_mut().enumerate() {
            atom.set(ATOM_ID, Value::Int(pos as i64 + 1));
        }
        *atoms = reordered;

        let ids = reorder.id_map();
        if let Some(velocities) = self.file.section_mut("Velocities") {
            let mut remapped = remap(&velocities.records, 0, &ids);
            remapped.sort_by_key(|v| v.int(0));
            velocities.records = remapped;
        }
        for (name, columns) in ATOM_REFERENCES {
            if let Some(section) = self.file.section_mut(name) {
                let mut records = std::mem::take(&mut section.records);
                for column in columns.clone() {
                    records = remap(&records, column, &ids);
                }
                section.records = records;
            }
        }
        info!("Reordered {} atoms ({} explicit moves)", reorder.len(), dict.len());
        Ok(())
    }

    pub fn remap_atom_types(&mut self, dict: &RenumberDict) -> Result<()> {
        let atoms = self.atoms_mut()?;
        *atoms = remap(atoms, ATOM_TYPE, dict);
        debug!("Remapped atom types using {} pairs", dict.len());
        Ok(())
    }

    pub fn remap_molecules(&mut self, dict: &RenumberDict) -> Result<()> {
        let atoms = self.atoms_mut()?;
        *atoms = remap(atoms, MOL_ID, dict);
        debug!("Remapped molecule ids using {} pairs", dict.len());
        Ok(())
    }

    /// Compares atom types against `expected` (atom id to type) and logs
    /// every disagreement. Returns the number of mismatches.
    pub fn check_atom_types(&self, expected: &RenumberDict) -> usize {
        let mut mismatches = 0;
        for atom in self.atoms() {
            let (Some(id), Some(found)) = (atom.int(ATOM_ID), atom.int(ATOM_TYPE)) else {
                continue;
            };
            if let Some(want) = expected.get(id) {
                if want != found {
                    warn!(
                        "Atom {} has type {} but the check dictionary expects {}",
                        id, found, want
                    );
                    mismatches += 1;
                }
            }
        }
        mismatches
    }
}

impl TextFormat for LammpsData {
    fn read_from(reader: &mut impl BufRead, source: &str) -> Result<Self> {
        let lines = collect_lines(reader, source)?;
        let file = GRAMMAR.parse(lines.iter(), source)?;
        debug!(
            "Parsed LAMMPS data file {} with {} sections",
            source,
            file.sections.len()
        );
        Ok(Self {
            file,
            precision: Precision::Preserve,
        })
    }

    fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        let format = FormatSpec::delimited(" ").with_precision(self.precision);
        let mut sections = self.file.sections.iter().peekable();
        while let Some(section) = sections.next() {
            if let Some(header) = &section.header {
                writeln!(writer, "{}", header)?;
            }
            if section.records.is_empty() {
                for line in &section.lines {
                    writeln!(writer, "{}", line)?;
                }
                continue;
            }
            writeln!(writer)?;
            for line in format_section(section, &format) {
                writeln!(writer, "{}", line)?;
            }
            if sections.peek().is_some() {
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}

use super::fields::{FieldSpec, Record};
use super::scanner::{HeaderTable, ScanEvent, ScanState, scan};
use crate::error::{Error, InvalidDataError, Result, with_file};
use regex::Regex;
use tracing::{debug, trace};

pub const HEAD: &str = "head";

/// One region of a parsed file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub name: String,
    /// The line that opened the section; `None` for the head.
    pub header: Option<String>,
    /// The record count announced by the file, when it announces one.
    pub declared: Option<usize>,
    pub records: Vec<Record>,
    /// Verbatim lines of sections without a field spec.
    pub lines: Vec<String>,
}

impl Section {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn check_count(&self) -> std::result::Result<(), InvalidDataError> {
        match self.declared {
            Some(expected) if expected != self.records.len() => Err(InvalidDataError::new(
                format!(
                    "header declares {} records but {} were read",
                    expected,
                    self.records.len()
                ),
            )
            .in_section(self.name.clone())),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub sections: Vec<Section>,
}

impl ParsedFile {
    pub fn head(&self) -> Option<&Section> {
        self.sections.first().filter(|s| s.name == HEAD)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    pub fn records(&self, name: &str) -> &[Record] {
        self.section(name).map_or(&[], |s| s.records.as_slice())
    }
}

/// Where a section learns how many records it must hold.
#[derive(Debug, Clone)]
pub enum CountSource {
    /// A head line such as `27 atoms`; the first capture group is the count.
    Head(Regex),
    /// The section's own header line, as in `    27 !NATOM`.
    Header(Regex),
}

#[derive(Debug, Clone)]
pub struct SectionRule<S> {
    pub state: S,
    pub name: String,
    /// `None` keeps the section's lines verbatim.
    pub spec: Option<FieldSpec>,
    pub count: Option<CountSource>,
    /// Must be present whenever the head announces records for it.
    pub required: bool,
}

/// The complete description of one sectioned file format.
#[derive(Debug, Clone)]
pub struct Grammar<S> {
    pub headers: HeaderTable<S>,
    pub rules: Vec<SectionRule<S>>,
}

impl<S: Copy + PartialEq + std::fmt::Debug> Grammar<S> {
    pub fn new(headers: HeaderTable<S>) -> Self {
        Self {
            headers,
            rules: Vec::new(),
        }
    }

    pub fn section(mut self, state: S, name: &str, spec: Option<FieldSpec>) -> Self {
        self.rules.push(SectionRule {
            state,
            name: name.to_string(),
            spec,
            count: None,
            required: false,
        });
        self
    }

    /// Sets how the most recently added section finds its declared count.
    pub fn counted_by(mut self, source: CountSource) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.count = Some(source);
        }
        self
    }

    /// Marks the most recently added section as one the file cannot omit
    /// once the head announces a non-zero count for it.
    pub fn required(mut self) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.required = true;
        }
        self
    }

    pub fn rule(&self, state: S) -> Option<&SectionRule<S>> {
        self.rules.iter().find(|r| r.state == state)
    }

    pub fn spec(&self, state: S) -> Option<&FieldSpec> {
        self.rule(state).and_then(|r| r.spec.as_ref())
    }

    /// Runs the scanner and extractor over `lines`.
    ///
    /// Every section with a declared count must hold exactly that many
    /// records when the next section starts or the input ends.
    pub fn parse<I, L>(&self, lines: I, source: &str) -> Result<ParsedFile>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str> + Clone,
    {
        self.parse_inner(lines)
            .map_err(|e| with_file(e, source))
    }

    fn parse_inner<I, L>(&self, lines: I) -> Result<ParsedFile>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str> + Clone,
    {
        let mut file = ParsedFile {
            sections: vec![Section::new(HEAD)],
        };
        let mut head_counts: Vec<(S, usize)> = Vec::new();

        for event in scan(lines, &self.headers) {
            match event {
                ScanEvent::Enter {
                    state,
                    line_num,
                    line,
                } => {
                    let line = line.as_ref();
                    finish(file.sections.last())?;
                    let rule = self.rule(state);
                    let name = rule.map_or_else(|| line.trim().to_string(), |r| r.name.clone());
                    let declared = match rule.and_then(|r| r.count.as_ref()) {
                        Some(CountSource::Header(re)) => Some(capture_count(re, line).ok_or_else(
                            || {
                                InvalidDataError::new("section header does not state a record count")
                                    .in_section(name.clone())
                                    .at_line(line_num, line)
                            },
                        )?),
                        Some(CountSource::Head(_)) => head_counts
                            .iter()
                            .find(|(s, _)| *s == state)
                            .map(|(_, n)| *n),
                        None => None,
                    };
                    debug!(
                        "Entering section '{}' at line {} (declared count: {:?})",
                        name, line_num, declared
                    );
                    file.sections.push(Section {
                        name,
                        header: Some(line.to_string()),
                        declared,
                        ..Default::default()
                    });
                }
                ScanEvent::Data {
                    state: ScanState::Head,
                    line,
                    ..
                } => {
                    let line = line.as_ref();
                    for rule in &self.rules {
                        if let Some(CountSource::Head(re)) = &rule.count {
                            if let Some(n) = capture_count(re, line) {
                                trace!("Head declares {} records for {:?}", n, rule.state);
                                head_counts.push((rule.state, n));
                            }
                        }
                    }
                    if let Some(head) = file.sections.first_mut() {
                        head.lines.push(line.to_string());
                    }
                }
                ScanEvent::Data {
                    state: ScanState::Section(state),
                    line_num,
                    line,
                } => {
                    let line = line.as_ref();
                    let Some(section) = file.sections.last_mut() else {
                        continue;
                    };
                    match self.spec(state) {
                        Some(spec) => {
                            let extracted = spec
                                .extract(line)
                                .map_err(|e| e.at_line(line_num, line))?;
                            if let Some(record) = extracted {
                                if section.declared == Some(section.records.len()) {
                                    return Err(InvalidDataError::new(format!(
                                        "more records than the {} declared",
                                        section.records.len()
                                    ))
                                    .in_section(section.name.clone())
                                    .at_line(line_num, line)
                                    .into());
                                }
                                section.records.push(record);
                            }
                        }
                        None => section.lines.push(line.to_string()),
                    }
                }
            }
        }

        finish(file.sections.last())?;
        self.check_required(&file, &head_counts)?;
        Ok(file)
    }

    fn check_required(
        &self,
        file: &ParsedFile,
        head_counts: &[(S, usize)],
    ) -> std::result::Result<(), InvalidDataError> {
        for rule in self.rules.iter().filter(|r| r.required) {
            let announced = head_counts
                .iter()
                .find(|(s, _)| *s == rule.state)
                .map_or(0, |(_, n)| *n);
            if announced > 0 && file.section(&rule.name).is_none() {
                return Err(InvalidDataError::new(format!(
                    "head declares {} records but the section is missing",
                    announced
                ))
                .in_section(rule.name.clone()));
            }
        }
        Ok(())
    }
}

fn finish(section: Option<&Section>) -> Result<()> {
    match section {
        Some(s) => s.check_count().map_err(Error::from),
        None => Ok(()),
    }
}

fn capture_count(re: &Regex, line: &str) -> Option<usize> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Reads a whole text file into lines, mapping failures to the path.
pub fn read_lines(path: &std::path::Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(text.lines().map(String::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Part {
        Masses,
        Atoms,
        Notes,
        Titles,
    }

    fn grammar() -> Grammar<Part> {
        let headers = HeaderTable::new()
            .header(r"^\s*Masses\s*$", Part::Masses)
            .header(r"^\s*Atoms\b", Part::Atoms)
            .header(r"^\s*Notes\s*$", Part::Notes)
            .header(r"!NTITLE", Part::Titles);
        Grammar::new(headers)
            .section(
                Part::Masses,
                "Masses",
                Some(FieldSpec::whitespace("Masses").int("type").float("mass")),
            )
            .counted_by(CountSource::Head(Regex::new(r"^\s*(\d+)\s+atom types").unwrap()))
            .section(
                Part::Atoms,
                "Atoms",
                Some(
                    FieldSpec::whitespace("Atoms")
                        .int("id")
                        .int("type")
                        .float("x")
                        .with_tail(),
                ),
            )
            .counted_by(CountSource::Head(Regex::new(r"^\s*(\d+)\s+atoms").unwrap()))
            .required()
            .section(Part::Notes, "Notes", None)
            .section(
                Part::Titles,
                "Titles",
                Some(FieldSpec::whitespace("Titles").str("text").with_tail()),
            )
            .counted_by(CountSource::Header(Regex::new(r"^\s*(\d+)\s+!NTITLE").unwrap()))
    }

    const SAMPLE: &str = "title line\n\n3 atoms\n2 atom types\n\nMasses\n\n1 12.0\n2 1.008\n\nAtoms # full\n\n1 1 0.0\n2 2 1.0 # H\n3 2 -1.0\n\nNotes\nfree text\n";

    #[test]
    fn parses_head_and_counted_sections() {
        let file = grammar().parse(SAMPLE.lines(), "sample.data").unwrap();
        let names: Vec<_> = file.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![HEAD, "Masses", "Atoms", "Notes"]);
        assert_eq!(file.head().unwrap().lines[0], "title line");
        let atoms = file.section("Atoms").unwrap();
        assert_eq!(atoms.declared, Some(3));
        assert_eq!(atoms.header.as_deref(), Some("Atoms # full"));
        assert_eq!(atoms.records.len(), 3);
        assert_eq!(atoms.records[1].tail.as_deref(), Some("# H"));
        assert_eq!(file.records("Masses").len(), 2);
        assert_eq!(file.section("Notes").unwrap().lines, vec!["free text"]);
    }

    #[test]
    fn too_few_records_before_next_header_is_invalid_data() {
        let text = SAMPLE.replace("3 2 -1.0\n", "");
        let err = grammar().parse(text.lines(), "short.data").unwrap_err();
        match err {
            Error::InvalidData(e) => {
                assert_eq!(e.section.as_deref(), Some("Atoms"));
                assert_eq!(e.file.as_deref(), Some("short.data"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn too_few_records_at_end_of_input_is_invalid_data() {
        let text = "2 atoms\nAtoms\n\n1 1 0.0\n";
        assert!(matches!(
            grammar().parse(text.lines(), "eof.data"),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn surplus_records_are_invalid_data() {
        let text = "1 atoms\nAtoms\n\n1 1 0.0\n2 1 0.0\n";
        match grammar().parse(text.lines(), "long.data").unwrap_err() {
            Error::InvalidData(e) => assert_eq!(e.line, Some(5)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn announced_section_that_never_appears_is_invalid_data() {
        let text = "title\n\n3 atoms\n2 atom types\n\nMasses\n\n1 12.0\n2 1.008\n";
        match grammar().parse(text.lines(), "cut.data").unwrap_err() {
            Error::InvalidData(e) => {
                assert_eq!(e.section.as_deref(), Some("Atoms"));
                assert_eq!(e.file.as_deref(), Some("cut.data"));
                assert!(e.message.contains("missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn optional_and_empty_sections_may_be_omitted() {
        let text = "3 atoms\n2 atom types\n\nAtoms\n\n1 1 0.0\n2 2 1.0\n3 2 -1.0\n";
        let file = grammar().parse(text.lines(), "no_masses.data").unwrap();
        assert!(file.section("Masses").is_none());

        let text = "0 atoms\n\nNotes\nnothing here\n";
        assert!(grammar().parse(text.lines(), "empty.data").is_ok());
    }

    #[test]
    fn sections_without_declared_count_are_open_ended() {
        let text = "Atoms\n\n1 1 0.0\n2 1 0.0\n";
        let file = grammar().parse(text.lines(), "open.data").unwrap();
        assert_eq!(file.records("Atoms").len(), 2);
        assert_eq!(file.section("Atoms").unwrap().declared, None);
    }

    #[test]
    fn count_can_come_from_the_section_header_itself() {
        let text = "PSF\n\n       2 !NTITLE\n REMARKS one\n REMARKS two\n";
        let file = grammar().parse(text.lines(), "a.psf").unwrap();
        assert_eq!(file.records("Titles").len(), 2);
    }

    #[test]
    fn malformed_line_reports_line_number_and_content() {
        let text = "Atoms\n\n1 x 0.0\n";
        match grammar().parse(text.lines(), "bad.data").unwrap_err() {
            Error::InvalidData(e) => {
                assert_eq!(e.line, Some(3));
                assert_eq!(e.field.as_deref(), Some("type"));
                assert_eq!(e.content.as_deref(), Some("1 x 0.0"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

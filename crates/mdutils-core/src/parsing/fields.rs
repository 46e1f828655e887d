use crate::error::InvalidDataError;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Str,
}

impl FieldKind {
    fn describe(self) -> &'static str {
        match self {
            Self::Int => "an integer",
            Self::Float => "a float",
            Self::Str => "text",
        }
    }
}

/// How a column pads its text when it is narrower than the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    /// Kept exactly as it appeared in the input, including padding.
    Str(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Int(_) => FieldKind::Int,
            Self::Float(_) => FieldKind::Float,
            Self::Str(_) => FieldKind::Str,
        }
    }

    fn convert(kind: FieldKind, token: &str) -> Option<Self> {
        match kind {
            FieldKind::Int => token.trim().parse().ok().map(Self::Int),
            FieldKind::Float => token.trim().parse().ok().map(Self::Float),
            FieldKind::Str => Some(Self::Str(token.to_string())),
        }
    }
}

/// One typed line of a section.
///
/// Alongside the converted values, a record remembers the text each field was
/// read from so that untouched fields can be written back unchanged. Equality
/// only considers the values and the tail.
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub fields: Vec<Value>,
    /// Free text following the typed columns, reproduced verbatim on output.
    pub tail: Option<String>,
    raw: Vec<Option<String>>,
    origin: Option<Origin>,
}

/// The line a record was split from and where each token sat in it.
#[derive(Debug, Clone)]
struct Origin {
    line: String,
    spans: Vec<(Range<usize>, Align)>,
    tail_start: Option<usize>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.tail == other.tail
    }
}

impl Record {
    pub fn new(fields: Vec<Value>) -> Self {
        Self {
            fields,
            tail: None,
            raw: Vec::new(),
            origin: None,
        }
    }

    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    pub fn int(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(Value::as_int)
    }

    pub fn float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(Value::as_float)
    }

    pub fn str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Value::as_str)
    }

    /// The input text of an unmodified field.
    pub fn raw(&self, index: usize) -> Option<&str> {
        self.raw.get(index).and_then(|r| r.as_deref())
    }

    /// Replaces a field; the field is re-rendered on output unless the value is unchanged.
    pub fn set(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.fields.get_mut(index) {
            if *slot != value {
                *slot = value;
                if let Some(raw) = self.raw.get_mut(index) {
                    *raw = None;
                }
            }
        }
    }

    /// Rewrites the line this record was read from, replacing only the fields
    /// whose value changed and keeping the padding around them.
    ///
    /// Returns `None` for records that were not split from a line.
    pub fn splice(&self, render: impl Fn(&Value) -> String) -> Option<String> {
        let origin = self.origin.as_ref()?;
        let mut line = origin.line.clone();

        match (origin.tail_start, &self.tail) {
            (Some(start), Some(tail)) if line[start..].trim_end() == tail.as_str() => {}
            (Some(start), Some(tail)) => line.replace_range(start.., tail),
            (Some(start), None) => line.truncate(start),
            (None, Some(tail)) => {
                line.truncate(line.trim_end().len());
                line.push(' ');
                line.push_str(tail);
            }
            (None, None) => {}
        }

        for (index, (span, align)) in origin.spans.iter().enumerate().rev() {
            if self.raw(index).is_some() {
                continue;
            }
            if let Some(value) = self.fields.get(index) {
                replace_token(&mut line, span.clone(), *align, &render(value));
            }
        }
        Some(line)
    }

    pub fn is_blank(&self) -> bool {
        self.fields.is_empty() && self.tail.as_deref().is_none_or(|t| t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: FieldKind,
    /// Byte range for fixed-column layouts.
    pub range: Option<Range<usize>>,
    pub optional: bool,
    pub align: Align,
}

fn default_align(kind: FieldKind) -> Align {
    match kind {
        FieldKind::Str => Align::Left,
        FieldKind::Int | FieldKind::Float => Align::Right,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splitter {
    Whitespace,
    Delimiter(char),
    Fixed,
}

/// Declares the shape of the records of one section kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub section: String,
    pub columns: Vec<Column>,
    pub splitter: Splitter,
    /// Whether text after the typed columns is kept as a verbatim tail.
    pub tail: bool,
    /// For fixed layouts, where the tail starts.
    pub tail_from: Option<usize>,
    pub blank_is_content: bool,
}

impl FieldSpec {
    pub fn whitespace(section: &str) -> Self {
        Self::with_splitter(section, Splitter::Whitespace)
    }

    pub fn delimited(section: &str, delimiter: char) -> Self {
        Self::with_splitter(section, Splitter::Delimiter(delimiter))
    }

    pub fn fixed(section: &str) -> Self {
        Self::with_splitter(section, Splitter::Fixed)
    }

    fn with_splitter(section: &str, splitter: Splitter) -> Self {
        Self {
            section: section.to_string(),
            columns: Vec::new(),
            splitter,
            tail: false,
            tail_from: None,
            blank_is_content: false,
        }
    }

    pub fn column(mut self, name: &str, kind: FieldKind) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            kind,
            range: None,
            optional: false,
            align: default_align(kind),
        });
        self
    }

    pub fn int(self, name: &str) -> Self {
        self.column(name, FieldKind::Int)
    }

    pub fn float(self, name: &str) -> Self {
        self.column(name, FieldKind::Float)
    }

    pub fn str(self, name: &str) -> Self {
        self.column(name, FieldKind::Str)
    }

    /// A trailing column that may be absent; optional columns must come last.
    pub fn optional(mut self, name: &str, kind: FieldKind) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            kind,
            range: None,
            optional: true,
            align: default_align(kind),
        });
        self
    }

    pub fn at(mut self, name: &str, kind: FieldKind, range: Range<usize>) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            kind,
            range: Some(range),
            optional: false,
            align: default_align(kind),
        });
        self
    }

    /// Overrides the alignment of the most recently added column.
    pub fn aligned(mut self, align: Align) -> Self {
        if let Some(column) = self.columns.last_mut() {
            column.align = align;
        }
        self
    }

    pub fn with_tail(mut self) -> Self {
        self.tail = true;
        self
    }

    pub fn tail_from(mut self, start: usize) -> Self {
        self.tail = true;
        self.tail_from = Some(start);
        self
    }

    pub fn blank_lines_are_content(mut self) -> Self {
        self.blank_is_content = true;
        self
    }

    /// Splits and converts one line.
    ///
    /// Blank lines yield `None` unless the section treats them as content, in
    /// which case they become an empty record whose tail is the raw line.
    pub fn extract(&self, line: &str) -> Result<Option<Record>, InvalidDataError> {
        if line.trim().is_empty() {
            if self.blank_is_content {
                return Ok(Some(Record::new(Vec::new()).with_tail(line)));
            }
            return Ok(None);
        }

        let record = match self.splitter {
            Splitter::Fixed => self.extract_fixed(line),
            Splitter::Whitespace => self.extract_tokens(line, &whitespace_tokens(line)),
            Splitter::Delimiter(d) => self.extract_tokens(line, &delimited_tokens(line, d)),
        };
        record
            .map(Some)
            .map_err(|e| e.in_section(self.section.clone()).with_content(line))
    }

    fn extract_fixed(&self, line: &str) -> Result<Record, InvalidDataError> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut raw = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let token = column
                .range
                .clone()
                .and_then(|r| line.get(r.start..r.end.min(line.len())))
                .unwrap_or("");
            fields.push(convert(column, token)?);
            raw.push(Some(token.to_string()));
        }
        let tail = self
            .tail_from
            .and_then(|start| line.get(start..))
            .filter(|t| !t.is_empty())
            .map(String::from);
        Ok(Record {
            fields,
            tail,
            raw,
            origin: None,
        })
    }

    fn extract_tokens(
        &self,
        line: &str,
        tokens: &[(usize, &str)],
    ) -> Result<Record, InvalidDataError> {
        let required = self.columns.iter().filter(|c| !c.optional).count();
        if tokens.len() < required {
            return Err(InvalidDataError::new(format!(
                "expected at least {} columns, found {}",
                required,
                tokens.len()
            )));
        }

        let mut fields = Vec::with_capacity(self.columns.len());
        let mut raw = Vec::with_capacity(self.columns.len());
        let mut spans = Vec::with_capacity(self.columns.len());
        let mut consumed = 0;
        for column in &self.columns {
            let Some(&(start, token)) = tokens.get(consumed) else {
                break;
            };
            if column.optional && token.starts_with('#') {
                break;
            }
            fields.push(convert(column, token)?);
            raw.push(Some(token.to_string()));
            spans.push((start..start + token.len(), column.align));
            consumed += 1;
        }

        let tail_start = match tokens.get(consumed) {
            None => None,
            Some(_) if !self.tail => {
                return Err(InvalidDataError::new(format!(
                    "expected at most {} columns, found {}",
                    self.columns.len(),
                    tokens.len()
                )));
            }
            Some(&(start, _)) => Some(start),
        };
        let tail = tail_start.map(|start| line[start..].trim_end().to_string());
        let origin = (self.splitter == Splitter::Whitespace).then(|| Origin {
            line: line.to_string(),
            spans,
            tail_start,
        });
        Ok(Record {
            fields,
            tail,
            raw,
            origin,
        })
    }
}

fn convert(column: &Column, token: &str) -> Result<Value, InvalidDataError> {
    Value::convert(column.kind, token).ok_or_else(|| {
        InvalidDataError::new(format!(
            "could not convert '{}' to {}",
            token.trim(),
            column.kind.describe()
        ))
        .with_field(column.name.clone())
    })
}

/// Puts `text` where `span` was.
///
/// A shorter text is padded on the side given by `align`. A longer one takes
/// its extra width from the padding on that side, leaving at least one
/// separating space.
fn replace_token(line: &mut String, span: Range<usize>, align: Align, text: &str) {
    let before = line[..span.start]
        .bytes()
        .rev()
        .take_while(u8::is_ascii_whitespace)
        .count();
    let after = line[span.end..]
        .bytes()
        .take_while(u8::is_ascii_whitespace)
        .count();
    let old_len = span.len();

    if text.len() <= old_len {
        let pad = " ".repeat(old_len - text.len());
        let replacement = match align {
            Align::Left => format!("{text}{pad}"),
            Align::Right => format!("{pad}{text}"),
        };
        line.replace_range(span, &replacement);
        return;
    }

    let grow = text.len() - old_len;
    if align == Align::Left {
        let keep = usize::from(span.end + after != line.len());
        let taken = grow.min(after.saturating_sub(keep));
        line.replace_range(span.start..span.end + taken, text);
    } else {
        let keep = usize::from(before != span.start);
        let taken = grow.min(before.saturating_sub(keep));
        line.replace_range(span.start - taken..span.end, text);
    }
}

/// Whitespace-separated tokens with their byte offsets.
fn whitespace_tokens(line: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (idx, ch) in line.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push((s, &line[s..idx]));
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push((s, &line[s..]));
    }
    tokens
}

fn delimited_tokens(line: &str, delimiter: char) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (idx, ch) in line.char_indices() {
        if ch == delimiter {
            tokens.push((start, line[start..idx].trim()));
            start = idx + ch.len_utf8();
        }
    }
    tokens.push((start, line[start..].trim()));
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms_spec() -> FieldSpec {
        FieldSpec::whitespace("Atoms")
            .int("atom_id")
            .int("mol_id")
            .int("atom_type")
            .float("charge")
            .float("x")
            .float("y")
            .float("z")
            .optional("ix", FieldKind::Int)
            .optional("iy", FieldKind::Int)
            .optional("iz", FieldKind::Int)
            .with_tail()
    }

    #[test]
    fn extracts_typed_fields() {
        let rec = atoms_spec()
            .extract("1 2 3 -0.834 1.5 2.5 -3.5")
            .unwrap()
            .unwrap();
        assert_eq!(rec.int(0), Some(1));
        assert_eq!(rec.int(2), Some(3));
        assert_eq!(rec.float(3), Some(-0.834));
        assert_eq!(rec.fields.len(), 7);
        assert_eq!(rec.tail, None);
    }

    #[test]
    fn optional_columns_and_comment_tail_are_recognised() {
        let rec = atoms_spec()
            .extract("  5 1 2 0.417 0.0 0.0 0.0 0 1 -1   # HW  ")
            .unwrap()
            .unwrap();
        assert_eq!(rec.fields.len(), 10);
        assert_eq!(rec.int(9), Some(-1));
        assert_eq!(rec.tail.as_deref(), Some("# HW"));

        let rec = atoms_spec()
            .extract("5 1 2 0.417 0.0 0.0 0.0 # HW")
            .unwrap()
            .unwrap();
        assert_eq!(rec.fields.len(), 7);
        assert_eq!(rec.tail.as_deref(), Some("# HW"));
    }

    #[test]
    fn non_numeric_charge_names_the_field() {
        let err = atoms_spec().extract("1 1 1 abc 0.0 0.0 0.0").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("charge"));
        assert_eq!(err.section.as_deref(), Some("Atoms"));
        assert_eq!(err.content.as_deref(), Some("1 1 1 abc 0.0 0.0 0.0"));
        assert!(err.message.contains("abc"));
    }

    #[test]
    fn too_few_columns_is_invalid_data() {
        let err = atoms_spec().extract("1 1 1 0.0").unwrap_err();
        assert!(err.message.contains("at least 7"));
    }

    #[test]
    fn surplus_columns_without_tail_are_invalid_data() {
        let spec = FieldSpec::whitespace("Bonds")
            .int("id")
            .int("type")
            .int("a1")
            .int("a2");
        assert!(spec.extract("1 1 2 3 4").is_err());
        assert!(spec.extract("1 1 2 3").unwrap().is_some());
    }

    #[test]
    fn blank_lines_are_skipped_unless_declared_content() {
        let spec = FieldSpec::whitespace("Bonds").int("id");
        assert_eq!(spec.extract("   ").unwrap(), None);
        let rec = spec.blank_lines_are_content().extract("").unwrap().unwrap();
        assert!(rec.is_blank());
    }

    #[test]
    fn delimited_fields_are_trimmed() {
        let spec = FieldSpec::delimited("dict", ',').int("old").int("new");
        let rec = spec.extract(" 3 , 14").unwrap().unwrap();
        assert_eq!(rec.fields, vec![Value::Int(3), Value::Int(14)]);
    }

    #[test]
    fn fixed_columns_keep_raw_text_and_tail() {
        let spec = FieldSpec::fixed("ATOM")
            .at("record", FieldKind::Str, 0..6)
            .at("serial", FieldKind::Int, 6..11)
            .at("name", FieldKind::Str, 11..16)
            .tail_from(16);
        let rec = spec.extract("ATOM     12  CA  rest of line").unwrap().unwrap();
        assert_eq!(rec.str(0), Some("ATOM  "));
        assert_eq!(rec.int(1), Some(12));
        assert_eq!(rec.str(2), Some("  CA "));
        assert_eq!(rec.tail.as_deref(), Some(" rest of line"));
        assert_eq!(rec.raw(1), Some("   12"));
    }

    #[test]
    fn set_forgets_raw_text_only_when_the_value_changes() {
        let mut rec = atoms_spec()
            .extract("1 1 1 0.50 0.0 0.0 0.0")
            .unwrap()
            .unwrap();
        rec.set(3, Value::Float(0.5));
        assert_eq!(rec.raw(3), Some("0.50"));
        rec.set(3, Value::Float(0.25));
        assert_eq!(rec.raw(3), None);
        assert_eq!(rec.float(3), Some(0.25));
    }

    #[test]
    fn splice_keeps_untouched_lines_byte_for_byte() {
        let line = "       1 PROA 1    MET     -0.300000       14.0070           0   0.0  ";
        let spec = FieldSpec::whitespace("NATOM")
            .int("id")
            .str("seg")
            .int("res")
            .str("name")
            .float("charge")
            .with_tail();
        let rec = spec.extract(line).unwrap().unwrap();
        assert_eq!(rec.splice(|_| unreachable!()).as_deref(), Some(line));
    }

    #[test]
    fn splice_rewrites_changed_fields_in_their_own_column() {
        let spec = FieldSpec::whitespace("NATOM")
            .int("id")
            .str("seg")
            .int("res")
            .aligned(Align::Left)
            .str("name")
            .float("charge");
        let mut rec = spec
            .extract("       9 PROA 7    MET     -0.300000")
            .unwrap()
            .unwrap();
        rec.set(0, Value::Int(1234));
        rec.set(2, Value::Int(12));
        rec.set(4, Value::Float(0.5));
        let render = |v: &Value| match v {
            Value::Float(f) => format!("{f:.6}"),
            Value::Int(i) => i.to_string(),
            Value::Str(s) => s.clone(),
        };
        assert_eq!(
            rec.splice(render).as_deref(),
            Some("    1234 PROA 12   MET      0.500000")
        );
    }

    #[test]
    fn records_built_in_code_have_nothing_to_splice() {
        assert_eq!(Record::new(vec![Value::Int(1)]).splice(|_| String::new()), None);
        let delimited = FieldSpec::delimited("dict", ',').int("old").int("new");
        let rec = delimited.extract("1,2").unwrap().unwrap();
        assert_eq!(rec.splice(|_| String::new()), None);
    }

    #[test]
    fn fixed_column_past_end_of_line_is_a_conversion_error() {
        let spec = FieldSpec::fixed("ATOM").at("serial", FieldKind::Int, 6..11);
        let err = spec.extract("ATOM").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("serial"));
    }
}

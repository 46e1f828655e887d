use super::document::Section;
use super::fields::{Record, Value};

/// How floating-point fields are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Reuse the input text of untouched fields; otherwise as `Shortest`.
    #[default]
    Preserve,
    /// The shortest text that parses back to the same value.
    Shortest,
    Fixed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnFormat {
    pub width: usize,
    pub align: Align,
    /// Overrides the layout-wide precision for this column.
    pub precision: Option<usize>,
}

impl ColumnFormat {
    pub const fn left(width: usize) -> Self {
        Self {
            width,
            align: Align::Left,
            precision: None,
        }
    }

    pub const fn right(width: usize) -> Self {
        Self {
            width,
            align: Align::Right,
            precision: None,
        }
    }

    pub const fn float(width: usize, precision: usize) -> Self {
        Self {
            width,
            align: Align::Right,
            precision: Some(precision),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Delimited { separator: String, indent: String },
    FixedWidth(Vec<ColumnFormat>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub layout: Layout,
    pub precision: Precision,
}

impl FormatSpec {
    pub fn delimited(separator: &str) -> Self {
        Self {
            layout: Layout::Delimited {
                separator: separator.to_string(),
                indent: String::new(),
            },
            precision: Precision::default(),
        }
    }

    pub fn fixed_width(columns: Vec<ColumnFormat>) -> Self {
        Self {
            layout: Layout::FixedWidth(columns),
            precision: Precision::default(),
        }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_indent(mut self, prefix: &str) -> Self {
        if let Layout::Delimited { indent, .. } = &mut self.layout {
            *indent = prefix.to_string();
        }
        self
    }
}

/// Renders a single value, ignoring any remembered input text.
pub fn format_value(value: &Value, precision: Precision) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) => match precision {
            Precision::Fixed(digits) => format!("{:.*}", digits, v),
            Precision::Preserve | Precision::Shortest => format!("{}", v),
        },
        Value::Str(s) => s.clone(),
    }
}

fn render_field(record: &Record, index: usize, value: &Value, precision: Precision) -> String {
    if precision == Precision::Preserve || matches!(value, Value::Str(_)) {
        if let Some(raw) = record.raw(index) {
            return raw.to_string();
        }
    }
    format_value(value, precision)
}

pub fn format_record(record: &Record, spec: &FormatSpec) -> String {
    if record.fields.is_empty() {
        return record.tail.clone().unwrap_or_default();
    }

    match &spec.layout {
        Layout::Delimited { separator, indent } => {
            let mut line = indent.clone();
            for (i, value) in record.fields.iter().enumerate() {
                if i > 0 {
                    line.push_str(separator);
                }
                line.push_str(&render_field(record, i, value, spec.precision));
            }
            if let Some(tail) = &record.tail {
                line.push_str(separator);
                line.push_str(tail);
            }
            line
        }
        Layout::FixedWidth(columns) => {
            let mut line = String::new();
            for (i, value) in record.fields.iter().enumerate() {
                let Some(column) = columns.get(i) else {
                    line.push(' ');
                    line.push_str(&render_field(record, i, value, spec.precision));
                    continue;
                };
                let precision = match column.precision {
                    Some(digits) if spec.precision != Precision::Preserve => {
                        Precision::Fixed(digits)
                    }
                    Some(digits) if record.raw(i).is_none() => Precision::Fixed(digits),
                    _ => spec.precision,
                };
                let text = render_field(record, i, value, precision);
                match column.align {
                    Align::Left => line.push_str(&format!("{:<w$}", text, w = column.width)),
                    Align::Right => line.push_str(&format!("{:>w$}", text, w = column.width)),
                }
            }
            if let Some(tail) = &record.tail {
                line.push_str(tail);
            }
            line
        }
    }
}

/// Renders the body of a section: its records, or its raw lines for
/// free-form sections.
pub fn format_section(section: &Section, spec: &FormatSpec) -> Vec<String> {
    if section.records.is_empty() {
        return section.lines.clone();
    }
    section
        .records
        .iter()
        .map(|record| format_record(record, spec))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::fields::{FieldKind, FieldSpec};

    fn atoms_spec() -> FieldSpec {
        FieldSpec::whitespace("Atoms")
            .int("atom_id")
            .int("mol_id")
            .int("atom_type")
            .float("charge")
            .float("x")
            .float("y")
            .float("z")
            .with_tail()
    }

    #[test]
    fn preserve_reproduces_untouched_tokens_exactly() {
        let spec = atoms_spec();
        let line = "7 2 3 -0.8340 1.000000e+00 2.50 -3.125 # OW";
        let rec = spec.extract(line).unwrap().unwrap();
        assert_eq!(format_record(&rec, &FormatSpec::delimited(" ")), line);
    }

    #[test]
    fn modified_fields_are_rendered_with_the_requested_precision() {
        let spec = atoms_spec();
        let mut rec = spec.extract("7 2 3 -0.834 1.0 2.5 -3.125").unwrap().unwrap();
        rec.set(3, Value::Float(0.5));
        rec.set(0, Value::Int(12));
        assert_eq!(
            format_record(&rec, &FormatSpec::delimited(" ")),
            "12 2 3 0.5 1.0 2.5 -3.125"
        );
        assert_eq!(
            format_record(
                &rec,
                &FormatSpec::delimited(" ").with_precision(Precision::Fixed(3))
            ),
            "12 2 3 0.500 1.000 2.500 -3.125"
        );
    }

    #[test]
    fn shortest_output_reparses_to_an_equal_record() {
        let spec = atoms_spec();
        let rec = spec
            .extract("1 1 1 0.41700000001 1e-7 -0.0 123456.789")
            .unwrap()
            .unwrap();
        let out = format_record(
            &rec,
            &FormatSpec::delimited("\t").with_precision(Precision::Shortest),
        );
        let again = spec.extract(&out).unwrap().unwrap();
        assert_eq!(rec, again);
    }

    #[test]
    fn fixed_width_pads_and_keeps_tail() {
        let spec = FieldSpec::fixed("ATOM")
            .at("record", FieldKind::Str, 0..6)
            .at("serial", FieldKind::Int, 6..11)
            .at("x", FieldKind::Float, 11..19)
            .tail_from(19);
        let line = "ATOM      3  12.345  tail";
        let mut rec = spec.extract(line).unwrap().unwrap();
        let fmt = FormatSpec::fixed_width(vec![
            ColumnFormat::left(6),
            ColumnFormat::right(5),
            ColumnFormat::float(8, 3),
        ]);
        assert_eq!(format_record(&rec, &fmt), line);

        rec.set(1, Value::Int(10));
        rec.set(2, Value::Float(-1.5));
        assert_eq!(format_record(&rec, &fmt), "ATOM     10  -1.500  tail");
    }

    #[test]
    fn blank_content_records_render_as_their_raw_line() {
        let rec = Record::new(Vec::new()).with_tail("   ");
        assert_eq!(format_record(&rec, &FormatSpec::delimited(" ")), "   ");
    }

    #[test]
    fn indent_prefixes_delimited_lines() {
        let rec = Record::new(vec![Value::Int(1), Value::Float(2.0)]);
        let fmt = FormatSpec::delimited(" ").with_indent("  ");
        assert_eq!(format_record(&rec, &fmt), "  1 2");
    }
}

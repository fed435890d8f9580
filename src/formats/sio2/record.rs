use std::fmt::Write;

/// The decimal precision applied to every numeric field in a record.
const PRECISION: u32 = 3;

/// Rounds a value to [`PRECISION`] decimal digits and collapses integral
/// results so serialized output never shows trailing zeros.
pub fn normalize(value: f32) -> f32 {
    normalize_to(value, PRECISION)
}

/// Rounds a value to the given number of decimal digits; integral results
/// are collapsed to the integer value.
pub fn normalize_to(value: f32, precision: u32) -> f32 {
    let scale = 10f32.powi(precision as i32);
    let rounded = (value * scale).round() / scale;

    if rounded == rounded.trunc() {
        // Adding zero collapses a negative zero.
        rounded.trunc() + 0.
    } else {
        rounded
    }
}

/// Formats a numeric field value: normalized, shortest representation.
pub fn fmt_float(value: f32) -> String {
    format!("{}", normalize(value))
}

/// An in-memory scene record: a named block of fields accumulated in
/// insertion order and serialized once.
///
/// The serialized grammar is consumed literally by the engine, so the field
/// order and the single space inside every parenthesis group are fixed.
#[derive(Debug, PartialEq)]
pub struct Record {
    kind: &'static str,
    path: String,
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new(kind: &'static str, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field with pre-formatted arguments.
    pub fn field(&mut self, name: impl Into<String>, args: String) {
        self.fields.push((name.into(), args));
    }

    /// Appends a field of normalized float arguments.
    pub fn floats(&mut self, name: impl Into<String>, values: &[f32]) {
        let args = values
            .iter()
            .map(|&value| fmt_float(value))
            .collect::<Vec<_>>()
            .join(" ");
        self.field(name, args);
    }

    pub fn int(&mut self, name: impl Into<String>, value: usize) {
        self.field(name, value.to_string());
    }

    /// Appends a quoted string field.
    pub fn text(&mut self, name: impl Into<String>, value: &str) {
        self.field(name, format!("\"{}\"", value));
    }

    /// Serializes the record into the block grammar.
    pub fn serialize(&self) -> String {
        let mut out = format!("{}( \"{}\" )\n{{\n", self.kind, self.path);
        for (name, args) in &self.fields {
            let _ = writeln!(out, "\t{}( {} )", name, args);
        }
        out.push('}');
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn normalize_rounds_to_three_decimals() {
        assert_eq!(1.234, normalize(1.23449));
        assert_eq!(-0.5, normalize(-0.4999));
    }

    #[test]
    fn normalize_collapses_integers() {
        assert_eq!("2", fmt_float(1.9996));
        assert_eq!("0", fmt_float(0.0001));
        assert_eq!("-3", fmt_float(-3.0));
        assert_eq!("0", fmt_float(-0.0001));
    }

    #[test]
    fn normalize_is_idempotent() {
        for value in [0., 1.7324999, -12.0004, 3.3333333, 1e6, -0.125] {
            assert_eq!(normalize(value), normalize(normalize(value)));
        }
    }

    #[test]
    fn normalize_custom_precision() {
        assert_eq!(1.2, normalize_to(1.249, 1));
        assert_eq!(1., normalize_to(1.249, 0));
    }

    #[test]
    fn serialize_block_grammar() {
        let mut record = Record::new("camera", "camera/Main");
        record.floats("loc", &[1., -2.5, 0.125]);
        record.int("n_frame", 3);
        record.text("vgroup", "null");

        assert_eq!(
            "camera( \"camera/Main\" )\n\
             {\n\
             \tloc( 1 -2.5 0.125 )\n\
             \tn_frame( 3 )\n\
             \tvgroup( \"null\" )\n\
             }",
            record.serialize()
        );
    }
}

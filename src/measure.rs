use serde::Deserialize;
use unicode_width::UnicodeWidthStr;

use crate::schema::{TableAttribute, TableSchema};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    /// Space between the name column and the type column of a row
    pub column_gap: f64,
    pub min_table_width: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 20.0,
            padding_x: 8.0,
            padding_y: 4.0,
            column_gap: 32.0,
            min_table_width: 160.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    /// Height of the header and of every attribute row.
    pub fn row_height(&self) -> f64 {
        self.line_height + self.padding_y * 2.0
    }

    /// Left and right column text of an attribute row.
    ///
    /// Flags follow the name in parentheses; extra values follow the type.
    pub fn row_texts(&self, attr: &TableAttribute) -> (String, String) {
        let (flags, values) = row_notes(attr);
        let mut left = attr.name.clone();
        left.push_str(flags.as_deref().unwrap_or_default());

        let mut right = attr.target_label();
        right.push_str(values.as_deref().unwrap_or_default());

        (left, right)
    }

    pub fn table_size(&self, schema: &TableSchema) -> (f64, f64) {
        let header_width = self.text_width(&schema.name);

        let max_row_width = schema
            .attributes
            .iter()
            .map(|a| {
                let (left, right) = self.row_texts(a);
                self.text_width(&left) + self.column_gap + self.text_width(&right)
            })
            .fold(0.0, f64::max);

        let width = (header_width.max(max_row_width) + self.padding_x * 2.0)
            .max(self.min_table_width);
        let height = self.row_height() * (schema.attributes.len() + 1) as f64;

        (width, height)
    }
}

/// Muted suffixes of a row: ` (flags)` after the name, ` (values)` after the type.
pub fn row_notes(attr: &TableAttribute) -> (Option<String>, Option<String>) {
    let flags = (!attr.flags.is_empty()).then(|| format!(" ({})", attr.flags.join(",")));
    let values = (!attr.extra.is_empty()).then(|| {
        let values: Vec<&str> = attr.extra.iter().map(|e| e.value.as_str()).collect();
        format!(" ({})", values.join(","))
    });
    (flags, values)
}

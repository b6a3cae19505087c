use std::collections::HashMap;

use serde::Deserialize;

use crate::schema::TableSchema;

pub const DEFAULT_PALETTE: [&str; 2] = ["#f00", "#0f0"];

/// Fixed, ordered list of colors cycled across tables in declaration order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: Vec<String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect())
    }
}

impl Palette {
    pub fn new(colors: Vec<String>) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn color_at(&self, index: usize) -> Option<&str> {
        if self.colors.is_empty() {
            return None;
        }
        Some(&self.colors[index % self.colors.len()])
    }

    /// Table `i` (declaration order) gets `colors[i % len]`.
    pub fn assign(&self, schemas: &[TableSchema]) -> ColorMap {
        let colors = schemas
            .iter()
            .enumerate()
            .filter_map(|(i, s)| self.color_at(i).map(|c| (s.name.clone(), c.to_string())))
            .collect();
        ColorMap { colors }
    }
}

/// Table name -> color, computed once from declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorMap {
    colors: HashMap<String, String>,
}

impl ColorMap {
    pub fn color_of(&self, table: &str) -> Option<&str> {
        self.colors.get(table).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

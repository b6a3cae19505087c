use indexmap::IndexMap;
use log::{debug, info};
use serde::Deserialize;

use crate::geometry::{GeometrySource, Position};
use crate::schema::{TableSchema, table_element_id};

/// Left-to-right placement of table boxes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutEngine {
    pub margin_x: f64,
    pub margin_y: f64,
    /// Horizontal gap between neighbouring tables
    pub gap: f64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self {
            margin_x: 64.0,
            margin_y: 64.0,
            gap: 64.0,
        }
    }
}

/// Column order for the tables, referencing tables to the left of what they reference.
///
/// Starts from declaration order and walks the tables once, again in declaration
/// order. Whenever a table sits after a table it references, it is pulled out and
/// reinserted one slot before the referenced table's index (taken before removal).
/// This is a local bubble heuristic: later moves may break earlier constraints, and
/// reference cycles are not detected. A reference to an unknown table counts as
/// index -1, which sends the referencing table to the front.
pub fn compute_order(schemas: &[TableSchema]) -> Vec<String> {
    let mut order: Vec<String> = schemas.iter().map(|s| s.name.clone()).collect();

    for schema in schemas {
        for (_, target, _) in schema.references() {
            let target_index = index_of(&order, target);
            let self_index = index_of(&order, &schema.name);

            if self_index > target_index {
                // self_index > -1, so the table is present.
                let name = order.remove(self_index as usize);
                let insert_at = (target_index - 1).max(0) as usize;
                order.insert(insert_at, name);
            }
        }
    }

    info!(order:? = order; "Layout order computed");
    order
}

fn index_of(order: &[String], name: &str) -> isize {
    order
        .iter()
        .position(|n| n == name)
        .map_or(-1, |i| i as isize)
}

impl LayoutEngine {
    /// Place tables left to right in `order`, using widths measured by `geometry`.
    ///
    /// Tables the geometry source cannot measure are left unplaced.
    pub fn place(
        &self,
        order: &[String],
        geometry: &impl GeometrySource,
    ) -> IndexMap<String, Position> {
        let mut positions = IndexMap::with_capacity(order.len());
        let mut x = self.margin_x;

        for name in order {
            let Some(rect) = geometry.rect_of(&table_element_id(name)) else {
                debug!(table = name.as_str(); "Table not measured, left unplaced");
                continue;
            };

            positions.insert(name.clone(), Position::new(x, self.margin_y));
            x += rect.width + self.gap;
        }

        positions
    }
}

//! The live diagram: schema, colors, table positions and the latest connectors.
//!
//! Layout runs once, after parsing. Afterwards positions change only through
//! [`Diagram::move_table`], and every geometry change is followed by a full
//! [`Diagram::recompute`]. Drag state lives in a [`DragSession`] owned by whoever
//! captures pointer input, never in the diagram itself.

use indexmap::IndexMap;
use log::{debug, info};

use crate::color::ColorMap;
use crate::config::AppConfig;
use crate::geometry::{GeometrySource, Position};
use crate::layout::{LayoutEngine, compute_order};
use crate::parser::{self, SyntaxError};
use crate::routing::{Connector, RoutingEngine};
use crate::schema::TableSchema;

#[derive(Debug, Clone)]
pub struct Diagram {
    schemas: Vec<TableSchema>,
    colors: ColorMap,
    layout: LayoutEngine,
    routing: RoutingEngine,
    order: Vec<String>,
    positions: IndexMap<String, Position>,
    connectors: Vec<Connector>,
    laid_out: bool,
}

impl Diagram {
    pub fn new(schemas: Vec<TableSchema>, config: &AppConfig) -> Self {
        let colors = config.palette.assign(&schemas);
        Self {
            schemas,
            colors,
            layout: config.layout.clone(),
            routing: config.routing.clone(),
            order: Vec::new(),
            positions: IndexMap::new(),
            connectors: Vec::new(),
            laid_out: false,
        }
    }

    pub fn parse(source: &str, config: &AppConfig) -> Result<Self, SyntaxError> {
        let schemas = parser::parse(source)?;
        info!(tables = schemas.len(); "Schema loaded");
        Ok(Self::new(schemas, config))
    }

    /// Order and place the tables using widths measured by `geometry`.
    ///
    /// Only the first call has an effect; returns whether tables were placed.
    pub fn layout(&mut self, geometry: &impl GeometrySource) -> bool {
        if self.laid_out {
            debug!("Layout already applied, ignoring");
            return false;
        }

        self.order = compute_order(&self.schemas);
        self.positions = self.layout.place(&self.order, geometry);
        self.laid_out = true;
        true
    }

    /// Rebuild every connector from the current geometry.
    pub fn recompute(&mut self, geometry: &impl GeometrySource) -> &[Connector] {
        self.connectors = self.routing.route(&self.schemas, &self.colors, geometry);
        &self.connectors
    }

    /// Shift a table by `(dx, dy)`. Unplaced tables start from the origin.
    ///
    /// Returns false for a table that is not part of the schema.
    pub fn move_table(&mut self, table: &str, dx: f64, dy: f64) -> bool {
        if self.schema(table).is_none() {
            return false;
        }

        let position = self.positions.entry(table.to_string()).or_default();
        *position = position.offset(dx, dy);
        true
    }

    pub fn schemas(&self) -> &[TableSchema] {
        &self.schemas
    }

    pub fn schema(&self, table: &str) -> Option<&TableSchema> {
        self.schemas.iter().find(|s| s.name == table)
    }

    pub fn colors(&self) -> &ColorMap {
        &self.colors
    }

    /// Column order chosen by the layout, empty before [`Diagram::layout`].
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn positions(&self) -> &IndexMap<String, Position> {
        &self.positions
    }

    pub fn position_of(&self, table: &str) -> Option<Position> {
        self.positions.get(table).copied()
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn is_laid_out(&self) -> bool {
        self.laid_out
    }
}

/// The table being dragged, plus the hook that asks for a re-render.
///
/// Owned by the input layer. A move is always applied to the diagram before the
/// recompute hook fires, and fires it exactly once.
pub struct DragSession<'a> {
    active: Option<String>,
    recompute: Option<Box<dyn FnMut() + 'a>>,
}

impl Default for DragSession<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> DragSession<'a> {
    pub fn new() -> Self {
        Self {
            active: None,
            recompute: None,
        }
    }

    pub fn with_recompute(recompute: impl FnMut() + 'a) -> Self {
        let mut session = Self::new();
        session.set_recompute(recompute);
        session
    }

    /// Register or replace the recompute hook.
    pub fn set_recompute(&mut self, recompute: impl FnMut() + 'a) {
        self.recompute = Some(Box::new(recompute));
    }

    pub fn press(&mut self, table: impl Into<String>) {
        let table = table.into();
        debug!(table = table.as_str(); "Drag started");
        self.active = Some(table);
    }

    /// Move the pressed table by `(dx, dy)`, then request a recompute.
    ///
    /// Returns false, without requesting anything, when no table is pressed or the
    /// pressed table is unknown to `diagram`.
    pub fn drag_by(&mut self, diagram: &mut Diagram, dx: f64, dy: f64) -> bool {
        let Some(table) = self.active.as_deref() else {
            return false;
        };
        if !diagram.move_table(table, dx, dy) {
            return false;
        }

        if let Some(recompute) = self.recompute.as_mut() {
            recompute();
        }
        true
    }

    /// End the drag. Also used when the surface loses focus.
    pub fn release(&mut self) {
        if let Some(table) = self.active.take() {
            debug!(table = table.as_str(); "Drag released");
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }
}

//! Headless rendering surface.
//!
//! A [`Scene`] measures every table once with [`TextMetrics`] and answers geometry
//! queries from the current table positions, the way a browser would report bounding
//! boxes. [`Canvas`] ties a [`Diagram`] to its scene and drives the
//! measure → layout → route sequence.

use indexmap::IndexMap;
use log::info;

use crate::config::AppConfig;
use crate::diagram::Diagram;
use crate::error::Error;
use crate::geometry::{GeometrySource, Position, Rect};
use crate::measure::TextMetrics;
use crate::routing::Connector;
use crate::schema::{TABLE_ID_PREFIX, TableSchema};
use crate::svg::SvgRenderer;

#[derive(Debug, Clone)]
struct TableBox {
    position: Position,
    width: f64,
    height: f64,
    rows: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Scene {
    metrics: TextMetrics,
    tables: IndexMap<String, TableBox>,
}

impl Scene {
    /// Measure every table; all boxes start at the origin until positions are synced.
    pub fn new(schemas: &[TableSchema], metrics: TextMetrics) -> Self {
        let tables = schemas
            .iter()
            .map(|s| {
                let (width, height) = metrics.table_size(s);
                let rows = s.attributes.iter().map(|a| a.name.clone()).collect();
                let table = TableBox {
                    position: Position::default(),
                    width,
                    height,
                    rows,
                };
                (s.name.clone(), table)
            })
            .collect();

        Self { metrics, tables }
    }

    pub fn metrics(&self) -> &TextMetrics {
        &self.metrics
    }

    pub fn sync_positions(&mut self, positions: &IndexMap<String, Position>) {
        for (name, position) in positions {
            if let Some(table) = self.tables.get_mut(name) {
                table.position = *position;
            }
        }
    }

    pub fn table_rect(&self, table: &str) -> Option<Rect> {
        self.tables.get(table).map(|t| {
            Rect::new(t.position.x, t.position.y, t.width, t.height)
        })
    }

    /// Header row of a table box.
    pub fn header_rect(&self, table: &str) -> Option<Rect> {
        let rect = self.table_rect(table)?;
        Some(Rect::new(rect.x, rect.y, rect.width, self.metrics.row_height()))
    }

    pub fn row_rect(&self, table: &str, attribute: &str) -> Option<Rect> {
        let t = self.tables.get(table)?;
        let index = t.rows.iter().position(|r| r == attribute)?;
        let row_height = self.metrics.row_height();
        Some(Rect::new(
            t.position.x,
            t.position.y + row_height * (index + 1) as f64,
            t.width,
            row_height,
        ))
    }

    /// Smallest rectangle holding every table box.
    pub fn bounds(&self) -> Option<Rect> {
        let mut rects = self.tables.keys().filter_map(|name| self.table_rect(name));
        let first = rects.next()?;
        let (mut min_x, mut min_y) = (first.x, first.y);
        let (mut max_x, mut max_y) = (first.right(), first.bottom());
        for r in rects {
            min_x = min_x.min(r.x);
            min_y = min_y.min(r.y);
            max_x = max_x.max(r.right());
            max_y = max_y.max(r.bottom());
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

impl GeometrySource for Scene {
    fn rect_of(&self, element_id: &str) -> Option<Rect> {
        let rest = element_id
            .strip_prefix(TABLE_ID_PREFIX)?
            .strip_prefix('.')?;
        // Identifiers never contain dots, so the first one separates table and row.
        match rest.split_once('.') {
            Some((table, attribute)) => self.row_rect(table, attribute),
            None => self.table_rect(rest),
        }
    }
}

/// A diagram together with the scene it is drawn on.
#[derive(Debug, Clone)]
pub struct Canvas {
    diagram: Diagram,
    scene: Scene,
}

impl Canvas {
    /// Parse, measure at default positions, lay out, then route once.
    pub fn load(source: &str, config: &AppConfig) -> Result<Self, Error> {
        let diagram = Diagram::parse(source, config)?;
        let scene = Scene::new(diagram.schemas(), config.metrics.clone());
        let mut canvas = Self { diagram, scene };

        canvas.diagram.layout(&canvas.scene);
        canvas.refresh();
        info!(
            tables = canvas.diagram.positions().len(),
            connectors = canvas.diagram.connectors().len();
            "Diagram laid out"
        );
        Ok(canvas)
    }

    /// Push the diagram's positions into the scene and reroute.
    pub fn refresh(&mut self) -> &[Connector] {
        self.scene.sync_positions(self.diagram.positions());
        self.diagram.recompute(&self.scene)
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn diagram_mut(&mut self) -> &mut Diagram {
        &mut self.diagram
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn render_svg(&self) -> String {
        SvgRenderer::default().render(&self.diagram, &self.scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::DragSession;
    use crate::parser::parse;
    use std::cell::Cell;

    const SOURCE: &str = r#"
table User {
    id(PK): string
    name?: string "desc=姓名"
    meta?: json
}
table UserAuth {
    id(PK): number
    userId -> User.id
}
table UserToken {
    id(PK): number
    token: string
    userId -> User.id
    authId -> UserAuth.id
}
table Player {
    id(PK): number
    userId -> User.id
}
"#;

    #[test]
    fn test_scene_answers_element_ids() {
        let schemas = parse(SOURCE).unwrap();
        let mut scene = Scene::new(&schemas, TextMetrics::default());
        let mut positions = IndexMap::new();
        positions.insert("UserAuth".to_string(), Position::new(10.0, 20.0));
        scene.sync_positions(&positions);

        let table = scene.rect_of("table.UserAuth").unwrap();
        assert_eq!((table.x, table.y), (10.0, 20.0));
        assert_eq!(table.height, 3.0 * 28.0);

        let row = scene.rect_of("table.UserAuth.userId").unwrap();
        assert_eq!(row, Rect::new(10.0, 20.0 + 2.0 * 28.0, table.width, 28.0));

        assert!(scene.rect_of("table.UserAuth.nope").is_none());
        assert!(scene.rect_of("table.Nope").is_none());
        assert!(scene.rect_of("view.UserAuth").is_none());
        assert!(scene.rect_of("tableUserAuth").is_none());
    }

    #[test]
    fn test_canvas_load_places_and_routes() {
        let canvas = Canvas::load(SOURCE, &AppConfig::default()).unwrap();
        let diagram = canvas.diagram();

        assert_eq!(diagram.order(), ["UserToken", "Player", "UserAuth", "User"]);
        // Every reference resolves: 3 to User, 1 to UserAuth.
        assert_eq!(diagram.connectors().len(), 4);

        let xs: Vec<f64> = diagram
            .order()
            .iter()
            .map(|n| diagram.position_of(n).unwrap().x)
            .collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(xs[0], 64.0);
        let first_width = canvas.scene().table_rect("UserToken").unwrap().width;
        assert_eq!(xs[1], 64.0 + first_width + 64.0);
    }

    #[test]
    fn test_drag_reroutes() {
        let mut canvas = Canvas::load(SOURCE, &AppConfig::default()).unwrap();
        let before = canvas.diagram().connectors().to_vec();

        let dirty = Cell::new(false);
        let mut session = DragSession::with_recompute(|| dirty.set(true));
        session.press("User");
        session.drag_by(canvas.diagram_mut(), 0.0, 120.0);
        session.release();
        assert!(dirty.get());

        let after = canvas.refresh().to_vec();
        assert_eq!(before.len(), after.len());
        let to_user = |cs: &[Connector]| {
            cs.iter()
                .find(|c| c.to == "table.User.id")
                .map(|c| c.path.points.last().copied().unwrap())
                .unwrap()
        };
        assert_eq!(to_user(&after).y, to_user(&before).y + 120.0);

        // Same geometry, same routes.
        assert_eq!(canvas.refresh().to_vec(), after);
    }

    #[test]
    fn test_dragging_target_left_doubles_back() {
        let mut canvas = Canvas::load(
            "table A {\n  id: int\n}\ntable B {\n  a -> A.id\n}",
            &AppConfig::default(),
        )
        .unwrap();

        // B sits left of A; drag A far to the left of B.
        let mut session = DragSession::new();
        session.press("A");
        session.drag_by(canvas.diagram_mut(), -1000.0, 0.0);
        let connectors = canvas.refresh().to_vec();

        let points = &connectors[0].path.points;
        assert_eq!(points.len(), 6);
        let a = canvas.scene().table_rect("A").unwrap();
        let b = canvas.scene().table_rect("B").unwrap();
        assert_eq!(points[2].y, a.bottom().max(b.bottom()) + 32.0);
    }

    #[test]
    fn test_bounds() {
        let canvas = Canvas::load(SOURCE, &AppConfig::default()).unwrap();
        let bounds = canvas.scene().bounds().unwrap();
        assert_eq!((bounds.x, bounds.y), (64.0, 64.0));
        let user = canvas.scene().table_rect("User").unwrap();
        assert_eq!(bounds.right(), user.right());
    }
}

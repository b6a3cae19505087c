//! Orthogonal connector routing between attribute rows.
//!
//! Every reference attribute yields one [`Connector`]: an elbowed polyline leaving the
//! source row on its right edge and entering the target row on its left edge, plus a
//! marker at each end. Routing reads geometry fresh on every call and keeps no state
//! between calls, so it can be rerun after any drag or resize.

use log::{debug, trace};
use serde::Deserialize;

use crate::color::ColorMap;
use crate::geometry::{GeometrySource, Point, Rect};
use crate::schema::{TableSchema, attribute_element_id, table_element_id};

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorPath {
    pub points: Vec<Point>,
    pub color: String,
}

/// Filled rectangle emphasising a connector end.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub rect: Rect,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    /// Element id of the referencing attribute row
    pub from: String,
    /// Element id of the referenced attribute row
    pub to: String,
    pub path: ConnectorPath,
    pub markers: [Marker; 2],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingEngine {
    /// Stand-off kept between a connector and the box edge before turning
    pub padding: f64,
    pub marker_width: f64,
    pub marker_height: f64,
    /// Stroke for connectors whose target table has no assigned color
    pub default_color: String,
}

impl Default for RoutingEngine {
    fn default() -> Self {
        Self {
            padding: 32.0,
            marker_width: 6.0,
            marker_height: 10.0,
            default_color: "#fff".to_string(),
        }
    }
}

impl RoutingEngine {
    /// Route every reference attribute whose four rectangles resolve.
    ///
    /// Connectors come out in declaration order (table, then attribute). References
    /// to unknown or not-yet-rendered elements are skipped without error.
    pub fn route(
        &self,
        schemas: &[TableSchema],
        colors: &ColorMap,
        geometry: &impl GeometrySource,
    ) -> Vec<Connector> {
        let mut connectors = Vec::new();
        let mut skipped = 0usize;

        for schema in schemas {
            for (attr, target_table, target_attr) in schema.references() {
                let from = attribute_element_id(&schema.name, &attr.name);
                let to = attribute_element_id(target_table, target_attr);

                let rects = (
                    geometry.rect_of(&table_element_id(&schema.name)),
                    geometry.rect_of(&table_element_id(target_table)),
                    geometry.rect_of(&from),
                    geometry.rect_of(&to),
                );
                let (Some(source_box), Some(target_box), Some(source_row), Some(target_row)) =
                    rects
                else {
                    debug!(from = from.as_str(), to = to.as_str(); "Connector endpoint unresolved, skipped");
                    skipped += 1;
                    continue;
                };

                let p1 = source_row.right_center();
                let p2 = target_row.left_center();
                let points = self.route_points(p1, p2, &source_box, &target_box);
                trace!(from = from.as_str(), points:? = points; "Routed connector");

                let color = colors
                    .color_of(target_table)
                    .unwrap_or(&self.default_color)
                    .to_string();

                connectors.push(Connector {
                    markers: [self.marker(p1, &color), self.marker(p2, &color)],
                    path: ConnectorPath { points, color },
                    from,
                    to,
                });
            }
        }

        debug!(routed = connectors.len(), skipped = skipped; "Routing pass complete");
        connectors
    }

    /// Orthogonal points from `p1` (source row, right edge) to `p2` (target row, left edge).
    ///
    /// When the target lies left of the source the path drops below both boxes before
    /// crossing back, so it never cuts through either table.
    pub fn route_points(
        &self,
        p1: Point,
        p2: Point,
        source_box: &Rect,
        target_box: &Rect,
    ) -> Vec<Point> {
        let m = self.padding;
        let mut points = vec![p1, Point::new(p1.x + m, p1.y)];

        if p1.x > p2.x {
            let below = (source_box.bottom() + m).max(target_box.bottom() + m);
            points.push(Point::new(p1.x + m, below));
            points.push(Point::new(p2.x - m, below));
        } else {
            points.push(Point::new(p2.x - m, p1.y));
        }

        points.push(Point::new(p2.x - m, p2.y));
        points.push(p2);
        points
    }

    fn marker(&self, at: Point, color: &str) -> Marker {
        Marker {
            rect: Rect::centered_at(at, self.marker_width, self.marker_height),
            color: color.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Palette;
    use crate::parser::parse;
    use std::collections::HashMap;

    const SCHEMA: &str = "table User {\n  id(PK): string\n}\ntable UserAuth {\n  id(PK): number\n  userId -> User.id\n}";

    /// UserAuth on the left, User on the right; each table 100 wide, rows 20 high.
    fn forward_geometry() -> HashMap<String, Rect> {
        let mut rects = HashMap::new();
        rects.insert("table.UserAuth".into(), Rect::new(0.0, 0.0, 100.0, 60.0));
        rects.insert("table.UserAuth.id".into(), Rect::new(0.0, 20.0, 100.0, 20.0));
        rects.insert("table.UserAuth.userId".into(), Rect::new(0.0, 40.0, 100.0, 20.0));
        rects.insert("table.User".into(), Rect::new(300.0, 100.0, 100.0, 40.0));
        rects.insert("table.User.id".into(), Rect::new(300.0, 120.0, 100.0, 20.0));
        rects
    }

    #[test]
    fn test_forward_route() {
        let schemas = parse(SCHEMA).unwrap();
        let colors = Palette::default().assign(&schemas);
        let connectors = RoutingEngine::default().route(&schemas, &colors, &forward_geometry());

        assert_eq!(connectors.len(), 1);
        let c = &connectors[0];
        assert_eq!(c.from, "table.UserAuth.userId");
        assert_eq!(c.to, "table.User.id");
        assert_eq!(
            c.path.points,
            vec![
                Point::new(100.0, 50.0),
                Point::new(132.0, 50.0),
                Point::new(268.0, 50.0),
                Point::new(268.0, 130.0),
                Point::new(300.0, 130.0),
            ]
        );
        // Color of the target table (User is first, so first palette entry).
        assert_eq!(c.path.color, "#f00");
        assert_eq!(c.markers[0].rect, Rect::new(97.0, 45.0, 6.0, 10.0));
        assert_eq!(c.markers[1].rect, Rect::new(297.0, 125.0, 6.0, 10.0));
        assert!(c.markers.iter().all(|m| m.color == "#f00"));
    }

    #[test]
    fn test_doubling_back_goes_below_both_boxes() {
        let mut rects = forward_geometry();
        // Move the referencing table to the right of its target.
        rects.insert("table.UserAuth".into(), Rect::new(500.0, 0.0, 100.0, 200.0));
        rects.insert("table.UserAuth.userId".into(), Rect::new(500.0, 40.0, 100.0, 20.0));

        let schemas = parse(SCHEMA).unwrap();
        let colors = Palette::default().assign(&schemas);
        let points = &RoutingEngine::default().route(&schemas, &colors, &rects)[0]
            .path
            .points;

        let below = 200.0 + 32.0;
        assert_eq!(
            points,
            &vec![
                Point::new(600.0, 50.0),
                Point::new(632.0, 50.0),
                Point::new(632.0, below),
                Point::new(268.0, below),
                Point::new(268.0, 130.0),
                Point::new(300.0, 130.0),
            ]
        );
        // The leftward run happens at the drop height, never at the source row.
        let leftward = points.windows(2).find(|w| w[1].x < w[0].x).unwrap();
        assert!(leftward[0].y >= below && leftward[1].y >= below);
    }

    #[test]
    fn test_dangling_reference_is_silent() {
        let schemas = parse("table A {\n  id: int\n  x -> Missing.id\n  y -> A.nope\n}").unwrap();
        let mut rects = HashMap::new();
        rects.insert("table.A".to_string(), Rect::new(0.0, 0.0, 10.0, 10.0));
        rects.insert("table.A.id".to_string(), Rect::new(0.0, 0.0, 10.0, 5.0));
        rects.insert("table.A.x".to_string(), Rect::new(0.0, 5.0, 10.0, 5.0));
        rects.insert("table.A.y".to_string(), Rect::new(0.0, 5.0, 10.0, 5.0));

        let colors = Palette::default().assign(&schemas);
        assert!(RoutingEngine::default().route(&schemas, &colors, &rects).is_empty());
    }

    #[test]
    fn test_default_color_when_unassigned() {
        let schemas = parse(SCHEMA).unwrap();
        let connectors =
            RoutingEngine::default().route(&schemas, &ColorMap::default(), &forward_geometry());
        assert_eq!(connectors[0].path.color, "#fff");
    }

    #[test]
    fn test_routing_is_deterministic() {
        let schemas = parse(SCHEMA).unwrap();
        let colors = Palette::default().assign(&schemas);
        let engine = RoutingEngine::default();
        let geometry = forward_geometry();
        assert_eq!(
            engine.route(&schemas, &colors, &geometry),
            engine.route(&schemas, &colors, &geometry)
        );
    }
}

use std::fmt::{self, Write};

use crate::diagram::Diagram;
use crate::measure::row_notes;
use crate::geometry::Rect;
use crate::routing::Connector;
use crate::scene::Scene;
use crate::schema::{TableSchema, attribute_element_id};

pub struct SvgRenderer {
    /// Blank space around the drawing
    margin: f64,
    grid_size: f64,
    stroke_width: f64,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            margin: 64.0,
            grid_size: 16.0,
            stroke_width: 4.0,
        }
    }
}

impl SvgRenderer {
    pub fn render(&self, diagram: &Diagram, scene: &Scene) -> String {
        let mut svg = String::new();
        self.write_svg(&mut svg, diagram, scene).unwrap();
        svg
    }

    fn write_svg(&self, svg: &mut String, diagram: &Diagram, scene: &Scene) -> fmt::Result {
        let view = self.view_box(diagram, scene);

        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="{} {} {} {}">"#,
            view.width, view.height, view.x, view.y, view.width, view.height
        )?;

        writeln!(
            svg,
            r##"<style>
  .table-name {{ font-family: monospace; font-size: 14px; font-weight: bold; fill: #f3f4f6; }}
  .row-text {{ font-family: monospace; font-size: 14px; fill: #d1d5db; }}
  .row-note {{ font-family: monospace; font-size: 11px; fill: #9ca3af; }}
</style>
<defs>
  <pattern id="GridPattern" x="0" y="0" width="{0}" height="{0}" patternUnits="userSpaceOnUse">
    <rect x="0" y="0" width="1" height="1" fill="none" stroke="#607a9f" />
  </pattern>
</defs>"##,
            self.grid_size
        )?;

        writeln!(
            svg,
            r##"<rect x="{}" y="{}" width="{}" height="{}" fill="#334155" />"##,
            view.x, view.y, view.width, view.height
        )?;
        writeln!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="url(#GridPattern)" />"#,
            view.x, view.y, view.width, view.height
        )?;

        // Lines behind tables, markers in front.
        writeln!(
            svg,
            r#"<g class="connectors" stroke-linejoin="bevel" stroke-width="{}" fill="none">"#,
            self.stroke_width
        )?;
        for connector in diagram.connectors() {
            self.write_connector(svg, connector)?;
        }
        writeln!(svg, "</g>")?;

        for schema in diagram.schemas() {
            self.write_table(svg, schema, scene)?;
        }

        writeln!(svg, r#"<g class="markers" stroke="none">"#)?;
        for connector in diagram.connectors() {
            for marker in &connector.markers {
                let r = &marker.rect;
                writeln!(
                    svg,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" />"#,
                    r.x,
                    r.y,
                    r.width,
                    r.height,
                    escape_xml(&marker.color)
                )?;
            }
        }
        writeln!(svg, "</g>")?;

        writeln!(svg, "</svg>")
    }

    fn write_connector(&self, svg: &mut String, connector: &Connector) -> fmt::Result {
        let points: Vec<String> = connector
            .path
            .points
            .iter()
            .map(|p| format!("{},{}", p.x, p.y))
            .collect();
        writeln!(
            svg,
            r#"<polyline data-from="{}" data-to="{}" stroke="{}" points="{}" />"#,
            escape_xml(&connector.from),
            escape_xml(&connector.to),
            escape_xml(&connector.path.color),
            points.join(" ")
        )
    }

    fn write_table(&self, svg: &mut String, schema: &TableSchema, scene: &Scene) -> fmt::Result {
        let (Some(rect), Some(header)) = (
            scene.table_rect(&schema.name),
            scene.header_rect(&schema.name),
        ) else {
            return Ok(());
        };
        let metrics = scene.metrics();
        let baseline = metrics.padding_y + metrics.line_height * 0.75;

        writeln!(
            svg,
            r#"<g id="{}">"#,
            escape_xml(&schema.element_id())
        )?;
        writeln!(
            svg,
            r##"<rect x="{}" y="{}" width="{}" height="{}" rx="6" fill="#1e293b" stroke="#0f172a" />"##,
            rect.x, rect.y, rect.width, rect.height
        )?;
        writeln!(
            svg,
            r#"<text class="table-name" x="{}" y="{}">{}</text>"#,
            header.x + metrics.padding_x,
            header.y + baseline,
            escape_xml(&schema.name)
        )?;

        for (index, attr) in schema.attributes.iter().enumerate() {
            let Some(row) = scene.row_rect(&schema.name, &attr.name) else {
                continue;
            };
            let fill = if index % 2 == 0 { "#475569" } else { "#334155" };
            let (flags, values) = row_notes(attr);

            writeln!(
                svg,
                r#"<g id="{}">"#,
                escape_xml(&attribute_element_id(&schema.name, &attr.name))
            )?;
            writeln!(
                svg,
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" />"#,
                row.x, row.y, row.width, row.height, fill
            )?;
            writeln!(
                svg,
                r#"<text class="row-text" x="{}" y="{}">{}{}</text>"#,
                row.x + metrics.padding_x,
                row.y + baseline,
                escape_xml(&attr.name),
                note_span(flags.as_deref())
            )?;
            writeln!(
                svg,
                r#"<text class="row-text" x="{}" y="{}" text-anchor="end">{}{}</text>"#,
                row.right() - metrics.padding_x,
                row.y + baseline,
                escape_xml(&attr.target_label()),
                note_span(values.as_deref())
            )?;
            writeln!(svg, "</g>")?;
        }

        writeln!(svg, "</g>")
    }

    /// Bounds of every table and connector, grown by the margin.
    fn view_box(&self, diagram: &Diagram, scene: &Scene) -> Rect {
        let mut min_x = 0.0f64;
        let mut min_y = 0.0f64;
        let mut max_x = 0.0f64;
        let mut max_y = 0.0f64;

        if let Some(bounds) = scene.bounds() {
            min_x = min_x.min(bounds.x);
            min_y = min_y.min(bounds.y);
            max_x = max_x.max(bounds.right());
            max_y = max_y.max(bounds.bottom());
        }
        for p in diagram.connectors().iter().flat_map(|c| &c.path.points) {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        // The origin stays in view unless a table has been dragged past it.
        let x = if min_x < 0.0 { min_x - self.margin } else { 0.0 };
        let y = if min_y < 0.0 { min_y - self.margin } else { 0.0 };
        Rect::new(x, y, max_x + self.margin - x, max_y + self.margin - y)
    }
}

fn note_span(note: Option<&str>) -> String {
    match note {
        Some(note) => format!(r#"<tspan class="row-note">{}</tspan>"#, escape_xml(note)),
        None => String::new(),
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::diagram::DragSession;
    use crate::scene::Canvas;

    #[test]
    fn test_render_basic() {
        let input = "table User {\n  id(PK): string\n  name: string\n}";
        let svg = Canvas::load(input, &AppConfig::default()).unwrap().render_svg();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"<g id="table.User">"#));
        assert!(svg.contains(r#"<g id="table.User.name">"#));
        assert!(svg.contains(r#">id<tspan class="row-note"> (PK)</tspan></text>"#));
        assert!(svg.contains("GridPattern"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_render_unicode_and_escaping() {
        let input = "table ユーザー {\n  名前: map<text> \"desc=姓名&\"\n}";
        let svg = Canvas::load(input, &AppConfig::default()).unwrap().render_svg();

        assert!(svg.contains("ユーザー"));
        assert!(svg.contains("名前"));
        assert!(svg.contains(r#">map&lt;text&gt;<tspan class="row-note"> (姓名&amp;)</tspan></text>"#));
    }

    #[test]
    fn test_render_row_notes_only_when_present() {
        let input = "table User {\n  id(PK): string\n  name: string \"max=32\"\n  bio: text\n}";
        let svg = Canvas::load(input, &AppConfig::default()).unwrap().render_svg();

        assert_eq!(svg.matches(r#"<tspan class="row-note">"#).count(), 2);
        assert!(svg.contains(r#">string<tspan class="row-note"> (32)</tspan></text>"#));
        assert!(svg.contains(r#">bio</text>"#));
        assert!(svg.contains(r#">text</text>"#));
    }

    #[test]
    fn test_render_connectors_and_markers() {
        let input = "table User {\n  id: int\n}\ntable Post {\n  author -> User.id\n}";
        let svg = Canvas::load(input, &AppConfig::default()).unwrap().render_svg();

        assert_eq!(svg.matches("<polyline").count(), 1);
        assert!(svg.contains(r#"data-from="table.Post.author""#));
        // User is declared first: first palette color.
        assert!(svg.contains(r##"stroke="#f00""##));
        assert_eq!(svg.matches(r##"fill="#f00""##).count(), 2);
    }

    #[test]
    fn test_view_box_follows_dragged_table() {
        let input = "table A {\n  id: int\n}";
        let mut canvas = Canvas::load(input, &AppConfig::default()).unwrap();
        let mut session = DragSession::new();
        session.press("A");
        session.drag_by(canvas.diagram_mut(), -500.0, 0.0);
        canvas.refresh();

        let svg = canvas.render_svg();
        // A now starts at x = 64 - 500, the view opens a margin before it.
        assert!(svg.contains(r#"viewBox="-500 0"#));
    }
}

//! SVG output for a laid-out family tree.
//!
//! Layout coordinates are mapped into the container through a [`Viewport`]; panels (title, hover
//! card) are drawn in container coordinates on top of the tree.

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Write as _;
use vamsa_core::config::RenderConfig;
use vamsa_core::{Person, Relationship};

use crate::model::{Bounds, Curve, LayoutPoint, PositionedNode, TreeLayout};
use crate::text::{TextMeasurer, TextStyle, truncate_to_width};

/// Space kept free above the tree for the title panel.
const HEADER_HEIGHT: f64 = 64.0;
const PANEL_PADDING: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub node_fill: String,
    pub node_fill_highlight: String,
    pub node_stroke: String,
    pub edge_stroke: String,
    pub button_fill: String,
    pub button_stroke: String,
    pub label_color: String,
    pub selection_stroke: String,
    pub muted_stroke: String,
    pub overlay_stroke: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgRenderOptions {
    /// Root `<svg id>`; also prefixes gradient ids so several trees can share a page.
    pub diagram_id: String,
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub font_family: String,
    pub font_size: f64,
    pub title: String,
    pub show_overlay: bool,
    pub palette: Palette,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl SvgRenderOptions {
    pub fn from_config(render: &RenderConfig) -> Self {
        Self {
            diagram_id: "vamsa-tree".to_string(),
            width: render.width,
            height: render.height,
            margin: render.margin,
            font_family: render.font_family.clone(),
            font_size: render.font_size,
            title: render.title.clone(),
            show_overlay: render.show_overlay,
            palette: Palette {
                node_fill: render.node_fill.clone(),
                node_fill_highlight: render.node_fill_highlight.clone(),
                node_stroke: render.node_stroke.clone(),
                edge_stroke: render.edge_stroke.clone(),
                button_fill: render.button_fill.clone(),
                button_stroke: render.button_stroke.clone(),
                label_color: render.label_color.clone(),
                selection_stroke: render.selection_stroke.clone(),
                muted_stroke: render.muted_stroke.clone(),
                overlay_stroke: render.overlay_stroke.clone(),
            },
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_diagram_id(mut self, id: &str) -> Self {
        self.diagram_id = sanitize_svg_id(id);
        self
    }

    fn text_style(&self, bold: bool) -> TextStyle {
        TextStyle {
            font_family: Some(self.font_family.clone()),
            font_size: self.font_size,
            font_weight: bold.then(|| "bold".to_string()),
        }
    }
}

/// Everything one render pass needs.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub layout: &'a TreeLayout,
    pub members: &'a [Person],
    pub relationships: &'a [Relationship],
    pub selected: Option<&'a str>,
    pub hovered: Option<&'a str>,
}

/// Uniform scale plus translation from layout space into the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Viewport {
    /// Shrinks (never enlarges) the content to fit below the header, centred horizontally.
    pub fn fit(bounds: Option<&Bounds>, width: f64, height: f64, margin: f64) -> Self {
        let Some(b) = bounds else {
            return Self {
                scale: 1.0,
                tx: margin,
                ty: margin + HEADER_HEIGHT,
            };
        };
        let avail_w = (width - 2.0 * margin).max(1.0);
        let avail_h = (height - 2.0 * margin - HEADER_HEIGHT).max(1.0);
        let bw = b.width().max(1.0);
        let bh = b.height().max(1.0);
        let scale = (avail_w / bw).min(avail_h / bh).min(1.0);
        Self {
            scale,
            tx: margin + (avail_w - bw * scale) / 2.0 - b.min_x * scale,
            ty: margin + HEADER_HEIGHT - b.min_y * scale,
        }
    }

    pub fn to_screen(&self, p: LayoutPoint) -> LayoutPoint {
        LayoutPoint::new(p.x * self.scale + self.tx, p.y * self.scale + self.ty)
    }

    pub fn to_layout(&self, x: f64, y: f64) -> LayoutPoint {
        LayoutPoint::new((x - self.tx) / self.scale, (y - self.ty) / self.scale)
    }
}

pub fn render_tree_svg(
    input: &RenderInput<'_>,
    options: &SvgRenderOptions,
    measurer: &dyn TextMeasurer,
) -> String {
    let layout = input.layout;
    let viewport = Viewport::fit(
        layout.bounds.as_ref(),
        options.width,
        options.height,
        options.margin,
    );
    let members: FxHashMap<&str, &Person> = input
        .members
        .iter()
        .rev()
        .map(|p| (p.id.as_str(), p))
        .collect();

    let mut out = String::new();
    open_svg(&mut out, options);
    write_defs(&mut out, options);

    let _ = write!(
        &mut out,
        r#"<g class="tree" transform="translate({},{}) scale({})">"#,
        fmt(viewport.tx),
        fmt(viewport.ty),
        fmt(viewport.scale)
    );

    out.push_str(r#"<g class="links">"#);
    for edge in &layout.edges {
        let _ = write!(
            &mut out,
            r#"<path class="link" data-from="{}" data-to="{}" d="{}" fill="none" stroke="{}" stroke-width="4" stroke-opacity="0.8" stroke-linecap="round"/>"#,
            escape_attr(&edge.from),
            escape_attr(&edge.to),
            curve_path_d(edge),
            escape_attr(&options.palette.edge_stroke)
        );
    }
    out.push_str("</g>");

    if options.show_overlay {
        write_overlay(&mut out, input, options, measurer);
    }

    out.push_str(r#"<g class="nodes">"#);
    for node in &layout.nodes {
        let person = members.get(node.id.as_str()).copied();
        write_node(&mut out, node, person, input, options, measurer);
    }
    out.push_str("</g>");
    out.push_str("</g>");

    write_title_panel(&mut out, input.members.len(), options, measurer);
    if let Some(person) = input.hovered.and_then(|h| members.get(h).copied()) {
        let relation = relation_label(&layout.root, &person.id, input.relationships);
        write_hover_card(&mut out, person, relation, options, measurer);
    }

    out.push_str("</svg>");
    out
}

/// Placeholder document shown while data loads or when there is nothing to draw.
pub fn render_empty_svg(options: &SvgRenderOptions, headline: &str, detail: &str) -> String {
    let mut out = String::new();
    open_svg(&mut out, options);
    let cx = options.width / 2.0;
    let cy = options.height / 2.0;
    let _ = write!(
        &mut out,
        r##"<g class="empty-state"><text x="{}" y="{}" text-anchor="middle" font-size="{}" font-weight="bold" fill="{}">{}</text><text x="{}" y="{}" text-anchor="middle" font-size="{}" fill="#6b7280">{}</text></g>"##,
        fmt(cx),
        fmt(cy),
        fmt(options.font_size * 1.3),
        escape_attr(&options.palette.label_color),
        escape_xml(headline),
        fmt(cx),
        fmt(cy + options.font_size * 1.8),
        fmt(options.font_size),
        escape_xml(detail)
    );
    out.push_str("</svg>");
    out
}

fn open_svg(out: &mut String, options: &SvgRenderOptions) {
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" class="vamsa-tree" width="{}" height="{}" viewBox="0 0 {} {}" role="img" aria-label="{}" font-family="{}">"#,
        escape_attr(&options.diagram_id),
        fmt(options.width),
        fmt(options.height),
        fmt(options.width),
        fmt(options.height),
        escape_attr(&options.title),
        escape_attr(&options.font_family)
    );
}

fn write_defs(out: &mut String, options: &SvgRenderOptions) {
    let id = &options.diagram_id;
    let p = &options.palette;
    let _ = write!(
        out,
        r#"<defs><radialGradient id="{id}-gold" cx="30%" cy="30%" r="70%"><stop offset="0%" stop-color="{}"/><stop offset="100%" stop-color="{}"/></radialGradient><radialGradient id="{id}-green" cx="30%" cy="30%" r="70%"><stop offset="0%" stop-color="{}"/><stop offset="100%" stop-color="{}"/></radialGradient></defs>"#,
        escape_attr(&p.node_fill_highlight),
        escape_attr(&p.node_fill),
        escape_attr(&p.button_fill),
        escape_attr(&p.button_stroke),
        id = escape_attr(id)
    );
}

fn write_node(
    out: &mut String,
    node: &PositionedNode,
    person: Option<&Person>,
    input: &RenderInput<'_>,
    options: &SvgRenderOptions,
    measurer: &dyn TextMeasurer,
) {
    let p = &options.palette;
    let id = escape_attr(&options.diagram_id);
    let r = node.radius();
    let alive = person.is_none_or(|m| m.is_alive);
    let selected = input.selected == Some(node.id.as_str());
    let hovered = input.hovered == Some(node.id.as_str());

    let mut class = String::from("node");
    if !alive {
        class.push_str(" deceased");
    }
    if selected {
        class.push_str(" selected");
    }
    if hovered {
        class.push_str(" hovered");
    }

    let _ = write!(
        out,
        r#"<g class="{class}" id="{id}-node-{}" data-id="{}" data-depth="{}" data-hidden-children="{}" transform="translate({},{})">"#,
        sanitize_svg_id(&node.id),
        escape_attr(&node.id),
        node.depth,
        node.hidden_children,
        fmt(node.x),
        fmt(node.y)
    );

    if let Some(person) = person {
        let mut tooltip = person.full_name();
        if let Some(year) = person.birth_year() {
            let _ = write!(&mut tooltip, "\nBorn: {year}");
        }
        if !person.is_alive {
            tooltip.push_str("\nDeceased");
        }
        let _ = write!(out, "<title>{}</title>", escape_xml(&tooltip));
    }

    let (stroke, dash, opacity) = if alive {
        (p.node_stroke.as_str(), "", "1")
    } else {
        (p.muted_stroke.as_str(), r#" stroke-dasharray="6,3""#, "0.7")
    };
    let node_r = if hovered { r * 8.0 / 7.0 } else { r };
    let _ = write!(
        out,
        r#"<circle class="member" r="{}" fill="url(#{id}-gold)" stroke="{}" stroke-width="3"{dash} opacity="{opacity}"/>"#,
        fmt(node_r),
        escape_attr(stroke)
    );

    if let Some(person) = person {
        let _ = write!(
            out,
            r##"<text class="initials" dy="0.35em" text-anchor="middle" font-size="{}" font-weight="bold" fill="#ffffff" pointer-events="none">{}</text>"##,
            fmt(options.font_size * 1.2),
            escape_xml(&person.initials())
        );
    }

    if let Some((center, br)) = node.toggle_button() {
        let glyph = if node.expanded { "\u{2212}" } else { "+" };
        let _ = write!(
            out,
            r#"<g class="toggle" data-action="{}"><circle cx="{}" cy="{}" r="{}" fill="url(#{id}-green)" stroke="{}" stroke-width="2"/><text x="{}" y="{}" text-anchor="middle" font-size="14" font-weight="bold" fill="{}" pointer-events="none">{glyph}</text></g>"#,
            if node.expanded { "collapse" } else { "expand" },
            fmt(center.x - node.x),
            fmt(center.y - node.y),
            fmt(br),
            escape_attr(&p.button_stroke),
            fmt(center.x - node.x),
            fmt(center.y - node.y + 5.0),
            escape_attr(&p.button_stroke)
        );
    }

    if let Some(person) = person {
        let style = options.text_style(true);
        let name = truncate_to_width(measurer, person.display_name(), &style, r * 2.8);
        let _ = write!(
            out,
            r#"<text class="name" dy="{}" text-anchor="middle" font-size="{}" font-weight="bold" fill="{}" pointer-events="none">{}</text>"#,
            fmt(r + 15.0),
            fmt(options.font_size),
            escape_attr(&p.label_color),
            escape_xml(&name)
        );
        let _ = write!(
            out,
            r#"<text class="glyph" dy="{}" text-anchor="middle" font-size="{}" pointer-events="none">{}</text>"#,
            fmt(r + 30.0),
            fmt(options.font_size - 2.0),
            person.gender_glyph()
        );
    }

    if selected {
        let _ = write!(
            out,
            r#"<circle class="selection" r="{}" fill="none" stroke="{}" stroke-width="3" stroke-dasharray="5,5"/>"#,
            fmt(r * 9.0 / 7.0),
            escape_attr(&p.selection_stroke)
        );
    }
    out.push_str("</g>");
}

/// Non-tree relationships (spouses, cousins, inactive edges) between visible members.
fn write_overlay(
    out: &mut String,
    input: &RenderInput<'_>,
    options: &SvgRenderOptions,
    measurer: &dyn TextMeasurer,
) {
    let p = &options.palette;
    let positions: FxHashMap<&str, &PositionedNode> = input
        .layout
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n))
        .collect();
    let mut drawn: FxHashSet<&str> = FxHashSet::default();
    let style = TextStyle {
        font_size: (options.font_size - 4.0).max(8.0),
        ..options.text_style(false)
    };

    out.push_str(r#"<g class="overlay">"#);
    for rel in input.relationships.iter().filter(|r| !r.is_tree_edge()) {
        if rel.from_member_id == rel.to_member_id || !drawn.insert(rel.id.as_str()) {
            continue;
        }
        let (Some(a), Some(b)) = (
            positions.get(rel.from_member_id.as_str()),
            positions.get(rel.to_member_id.as_str()),
        ) else {
            continue;
        };
        let lift = a.radius().max(b.radius()) * 1.5;
        let curve = Curve {
            id: rel.id.clone(),
            from: a.id.clone(),
            to: b.id.clone(),
            start: LayoutPoint::new(a.x, a.y),
            control1: LayoutPoint::new(a.x, a.y - lift),
            control2: LayoutPoint::new(b.x, b.y - lift),
            end: LayoutPoint::new(b.x, b.y),
        };
        let (stroke, width, dash) = if rel.is_active {
            (p.overlay_stroke.as_str(), "2", "")
        } else {
            (p.muted_stroke.as_str(), "1", r#" stroke-dasharray="4,4""#)
        };
        let label = rel.relationship_type.label();
        let label_w = measurer.measure(label, &style).width + 12.0;
        let mid = curve.point_at(0.5);
        let _ = write!(
            out,
            r##"<g class="relationship{}" data-id="{}" data-type="{}"><path d="{}" fill="none" stroke="{}" stroke-width="{width}"{dash}/><rect x="{}" y="{}" width="{}" height="{}" rx="4" fill="#ffffff" stroke="{}"/><text x="{}" y="{}" text-anchor="middle" font-size="{}" fill="{}">{}</text></g>"##,
            if rel.is_active { "" } else { " inactive" },
            escape_attr(&rel.id),
            rel.relationship_type.as_str(),
            curve_path_d(&curve),
            escape_attr(stroke),
            fmt(mid.x - label_w / 2.0),
            fmt(mid.y - style.font_size * 0.9),
            fmt(label_w),
            fmt(style.font_size * 1.6),
            escape_attr(stroke),
            fmt(mid.x),
            fmt(mid.y + style.font_size * 0.35),
            fmt(style.font_size),
            escape_attr(stroke),
            escape_xml(label)
        );
    }
    out.push_str("</g>");
}

fn write_title_panel(
    out: &mut String,
    member_count: usize,
    options: &SvgRenderOptions,
    measurer: &dyn TextMeasurer,
) {
    let title_style = TextStyle {
        font_size: options.font_size * 1.3,
        ..options.text_style(true)
    };
    let count = if member_count == 1 {
        "1 family member".to_string()
    } else {
        format!("{member_count} family members")
    };
    let w = measurer
        .measure(&options.title, &title_style)
        .width
        .max(measurer.measure(&count, &options.text_style(false)).width)
        + 2.0 * PANEL_PADDING;
    let x = options.margin;
    let y = options.margin;
    let _ = write!(
        out,
        r##"<g class="title-panel"><rect x="{}" y="{}" width="{}" height="{}" rx="12" fill="#ffffff" stroke="#e5e7eb"/><text x="{}" y="{}" font-size="{}" font-weight="bold" fill="{}">{}</text><text x="{}" y="{}" font-size="{}" fill="#4b5563">{}</text></g>"##,
        fmt(x),
        fmt(y),
        fmt(w),
        fmt(HEADER_HEIGHT - options.margin / 2.0),
        fmt(x + PANEL_PADDING),
        fmt(y + PANEL_PADDING + title_style.font_size),
        fmt(title_style.font_size),
        escape_attr(&options.palette.label_color),
        escape_xml(&options.title),
        fmt(x + PANEL_PADDING),
        fmt(y + PANEL_PADDING + title_style.font_size + options.font_size * 1.4),
        fmt(options.font_size),
        escape_xml(&count)
    );
}

fn write_hover_card(
    out: &mut String,
    person: &Person,
    relation: &str,
    options: &SvgRenderOptions,
    measurer: &dyn TextMeasurer,
) {
    let name = person.full_name();
    let name_style = options.text_style(true);
    let w = measurer
        .measure(&name, &name_style)
        .width
        .max(measurer.measure(relation, &options.text_style(false)).width)
        + 2.0 * PANEL_PADDING;
    let h = options.font_size * 2.8 + 2.0 * PANEL_PADDING;
    let x = (options.width - options.margin - w).max(0.0);
    let y = options.margin;
    let _ = write!(
        out,
        r##"<g class="hover-card" data-id="{}"><rect x="{}" y="{}" width="{}" height="{}" rx="12" fill="#ffffff" stroke="#e5e7eb"/><text x="{}" y="{}" font-size="{}" font-weight="bold" fill="{}">{}</text><text x="{}" y="{}" font-size="{}" fill="#4b5563">{}</text></g>"##,
        escape_attr(&person.id),
        fmt(x),
        fmt(y),
        fmt(w),
        fmt(h),
        fmt(x + PANEL_PADDING),
        fmt(y + PANEL_PADDING + options.font_size),
        fmt(options.font_size),
        escape_attr(&options.palette.label_color),
        escape_xml(&name),
        fmt(x + PANEL_PADDING),
        fmt(y + PANEL_PADDING + options.font_size * 2.4),
        fmt(options.font_size * 0.9),
        escape_xml(relation)
    );
}

/// Label of the first active relationship from the root to `id`, else a generic one.
pub fn relation_label<'a>(root: &str, id: &str, relationships: &'a [Relationship]) -> &'a str {
    relationships
        .iter()
        .find(|r| r.is_active && r.from_member_id == root && r.to_member_id == id)
        .map(|r| r.relationship_type.label())
        .unwrap_or("Family Member")
}

pub(crate) fn curve_path_d(c: &Curve) -> String {
    let mut d = String::new();
    let _ = write!(
        &mut d,
        "M{},{}C{},{},{},{},{},{}",
        fmt_path(c.start.x),
        fmt_path(c.start.y),
        fmt_path(c.control1.x),
        fmt_path(c.control1.y),
        fmt_path(c.control2.x),
        fmt_path(c.control2.y),
        fmt_path(c.end.x),
        fmt_path(c.end.y)
    );
    d
}

/// Converts an arbitrary string into a conservative SVG `id` token.
///
/// Unsupported characters become `-`, and ids that do not start with an ASCII letter get a `v-`
/// prefix.
pub fn sanitize_svg_id(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "v-untitled".to_string();
    }

    let mut out = String::with_capacity(raw.len() + 4);
    for ch in raw.chars() {
        let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.';
        out.push(if ok { ch } else { '-' });
    }

    let starts_ok = out.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_ok {
        out.insert_str(0, "v-");
    }

    while out.contains("--") {
        out = out.replace("--", "-");
    }
    let out = out.trim_matches('-');
    if out.is_empty() || out == "v" {
        return "v-untitled".to_string();
    }
    out.to_string()
}

fn fmt(v: f64) -> String {
    // Round-trippable decimal form without `-0` or tiny float noise.
    if !v.is_finite() {
        return "0".to_string();
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    let s = v.to_string();
    if s == "-0" { "0".to_string() } else { s }
}

fn fmt_path(v: f64) -> String {
    // Path data keeps at most 3 fractional digits.
    if !v.is_finite() {
        return "0".to_string();
    }
    if v.abs() < 0.0005 {
        return "0".to_string();
    }

    let scaled = v * 1000.0;
    let mut r = (scaled + 0.5).floor() / 1000.0;
    if r.abs() < 0.0005 {
        r = 0.0;
    }

    let mut s = format!("{r:.3}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" { "0".to_string() } else { s }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    escape_xml(text)
}

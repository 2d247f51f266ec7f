use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

impl LayoutPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// A visible member with its centre position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedNode {
    pub id: String,
    pub parent: Option<String>,
    pub x: f64,
    pub y: f64,
    pub depth: usize,
    pub width: f64,
    pub height: f64,
    /// The member has children in the logical tree, shown or not.
    pub has_children: bool,
    pub expanded: bool,
    /// Children hidden because this node is collapsed.
    pub hidden_children: usize,
}

impl PositionedNode {
    pub fn radius(&self) -> f64 {
        self.width.min(self.height) / 2.0
    }

    /// Bottom-centre of the node shape; edges to children start here.
    pub fn bottom_anchor(&self) -> LayoutPoint {
        LayoutPoint::new(self.x, self.y + self.height / 2.0)
    }

    /// Top-centre of the node shape; the edge from the parent ends here.
    pub fn top_anchor(&self) -> LayoutPoint {
        LayoutPoint::new(self.x, self.y - self.height / 2.0)
    }

    /// Centre and radius of the expand/collapse button, for nodes that have children.
    pub fn toggle_button(&self) -> Option<(LayoutPoint, f64)> {
        if !self.has_children {
            return None;
        }
        let r = self.radius();
        Some((
            LayoutPoint::new(self.x + r * TOGGLE_OFFSET, self.y - r * TOGGLE_OFFSET),
            r * TOGGLE_RADIUS,
        ))
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        LayoutPoint::new(self.x, self.y).distance_to(x, y) <= self.radius()
    }
}

// A 35px node carries a 15px button centred 25px right and up.
const TOGGLE_OFFSET: f64 = 25.0 / 35.0;
const TOGGLE_RADIUS: f64 = 15.0 / 35.0;

/// Cubic Bézier from a parent's bottom anchor to a child's top anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub id: String,
    pub from: String,
    pub to: String,
    pub start: LayoutPoint,
    pub control1: LayoutPoint,
    pub control2: LayoutPoint,
    pub end: LayoutPoint,
}

impl Curve {
    /// Vertical link: both control points sit on the horizontal line halfway between the anchors.
    pub fn vertical(from: &PositionedNode, to: &PositionedNode) -> Self {
        let start = from.bottom_anchor();
        let end = to.top_anchor();
        let mid_y = (start.y + end.y) / 2.0;
        Self {
            id: format!("{}->{}", from.id, to.id),
            from: from.id.clone(),
            to: to.id.clone(),
            start,
            control1: LayoutPoint::new(start.x, mid_y),
            control2: LayoutPoint::new(end.x, mid_y),
            end,
        }
    }

    /// Point on the curve at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> LayoutPoint {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        LayoutPoint::new(
            b0 * self.start.x + b1 * self.control1.x + b2 * self.control2.x + b3 * self.end.x,
            b0 * self.start.y + b1 * self.control1.y + b2 * self.control2.y + b3 * self.end.y,
        )
    }

    pub fn path_d(&self) -> String {
        crate::svg::curve_path_d(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeLayout {
    pub root: String,
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<Curve>,
    pub bounds: Option<Bounds>,
}

impl TreeLayout {
    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Topmost node whose shape contains the point.
    pub fn node_at(&self, x: f64, y: f64) -> Option<&PositionedNode> {
        self.nodes.iter().rev().find(|n| n.contains(x, y))
    }

    /// Node whose expand/collapse button contains the point.
    pub fn toggle_at(&self, x: f64, y: f64) -> Option<&PositionedNode> {
        self.nodes.iter().rev().find(|n| {
            n.toggle_button()
                .is_some_and(|(c, r)| c.distance_to(x, y) <= r)
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }
}

pub(crate) fn compute_bounds(nodes: &[PositionedNode], edges: &[Curve]) -> Option<Bounds> {
    let mut pts: Vec<(f64, f64)> = Vec::new();
    for n in nodes {
        pts.push((n.x - n.width / 2.0, n.y - n.height / 2.0));
        pts.push((n.x + n.width / 2.0, n.y + n.height / 2.0));
        if let Some((c, r)) = n.toggle_button() {
            pts.push((c.x - r, c.y - r));
            pts.push((c.x + r, c.y + r));
        }
    }
    for e in edges {
        for p in [&e.start, &e.control1, &e.control2, &e.end] {
            pts.push((p.x, p.y));
        }
    }
    Bounds::from_points(pts)
}

//! Event-driven wrapper around build → layout → render.
//!
//! `TreeView` owns the member and relationship snapshots together with the expansion, hover and
//! selection state. Every event that can change the tree rebuilds it from scratch before
//! returning; hover only touches hover state.

use std::path::Path;

use vamsa_core::{
    BuildOptions, ExpansionState, FamilyDataset, FamilyTree, Person, Relationship, VamsaConfig,
    build_tree_with,
};

use crate::layout::layout_tree;
use crate::model::TreeLayout;
use crate::svg::{RenderInput, SvgRenderOptions, Viewport, render_empty_svg, render_tree_svg};
use crate::text::DeterministicTextMeasurer;
use crate::{Error, LayoutOptions, Result};

/// Callbacks into the embedding application. Every method defaults to a no-op.
pub trait TreeHost {
    fn on_node_click(&mut self, _member: &Person) {}
    fn on_hover_changed(&mut self, _hovered: Option<&str>) {}
    fn on_layout_changed(&mut self, _layout: &TreeLayout) {}
}

impl TreeHost for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Members or relationships have not arrived yet.
    Loading,
    /// Both lists arrived but there are no members.
    Empty,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Container {
    pub width: f64,
    pub height: f64,
}

/// What a pointer event landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    Toggle(String),
    Node(String),
}

#[derive(Debug, Clone)]
pub struct TreeView {
    config: VamsaConfig,
    layout_options: LayoutOptions,
    container: Container,
    diagram_id: Option<String>,
    members: Option<Vec<Person>>,
    relationships: Option<Vec<Relationship>>,
    expansion: ExpansionState,
    hovered: Option<String>,
    selected: Option<String>,
    tree: Option<FamilyTree>,
    layout: Option<TreeLayout>,
    builds: usize,
    measurer: DeterministicTextMeasurer,
}

impl Default for TreeView {
    fn default() -> Self {
        let config = VamsaConfig::default();
        Self {
            container: Container {
                width: config.render.width,
                height: config.render.height,
            },
            config,
            layout_options: LayoutOptions::default(),
            diagram_id: None,
            members: None,
            relationships: None,
            expansion: ExpansionState::new(),
            hovered: None,
            selected: None,
            tree: None,
            layout: None,
            builds: 0,
            measurer: DeterministicTextMeasurer::default(),
        }
    }
}

impl TreeView {
    pub fn new(config: VamsaConfig) -> Result<Self> {
        let layout_options = LayoutOptions::from_config(&config.layout, &config.render)?;
        Ok(Self {
            container: Container {
                width: config.render.width,
                height: config.render.height,
            },
            config,
            layout_options,
            ..Self::default()
        })
    }

    /// Id of the root `<svg>` element; node and gradient ids are prefixed with it.
    pub fn set_diagram_id(&mut self, id: impl Into<String>) {
        self.diagram_id = Some(id.into());
    }

    /// Loads both snapshots from a JSON or YAML dataset file.
    pub fn load_dataset(&mut self, path: impl AsRef<Path>, host: &mut dyn TreeHost) -> Result<()> {
        let dataset = FamilyDataset::from_path(path)?;
        self.members = Some(dataset.members);
        self.set_relationships(dataset.relationships, host);
        Ok(())
    }

    pub fn set_members(&mut self, members: Vec<Person>, host: &mut dyn TreeHost) {
        self.members = Some(members);
        self.rebuild(host);
    }

    pub fn set_relationships(&mut self, relationships: Vec<Relationship>, host: &mut dyn TreeHost) {
        self.relationships = Some(relationships);
        self.rebuild(host);
    }

    /// Selects the member and forwards it to the host. Unknown ids are ignored.
    pub fn on_node_click(&mut self, id: &str, host: &mut dyn TreeHost) {
        let Some(person) = self.member(id) else {
            tracing::debug!(member = %id, "click on unknown member ignored");
            return;
        };
        host.on_node_click(person);
        self.selected = Some(id.to_string());
    }

    pub fn on_toggle_expand(&mut self, id: &str, host: &mut dyn TreeHost) {
        self.expansion = self.expansion.toggle(id);
        tracing::debug!(member = %id, expanded = self.expansion.contains(id), "toggled");
        self.rebuild(host);
    }

    pub fn on_node_hover(&mut self, id: Option<&str>, host: &mut dyn TreeHost) {
        let id = id.filter(|id| self.member(id).is_some());
        if self.hovered.as_deref() == id {
            return;
        }
        self.hovered = id.map(str::to_string);
        host.on_hover_changed(id);
    }

    pub fn collapse_all(&mut self, host: &mut dyn TreeHost) {
        self.expansion = ExpansionState::collapse_all();
        self.rebuild(host);
    }

    /// Expands every known member, whether or not it is currently reachable.
    pub fn expand_all(&mut self, host: &mut dyn TreeHost) {
        let ids = self.members.iter().flatten().map(|p| p.id.as_str());
        self.expansion = ExpansionState::expand_all(ids);
        self.rebuild(host);
    }

    pub fn set_expansion(&mut self, expansion: ExpansionState, host: &mut dyn TreeHost) {
        self.expansion = expansion;
        self.rebuild(host);
    }

    /// Changes the render container. Fit sizing lays the tree out again.
    ///
    /// Both dimensions must be positive and finite; otherwise nothing changes.
    pub fn resize(&mut self, container: Container, host: &mut dyn TreeHost) -> Result<()> {
        let dims = [
            ("container width", container.width),
            ("container height", container.height),
        ];
        for (name, v) in dims {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::InvalidOptions {
                    message: format!("{name} must be a positive number (got {v})"),
                });
            }
        }
        self.container = container;
        self.config.render.width = container.width;
        self.config.render.height = container.height;
        self.layout_options = LayoutOptions::from_config(&self.config.layout, &self.config.render)?;
        self.relayout(host);
        Ok(())
    }

    /// Routes a click in container coordinates. Toggle buttons win over the node under them.
    pub fn pointer_click(&mut self, x: f64, y: f64, host: &mut dyn TreeHost) -> Option<PointerTarget> {
        let target = self.hit_test(x, y)?;
        match &target {
            PointerTarget::Toggle(id) => self.on_toggle_expand(id, host),
            PointerTarget::Node(id) => self.on_node_click(id, host),
        }
        Some(target)
    }

    /// Routes pointer movement to hover state. Toggle buttons count as their node.
    pub fn pointer_move(&mut self, x: f64, y: f64, host: &mut dyn TreeHost) {
        let id = match self.hit_test(x, y) {
            Some(PointerTarget::Toggle(id) | PointerTarget::Node(id)) => Some(id),
            None => None,
        };
        self.on_node_hover(id.as_deref(), host);
    }

    pub fn hit_test(&self, x: f64, y: f64) -> Option<PointerTarget> {
        let layout = self.layout.as_ref()?;
        let p = self.viewport().to_layout(x, y);
        if let Some(n) = layout.toggle_at(p.x, p.y) {
            return Some(PointerTarget::Toggle(n.id.clone()));
        }
        layout
            .node_at(p.x, p.y)
            .map(|n| PointerTarget::Node(n.id.clone()))
    }

    /// Renders the current state into the current container.
    pub fn render_svg(&self) -> String {
        let mut options = SvgRenderOptions::from_config(&self.config.render)
            .with_size(self.container.width, self.container.height);
        if let Some(id) = &self.diagram_id {
            options = options.with_diagram_id(id);
        }
        match (self.state(), self.layout.as_ref()) {
            (ViewState::Ready, Some(layout)) => {
                let input = RenderInput {
                    layout,
                    members: self.members.as_deref().unwrap_or_default(),
                    relationships: self.relationships.as_deref().unwrap_or_default(),
                    selected: self.selected.as_deref(),
                    hovered: self.hovered.as_deref(),
                };
                render_tree_svg(&input, &options, &self.measurer)
            }
            (ViewState::Empty, _) => render_empty_svg(
                &options,
                "No family members",
                "Add members to start your family tree",
            ),
            _ => render_empty_svg(
                &options,
                "Building your family tree...",
                "Connecting generations with love",
            ),
        }
    }

    pub fn state(&self) -> ViewState {
        match (&self.members, &self.relationships) {
            (Some(members), Some(_)) if members.is_empty() => ViewState::Empty,
            (Some(_), Some(_)) if self.layout.is_some() => ViewState::Ready,
            (Some(_), Some(_)) => ViewState::Empty,
            _ => ViewState::Loading,
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::fit(
            self.layout.as_ref().and_then(|l| l.bounds.as_ref()),
            self.container.width,
            self.container.height,
            self.config.render.margin,
        )
    }

    pub fn config(&self) -> &VamsaConfig {
        &self.config
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn tree(&self) -> Option<&FamilyTree> {
        self.tree.as_ref()
    }

    pub fn layout(&self) -> Option<&TreeLayout> {
        self.layout.as_ref()
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn members(&self) -> &[Person] {
        self.members.as_deref().unwrap_or_default()
    }

    pub fn relationships(&self) -> &[Relationship] {
        self.relationships.as_deref().unwrap_or_default()
    }

    /// Number of tree builds so far.
    pub fn build_count(&self) -> usize {
        self.builds
    }

    fn member(&self, id: &str) -> Option<&Person> {
        self.members.iter().flatten().find(|p| p.id == id)
    }

    fn rebuild(&mut self, host: &mut dyn TreeHost) {
        let (Some(members), Some(relationships)) = (&self.members, &self.relationships) else {
            return;
        };
        let options = BuildOptions::default().with_root_policy(self.config.tree.root_policy.clone());
        self.tree = build_tree_with(members, relationships, &self.expansion, &options);
        self.builds += 1;

        if self.selected.as_deref().is_some_and(|id| self.member(id).is_none()) {
            self.selected = None;
        }
        if self.hovered.as_deref().is_some_and(|id| self.member(id).is_none()) {
            self.hovered = None;
            host.on_hover_changed(None);
        }
        self.relayout(host);
    }

    fn relayout(&mut self, host: &mut dyn TreeHost) {
        self.layout = self
            .tree
            .as_ref()
            .map(|tree| layout_tree(tree, &self.layout_options));
        if let Some(layout) = &self.layout {
            tracing::debug!(
                nodes = layout.nodes.len(),
                edges = layout.edges.len(),
                "layout updated"
            );
            host.on_layout_changed(layout);
        }
    }
}

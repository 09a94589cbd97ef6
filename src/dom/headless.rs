/// In-memory document with a minimal layout resolver.
///
/// Layout only covers what an image map needs: widths from the viewport
/// down through `px`, `%`, `fit-content` and `max-width`, intrinsic image
/// sizes, and aspect-preserving image heights. Absolutely positioned
/// elements are taken out of flow and never affect their parent's size.
use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::dom::traits::Document;
use crate::dom::types::{ElementId, Size};
use crate::errors::{MapError, MapResult};

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    class_name: String,
    src: Option<String>,
    styles: BTreeMap<String, String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    natural: Option<Size>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            class_name: String::new(),
            src: None,
            styles: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            natural: None,
        }
    }

    fn is_image(&self) -> bool {
        self.tag == "img"
    }

    fn is_out_of_flow(&self) -> bool {
        matches!(
            self.styles.get("position").map(String::as_str),
            Some("absolute") | Some("fixed")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Length {
    Px(f64),
    Percent(f64),
    FitContent,
    Auto,
}

fn length_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(-?(?:\d+(?:\.\d*)?|\.\d+))\s*(px|%)?\s*$").ok())
        .as_ref()
}

/// Parse a CSS length. Unitless numbers are accepted as pixels; anything
/// unrecognised behaves like `auto`, the way an engine drops invalid values.
fn parse_length(value: Option<&str>) -> Length {
    let Some(value) = value else { return Length::Auto };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("fit-content") {
        return Length::FitContent;
    }
    let Some(caps) = length_re().and_then(|re| re.captures(trimmed)) else {
        return Length::Auto;
    };
    let Ok(number) = caps[1].parse::<f64>() else {
        return Length::Auto;
    };
    match caps.get(2).map(|m| m.as_str()) {
        Some("%") => Length::Percent(number),
        _ => Length::Px(number),
    }
}

pub struct HeadlessDocument {
    nodes: Vec<Node>,
    body: ElementId,
    viewport: Size,
}

impl HeadlessDocument {
    pub fn new(viewport: Size) -> Self {
        Self {
            nodes: vec![Node::new("body")],
            body: ElementId(0),
            viewport,
        }
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Resize the viewport. Layout reads pick the new size up immediately;
    /// notifying listeners is the caller's job.
    pub fn set_viewport(&mut self, viewport: Size) {
        tracing::debug!(width = viewport.width, height = viewport.height, "viewport resized");
        self.viewport = viewport;
    }

    pub fn tag(&self, el: ElementId) -> Option<&str> {
        self.nodes.get(el.0).map(|n| n.tag.as_str())
    }

    pub fn class_name(&self, el: ElementId) -> Option<&str> {
        self.nodes.get(el.0).map(|n| n.class_name.as_str())
    }

    pub fn src(&self, el: ElementId) -> Option<&str> {
        self.nodes.get(el.0).and_then(|n| n.src.as_deref())
    }

    /// Whether `el` is reachable from the body.
    pub fn is_connected(&self, el: ElementId) -> bool {
        let mut current = Some(el);
        while let Some(id) = current {
            if id == self.body {
                return true;
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    fn node(&self, el: ElementId) -> MapResult<&Node> {
        self.nodes
            .get(el.0)
            .ok_or_else(|| MapError::Dom(format!("unknown element {el}")))
    }

    fn node_mut(&mut self, el: ElementId) -> MapResult<&mut Node> {
        self.nodes
            .get_mut(el.0)
            .ok_or_else(|| MapError::Dom(format!("unknown element {el}")))
    }

    fn is_ancestor_or_self(&self, candidate: ElementId, of: ElementId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    fn detach_from_parent(&mut self, child: ElementId) -> MapResult<()> {
        if let Some(old_parent) = self.node(child)?.parent {
            self.node_mut(old_parent)?.children.retain(|c| *c != child);
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    // ── Layout ──────────────────────────────────────────────────────────────

    fn used_width(&self, el: ElementId) -> f64 {
        if el == self.body {
            return self.viewport.width;
        }
        let Some(node) = self.nodes.get(el.0) else { return 0.0 };
        let available = node.parent.map(|p| self.used_width(p)).unwrap_or(0.0);

        let width = match parse_length(node.styles.get("width").map(String::as_str)) {
            Length::Px(px) => px,
            Length::Percent(pct) => available * pct / 100.0,
            Length::FitContent => self.max_content_width(el).min(available),
            Length::Auto if node.is_image() => self.max_content_width(el).min(available),
            Length::Auto if node.is_out_of_flow() => self.max_content_width(el),
            Length::Auto => available,
        };

        let width = match parse_length(node.styles.get("max-width").map(String::as_str)) {
            Length::Px(px) => width.min(px),
            Length::Percent(pct) => width.min(available * pct / 100.0),
            _ => width,
        };
        width.max(0.0)
    }

    /// Width the element would take with unlimited room.
    fn max_content_width(&self, el: ElementId) -> f64 {
        let Some(node) = self.nodes.get(el.0) else { return 0.0 };
        if node.is_image() {
            return node.natural.map(|s| s.width).unwrap_or(0.0);
        }
        node.children
            .iter()
            .filter_map(|c| self.nodes.get(c.0).map(|n| (*c, n)))
            .filter(|(_, n)| !n.is_out_of_flow())
            .map(|(c, n)| match parse_length(n.styles.get("width").map(String::as_str)) {
                Length::Px(px) => px,
                _ => self.max_content_width(c),
            })
            .fold(0.0, f64::max)
    }

    fn used_height(&self, el: ElementId) -> f64 {
        if el == self.body {
            return self.viewport.height;
        }
        let Some(node) = self.nodes.get(el.0) else { return 0.0 };
        let explicit_parent_height = node.parent.and_then(|p| {
            let parent = self.nodes.get(p.0)?;
            match parse_length(parent.styles.get("height").map(String::as_str)) {
                Length::Px(px) => Some(px),
                _ => None,
            }
        });

        match parse_length(node.styles.get("height").map(String::as_str)) {
            Length::Px(px) => px,
            // Percentages only resolve against a definite parent height.
            Length::Percent(pct) if explicit_parent_height.is_some() => {
                explicit_parent_height.unwrap_or(0.0) * pct / 100.0
            }
            _ if node.is_image() => match node.natural {
                Some(natural) if natural.width > 0.0 => {
                    self.used_width(el) * natural.height / natural.width
                }
                _ => 0.0,
            },
            _ => node
                .children
                .iter()
                .filter(|c| self.nodes.get(c.0).is_some_and(|n| !n.is_out_of_flow()))
                .map(|c| self.used_height(*c))
                .fold(0.0, f64::max),
        }
    }
}

impl Document for HeadlessDocument {
    fn body(&self) -> ElementId {
        self.body
    }

    fn create_element(&mut self, tag: &str) -> ElementId {
        self.nodes.push(Node::new(tag));
        ElementId(self.nodes.len() - 1)
    }

    fn set_style(&mut self, el: ElementId, property: &str, value: &str) -> MapResult<()> {
        self.node_mut(el)?
            .styles
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn style(&self, el: ElementId, property: &str) -> Option<String> {
        self.nodes.get(el.0)?.styles.get(property).cloned()
    }

    fn set_class_name(&mut self, el: ElementId, class_name: &str) -> MapResult<()> {
        self.node_mut(el)?.class_name = class_name.to_string();
        Ok(())
    }

    fn set_src(&mut self, el: ElementId, url: &str) -> MapResult<()> {
        let node = self.node_mut(el)?;
        node.src = Some(url.to_string());
        // A new source invalidates the previous intrinsic size.
        node.natural = None;
        Ok(())
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) -> MapResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(MapError::Dom(format!(
                "cannot append {child} into its own subtree at {parent}"
            )));
        }
        self.detach_from_parent(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn remove_child(&mut self, parent: ElementId, child: ElementId) -> MapResult<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(MapError::Dom(format!("{child} is not a child of {parent}")));
        }
        self.detach_from_parent(child)
    }

    fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.nodes.get(el.0).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.nodes.get(el.0).and_then(|n| n.parent)
    }

    fn resolve_image(&mut self, el: ElementId, natural: Size) -> MapResult<()> {
        let node = self.node_mut(el)?;
        if !node.is_image() {
            return Err(MapError::Dom(format!("{el} is a <{}>, not an image", node.tag)));
        }
        node.natural = Some(natural);
        Ok(())
    }

    fn natural_size(&self, el: ElementId) -> Option<Size> {
        self.nodes.get(el.0).and_then(|n| n.natural)
    }

    fn rendered_size(&self, el: ElementId) -> Size {
        if !self.is_connected(el) {
            return Size::default();
        }
        Size::new(self.used_width(el), self.used_height(el))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(width: f64) -> (HeadlessDocument, ElementId) {
        let mut doc = HeadlessDocument::new(Size::new(width, 800.0));
        let container = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, container).unwrap();
        (doc, container)
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length(Some("1000px")), Length::Px(1000.0));
        assert_eq!(parse_length(Some("100%")), Length::Percent(100.0));
        assert_eq!(parse_length(Some("0")), Length::Px(0.0));
        assert_eq!(parse_length(Some(" 12.5px ")), Length::Px(12.5));
        assert_eq!(parse_length(Some("fit-content")), Length::FitContent);
        assert_eq!(parse_length(Some("calc(1px + 2px)")), Length::Auto);
        assert_eq!(parse_length(None), Length::Auto);
    }

    #[test]
    fn test_image_shrinks_to_container() {
        let (mut doc, container) = page(500.0);
        let img = doc.create_element("img");
        doc.append_child(container, img).unwrap();
        doc.resolve_image(img, Size::new(1000.0, 600.0)).unwrap();

        let size = doc.rendered_size(img);
        assert_eq!(size.width, 500.0);
        assert_eq!(size.height, 300.0);
    }

    #[test]
    fn test_fit_content_wrapper_respects_max_width() {
        let (mut doc, container) = page(1920.0);
        let wrapper = doc.create_element("div");
        doc.set_style(wrapper, "width", "fit-content").unwrap();
        doc.set_style(wrapper, "max-width", "1000px").unwrap();
        let img = doc.create_element("img");
        doc.set_style(img, "width", "100%").unwrap();
        doc.append_child(wrapper, img).unwrap();
        doc.append_child(container, wrapper).unwrap();
        doc.resolve_image(img, Size::new(1600.0, 800.0)).unwrap();

        assert_eq!(doc.rendered_size(wrapper).width, 1000.0);
        assert_eq!(doc.rendered_size(img).width, 1000.0);
        assert_eq!(doc.rendered_size(img).height, 500.0);
    }

    #[test]
    fn test_absolute_children_do_not_widen_parent() {
        let (mut doc, container) = page(1920.0);
        let wrapper = doc.create_element("div");
        doc.set_style(wrapper, "width", "fit-content").unwrap();
        let img = doc.create_element("img");
        let pin = doc.create_element("div");
        doc.set_style(pin, "position", "absolute").unwrap();
        doc.set_style(pin, "width", "5000px").unwrap();
        doc.append_child(wrapper, img).unwrap();
        doc.append_child(wrapper, pin).unwrap();
        doc.append_child(container, wrapper).unwrap();
        doc.resolve_image(img, Size::new(300.0, 200.0)).unwrap();

        assert_eq!(doc.rendered_size(wrapper).width, 300.0);
    }

    #[test]
    fn test_detached_elements_have_no_layout() {
        let (mut doc, _container) = page(800.0);
        let img = doc.create_element("img");
        doc.resolve_image(img, Size::new(300.0, 200.0)).unwrap();

        assert_eq!(doc.rendered_size(img), Size::default());
        assert_eq!(doc.natural_size(img), Some(Size::new(300.0, 200.0)));
    }

    #[test]
    fn test_append_moves_between_parents() {
        let (mut doc, container) = page(800.0);
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(container, a).unwrap();
        doc.append_child(container, b).unwrap();

        doc.append_child(a, child).unwrap();
        doc.append_child(b, child).unwrap();

        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), vec![child]);
        assert_eq!(doc.parent(child), Some(b));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let (mut doc, container) = page(800.0);
        let inner = doc.create_element("div");
        doc.append_child(container, inner).unwrap();

        assert!(matches!(doc.append_child(inner, container), Err(MapError::Dom(_))));
        assert!(matches!(doc.append_child(inner, inner), Err(MapError::Dom(_))));
    }

    #[test]
    fn test_remove_child_requires_parent() {
        let (mut doc, container) = page(800.0);
        let stray = doc.create_element("div");
        assert!(doc.remove_child(container, stray).is_err());

        doc.append_child(container, stray).unwrap();
        doc.remove_child(container, stray).unwrap();
        assert!(!doc.is_connected(stray));
    }

    #[test]
    fn test_new_src_clears_natural_size() {
        let (mut doc, _) = page(800.0);
        let img = doc.create_element("img");
        doc.resolve_image(img, Size::new(10.0, 10.0)).unwrap();
        doc.set_src(img, "other.png").unwrap();
        assert_eq!(doc.natural_size(img), None);
        assert_eq!(doc.src(img), Some("other.png"));
    }

    #[test]
    fn test_resolve_image_rejects_non_images() {
        let (mut doc, container) = page(800.0);
        assert!(doc.resolve_image(container, Size::new(1.0, 1.0)).is_err());
    }
}

use scraper::ElementRef;

/// Upper bound on ancestor hops for sibling-based heuristics on malformed markup.
pub const MAX_ASCENT_DEPTH: usize = 32;

/// Minimal element view used by the naming heuristics.
pub trait TreeNode: Sized + Clone {
    fn tag_name(&self) -> &str;
    /// Nearest preceding sibling that is an element.
    fn previous_sibling(&self) -> Option<Self>;
    /// Parent element, `None` at the document root.
    fn parent(&self) -> Option<Self>;
    /// Generic block wrapper without meaning of its own.
    fn is_grouping_container(&self) -> bool {
        self.tag_name().eq_ignore_ascii_case("div")
    }
    /// Text of the node and its descendants, whitespace collapsed.
    fn text_content(&self) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct HtmlNode<'a>(ElementRef<'a>);

impl<'a> HtmlNode<'a> {
    pub fn new(element: ElementRef<'a>) -> Self {
        Self(element)
    }

    pub fn element(&self) -> ElementRef<'a> {
        self.0
    }
}

impl<'a> TreeNode for HtmlNode<'a> {
    fn tag_name(&self) -> &str {
        self.0.value().name()
    }

    fn previous_sibling(&self) -> Option<Self> {
        self.0.prev_siblings().find_map(ElementRef::wrap).map(HtmlNode)
    }

    fn parent(&self) -> Option<Self> {
        self.0.parent().and_then(ElementRef::wrap).map(HtmlNode)
    }

    fn text_content(&self) -> String {
        collapse_whitespace(self.0.text())
    }
}

pub(crate) fn collapse_whitespace<'t>(parts: impl Iterator<Item = &'t str>) -> String {
    let joined: String = parts.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

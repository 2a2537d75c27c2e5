use std::collections::HashSet;

use ego_tree::NodeId;
use engine_logging::{engine_debug, engine_info};
use muncher_core::{
    ContentUnit, ConversionSession, DocType, FolderKind, ImageFinderEntry, JournalContent,
    JournalRecord, SceneRecord,
};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::dom::{collapse_whitespace, HtmlNode, TreeNode, MAX_ASCENT_DEPTH};
use crate::table::CONTENT_CHUNK_ATTR;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "avif"];
const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct SceneReference {
    content_chunk_id: String,
    image: String,
    name: Option<String>,
}

/// Finds scene references in a content unit and records scene/journal pairs.
///
/// A reference is either a chunk-id link to a map image (the player map link), or a
/// `<figure>` whose caption mentions a map and which holds an image. A figure that
/// already contains a player map link is covered by that link.
#[derive(Debug, Default, Clone, Copy)]
pub struct SceneDetector;

impl SceneDetector {
    /// Returns the number of scenes added; repeated references add nothing.
    pub fn detect(session: &mut ConversionSession, unit: &ContentUnit, document: &Html) -> usize {
        let references = find_references(document);
        if references.is_empty() {
            engine_debug!("No scene references in {}", unit.content_chunk_id);
        }
        references
            .into_iter()
            .filter(|reference| record_reference(session, unit, reference))
            .count()
    }
}

fn find_references(document: &Html) -> Vec<SceneReference> {
    let mut references = Vec::new();
    let mut seen_chunks = HashSet::new();
    let mut covered_figures: HashSet<NodeId> = HashSet::new();

    if let Ok(links) = Selector::parse("a[href][data-content-chunk-id]") {
        for link in document.select(&links) {
            let href = link.value().attr("href");
            let chunk = link.value().attr(CONTENT_CHUNK_ATTR);
            let (Some(href), Some(chunk)) = (href, chunk) else {
                continue;
            };
            if !is_image_reference(href) {
                continue;
            }
            let figure = enclosing_figure(link);
            if let Some(figure) = figure {
                covered_figures.insert(figure.id());
            }
            if !seen_chunks.insert(chunk.to_string()) {
                continue;
            }
            references.push(SceneReference {
                content_chunk_id: chunk.to_string(),
                image: href.trim().to_string(),
                name: figure
                    .and_then(caption_text)
                    .or_else(|| preceding_heading(link)),
            });
        }
    }

    let (Ok(figures), Ok(images)) = (Selector::parse("figure"), Selector::parse("img[src]")) else {
        return references;
    };
    for figure in document.select(&figures) {
        if covered_figures.contains(&figure.id()) {
            continue;
        }
        let Some(caption) = caption_text(figure) else {
            continue;
        };
        if !mentions_map(&caption) {
            continue;
        }
        let Some(image) = figure.select(&images).next() else {
            continue;
        };
        let chunk = figure
            .value()
            .attr(CONTENT_CHUNK_ATTR)
            .or_else(|| image.value().attr(CONTENT_CHUNK_ATTR));
        let Some(chunk) = chunk else {
            engine_debug!("Map figure \"{}\" has no content chunk id", caption);
            continue;
        };
        if !seen_chunks.insert(chunk.to_string()) {
            continue;
        }
        references.push(SceneReference {
            content_chunk_id: chunk.to_string(),
            image: image.value().attr("src").unwrap_or_default().trim().to_string(),
            name: Some(caption),
        });
    }

    references
}

fn record_reference(
    session: &mut ConversionSession,
    unit: &ContentUnit,
    reference: &SceneReference,
) -> bool {
    let chunk = reference.content_chunk_id.as_str();
    if session.has_scene(chunk, unit.id) {
        engine_debug!("Scene {} for {} already recorded", chunk, unit.id);
        return false;
    }

    let enhancement = session.enhancements().detected_scene_enhancement(chunk).cloned();
    let name = enhancement
        .as_ref()
        .map(|hint| hint.scene_name().to_string())
        .or_else(|| reference.name.clone())
        .or_else(|| unit.trimmed_title().map(str::to_string))
        .unwrap_or_else(|| format!("Scene {chunk}"));
    let image = enhancement
        .as_ref()
        .map(|hint| hint.img.clone())
        .filter(|img| !img.is_empty())
        .unwrap_or_else(|| reference.image.clone());
    let extra = session
        .enhancements()
        .scene_adjustment(chunk)
        .map(|adjustment| adjustment.patch.clone())
        .unwrap_or_default();

    let chapter = Some(unit.chapter_id());
    let journal = JournalRecord {
        id: session.assign_id(DocType::JournalEntry, unit.id, Some(chunk)),
        ddb_id: unit.id,
        content_chunk_id: Some(chunk.to_string()),
        name: name.clone(),
        folder: Some(session.folder_or_master(FolderKind::Journal, chapter)),
        content: JournalContent::Image(image.clone()),
    };
    let scene = SceneRecord {
        id: session.assign_id(DocType::Scene, unit.id, Some(chunk)),
        ddb_id: unit.id,
        content_chunk_id: chunk.to_string(),
        parent_id: unit.parent_id,
        cobalt_id: unit.cobalt_id,
        name: name.clone(),
        image: image.clone(),
        folder: Some(session.folder_or_master(FolderKind::Scene, chapter)),
        missing: false,
        extra,
    };

    if !session.record_scene(scene, Some(journal)) {
        return false;
    }
    engine_info!("Found scene \"{}\" in {}", name, unit.content_chunk_id);

    let entry = ImageFinderEntry {
        name,
        ddb_id: unit.id,
        content_chunk_id: chunk.to_string(),
        image,
    };
    session.note_journal_image(entry.clone());
    session.note_scene_image(entry);
    true
}

fn is_image_reference(href: &str) -> bool {
    let href = href.trim();
    let parsed = Url::parse(href).or_else(|_| {
        Url::parse("https://local.invalid/").and_then(|base| base.join(href))
    });
    let Ok(url) = parsed else {
        return false;
    };
    url.path()
        .rsplit('.')
        .next()
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn enclosing_figure(el: ElementRef) -> Option<ElementRef> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_ASCENT_DEPTH)
        .find(|ancestor| ancestor.value().name() == "figure")
}

/// Caption text without the text of links inside it.
fn caption_text(figure: ElementRef) -> Option<String> {
    let caption = figure
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "figcaption")?;

    let texts = caption.descendants().filter_map(|node| match node.value() {
        Node::Text(text) if !inside_link(node, caption) => Some(&**text),
        _ => None,
    });
    let text = collapse_whitespace(texts);
    let text = text.trim_end_matches([':', '-', '|', ' ']).to_string();
    Some(text).filter(|text| !text.is_empty())
}

fn inside_link(node: ego_tree::NodeRef<Node>, boundary: ElementRef) -> bool {
    node.ancestors()
        .take_while(|ancestor| ancestor.id() != boundary.id())
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "a")
}

fn mentions_map(caption: &str) -> bool {
    caption
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case("map"))
}

/// Text of the closest heading before `el`, searching siblings then ancestors' siblings.
fn preceding_heading(el: ElementRef) -> Option<String> {
    let mut track = Some(HtmlNode::new(el));
    for _ in 0..MAX_ASCENT_DEPTH {
        let node = track?;
        let mut sibling = node.previous_sibling();
        while let Some(candidate) = sibling {
            if HEADINGS.iter().any(|h| *h == candidate.tag_name()) {
                let text = candidate.text_content();
                if !text.is_empty() {
                    return Some(text);
                }
            }
            sibling = candidate.previous_sibling();
        }
        track = node.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{is_image_reference, mentions_map};

    #[test]
    fn image_links_are_recognized_by_extension() {
        assert!(is_image_reference("https://media.example.com/maps/cave-player.jpg"));
        assert!(is_image_reference("/assets/maps/keep.PNG?v=2"));
        assert!(!is_image_reference("https://example.com/compendium/lmop/part-1"));
        assert!(!is_image_reference("#top"));
    }

    #[test]
    fn map_must_be_a_whole_word() {
        assert!(mentions_map("Map 1.2: Cragmaw Hideout"));
        assert!(!mentions_map("Mapping the Sword Coast"));
    }
}

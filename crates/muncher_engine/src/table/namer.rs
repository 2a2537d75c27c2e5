use engine_logging::{engine_debug, engine_warn};
use muncher_core::Enhancements;

use crate::dom::{TreeNode, MAX_ASCENT_DEPTH};

const MAX_CAPTION_WORDS: usize = 5;

/// Text of the nearest preceding element, climbing out of wrapper `div`s.
///
/// Ascent stops at the first ancestor that has a preceding sibling, at a parent
/// that is not a grouping container, or after [`MAX_ASCENT_DEPTH`] hops.
pub fn guess_name_from_siblings<N: TreeNode>(node: &N) -> Option<String> {
    let mut track = node.clone();
    let mut sibling = track.previous_sibling();
    let mut depth = 0;

    while sibling.is_none() && depth < MAX_ASCENT_DEPTH {
        let Some(parent) = track.parent() else {
            break;
        };
        if !parent.is_grouping_container() {
            break;
        }
        match parent.previous_sibling() {
            Some(found) => sibling = Some(found),
            None => track = parent,
        }
        depth += 1;
    }

    let text = sibling?.text_content();
    engine_debug!("Sibling text for table: {}", text);
    Some(text).filter(|text| !text.is_empty())
}

/// Resolves a human readable table name: hint, then sibling text, then a fallback label.
pub struct TableNamer<'a> {
    enhancements: &'a Enhancements,
}

impl<'a> TableNamer<'a> {
    pub fn new(enhancements: &'a Enhancements) -> Self {
        Self { enhancements }
    }

    pub fn resolve<N: TreeNode>(
        &self,
        node: &N,
        content_chunk_id: &str,
        headers: &[String],
        dice_headers: &[String],
    ) -> String {
        let guess = self.guess(node, content_chunk_id);
        collapse_sentence_name(guess, headers, dice_headers)
    }

    fn guess<N: TreeNode>(&self, node: &N, content_chunk_id: &str) -> String {
        if let Some(hint) = self.enhancements.table_hint(content_chunk_id) {
            return hint.table_name.clone();
        }
        if let Some(name) = guess_name_from_siblings(node) {
            return name;
        }
        engine_warn!("No table name identified for {}", content_chunk_id);
        format!("{}: Unknown Table: {}", node.tag_name(), content_chunk_id)
    }
}

/// A two column roll table whose guess reads like prose is named after its result column.
fn collapse_sentence_name(name: String, headers: &[String], dice_headers: &[String]) -> String {
    let words = name.split_whitespace().count();
    if words > MAX_CAPTION_WORDS && dice_headers.len() == 1 && headers.len() == 2 {
        return headers[1].clone();
    }
    name
}

#[cfg(test)]
mod tests {
    use super::collapse_sentence_name;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn long_name_on_roll_table_collapses() {
        let name = "The characters hear a strange noise coming from below".to_string();
        let headers = strings(&["d6", "Encounter"]);
        let dice = strings(&["d6"]);
        assert_eq!(collapse_sentence_name(name, &headers, &dice), "Encounter");
    }

    #[test]
    fn five_words_are_kept() {
        let name = "One Two Three Four Five".to_string();
        let headers = strings(&["d6", "Encounter"]);
        let dice = strings(&["d6"]);
        assert_eq!(collapse_sentence_name(name.clone(), &headers, &dice), name);
    }

    #[test]
    fn wider_tables_keep_long_names() {
        let name = "The characters hear a strange noise coming from below".to_string();
        let headers = strings(&["d6", "Encounter", "Notes"]);
        let dice = strings(&["d6"]);
        assert_eq!(collapse_sentence_name(name.clone(), &headers, &dice), name);
    }
}

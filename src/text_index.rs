use super::*;

/// Flattened view of the text under one container.
///
/// Every text node contributes its trimmed content; whitespace cut by the trim
/// never receives an offset.
#[derive(Debug, Clone, Default)]
pub(crate) struct TextIndex {
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) text: Vec<char>,
}

impl TextIndex {
    pub(crate) fn build(dom: &Dom, root: NodeId) -> Self {
        let mut nodes = Vec::new();
        collect_text_nodes(dom, root, &mut nodes);
        let text = nodes
            .iter()
            .filter_map(|node| dom.text_data(*node))
            .flat_map(|data| trim_text(data).chars())
            .collect();
        Self { nodes, text }
    }

    /// Start offsets of `query`, scanning again from each previous start + 1.
    pub(crate) fn find_all(&self, query: &[char]) -> Vec<usize> {
        find_all(&self.text, query)
    }
}

/// The whitespace set cut from both ends of every text node: Unicode
/// `White_Space` minus U+0085, plus U+FEFF.
pub(crate) fn is_trimmed_whitespace(ch: char) -> bool {
    ch == '\u{FEFF}' || (ch.is_whitespace() && ch != '\u{0085}')
}

pub(crate) fn trim_text(text: &str) -> &str {
    text.trim_matches(is_trimmed_whitespace)
}

/// Text nodes under `node_id` in document order.
pub(crate) fn collect_text_nodes(dom: &Dom, node_id: NodeId, out: &mut Vec<NodeId>) {
    stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
        match dom.node(node_id).map(|node| &node.node_type) {
            Some(NodeType::Text(_)) => out.push(node_id),
            Some(NodeType::Element(_) | NodeType::Document) => {
                for child in dom.children(node_id) {
                    collect_text_nodes(dom, *child, out);
                }
            }
            None => {}
        }
    });
}

pub(crate) fn find_all(text: &[char], query: &[char]) -> Vec<usize> {
    if query.is_empty() || query.len() > text.len() {
        return Vec::new();
    }
    let mut starts = Vec::new();
    let mut from = 0usize;
    while let Some(found) = text[from..]
        .windows(query.len())
        .position(|window| window == query)
    {
        let start = from + found;
        starts.push(start);
        from = start + 1;
    }
    starts
}

/// Sorted, deduplicated union of `[start, start + len)` over all starts.
pub(crate) fn highlighted_offsets(starts: &[usize], len: usize) -> Vec<usize> {
    let mut offsets: Vec<usize> = Vec::new();
    for start in starts {
        for offset in *start..start + len {
            if offsets.last().is_none_or(|last| offset > *last) {
                offsets.push(offset);
            }
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(value: &str) -> Vec<char> {
        value.chars().collect()
    }

    #[test]
    fn flattening_trims_each_text_node() -> Result<()> {
        let dom = parse_html("<div id='root'>  one <b> two </b>\n<i></i>three  </div>")?;
        let root = dom.by_id("root").ok_or_else(|| Error::SelectorNotFound("#root".into()))?;
        let index = TextIndex::build(&dom, root);
        assert_eq!(index.text.iter().collect::<String>(), "onetwothree");
        assert_eq!(index.nodes.len(), 4);
        Ok(())
    }

    #[test]
    fn trimming_keeps_next_line_and_drops_byte_order_mark() -> Result<()> {
        assert_eq!(trim_text("\u{FEFF}\u{00A0} ab \u{2028}"), "ab");
        assert_eq!(trim_text("\u{0085}ab\u{0085}"), "\u{0085}ab\u{0085}");

        let dom = parse_html("<p id='p'>\u{FEFF}x\u{0085}</p>")?;
        let p = dom.by_id("p").ok_or_else(|| Error::SelectorNotFound("#p".into()))?;
        assert_eq!(TextIndex::build(&dom, p).text, vec!['x', '\u{0085}']);
        Ok(())
    }

    #[test]
    fn finds_repeated_query() {
        let starts = find_all(&chars("ababab"), &chars("ab"));
        assert_eq!(starts, vec![0, 2, 4]);
        assert_eq!(highlighted_offsets(&starts, 2), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn overlapping_occurrences_are_reported() {
        let starts = find_all(&chars("aaa"), &chars("aa"));
        assert_eq!(starts, vec![0, 1]);
        assert_eq!(highlighted_offsets(&starts, 2), vec![0, 1, 2]);
    }

    #[test]
    fn empty_or_oversized_query_finds_nothing() {
        assert!(find_all(&chars("abc"), &[]).is_empty());
        assert!(find_all(&chars("ab"), &chars("abc")).is_empty());
    }

    #[test]
    fn offsets_count_chars_not_bytes() {
        let starts = find_all(&chars("héllo wörld"), &chars("wö"));
        assert_eq!(starts, vec![6]);
    }
}

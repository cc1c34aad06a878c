use super::*;
use crate::session::MatchRecord;
use crate::text_index::{TextIndex, is_trimmed_whitespace, trim_text};

/// Splits the indexed text nodes so that every highlighted offset is wrapped
/// in its own `<span>` carrying `class_name`.
///
/// Returns the spans in document order, index-aligned with `offsets`. Text
/// nodes holding no highlighted offset are left in place.
pub(crate) fn apply_highlights(
    dom: &mut Dom,
    index: &TextIndex,
    offsets: &[usize],
    class_name: &str,
) -> Result<Vec<NodeId>> {
    let mut spans = Vec::with_capacity(offsets.len());
    let mut running = 0usize;
    let mut cursor = 0usize;

    for node in &index.nodes {
        if cursor >= offsets.len() {
            break;
        }
        let Some(data) = dom.text_data(*node).map(str::to_string) else {
            continue;
        };
        let trimmed = trim_text(&data);
        let len = trimmed.chars().count();
        if len == 0 {
            continue;
        }
        let end = running + len;
        let Some(parent) = dom.parent(*node) else {
            running = end;
            continue;
        };
        if offsets[cursor] >= end {
            running = end;
            continue;
        }

        let body_start = data.len() - data.trim_start_matches(is_trimmed_whitespace).len();
        let body_end = data.trim_end_matches(is_trimmed_whitespace).len();
        let (leading, trailing) = (&data[..body_start], &data[body_end..]);

        let mut pieces = Vec::new();
        let mut plain = leading.to_string();
        for (i, ch) in trimmed.chars().enumerate() {
            if offsets.get(cursor) != Some(&(running + i)) {
                plain.push(ch);
                continue;
            }
            cursor += 1;
            if !plain.is_empty() {
                pieces.push(dom.create_detached_text(std::mem::take(&mut plain)));
            }
            let span = dom.create_detached_element("span".to_string());
            dom.class_add(span, class_name)?;
            dom.create_text(span, ch.to_string());
            pieces.push(span);
            spans.push(span);
        }
        plain.push_str(trailing);
        if !plain.is_empty() {
            pieces.push(dom.create_detached_text(plain));
        }

        for piece in pieces {
            dom.insert_before(parent, piece, *node)?;
        }
        dom.remove_child(parent, *node)?;
        dom.release(*node);
        running = end;
    }

    Ok(spans)
}

/// Groups the flat span list into one record per match start.
///
/// A start missing from `offsets`, or whose spans run past the list, yields no
/// record.
pub(crate) fn partition_matches(
    selector: &str,
    starts: &[usize],
    offsets: &[usize],
    spans: &[NodeId],
    query_len: usize,
) -> Vec<MatchRecord> {
    starts
        .iter()
        .filter_map(|start| {
            let pos = offsets.binary_search(start).ok()?;
            let spans = spans.get(pos..pos + query_len)?;
            Some(MatchRecord::new(selector, spans.to_vec()))
        })
        .collect()
}

/// Replaces every attached span with a plain text node and merges the
/// resulting runs back together. Reverted spans are released; detached or
/// already released spans are skipped.
pub(crate) fn revert_spans<'a>(
    dom: &mut Dom,
    spans: impl IntoIterator<Item = &'a NodeId>,
) -> Result<()> {
    let mut parents = Vec::new();
    let mut seen = HashSet::new();

    for span in spans {
        if !dom.is_valid_node(*span) {
            continue;
        }
        let Some(parent) = dom.parent(*span) else {
            continue;
        };
        let text = dom.text_content(*span);
        let replacement = dom.create_detached_text(text);
        dom.replace_with(*span, replacement)?;
        dom.release(*span);
        if seen.insert(parent) {
            parents.push(parent);
        }
    }

    for parent in parents {
        dom.normalize(parent);
    }
    Ok(())
}

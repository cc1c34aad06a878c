impl Dom {
    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.dump_node_into(node_id, &mut out);
        out
    }

    fn dump_node_into(&self, node_id: NodeId, out: &mut String) {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let Some(node) = self.node(node_id) else {
                return;
            };
            match &node.node_type {
                NodeType::Document => {
                    for child in &node.children {
                        self.dump_node_into(*child, out);
                    }
                }
                NodeType::Text(text) => out.push_str(&escape_html_text_for_serialization(text)),
                NodeType::Element(element) => {
                    out.push('<');
                    out.push_str(&element.tag_name);
                    let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                    attrs.sort_by(|(left, _), (right, _)| left.cmp(right));
                    for (k, v) in attrs {
                        out.push(' ');
                        out.push_str(k);
                        out.push_str("=\"");
                        out.push_str(&escape_html_attr_for_serialization(v));
                        out.push('"');
                    }
                    out.push('>');
                    if is_void_tag(&element.tag_name) {
                        return;
                    }
                    let raw_text_container = element.tag_name.eq_ignore_ascii_case("script")
                        || element.tag_name.eq_ignore_ascii_case("style");
                    for child in &node.children {
                        match self.text_data(*child) {
                            Some(text) if raw_text_container => out.push_str(text),
                            _ => self.dump_node_into(*child, out),
                        }
                    }
                    out.push_str("</");
                    out.push_str(&element.tag_name);
                    out.push('>');
                }
            }
        });
    }
}

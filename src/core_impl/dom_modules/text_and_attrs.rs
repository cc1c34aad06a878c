impl Dom {
    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text_content(node_id, &mut out);
        out
    }

    fn collect_text_content(&self, node_id: NodeId, out: &mut String) {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            match self.node(node_id).map(|node| &node.node_type) {
                Some(NodeType::Document | NodeType::Element(_)) => {
                    for child in self.children(node_id) {
                        self.collect_text_content(*child, out);
                    }
                }
                Some(NodeType::Text(text)) => out.push_str(text),
                None => {}
            }
        });
    }

    pub(crate) fn inner_html(&self, node_id: NodeId) -> Result<String> {
        if self.element(node_id).is_none() {
            return Err(Error::DomMutation(
                "innerHTML target is not an element".into(),
            ));
        }
        let mut out = String::new();
        for child in self.children(node_id) {
            out.push_str(&self.dump_node(*child));
        }
        Ok(out)
    }

    pub(crate) fn set_inner_html(&mut self, node_id: NodeId, html: &str) -> Result<()> {
        if self.element(node_id).is_none() {
            return Err(Error::DomMutation(
                "innerHTML target is not an element".into(),
            ));
        }

        let fragment = parse_html(html)?;

        for child in self.children(node_id).to_vec() {
            self.detach_from_parent(child);
            self.release(child);
        }

        let children = fragment.children(fragment.root).to_vec();
        for child in children {
            self.clone_subtree_from_dom(&fragment, child, Some(node_id))?;
        }

        self.rebuild_id_index();
        Ok(())
    }

    pub(crate) fn clone_subtree_from_dom(
        &mut self,
        source: &Dom,
        source_node: NodeId,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let node_type = match source.node(source_node).map(|node| &node.node_type) {
            None | Some(NodeType::Document) => {
                return Err(Error::DomMutation(
                    "cannot clone document node into innerHTML target".into(),
                ));
            }
            Some(NodeType::Element(element)) => NodeType::Element(element.clone()),
            Some(NodeType::Text(text)) => NodeType::Text(text.clone()),
        };

        let node = self.create_node(parent, node_type);
        for child in source.children(source_node) {
            self.clone_subtree_from_dom(source, *child, Some(node))?;
        }
        Ok(node)
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|e| e.attrs.get(name).cloned())
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let old_id = if lowered == "id" {
            self.attr(node_id, "id")
        } else {
            None
        };
        let connected = self.is_connected(node_id);
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::DomMutation("setAttribute target is not an element".into()))?;
        element.attrs.insert(lowered.clone(), value.to_string());

        if lowered == "id" && connected {
            if let Some(old) = old_id {
                self.unindex_id(&old, node_id);
            }
            self.index_id(value, node_id);
        }
        Ok(())
    }
}

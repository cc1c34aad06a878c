impl Dom {
    pub(crate) fn can_have_children(&self, node_id: NodeId) -> bool {
        matches!(
            self.node(node_id).map(|node| &node.node_type),
            Some(NodeType::Document | NodeType::Element(_))
        )
    }

    /// Shared precondition of `appendChild` and `insertBefore`.
    fn check_insertion(&self, op: &str, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.can_have_children(parent) {
            return Err(Error::DomMutation(format!("{op} target cannot have children")));
        }
        if child == self.root || child == parent || !self.is_valid_node(child) {
            return Err(Error::DomMutation(format!("invalid {op} node")));
        }
        if self.is_descendant_of(parent, child) {
            return Err(Error::DomMutation(format!("{op} would create a cycle")));
        }
        Ok(())
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertion("appendChild", parent, child)?;
        self.attach(parent, child, None)
    }

    pub(crate) fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        match self.children(parent).first().copied() {
            Some(reference) => self.insert_before(parent, child, reference),
            None => self.append_child(parent, child),
        }
    }

    pub(crate) fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<()> {
        self.check_insertion("insertBefore", parent, child)?;
        if self.parent(reference) != Some(parent) {
            return Err(Error::DomMutation(
                "insertBefore reference is not a direct child".into(),
            ));
        }
        if child == reference {
            return Ok(());
        }
        self.attach(parent, child, Some(reference))
    }

    /// Moves `child` under `parent`, before `reference` or at the end.
    fn attach(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
        self.detach_from_parent(child);
        let node = self
            .node_mut(parent)
            .ok_or_else(|| Error::DomMutation("insertion parent was released".into()))?;
        let at = match reference {
            Some(reference) => node
                .children
                .iter()
                .position(|id| *id == reference)
                .ok_or_else(|| Error::DomMutation("insertBefore reference is missing".into()))?,
            None => node.children.len(),
        };
        node.children.insert(at, child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        self.refresh_id_index_for(child);
        Ok(())
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(Error::DomMutation(
                "removeChild target is not a direct child".into(),
            ));
        }
        self.detach_from_parent(child);
        self.refresh_id_index_for(child);
        Ok(())
    }

    /// Puts `replacement` where `target` was. A detached target is left alone.
    pub(crate) fn replace_with(&mut self, target: NodeId, replacement: NodeId) -> Result<()> {
        let Some(parent) = self.parent(target) else {
            return Ok(());
        };
        if target == replacement {
            return Ok(());
        }
        self.insert_before(parent, replacement, target)?;
        self.remove_child(parent, target)
    }

    /// Merges adjacent text nodes and drops empty ones in the subtree of
    /// `node_id`. Absorbed nodes are released.
    pub(crate) fn normalize(&mut self, node_id: NodeId) {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let children = self.children(node_id).to_vec();
            let mut kept = Vec::with_capacity(children.len());
            let mut run: Option<NodeId> = None;

            for child in children {
                let Some(text) = self.text_data(child).map(str::to_string) else {
                    self.normalize(child);
                    kept.push(child);
                    run = None;
                    continue;
                };
                match run {
                    _ if text.is_empty() => {}
                    Some(head) => {
                        if let Some(NodeType::Text(data)) =
                            self.node_mut(head).map(|node| &mut node.node_type)
                        {
                            data.push_str(&text);
                        }
                    }
                    None => {
                        kept.push(child);
                        run = Some(child);
                        continue;
                    }
                }
                if let Some(node) = self.node_mut(child) {
                    node.parent = None;
                }
                self.release(child);
            }

            if let Some(node) = self.node_mut(node_id) {
                node.children = kept;
            }
        });
    }

    fn detach_from_parent(&mut self, child: NodeId) {
        let Some(old_parent) = self.parent(child) else {
            return;
        };
        if let Some(node) = self.node_mut(old_parent) {
            node.children.retain(|id| *id != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
    }

    fn refresh_id_index_for(&mut self, subtree: NodeId) {
        if self.subtree_has_id(subtree) {
            self.rebuild_id_index();
        }
    }

    fn subtree_has_id(&self, node_id: NodeId) -> bool {
        let mut stack = vec![node_id];
        while let Some(node) = stack.pop() {
            if self
                .element(node)
                .is_some_and(|element| element.attrs.contains_key("id"))
            {
                return true;
            }
            stack.extend(self.children(node).iter().copied());
        }
        false
    }
}

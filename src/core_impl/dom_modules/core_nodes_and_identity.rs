impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
            generation: 0,
        };
        Self {
            nodes: vec![root],
            root: NodeId {
                index: 0,
                generation: 0,
            },
            id_index: HashMap::new(),
            free: Vec::new(),
        }
    }

    /// Resolves a handle, `None` once its node has been released.
    pub(crate) fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes
            .get(node_id.index)
            .filter(|node| node.generation == node_id.generation)
    }

    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(node_id.index)
            .filter(|node| node.generation == node_id.generation)
    }

    pub(crate) fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.nodes[index];
                slot.parent = parent;
                slot.children.clear();
                slot.node_type = node_type;
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.nodes.push(Node {
                    parent,
                    children: Vec::new(),
                    node_type,
                    generation: 0,
                });
                NodeId {
                    index: self.nodes.len() - 1,
                    generation: 0,
                }
            }
        };
        if let Some(parent) = parent.and_then(|parent| self.node_mut(parent)) {
            parent.children.push(id);
        }
        id
    }

    /// Returns the slots of a detached subtree to the free list.
    ///
    /// Attached nodes and the document root are left alone.
    pub(crate) fn release(&mut self, node_id: NodeId) {
        if node_id == self.root || self.parent(node_id).is_some() {
            return;
        }
        let mut pending = vec![node_id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.node_mut(current) else {
                continue;
            };
            pending.append(&mut node.children);
            node.parent = None;
            node.node_type = NodeType::Text(String::new());
            node.generation = node.generation.wrapping_add(1);
            self.free.push(current.index);
        }
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let id_attr = attrs.get("id").cloned();
        let id = self.create_node(Some(parent), NodeType::Element(Element { tag_name, attrs }));
        if let Some(id_attr) = id_attr {
            self.index_id(&id_attr, id);
        }
        id
    }

    pub(crate) fn create_detached_element(&mut self, tag_name: String) -> NodeId {
        let element = Element {
            tag_name,
            attrs: HashMap::new(),
        };
        self.create_node(None, NodeType::Element(element))
    }

    pub(crate) fn create_detached_text(&mut self, text: String) -> NodeId {
        self.create_node(None, NodeType::Text(text))
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.node(node_id)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(node_id)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Raw data of a text node, `None` for every other node type.
    pub(crate) fn text_data(&self, node_id: NodeId) -> Option<&str> {
        match &self.node(node_id)?.node_type {
            NodeType::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.node(node_id)?.parent
    }

    pub(crate) fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.node(node_id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Ancestors of `node_id`, nearest first.
    pub(crate) fn ancestors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node_id), move |node| self.parent(*node))
    }

    pub(crate) fn is_descendant_of(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(node_id).any(|node| node == ancestor)
    }

    pub(crate) fn is_valid_node(&self, node_id: NodeId) -> bool {
        self.node(node_id).is_some()
    }

    pub(crate) fn is_connected(&self, node_id: NodeId) -> bool {
        node_id == self.root || self.is_descendant_of(node_id, self.root)
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id)?.first().copied()
    }

    pub(crate) fn by_id_all(&self, id: &str) -> Vec<NodeId> {
        self.id_index.get(id).cloned().unwrap_or_default()
    }

    pub(crate) fn index_id(&mut self, id: &str, node_id: NodeId) {
        if !id.is_empty() {
            self.id_index.entry(id.to_string()).or_default().push(node_id);
        }
    }

    pub(crate) fn unindex_id(&mut self, id: &str, node_id: NodeId) {
        if let Some(nodes) = self.id_index.get_mut(id) {
            nodes.retain(|candidate| *candidate != node_id);
            if nodes.is_empty() {
                self.id_index.remove(id);
            }
        }
    }

    /// Recomputes the id index from the connected tree, in document order.
    pub(crate) fn rebuild_id_index(&mut self) {
        let mut index: HashMap<String, Vec<NodeId>> = HashMap::new();
        for node in self.all_element_nodes() {
            if let Some(id) = self.attr(node, "id").filter(|id| !id.is_empty()) {
                index.entry(id).or_default().push(node);
            }
        }
        self.id_index = index;
    }
}

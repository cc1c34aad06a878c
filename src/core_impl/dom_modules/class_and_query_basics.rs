impl Dom {
    pub(crate) fn class_contains(&self, node_id: NodeId, class_name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|element| has_class(element, class_name))
    }

    pub(crate) fn class_add(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::DomMutation("classList target is not an element".into()))?;
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        if !classes.iter().any(|name| name == class_name) {
            classes.push(class_name.to_string());
        }
        set_class_attr(element, &classes);
        Ok(())
    }

    pub(crate) fn class_remove(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::DomMutation("classList target is not an element".into()))?;
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        classes.retain(|name| name != class_name);
        set_class_attr(element, &classes);
        Ok(())
    }

    pub(crate) fn class_names(&self, node_id: NodeId) -> Vec<String> {
        class_tokens(
            self.element(node_id)
                .and_then(|element| element.attrs.get("class"))
                .map(String::as_str),
        )
    }

    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        if let Some(id) = bare_id(&groups) {
            return Ok(self.by_id(id));
        }
        Ok(self
            .all_element_nodes()
            .into_iter()
            .find(|node| self.matches_any(*node, &groups)))
    }

    /// Elements matching any group of `selector`, in document order.
    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        if let Some(id) = bare_id(&groups) {
            return Ok(self.by_id_all(id));
        }
        Ok(self
            .all_element_nodes()
            .into_iter()
            .filter(|node| self.matches_any(*node, &groups))
            .collect())
    }

    pub(crate) fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            if self.element(node_id).is_some() {
                out.push(node_id);
            }
            for child in self.children(node_id) {
                self.collect_elements_dfs(*child, out);
            }
        });
    }

    pub(crate) fn all_element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_dfs(self.root, &mut out);
        out
    }

    pub(crate) fn elements_with_class(&self, class_name: &str) -> Vec<NodeId> {
        self.all_element_nodes()
            .into_iter()
            .filter(|node| self.class_contains(*node, class_name))
            .collect()
    }

    pub(crate) fn find_first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.all_element_nodes().into_iter().find(|node| {
            self.tag_name(*node)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
        })
    }
}

/// The id of a selector that is exactly one `#id`.
fn bare_id(groups: &SelectorList) -> Option<&str> {
    match groups.as_slice() {
        [group] => match group.as_slice() {
            [part] => part.step.id_only(),
            _ => None,
        },
        _ => None,
    }
}

fn has_class(element: &Element, class_name: &str) -> bool {
    element
        .attrs
        .get("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
}

fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| {
            value
                .split_whitespace()
                .filter(|token| !token.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn set_class_attr(element: &mut Element, classes: &[String]) {
    if classes.is_empty() {
        element.attrs.remove("class");
    } else {
        element.attrs.insert("class".to_string(), classes.join(" "));
    }
}

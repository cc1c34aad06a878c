impl Dom {
    /// Whether `node_id` matches the rightmost part of `parts`, with each
    /// part to its left matched by an ancestor or sibling per its combinator.
    pub(crate) fn matches_selector_chain(&self, node_id: NodeId, parts: &[SelectorPart]) -> bool {
        let Some((last, rest)) = parts.split_last() else {
            return false;
        };
        if !self.matches_step(node_id, &last.step) {
            return false;
        }

        let mut current = node_id;
        let mut combinator = last.combinator;
        for part in rest.iter().rev() {
            let step = &part.step;
            let found = match combinator.unwrap_or(SelectorCombinator::Descendant) {
                SelectorCombinator::Child => self
                    .parent(current)
                    .filter(|p| self.matches_step(*p, step)),
                SelectorCombinator::Descendant => self
                    .ancestors(current)
                    .find(|p| self.matches_step(*p, step)),
                SelectorCombinator::AdjacentSibling => self
                    .preceding_element_siblings(current)
                    .next()
                    .filter(|s| self.matches_step(*s, step)),
                SelectorCombinator::GeneralSibling => self
                    .preceding_element_siblings(current)
                    .find(|s| self.matches_step(*s, step)),
            };
            let Some(found) = found else {
                return false;
            };
            current = found;
            combinator = part.combinator;
        }
        true
    }

    fn matches_any(&self, node_id: NodeId, list: &SelectorList) -> bool {
        list.iter()
            .any(|parts| self.matches_selector_chain(node_id, parts))
    }

    fn matches_step(&self, node_id: NodeId, step: &SelectorStep) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };
        let tag_ok = step
            .tag
            .as_ref()
            .is_none_or(|tag| element.tag_name.eq_ignore_ascii_case(tag));
        let id_ok = step
            .id
            .as_ref()
            .is_none_or(|id| element.attrs.get("id") == Some(id));

        tag_ok
            && id_ok
            && step.classes.iter().all(|name| has_class(element, name))
            && step.attrs.iter().all(|attr| attr.matches(&element.attrs))
            && step
                .pseudo_classes
                .iter()
                .all(|pseudo| self.matches_pseudo_class(node_id, pseudo))
    }

    fn matches_pseudo_class(&self, node_id: NodeId, pseudo: &SelectorPseudoClass) -> bool {
        match pseudo {
            SelectorPseudoClass::Nth {
                formula,
                of_type,
                from_end,
            } => self
                .sibling_position(node_id, *of_type)
                .is_some_and(|(index, total)| {
                    formula.matches(if *from_end { total + 1 - index } else { index })
                }),
            SelectorPseudoClass::Only { of_type } => self
                .sibling_position(node_id, *of_type)
                .is_some_and(|(_, total)| total == 1),
            SelectorPseudoClass::Empty => self
                .children(node_id)
                .iter()
                .all(|child| self.text_data(*child).is_some_and(str::is_empty)),
            SelectorPseudoClass::Not(list) => !self.matches_any(node_id, list),
            SelectorPseudoClass::Is(list) => self.matches_any(node_id, list),
            SelectorPseudoClass::Has(list) => {
                let mut descendants = Vec::new();
                for child in self.children(node_id) {
                    self.collect_elements_dfs(*child, &mut descendants);
                }
                descendants
                    .into_iter()
                    .any(|candidate| self.matches_any(candidate, list))
            }
        }
    }

    /// 1-based position of `node_id` among its element siblings, and their
    /// count. With `of_type`, only siblings sharing its tag name count.
    fn sibling_position(&self, node_id: NodeId, of_type: bool) -> Option<(usize, usize)> {
        let parent = self.parent(node_id)?;
        let tag_name = self.tag_name(node_id)?;
        let peers = self
            .children(parent)
            .iter()
            .copied()
            .filter(|child| {
                self.tag_name(*child)
                    .is_some_and(|tag| !of_type || tag.eq_ignore_ascii_case(tag_name))
            })
            .collect::<Vec<_>>();
        let index = peers.iter().position(|peer| *peer == node_id)?;
        Some((index + 1, peers.len()))
    }

    /// Element siblings before `node_id`, nearest first.
    fn preceding_element_siblings(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let siblings = self.parent(node_id).map_or(&[][..], |parent| self.children(parent));
        let before = siblings
            .iter()
            .position(|id| *id == node_id)
            .map_or(&[][..], |pos| &siblings[..pos]);
        before
            .iter()
            .rev()
            .copied()
            .filter(|sibling| self.element(*sibling).is_some())
    }
}

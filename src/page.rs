use super::*;

/// An in-memory HTML document that search sessions highlight in place.
#[derive(Debug, Clone)]
pub struct Page {
    pub(crate) dom: Dom,
    next_session_id: u64,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            next_session_id: 1,
        })
    }

    /// Id the next session created on this page will receive.
    pub fn next_session_id(&self) -> u64 {
        self.next_session_id
    }

    pub(crate) fn allocate_session_id(&mut self) -> u64 {
        let id = self.next_session_id;
        self.next_session_id += 1;
        id
    }

    /// Serialized markup of the whole document.
    pub fn html(&self) -> String {
        self.dom.dump_node(self.dom.root)
    }

    pub fn text_content(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    pub fn inner_html(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.inner_html(target)
    }

    /// Replaces the children of the first element matching `selector`.
    ///
    /// The old children are released. Spans an active session held among
    /// them are skipped when that session navigates or clears.
    pub fn set_inner_html(&mut self, selector: &str, html: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dom.set_inner_html(target, html)
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    /// Connected elements carrying `class_name`, in document order.
    pub fn query_all_with_class(&self, class_name: &str) -> Vec<NodeId> {
        self.dom.elements_with_class(class_name)
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub fn class_names(&self, node: NodeId) -> Vec<String> {
        self.dom.class_names(node)
    }

    pub fn node_text(&self, node: NodeId) -> String {
        self.dom.text_content(node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node) && self.dom.is_connected(node)
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub(crate) fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }
}

use super::*;
use crate::session::SearchSession;

/// Hands out [`SearchSession`]s with collision-free class names.
///
/// Session ids come from the [`Page`] itself, so sessions created on the same
/// page never share classes, whichever factory creates them.
#[derive(Debug, Clone, Default)]
pub struct SessionFactory {
    config: HighlightConfig,
}

impl SessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose [`SessionFactory::create_default`] uses `config`.
    pub fn with_config(config: HighlightConfig) -> Self {
        Self { config }
    }

    /// Registers the highlight classes on `page` and returns a new session.
    pub fn create(&self, page: &mut Page, config: HighlightConfig) -> Result<SearchSession> {
        config.validate()?;
        let id = page.allocate_session_id();

        let classes = StyleClasses::new(&config.class_prefix, id);
        let style_node = inject_stylesheet(&mut page.dom, &stylesheet(&classes, &config))?;
        Ok(SearchSession::new(classes, style_node))
    }

    pub fn create_default(&self, page: &mut Page) -> Result<SearchSession> {
        self.create(page, self.config.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StyleClasses {
    pub(crate) highlight: String,
    pub(crate) current: String,
}

impl StyleClasses {
    pub(crate) fn new(prefix: &str, id: u64) -> Self {
        Self {
            highlight: format!("{prefix}-highlight-{id}"),
            current: format!("{prefix}-current-{id}"),
        }
    }
}

pub(crate) fn stylesheet(classes: &StyleClasses, config: &HighlightConfig) -> String {
    format!(
        ".{} {{ background-color: {}; }} .{} {{ background-color: {}; }}",
        classes.highlight, config.highlight_color, classes.current, config.current_color
    )
}

/// Appends a `<style type="text/css">` holding `css` to the document head.
pub(crate) fn inject_stylesheet(dom: &mut Dom, css: &str) -> Result<NodeId> {
    let head = ensure_head(dom)?;
    let style = dom.create_detached_element("style".to_string());
    dom.set_attr(style, "type", "text/css")?;
    dom.create_text(style, css.to_string());
    dom.append_child(head, style)?;
    Ok(style)
}

fn ensure_head(dom: &mut Dom) -> Result<NodeId> {
    if let Some(head) = dom.find_first_by_tag("head") {
        return Ok(head);
    }
    let host = dom.find_first_by_tag("html").unwrap_or(dom.root);
    let head = dom.create_detached_element("head".to_string());
    dom.prepend_child(host, head)?;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_carry_prefix_and_id() {
        let classes = StyleClasses::new("search-box", 7);
        assert_eq!(classes.highlight, "search-box-highlight-7");
        assert_eq!(classes.current, "search-box-current-7");
    }

    #[test]
    fn stylesheet_declares_both_classes() {
        let classes = StyleClasses::new("search-box", 1);
        let css = stylesheet(&classes, &HighlightConfig::default());
        assert_eq!(
            css,
            ".search-box-highlight-1 { background-color: rgb(246, 186, 130); } \
             .search-box-current-1 { background-color: rgb(246, 137, 31); }"
        );
    }

    #[test]
    fn style_goes_into_existing_head() -> Result<()> {
        let mut dom = parse_html("<html><head><title>t</title></head><body></body></html>")?;
        inject_stylesheet(&mut dom, ".a { color: red; }")?;
        assert_eq!(
            dom.dump_node(dom.root),
            "<html><head><title>t</title><style type=\"text/css\">.a { color: red; }</style>\
             </head><body></body></html>"
        );
        Ok(())
    }

    #[test]
    fn missing_head_is_created_inside_html() -> Result<()> {
        let mut dom = parse_html("<html><body><p>x</p></body></html>")?;
        inject_stylesheet(&mut dom, ".a {}")?;
        assert_eq!(
            dom.dump_node(dom.root),
            "<html><head><style type=\"text/css\">.a {}</style></head>\
             <body><p>x</p></body></html>"
        );
        Ok(())
    }

    #[test]
    fn bare_fragment_gets_head_at_document_start() -> Result<()> {
        let mut dom = parse_html("<div>x</div>")?;
        let style = inject_stylesheet(&mut dom, ".a {}")?;
        assert!(dom.is_connected(style));
        assert_eq!(
            dom.dump_node(dom.root),
            "<head><style type=\"text/css\">.a {}</style></head><div>x</div>"
        );
        Ok(())
    }

    #[test]
    fn session_ids_increase_per_page() -> Result<()> {
        let mut page = Page::from_html("<div>x</div>")?;
        let factory = SessionFactory::new();
        let first = factory.create_default(&mut page)?;
        let second = factory.create_default(&mut page)?;
        assert_eq!(first.highlight_class(), "search-box-highlight-1");
        assert_eq!(second.highlight_class(), "search-box-highlight-2");
        assert_eq!(page.next_session_id(), 3);
        assert_eq!(page.query_selector_all("head > style")?.len(), 2);
        Ok(())
    }

    #[test]
    fn separate_factories_share_the_page_counter() -> Result<()> {
        let mut page = Page::from_html("<p id='a'>cat</p><p id='b'>cat</p>")?;
        let mut first = SessionFactory::new().create_default(&mut page)?;
        let mut second = SessionFactory::new().create_default(&mut page)?;
        assert_eq!(first.highlight_class(), "search-box-highlight-1");
        assert_eq!(second.highlight_class(), "search-box-highlight-2");

        first.search(&mut page, "c", Some(&["#a"]))?;
        second.search(&mut page, "t", Some(&["#b"]))?;
        assert_eq!(page.query_all_with_class(first.highlight_class()).len(), 1);
        assert_eq!(page.query_all_with_class(second.highlight_class()).len(), 1);
        Ok(())
    }

    #[test]
    fn configured_factory_applies_its_defaults() -> Result<()> {
        let mut page = Page::from_html("<div>x</div>")?;
        let factory = SessionFactory::with_config(HighlightConfig::default().class_prefix("find"));
        let session = factory.create_default(&mut page)?;
        assert_eq!(session.highlight_class(), "find-highlight-1");
        assert_eq!(session.current_class(), "find-current-1");
        Ok(())
    }

    #[test]
    fn invalid_config_does_not_consume_an_id() -> Result<()> {
        let mut page = Page::from_html("<div>x</div>")?;
        let err = SessionFactory::new()
            .create(&mut page, HighlightConfig::default().current_color("red;"))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(page.next_session_id(), 1);
        assert!(page.query_selector_all("style")?.is_empty());
        Ok(())
    }
}

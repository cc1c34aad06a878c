use super::html::{
    escape_html_attr_for_serialization, escape_html_text_for_serialization, is_void_tag,
    parse_html,
};
use super::*;

include!("dom_modules/core_nodes_and_identity.rs");
include!("dom_modules/tree_mutation.rs");
include!("dom_modules/text_and_attrs.rs");
include!("dom_modules/class_and_query_basics.rs");
include!("dom_modules/selector_matching_and_pseudo.rs");
include!("dom_modules/dump_and_misc.rs");

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "<ul id='list'>\
        <li id='a' class='item first' data-tag='alpha beta' lang='en-US' \
        href='/docs/guide.pdf'>A</li>\
        <li id='b' class='item'>B</li>\
        <p id='c'></p>\
        <li id='d' class='item' lang='en'>D</li>\
        <p id='e'><b id='f'>E</b></p>\
        </ul>";

    fn ids(dom: &Dom, selector: &str) -> Result<Vec<String>> {
        Ok(dom
            .query_selector_all(selector)?
            .into_iter()
            .filter_map(|node| dom.attr(node, "id"))
            .collect())
    }

    #[test]
    fn type_pseudo_classes_count_same_tag_siblings() -> Result<()> {
        let dom = parse_html(LIST)?;
        assert_eq!(ids(&dom, "li:first-of-type")?, ["a"]);
        assert_eq!(ids(&dom, "li:last-of-type")?, ["d"]);
        assert_eq!(ids(&dom, "p:last-of-type")?, ["e"]);
        assert_eq!(ids(&dom, "b:only-of-type")?, ["f"]);
        assert!(ids(&dom, "li:only-of-type")?.is_empty());
        assert_eq!(ids(&dom, "#list > li:nth-last-of-type(2)")?, ["b"]);
        Ok(())
    }

    #[test]
    fn child_positions_count_from_either_end() -> Result<()> {
        let dom = parse_html(LIST)?;
        assert_eq!(ids(&dom, "#list > :nth-last-child(2)")?, ["d"]);
        assert_eq!(ids(&dom, "#list > :nth-child(odd)")?, ["a", "c", "e"]);
        assert_eq!(ids(&dom, "b:only-child")?, ["f"]);
        Ok(())
    }

    #[test]
    fn empty_where_not_and_has() -> Result<()> {
        let dom = parse_html(LIST)?;
        assert_eq!(ids(&dom, "#list > :empty")?, ["c"]);
        assert_eq!(ids(&dom, "#list > :where(p, .first)")?, ["a", "c", "e"]);
        assert_eq!(ids(&dom, "li:not(.first)")?, ["b", "d"]);
        assert_eq!(ids(&dom, "p:has(b)")?, ["e"]);
        Ok(())
    }

    #[test]
    fn sibling_combinators_skip_to_element_siblings() -> Result<()> {
        let dom = parse_html(LIST)?;
        assert_eq!(ids(&dom, "#b + p")?, ["c"]);
        assert_eq!(ids(&dom, "#a ~ p")?, ["c", "e"]);
        assert!(ids(&dom, "#c + p")?.is_empty());
        Ok(())
    }

    #[test]
    fn attribute_operators_match_values() -> Result<()> {
        let dom = parse_html(LIST)?;
        assert_eq!(ids(&dom, "[lang]")?, ["a", "d"]);
        assert_eq!(ids(&dom, "[class='item']")?, ["b", "d"]);
        assert_eq!(ids(&dom, "[lang|=en]")?, ["a", "d"]);
        assert_eq!(ids(&dom, "[lang|=en-US]")?, ["a"]);
        assert_eq!(ids(&dom, "[data-tag~=beta]")?, ["a"]);
        assert!(ids(&dom, "[data-tag~=alp]")?.is_empty());
        assert_eq!(ids(&dom, "[href^='/docs']")?, ["a"]);
        assert_eq!(ids(&dom, r#"[href$=".pdf"]"#)?, ["a"]);
        assert_eq!(ids(&dom, "[href*=guide]")?, ["a"]);
        assert!(ids(&dom, "[href^='']")?.is_empty());
        Ok(())
    }
}

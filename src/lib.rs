//! Find-in-page text search and highlighting over a lightweight in-memory DOM.
//!
//! A [`Page`] holds the document. A [`SessionFactory`] hands out
//! [`SearchSession`]s, each with its own pair of highlight classes injected as a
//! `<style>` block. A session flattens the text of one or more containers,
//! wraps every matched character in a highlight `<span>`, and steps through the
//! matches with a separate "current" class.
//!
//! ```
//! use search_highlight::{Page, SessionFactory};
//!
//! # fn main() -> search_highlight::Result<()> {
//! let mut page = Page::from_html("<div id='doc'>ababab</div>")?;
//! let factory = SessionFactory::new();
//! let mut session = factory.create_default(&mut page)?;
//!
//! let count = session.search(&mut page, "ab", Some(&["#doc"]))?;
//! assert_eq!(count, Some(3));
//! session.search_next(&mut page)?;
//! assert_eq!(session.current_index(), Some(0));
//!
//! session.clear_search_data(&mut page)?;
//! page.assert_text("#doc", "ababab")?;
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};

mod config;
mod core_impl;
mod highlight;
mod page;
mod selector;
mod session;
mod style;
mod text_index;
mod trace;

pub use config::HighlightConfig;
pub use page::Page;
pub use session::{
    JumpCallbacks, JumpEvent, JumpListener, MatchRecord, NoopJumpListener, SearchSession,
};
pub use style::SessionFactory;

pub(crate) use core_impl::{parse_html, unescape_string};
pub(crate) use selector::*;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("dom mutation error: {0}")]
    DomMutation(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

/// Handle to a node in a [`Page`].
///
/// Text nodes that a search splits, and spans that a clear reverts, are
/// released back to the page. Their slots are reused, and a handle to a
/// released node no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
    pub(crate) generation: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) id_index: HashMap<String, Vec<NodeId>>,
    // Released slots, reused by `create_node`.
    pub(crate) free: Vec<usize>,
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}

use std::fmt;

use super::*;
use crate::highlight::{apply_highlights, partition_matches, revert_spans};
use crate::style::StyleClasses;
use crate::text_index::{TextIndex, highlighted_offsets};
use crate::trace::TraceState;

/// One located occurrence: the selector it was found under and one span per
/// matched character, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    selector: String,
    spans: Vec<NodeId>,
}

impl MatchRecord {
    pub(crate) fn new(selector: &str, spans: Vec<NodeId>) -> Self {
        Self {
            selector: selector.to_string(),
            spans,
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn spans(&self) -> &[NodeId] {
        &self.spans
    }
}

/// Passed to both [`JumpListener`] hooks of a single jump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpEvent {
    /// Index that was asked for, before range checking.
    pub requested: isize,
    pub index: Option<usize>,
    pub selector: Option<String>,
    pub previous_index: Option<usize>,
    pub previous_selector: Option<String>,
}

/// Observer for focus changes. Both hooks default to doing nothing.
pub trait JumpListener {
    fn before_jump(&mut self, _event: &JumpEvent) {}

    fn after_jump(&mut self, _event: &JumpEvent) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopJumpListener;

impl JumpListener for NoopJumpListener {}

type JumpHook = Box<dyn FnMut(&JumpEvent)>;

/// Closure-backed [`JumpListener`].
///
/// ```
/// use search_highlight::JumpCallbacks;
///
/// let callbacks = JumpCallbacks::new().after(|event| {
///     println!("focused {:?}", event.index);
/// });
/// # let _ = callbacks;
/// ```
#[derive(Default)]
pub struct JumpCallbacks {
    before: Option<JumpHook>,
    after: Option<JumpHook>,
}

impl JumpCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(mut self, hook: impl FnMut(&JumpEvent) + 'static) -> Self {
        self.before = Some(Box::new(hook));
        self
    }

    pub fn after(mut self, hook: impl FnMut(&JumpEvent) + 'static) -> Self {
        self.after = Some(Box::new(hook));
        self
    }

    /// Takes over each hook `other` sets and keeps the rest.
    pub fn merge(&mut self, other: JumpCallbacks) {
        if let Some(hook) = other.before {
            self.before = Some(hook);
        }
        if let Some(hook) = other.after {
            self.after = Some(hook);
        }
    }
}

impl fmt::Debug for JumpCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JumpCallbacks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

impl JumpListener for JumpCallbacks {
    fn before_jump(&mut self, event: &JumpEvent) {
        if let Some(hook) = self.before.as_mut() {
            hook(event);
        }
    }

    fn after_jump(&mut self, event: &JumpEvent) {
        if let Some(hook) = self.after.as_mut() {
            hook(event);
        }
    }
}

enum Listener {
    Callbacks(JumpCallbacks),
    Custom(Box<dyn JumpListener>),
}

impl Listener {
    fn get(&mut self) -> &mut dyn JumpListener {
        match self {
            Listener::Callbacks(callbacks) => callbacks,
            Listener::Custom(listener) => listener.as_mut(),
        }
    }
}

/// A search context bound to a list of container selectors and one pair of
/// highlight classes. Created by [`SessionFactory`].
pub struct SearchSession {
    classes: StyleClasses,
    style_node: NodeId,
    selectors: Vec<String>,
    search_content: String,
    results: Vec<MatchRecord>,
    current: Option<usize>,
    listener: Listener,
    trace: TraceState,
}

impl fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSession")
            .field("highlight_class", &self.classes.highlight)
            .field("current_class", &self.classes.current)
            .field("selectors", &self.selectors)
            .field("search_content", &self.search_content)
            .field("results", &self.results.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl SearchSession {
    pub(crate) fn new(classes: StyleClasses, style_node: NodeId) -> Self {
        Self {
            classes,
            style_node,
            selectors: Vec::new(),
            search_content: String::new(),
            results: Vec::new(),
            current: None,
            listener: Listener::Callbacks(JumpCallbacks::new()),
            trace: TraceState::default(),
        }
    }

    /// Highlights every occurrence of `query` inside the configured containers.
    ///
    /// `selectors`, when given, replace the configured list first. Returns
    /// `Ok(None)` when no selectors are configured, otherwise the number of
    /// matches across all containers. Containers that resolve to nothing
    /// contribute no matches.
    pub fn search(
        &mut self,
        page: &mut Page,
        query: &str,
        selectors: Option<&[&str]>,
    ) -> Result<Option<usize>> {
        if let Some(selectors) = selectors {
            self.set_selector_list(page, selectors)?;
        }
        if self.selectors.is_empty() {
            self.trace.search_line("[search] skipped: no selectors".into());
            return Ok(None);
        }

        self.clear_search_data(page)?;
        self.search_content = query.to_string();
        self.trace.search_line(format!(
            "[search] start query={query:?} selectors={}",
            self.selectors.len()
        ));
        if query.is_empty() {
            return Ok(Some(0));
        }

        let query = query.chars().collect::<Vec<_>>();
        let selectors = self.selectors.clone();
        for selector in &selectors {
            self.search_container(page, selector, &query)?;
        }

        self.trace.search_line(format!(
            "[search] done query={:?} matches={}",
            self.search_content,
            self.results.len()
        ));
        Ok(Some(self.results.len()))
    }

    fn search_container(&mut self, page: &mut Page, selector: &str, query: &[char]) -> Result<()> {
        let Some(root) = page.dom.query_selector(selector)? else {
            self.trace
                .search_line(format!("[search] container missing selector={selector}"));
            return Ok(());
        };

        let index = TextIndex::build(&page.dom, root);
        let starts = index.find_all(query);
        self.trace.search_line(format!(
            "[search] container selector={selector} text_len={} matches={}",
            index.text.len(),
            starts.len()
        ));
        if starts.is_empty() {
            return Ok(());
        }

        let offsets = highlighted_offsets(&starts, query.len());
        let spans = apply_highlights(&mut page.dom, &index, &offsets, &self.classes.highlight)?;
        self.results.extend(partition_matches(
            selector,
            &starts,
            &offsets,
            &spans,
            query.len(),
        ));
        Ok(())
    }

    /// Replaces the container list and clears the current search.
    ///
    /// Every selector is parsed up front; on error nothing changes.
    pub fn set_selector_list(&mut self, page: &mut Page, selectors: &[&str]) -> Result<()> {
        for selector in selectors {
            parse_selector_groups(selector)?;
        }
        self.clear_search_data(page)?;
        self.selectors = selectors.iter().map(|s| s.to_string()).collect();
        Ok(())
    }

    /// Moves focus to match `index`. Indices outside `0..match_count()`
    /// leave no match focused.
    pub fn set_current(&mut self, page: &mut Page, index: isize) -> Result<()> {
        let previous = self.current;
        let next = usize::try_from(index)
            .ok()
            .filter(|index| *index < self.results.len());
        let event = JumpEvent {
            requested: index,
            index: next,
            selector: next.map(|i| self.results[i].selector.clone()),
            previous_index: previous,
            previous_selector: previous.map(|i| self.results[i].selector.clone()),
        };

        self.listener.get().before_jump(&event);
        if let Some(previous) = previous {
            self.mark_current(page, previous, false)?;
        }
        self.current = next;
        if let Some(next) = next {
            self.mark_current(page, next, true)?;
        }
        self.trace
            .jump_line(format!("[jump] requested={index} from={previous:?} to={next:?}"));
        self.listener.get().after_jump(&event);
        Ok(())
    }

    /// Adds or removes the current class on the spans of match `index`.
    /// Spans released by other code are skipped.
    fn mark_current(&self, page: &mut Page, index: usize, on: bool) -> Result<()> {
        let live = self.results[index]
            .spans
            .iter()
            .filter(|span| page.dom.is_valid_node(**span))
            .copied()
            .collect::<Vec<_>>();
        for span in live {
            if on {
                page.dom.class_add(span, &self.classes.current)?;
            } else {
                page.dom.class_remove(span, &self.classes.current)?;
            }
        }
        Ok(())
    }

    /// Focuses the following match, wrapping to the first. Returns the new
    /// index, or `None` when there are no matches.
    pub fn search_next(&mut self, page: &mut Page) -> Result<Option<usize>> {
        self.step(page, 1)
    }

    /// Focuses the preceding match, wrapping to the last.
    pub fn search_previous(&mut self, page: &mut Page) -> Result<Option<usize>> {
        self.step(page, -1)
    }

    fn step(&mut self, page: &mut Page, delta: isize) -> Result<Option<usize>> {
        if self.results.is_empty() {
            return Ok(None);
        }
        let count = self.results.len() as isize;
        let current = self.current.map_or(-1, |index| index as isize);
        self.set_current(page, (current + delta + count).rem_euclid(count))?;
        Ok(self.current)
    }

    /// Removes every highlight this session added and forgets the query.
    pub fn clear_search_data(&mut self, page: &mut Page) -> Result<()> {
        self.search_content.clear();
        self.current = None;
        let results = std::mem::take(&mut self.results);
        if results.is_empty() {
            return Ok(());
        }
        revert_spans(
            &mut page.dom,
            results.iter().flat_map(|record| record.spans.iter()),
        )?;
        self.trace
            .search_line(format!("[clear] reverted matches={}", results.len()));
        Ok(())
    }

    /// Replaces whatever listener or callbacks are registered.
    pub fn set_jump_listener(&mut self, listener: impl JumpListener + 'static) {
        self.listener = Listener::Custom(Box::new(listener));
    }

    /// Registers the hooks `callbacks` sets. A hook it leaves unset keeps the
    /// one registered by an earlier call.
    pub fn set_jump_callbacks(&mut self, callbacks: JumpCallbacks) {
        if let Listener::Callbacks(registered) = &mut self.listener {
            registered.merge(callbacks);
        } else {
            self.listener = Listener::Callbacks(callbacks);
        }
    }

    pub fn clear_jump_listener(&mut self) {
        self.listener = Listener::Callbacks(JumpCallbacks::new());
    }

    pub fn match_count(&self) -> usize {
        self.results.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn results(&self) -> &[MatchRecord] {
        &self.results
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    pub fn search_content(&self) -> &str {
        &self.search_content
    }

    pub fn highlight_class(&self) -> &str {
        &self.classes.highlight
    }

    pub fn current_class(&self) -> &str {
        &self.classes.current
    }

    /// The `<style>` element registered for this session's classes.
    pub fn style_node(&self) -> NodeId {
        self.style_node
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }

    pub fn set_trace_searches(&mut self, enabled: bool) {
        self.trace.searches = enabled;
    }

    pub fn set_trace_jumps(&mut self, enabled: bool) {
        self.trace.jumps = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        self.trace.set_limit(max_entries)
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take()
    }
}

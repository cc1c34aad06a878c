use std::collections::VecDeque;

use super::*;

#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) searches: bool,
    pub(crate) jumps: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            searches: true,
            jumps: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

impl TraceState {
    pub(crate) fn search_line(&mut self, line: String) {
        if self.enabled && self.searches {
            self.line(line);
        }
    }

    pub(crate) fn jump_line(&mut self, line: String) {
        if self.enabled && self.jumps {
            self.line(line);
        }
    }

    pub(crate) fn line(&mut self, line: String) {
        if !self.enabled {
            return;
        }
        log::debug!(target: "search_highlight", "{line}");
        if self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub(crate) fn set_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.log_limit = max_entries;
        while self.logs.len() > self.log_limit {
            self.logs.pop_front();
        }
        Ok(())
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        self.logs.drain(..).collect()
    }
}

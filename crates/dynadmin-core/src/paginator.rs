//! The "call until told to stop or the store runs dry" loop.
//!
//! The paginator knows nothing about page sizes. The caller injects a stop
//! predicate that sees everything accumulated so far together with the
//! token the last call returned.

use std::future::Future;

/// Store calls allowed per [`Paginator::paginate`] run unless configured.
pub const DEFAULT_MAX_CALLS: usize = 10;

/// Result of one underlying call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult<T, K> {
    pub items: Vec<T>,
    pub next_start_key: Option<K>,
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationResult<T, K> {
    /// Every item from every call, in order. May exceed any page size.
    pub items: Vec<T>,
    /// Token returned by the final call; `None` once the store is exhausted.
    pub last_start_key: Option<K>,
    pub calls: usize,
    /// The run ended because the call cap was reached while the store
    /// still had more and the predicate had not asked to stop.
    pub capped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    max_calls: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLS)
    }
}

impl Paginator {
    /// A paginator issuing at most `max_calls` calls per run (at least one).
    #[must_use]
    pub fn new(max_calls: usize) -> Self {
        Self {
            max_calls: max_calls.max(1),
        }
    }

    #[must_use]
    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Issue calls starting from `initial_start_key` until `should_stop`
    /// returns `true`, a call returns no token, or the call cap is reached.
    ///
    /// Calls run strictly one after another. The first failing call ends the
    /// run and its error is returned unchanged.
    pub async fn paginate<T, K, E, F, Fut, P>(
        &self,
        mut issue_call: F,
        initial_start_key: Option<K>,
        mut should_stop: P,
    ) -> Result<PaginationResult<T, K>, E>
    where
        F: FnMut(Option<K>) -> Fut,
        Fut: Future<Output = Result<CallResult<T, K>, E>>,
        P: FnMut(&[T], Option<&K>) -> bool,
    {
        let mut items = Vec::new();
        let mut start_key = initial_start_key;
        let mut calls = 0;

        loop {
            let result = issue_call(start_key.take()).await?;
            calls += 1;
            items.extend(result.items);
            let next = result.next_start_key;

            let stop = should_stop(items.as_slice(), next.as_ref());
            if stop || next.is_none() {
                return Ok(PaginationResult {
                    items,
                    last_start_key: next,
                    calls,
                    capped: false,
                });
            }
            if calls >= self.max_calls {
                return Ok(PaginationResult {
                    items,
                    last_start_key: next,
                    calls,
                    capped: true,
                });
            }
            start_key = next;
        }
    }
}

//! Caller-pushed log scopes.
//!
//! The stack is bound to the calling thread: formatting runs on the producer
//! thread (only the console write is deferred), so the stack is always valid
//! when a formatter walks it.

use crate::record::LogState;
use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static SCOPE_STACK: RefCell<Vec<LogState>> = const { RefCell::new(Vec::new()) };
}

/// Source of active scopes, visited outer to inner (stack bottom to top).
pub trait ScopeSource {
    fn for_each_scope(&self, visit: &mut dyn FnMut(&LogState));
}

/// The thread-bound scope stack shared by all loggers on this thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContextScopes;

impl CallContextScopes {
    /// Push a scope; it stays visible to every record formatted on this
    /// thread until the returned guard drops.
    pub fn push(scope: LogState) -> ScopeGuard {
        SCOPE_STACK.with(|stack| stack.borrow_mut().push(scope));
        ScopeGuard {
            _not_send: PhantomData,
        }
    }
}

impl ScopeSource for CallContextScopes {
    fn for_each_scope(&self, visit: &mut dyn FnMut(&LogState)) {
        SCOPE_STACK.with(|stack| {
            for scope in stack.borrow().iter() {
                visit(scope);
            }
        });
    }
}

/// Pops its scope on drop, on every exit path. Not `Send`: a scope must be
/// released on the thread that pushed it.
pub struct ScopeGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Render the active scopes into `buf`: `prefix` then `"=> "` before the
/// first scope, `" => "` before each subsequent one.
///
/// Returns whether anything was written. The check is length-delta based
/// rather than visit-based because a scope's own text may be empty while the
/// separators are not.
pub fn render_scopes(scopes: &dyn ScopeSource, buf: &mut String, prefix: Option<&str>) -> bool {
    let start = buf.len();
    let mut first = true;
    scopes.for_each_scope(&mut |scope| {
        if first {
            if let Some(prefix) = prefix {
                buf.push_str(prefix);
            }
            buf.push_str("=> ");
            first = false;
        } else {
            buf.push_str(" => ");
        }
        scope.write_text(buf);
    });
    buf.len() > start
}

/// Fixed scope list for exercising renderers without thread-local state.
#[cfg(test)]
pub(crate) struct FixedScopes(pub(crate) Vec<LogState>);

#[cfg(test)]
impl ScopeSource for FixedScopes {
    fn for_each_scope(&self, visit: &mut dyn FnMut(&LogState)) {
        for scope in &self.0 {
            visit(scope);
        }
    }
}

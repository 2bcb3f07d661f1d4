use crate::error::StreamResult;
use std::fmt;

/// Signals that an asynchronous hook finished.
///
/// Hooks receive a `Completion` and must eventually call [`complete`](Self::complete). Because the
/// method consumes the completion, a hook can report completion at most once. A completion that is
/// dropped without being called stalls the stream until it is destroyed.
pub struct Completion(Box<dyn FnOnce(StreamResult<()>)>);

impl Completion {
    pub(crate) fn new(f: impl FnOnce(StreamResult<()>) + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Report the outcome of the hook.
    pub fn complete(self, result: StreamResult<()>) {
        (self.0)(result)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Completion")
    }
}

use std::fmt;

/// Opaque registration token returned by [`EventSource::add`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct EventToken(u64);

impl EventToken {
    /// Raw token value, for hosts that need to marshal it.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Handlers in registration order.
///
/// Invocation visits handlers in order and stops at the first failure. The list
/// itself is never modified by an invocation.
pub struct EventSource<H: ?Sized> {
    next_token: u64,
    handlers: Vec<(EventToken, Box<H>)>,
}

impl<H: ?Sized> EventSource<H> {
    pub fn new() -> Self {
        Self {
            next_token: 1,
            handlers: Vec::new(),
        }
    }

    pub fn add(&mut self, handler: Box<H>) -> EventToken {
        let token = EventToken(self.next_token);
        self.next_token += 1;
        self.handlers.push((token, handler));
        token
    }

    /// Removes the handler registered under `token`. Returns false if unknown.
    pub fn remove(&mut self, token: EventToken) -> bool {
        match self.handlers.iter().position(|(t, _)| *t == token) {
            Some(index) => {
                self.handlers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Calls `invoke` on each handler in order, stopping at the first error.
    pub fn invoke_all<E>(&mut self, mut invoke: impl FnMut(&mut H) -> Result<(), E>) -> Result<(), E> {
        for (_, handler) in self.handlers.iter_mut() {
            invoke(handler.as_mut())?;
        }
        Ok(())
    }

    /// Calls `invoke` on the single handler registered under `token`.
    ///
    /// Returns `None` when the token is unknown.
    pub fn invoke_one<R>(&mut self, token: EventToken, invoke: impl FnOnce(&mut H) -> R) -> Option<R> {
        self.handlers
            .iter_mut()
            .find(|(t, _)| *t == token)
            .map(|(_, handler)| invoke(handler.as_mut()))
    }
}

impl<H: ?Sized> Default for EventSource<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> fmt::Debug for EventSource<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("tokens", &self.handlers.iter().map(|(t, _)| t.0).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Handler = dyn FnMut(&mut Vec<&'static str>) -> Result<(), &'static str>;

    fn recorder(name: &'static str) -> Box<Handler> {
        Box::new(move |log: &mut Vec<&'static str>| {
            log.push(name);
            Ok(())
        })
    }

    fn failing(name: &'static str) -> Box<Handler> {
        Box::new(move |log: &mut Vec<&'static str>| {
            log.push(name);
            Err(name)
        })
    }

    #[test]
    fn invokes_in_registration_order() {
        let mut src: EventSource<Handler> = EventSource::new();
        src.add(recorder("a"));
        src.add(recorder("b"));
        src.add(recorder("c"));

        let mut log = Vec::new();
        src.invoke_all(|h| h(&mut log)).unwrap();
        assert_eq!(log, ["a", "b", "c"]);
    }

    #[test]
    fn stops_at_first_failure_without_touching_the_list() {
        let mut src: EventSource<Handler> = EventSource::new();
        src.add(recorder("a"));
        src.add(failing("b"));
        src.add(recorder("c"));

        let mut log = Vec::new();
        let err = src.invoke_all(|h| h(&mut log)).unwrap_err();
        assert_eq!(err, "b");
        assert_eq!(log, ["a", "b"]);
        assert_eq!(src.len(), 3);
    }

    #[test]
    fn remove_middle_preserves_order() {
        let mut src: EventSource<Handler> = EventSource::new();
        let _a = src.add(recorder("a"));
        let b = src.add(recorder("b"));
        let _c = src.add(recorder("c"));

        assert!(src.remove(b));
        assert_eq!(src.len(), 2);

        let mut log = Vec::new();
        src.invoke_all(|h| h(&mut log)).unwrap();
        assert_eq!(log, ["a", "c"]);
    }

    #[test]
    fn tokens_are_unique_after_removal() {
        let mut src: EventSource<Handler> = EventSource::new();
        let a = src.add(recorder("a"));
        src.remove(a);
        let b = src.add(recorder("b"));
        assert_ne!(a, b);
    }

    #[test]
    fn removing_unknown_token_is_reported() {
        let mut src: EventSource<Handler> = EventSource::new();
        let a = src.add(recorder("a"));
        assert!(src.remove(a));
        assert!(!src.remove(a));
    }

    #[test]
    fn invoke_one_targets_a_single_handler() {
        let mut src: EventSource<Handler> = EventSource::new();
        src.add(recorder("a"));
        let b = src.add(recorder("b"));

        let mut log = Vec::new();
        assert_eq!(src.invoke_one(b, |h| h(&mut log)), Some(Ok(())));
        assert_eq!(log, ["b"]);
    }
}

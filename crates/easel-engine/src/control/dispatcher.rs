use crate::error::{CallbackKind, ControlError, Result};
use crate::event::{EventSource, EventToken};
use crate::paint::Color;
use crate::time::FrameTime;

use super::surface::{DrawingSession, RenderSurface};

/// Payload handed to draw callbacks.
pub struct DrawEventArgs<'s, S> {
    session: &'s mut S,
    timing: Option<FrameTime>,
}

impl<'s, S> DrawEventArgs<'s, S> {
    pub fn new(session: &'s mut S, timing: Option<FrameTime>) -> Self {
        Self { session, timing }
    }

    pub fn session(&mut self) -> &mut S {
        self.session
    }

    /// Frame timing, for variants that provide it.
    pub fn timing(&self) -> Option<FrameTime> {
        self.timing
    }
}

/// Draw callback. Runs on the affinity thread.
pub type DrawHandler<S> = dyn FnMut(&mut DrawEventArgs<'_, S>) -> anyhow::Result<()>;

/// Closes the session when dropped unless closed explicitly.
struct SessionGuard<S: DrawingSession> {
    session: Option<S>,
}

impl<S: DrawingSession> SessionGuard<S> {
    fn get(&mut self) -> Option<&mut S> {
        self.session.as_mut()
    }

    fn close(mut self) -> anyhow::Result<()> {
        match self.session.take() {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }
}

impl<S: DrawingSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(err) = session.close() {
                log::error!("failed to close drawing session after an aborted frame: {err:#}");
            }
        }
    }
}

/// Ordered draw callbacks plus the per-frame drawing sequence.
pub struct DrawDispatcher<S: 'static> {
    handlers: EventSource<DrawHandler<S>>,
}

impl<S: DrawingSession + 'static> DrawDispatcher<S> {
    pub fn new() -> Self {
        Self {
            handlers: EventSource::new(),
        }
    }

    pub fn add<F>(&mut self, handler: F) -> EventToken
    where
        F: FnMut(&mut DrawEventArgs<'_, S>) -> anyhow::Result<()> + 'static,
    {
        let handler: Box<DrawHandler<S>> = Box::new(handler);
        self.handlers.add(handler)
    }

    pub fn remove(&mut self, token: EventToken) -> bool {
        self.handlers.remove(token)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Draws one frame on `target`.
    ///
    /// Creates a session cleared to `clear`; when `invoke_callbacks` is set, builds
    /// the payload with `make_args` and runs every callback in order, stopping at
    /// the first failure. The session is closed on every path.
    pub fn draw<T, A>(
        &mut self,
        target: &mut T,
        clear: Color,
        invoke_callbacks: bool,
        make_args: A,
    ) -> Result<()>
    where
        T: RenderSurface<Session = S>,
        A: for<'s> FnOnce(&'s mut S) -> DrawEventArgs<'s, S>,
    {
        let session = target
            .create_drawing_session(clear)
            .map_err(|err| ControlError::platform("failed to create drawing session", err))?;
        let mut guard = SessionGuard {
            session: Some(session),
        };

        if invoke_callbacks {
            if let Some(session) = guard.get() {
                let mut args = make_args(session);
                self.handlers
                    .invoke_all(|handler| handler(&mut args))
                    .map_err(|err| ControlError::callback(CallbackKind::Draw, err))?;
            }
        }

        guard
            .close()
            .map_err(|err| ControlError::platform("failed to close drawing session", err))
    }
}

impl<S: DrawingSession + 'static> Default for DrawDispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::control::surface::BackgroundMode;
    use crate::coords::Size;
    use crate::device::{DeviceId, GraphicsDevice};
    use crate::error::ErrorKind;

    #[derive(Clone)]
    struct Dev;

    impl GraphicsDevice for Dev {
        fn id(&self) -> DeviceId {
            DeviceId::next()
        }
        fn is_lost(&self) -> bool {
            false
        }
        fn trim(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    type Log = Rc<RefCell<Vec<String>>>;

    struct Session {
        log: Log,
    }

    impl DrawingSession for Session {
        fn close(self) -> anyhow::Result<()> {
            self.log.borrow_mut().push("close".into());
            Ok(())
        }
    }

    struct Target {
        log: Log,
        fail_session: bool,
    }

    impl RenderSurface for Target {
        type Device = Dev;
        type Session = Session;

        fn create(_: &Dev, _: BackgroundMode, _: f32, _: Size) -> anyhow::Result<Self> {
            anyhow::bail!("not used")
        }

        fn device_id(&self) -> DeviceId {
            DeviceId::next()
        }

        fn create_drawing_session(&mut self, clear: Color) -> anyhow::Result<Session> {
            anyhow::ensure!(!self.fail_session, "device removed");
            self.log.borrow_mut().push(format!("open {}", clear.a));
            Ok(Session { log: self.log.clone() })
        }
    }

    fn target() -> (Target, Log) {
        let log: Log = Rc::default();
        (
            Target {
                log: log.clone(),
                fail_session: false,
            },
            log,
        )
    }

    fn named(log: Log, name: &'static str) -> impl FnMut(&mut DrawEventArgs<'_, Session>) -> anyhow::Result<()> + 'static {
        move |_| {
            log.borrow_mut().push(name.into());
            Ok(())
        }
    }

    fn plain_args(session: &mut Session) -> DrawEventArgs<'_, Session> {
        DrawEventArgs::new(session, None)
    }

    #[test]
    fn callbacks_run_in_order_between_open_and_close() {
        let (mut t, log) = target();
        let mut d = DrawDispatcher::new();
        d.add(named(log.clone(), "a"));
        d.add(named(log.clone(), "b"));

        d.draw(&mut t, Color::BLACK, true, plain_args).unwrap();
        assert_eq!(*log.borrow(), ["open 255", "a", "b", "close"]);
    }

    #[test]
    fn no_callbacks_when_not_requested() {
        let (mut t, log) = target();
        let mut d = DrawDispatcher::new();
        d.add(named(log.clone(), "a"));

        d.draw(&mut t, Color::TRANSPARENT, false, plain_args).unwrap();
        assert_eq!(*log.borrow(), ["open 0", "close"]);
    }

    #[test]
    fn failure_skips_rest_and_still_closes() {
        let (mut t, log) = target();
        let mut d = DrawDispatcher::new();
        d.add(named(log.clone(), "a"));
        let l = log.clone();
        d.add(move |_: &mut DrawEventArgs<'_, Session>| {
            l.borrow_mut().push("b".into());
            anyhow::bail!("bad brush")
        });
        d.add(named(log.clone(), "c"));

        let err = d.draw(&mut t, Color::BLACK, true, plain_args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Callback);
        assert_eq!(*log.borrow(), ["open 255", "a", "b", "close"]);
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn session_creation_failure_is_a_platform_error() {
        let (mut t, log) = target();
        t.fail_session = true;
        let mut d = DrawDispatcher::new();
        d.add(named(log.clone(), "a"));

        let err = d.draw(&mut t, Color::BLACK, true, plain_args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Platform);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn payload_exposes_session_and_timing() {
        let (mut t, log) = target();
        let mut d = DrawDispatcher::new();
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        d.add(move |args: &mut DrawEventArgs<'_, Session>| {
            args.session().log.borrow_mut().push("drawn".into());
            *s.borrow_mut() = args.timing().map(|t| t.frame_index);
            Ok(())
        });

        let mut clock = crate::time::FrameClock::new();
        d.draw(&mut t, Color::BLACK, true, |session| {
            DrawEventArgs::new(session, Some(clock.tick()))
        })
        .unwrap();

        assert_eq!(*seen.borrow(), Some(0));
        assert_eq!(*log.borrow(), ["open 255", "drawn", "close"]);
    }
}

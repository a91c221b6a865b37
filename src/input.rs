//! Input events and listener registration.
//!
//! The host translates raw window events into [`InputEvent`]s and hands them
//! to the engine. Effects subscribe through [`Listeners`], which returns a
//! handle per registration so everything an engine registered can be removed
//! again on teardown.
//!
//! # Usage
//!
//! ```ignore
//! let mut listeners = Listeners::<Scene>::new();
//! let handle = listeners.register(EventKind::PointerMove, |scene, event, now| {
//!     if let InputEvent::PointerMoved { position } = event {
//!         scene.cursor.pointer_moved(*position, now);
//!     }
//! });
//!
//! listeners.dispatch(&mut scene, &event, now);
//! listeners.deregister(handle);
//! ```

use std::fmt;

use glam::Vec2;
use winit::event::{ElementState, WindowEvent};

use crate::time::Millis;

/// Input the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer moved to `position` (viewport pixels).
    PointerMoved { position: Vec2 },
    /// Any pointer button went down.
    PointerDown,
    /// Any pointer button went up.
    PointerUp,
    /// Viewport changed size.
    Resized { width: u32, height: u32 },
}

impl InputEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InputEvent::PointerMoved { .. } => EventKind::PointerMove,
            InputEvent::PointerDown | InputEvent::PointerUp => EventKind::PointerButton,
            InputEvent::Resized { .. } => EventKind::Resize,
        }
    }

    /// Translate a winit window event. Events the engine does not consume
    /// map to `None`.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved {
                position: Vec2::new(position.x as f32, position.y as f32),
            }),
            WindowEvent::MouseInput { state, .. } => Some(match state {
                ElementState::Pressed => InputEvent::PointerDown,
                ElementState::Released => InputEvent::PointerUp,
            }),
            WindowEvent::Resized(size) => Some(InputEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            _ => None,
        }
    }
}

/// Event categories listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    PointerButton,
    Resize,
}

/// Handle returned by [`Listeners::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type ListenerFn<S> = Box<dyn FnMut(&mut S, &InputEvent, Millis)>;

struct Listener<S> {
    handle: ListenerHandle,
    kind: EventKind,
    callback: ListenerFn<S>,
}

/// Registry of input listeners over some state `S`.
pub struct Listeners<S> {
    entries: Vec<Listener<S>>,
    next_id: u64,
}

impl<S> Listeners<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribe `callback` to events of `kind`.
    pub fn register<F>(&mut self, kind: EventKind, callback: F) -> ListenerHandle
    where
        F: FnMut(&mut S, &InputEvent, Millis) + 'static,
    {
        let handle = ListenerHandle(self.next_id);
        self.next_id += 1;
        self.entries.push(Listener {
            handle,
            kind,
            callback: Box::new(callback),
        });
        handle
    }

    /// Remove a listener. Unknown handles are ignored; returns whether one
    /// was removed.
    pub fn deregister(&mut self, handle: ListenerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|l| l.handle != handle);
        self.entries.len() != before
    }

    /// Remove every listener.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver `event` to every listener of its kind, in registration order.
    /// Returns how many listeners ran.
    pub fn dispatch(&mut self, state: &mut S, event: &InputEvent, now: Millis) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for listener in self.entries.iter_mut().filter(|l| l.kind == kind) {
            (listener.callback)(state, event, now);
            delivered += 1;
        }
        delivered
    }
}

impl<S> Default for Listeners<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Listeners<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|l| (l.handle, l.kind)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kinds() {
        assert_eq!(
            InputEvent::PointerMoved { position: Vec2::ZERO }.kind(),
            EventKind::PointerMove
        );
        assert_eq!(InputEvent::PointerDown.kind(), EventKind::PointerButton);
        assert_eq!(InputEvent::PointerUp.kind(), EventKind::PointerButton);
        assert_eq!(
            InputEvent::Resized { width: 1, height: 1 }.kind(),
            EventKind::Resize
        );
    }

    #[test]
    fn test_dispatch_by_kind() {
        let mut listeners = Listeners::<Vec<&'static str>>::new();
        listeners.register(EventKind::PointerMove, |log, _, _| log.push("move"));
        listeners.register(EventKind::Resize, |log, _, _| log.push("resize"));
        listeners.register(EventKind::PointerMove, |log, _, _| log.push("move2"));

        let mut log = Vec::new();
        let moved = InputEvent::PointerMoved {
            position: Vec2::new(1.0, 2.0),
        };
        assert_eq!(listeners.dispatch(&mut log, &moved, 0), 2);
        assert_eq!(log, vec!["move", "move2"]);

        assert_eq!(listeners.dispatch(&mut log, &InputEvent::PointerDown, 0), 0);
    }

    #[test]
    fn test_deregister_is_idempotent() {
        let mut listeners = Listeners::<u32>::new();
        let handle = listeners.register(EventKind::Resize, |n, _, _| *n += 1);
        assert!(listeners.deregister(handle));
        assert!(!listeners.deregister(handle));
        assert!(listeners.is_empty());

        let mut n = 0;
        listeners.dispatch(&mut n, &InputEvent::Resized { width: 2, height: 2 }, 0);
        assert_eq!(n, 0);
    }

    #[test]
    fn test_listener_sees_timestamp() {
        let mut listeners = Listeners::<Millis>::new();
        listeners.register(EventKind::PointerButton, |seen, _, now| *seen = now);
        let mut seen = 0;
        listeners.dispatch(&mut seen, &InputEvent::PointerUp, 1234);
        assert_eq!(seen, 1234);
    }
}

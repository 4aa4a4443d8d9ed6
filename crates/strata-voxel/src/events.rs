//! Tile change notification.
//!
//! [`WorldListener`] is the boundary to whatever wants to know about edits (the
//! renderer widening its dirty region, audio, networking). [`TileEventBuffer`]
//! is a double-buffered listener that collects events per frame.

use std::sync::{Mutex, PoisonError};

/// Handle returned when a listener is registered, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Notified after every effective tile change, with absolute block coordinates.
pub trait WorldListener: Send + Sync {
    /// Called after the tile at `(x, y, z)` changed value.
    fn on_tile_changed(&self, x: i32, y: i32, z: i32);
}

/// Emitted when a single tile changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileChangedEvent {
    /// Absolute block X.
    pub x: i32,
    /// Absolute block Y.
    pub y: i32,
    /// Absolute block Z.
    pub z: i32,
}

#[derive(Default)]
struct Buffers {
    prev: Vec<TileChangedEvent>,
    current: Vec<TileChangedEvent>,
}

/// Double-buffered event storage for tile changes.
///
/// Events written in the current frame are readable in the current and next frame.
/// Call [`swap`](TileEventBuffer::swap) once per frame.
#[derive(Default)]
pub struct TileEventBuffer {
    buffers: Mutex<Buffers>,
}

impl TileEventBuffer {
    /// Creates a new empty event buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tile change.
    pub fn send(&self, event: TileChangedEvent) {
        self.lock().current.push(event);
    }

    /// Copies out all readable events (previous + current frame).
    pub fn read(&self) -> Vec<TileChangedEvent> {
        let buffers = self.lock();
        buffers.prev.iter().chain(buffers.current.iter()).copied().collect()
    }

    /// Number of readable events.
    pub fn len(&self) -> usize {
        let buffers = self.lock();
        buffers.prev.len() + buffers.current.len()
    }

    /// Returns `true` if there are no readable events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances the frame: previous events are dropped, current becomes previous.
    pub fn swap(&self) {
        let mut buffers = self.lock();
        let Buffers { prev, current } = &mut *buffers;
        prev.clear();
        std::mem::swap(prev, current);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffers> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorldListener for TileEventBuffer {
    fn on_tile_changed(&self, x: i32, y: i32, z: i32) {
        self.send(TileChangedEvent { x, y, z });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_records_events() {
        let buffer = TileEventBuffer::new();
        buffer.on_tile_changed(1, 2, 3);
        buffer.on_tile_changed(-4, 5, 6);
        assert_eq!(
            buffer.read(),
            vec![
                TileChangedEvent { x: 1, y: 2, z: 3 },
                TileChangedEvent { x: -4, y: 5, z: 6 },
            ]
        );
    }

    #[test]
    fn test_events_survive_one_swap() {
        let buffer = TileEventBuffer::new();
        buffer.on_tile_changed(0, 0, 0);
        buffer.swap();
        assert_eq!(buffer.len(), 1, "previous frame still readable");
        buffer.swap();
        assert!(buffer.is_empty(), "dropped after second swap");
    }
}

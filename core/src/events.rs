use serde::{Deserialize, Serialize};

use crate::*;

/// Notifications for presentation, audio, and hint collaborators. The engine
/// queues these as it mutates; callers drain them with
/// [`BoardEngine::take_events`](crate::BoardEngine::take_events).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BoardEvent {
    SelectionStarted {
        at: Coord2,
    },
    MatchResolved {
        pair: (Coord2, Coord2),
        score: u32,
        turns: u8,
    },
    MismatchResolved {
        pair: (Coord2, Coord2),
    },
    /// The board had no connectable pair left and its remaining kinds were
    /// redistributed; `regenerated` marks the bounded-retry fallback where a
    /// whole fresh board was built instead.
    DeadlockReshuffled {
        regenerated: bool,
    },
    BoardCleared {
        score: u32,
    },
}

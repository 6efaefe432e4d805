use super::queue::Queue;
use crate::protocol::Track;

/// What the player does once the backend reports the end of a track.
#[derive(Debug, Clone, PartialEq)]
pub enum Continuation {
    /// Play the same track again; the queue is left untouched.
    Repeat(Track),
    /// A new current track is ready to be played.
    Advance { finished: Option<Track> },
    /// Nothing left to play.
    Exhausted { finished: Option<Track> },
}

/// Rotates `queue` after a track ended and decides how playback continues.
pub fn advance(queue: &mut Queue, track_repeat: bool, queue_repeat: bool) -> Continuation {
    if track_repeat {
        if let Some(current) = queue.current() {
            return Continuation::Repeat(current.clone());
        }
    }

    let can_refill = queue_repeat && queue.current().is_some();
    if queue.is_empty() && !can_refill {
        let finished = queue.take_current();
        if finished.is_some() {
            queue.set_previous(finished.clone());
        }
        return Continuation::Exhausted { finished };
    }

    let finished = queue.take_current();
    if finished.is_some() {
        queue.set_previous(finished.clone());
    }

    let next = queue.shift().map(|mut track| {
        track.stream_position = 0;
        track
    });
    queue.set_current(next);

    if queue_repeat {
        if let Some(track) = finished.clone() {
            queue.add([track]);
        }
    }

    if queue.current().is_some() {
        Continuation::Advance { finished }
    } else {
        Continuation::Exhausted { finished }
    }
}

// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use alloc::vec::Vec;
use core::iter;

use crate::fault::{Fault, IntegrityFault};

/// Type for a cycle stamp. Never wraps and never goes backwards.
pub type Time = u64;

/// Handle to an event record registered with a [Clock].
/// The subsystem that registered the event keeps the handle; the clock
/// only threads the record into and out of its sorted list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EventId(u16);

/// The forward link that points at a scheduled event.
/// Storing this instead of a predecessor makes unlinking the head
/// the same operation as unlinking anything else.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
enum ForwardLink {
    Head,
    After(EventId),
}

/// An event record.
#[derive(Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
struct EventRecord<E: Kind> {
    /// Kind of event, dispatched by the owning system once popped
    #[cfg_attr(feature = "serde", serde(bound = ""))]
    kind: E,
    /// Cycle stamp to fire at
    when: Time,
    next: Option<EventId>,
    /// `None` while not scheduled.
    pprev: Option<ForwardLink>,
}

/// A clock domain: a cycle counter plus a sorted, intrusive list of pending
/// events. Each domain is generic over the possible events of its system.
///
/// Insertion scans linearly for the sorted position; removal is O(1).
/// There usually are fewer than a dozen events pending, where this beats
/// a heap.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Clock<E: Kind> {
    /// Current time of the clock.
    cycle_stamp: Time,
    /// Time the CPU may run until before events need handling.
    target_stamp: Time,
    /// Earliest scheduled event.
    head: Option<EventId>,
    /// All registered event records, scheduled or not.
    #[cfg_attr(feature = "serde", serde(bound = ""))]
    events: Vec<EventRecord<E>>,
    /// How far to run ahead when nothing is scheduled.
    lookahead: Time,
}

impl<E: Kind> Clock<E> {
    /// Lookahead when no event is scheduled, in cycles of the fastest
    /// processor on the clock.
    pub const IDLE_LOOKAHEAD: Time = 16;

    /// Create a new clock. `clock_scale` is the amount of clock ticks
    /// per cycle of the fastest processor on this clock.
    pub fn new(clock_scale: Time) -> Self {
        let lookahead = Self::IDLE_LOOKAHEAD * clock_scale;
        Self {
            cycle_stamp: 0,
            target_stamp: lookahead,
            head: None,
            events: Vec::new(),
            lookahead,
        }
    }

    /// Register a new event record of the given kind. It starts out
    /// unscheduled. A clock holds at most 65536 records.
    pub fn register(&mut self, kind: E) -> Result<EventId, Fault> {
        let id = u16::try_from(self.events.len())
            .map(EventId)
            .map_err(|_| IntegrityFault::TooManyEvents)?;
        self.events.push(EventRecord {
            kind,
            when: 0,
            next: None,
            pprev: None,
        });
        Ok(id)
    }

    /// Schedule an event to fire at the given cycle stamp.
    /// Events with equal stamps fire in the order they were scheduled.
    pub fn schedule(&mut self, id: EventId, when: Time) -> Result<(), Fault> {
        self.check_deadline(when)?;
        if self.rec(id).pprev.is_some() {
            return Err(IntegrityFault::AlreadyScheduled(id.0).into());
        }

        let mut pprev = ForwardLink::Head;
        let mut next = self.head;
        while let Some(cur) = next {
            if self.rec(cur).when > when {
                break;
            }
            pprev = ForwardLink::After(cur);
            next = self.rec(cur).next;
        }

        self.set_forward(pprev, Some(id));
        if let Some(next) = next {
            self.rec_mut(next).pprev = Some(ForwardLink::After(id));
        }
        let event = self.rec_mut(id);
        event.when = when;
        event.next = next;
        event.pprev = Some(pprev);

        self.update_target_stamp();
        Ok(())
    }

    /// Schedule an event to fire the given amount of ticks from now.
    pub fn schedule_in(&mut self, id: EventId, after: Time) -> Result<(), Fault> {
        self.schedule(id, self.cycle_stamp + after)
    }

    /// Remove a scheduled event from the list.
    pub fn cancel(&mut self, id: EventId) -> Result<(), Fault> {
        let event = *self.rec(id);
        let Some(pprev) = event.pprev else {
            return Err(IntegrityFault::NotScheduled(id.0).into());
        };
        self.check_deadline(event.when)?;

        self.unlink(id, pprev, event.next);
        self.update_target_stamp();
        Ok(())
    }

    /// Remove and return the earliest event, if any.
    pub fn pop_earliest(&mut self) -> Result<Option<EventId>, Fault> {
        let Some(id) = self.head else {
            return Ok(None);
        };
        let event = *self.rec(id);
        self.check_deadline(event.when)?;

        self.unlink(id, ForwardLink::Head, event.next);
        self.update_target_stamp();
        Ok(Some(id))
    }

    /// Remove and return the earliest event, but only if it is due.
    pub fn pop_due(&mut self) -> Result<Option<EventId>, Fault> {
        match self.head {
            Some(id) if self.rec(id).when <= self.cycle_stamp => self.pop_earliest(),
            _ => Ok(None),
        }
    }

    /// Get the earliest event without removing it.
    #[inline]
    pub fn peek_earliest(&self) -> Option<EventId> {
        self.head
    }

    /// Iterate all scheduled events, earliest first.
    pub fn pending(&self) -> impl Iterator<Item = EventId> + '_ {
        iter::successors(self.head, move |id| self.rec(*id).next)
    }

    /// The cycle stamp the CPU should run to before checking events again.
    #[inline]
    pub fn target_stamp(&self) -> Time {
        self.target_stamp
    }

    #[inline]
    pub fn cycle_stamp(&self) -> Time {
        self.cycle_stamp
    }

    /// Advance the clock by the given amount of ticks.
    #[inline]
    pub fn advance(&mut self, by: Time) {
        self.cycle_stamp += by;
    }

    /// Move the clock forward to the given stamp.
    pub fn advance_to(&mut self, stamp: Time) -> Result<(), Fault> {
        if stamp < self.cycle_stamp {
            return Err(IntegrityFault::TimeReversed {
                now: self.cycle_stamp,
                to: stamp,
            }
            .into());
        }
        self.cycle_stamp = stamp;
        Ok(())
    }

    pub fn is_scheduled(&self, id: EventId) -> bool {
        self.rec(id).pprev.is_some()
    }

    /// Stamp the event was last scheduled for.
    pub fn when(&self, id: EventId) -> Time {
        self.rec(id).when
    }

    pub fn kind(&self, id: EventId) -> E {
        self.rec(id).kind
    }

    fn unlink(&mut self, id: EventId, pprev: ForwardLink, next: Option<EventId>) {
        if let Some(next) = next {
            self.rec_mut(next).pprev = Some(pprev);
        }
        self.set_forward(pprev, next);

        let event = self.rec_mut(id);
        event.next = None;
        event.pprev = None;
    }

    fn set_forward(&mut self, link: ForwardLink, to: Option<EventId>) {
        match link {
            ForwardLink::Head => self.head = to,
            ForwardLink::After(prev) => self.rec_mut(prev).next = to,
        }
    }

    fn update_target_stamp(&mut self) {
        self.target_stamp = match self.head {
            Some(id) => self.rec(id).when,
            // Nothing scheduled. Run a little, but not so far that we
            // overshoot whatever gets scheduled next by much.
            None => self.cycle_stamp + self.lookahead,
        };
    }

    /// Events may never be touched after they should have fired.
    /// Only checked in debug builds.
    #[inline]
    fn check_deadline(&self, when: Time) -> Result<(), Fault> {
        if cfg!(debug_assertions) && when < self.cycle_stamp {
            return Err(IntegrityFault::EventInPast {
                now: self.cycle_stamp,
                when,
            }
            .into());
        }
        Ok(())
    }

    #[inline]
    fn rec(&self, id: EventId) -> &EventRecord<E> {
        &self.events[id.0 as usize]
    }

    #[inline]
    fn rec_mut(&mut self, id: EventId) -> &mut EventRecord<E> {
        &mut self.events[id.0 as usize]
    }
}

/// Trait for event kinds.
#[cfg(feature = "serde")]
pub trait Kind:
    for<'de> serde::Deserialize<'de> + serde::Serialize + PartialEq + Copy + Clone
{
}
#[cfg(not(feature = "serde"))]
pub trait Kind: PartialEq + Copy + Clone {}

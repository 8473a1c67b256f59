use std::fmt;

use bevy::log::{debug, warn};

/// Links carriers to the barriers they hold shut. Zero means "no tag".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct BarrierTag(pub i8);

impl BarrierTag {
    pub const NONE: BarrierTag = BarrierTag(0);

    pub fn is_none(self) -> bool {
        self == BarrierTag::NONE
    }

    /// Values outside the i8 range are treated as "no tag".
    pub fn from_aux(value: i32) -> Self {
        i8::try_from(value).map(BarrierTag).unwrap_or(BarrierTag::NONE)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RequestRejected {
    NoTag,
    Full,
    AlreadyQueued,
}

impl fmt::Display for RequestRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestRejected::NoTag => write!(f, "tag 0 cannot be checked"),
            RequestRejected::Full => write!(f, "barrier request stack is full"),
            RequestRejected::AlreadyQueued => write!(f, "tag already queued"),
        }
    }
}

impl std::error::Error for RequestRejected {}

/// One entity kind able to keep a barrier closed.
pub struct CarrierKind<S> {
    pub name: &'static str,
    pub holds_tag: fn(&S, BarrierTag) -> bool,
}

/// Bounded set of tags waiting for the end-of-tick scan. No tag appears twice.
#[derive(Debug, Clone)]
pub struct BarrierCheckRequestStack {
    tags: Vec<BarrierTag>,
    capacity: usize,
}

impl BarrierCheckRequestStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            tags: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: BarrierTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn send(&mut self, tag: BarrierTag) -> Result<(), RequestRejected> {
        let rejected = if tag.is_none() {
            RequestRejected::NoTag
        } else if self.tags.contains(&tag) {
            RequestRejected::AlreadyQueued
        } else if self.tags.len() >= self.capacity {
            RequestRejected::Full
        } else {
            self.tags.push(tag);
            return Ok(());
        };
        match rejected {
            RequestRejected::AlreadyQueued => {
                debug!("[Tileworld barrier] Tag {} already queued", tag.0);
            }
            _ => warn!("[Tileworld barrier] Check request for tag {} dropped: {}", tag.0, rejected),
        }
        Err(rejected)
    }

    /// Queued tags no live carrier holds anymore. Does not clear the stack.
    pub fn orphaned_tags<S>(&self, carriers: &[CarrierKind<S>], state: &S) -> Vec<BarrierTag> {
        self.tags
            .iter()
            .copied()
            .filter(|&tag| {
                !carriers.iter().any(|carrier| {
                    let held = (carrier.holds_tag)(state, tag);
                    if held {
                        debug!("[Tileworld barrier] Tag {} still held by a {}", tag.0, carrier.name);
                    }
                    held
                })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Holders {
        guards: Vec<BarrierTag>,
        switches: Vec<BarrierTag>,
    }

    fn guards_hold(state: &Holders, tag: BarrierTag) -> bool {
        state.guards.contains(&tag)
    }

    fn switches_hold(state: &Holders, tag: BarrierTag) -> bool {
        state.switches.contains(&tag)
    }

    const CARRIERS: &[CarrierKind<Holders>] = &[
        CarrierKind {
            name: "guard",
            holds_tag: guards_hold,
        },
        CarrierKind {
            name: "switch",
            holds_tag: switches_hold,
        },
    ];

    #[test]
    fn duplicate_and_zero_tags_are_rejected() {
        let mut stack = BarrierCheckRequestStack::new(20);
        assert!(stack.send(BarrierTag(5)).is_ok());
        assert_eq!(stack.send(BarrierTag(5)), Err(RequestRejected::AlreadyQueued));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.send(BarrierTag::NONE), Err(RequestRejected::NoTag));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn full_stack_rejects_new_tags() {
        let mut stack = BarrierCheckRequestStack::new(20);
        for t in 1..=20 {
            stack.send(BarrierTag(t)).unwrap();
        }
        assert_eq!(stack.send(BarrierTag(21)), Err(RequestRejected::Full));
        assert_eq!(stack.len(), 20);
        // Duplicates still report as queued even when full.
        assert_eq!(stack.send(BarrierTag(3)), Err(RequestRejected::AlreadyQueued));
    }

    #[test]
    fn orphaned_tags_skip_held_ones() {
        let mut stack = BarrierCheckRequestStack::new(20);
        for t in [1, 2, 3] {
            stack.send(BarrierTag(t)).unwrap();
        }
        let state = Holders {
            guards: vec![BarrierTag(1)],
            switches: vec![BarrierTag(3), BarrierTag(9)],
        };
        assert_eq!(stack.orphaned_tags(CARRIERS, &state), vec![BarrierTag(2)]);
        assert_eq!(stack.len(), 3);
        stack.clear();
        assert!(stack.is_empty());
    }

    #[test]
    fn aux_values_outside_range_mean_no_tag() {
        assert_eq!(BarrierTag::from_aux(-4), BarrierTag(-4));
        assert_eq!(BarrierTag::from_aux(300), BarrierTag::NONE);
    }
}

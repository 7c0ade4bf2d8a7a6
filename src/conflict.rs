/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [Trait definition](ConflictRelation) for the application-supplied conflict relation.
//!
//! Atomic multicast only pays for ordering where the application needs it: two messages
//! must be ordered with respect to one another exactly when they conflict. The relation is
//! injected at peer construction and consulted once per fresh submission, against a
//! snapshot of the [previous set](crate::previous_set::PreviousSet).

use crate::types::message::Message;

/// Decides whether `message` conflicts with any previously stamped message. The predicate
/// must be pure: same inputs, same answer, on every replica.
pub trait ConflictRelation: Send + Sync {
    fn conflict(&self, message: &Message, previous: &[Message]) -> bool;
}

/// The default domain semantics: messages conflict when their key sets intersect.
pub struct KeyIntersection;

impl ConflictRelation for KeyIntersection {
    fn conflict(&self, message: &Message, previous: &[Message]) -> bool {
        previous
            .iter()
            .any(|other| other.payload.key == message.payload.key)
    }
}

//! Arbitration between recognizers competing for the same touches.
//!
//! Every touch sequence gets a scope holding the recognizers attached to it, in priority
//! order. A recognizer that accepts wins only once every recognizer ahead of it has
//! rejected; until then it waits, blocked. The first winner rejects everyone else in the
//! scope.

use std::collections::BTreeMap;
use std::fmt;

use slab::Slab;

use super::{GestureDisposal, Recognizer, RefereeState};
use crate::input::{AxisEvent, AxisPhase, ResampledEvent};

/// Liveness-checked handle to a recognizer owned by a [`GestureReferee`].
///
/// The generation tells apart recognizers that were stored in the same slab entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecognizerId {
    index: usize,
    generation: u32,
}

impl fmt::Display for RecognizerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recognizer {}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Pending,
    /// Accepted, waiting for the members ahead of it.
    Blocked,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy)]
struct Member {
    id: RecognizerId,
    verdict: Verdict,
}

#[derive(Debug, Default)]
struct Scope {
    members: Vec<Member>,
    decided: bool,
}

impl Scope {
    fn member_mut(&mut self, id: RecognizerId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    fn verdict(&self, id: RecognizerId) -> Option<Verdict> {
        self.members.iter().find(|m| m.id == id).map(|m| m.verdict)
    }

    fn winner(&self) -> Option<RecognizerId> {
        self.members
            .iter()
            .find(|m| m.verdict == Verdict::Accepted)
            .map(|m| m.id)
    }

    /// Settles the scope if its first undecided member is blocked, or if nobody is left.
    ///
    /// Returns the winner and the members it knocked out.
    fn resolve(&mut self) -> Option<(Option<RecognizerId>, Vec<RecognizerId>)> {
        if self.decided {
            return None;
        }

        let Some(first) = self
            .members
            .iter()
            .position(|m| m.verdict != Verdict::Rejected)
        else {
            self.decided = true;
            return Some((None, Vec::new()));
        };

        if self.members[first].verdict != Verdict::Blocked {
            return None;
        }

        self.decided = true;
        self.members[first].verdict = Verdict::Accepted;
        let winner = self.members[first].id;

        let mut losers = Vec::new();
        for member in &mut self.members {
            if member.id != winner && member.verdict != Verdict::Rejected {
                member.verdict = Verdict::Rejected;
                losers.push(member.id);
            }
        }

        Some((Some(winner), losers))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Accepted,
    Rejected,
}

struct Slot {
    recognizer: Box<dyn Recognizer>,
    /// Verdict delivered to the recognizer in the current session.
    outcome: Option<Outcome>,
}

/// Owns recognizers and arbitrates between them per touch sequence.
#[derive(Default)]
pub struct GestureReferee {
    /// Recognizers with the generation they were added under.
    recognizers: Slab<(u32, Slot)>,
    next_generation: u32,
    /// Scopes keyed by touch id.
    scopes: BTreeMap<i32, Scope>,
}

impl fmt::Debug for GestureReferee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureReferee")
            .field("recognizers", &self.recognizers.len())
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl GestureReferee {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, recognizer: impl Recognizer + 'static) -> RecognizerId {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let slot = Slot {
            recognizer: Box::new(recognizer),
            outcome: None,
        };
        let index = self.recognizers.insert((generation, slot));
        RecognizerId { index, generation }
    }

    /// Removes a recognizer. It counts as rejected in the scopes it was part of.
    pub fn remove(&mut self, id: RecognizerId) -> Option<Box<dyn Recognizer>> {
        self.slot(id)?;
        let (_, slot) = self.recognizers.remove(id.index);
        self.adjudicate(id, GestureDisposal::Reject);
        for scope in self.scopes.values_mut() {
            scope.members.retain(|m| m.id != id);
        }
        Some(slot.recognizer)
    }

    pub fn is_alive(&self, id: RecognizerId) -> bool {
        self.slot(id).is_some()
    }

    pub fn get(&self, id: RecognizerId) -> Option<&dyn Recognizer> {
        self.slot(id).map(|slot| &*slot.recognizer)
    }

    pub fn get_mut(&mut self, id: RecognizerId) -> Option<&mut (dyn Recognizer + 'static)> {
        self.slot_mut(id).map(|slot| &mut *slot.recognizer)
    }

    pub fn state(&self, id: RecognizerId) -> Option<RefereeState> {
        self.get(id).map(|r| r.state())
    }

    /// Attaches a recognizer to the scope of `touch_id`, behind the members already there.
    ///
    /// Returns `false` if the recognizer is dead or already attached.
    pub fn add_member(&mut self, touch_id: i32, id: RecognizerId) -> bool {
        if !self.is_alive(id) {
            debug!("not adding dead {id} to touch {touch_id}");
            return false;
        }

        let scope = self.scopes.entry(touch_id).or_default();
        if scope.verdict(id).is_some() {
            return false;
        }

        // A scope that already settled still hands out its verdict to late arrivals.
        let verdict = if scope.decided {
            Verdict::Rejected
        } else {
            Verdict::Pending
        };
        scope.members.push(Member { id, verdict });

        if verdict == Verdict::Rejected {
            self.notify(id, Outcome::Rejected);
        }
        true
    }

    pub fn members(&self, touch_id: i32) -> Vec<RecognizerId> {
        self.scopes
            .get(&touch_id)
            .map(|scope| scope.members.iter().map(|m| m.id).collect())
            .unwrap_or_default()
    }

    pub fn winner(&self, touch_id: i32) -> Option<RecognizerId> {
        self.scopes.get(&touch_id)?.winner()
    }

    pub fn is_decided(&self, touch_id: i32) -> bool {
        self.scopes.get(&touch_id).is_some_and(|scope| scope.decided)
    }

    /// Feeds a delivered pointer event to the scope of its pointer.
    ///
    /// The scope closes after an Up or Cancel.
    pub fn dispatch(&mut self, event: &ResampledEvent) {
        let _span = tracy_client::span!("GestureReferee::dispatch");

        self.feed(event.pointer_id, |recognizer| recognizer.handle_event(event));

        if event.phase.is_terminal() {
            self.close_scope(event.pointer_id);
        }
    }

    /// Feeds an axis event to the scope of `touch_id`.
    ///
    /// The scope closes after the axis ends.
    pub fn dispatch_axis(&mut self, touch_id: i32, event: &AxisEvent) {
        let _span = tracy_client::span!("GestureReferee::dispatch_axis");

        self.feed(touch_id, |recognizer| recognizer.handle_axis(event));

        if event.phase == AxisPhase::End {
            self.close_scope(touch_id);
        }
    }

    /// Applies a disposal a recognizer reported outside of [`GestureReferee::dispatch`].
    pub fn adjudicate(&mut self, id: RecognizerId, disposal: GestureDisposal) {
        let mut queue = vec![(id, disposal)];

        while let Some((id, disposal)) = queue.pop() {
            let mut settled = Vec::new();

            for (touch_id, scope) in &mut self.scopes {
                if scope.decided {
                    continue;
                }
                let Some(member) = scope.member_mut(id) else {
                    continue;
                };

                match (disposal, member.verdict) {
                    (GestureDisposal::Accept, Verdict::Pending) => member.verdict = Verdict::Blocked,
                    (GestureDisposal::Reject, Verdict::Pending | Verdict::Blocked) => {
                        member.verdict = Verdict::Rejected;
                    }
                    _ => continue,
                }

                if let Some(result) = scope.resolve() {
                    trace!("touch {touch_id} settled: winner {:?}", result.0);
                    settled.push(result);
                }
            }

            if disposal == GestureDisposal::Reject {
                self.notify(id, Outcome::Rejected);
            }

            for (winner, losers) in settled {
                if let Some(winner) = winner {
                    self.notify(winner, Outcome::Accepted);
                    // The winner is blocked wherever it still waits on someone else.
                    queue.push((winner, GestureDisposal::Accept));
                }
                for loser in losers {
                    queue.push((loser, GestureDisposal::Reject));
                }
            }
        }
    }

    /// Drops the scope of a finished touch sequence.
    ///
    /// Recognizers left without any scope are reset for the next sequence.
    pub fn close_scope(&mut self, touch_id: i32) {
        let Some(scope) = self.scopes.remove(&touch_id) else {
            return;
        };

        for member in scope.members {
            let still_attached = self.scopes.values().any(|s| s.verdict(member.id).is_some());
            if still_attached {
                continue;
            }

            if let Some(slot) = self.slot_mut(member.id) {
                slot.outcome = None;
                if slot.recognizer.state() != RefereeState::Ready {
                    slot.recognizer.reset();
                }
            }
        }
    }

    fn feed(
        &mut self,
        touch_id: i32,
        mut handle: impl FnMut(&mut dyn Recognizer) -> Option<GestureDisposal>,
    ) {
        let Some(scope) = self.scopes.get(&touch_id) else {
            return;
        };
        let ids: Vec<_> = scope.members.iter().map(|m| m.id).collect();

        for id in ids {
            // Earlier members may have settled the scope.
            let Some(scope) = self.scopes.get(&touch_id) else {
                return;
            };
            match scope.verdict(id) {
                Some(Verdict::Pending | Verdict::Blocked | Verdict::Accepted) => (),
                _ => continue,
            }

            let Some(slot) = self.slot_mut(id) else {
                continue;
            };
            if let Some(disposal) = handle(&mut *slot.recognizer) {
                self.adjudicate(id, disposal);
            }
        }
    }

    fn slot(&self, id: RecognizerId) -> Option<&Slot> {
        match self.recognizers.get(id.index) {
            Some((generation, slot)) if *generation == id.generation => Some(slot),
            _ => None,
        }
    }

    fn slot_mut(&mut self, id: RecognizerId) -> Option<&mut Slot> {
        match self.recognizers.get_mut(id.index) {
            Some((generation, slot)) if *generation == id.generation => Some(slot),
            _ => None,
        }
    }

    fn notify(&mut self, id: RecognizerId, outcome: Outcome) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };

        match (slot.outcome, outcome) {
            (None, Outcome::Accepted) => {
                trace!("{id} accepted");
                slot.outcome = Some(Outcome::Accepted);
                slot.recognizer.on_accepted();
            }
            (None | Some(Outcome::Accepted), Outcome::Rejected) => {
                trace!("{id} rejected");
                slot.outcome = Some(Outcome::Rejected);
                slot.recognizer.on_rejected();
            }
            _ => (),
        }
    }
}

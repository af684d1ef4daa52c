use lachesis_core::{Epoch, Event, EventId, Frame, NodeId, Seq, ValidatorId};
use proptest::prelude::*;

/// One gossip step: `creator` emits an event citing other validators' tips.
#[derive(Debug, Clone)]
pub struct Step {
    pub creator: usize,
    pub cites: Vec<usize>,
    /// Re-emit at the current tip's seq instead of advancing (equivocation).
    pub fork: bool,
    /// Open the creator's next epoch: seq 1 again, citing the old tip.
    pub reset: bool,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub validators: usize,
    pub steps: Vec<Step>,
}

impl Plan {
    #[must_use]
    pub fn has_forks(&self) -> bool {
        self.steps.iter().any(|s| s.fork)
    }
}

/// Share of steps that open a new epoch for their creator.
const RESET_PERCENT: u32 = 10;

pub fn validator(index: usize) -> ValidatorId {
    ValidatorId::new(format!("v{index}"))
}

pub fn arb_step(validators: usize, fork_percent: u32) -> impl Strategy<Value = Step> {
    (
        0..validators,
        prop::collection::vec(0..validators, 0..validators),
        0u32..100,
        0u32..100,
    )
        .prop_map(move |(creator, cites, fork_roll, reset_roll)| Step {
            creator,
            cites,
            fork: fork_roll < fork_percent,
            reset: reset_roll < RESET_PERCENT,
        })
}

/// Plans over 2..6 validators where roughly `fork_percent`% of steps fork.
pub fn arb_plan(fork_percent: u32) -> impl Strategy<Value = Plan> {
    (2usize..6).prop_flat_map(move |validators| {
        prop::collection::vec(arb_step(validators, fork_percent), 1..60)
            .prop_map(move |steps| Plan { validators, steps })
    })
}

#[derive(Debug, Clone)]
struct Tip {
    id: EventId,
    epoch: Epoch,
    seq: Seq,
    self_parent: Option<EventId>,
}

/// Turn a plan into events in a parents-first order.
///
/// A validator's very first event cites nothing. A resetting step starts the
/// next epoch at seq 1 and cites the creator's old tip first, then the cited
/// tips. A forking step reuses its tip's epoch, seq and self-parent, and is
/// told apart by a distinct node id; a fork of a seq 1 event cites nothing.
pub fn build_events(plan: &Plan) -> Vec<Event> {
    let mut tips: Vec<Option<Tip>> = vec![None; plan.validators];
    let mut events = Vec::with_capacity(plan.steps.len());

    for (step_no, step) in plan.steps.iter().enumerate() {
        let creator = validator(step.creator);
        let current = tips[step.creator].clone();
        let node = NodeId::new(creator.as_str());

        // `lead` is the first parent: the self-parent, or the old tip on reset.
        let (epoch, seq, lead, node) = match (&current, step.fork, step.reset) {
            (Some(tip), true, _) => (
                tip.epoch,
                tip.seq,
                tip.self_parent.clone(),
                NodeId::new(format!("{creator}-shadow-{step_no}")),
            ),
            (Some(tip), false, true) => (tip.epoch.next(), Seq::FIRST, Some(tip.id.clone()), node),
            (Some(tip), false, false) => (tip.epoch, tip.seq.next(), Some(tip.id.clone()), node),
            (None, _, _) => (Epoch::FIRST, Seq::FIRST, None, node),
        };

        let mut parents = Vec::new();
        if let Some(lead) = &lead {
            parents.push(lead.clone());
            for &cited in &step.cites {
                if cited == step.creator {
                    continue;
                }
                if let Some(tip) = &tips[cited] {
                    if !parents.contains(&tip.id) {
                        parents.push(tip.id.clone());
                    }
                }
            }
        }

        let event = Event::hashed(epoch, seq, Frame(1), creator, node, parents);
        tips[step.creator] = Some(Tip {
            id: event.id().clone(),
            epoch,
            seq,
            self_parent: lead.filter(|_| seq > Seq::FIRST),
        });
        events.push(event);
    }

    events
}

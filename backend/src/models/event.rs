//! Event logging for session auditing.
//!
//! Every mutation of a participant's record appends one [`Event`], so the log
//! shows exactly what was recorded, in which step, and in which order:
//! - Step transitions
//! - Allocation inputs
//! - Regime draws (exactly one per round)
//! - Round realizations and their derived metrics
//! - Belief and demographic submissions
//!
//! # Example
//!
//! ```rust
//! use portfolio_experiment_core_rs::models::{Event, EventLog};
//! use portfolio_experiment_core_rs::orchestrator::Step;
//!
//! let mut log = EventLog::new();
//! log.log(Event::StepEntered { step_index: 1, step: Step::Decision1 });
//!
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.events_of_type("StepEntered").len(), 1);
//! ```

use crate::core::{Bps, Money};
use crate::models::inputs::Allocation;
use crate::models::state::Round;
use crate::orchestrator::Step;
use crate::outcome::draw::Regime;
use serde::{Deserialize, Serialize};

/// Session event capturing a state change.
///
/// `step_index` is the position of the step in which the event happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Sequencer moved into a new step
    StepEntered { step_index: usize, step: Step },

    /// Participant's allocation accepted for a round
    AllocationRecorded {
        step_index: usize,
        round: Round,
        allocation: Allocation,
    },

    /// The one regime draw of a round
    RegimeDrawn {
        step_index: usize,
        round: Round,
        regime: Regime,
    },

    /// Round outcome and its performance recorded
    RoundRealized {
        step_index: usize,
        round: Round,
        starting_value: Money,
        outcome: Money,
        performance: Bps,
    },

    BeliefsRecorded { step_index: usize },

    DemographicsRecorded { step_index: usize },

    /// Summary reached; the record is now immutable
    SessionCompleted {
        step_index: usize,
        final_value: Money,
    },
}

impl Event {
    /// Get the step index at which this event occurred
    pub fn step_index(&self) -> usize {
        match self {
            Event::StepEntered { step_index, .. } => *step_index,
            Event::AllocationRecorded { step_index, .. } => *step_index,
            Event::RegimeDrawn { step_index, .. } => *step_index,
            Event::RoundRealized { step_index, .. } => *step_index,
            Event::BeliefsRecorded { step_index } => *step_index,
            Event::DemographicsRecorded { step_index } => *step_index,
            Event::SessionCompleted { step_index, .. } => *step_index,
        }
    }

    /// Get event type as string (for filtering)
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::StepEntered { .. } => "StepEntered",
            Event::AllocationRecorded { .. } => "AllocationRecorded",
            Event::RegimeDrawn { .. } => "RegimeDrawn",
            Event::RoundRealized { .. } => "RoundRealized",
            Event::BeliefsRecorded { .. } => "BeliefsRecorded",
            Event::DemographicsRecorded { .. } => "DemographicsRecorded",
            Event::SessionCompleted { .. } => "SessionCompleted",
        }
    }

    /// Get the round if the event relates to one
    pub fn round(&self) -> Option<Round> {
        match self {
            Event::AllocationRecorded { round, .. } => Some(*round),
            Event::RegimeDrawn { round, .. } => Some(*round),
            Event::RoundRealized { round, .. } => Some(*round),
            _ => None,
        }
    }
}

/// Event log for storing and querying session events.
///
/// A thin wrapper around `Vec<Event>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events that happened during a given step
    pub fn events_at_step(&self, step_index: usize) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.step_index() == step_index)
            .collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific round
    pub fn events_for_round(&self, round: Round) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.round() == Some(round))
            .collect()
    }
}

impl From<Vec<Event>> for EventLog {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_query_by_round() {
        let mut log = EventLog::new();

        log.log(Event::RegimeDrawn {
            step_index: 2,
            round: Round::One,
            regime: Regime::Favorable,
        });
        log.log(Event::BeliefsRecorded { step_index: 3 });
        log.log(Event::RegimeDrawn {
            step_index: 5,
            round: Round::Two,
            regime: Regime::Unfavorable,
        });

        assert_eq!(log.events_for_round(Round::One).len(), 1);
        assert_eq!(log.events_for_round(Round::Two).len(), 1);
        assert_eq!(log.events_at_step(3).len(), 1);
        assert_eq!(log.events_of_type("RegimeDrawn").len(), 2);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = Event::BeliefsRecorded { step_index: 3 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"BeliefsRecorded\""));
    }
}

//! Domain models for the portfolio experiment

pub mod event;
pub mod inputs;
pub mod record;
pub mod state;

// Re-exports
pub use event::{Event, EventLog};
pub use inputs::{
    Allocation, Beliefs, BeliefsForm, Demographics, DemographicsForm, Education, Gender,
    InvestmentExperience,
};
pub use record::ExportRow;
pub use state::{ParticipantRoundState, Round, RoundRecord};

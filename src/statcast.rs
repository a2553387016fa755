pub mod matchup;
pub mod metrics;
pub mod pitch_event;
pub mod source;

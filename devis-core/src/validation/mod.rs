pub mod stage;

pub use stage::{FormStage, FormStageValidator, StageMachine, StageValidation};

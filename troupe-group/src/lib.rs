pub mod models;
pub mod repository;
pub mod workflow;

pub use models::{Confirmation, Group, GroupStatus, PaymentStatus, EXPIRED_REASON};
pub use repository::GroupRepository;
pub use workflow::{ConfirmationWorkflow, DispatchEntry, RespondOutcome, WorkflowError};

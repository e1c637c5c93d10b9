pub mod context;
pub mod decisions;
pub mod entities;
pub mod errors;
pub mod ports;
pub mod value_objects;

pub use context::*;
pub use decisions::*;
pub use entities::*;
pub use errors::*;
pub use l10n_core::{SchedulerError, SchedulerResult};
pub use ports::*;
pub use value_objects::*;

//! Domain types shared by every launchpad crate.

mod build;
mod entity;
mod handle;
mod progress;
mod state;

pub use build::{BuildConfiguration, UnknownConfigurationError};
pub use entity::{EngineId, EntityDetails, EntityKind, InstallableEntity};
pub use handle::EntityHandle;
pub use progress::{Progress, TransferUpdate};
pub use state::{InstallationState, PersistedState, UnknownStateError};

// ── Domain model ──

pub mod change;
pub mod kinds;
pub mod snapshot;

pub use change::{ChangeAction, ChangeEvent, TriggerSource};
pub use kinds::{ChildDescriptor, KindDescriptor, KIND_TABLE, descriptor_for, synthesize_child};
pub use snapshot::{ResourceId, ResourceSnapshot, normalize_batch};

// Re-export the boundary type tags at the model root — every consumer
// of the model needs them.
pub use mirrorloop_api::ResourceKind;

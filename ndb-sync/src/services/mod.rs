//! Services used by the reconciler stages

pub mod annotations;
pub mod compartments;
pub mod reconciler;
pub mod reference_mirror;
pub mod visibility;

pub use compartments::CompartmentCache;
pub use reconciler::Reconciler;
pub use reference_mirror::{mirror_reference_tables, MirrorCounts};
pub use visibility::VisibilityResolver;

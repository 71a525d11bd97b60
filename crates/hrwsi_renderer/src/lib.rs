pub mod context;
pub mod error;
pub mod paths;
pub mod probe;
pub mod registry;
pub mod routine;
pub mod validate;

pub use context::{ContextInput, RenderContext};
pub use error::RenderError;
pub use probe::AuxiliaryProbe;
pub use registry::{registry, render};
pub use routine::{GenericRoutineRenderer, RenderOutcome, RoutineRenderer};

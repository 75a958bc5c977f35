pub mod controller;
pub mod event;
pub mod sources;

pub use controller::DetectionController;
pub use event::DetectionEvent;
pub use sources::{SimulatedPresence, SourceKind};

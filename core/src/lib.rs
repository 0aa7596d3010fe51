pub mod apk;
pub mod errors;
pub mod models;

pub use apk::{inspect, DEFAULT_METHOD_NAME};
pub use errors::InspectError;
pub use models::{DexOutcome, Inspection};

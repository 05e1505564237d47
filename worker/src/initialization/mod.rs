mod data_layer;
mod signals;
mod worker_resources;

pub use self::data_layer::get_data_abstraction_layer;
pub use self::signals::register_cancellation_signals;
pub use self::worker_resources::WorkerResources;

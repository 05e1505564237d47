mod map;
mod reduce;
pub mod operation_handler;

#[cfg(test)]
mod test_support;

pub use self::map::perform_map;
pub use self::operation_handler::{OperationResources, ScratchRegistry};
pub use self::reduce::perform_reduce;

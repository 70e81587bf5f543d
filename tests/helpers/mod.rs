pub mod builders;
pub mod handlers;

pub use builders::{check, shipped_registry, StateBuilder};
pub use handlers::{FailingHandler, ODataHandler};

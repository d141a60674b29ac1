mod builders;
mod builds;
mod queue;

pub use builders::*;
pub use builds::*;
pub use queue::*;

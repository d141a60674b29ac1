pub use anyhow::{anyhow, bail, format_err, Context, Error, Result};
pub use log::{debug, error, info, trace, warn};

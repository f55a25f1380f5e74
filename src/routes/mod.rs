mod entries;
mod health_check;

pub use entries::*;
pub use health_check::*;

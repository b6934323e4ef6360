mod access_log;
mod license;
mod user;

pub use access_log::*;
pub use license::*;
pub use user::*;

pub mod dev;
pub mod public;

pub mod backends;
pub mod runtime;
pub mod shutdown;

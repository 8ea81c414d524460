pub mod traits;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

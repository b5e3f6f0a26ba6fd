pub mod error;
pub mod monitor;
pub mod net;
pub mod queue;
pub mod sim;
pub mod topo;
pub mod traffic;

pub use error::{Error, Result};

#[cfg(test)]
mod test;

pub mod memory;
pub mod rest;
pub mod types;

pub use memory::{EngineCall, MemoryProcessEngine};
pub use rest::RestProcessEngine;
pub use types::{EngineError, ProcessEngine, ProcessInstance};

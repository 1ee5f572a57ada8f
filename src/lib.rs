pub mod bus;
pub mod disk;
pub mod error;
pub mod firmware;
pub mod instruction;
pub mod machine;
pub mod memory;

#![allow(dead_code)]

pub mod builders;
pub mod logs;
pub mod mocks;
pub mod strategies;

pub use builders::*;
pub use logs::*;
pub use mocks::*;

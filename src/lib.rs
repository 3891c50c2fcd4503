#[macro_use]
extern crate tracing;

pub mod backend;
pub mod client;
pub mod compositor;
pub mod grab;
pub mod layout;
pub mod overlay;
pub mod page;
pub mod region;
pub mod theme;
pub mod tree;
pub mod utils;
pub mod view;
pub mod workspace;

#[cfg(test)]
mod tests;

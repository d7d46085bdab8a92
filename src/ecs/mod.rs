//! Component types the pipeline reads from and writes to a `hecs::World`.

pub mod components;

pub mod prelude {
    pub use super::components::*;
}

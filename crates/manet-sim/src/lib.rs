pub mod engine;

pub use engine::SimEngine;

//! Shared fixtures for unit tests.

mod builders;

pub use builders::ImageBuilder;

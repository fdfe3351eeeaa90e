pub mod build;
pub mod tree;
pub mod version;

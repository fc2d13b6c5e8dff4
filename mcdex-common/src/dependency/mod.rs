// mcdex-common/src/dependency/mod.rs
pub mod ordering;

pub use ordering::install_order;

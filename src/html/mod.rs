pub mod extract;
pub mod process;
pub mod rewrite;

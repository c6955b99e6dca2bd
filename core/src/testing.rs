pub mod launcher;
pub mod normalize;
pub mod parser;
pub mod resolver;
pub mod result;
pub mod runner;
pub mod scoring;
pub mod testcase;

pub use launcher::*;
pub use normalize::{compare, normalize, CompareRule};
pub use resolver::*;
pub use result::*;
pub use runner::*;
pub use scoring::*;
pub use testcase::*;

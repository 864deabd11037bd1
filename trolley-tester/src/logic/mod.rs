pub mod reports;
pub mod stub;
pub mod tester;

pub use stub::StubDecisionService;
pub use tester::*;

pub mod fanout;
pub mod judgement;

pub use fanout::FanOut;
pub use judgement::judge;

pub mod decision;
pub mod event;
pub mod game;
pub mod player;
pub mod record;
pub mod role;

pub use decision::*;
pub use event::*;
pub use game::*;
pub use player::*;
pub use record::*;
pub use role::*;

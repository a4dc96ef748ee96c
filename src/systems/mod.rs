//! Bevy ECS Systems - One module per tick step concern

mod drain;
mod health;
mod movement;
mod operate;
mod report;
mod schedule;

pub use drain::*;
pub use health::*;
pub use movement::*;
pub use operate::*;
pub use report::*;
pub use schedule::*;

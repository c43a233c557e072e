pub mod apply;
pub mod attacks;
pub mod bits;
pub mod moves;
pub mod position;
mod zobrist;

pub use apply::*;
pub use attacks::movegen::*;
pub use bits::*;
pub use moves::*;
pub use position::*;

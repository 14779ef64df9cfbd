//! Luna container reader.
//!
//! Loads a tagged-chunk data file into a [`Game`]: the string, script,
//! variable, function, code, object and room tables, with every code entry
//! decoded into a branch-resolved [`Program`](luna_common::Program).
//!
//! # Usage
//!
//! ```no_run
//! use luna_container::{disassemble, Game};
//!
//! let game = Game::open("data.win")?;
//! if let Some(program) = game.program_by_name("gml_Script_main") {
//!     print!("{}", disassemble(program));
//! }
//! # Ok::<(), luna_container::LoadError>(())
//! ```

pub mod chunk;
pub mod error;
pub mod game;
pub mod reader;

mod chunks;
mod decode;
mod disasm;
mod load;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use chunk::{read_chunks, Chunk};
pub use disasm::{disassemble, format_instruction};
pub use error::LoadError;
pub use game::{
    CodeEntry, CodeLocals, Event, Function, Game, General, Object, Physics, Room, RoomInstance,
    Script, Variable, View, EVENT_TYPE_COUNT,
};
pub use load::is_known_tag;

#[cfg(test)]
mod tests;

//! Chunk dispatch.
//!
//! The scan records every chunk first. Handlers then run in dependency
//! order, because later chunks refer to strings by address and code refers
//! to variables and functions through their site tables.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::chunk::{read_chunks, Chunk};
use crate::chunks;
use crate::error::LoadError;
use crate::game::Game;
use crate::reader::ByteReader;

type Handler = fn(&mut LoadContext<'_>, &Chunk) -> Result<(), LoadError>;

/// Registered handlers in the order they run.
const HANDLERS: [([u8; 4], Handler); 8] = [
    (*b"STRG", chunks::strg::parse),
    (*b"GEN8", chunks::gen8::parse),
    (*b"SCPT", chunks::scpt::parse),
    (*b"VARI", chunks::vari::parse),
    (*b"FUNC", chunks::func::parse),
    (*b"CODE", chunks::code::parse),
    (*b"OBJT", chunks::objt::parse),
    (*b"ROOM", chunks::room::parse),
];

/// Returns true if a handler is registered for `tag`.
pub fn is_known_tag(tag: &[u8; 4]) -> bool {
    HANDLERS.iter().any(|(t, _)| t == tag)
}

/// State shared by the chunk handlers while a container loads.
pub(crate) struct LoadContext<'a> {
    pub data: &'a [u8],
    pub game: Game,
    /// Address of a string's character data to its string table index.
    pub string_addresses: HashMap<usize, usize>,
    /// Address of a referencing instruction word to its variable index.
    pub variable_sites: HashMap<usize, usize>,
    /// Address of a `call` instruction word to its function index.
    pub function_sites: HashMap<usize, usize>,
}

impl<'a> LoadContext<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            game: Game::default(),
            string_addresses: HashMap::new(),
            variable_sites: HashMap::new(),
            function_sites: HashMap::new(),
        }
    }

    pub fn bytecode_version(&self) -> u8 {
        self.game.general.bytecode_version
    }

    /// Resolve a string pointer. Zero means no string.
    pub fn string(&self, address: usize) -> Result<Option<Rc<str>>, LoadError> {
        if address == 0 {
            return Ok(None);
        }
        if let Some(&index) = self.string_addresses.get(&address) {
            return Ok(Some(Rc::clone(&self.game.strings[index])));
        }
        // Not every container lists every string in STRG.
        ByteReader::new(self.data).string_at(address).map(Some)
    }

    /// Resolve a string pointer that must be present.
    pub fn required_string(&self, address: usize, field: &str) -> Result<Rc<str>, LoadError> {
        self.string(address)?
            .ok_or_else(|| LoadError::malformed(address, format!("missing {field}")))
    }
}

/// Load every asset table from a container image.
pub(crate) fn load(data: &[u8]) -> Result<Game, LoadError> {
    let chunks = read_chunks(data)?;
    for chunk in chunks.iter().filter(|c| !is_known_tag(&c.tag)) {
        debug!(tag = %chunk.name(), length = chunk.length, "skipping unknown chunk");
    }

    let mut ctx = LoadContext::new(data);
    for (tag, handler) in &HANDLERS {
        let mut matching = chunks.iter().filter(|c| c.tag == *tag);
        let Some(chunk) = matching.next() else {
            continue;
        };
        debug!(%chunk, "loading chunk");
        handler(&mut ctx, chunk)?;
        if let Some(extra) = matching.next() {
            debug!(chunk = %extra, "ignoring duplicate chunk");
        }
    }

    let mut game = ctx.game;
    game.index_names();
    game.validate()?;
    debug!(
        strings = game.strings.len(),
        code = game.code.len(),
        objects = game.objects.len(),
        rooms = game.rooms.len(),
        "container loaded"
    );
    Ok(game)
}

//! Asset tables produced by loading a container.
//!
//! A [`Game`] is immutable after load and lives for the whole session.
//! Every index stored in it has been checked against its table.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use luna_common::{Program, Scope};

use crate::error::LoadError;

/// Bytecode version assumed when the container has no GEN8 chunk.
pub const DEFAULT_BYTECODE_VERSION: u8 = 17;

/// Oldest bytecode version with the instruction layout this crate decodes.
pub const MIN_BYTECODE_VERSION: u8 = 15;

/// Number of event types an object can carry handlers for.
pub const EVENT_TYPE_COUNT: usize = 15;

/// General information (GEN8).
#[derive(Debug, Clone, PartialEq)]
pub struct General {
    pub disable_debugger: bool,
    pub bytecode_version: u8,
    pub filename: Option<Rc<str>>,
    pub config: Option<Rc<str>>,
    pub last_object: u32,
    pub last_tile: u32,
    pub game_id: u32,
    pub guid: [u8; 16],
    pub name: Option<Rc<str>>,
    pub version: (u32, u32, u32, u32),
    pub window_width: u32,
    pub window_height: u32,
    pub info: u32,
    pub license_crc: u32,
    pub md5: [u8; 16],
    pub timestamp: u64,
    pub display_name: Option<Rc<str>>,
    pub active_targets: u64,
    pub function_classifications: u64,
    pub steam_app_id: i32,
    pub debugger_port: u32,
    /// Room play order, as indices into [`Game::rooms`].
    pub room_order: Vec<usize>,
}

impl Default for General {
    fn default() -> Self {
        Self {
            disable_debugger: false,
            bytecode_version: DEFAULT_BYTECODE_VERSION,
            filename: None,
            config: None,
            last_object: 0,
            last_tile: 0,
            game_id: 0,
            guid: [0; 16],
            name: None,
            version: (0, 0, 0, 0),
            window_width: 0,
            window_height: 0,
            info: 0,
            license_crc: 0,
            md5: [0; 16],
            timestamp: 0,
            display_name: None,
            active_targets: 0,
            function_classifications: 0,
            steam_app_id: 0,
            debugger_port: 0,
            room_order: Vec::new(),
        }
    }
}

/// A named script and the code entry that implements it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub name: Rc<str>,
    pub code: usize,
    /// Set when the script was declared as a constructor.
    pub constructor: bool,
}

/// A variable table entry (VARI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: Rc<str>,
    pub instance_type: i32,
    pub var_id: i32,
    pub scope: Scope,
}

/// Instance type marking global variables.
pub const INSTANCE_TYPE_GLOBAL: i32 = -5;
/// Instance type marking static variables.
pub const INSTANCE_TYPE_STATIC: i32 = -16;

impl Variable {
    /// Storage class for an instance type.
    pub fn scope_for(instance_type: i32) -> Scope {
        match instance_type {
            INSTANCE_TYPE_GLOBAL => Scope::Global,
            INSTANCE_TYPE_STATIC => Scope::Static,
            _ => Scope::Local,
        }
    }
}

/// A function table entry (FUNC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: Rc<str>,
}

/// Local variable names declared by one code entry (FUNC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocals {
    pub code: Rc<str>,
    pub locals: Vec<(u32, Rc<str>)>,
}

/// A code table entry (CODE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub name: Rc<str>,
    /// Absolute offset of the bytecode blob.
    pub address: usize,
    /// Blob length in bytes.
    pub length: usize,
    /// Byte offset of the entry point inside the blob.
    pub offset: usize,
    pub locals: u16,
    pub arguments: u16,
}

/// Physics properties of an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Physics {
    pub enabled: bool,
    pub sensor: bool,
    pub shape: u32,
    pub density: f32,
    pub restitution: f32,
    pub group: u32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub friction: f32,
    pub awake: bool,
    pub kinematic: bool,
    pub vertices: Vec<(f32, f32)>,
}

/// Handlers for one event subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub subtype: u32,
    /// Code entries run in order when the event fires.
    pub actions: Vec<usize>,
}

/// An object definition (OBJT).
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub name: Rc<str>,
    pub sprite: i32,
    pub visible: bool,
    pub solid: bool,
    pub depth: i32,
    pub persistent: bool,
    pub parent: Option<usize>,
    pub mask: i32,
    pub physics: Physics,
    /// One list per event type, indexed by the event type number.
    pub events: Vec<Vec<Event>>,
}

impl Object {
    /// Handlers this object itself declares for an event.
    pub fn event(&self, event_type: usize, subtype: u32) -> Option<&Event> {
        self.events
            .get(event_type)?
            .iter()
            .find(|e| e.subtype == subtype)
    }
}

/// A room view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct View {
    pub enabled: bool,
    pub view: (i32, i32, i32, i32),
    pub port: (i32, i32, i32, i32),
    pub border: (u32, u32),
    pub speed: (i32, i32),
    pub follow: i32,
}

/// An instance placed in a room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInstance {
    pub x: i32,
    pub y: i32,
    pub object: usize,
    pub instance_id: u32,
    pub creation_code: Option<usize>,
    pub scale: (f32, f32),
    pub colour: u32,
    pub rotation: f32,
    pub pre_create_code: Option<usize>,
}

/// A room definition (ROOM).
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub name: Rc<str>,
    pub caption: Option<Rc<str>>,
    pub width: u32,
    pub height: u32,
    pub speed: u32,
    pub persistent: bool,
    pub colour: u32,
    pub draw_colour: bool,
    pub creation_code: Option<usize>,
    pub flags: u32,
    pub views: Vec<View>,
    pub instances: Vec<RoomInstance>,
    pub world: bool,
    pub bounds: (u32, u32, u32, u32),
    pub gravity: (f32, f32),
    pub meters_per_pixel: f32,
}

/// Every asset table of a loaded container.
#[derive(Debug, Clone, Default)]
pub struct Game {
    pub general: General,
    pub strings: Vec<Rc<str>>,
    pub scripts: Vec<Script>,
    pub variables: Vec<Variable>,
    pub functions: Vec<Function>,
    pub code_locals: Vec<CodeLocals>,
    pub code: Vec<CodeEntry>,
    /// Decoded programs, parallel to [`Game::code`].
    pub programs: Vec<Rc<Program>>,
    pub objects: Vec<Object>,
    pub rooms: Vec<Room>,
    code_by_name: HashMap<Rc<str>, usize>,
    scripts_by_name: HashMap<Rc<str>, usize>,
    objects_by_name: HashMap<Rc<str>, usize>,
    rooms_by_name: HashMap<Rc<str>, usize>,
}

impl Game {
    /// Load a container from its bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LoadError> {
        crate::load::load(data)
    }

    /// Read and load a container file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Rebuild the name lookups after the tables have been filled.
    pub(crate) fn index_names(&mut self) {
        self.code_by_name = index(self.code.iter().map(|c| &c.name));
        self.scripts_by_name = index(self.scripts.iter().map(|s| &s.name));
        self.objects_by_name = index(self.objects.iter().map(|o| &o.name));
        self.rooms_by_name = index(self.rooms.iter().map(|r| &r.name));
    }

    pub fn code_index(&self, name: &str) -> Option<usize> {
        self.code_by_name.get(name).copied()
    }

    pub fn program(&self, code: usize) -> Option<&Rc<Program>> {
        self.programs.get(code)
    }

    pub fn program_by_name(&self, name: &str) -> Option<&Rc<Program>> {
        self.program(self.code_index(name)?)
    }

    /// Code entry implementing a script, found through the script table or
    /// by the `gml_Script_` naming convention.
    pub fn script_code(&self, name: &str) -> Option<usize> {
        if let Some(&script) = self.scripts_by_name.get(name) {
            return Some(self.scripts[script].code);
        }
        self.code_index(&format!("gml_Script_{name}"))
    }

    pub fn object_index(&self, name: &str) -> Option<usize> {
        self.objects_by_name.get(name).copied()
    }

    pub fn room_index(&self, name: &str) -> Option<usize> {
        self.rooms_by_name.get(name).copied()
    }

    /// True when `ancestor` appears in the parent chain of `object`. An
    /// object is not its own ancestor.
    pub fn is_ancestor(&self, object: usize, ancestor: usize) -> bool {
        self.parents(object).any(|p| p == ancestor)
    }

    /// Iterates the parent chain of `object`, nearest parent first.
    pub fn parents(&self, object: usize) -> impl Iterator<Item = usize> + '_ {
        let mut next = self.objects.get(object).and_then(|o| o.parent);
        // Chains are acyclic after load; the bound keeps a hand-built table
        // from looping forever.
        let mut remaining = self.objects.len();
        std::iter::from_fn(move || {
            let current = next?;
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            next = self.objects.get(current).and_then(|o| o.parent);
            Some(current)
        })
    }

    /// Resolves the handler for an event on `object`, walking up the parent
    /// chain when the object does not declare one. Returns the object that
    /// declares it together with the handler.
    pub fn find_event(&self, object: usize, event_type: usize, subtype: u32) -> Option<(usize, &Event)> {
        std::iter::once(object)
            .chain(self.parents(object))
            .find_map(|o| Some((o, self.objects.get(o)?.event(event_type, subtype)?)))
    }

    /// Check every cross-table reference and the parent chains.
    pub(crate) fn validate(&self) -> Result<(), LoadError> {
        let code = self.code.len();
        let check_code = |index: usize| {
            if index < code {
                Ok(())
            } else {
                Err(LoadError::unresolved("code", index as i64))
            }
        };

        for script in &self.scripts {
            check_code(script.code)?;
        }
        for object in &self.objects {
            if let Some(parent) = object.parent {
                if parent >= self.objects.len() {
                    return Err(LoadError::unresolved("object", parent as i64));
                }
            }
            for event in object.events.iter().flatten() {
                for &action in &event.actions {
                    check_code(action)?;
                }
            }
        }
        for room in &self.rooms {
            if let Some(c) = room.creation_code {
                check_code(c)?;
            }
            for instance in &room.instances {
                if instance.object >= self.objects.len() {
                    return Err(LoadError::unresolved("object", instance.object as i64));
                }
                if let Some(c) = instance.creation_code {
                    check_code(c)?;
                }
                if let Some(c) = instance.pre_create_code {
                    check_code(c)?;
                }
            }
        }
        for &room in &self.general.room_order {
            if room >= self.rooms.len() {
                return Err(LoadError::unresolved("room", room as i64));
            }
        }
        self.check_acyclic()
    }

    fn check_acyclic(&self) -> Result<(), LoadError> {
        for start in 0..self.objects.len() {
            let mut steps = 0;
            let mut current = self.objects[start].parent;
            while let Some(object) = current {
                if object == start || steps > self.objects.len() {
                    return Err(LoadError::CyclicInheritance { object: start });
                }
                steps += 1;
                current = self.objects[object].parent;
            }
        }
        Ok(())
    }
}

fn index<'a>(names: impl Iterator<Item = &'a Rc<str>>) -> HashMap<Rc<str>, usize> {
    let mut map = HashMap::new();
    for (i, name) in names.enumerate() {
        // First definition wins on duplicate names.
        map.entry(Rc::clone(name)).or_insert(i);
    }
    map
}

//! Test fixtures: build complete container images in memory.
//!
//! [`CodeAsm`] emits bytecode for one code entry with symbolic labels,
//! variables, functions and strings. [`FixtureBuilder`] lays out a FORM
//! image with STRG, GEN8, SCPT, CODE, VARI, FUNC, OBJT and ROOM chunks and
//! patches every reference chain, so loading the image exercises the same
//! paths a real data file does.
//!
//! Names that do not resolve (an unknown code entry or object) are written
//! as out-of-range indices, which lets tests provoke load errors.

use std::collections::HashMap;

use luna_common::{Comparison, DataType, Opcode, Scope, Word};

use crate::game::{View, EVENT_TYPE_COUNT, INSTANCE_TYPE_GLOBAL, INSTANCE_TYPE_STATIC};

/// Instance type written for local variables.
const INSTANCE_TYPE_SELF: i32 = -1;

fn instance_type(scope: Scope) -> i32 {
    match scope {
        Scope::Global => INSTANCE_TYPE_GLOBAL,
        Scope::Static => INSTANCE_TYPE_STATIC,
        Scope::Local => INSTANCE_TYPE_SELF,
    }
}

/// Bytecode emitter for one code entry.
#[derive(Debug, Clone, Default)]
pub struct CodeAsm {
    bytes: Vec<u8>,
    labels: HashMap<String, usize>,
    branches: Vec<(usize, Opcode, String)>,
    /// (instruction offset, variable name, instance type)
    variables: Vec<(usize, String, i32)>,
    /// (instruction offset, function name)
    functions: Vec<(usize, String)>,
    /// (operand offset, text)
    strings: Vec<(usize, String)>,
}

impl CodeAsm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.bytes.len()
    }

    fn word(&mut self, opcode: u8, argument: u8, immediate: i16) -> &mut Self {
        self.bytes
            .extend_from_slice(&Word::new(opcode, argument, immediate).to_le_bytes());
        self
    }

    fn op(&mut self, opcode: Opcode, argument: u8, immediate: i16) -> &mut Self {
        self.word(opcode as u8, argument, immediate)
    }

    fn operand32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Emit a raw 32-bit word.
    pub fn raw(&mut self, word: u32) -> &mut Self {
        self.operand32(word)
    }

    pub fn push_f64(&mut self, value: f64) -> &mut Self {
        self.op(Opcode::Push, DataType::Double as u8, 0);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_f32(&mut self, value: f32) -> &mut Self {
        self.op(Opcode::Push, DataType::Float as u8, 0);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_i32(&mut self, value: i32) -> &mut Self {
        self.op(Opcode::Push, DataType::Int32 as u8, 0)
            .operand32(value as u32)
    }

    pub fn push_i64(&mut self, value: i64) -> &mut Self {
        self.op(Opcode::Push, DataType::Int64 as u8, 0);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.op(Opcode::Push, DataType::Bool as u8, 0)
            .operand32(value as u32)
    }

    /// `push.e`: a 16-bit literal in the immediate.
    pub fn push_i16(&mut self, value: i16) -> &mut Self {
        self.op(Opcode::Push, DataType::Int16 as u8, value)
    }

    pub fn pushi(&mut self, value: i16) -> &mut Self {
        self.op(Opcode::PushI, DataType::Int16 as u8, value)
    }

    pub fn push_string(&mut self, text: &str) -> &mut Self {
        self.op(Opcode::Push, DataType::String as u8, 0);
        self.strings.push((self.offset(), text.to_string()));
        self.operand32(0)
    }

    fn reference(&mut self, opcode: Opcode, argument: u8, immediate: i16, name: &str, scope: Scope) -> &mut Self {
        let at = self.offset();
        self.variables.push((at, name.to_string(), instance_type(scope)));
        self.op(opcode, argument, immediate).operand32(0)
    }

    /// `push.v` of a variable in its declared scope.
    pub fn push_var(&mut self, name: &str, scope: Scope) -> &mut Self {
        self.reference(Opcode::Push, DataType::Variable as u8, instance_type(scope) as i16, name, scope)
    }

    pub fn push_local(&mut self, name: &str) -> &mut Self {
        self.reference(Opcode::PushLoc, DataType::Variable as u8, -7, name, Scope::Local)
    }

    pub fn push_global(&mut self, name: &str) -> &mut Self {
        self.reference(Opcode::PushGlb, DataType::Variable as u8, -5, name, Scope::Global)
    }

    pub fn push_builtin(&mut self, name: &str) -> &mut Self {
        self.reference(Opcode::PushBltn, DataType::Variable as u8, -1, name, Scope::Local)
    }

    /// `pop.v.v` into a variable.
    pub fn pop_var(&mut self, name: &str, scope: Scope) -> &mut Self {
        let argument = (DataType::Variable as u8) | ((DataType::Variable as u8) << 4);
        self.reference(Opcode::Pop, argument, instance_type(scope) as i16, name, scope)
    }

    pub fn popz(&mut self) -> &mut Self {
        self.op(Opcode::PopZ, DataType::Variable as u8, 0)
    }

    /// `dup` of the top `extra + 1` values.
    pub fn dup(&mut self, extra: u8) -> &mut Self {
        self.op(Opcode::Dup, DataType::Variable as u8, extra as i16)
    }

    pub fn conv(&mut self, from: DataType, to: DataType) -> &mut Self {
        self.op(Opcode::Conv, (from as u8) | ((to as u8) << 4), 0)
    }

    /// A two-operand arithmetic or bitwise opcode on variables.
    pub fn binary(&mut self, opcode: Opcode) -> &mut Self {
        self.op(opcode, 0x55, 0)
    }

    pub fn add(&mut self) -> &mut Self {
        self.binary(Opcode::Add)
    }

    pub fn sub(&mut self) -> &mut Self {
        self.binary(Opcode::Sub)
    }

    pub fn mul(&mut self) -> &mut Self {
        self.binary(Opcode::Mul)
    }

    pub fn neg(&mut self) -> &mut Self {
        self.op(Opcode::Neg, DataType::Variable as u8, 0)
    }

    pub fn not(&mut self) -> &mut Self {
        self.op(Opcode::Not, DataType::Bool as u8, 0)
    }

    pub fn cmp(&mut self, comparison: Comparison) -> &mut Self {
        self.op(Opcode::Cmp, 0x55, (comparison as i16) << 8)
    }

    /// Mark the current offset.
    pub fn label(&mut self, name: &str) -> &mut Self {
        self.labels.insert(name.to_string(), self.offset());
        self
    }

    fn branch(&mut self, opcode: Opcode, label: &str) -> &mut Self {
        self.branches.push((self.offset(), opcode, label.to_string()));
        self.op(opcode, 0, 0)
    }

    pub fn b(&mut self, label: &str) -> &mut Self {
        self.branch(Opcode::B, label)
    }

    pub fn bt(&mut self, label: &str) -> &mut Self {
        self.branch(Opcode::Bt, label)
    }

    pub fn bf(&mut self, label: &str) -> &mut Self {
        self.branch(Opcode::Bf, label)
    }

    pub fn call(&mut self, function: &str, argc: u16) -> &mut Self {
        self.functions.push((self.offset(), function.to_string()));
        self.op(Opcode::Call, DataType::Int32 as u8, argc as i16)
            .operand32(0)
    }

    pub fn ret(&mut self) -> &mut Self {
        self.op(Opcode::Ret, DataType::Variable as u8, 0)
    }

    pub fn exit(&mut self) -> &mut Self {
        self.op(Opcode::Exit, DataType::Int32 as u8, 0)
    }

    /// The bytecode with branch displacements and string indices filled in.
    ///
    /// # Panics
    ///
    /// Panics if a branch names a label that was never placed.
    fn assemble(&self, string_index: impl Fn(&str) -> u32) -> Vec<u8> {
        let mut bytes = self.bytes.clone();
        for (at, opcode, label) in &self.branches {
            let target = *self
                .labels
                .get(label)
                .unwrap_or_else(|| panic!("branch to unplaced label {label:?}"));
            let word = Word::branch(*opcode, target as i32 - *at as i32);
            bytes[*at..*at + 4].copy_from_slice(&word.to_le_bytes());
        }
        for (at, text) in &self.strings {
            bytes[*at..*at + 4].copy_from_slice(&string_index(text).to_le_bytes());
        }
        bytes
    }
}

/// An object definition for [`FixtureBuilder`].
#[derive(Debug, Clone)]
pub struct ObjectDef {
    pub name: String,
    pub parent: Option<usize>,
    pub sprite: i32,
    pub visible: bool,
    pub solid: bool,
    pub depth: i32,
    pub persistent: bool,
    pub mask: i32,
    /// (event type, subtype, code entry name)
    pub events: Vec<(usize, u32, String)>,
}

impl ObjectDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            sprite: -1,
            visible: true,
            solid: false,
            depth: 0,
            persistent: false,
            mask: -1,
            events: Vec::new(),
        }
    }

    pub fn parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn event(mut self, event_type: usize, subtype: u32, code: &str) -> Self {
        self.events.push((event_type, subtype, code.to_string()));
        self
    }
}

/// An instance placed in a [`RoomDef`].
#[derive(Debug, Clone)]
pub struct InstanceDef {
    pub x: i32,
    pub y: i32,
    pub object: usize,
    pub creation_code: Option<String>,
    pub pre_create_code: Option<String>,
}

impl InstanceDef {
    pub fn new(x: i32, y: i32, object: usize) -> Self {
        Self {
            x,
            y,
            object,
            creation_code: None,
            pre_create_code: None,
        }
    }

    pub fn creation_code(mut self, code: &str) -> Self {
        self.creation_code = Some(code.to_string());
        self
    }

    pub fn pre_create_code(mut self, code: &str) -> Self {
        self.pre_create_code = Some(code.to_string());
        self
    }
}

/// A room definition for [`FixtureBuilder`].
#[derive(Debug, Clone)]
pub struct RoomDef {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub speed: u32,
    pub persistent: bool,
    pub creation_code: Option<String>,
    pub views: Vec<View>,
    pub instances: Vec<InstanceDef>,
}

impl RoomDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            width: 640,
            height: 480,
            speed: 60,
            persistent: false,
            creation_code: None,
            views: Vec::new(),
            instances: Vec::new(),
        }
    }

    pub fn creation_code(mut self, code: &str) -> Self {
        self.creation_code = Some(code.to_string());
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    pub fn instance(mut self, instance: InstanceDef) -> Self {
        self.instances.push(instance);
        self
    }
}

/// Builds a complete container image.
#[derive(Debug, Clone)]
pub struct FixtureBuilder {
    bytecode_version: u8,
    gen8: bool,
    form: bool,
    name: String,
    code: Vec<(String, CodeAsm, u16)>,
    scripts: Vec<(String, String)>,
    objects: Vec<ObjectDef>,
    rooms: Vec<RoomDef>,
    extra: Vec<([u8; 4], Vec<u8>)>,
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            bytecode_version: 17,
            gen8: true,
            form: true,
            name: "fixture".to_string(),
            code: Vec::new(),
            scripts: Vec::new(),
            objects: Vec::new(),
            rooms: Vec::new(),
            extra: Vec::new(),
        }
    }

    pub fn bytecode_version(mut self, version: u8) -> Self {
        self.bytecode_version = version;
        self
    }

    /// Leave out the GEN8 chunk.
    pub fn without_gen8(mut self) -> Self {
        self.gen8 = false;
        self
    }

    /// Emit a bare chunk sequence instead of a FORM wrapper.
    pub fn bare(mut self) -> Self {
        self.form = false;
        self
    }

    /// Add a code entry.
    pub fn code(mut self, name: &str, asm: &CodeAsm) -> Self {
        self.code.push((name.to_string(), asm.clone(), 0));
        self
    }

    /// Add a code entry that declares `arguments` arguments.
    pub fn code_with_arguments(mut self, name: &str, asm: &CodeAsm, arguments: u16) -> Self {
        self.code.push((name.to_string(), asm.clone(), arguments));
        self
    }

    /// Add a script backed by an existing code entry.
    pub fn script(mut self, name: &str, code: &str) -> Self {
        self.scripts.push((name.to_string(), code.to_string()));
        self
    }

    pub fn object(mut self, object: ObjectDef) -> Self {
        self.objects.push(object);
        self
    }

    pub fn room(mut self, room: RoomDef) -> Self {
        self.rooms.push(room);
        self
    }

    /// Append an extra chunk after the standard ones.
    pub fn chunk(mut self, tag: &[u8; 4], payload: &[u8]) -> Self {
        self.extra.push((*tag, payload.to_vec()));
        self
    }

    fn code_id(&self, name: &str) -> i32 {
        self.code
            .iter()
            .position(|(n, _, _)| n == name)
            .map_or(i32::MAX, |i| i as i32)
    }

    fn optional_code(&self, name: &Option<String>) -> i32 {
        name.as_deref().map_or(-1, |n| self.code_id(n))
    }

    /// Lay out the container image.
    pub fn build(&self) -> Vec<u8> {
        let mut strings = StringPool::default();
        strings.intern(&self.name);
        for (name, asm, _) in &self.code {
            strings.intern(name);
            for (_, text) in &asm.strings {
                strings.intern(text);
            }
            for (_, name, _) in &asm.variables {
                strings.intern(name);
            }
            for (_, name) in &asm.functions {
                strings.intern(name);
            }
        }
        for (name, _) in &self.scripts {
            strings.intern(name);
        }
        for object in &self.objects {
            strings.intern(&object.name);
        }
        for room in &self.rooms {
            strings.intern(&room.name);
        }

        let mut out = Image::default();
        let form = self.form.then(|| out.begin_chunk(b"FORM"));

        self.write_strg(&mut out, &mut strings);
        if self.gen8 {
            self.write_gen8(&mut out, &strings);
        }
        self.write_scpt(&mut out, &strings);
        let sites = self.write_code(&mut out, &strings);
        self.write_vari(&mut out, &strings, &sites);
        self.write_func(&mut out, &strings, &sites);
        self.write_objt(&mut out, &strings);
        self.write_room(&mut out, &strings);
        for (tag, payload) in &self.extra {
            let chunk = out.begin_chunk(tag);
            out.bytes(payload);
            out.end_chunk(chunk);
        }

        if let Some(form) = form {
            out.end_chunk(form);
        }
        out.data
    }

    fn write_strg(&self, out: &mut Image, strings: &mut StringPool) {
        let chunk = out.begin_chunk(b"STRG");
        let list = out.pointer_list(strings.texts.len());
        for (i, text) in strings.texts.iter().enumerate() {
            let at = out.position();
            out.patch(list + 4 * i, at as u32);
            out.u32(text.len() as u32);
            strings.addresses.push(out.position() as u32);
            out.bytes(text.as_bytes());
            out.u8(0);
        }
        out.end_chunk(chunk);
    }

    fn write_gen8(&self, out: &mut Image, strings: &StringPool) {
        let chunk = out.begin_chunk(b"GEN8");
        let name = strings.address(&self.name);
        out.u8(0);
        out.u8(self.bytecode_version);
        out.u16(0);
        out.u32(name); // filename
        out.u32(0); // config
        out.u32(100_000 + self.objects.len() as u32);
        out.u32(10_000_000);
        out.u32(1);
        out.bytes(&[0; 16]);
        out.u32(name);
        for part in [1, 0, 0, 0] {
            out.u32(part);
        }
        out.u32(640);
        out.u32(480);
        out.u32(0);
        out.u32(0);
        out.bytes(&[0; 16]);
        out.u64(0);
        out.u32(name); // display name
        out.u64(0);
        out.u64(0);
        out.i32(0);
        out.u32(0);
        out.u32(self.rooms.len() as u32);
        for i in 0..self.rooms.len() {
            out.u32(i as u32);
        }
        out.end_chunk(chunk);
    }

    fn write_scpt(&self, out: &mut Image, strings: &StringPool) {
        let chunk = out.begin_chunk(b"SCPT");
        let list = out.pointer_list(self.scripts.len());
        for (i, (name, code)) in self.scripts.iter().enumerate() {
            out.patch(list + 4 * i, out.position() as u32);
            out.u32(strings.address(name));
            out.i32(self.code_id(code));
        }
        out.end_chunk(chunk);
    }

    fn write_code(&self, out: &mut Image, strings: &StringPool) -> Sites {
        let chunk = out.begin_chunk(b"CODE");
        let list = out.pointer_list(self.code.len());
        let mut entries = Vec::new();
        for (i, (name, asm, arguments)) in self.code.iter().enumerate() {
            out.patch(list + 4 * i, out.position() as u32);
            out.u32(strings.address(name));
            out.u32(asm.bytes.len() as u32);
            out.u16(0);
            out.u16(*arguments);
            entries.push(out.position());
            out.i32(0); // relative address, patched below
            out.u32(0);
        }

        let mut sites = Sites::default();
        for ((_, asm, _), relative_at) in self.code.iter().zip(entries) {
            let blob = out.position();
            out.patch(relative_at, (blob as i64 - relative_at as i64) as u32);
            out.bytes(&asm.assemble(|text| strings.index(text)));
            for (at, name, instance_type) in &asm.variables {
                sites.variable(name, *instance_type, blob + at);
            }
            for (at, name) in &asm.functions {
                sites.function(name, blob + at);
            }
        }
        out.end_chunk(chunk);
        sites
    }

    fn write_vari(&self, out: &mut Image, strings: &StringPool, sites: &Sites) {
        let chunk = out.begin_chunk(b"VARI");
        out.u32(sites.variables.len() as u32);
        out.u32(sites.variables.len() as u32);
        out.u32(0);
        for (i, ((name, instance_type), addresses)) in sites.variables.iter().enumerate() {
            out.u32(strings.address(name));
            out.i32(*instance_type);
            out.i32(i as i32);
            out.u32(addresses.len() as u32);
            out.i32(addresses.first().map_or(-1, |&a| a as i32));
            out.link_chain(addresses, i as u32);
        }
        out.end_chunk(chunk);
    }

    fn write_func(&self, out: &mut Image, strings: &StringPool, sites: &Sites) {
        let chunk = out.begin_chunk(b"FUNC");
        out.u32(sites.functions.len() as u32);
        for (i, (name, addresses)) in sites.functions.iter().enumerate() {
            out.u32(strings.address(name));
            out.u32(addresses.len() as u32);
            out.i32(addresses.first().map_or(-1, |&a| a as i32));
            out.link_chain(addresses, i as u32);
        }

        // Local names per code entry.
        out.u32(self.code.len() as u32);
        for (name, asm, _) in &self.code {
            let mut locals: Vec<&str> = Vec::new();
            for (_, var, instance_type) in &asm.variables {
                if *instance_type == INSTANCE_TYPE_SELF && !locals.contains(&var.as_str()) {
                    locals.push(var);
                }
            }
            out.u32(locals.len() as u32);
            out.u32(strings.address(name));
            for (i, local) in locals.iter().enumerate() {
                out.u32(i as u32);
                out.u32(strings.address(local));
            }
        }
        out.end_chunk(chunk);
    }

    fn write_objt(&self, out: &mut Image, strings: &StringPool) {
        let chunk = out.begin_chunk(b"OBJT");
        let list = out.pointer_list(self.objects.len());
        for (i, object) in self.objects.iter().enumerate() {
            out.patch(list + 4 * i, out.position() as u32);
            out.u32(strings.address(&object.name));
            out.i32(object.sprite);
            out.u32(object.visible as u32);
            out.u32(object.solid as u32);
            out.i32(object.depth);
            out.u32(object.persistent as u32);
            out.i32(object.parent.map_or(-100, |p| p as i32));
            out.i32(object.mask);
            out.u32(0); // physics
            out.u32(0); // sensor
            out.u32(1); // shape
            out.f32(0.5);
            out.f32(0.1);
            out.u32(0);
            out.f32(0.1);
            out.f32(0.1);
            out.i32(0); // vertex count
            out.f32(0.2);
            out.u32(1);
            out.u32(0);

            let types = out.pointer_list(EVENT_TYPE_COUNT);
            for event_type in 0..EVENT_TYPE_COUNT {
                out.patch(types + 4 * event_type, out.position() as u32);
                let events: Vec<_> = object
                    .events
                    .iter()
                    .filter(|(t, _, _)| *t == event_type)
                    .collect();
                let event_list = out.pointer_list(events.len());
                for (j, (_, subtype, code)) in events.iter().enumerate() {
                    out.patch(event_list + 4 * j, out.position() as u32);
                    out.u32(*subtype);
                    let actions = out.pointer_list(1);
                    out.patch(actions, out.position() as u32);
                    for field in 0..14 {
                        if field == 8 {
                            out.i32(self.code_id(code));
                        } else {
                            out.u32(0);
                        }
                    }
                }
            }
        }
        out.end_chunk(chunk);
    }

    fn write_room(&self, out: &mut Image, strings: &StringPool) {
        let chunk = out.begin_chunk(b"ROOM");
        let list = out.pointer_list(self.rooms.len());
        for (i, room) in self.rooms.iter().enumerate() {
            out.patch(list + 4 * i, out.position() as u32);
            out.u32(strings.address(&room.name));
            out.u32(0); // caption
            out.u32(room.width);
            out.u32(room.height);
            out.u32(room.speed);
            out.u32(room.persistent as u32);
            out.u32(0);
            out.u32(1);
            out.i32(self.optional_code(&room.creation_code));
            out.u32(0);
            let pointers = out.position();
            for _ in 0..4 {
                out.u32(0);
            }
            out.u32(0); // world
            for bound in [0, 0, room.width, room.height] {
                out.u32(bound);
            }
            out.f32(0.0);
            out.f32(10.0);
            out.f32(0.1);

            // Backgrounds.
            out.patch(pointers, out.position() as u32);
            out.pointer_list(0);

            out.patch(pointers + 4, out.position() as u32);
            let views = out.pointer_list(room.views.len());
            for (j, view) in room.views.iter().enumerate() {
                out.patch(views + 4 * j, out.position() as u32);
                out.u32(view.enabled as u32);
                for v in [view.view.0, view.view.1, view.view.2, view.view.3] {
                    out.i32(v);
                }
                for v in [view.port.0, view.port.1, view.port.2, view.port.3] {
                    out.i32(v);
                }
                out.u32(view.border.0);
                out.u32(view.border.1);
                out.i32(view.speed.0);
                out.i32(view.speed.1);
                out.i32(view.follow);
            }

            out.patch(pointers + 8, out.position() as u32);
            let instances = out.pointer_list(room.instances.len());
            for (j, instance) in room.instances.iter().enumerate() {
                out.patch(instances + 4 * j, out.position() as u32);
                out.i32(instance.x);
                out.i32(instance.y);
                out.i32(instance.object as i32);
                out.u32(100_001 + j as u32);
                out.i32(self.optional_code(&instance.creation_code));
                out.f32(1.0);
                out.f32(1.0);
                out.u32(0xFFFF_FFFF);
                out.f32(0.0);
                if self.bytecode_version >= 16 {
                    out.i32(self.optional_code(&instance.pre_create_code));
                }
            }

            // Tiles.
            out.patch(pointers + 12, out.position() as u32);
            out.pointer_list(0);
        }
        out.end_chunk(chunk);
    }
}

/// Interned strings in STRG order.
#[derive(Debug, Default)]
struct StringPool {
    texts: Vec<String>,
    lookup: HashMap<String, usize>,
    /// Address of each string's character data, filled by STRG.
    addresses: Vec<u32>,
}

impl StringPool {
    fn intern(&mut self, text: &str) {
        if !self.lookup.contains_key(text) {
            self.lookup.insert(text.to_string(), self.texts.len());
            self.texts.push(text.to_string());
        }
    }

    fn index(&self, text: &str) -> u32 {
        self.lookup.get(text).map_or(u32::MAX, |&i| i as u32)
    }

    fn address(&self, text: &str) -> u32 {
        self.lookup
            .get(text)
            .and_then(|&i| self.addresses.get(i))
            .copied()
            .unwrap_or(0)
    }
}

/// Reference sites collected while writing CODE, in first-use order.
#[derive(Debug, Default)]
struct Sites {
    variables: Vec<((String, i32), Vec<usize>)>,
    functions: Vec<(String, Vec<usize>)>,
}

impl Sites {
    fn variable(&mut self, name: &str, instance_type: i32, address: usize) {
        match self
            .variables
            .iter_mut()
            .find(|((n, t), _)| n == name && *t == instance_type)
        {
            Some((_, addresses)) => addresses.push(address),
            None => self
                .variables
                .push(((name.to_string(), instance_type), vec![address])),
        }
    }

    fn function(&mut self, name: &str, address: usize) {
        match self.functions.iter_mut().find(|(n, _)| n == name) {
            Some((_, addresses)) => addresses.push(address),
            None => self.functions.push((name.to_string(), vec![address])),
        }
    }
}

/// Growing little-endian image with patchable fields.
#[derive(Debug, Default)]
struct Image {
    data: Vec<u8>,
}

impl Image {
    fn position(&self) -> usize {
        self.data.len()
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    fn u8(&mut self, value: u8) {
        self.data.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.bytes(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.bytes(&value.to_le_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.bytes(&value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.bytes(&value.to_le_bytes());
    }

    fn f32(&mut self, value: f32) {
        self.bytes(&value.to_le_bytes());
    }

    fn patch(&mut self, at: usize, value: u32) {
        self.data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Write a pointer list of `count` zeroed entries; returns the offset of
    /// the first entry.
    fn pointer_list(&mut self, count: usize) -> usize {
        self.u32(count as u32);
        let first = self.position();
        for _ in 0..count {
            self.u32(0);
        }
        first
    }

    /// Write a chunk header; returns its offset for [`Image::end_chunk`].
    fn begin_chunk(&mut self, tag: &[u8; 4]) -> usize {
        let at = self.position();
        self.bytes(tag);
        self.u32(0);
        at
    }

    fn end_chunk(&mut self, at: usize) {
        let length = self.position() - at - 8;
        self.patch(at + 4, length as u32);
    }

    /// Link reference sites: each operand holds the distance to the next
    /// site, the last one holds the table index.
    fn link_chain(&mut self, sites: &[usize], index: u32) {
        for (i, &site) in sites.iter().enumerate() {
            let operand = match sites.get(i + 1) {
                Some(&next) => (next - site) as u32,
                None => index,
            };
            self.patch(site + 4, operand);
        }
    }
}

//! Load tests over fixture-built containers.

use luna_common::{
    BranchCondition, Comparison, DataType, DecodeError, Instruction, LValue, Opcode, PushKind,
    PushOperand, Scope, Word,
};

use crate::fixtures::{CodeAsm, FixtureBuilder, InstanceDef, ObjectDef, RoomDef};
use crate::game::{Game, View};
use crate::{read_chunks, LoadError};

fn load(builder: FixtureBuilder) -> Game {
    Game::from_bytes(&builder.build()).unwrap()
}

fn single(asm: &CodeAsm) -> Game {
    load(FixtureBuilder::new().code("main", asm))
}

#[test]
fn empty_container_loads() {
    let game = load(FixtureBuilder::new());
    assert!(game.code.is_empty());
    assert_eq!(game.general.bytecode_version, 17);
    assert_eq!(game.general.name.as_deref(), Some("fixture"));
}

#[test]
fn bare_sequence_loads() {
    let mut asm = CodeAsm::new();
    asm.push_f64(1.0).ret();
    let game = load(FixtureBuilder::new().bare().code("main", &asm));
    assert_eq!(game.programs.len(), 1);
}

#[test]
fn missing_gen8_defaults_version() {
    let game = load(FixtureBuilder::new().without_gen8());
    assert_eq!(game.general.bytecode_version, 17);
}

#[test]
fn old_bytecode_is_rejected() {
    let data = FixtureBuilder::new().bytecode_version(14).build();
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::UnsupportedBytecode { version: 14 })
    ));
}

#[test]
fn unknown_chunks_are_skipped() {
    let game = load(FixtureBuilder::new().chunk(b"TXTR", &[0xAA; 12]).chunk(b"AUDO", &[]));
    assert!(game.objects.is_empty());
}

#[test]
fn truncated_container_is_malformed() {
    let mut data = FixtureBuilder::new().build();
    data.truncate(data.len() - 3);
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::MalformedContainer { .. })
    ));
}

fn past_end_of_chunk(result: Result<Game, LoadError>) -> bool {
    matches!(
        result,
        Err(LoadError::MalformedContainer { ref reason, .. }) if reason.contains("past end of chunk")
    )
}

#[test]
fn short_gen8_does_not_read_into_the_next_chunk() {
    let data = FixtureBuilder::new()
        .without_gen8()
        .chunk(b"GEN8", &[0, 17, 0, 0])
        .chunk(b"PADD", &[0; 200])
        .build();
    assert!(past_end_of_chunk(Game::from_bytes(&data)));
}

#[test]
fn func_count_beyond_its_chunk_is_malformed() {
    // Bare sequence: FUNC claims one entry but holds only the count.
    let mut data = Vec::new();
    data.extend_from_slice(b"FUNC");
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(b"PADD");
    data.extend_from_slice(&200u32.to_le_bytes());
    data.extend_from_slice(&[0; 200]);
    assert!(past_end_of_chunk(Game::from_bytes(&data)));
}

#[test]
fn handler_consumption_does_not_move_boundaries() {
    // The STRG handler stops at its last string; the padding after it must
    // not shift the next chunk.
    let mut asm = CodeAsm::new();
    asm.push_string("abc").ret();
    let data = FixtureBuilder::new().code("main", &asm).build();
    let before: Vec<_> = read_chunks(&data).unwrap().iter().map(|c| c.tag).collect();
    let game = Game::from_bytes(&data).unwrap();
    let after: Vec<_> = read_chunks(&data).unwrap().iter().map(|c| c.tag).collect();
    assert_eq!(before, after);
    assert_eq!(game.programs.len(), 1);
}

#[test]
fn decodes_typed_pushes() {
    let mut asm = CodeAsm::new();
    asm.push_f64(2.5)
        .push_f32(0.5)
        .push_i32(-7)
        .push_i64(1 << 40)
        .push_bool(true)
        .push_i16(-3)
        .pushi(12)
        .push_string("name")
        .ret();
    let game = single(&asm);
    let values: Vec<LValue> = game.programs[0]
        .instructions
        .iter()
        .filter_map(|i| match i {
            Instruction::Push {
                operand: PushOperand::Value(v),
                ..
            } => Some(v.clone()),
            Instruction::PushImmediate { value, .. } => Some(value.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(values.len(), 8);
    assert!(matches!(values[0], LValue::Real(x) if x == 2.5));
    assert!(matches!(values[1], LValue::Real(x) if x == 0.5));
    assert!(matches!(values[2], LValue::Int32(-7)));
    assert!(matches!(values[3], LValue::Int64(v) if v == 1 << 40));
    assert!(matches!(values[4], LValue::Bool(true)));
    assert!(matches!(values[5], LValue::Int32(-3)));
    assert!(matches!(values[6], LValue::Int32(12)));
    assert_eq!(values[7].as_str(), Some("name"));
}

#[test]
fn operand_sizes_set_offsets() {
    let mut asm = CodeAsm::new();
    asm.push_f64(1.0).push_i32(2).push_i16(3).add().ret();
    let game = single(&asm);
    assert_eq!(game.programs[0].offsets, vec![0, 12, 20, 24, 28]);
    assert_eq!(game.programs[0].length, 32);
}

#[test]
fn forward_branch_resolves_to_instruction_index() {
    // push 1, push 2, bf +N, push 3, exit
    let mut asm = CodeAsm::new();
    asm.push_f64(1.0)
        .push_f64(2.0)
        .bf("skip")
        .push_f64(3.0)
        .label("skip")
        .exit();
    let game = single(&asm);
    let program = &game.programs[0];
    match &program.instructions[2] {
        Instruction::Branch {
            condition,
            offset,
            target,
            word,
        } => {
            assert_eq!(*condition, BranchCondition::IfFalse);
            // The branch sits at 24; N = 16 bytes later is the exit.
            assert_eq!(word.branch_displacement(), 16);
            assert_eq!(*offset, 40);
            assert_eq!(*target, 4);
            assert_eq!(program.offsets[*target], 40);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn backward_branch_resolves() {
    let mut asm = CodeAsm::new();
    asm.label("top").push_f64(1.0).bt("top").exit();
    let game = single(&asm);
    match &game.programs[0].instructions[1] {
        Instruction::Branch { offset, target, .. } => {
            assert_eq!(*offset, 0);
            assert_eq!(*target, 0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn branch_to_end_resolves_past_last_instruction() {
    let mut asm = CodeAsm::new();
    asm.b("end").push_f64(1.0).label("end");
    let game = single(&asm);
    match &game.programs[0].instructions[0] {
        Instruction::Branch { target, .. } => assert_eq!(*target, 2),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn misaligned_branch_is_invalid() {
    let mut asm = CodeAsm::new();
    // b +8 lands inside the 12-byte push that follows.
    asm.raw(Word::branch(Opcode::B, 8).raw()).push_f64(1.0).exit();
    let data = FixtureBuilder::new().code("main", &asm).build();
    match Game::from_bytes(&data) {
        Err(LoadError::Decode { code, source }) => {
            assert_eq!(code, "main");
            assert_eq!(source, DecodeError::InvalidBranchTarget { at: 0, target: 8 });
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn words_reconstruct_after_decode() {
    let mut asm = CodeAsm::new();
    asm.push_var("x", Scope::Local)
        .push_f64(1.0)
        .cmp(Comparison::GreaterEqual)
        .bf("end")
        .push_i16(4)
        .conv(DataType::Int16, DataType::Double)
        .neg()
        .dup(0)
        .popz()
        .call("show", 1)
        .label("end")
        .exit();
    let data = FixtureBuilder::new().code("main", &asm).build();
    let game = Game::from_bytes(&data).unwrap();
    let entry = &game.code[0];
    let program = &game.programs[0];
    for (instr, &offset) in program.instructions.iter().zip(&program.offsets) {
        let at = entry.address + offset;
        let raw = u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        assert_eq!(instr.word().raw(), raw, "word at {offset:#x}");
    }
}

#[test]
fn comparison_and_call_operands() {
    let mut asm = CodeAsm::new();
    asm.push_f64(1.0)
        .push_f64(2.0)
        .cmp(Comparison::LessThan)
        .call("show_debug_message", 1)
        .ret();
    let game = single(&asm);
    let program = &game.programs[0];
    assert!(matches!(
        program.instructions[2],
        Instruction::Compare {
            comparison: Comparison::LessThan,
            ..
        }
    ));
    match &program.instructions[3] {
        Instruction::Call { function, argc, .. } => {
            assert_eq!(&**function, "show_debug_message");
            assert_eq!(*argc, 1);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(game.functions.len(), 1);
}

#[test]
fn function_sites_are_keyed_by_the_instruction_word() {
    let mut asm = CodeAsm::new();
    asm.call("show_debug_message", 0).ret();
    let mut data = FixtureBuilder::new().code("main", &asm).build();
    let func = read_chunks(&data)
        .unwrap()
        .into_iter()
        .find(|c| &c.tag == b"FUNC")
        .unwrap();
    // count, then {name, occurrences, first_address}.
    let field = func.offset + 12;
    let word = i32::from_le_bytes(data[field..field + 4].try_into().unwrap());

    // Pointing the chain at the operand instead of the word leaves the
    // call without a site.
    data[field..field + 4].copy_from_slice(&(word + 4).to_le_bytes());
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::UnresolvedReference {
            table: "function site",
            index,
        }) if index == word as i64
    ));
}

#[test]
fn unknown_comparison_is_decode_error() {
    let mut asm = CodeAsm::new();
    asm.raw(Word::new(Opcode::Cmp as u8, 0x55, 9 << 8).raw());
    let data = FixtureBuilder::new().code("main", &asm).build();
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::Decode {
            source: DecodeError::UnknownComparison { at: 0, value: 9 },
            ..
        })
    ));
}

#[test]
fn unknown_data_type_is_decode_error() {
    let mut asm = CodeAsm::new();
    asm.raw(Word::new(Opcode::Push as u8, 0x0C, 0).raw());
    let data = FixtureBuilder::new().code("main", &asm).build();
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::Decode {
            source: DecodeError::UnknownDataType { value: 0xC, .. },
            ..
        })
    ));
}

#[test]
fn push_of_instance_type_is_unsupported() {
    let mut asm = CodeAsm::new();
    asm.raw(Word::new(Opcode::Push as u8, DataType::Instance as u8, 0).raw());
    let data = FixtureBuilder::new().code("main", &asm).build();
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::Decode {
            source: DecodeError::UnsupportedOperand { opcode: 0xC0, .. },
            ..
        })
    ));
}

#[test]
fn truncated_operand_is_decode_error() {
    let mut asm = CodeAsm::new();
    // push.d with only 4 of its 8 operand bytes.
    asm.raw(Word::new(Opcode::Push as u8, DataType::Double as u8, 0).raw())
        .raw(0);
    let data = FixtureBuilder::new().code("main", &asm).build();
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::Decode {
            source: DecodeError::Truncated { at: 0 },
            ..
        })
    ));
}

#[test]
fn unknown_opcode_decodes_without_operand() {
    let mut asm = CodeAsm::new();
    asm.raw(0x4200_0000).push_f64(1.0).ret();
    let game = single(&asm);
    let program = &game.programs[0];
    assert!(matches!(program.instructions[0], Instruction::Unknown { .. }));
    assert_eq!(program.offsets[1], 4);
}

#[test]
fn unsupported_forms_keep_their_operands() {
    let mut asm = CodeAsm::new();
    asm.raw(Word::new(Opcode::Break as u8, DataType::Int32 as u8, -1).raw())
        .raw(0xDEAD)
        .raw(Word::new(Opcode::Dup as u8, 0x05, 0x0100).raw())
        .raw(Word::new(Opcode::CallV as u8, 0x05, 0).raw())
        .exit();
    let game = single(&asm);
    let program = &game.programs[0];
    assert!(matches!(
        program.instructions[0],
        Instruction::Unsupported {
            operand: Some(0xDEAD),
            ..
        }
    ));
    assert!(matches!(program.instructions[1], Instruction::Unsupported { operand: None, .. }));
    assert!(matches!(program.instructions[2], Instruction::Unsupported { .. }));
    assert!(matches!(program.instructions[3], Instruction::Exit { .. }));
}

#[test]
fn push_kinds_force_scope() {
    let mut asm = CodeAsm::new();
    asm.push_local("a").push_global("b").push_builtin("current_time").exit();
    let game = single(&asm);
    let kinds: Vec<(PushKind, Scope)> = game.programs[0]
        .instructions
        .iter()
        .filter_map(|i| match i {
            Instruction::Push {
                kind,
                operand: PushOperand::Variable(v),
                ..
            } => Some((*kind, v.scope)),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (PushKind::Local, Scope::Local),
            (PushKind::Global, Scope::Global),
            (PushKind::Builtin, Scope::Local),
        ]
    );
}

#[test]
fn static_scope_from_instance_type() {
    let mut asm = CodeAsm::new();
    asm.push_f64(1.0).pop_var("count", Scope::Static).exit();
    let game = single(&asm);
    assert_eq!(game.variables[0].scope, Scope::Static);
    assert_eq!(game.variables[0].instance_type, -16);
}

#[test]
fn code_locals_are_recorded() {
    let mut asm = CodeAsm::new();
    asm.push_f64(1.0).pop_var("i", Scope::Local).exit();
    let game = single(&asm);
    assert_eq!(game.code_locals.len(), 1);
    assert_eq!(&*game.code_locals[0].code, "main");
    assert_eq!(&*game.code_locals[0].locals[0].1, "i");
}

#[test]
fn scripts_resolve_to_code() {
    let mut asm = CodeAsm::new();
    asm.push_f64(1.0).ret();
    let game = load(
        FixtureBuilder::new()
            .code_with_arguments("gml_Script_helper", &asm, 2)
            .script("helper", "gml_Script_helper"),
    );
    assert_eq!(game.script_code("helper"), Some(0));
    assert_eq!(game.code[0].arguments, 2);
    assert_eq!(game.programs[0].arguments, 2);
}

#[test]
fn unknown_script_code_is_unresolved() {
    let data = FixtureBuilder::new().script("helper", "missing").build();
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::UnresolvedReference { table: "code", .. })
    ));
}

#[test]
fn objects_and_events() {
    let mut create = CodeAsm::new();
    create.exit();
    let game = load(
        FixtureBuilder::new()
            .code("gml_Object_base_Create_0", &create)
            .object(ObjectDef::new("base").event(0, 0, "gml_Object_base_Create_0"))
            .object(ObjectDef::new("child").parent(0).persistent()),
    );
    assert_eq!(game.objects.len(), 2);
    let child = &game.objects[1];
    assert_eq!(&*child.name, "child");
    assert_eq!(child.parent, Some(0));
    assert!(child.persistent);
    assert_eq!(child.events.len(), crate::EVENT_TYPE_COUNT);
    assert!((child.physics.density - 0.5).abs() < f32::EPSILON);

    let (owner, event) = game.find_event(1, 0, 0).unwrap();
    assert_eq!(owner, 0);
    assert_eq!(event.actions, vec![0]);
    assert_eq!(game.object_index("child"), Some(1));
    assert!(game.is_ancestor(1, 0));
}

#[test]
fn cyclic_parents_are_rejected() {
    let data = FixtureBuilder::new()
        .object(ObjectDef::new("a").parent(1))
        .object(ObjectDef::new("b").parent(0))
        .build();
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::CyclicInheritance { .. })
    ));
}

#[test]
fn missing_event_code_is_unresolved() {
    let data = FixtureBuilder::new()
        .object(ObjectDef::new("a").event(3, 0, "nope"))
        .build();
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::UnresolvedReference { table: "code", .. })
    ));
}

#[test]
fn rooms_views_and_instances() {
    let mut code = CodeAsm::new();
    code.exit();
    let game = load(
        FixtureBuilder::new()
            .code("gml_RoomCC_start_0", &code)
            .code("gml_Room_start_Create", &code)
            .object(ObjectDef::new("player"))
            .room(
                RoomDef::new("start")
                    .creation_code("gml_Room_start_Create")
                    .view(View {
                        enabled: true,
                        view: (0, 0, 320, 240),
                        port: (0, 0, 640, 480),
                        border: (32, 32),
                        speed: (-1, -1),
                        follow: -1,
                    })
                    .instance(InstanceDef::new(16, 32, 0).creation_code("gml_RoomCC_start_0")),
            ),
    );
    let room = &game.rooms[0];
    assert_eq!(&*room.name, "start");
    assert_eq!(room.creation_code, Some(1));
    assert_eq!(room.views.len(), 1);
    assert_eq!(room.views[0].port, (0, 0, 640, 480));
    assert_eq!(room.instances.len(), 1);
    let instance = &room.instances[0];
    assert_eq!((instance.x, instance.y, instance.object), (16, 32, 0));
    assert_eq!(instance.creation_code, Some(0));
    assert_eq!(instance.pre_create_code, None);
    assert_eq!(game.general.room_order, vec![0]);
    assert_eq!(game.room_index("start"), Some(0));
}

#[test]
fn pre_create_code_needs_version_16() {
    let mut code = CodeAsm::new();
    code.exit();
    let room = RoomDef::new("r").instance(InstanceDef::new(0, 0, 0).pre_create_code("pre"));
    let game = load(
        FixtureBuilder::new()
            .bytecode_version(16)
            .code("pre", &code)
            .object(ObjectDef::new("o"))
            .room(room.clone()),
    );
    assert_eq!(game.rooms[0].instances[0].pre_create_code, Some(0));

    let game = load(
        FixtureBuilder::new()
            .bytecode_version(15)
            .code("pre", &code)
            .object(ObjectDef::new("o"))
            .room(room),
    );
    assert_eq!(game.rooms[0].instances[0].pre_create_code, None);
}

#[test]
fn room_instance_with_unknown_object_is_unresolved() {
    let data = FixtureBuilder::new()
        .room(RoomDef::new("r").instance(InstanceDef::new(0, 0, 5)))
        .build();
    assert!(matches!(
        Game::from_bytes(&data),
        Err(LoadError::UnresolvedReference { table: "object", index: 5 })
    ));
}

//! Integration tests for the Luna runtime.
//!
//! Every test builds a real container image with the fixture builder,
//! loads it, and runs bytecode through a session.

use std::rc::Rc;

use luna_common::{Comparison, LValue, Scope};
use luna_container::fixtures::{CodeAsm, FixtureBuilder, InstanceDef, ObjectDef, RoomDef};
use luna_container::{Game, View};
use luna_vm::{
    run, Domain, DrawCall, EventType, HeadlessPlatform, Message, RecordingRenderer, RuntimeError,
    Session, SessionConfig, FIRST_INSTANCE_ID,
};
use proptest::prelude::*;

// ============================================================
// Helper functions
// ============================================================

fn game(builder: FixtureBuilder) -> Game {
    Game::from_bytes(&builder.build()).unwrap()
}

fn session(builder: FixtureBuilder) -> Session {
    Session::new(game(builder), SessionConfig::default()).unwrap()
}

/// Assemble a single code entry called `main` and run it.
fn eval(build: impl FnOnce(&mut CodeAsm)) -> Result<LValue, RuntimeError> {
    let mut asm = CodeAsm::new();
    build(&mut asm);
    run(game(FixtureBuilder::new().code("main", &asm)), "main")
}

fn code(build: impl FnOnce(&mut CodeAsm)) -> CodeAsm {
    let mut asm = CodeAsm::new();
    build(&mut asm);
    asm
}

fn real(value: &LValue) -> f64 {
    match value {
        LValue::Real(x) => *x,
        other => panic!("expected a real, got {other:?}"),
    }
}

// ============================================================
// Arithmetic and control flow
// ============================================================

#[test]
fn push_push_add_ret_returns_eight() {
    let result = eval(|a| {
        a.push_f64(5.0).push_f64(3.0).add().ret();
    })
    .unwrap();
    assert_eq!(real(&result), 8.0);
}

#[test]
fn subtraction_keeps_operand_order() {
    let result = eval(|a| {
        a.push_f64(10.0).push_f64(3.0).sub().ret();
    })
    .unwrap();
    assert_eq!(real(&result), 7.0);
}

#[test]
fn strings_concatenate() {
    let result = eval(|a| {
        a.push_string("lu").push_string("na").add().ret();
    })
    .unwrap();
    assert_eq!(result, LValue::from("luna"));
}

#[test]
fn string_plus_number_is_a_type_mismatch() {
    // push.s is 8 bytes, push.d is 12: the add sits at offset 20.
    let err = eval(|a| {
        a.push_string("x").push_f64(1.0).add().ret();
    })
    .unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch { at: 20, .. }), "{err}");
}

#[test]
fn running_off_the_end_returns_undefined() {
    let result = eval(|a| {
        a.push_f64(1.0).popz();
    })
    .unwrap();
    assert!(result.is_undefined());
}

#[test]
fn exit_returns_undefined() {
    let result = eval(|a| {
        a.push_f64(1.0).exit().push_f64(2.0).ret();
    })
    .unwrap();
    assert!(result.is_undefined());
}

#[test]
fn pop_on_empty_stack_underflows() {
    let err = eval(|a| {
        a.popz();
    })
    .unwrap_err();
    assert_eq!(err, RuntimeError::StackUnderflow { at: 0 });
}

#[test]
fn unknown_opcode_is_skipped() {
    let result = eval(|a| {
        a.raw(0x4200_0001).push_f64(2.0).ret();
    })
    .unwrap();
    assert_eq!(real(&result), 2.0);
}

#[test]
fn unsupported_instructions_are_skipped() {
    // pushenv, popenv and the dup swap form.
    let result = eval(|a| {
        a.raw(0xBA00_0000)
            .push_f64(2.0)
            .raw(0xBB00_0000)
            .raw(0x8600_0100)
            .ret();
    })
    .unwrap();
    assert_eq!(real(&result), 2.0);
}

#[test]
fn counting_loop() {
    let result = eval(|a| {
        a.pushi(0)
            .pop_var("i", Scope::Local)
            .label("top")
            .push_local("i")
            .pushi(5)
            .cmp(Comparison::LessThan)
            .bf("end")
            .push_local("i")
            .pushi(1)
            .add()
            .pop_var("i", Scope::Local)
            .b("top")
            .label("end")
            .push_local("i")
            .ret();
    })
    .unwrap();
    assert_eq!(result, LValue::Real(5.0));
}

#[test]
fn forward_branch_skips_instructions() {
    let result = eval(|a| {
        a.push_f64(1.0)
            .push_bool(false)
            .bf("skip")
            .push_f64(2.0)
            .ret()
            .label("skip")
            .push_f64(3.0)
            .ret();
    })
    .unwrap();
    assert_eq!(real(&result), 3.0);
}

#[test]
fn branch_to_end_finishes_the_segment() {
    let result = eval(|a| {
        a.b("end").push_f64(1.0).ret().label("end");
    })
    .unwrap();
    assert!(result.is_undefined());
}

#[test]
fn conditional_branches_need_exact_truth_values() {
    // 2.0 is neither true nor false: neither branch is taken.
    let result = eval(|a| {
        a.push_f64(2.0)
            .bt("taken")
            .push_f64(2.0)
            .bf("taken")
            .push_string("fell through")
            .ret()
            .label("taken")
            .push_string("taken")
            .ret();
    })
    .unwrap();
    assert_eq!(result, LValue::from("fell through"));
}

#[test]
fn comparison_pushes_one_or_zero() {
    let equal = eval(|a| {
        a.push_f64(1.0).push_i32(1).cmp(Comparison::Equal).ret();
    })
    .unwrap();
    assert_eq!(equal, LValue::Real(1.0));

    let less = eval(|a| {
        a.push_f64(3.0).push_f64(2.0).cmp(Comparison::LessThan).ret();
    })
    .unwrap();
    assert_eq!(less, LValue::Real(0.0));
}

#[test]
fn comparison_result_prints_as_a_number() {
    let result = eval(|a| {
        a.push_f64(1.0)
            .push_f64(2.0)
            .cmp(Comparison::LessThan)
            .call("string", 1)
            .ret();
    })
    .unwrap();
    assert_eq!(result, LValue::from("1"));
}

#[test]
fn dup_copies_the_top_values() {
    let result = eval(|a| {
        a.push_f64(4.0).dup(0).mul().ret();
    })
    .unwrap();
    assert_eq!(real(&result), 16.0);
}

// ============================================================
// Scopes
// ============================================================

#[test]
fn locals_are_per_domain_and_globals_are_shared() {
    let setter = code(|a| {
        a.push_f64(10.0)
            .pop_var("hp", Scope::Local)
            .push_f64(3.0)
            .pop_var("score", Scope::Global)
            .exit();
    });
    let getter = code(|a| {
        a.push_var("hp", Scope::Local).ret();
    });
    let global = code(|a| {
        a.push_global("score").ret();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("set", &setter)
            .code("get", &getter)
            .code("global", &global),
    );

    let mut a = Domain::for_instance(Some(FIRST_INSTANCE_ID));
    let mut b = Domain::for_instance(Some(FIRST_INSTANCE_ID + 1));
    session.run_code("set", &mut a).unwrap();

    assert_eq!(session.run_code("get", &mut a).unwrap(), LValue::Real(10.0));
    assert!(session.run_code("get", &mut b).unwrap().is_undefined());
    assert_eq!(session.run_code("global", &mut b).unwrap(), LValue::Real(3.0));
    assert_eq!(session.scopes().global("score"), LValue::Real(3.0));
}

#[test]
fn statics_persist_per_code_entry() {
    let counter = code(|a| {
        a.push_var("n", Scope::Static)
            .pushi(1)
            .add()
            .pop_var("n", Scope::Static)
            .push_var("n", Scope::Static)
            .ret();
    });
    let mut session = session(FixtureBuilder::new().code("counter", &counter));
    session
        .scopes_mut()
        .set_static(&Rc::from("counter"), "n", LValue::Real(0.0));

    let mut domain = Domain::new();
    assert_eq!(session.run_code("counter", &mut domain).unwrap(), LValue::Real(1.0));
    assert_eq!(session.run_code("counter", &mut domain).unwrap(), LValue::Real(2.0));
    assert!(domain.is_empty());
}

#[test]
fn domain_is_restored_after_an_error() {
    let failing = code(|a| {
        a.push_f64(1.0).pop_var("before", Scope::Local).popz();
    });
    let mut session = session(FixtureBuilder::new().code("failing", &failing));
    let mut domain = Domain::new();
    domain.set("kept", 5.0);

    let err = session.run_code("failing", &mut domain).unwrap_err();
    assert!(matches!(err, RuntimeError::StackUnderflow { .. }));
    assert_eq!(domain.get("kept"), LValue::Real(5.0));
    assert_eq!(domain.get("before"), LValue::Real(1.0));
}

#[test]
fn unknown_code_entry() {
    let mut session = session(FixtureBuilder::new());
    assert_eq!(
        session.run_code("missing", &mut Domain::new()).unwrap_err(),
        RuntimeError::UnknownCode {
            name: "missing".to_string()
        }
    );
}

// ============================================================
// Calls
// ============================================================

#[test]
fn native_call_returns_its_result() {
    let result = eval(|a| {
        a.push_f64(-3.5).call("abs", 1).ret();
    })
    .unwrap();
    assert_eq!(real(&result), 3.5);
}

#[test]
fn first_popped_value_is_argument_zero() {
    let sub2 = code(|a| {
        a.push_local("argument0").push_local("argument1").sub().ret();
    });
    let main = code(|a| {
        a.push_f64(1.0).push_f64(10.0).call("sub2", 2).ret();
    });
    let game = game(
        FixtureBuilder::new()
            .code("main", &main)
            .code_with_arguments("gml_Script_sub2", &sub2, 2),
    );
    assert_eq!(real(&run(game, "main").unwrap()), 9.0);
}

#[test]
fn script_frames_bind_argument_array_and_count() {
    let count = code(|a| {
        a.push_local("argument_count")
            .push_local("argument")
            .call("array_length", 1)
            .add()
            .ret();
    });
    let main = code(|a| {
        a.push_f64(7.0)
            .push_f64(8.0)
            .push_f64(9.0)
            .call("count", 3)
            .push_f64(100.0)
            .add()
            .ret();
    });
    let game = game(
        FixtureBuilder::new()
            .code("main", &main)
            .code("count_impl", &count)
            .script("count", "count_impl"),
    );
    assert_eq!(real(&run(game, "main").unwrap()), 106.0);
}

#[test]
fn script_locals_do_not_leak_into_the_caller() {
    let script = code(|a| {
        a.push_f64(1.0).pop_var("temp", Scope::Local).exit();
    });
    let main = code(|a| {
        a.call("helper", 0).popz().push_local("temp").ret();
    });
    let game = game(
        FixtureBuilder::new()
            .code("main", &main)
            .code("gml_Script_helper", &script),
    );
    assert!(run(game, "main").unwrap().is_undefined());
}

#[test]
fn unknown_function() {
    let err = eval(|a| {
        a.call("nope", 0).ret();
    })
    .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::UnknownFunction {
            at: 0,
            name: "nope".to_string()
        }
    );
}

#[test]
fn script_cannot_pop_its_callers_values() {
    let bad = code(|a| {
        a.popz().exit();
    });
    let main = code(|a| {
        a.push_f64(1.0).call("bad", 0).ret();
    });
    let game = game(
        FixtureBuilder::new()
            .code("main", &main)
            .code("gml_Script_bad", &bad),
    );
    assert_eq!(
        run(game, "main").unwrap_err(),
        RuntimeError::StackUnderflow { at: 0 }
    );
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    let recurse = code(|a| {
        a.call("recurse", 0).ret();
    });
    let game = game(FixtureBuilder::new().code("gml_Script_recurse", &recurse));
    let config = SessionConfig {
        max_call_depth: 8,
        ..SessionConfig::default()
    };
    let mut session = Session::new(game, config).unwrap();
    let err = session
        .run_code("gml_Script_recurse", &mut Domain::new())
        .unwrap_err();
    assert_eq!(err, RuntimeError::CallDepthExceeded { at: 0, limit: 8 });
}

#[test]
fn native_argument_errors_propagate() {
    let err = eval(|a| {
        a.push_string("ten").call("floor", 1).ret();
    })
    .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidArgument { function: "floor", .. }));
}

// ============================================================
// Built-in variables and natives
// ============================================================

#[test]
fn room_builtin_tracks_the_current_room() {
    let which = code(|a| {
        a.push_builtin("room").ret();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("which", &which)
            .room(RoomDef::new("first"))
            .room(RoomDef::new("second")),
    );
    assert_eq!(session.run_code("which", &mut Domain::new()).unwrap(), LValue::Real(-1.0));
    session.enter_room(1).unwrap();
    assert_eq!(session.run_code("which", &mut Domain::new()).unwrap(), LValue::Real(1.0));
}

#[test]
fn current_time_is_not_negative() {
    let result = eval(|a| {
        a.push_builtin("current_time").ret();
    })
    .unwrap();
    assert!(real(&result) >= 0.0);
}

#[test]
fn parameters_are_zero_based() {
    let second = code(|a| {
        a.push_f64(1.0).call("parameter_string", 1).ret();
    });
    let missing = code(|a| {
        a.push_f64(5.0).call("parameter_string", 1).ret();
    });
    let count = code(|a| {
        a.call("parameter_count", 0).ret();
    });
    let config = SessionConfig {
        parameters: vec!["-debug".to_string(), "level2".to_string()],
        ..SessionConfig::default()
    };
    let mut session = Session::new(
        game(
            FixtureBuilder::new()
                .code("second", &second)
                .code("missing", &missing)
                .code("count", &count),
        ),
        config,
    )
    .unwrap();
    let mut domain = Domain::new();
    assert_eq!(session.run_code("second", &mut domain).unwrap(), LValue::from("level2"));
    assert_eq!(session.run_code("missing", &mut domain).unwrap(), LValue::from(""));
    assert_eq!(session.run_code("count", &mut domain).unwrap(), LValue::Real(2.0));
}

#[test]
fn same_seed_same_numbers() {
    let roll = code(|a| {
        a.push_f64(1000.0).call("irandom", 1).ret();
    });
    let builder = FixtureBuilder::new().code("roll", &roll);
    let config = SessionConfig {
        seed: 42,
        ..SessionConfig::default()
    };
    let mut first = Session::new(game(builder.clone()), config.clone()).unwrap();
    let mut second = Session::new(game(builder), config).unwrap();
    for _ in 0..5 {
        let a = first.run_code("roll", &mut Domain::new()).unwrap();
        let b = second.run_code("roll", &mut Domain::new()).unwrap();
        assert_eq!(a, b);
        let n = real(&a);
        assert!((0.0..1000.0).contains(&n) && n.fract() == 0.0);
    }
}

#[test]
fn array_literal_and_create() {
    let result = eval(|a| {
        a.push_f64(3.0)
            .push_f64(2.0)
            .push_f64(1.0)
            .call("@@NewGMLArray@@", 3)
            .ret();
    })
    .unwrap();
    assert_eq!(
        result,
        LValue::Array(vec![LValue::Real(1.0), LValue::Real(2.0), LValue::Real(3.0)])
    );

    let filled = eval(|a| {
        a.push_string("x").push_f64(2.0).call("array_create", 2).ret();
    })
    .unwrap();
    assert_eq!(filled.to_string(), "[x, x]");
}

#[test]
fn oversized_arrays_are_rejected() {
    for size in [1e18, -1.0, f64::INFINITY] {
        let err = eval(|a| {
            a.push_f64(size).call("array_create", 1).ret();
        })
        .unwrap_err();
        assert!(
            matches!(err, RuntimeError::InvalidArgument { function: "array_create", .. }),
            "size {size}: {err:?}"
        );
    }
}

#[test]
fn string_and_real_convert() {
    let result = eval(|a| {
        a.push_string(" 2.5 ")
            .call("real", 1)
            .push_f64(2.0)
            .mul()
            .call("string", 1)
            .ret();
    })
    .unwrap();
    assert_eq!(result, LValue::from("5"));
}

#[test]
fn lengthdir_snaps_axis_directions() {
    let result = eval(|a| {
        a.push_f64(90.0).push_f64(10.0).call("lengthdir_x", 2).ret();
    })
    .unwrap();
    assert_eq!(real(&result), 0.0);
}

#[test]
fn ds_list_round_trip() {
    let result = eval(|a| {
        a.call("ds_list_create", 0)
            .pop_var("list", Scope::Local)
            .push_f64(8.0)
            .push_f64(7.0)
            .push_local("list")
            .call("ds_list_add", 3)
            .popz()
            .push_f64(1.0)
            .push_local("list")
            .call("ds_list_find_value", 2)
            .push_local("list")
            .call("ds_list_size", 1)
            .mul()
            .ret();
    })
    .unwrap();
    // [7, 8]: element 1 is 8, size 2.
    assert_eq!(real(&result), 16.0);
}

#[test]
fn ds_map_set_find_exists() {
    let result = eval(|a| {
        a.call("ds_map_create", 0)
            .pop_var("map", Scope::Local)
            .push_f64(3.0)
            .push_string("k")
            .push_local("map")
            .call("ds_map_set", 3)
            .popz()
            .push_string("k")
            .push_local("map")
            .call("ds_map_find_value", 2)
            .push_string("missing")
            .push_local("map")
            .call("ds_map_exists", 2)
            .add()
            .ret();
    })
    .unwrap();
    assert_eq!(real(&result), 3.0);
}

#[test]
fn destroyed_list_handle_is_rejected() {
    let err = eval(|a| {
        a.call("ds_list_create", 0)
            .dup(0)
            .call("ds_list_destroy", 1)
            .popz()
            .call("ds_list_size", 1)
            .ret();
    })
    .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidArgument { function: "ds_list_size", .. }));
}

#[test]
fn messages_and_keys_go_through_the_platform() {
    let main = code(|a| {
        a.push_string("hello")
            .call("show_debug_message", 1)
            .popz()
            .push_f64(32.0)
            .call("keyboard_check", 1)
            .ret();
    });
    let platform = HeadlessPlatform::new();
    let messages = platform.messages();
    platform.keys().borrow_mut().press(32);
    let mut session = Session::with_hosts(
        game(FixtureBuilder::new().code("main", &main)),
        SessionConfig::default(),
        Box::new(RecordingRenderer::new()),
        Box::new(platform),
    )
    .unwrap();
    assert_eq!(session.run_code("main", &mut Domain::new()).unwrap(), LValue::Real(1.0));
    assert_eq!(messages.borrow().as_slice(), &[Message::Debug("hello".to_string())]);
}

// ============================================================
// Objects, events and rooms
// ============================================================

#[test]
fn ancestry_through_natives() {
    let check = |child: f64, ancestor: f64| {
        let main = code(|a| {
            a.push_f64(ancestor).push_f64(child).call("object_is_ancestor", 2).ret();
        });
        let game = game(
            FixtureBuilder::new()
                .code("main", &main)
                .object(ObjectDef::new("a"))
                .object(ObjectDef::new("b").parent(0))
                .object(ObjectDef::new("c").parent(1)),
        );
        real(&run(game, "main").unwrap())
    };
    assert_eq!(check(2.0, 0.0), 1.0);
    assert_eq!(check(0.0, 2.0), 0.0);
    assert_eq!(check(2.0, 2.0), 0.0);
}

#[test]
fn object_queries() {
    let parent = code(|a| {
        a.push_f64(1.0).call("object_get_parent", 1).ret();
    });
    let orphan = code(|a| {
        a.push_f64(0.0).call("object_get_parent", 1).ret();
    });
    let name = code(|a| {
        a.push_f64(1.0).call("object_get_name", 1).ret();
    });
    let persistent = code(|a| {
        a.push_f64(0.0).call("object_get_persistent", 1).ret();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("parent", &parent)
            .code("orphan", &orphan)
            .code("name", &name)
            .code("persistent", &persistent)
            .object(ObjectDef::new("obj_base").persistent())
            .object(ObjectDef::new("obj_player").parent(0)),
    );
    let mut d = Domain::new();
    assert_eq!(session.run_code("parent", &mut d).unwrap(), LValue::Real(0.0));
    assert_eq!(session.run_code("orphan", &mut d).unwrap(), LValue::Real(-1.0));
    assert_eq!(session.run_code("name", &mut d).unwrap(), LValue::from("obj_player"));
    assert_eq!(session.run_code("persistent", &mut d).unwrap(), LValue::Real(1.0));
}

/// Parent object 0 with a Create handler, child object 1 that inherits
/// it explicitly and counts its steps.
fn family() -> FixtureBuilder {
    let parent_create = code(|a| {
        a.pushi(1).pop_var("created", Scope::Local).exit();
    });
    let child_create = code(|a| {
        a.call("event_inherited", 0)
            .popz()
            .push_f64(2.0)
            .pop_var("child_created", Scope::Local)
            .exit();
    });
    let child_step = code(|a| {
        a.push_local("created")
            .pushi(1)
            .add()
            .pop_var("created", Scope::Local)
            .exit();
    });
    let placed = code(|a| {
        a.push_f64(99.0).pop_var("z", Scope::Local).exit();
    });
    let room_code = code(|a| {
        a.pushi(1).pop_var("entered", Scope::Global).exit();
    });
    FixtureBuilder::new()
        .code("parent_create", &parent_create)
        .code("child_create", &child_create)
        .code("child_step", &child_step)
        .code("placed", &placed)
        .code("room_code", &room_code)
        .object(ObjectDef::new("parent").event(EventType::Create.index(), 0, "parent_create"))
        .object(
            ObjectDef::new("child")
                .parent(0)
                .event(EventType::Create.index(), 0, "child_create")
                .event(EventType::Step.index(), 0, "child_step"),
        )
        .room(
            RoomDef::new("start")
                .creation_code("room_code")
                .instance(InstanceDef::new(10, 20, 1).creation_code("placed")),
        )
}

#[test]
fn entering_a_room_creates_instances_and_runs_their_code() {
    let mut session = session(family());
    session.enter_room(0).unwrap();

    assert_eq!(session.room(), Some(0));
    assert_eq!(session.instance_count(), 1);
    let instance = session.instances().next().unwrap();
    assert_eq!(instance.id, FIRST_INSTANCE_ID);
    assert_eq!(instance.get("x"), LValue::Real(10.0));
    assert_eq!(instance.get("y"), LValue::Real(20.0));
    assert_eq!(instance.get("created"), LValue::Real(1.0));
    assert_eq!(instance.get("child_created"), LValue::Real(2.0));
    assert_eq!(instance.get("z"), LValue::Real(99.0));
    assert_eq!(session.scopes().global("entered"), LValue::Real(1.0));
}

#[test]
fn step_runs_step_events() {
    let mut session = session(family());
    session.enter_room(0).unwrap();
    session.step().unwrap();
    session.step().unwrap();
    let instance = session.instance(FIRST_INSTANCE_ID).unwrap();
    assert_eq!(instance.get("created"), LValue::Real(3.0));
    assert_eq!(session.frames(), 2);
}

#[test]
fn handlers_are_inherited_from_ancestors() {
    let parent_step = code(|a| {
        a.pushi(7).pop_var("stepped", Scope::Local).exit();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("parent_step", &parent_step)
            .object(ObjectDef::new("base").event(EventType::Step.index(), 0, "parent_step"))
            .object(ObjectDef::new("mid").parent(0))
            .object(ObjectDef::new("leaf").parent(1)),
    );
    let id = session.spawn_instance(0.0, 0.0, 0.0, 2).unwrap();
    session.step().unwrap();
    assert_eq!(session.instance(id).unwrap().get("stepped"), LValue::Real(7.0));
}

#[test]
fn room_goto_applies_after_the_frame() {
    let goto = code(|a| {
        a.push_f64(1.0).call("room_goto", 1).popz().exit();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("goto", &goto)
            .object(ObjectDef::new("walker").event(EventType::Draw.index(), 0, "goto"))
            .object(ObjectDef::new("keeper").persistent())
            .room(
                RoomDef::new("first")
                    .instance(InstanceDef::new(0, 0, 0))
                    .instance(InstanceDef::new(0, 0, 1)),
            )
            .room(RoomDef::new("second")),
    );
    session.start().unwrap();
    assert_eq!(session.room(), Some(0));
    assert_eq!(session.instance_count(), 2);

    session.step().unwrap();
    assert_eq!(session.room(), Some(1));
    assert_eq!(session.pending_room(), None);
    let survivors: Vec<_> = session.instances().map(|i| i.object).collect();
    assert_eq!(survivors, vec![1]);
}

#[test]
fn room_goto_rejects_unknown_rooms() {
    let err = eval(|a| {
        a.push_f64(3.0).call("room_goto", 1).ret();
    })
    .unwrap_err();
    assert_eq!(err, RuntimeError::UnknownRoom { index: 3 });
}

#[test]
fn enter_unknown_room() {
    let mut session = session(FixtureBuilder::new());
    assert_eq!(
        session.enter_room(5).unwrap_err(),
        RuntimeError::UnknownRoom { index: 5 }
    );
}

#[test]
fn instances_are_created_counted_and_destroyed() {
    let spawn = code(|a| {
        // instance_create_depth(4, 5, -1, 0) twice
        for _ in 0..2 {
            a.push_f64(0.0)
                .push_f64(-1.0)
                .push_f64(5.0)
                .push_f64(4.0)
                .call("instance_create_depth", 4)
                .pop_var("last", Scope::Global);
        }
        a.push_f64(0.0).call("instance_number", 1).ret();
    });
    let destroy_last = code(|a| {
        a.push_global("last")
            .call("instance_destroy", 1)
            .popz()
            .push_global("last")
            .call("instance_exists", 1)
            .push_f64(0.0)
            .call("instance_exists", 1)
            .add()
            .ret();
    });
    let on_destroy = code(|a| {
        a.push_local("id").pop_var("destroyed", Scope::Global).exit();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("spawn", &spawn)
            .code("destroy_last", &destroy_last)
            .code("on_destroy", &on_destroy)
            .object(ObjectDef::new("thing").event(EventType::Destroy.index(), 0, "on_destroy")),
    );
    let mut domain = Domain::new();
    assert_eq!(session.run_code("spawn", &mut domain).unwrap(), LValue::Real(2.0));
    let last = session.scopes().global("last");
    assert_eq!(last, LValue::Real(f64::from(FIRST_INSTANCE_ID + 1)));

    // The last instance is gone; the first still exists.
    assert_eq!(session.run_code("destroy_last", &mut domain).unwrap(), LValue::Real(1.0));
    assert_eq!(session.scopes().global("destroyed"), last);
    assert_eq!(session.instance_count(), 1);
}

#[test]
fn instance_destroy_without_arguments_destroys_the_caller() {
    let suicide = code(|a| {
        a.call("instance_destroy", 0).popz().exit();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("suicide", &suicide)
            .object(ObjectDef::new("mayfly").event(EventType::Step.index(), 0, "suicide")),
    );
    session.spawn_instance(0.0, 0.0, 0.0, 0).unwrap();
    session.spawn_instance(0.0, 0.0, 0.0, 0).unwrap();
    session.step().unwrap();
    assert_eq!(session.instance_count(), 0);
}

#[test]
fn destroy_from_a_script_sees_the_instance_variables() {
    let create = code(|a| {
        a.push_f64(5.0).pop_var("hp", Scope::Local).exit();
    });
    let step = code(|a| {
        a.call("kill", 0).popz().exit();
    });
    let kill = code(|a| {
        a.call("instance_destroy", 0).popz().exit();
    });
    let on_destroy = code(|a| {
        a.push_local("hp").pop_var("seen", Scope::Global).exit();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("create", &create)
            .code("step", &step)
            .code("kill_impl", &kill)
            .code("on_destroy", &on_destroy)
            .script("kill", "kill_impl")
            .object(
                ObjectDef::new("victim")
                    .event(EventType::Create.index(), 0, "create")
                    .event(EventType::Step.index(), 0, "step")
                    .event(EventType::Destroy.index(), 0, "on_destroy"),
            ),
    );
    session.spawn_instance(0.0, 0.0, 0.0, 0).unwrap();
    session.step().unwrap();
    assert_eq!(session.instance_count(), 0);
    assert_eq!(session.scopes().global("seen"), LValue::Real(5.0));
}

fn caller_hp(
    session: &mut Session,
    domain: &mut Domain,
    _args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let id = domain.instance.unwrap();
    Ok(session.instance(id).unwrap().get("hp"))
}

#[test]
fn instance_variables_stay_visible_while_a_handler_runs() {
    let step = code(|a| {
        a.push_f64(9.0)
            .pop_var("hp", Scope::Local)
            .call("caller_hp", 0)
            .pop_var("observed", Scope::Global)
            .exit();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("step", &step)
            .object(ObjectDef::new("watched").event(EventType::Step.index(), 0, "step")),
    );
    session.natives_mut().register("caller_hp", caller_hp).unwrap();
    let id = session.spawn_instance(0.0, 0.0, 0.0, 0).unwrap();
    session.step().unwrap();
    assert_eq!(session.scopes().global("observed"), LValue::Real(9.0));
    assert_eq!(session.instance(id).unwrap().get("hp"), LValue::Real(9.0));
}

#[test]
fn unresolved_function_names_are_reported() {
    let main = code(|a| {
        a.call("kill", 0)
            .popz()
            .call("abs", 0)
            .popz()
            .call("no_such_function", 0)
            .ret();
    });
    let kill = code(|a| {
        a.exit();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("main", &main)
            .code("kill_impl", &kill)
            .script("kill", "kill_impl"),
    );
    let missing: Vec<String> = session
        .unresolved_functions()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(missing, ["no_such_function"]);

    session.natives_mut().register("no_such_function", caller_hp).unwrap();
    assert!(session.unresolved_functions().is_empty());
}

#[test]
fn draw_events_reach_the_renderer() {
    let draw = code(|a| {
        a.push_f64(4.0)
            .push_local("y")
            .push_local("x")
            .call("draw_circle", 3)
            .popz()
            .push_string("hi")
            .push_f64(2.0)
            .push_f64(1.0)
            .call("draw_text", 3)
            .popz()
            .exit();
    });
    let renderer = RecordingRenderer::new();
    let calls = renderer.calls();
    let frames = renderer.frames();
    let mut session = Session::with_hosts(
        game(
            FixtureBuilder::new()
                .code("draw", &draw)
                .object(ObjectDef::new("ball").event(EventType::Draw.index(), 0, "draw"))
                .room(RoomDef::new("r").instance(InstanceDef::new(30, 40, 0))),
        ),
        SessionConfig::default(),
        Box::new(renderer),
        Box::new(HeadlessPlatform::new()),
    )
    .unwrap();
    session.start().unwrap();
    session.step().unwrap();

    assert_eq!(
        calls.borrow().as_slice(),
        &[
            DrawCall::Circle {
                x: 30.0,
                y: 40.0,
                radius: 4.0,
                outline: false
            },
            DrawCall::Text {
                x: 1.0,
                y: 2.0,
                text: "hi".to_string()
            },
        ]
    );
    assert_eq!(*frames.borrow(), 1);
}

#[test]
fn room_viewport_reads_the_view_port() {
    let viewport = code(|a| {
        a.push_f64(0.0).push_f64(0.0).call("room_get_viewport", 2).ret();
    });
    let view = View {
        enabled: true,
        port: (0, 0, 320, 240),
        ..View::default()
    };
    let game = game(
        FixtureBuilder::new()
            .code("main", &viewport)
            .room(RoomDef::new("r").view(view)),
    );
    assert_eq!(run(game, "main").unwrap().to_string(), "[1, 0, 0, 320, 240]");
}

#[test]
fn a_failed_event_leaves_the_session_usable() {
    let broken = code(|a| {
        a.popz().exit();
    });
    let fine = code(|a| {
        a.push_f64(1.0).ret();
    });
    let mut session = session(
        FixtureBuilder::new()
            .code("broken", &broken)
            .code("fine", &fine)
            .object(ObjectDef::new("bad").event(EventType::Step.index(), 0, "broken")),
    );
    let id = session.spawn_instance(3.0, 0.0, 0.0, 0).unwrap();
    assert!(session.step().is_err());
    assert_eq!(session.instance(id).unwrap().get("x"), LValue::Real(3.0));
    assert_eq!(session.run_code("fine", &mut Domain::new()).unwrap(), LValue::Real(1.0));
}

// ============================================================
// Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn addition_matches_f64(a in -1e9f64..1e9, b in -1e9f64..1e9) {
        let result = eval(|asm| {
            asm.push_f64(a).push_f64(b).add().ret();
        }).unwrap();
        prop_assert_eq!(real(&result), a + b);
    }

    #[test]
    fn comparisons_agree_with_f64(a in -1e3f64..1e3, b in -1e3f64..1e3) {
        let result = eval(|asm| {
            asm.push_f64(a).push_f64(b).cmp(Comparison::LessThan).ret();
        }).unwrap();
        prop_assert_eq!(result, LValue::Real(if a < b { 1.0 } else { 0.0 }));
    }
}

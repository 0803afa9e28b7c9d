//! Instantiation Tests
//!
//! End-to-end behaviour of the instantiation procedure through the public API.

use familiar_type_engine::node::*;
use familiar_type_engine::{instantiate, EngineError, Instantiator, Limits, State};

fn run(node: &Node) -> Node {
    instantiate(&Context::new(), node).unwrap()
}

/// Union branches of a result, with `never` contributing none.
fn branches(node: &Node) -> Vec<Node> {
    match &node.kind {
        Kind::Union(variants) => variants.iter().flat_map(branches).collect(),
        Kind::Primitive(Primitive::Never) => Vec::new(),
        _ => vec![node.clone()],
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_missing_reference_is_unchanged() {
    let node = object([("x", reference("Missing"))]);
    let out = Instantiator::default()
        .instantiate_with(&Context::new(), &State::new(), &node)
        .unwrap();
    assert_eq!(out, node);
}

#[test]
fn test_key_selection() {
    let subject = object([("a", number()), ("b", string()), ("c", boolean())]);
    assert_eq!(
        run(&pick(subject, keys(["a", "c"]))),
        object([("a", number()), ("c", boolean())])
    );
}

#[test]
fn test_mapped_identity() {
    let node = mapped(
        parameter_extends("K", key_of(object([("x", number()), ("y", string())]))),
        reference("K"),
        None,
    );
    assert_eq!(run(&node), object([("x", literal("x")), ("y", literal("y"))]));
}

#[test]
fn test_large_numbers_in_templates() {
    let node = template_literal(vec![literal("n"), literal(1e20)]);
    assert_eq!(run(&node), literal("n100000000000000000000"));
    let node = template_literal(vec![literal("v"), literal(2.5)]);
    assert_eq!(run(&node), literal("v2.5"));
}

#[test]
fn test_template_cross_product() {
    let node = template_literal(vec![
        literal("key"),
        union(vec![literal("A"), literal("B")]),
        union(vec![literal("X"), literal("Y")]),
    ]);
    assert_eq!(
        run(&node),
        union(vec![
            literal("keyAX"),
            literal("keyAY"),
            literal("keyBX"),
            literal("keyBY"),
        ])
    );
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_concrete_nodes_are_idempotent() {
    let list: Context = [("List", object([("next", reference("List").optional())]))]
        .into_iter()
        .collect();
    let samples = vec![
        object([
            ("id", string().readonly()),
            ("tags", array(string()).optional()),
        ])
        .annotate("title", "Item"),
        union(vec![literal("a"), literal(1i64), literal(true), null()]),
        intersect(vec![object([("a", number())]), object([("b", number())])]),
        function(vec![string(), rest_tuple(vec![], number())], promise(void())),
        constructor(vec![], object::<&str, _>([])),
        dictionary(string(), tuple(vec![bigint(), symbol()])),
        template_pattern(vec![literal("id-"), number()]),
        async_iterator(iterator(any())),
        cyclic(list, "List"),
    ];
    for sample in samples {
        assert!(sample.is_concrete(), "{} should be concrete", sample);
        assert_eq!(run(&sample), sample);
    }
}

#[test]
fn test_referential_transparency() {
    let ctx: Context = [
        ("Id", string()),
        ("User", object([("id", reference("Id")), ("name", string())])),
        ("Box", generic(vec![parameter("T")], object([("value", reference("T"))]))),
    ]
    .into_iter()
    .collect();
    let node = partial(call(reference("Box"), vec![pick(reference("User"), keys(["id"]))]));
    let state = State::with_callstack(["Outer"]);
    let engine = Instantiator::default();

    let first = engine.instantiate_with(&ctx, &state, &node).unwrap();
    let second = engine.instantiate_with(&ctx, &state, &node).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first,
        object([("value", object([("id", string())]).optional())])
    );
}

#[test]
fn test_self_recursive_generic_terminates() {
    // F<X> = { v: X, next: F<X> } never reaches a base case. The inner call
    // repeats the expansion in progress, so a single frame suffices.
    let body = object([
        ("v", reference("X")),
        ("next", call(reference("F"), vec![reference("X")])),
    ]);
    let ctx: Context = [("F", generic(vec![parameter("X")], body))].into_iter().collect();
    let node = call(reference("F"), vec![number()]);

    let expected = cyclic(
        [(
            "F<number>",
            object([("v", number()), ("next", reference("F<number>"))]),
        )]
        .into_iter()
        .collect(),
        "F<number>",
    );
    assert_eq!(instantiate(&ctx, &node).unwrap(), expected);

    let single_frame = Instantiator::new(Limits {
        max_call_depth: 1,
        ..Limits::default()
    });
    assert_eq!(single_frame.instantiate(&ctx, &node).unwrap(), expected);
}

#[test]
fn test_recursive_generic_with_base_case() {
    // Down<N> = N extends 0 ? "done" : Down<0>
    let step = conditional(
        reference("N"),
        literal(0i64),
        literal("done"),
        call(reference("Down"), vec![literal(0i64)]),
    );
    let ctx: Context = [("Down", generic(vec![parameter("N")], step))].into_iter().collect();
    let engine = Instantiator::new(Limits {
        max_call_depth: 1,
        ..Limits::default()
    });
    let out = engine
        .instantiate(&ctx, &call(reference("Down"), vec![literal(3i64)]))
        .unwrap();
    assert_eq!(out, literal("done"));
}

#[test]
fn test_key_selection_and_exclusion_are_complementary() {
    let subject = object([
        ("a", number()),
        ("b", string().optional()),
        ("c", boolean().readonly()),
    ]);
    let Some(all) = subject.properties().cloned() else {
        unreachable!()
    };
    let names: Vec<&str> = all.keys().map(String::as_str).collect();

    for mask in 0..(1u32 << names.len()) {
        let selected: Vec<&str> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, name)| *name)
            .collect();
        let picked = run(&pick(subject.clone(), keys(selected.clone())));
        let omitted = run(&omit(subject.clone(), keys(selected.clone())));
        let picked = picked.properties().unwrap();
        let omitted = omitted.properties().unwrap();

        assert_eq!(picked.len() + omitted.len(), all.len(), "mask {}", mask);
        for (name, prop) in &all {
            let in_picked = picked.get(name);
            let in_omitted = omitted.get(name);
            assert!(in_picked.is_some() != in_omitted.is_some(), "{} in exactly one", name);
            assert_eq!(in_picked.or(in_omitted), Some(prop));
        }
    }
}

#[test]
fn test_difference_and_filter_are_complementary() {
    let subject = union(vec![
        literal("a"),
        literal(1i64),
        string(),
        boolean(),
        null(),
        object([("a", number())]),
        array(number()),
    ]);
    let expected_branches = vec![
        literal("a"),
        literal(1i64),
        string(),
        literal(true),
        literal(false),
        null(),
        object([("a", number())]),
        array(number()),
    ];
    let filters = vec![
        string(),
        number(),
        literal("a"),
        object([("a", number())]),
        union(vec![string(), null()]),
        boolean(),
        never(),
        unknown(),
    ];
    for filter in filters {
        let excluded = branches(&run(&exclude(subject.clone(), filter.clone())));
        let extracted = branches(&run(&extract(subject.clone(), filter.clone())));
        assert_eq!(excluded.len() + extracted.len(), expected_branches.len(), "filter {}", filter);
        for branch in &expected_branches {
            let count = excluded.contains(branch) as usize + extracted.contains(branch) as usize;
            assert_eq!(count, 1, "{} against {}", branch, filter);
        }
    }
}

#[test]
fn test_untaken_branch_is_never_instantiated() {
    let ctx = Context::new();
    let taken_true = conditional(
        literal("x"),
        string(),
        literal("ok"),
        pick(reference("Nowhere"), keys(["a"])),
    );
    assert_eq!(instantiate(&ctx, &taken_true).unwrap(), literal("ok"));

    let taken_false = conditional(
        number(),
        string(),
        pick(number(), keys(["a"])),
        literal("ok"),
    );
    assert_eq!(instantiate(&ctx, &taken_false).unwrap(), literal("ok"));
}

// =============================================================================
// Errors and partial evaluation
// =============================================================================

#[test]
fn test_constraint_violation_surfaces() {
    let ctx: Context = [(
        "Named",
        generic(
            vec![parameter_extends("T", object([("name", string())]))],
            reference("T"),
        ),
    )]
    .into_iter()
    .collect();
    let ok = instantiate(&ctx, &call(reference("Named"), vec![object([("name", literal("a"))])]));
    assert_eq!(ok.unwrap(), object([("name", literal("a"))]));

    let err = instantiate(&ctx, &call(reference("Named"), vec![object([("id", number())])])).unwrap_err();
    let EngineError::ConstraintViolation { parameter, constraint, .. } = err else {
        panic!("Expected constraint violation");
    };
    assert_eq!(parameter, "T");
    assert_eq!(*constraint, object([("name", string())]));
}

#[test]
fn test_deferred_action_retries_in_richer_context() {
    let node = object([("draft", partial(reference("Post")))]);
    let first = instantiate(&Context::new(), &node).unwrap();
    assert_eq!(first, node);

    let ctx: Context = [("Post", object([("title", string())]))].into_iter().collect();
    let second = instantiate(&ctx, &first).unwrap();
    assert_eq!(second, object([("draft", object([("title", string().optional())]))]));
}

#[test]
fn test_unresolved_call_retries_in_richer_context() {
    let node = call(reference("List"), vec![string()]);
    let first = instantiate(&Context::new(), &node).unwrap();
    assert_eq!(first, node);

    let ctx: Context = [("List", generic(vec![parameter("T")], array(reference("T"))))]
        .into_iter()
        .collect();
    assert_eq!(instantiate(&ctx, &first).unwrap(), array(string()));
}

#[test]
fn test_deep_input_is_a_typed_error_on_a_small_stack() {
    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let mut node = string();
            for _ in 0..600 {
                node = partial(object([("a", node)]));
            }
            instantiate(&Context::new(), &node)
        })
        .unwrap();
    assert_eq!(
        handle.join().unwrap(),
        Err(EngineError::DepthExceeded {
            limit: Limits::default().max_depth
        })
    );
}

#[test]
fn test_depth_limit_is_a_typed_error() {
    let mut node = string();
    for _ in 0..100 {
        node = array(node);
    }
    let engine = Instantiator::new(Limits {
        max_depth: 50,
        ..Limits::default()
    });
    assert_eq!(
        engine.instantiate(&Context::new(), &node),
        Err(EngineError::DepthExceeded { limit: 50 })
    );
}

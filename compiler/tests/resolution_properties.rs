//! End-to-end properties of the resolution engine, driven through `Session`

use compiler::ast::{
    Ast, AstBuilder, ClassDecl, FnDecl, InterfaceDecl, Modifier, TraitDecl, TraitUse, VarItem,
};
use compiler::sema::{LookupResult, Namespace, NodeId, SymbolId};
use compiler::{Session, SessionConfig, UnitAnalysis};

fn analyze(mut ast: Ast) -> (Session, Ast, UnitAnalysis) {
    compiler::logging::init_test();
    let mut session = Session::new(SessionConfig::default());
    let analysis = session.analyze(&mut ast);
    (session, ast, analysis)
}

fn count(analysis: &UnitAnalysis, code: &str) -> usize {
    analysis.diagnostics.with_code(code).count()
}

fn symbol(ast: &Ast, node: NodeId) -> SymbolId {
    ast.node(node).symbol.expect("node has a symbol")
}

fn method(b: &mut AstBuilder, name: &str, mods: &[Modifier], body: Vec<NodeId>) -> NodeId {
    let block = b.block(body);
    b.func(FnDecl::named(name).with_mods(mods).with_body(block))
}

#[test]
fn test_value_and_type_namespaces_are_isolated() {
    let mut b = AstBuilder::new("main.phs");
    let f = method(&mut b, "item", &[], vec![]);
    let c = b.class(ClassDecl::named("item"));
    let (session, ast, analysis) = analyze(b.finish(vec![f, c]));

    assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());
    let unit = analysis.unit_scope.unwrap();
    let graph = session.graph();
    let value = graph.lookup_here(unit, "item", Some(Namespace::Value));
    let ty = graph.lookup_here(unit, "item", Some(Namespace::Type));
    assert_eq!(value, Some(symbol(&ast, f)));
    assert_eq!(ty, Some(symbol(&ast, c)));
}

#[test]
fn test_forward_declaration_is_refined_in_place() {
    let mut b = AstBuilder::new("main.phs");
    let forward = b.func(FnDecl::named("run"));
    let full = method(&mut b, "run", &[], vec![]);
    let callee = b.name("run");
    let call = b.call(callee, vec![]);
    let stmt = b.expr_stmt(call);
    let (session, ast, analysis) = analyze(b.finish(vec![forward, full, stmt]));

    assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());
    let unit = analysis.unit_scope.unwrap();
    let live = session.graph().lookup_here(unit, "run", Some(Namespace::Value));
    assert_eq!(live, Some(symbol(&ast, full)));
    assert_eq!(ast.node(callee).symbol, live);
    assert!(!session.graph().symbol(symbol(&ast, forward)).reachable);
}

#[test]
fn test_incompatible_refinement_is_rejected() {
    let mut b = AstBuilder::new("main.phs");
    let forward = b.func(FnDecl::named("run"));
    let full = method(&mut b, "run", &[Modifier::Final], vec![]);
    let (_, _, analysis) = analyze(b.finish(vec![forward, full]));
    assert_eq!(count(&analysis, "E2203"), 1);
}

#[test]
fn test_inner_declaration_shadows_outer() {
    let mut b = AstBuilder::new("main.phs");
    let one = b.int(1);
    let outer = b.var("x", Some(one));
    let two = b.int(2);
    let inner = b.var("x", Some(two));
    let use_x = b.name("x");
    let ret = b.ret(Some(use_x));
    let f = method(&mut b, "f", &[], vec![inner, ret]);
    let (session, ast, analysis) = analyze(b.finish(vec![outer, f]));

    assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());
    let bound = symbol(&ast, use_x);
    let owner = session.graph().symbol(bound).scope.unwrap();
    assert_eq!(Some(owner), ast.node(f).scope);
}

#[test]
fn test_final_blocks_the_whole_chain_and_const_only_its_scope() {
    let mut b = AstBuilder::new("main.phs");
    let one = b.int(1);
    let sealed = b.var_decl(&[Modifier::Final], vec![VarItem::new("sealed", Some(one))]);
    let two = b.int(2);
    let shadow = b.var("sealed", Some(two));
    let f = method(&mut b, "f", &[], vec![shadow]);

    let three = b.int(3);
    let limit = b.constant("LIMIT", three);
    let four = b.int(4);
    let local_limit = b.constant("LIMIT", four);
    let g = method(&mut b, "g", &[], vec![local_limit]);
    let five = b.int(5);
    let again = b.constant("LIMIT", five);

    let (_, _, analysis) = analyze(b.finish(vec![sealed, f, limit, g, again]));
    assert_eq!(count(&analysis, "E2201"), 1);
    assert_eq!(count(&analysis, "E2202"), 1);
}

#[test]
fn test_closures_capture_through_two_levels() {
    let mut b = AstBuilder::new("main.phs");
    let zero = b.int(0);
    let counter = b.var("count", Some(zero));
    let use_count = b.name("count");
    let inner_ret = b.ret(Some(use_count));
    let inner_body = b.block(vec![inner_ret]);
    let inner = b.closure(FnDecl::default().with_body(inner_body));
    let middle_ret = b.ret(Some(inner));
    let middle_body = b.block(vec![middle_ret]);
    let middle = b.closure(FnDecl::default().with_body(middle_body));
    let ret = b.ret(Some(middle));
    let outer = method(&mut b, "outer", &[], vec![counter, ret]);
    let (session, ast, analysis) = analyze(b.finish(vec![outer]));

    assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());
    let graph = session.graph();
    let count_sym = symbol(&ast, use_count);
    assert!(graph.symbol(count_sym).captured);
    for closure in [inner, middle] {
        let scope = ast.node(closure).scope.unwrap();
        assert!(graph.scope(scope).captured.contains(&count_sym));
    }
    let outer_scope = ast.node(outer).scope.unwrap();
    assert!(!graph.scope(outer_scope).captured.contains(&count_sym));
}

#[test]
fn test_private_members_are_hidden_outside_their_class() {
    let mut b = AstBuilder::new("main.phs");
    let one = b.int(1);
    let secret = b.var_decl(&[Modifier::Private, Modifier::Static], vec![VarItem::new("secret", Some(one))]);
    let peek = b.self_ref();
    let peek = b.member(peek, "secret");
    let ret = b.ret(Some(peek));
    let reveal = method(&mut b, "reveal", &[Modifier::Public, Modifier::Static], vec![ret]);
    let vault = b.class(ClassDecl::named("Vault").with_members(vec![secret, reveal]));

    let outside = b.name("Vault");
    let outside = b.member(outside, "secret");
    let stmt = b.expr_stmt(outside);
    let (_, _, analysis) = analyze(b.finish(vec![vault, stmt]));

    assert_eq!(count(&analysis, "E2101"), 1);
    assert_eq!(analysis.diagnostics.errors().count(), 1);
}

#[test]
fn test_using_a_trait_twice_copies_once() {
    let mut b = AstBuilder::new("main.phs");
    let body = b.block(vec![]);
    let hello = b.func(FnDecl::named("hello").with_mods(&[Modifier::Public]).with_body(body));
    let greet = b.trait_decl(TraitDecl {
        name: "Greet".into(),
        members: vec![hello],
        ..TraitDecl::default()
    });
    let person = b.class(
        ClassDecl::named("Person")
            .uses(TraitUse::all("Greet"))
            .uses(TraitUse::all("Greet")),
    );
    let (session, ast, analysis) = analyze(b.finish(vec![greet, person]));

    assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());
    assert_eq!(session.graph().member_ids(symbol(&ast, person)).len(), 1);
}

#[test]
fn test_interface_obligations() {
    let mut b = AstBuilder::new("main.phs");
    let area = b.func(FnDecl::named("area"));
    let shape = b.interface(InterfaceDecl {
        name: "Shape".into(),
        members: vec![area],
        ..InterfaceDecl::default()
    });
    let impl_area = method(&mut b, "area", &[Modifier::Public], vec![]);
    let square = b.class(ClassDecl::named("Square").implements("Shape").with_members(vec![impl_area]));
    let blob = b.class(ClassDecl::named("Blob").implements("Shape"));
    let make_square = b.new_object("Square", vec![]);
    let ok = b.expr_stmt(make_square);
    let make_blob = b.new_object("Blob", vec![]);
    let bad = b.expr_stmt(make_blob);
    let (session, ast, analysis) = analyze(b.finish(vec![shape, square, blob, ok, bad]));

    let graph = session.graph();
    assert!(!graph.symbol(symbol(&ast, square)).is_abstract());
    assert!(graph.symbol(symbol(&ast, blob)).is_abstract());
    assert_eq!(count(&analysis, "E2303"), 1);
    assert_eq!(analysis.diagnostics.errors().count(), 1);
}

/// Animal declares an abstract `speak`; Dog implements it
#[test]
fn test_abstract_base_and_concrete_subclass() {
    let mut b = AstBuilder::new("main.phs");
    let speak = b.func(FnDecl::named("speak").with_mods(&[Modifier::Public]));
    let animal = b.class(ClassDecl::named("Animal").with_members(vec![speak]));
    let woof = b.string("woof");
    let ret = b.ret(Some(woof));
    let bark = method(&mut b, "speak", &[Modifier::Public], vec![ret]);
    let dog = b.class(ClassDecl::named("Dog").extends("Animal").with_members(vec![bark]));
    let make_dog = b.new_object("Dog", vec![]);
    let stmt = b.expr_stmt(make_dog);
    let (session, ast, analysis) = analyze(b.finish(vec![animal, dog, stmt]));

    assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());
    let graph = session.graph();
    let animal = symbol(&ast, animal);
    let dog = symbol(&ast, dog);
    assert!(graph.symbol(animal).is_abstract());
    assert!(!graph.symbol(dog).is_abstract());

    let dog_members = graph.members_of(dog).unwrap();
    let super_scope = graph.member_info(dog_members).unwrap().super_scope;
    assert_eq!(super_scope, graph.members_of(animal));
}

/// A private trait field mixed into Person is visible to Person's methods only
#[test]
fn test_private_trait_field_follows_its_host() {
    let mut b = AstBuilder::new("main.phs");
    let hi = b.string("hi");
    let field = b.var_decl(&[Modifier::Private], vec![VarItem::new("greeting", Some(hi))]);
    let greet = b.trait_decl(TraitDecl {
        name: "Greet".into(),
        members: vec![field],
        ..TraitDecl::default()
    });
    let read = b.this_member("greeting");
    let ret = b.ret(Some(read));
    let hello = method(&mut b, "hello", &[Modifier::Public], vec![ret]);
    let person = b.class(
        ClassDecl::named("Person")
            .uses(TraitUse::all("Greet"))
            .with_members(vec![hello]),
    );
    let (session, ast, analysis) = analyze(b.finish(vec![greet, person]));

    assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());
    let graph = session.graph();
    let greet = symbol(&ast, greet);
    let person = symbol(&ast, person);

    let bound = symbol(&ast, read);
    assert_eq!(graph.symbol(bound).origin, Some(greet));
    assert_eq!(graph.symbol(bound).name, "greeting");

    let members = graph.members_of(person).unwrap();
    assert_eq!(
        graph.lookup_member(members, "greeting", Some(Namespace::Value), false),
        LookupResult::Private(bound)
    );
}

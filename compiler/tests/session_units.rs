//! Several units analyzed by one `Session`

use compiler::ast::{Ast, AstBuilder, ClassDecl, FnDecl, Modifier};
use compiler::sema::Namespace;
use compiler::{Session, SessionConfig};

fn session() -> Session {
    compiler::logging::init_test();
    Session::new(SessionConfig::default())
}

/// `pub class Lib`, `pub module util { pub fn helper() {} }` and a private `fn internal`
fn library() -> Ast {
    let mut b = AstBuilder::new("lib.phs");
    let lib = b.class(ClassDecl::named("Lib").with_mods(&[Modifier::Public]));
    let body = b.block(vec![]);
    let helper = b.func(FnDecl::named("helper").with_mods(&[Modifier::Public]).with_body(body));
    let util = b.module(Some("util"), vec![helper]);
    let body = b.block(vec![]);
    let internal = b.func(FnDecl::named("internal").with_body(body));
    b.finish(vec![lib, util, internal])
}

#[test]
fn test_later_unit_sees_public_declarations() {
    let mut session = session();
    let mut lib = library();
    let analysis = session.analyze(&mut lib);
    assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());

    let mut b = AstBuilder::new("main.phs");
    let make = b.new_object("Lib", vec![]);
    let first = b.expr_stmt(make);
    let callee = b.name("util::helper");
    let call = b.call(callee, vec![]);
    let second = b.expr_stmt(call);
    let mut main = b.finish(vec![first, second]);
    let analysis = session.analyze(&mut main);

    assert!(analysis.can_generate(), "{}", analysis.diagnostics.summary());
    let helper = main.node(callee).symbol.expect("util::helper bound");
    assert_eq!(session.graph().symbol(helper).name, "helper");

    let global = session.graph().global();
    assert!(session.graph().lookup_here(global, "Lib", Some(Namespace::Type)).is_some());
    assert!(session.graph().scope(global).modules.contains_key("util"));
}

#[test]
fn test_private_declarations_stay_in_their_unit() {
    let mut session = session();
    let mut lib = library();
    session.analyze(&mut lib);

    let mut b = AstBuilder::new("main.phs");
    let callee = b.name("internal");
    let call = b.call(callee, vec![]);
    let stmt = b.expr_stmt(call);
    let mut main = b.finish(vec![stmt]);
    let analysis = session.analyze(&mut main);

    assert_eq!(analysis.diagnostics.with_code("E2001").count(), 1);
    assert!(main.node(callee).symbol.is_none());
}

#[test]
fn test_exporting_a_taken_name_is_a_duplicate() {
    let mut session = session();
    let mut lib = library();
    session.analyze(&mut lib);

    let mut b = AstBuilder::new("other.phs");
    let again = b.class(ClassDecl::named("Lib").with_mods(&[Modifier::Public]));
    let mut other = b.finish(vec![again]);
    let analysis = session.analyze(&mut other);

    let duplicates: Vec<_> = analysis.diagnostics.with_code("E2002").collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].span, other.node(again).span);
    assert_eq!(duplicates[0].labels.len(), 1);
    assert!(!analysis.can_generate());
}

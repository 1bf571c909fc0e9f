//! End-to-end saturation scenarios: small arithmetic rewrite systems driven
//! to a rebuild fixed point through the public API.

use eqsat::{
    Action, ActionExpr, Bound, EGraph, Expr, FunRhs, Pattern, Query, Rule, Subst, Value,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rule(pats: Vec<Pattern>, action: Action) -> Rule {
    Rule::new(Query::new(pats), action).unwrap()
}

fn neg_neg() -> Rule {
    rule(
        vec![
            Pattern::app("~", &["?a"], "?root"),
            Pattern::app("~", &["?b"], "?a"),
        ],
        Action::merge(ActionExpr::var("?b"), ActionExpr::var("?root")),
    )
}

fn add_neg() -> Rule {
    rule(
        vec![
            Pattern::app("+", &["?a", "?nb"], "?root"),
            Pattern::app("~", &["?b"], "?nb"),
        ],
        Action::merge(
            ActionExpr::app("-", vec![ActionExpr::var("?a"), ActionExpr::var("?b")]),
            ActionExpr::var("?root"),
        ),
    )
}

fn sub_self() -> Rule {
    rule(
        vec![Pattern::app("-", &["?a", "?a"], "?root")],
        Action::merge(ActionExpr::atom(0), ActionExpr::var("?root")),
    )
}

fn add_comm() -> Rule {
    rule(
        vec![Pattern::app("+", &["?l", "?r"], "?x")],
        Action::merge(
            ActionExpr::app("+", vec![ActionExpr::var("?r"), ActionExpr::var("?l")]),
            ActionExpr::var("?x"),
        ),
    )
}

fn mul_comm() -> Rule {
    rule(
        vec![Pattern::app("*", &["?l", "?r"], "?x")],
        Action::merge(
            ActionExpr::app("*", vec![ActionExpr::var("?r"), ActionExpr::var("?l")]),
            ActionExpr::var("?x"),
        ),
    )
}

fn add_assoc() -> Rule {
    rule(
        vec![
            Pattern::app("+", &["?a", "?r"], "?root"),
            Pattern::app("+", &["?b", "?c"], "?r"),
        ],
        Action::merge(
            ActionExpr::var("?root"),
            ActionExpr::app(
                "+",
                vec![
                    ActionExpr::app("+", vec![ActionExpr::var("?a"), ActionExpr::var("?b")]),
                    ActionExpr::var("?c"),
                ],
            ),
        ),
    )
}

fn add_zero() -> Rule {
    rule(
        vec![
            Pattern::atom(0, "?zero"),
            Pattern::app("+", &["?x", "?zero"], "?root"),
        ],
        Action::merge(ActionExpr::var("?x"), ActionExpr::var("?root")),
    )
}

fn mul_zero() -> Rule {
    rule(
        vec![
            Pattern::atom(0, "?zero"),
            Pattern::app("*", &["?x", "?zero"], "?root"),
        ],
        Action::merge(ActionExpr::atom(0), ActionExpr::var("?root")),
    )
}

fn mul_one() -> Rule {
    rule(
        vec![
            Pattern::atom(1, "?one"),
            Pattern::app("*", &["?x", "?one"], "?root"),
        ],
        Action::merge(ActionExpr::var("?x"), ActionExpr::var("?root")),
    )
}

/// Run `rules` and rebuild until the canonical dump stops changing.
fn saturate(eg: &mut EGraph, rules: &[Rule]) {
    let mut before = eg.to_string();
    for _ in 0..32 {
        eg.run_rules(rules).unwrap();
        eg.rebuild();
        let after = eg.to_string();
        if after == before {
            return;
        }
        before = after;
    }
    panic!("saturation did not converge");
}

fn min_join(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Value::Int(*x.min(y)),
        _ => a.clone(),
    }
}

#[test]
fn a_single_app_matches_exactly_once() {
    init_logging();
    let mut eg = EGraph::new();
    let root = eg.add_expr(&Expr::app("+", vec![Expr::atom(1), Expr::atom(2)]));
    let substs = eg
        .query(&Query::new(vec![Pattern::app("+", &["?x", "?y"], "?z")]))
        .unwrap();

    let one = eg.atom_id(&Value::Int(1)).unwrap();
    let two = eg.atom_id(&Value::Int(2)).unwrap();
    let expected = Subst::empty()
        .bind("?x", Bound::Class(one))
        .bind("?y", Bound::Class(two))
        .bind("?z", Bound::Class(root))
        .unwrap();
    assert_eq!(substs.len(), 1);
    assert!(substs.contains(&expected));
}

#[test]
fn associativity_reassociates() {
    init_logging();
    let mut eg = EGraph::new();
    let lhs = Expr::app(
        "+",
        vec![
            Expr::atom(1),
            Expr::app("+", vec![Expr::atom(2), Expr::atom(3)]),
        ],
    );
    let rhs = Expr::app(
        "+",
        vec![
            Expr::app("+", vec![Expr::atom(1), Expr::atom(2)]),
            Expr::atom(3),
        ],
    );
    eg.add_expr(&lhs);
    eg.run_rule(&add_assoc()).unwrap();
    eg.rebuild();

    let lhs_id = eg.lookup_expr(&lhs).unwrap();
    let rhs_id = eg.lookup_expr(&rhs).unwrap();
    assert_eq!(eg.find(lhs_id), eg.find(rhs_id));
}

#[test]
fn double_negation_cancels() {
    init_logging();
    let mut eg = EGraph::new();
    let term = Expr::app("~", vec![Expr::app("~", vec![Expr::atom("x")])]);
    eg.add_expr(&term);
    eg.run_rule(&neg_neg()).unwrap();
    eg.rebuild();

    let term_id = eg.lookup_expr(&term).unwrap();
    let x = eg.atom_id(&Value::from("x")).unwrap();
    assert_eq!(eg.find(term_id), eg.find(x));
}

#[test]
fn adding_zero_is_identity() {
    init_logging();
    let mut eg = EGraph::new();
    eg.add_expr(&Expr::atom(0));
    eg.add_expr(&Expr::atom("x"));
    let term = Expr::app("+", vec![Expr::atom("x"), Expr::atom(0)]);
    eg.add_expr(&term);
    eg.run_rule(&add_zero()).unwrap();
    eg.rebuild();

    let term_id = eg.lookup_expr(&term).unwrap();
    let x = eg.atom_id(&Value::from("x")).unwrap();
    assert_eq!(eg.find(term_id), eg.find(x));
}

#[test]
fn merged_arguments_collapse_rows() {
    init_logging();
    let mut eg = EGraph::new();
    eg.add_expr(&Expr::app("+", vec![Expr::atom(1), Expr::atom(2)]));
    let one = eg.atom_id(&Value::Int(1)).unwrap();
    let two = eg.atom_id(&Value::Int(2)).unwrap();
    eg.union(one, two);
    eg.rebuild();

    let canon = eg.find(one);
    let tab = eg.app_tab("+").unwrap();
    assert_eq!(tab.len(), 1);
    let (ids, _) = tab.iter().next().unwrap();
    assert_eq!(ids, &[canon, canon][..]);
}

#[test]
fn analysis_values_ascend_the_lattice() {
    init_logging();
    let mut eg = EGraph::new();
    eg.add_fun("cost", min_join);
    let a = eg.add_expr(&Expr::atom("a"));
    let b = eg.add_expr(&Expr::atom("b"));

    eg.set_fun("cost", &[a], Value::Int(5)).unwrap();
    eg.set_fun("cost", &[a], Value::Int(3)).unwrap();
    assert_eq!(eg.fun_value("cost", &[a]).unwrap(), &Value::Int(3));
    assert!(eg.fun_tab("cost").unwrap().is_dirty());

    eg.rebuild();
    assert!(!eg.fun_tab("cost").unwrap().is_dirty());

    // A write above the current value changes nothing.
    eg.set_fun("cost", &[a], Value::Int(7)).unwrap();
    assert_eq!(eg.fun_value("cost", &[a]).unwrap(), &Value::Int(3));
    assert!(!eg.fun_tab("cost").unwrap().is_dirty());

    // Keys that canonicalize together join their values.
    eg.set_fun("cost", &[b], Value::Int(1)).unwrap();
    eg.union(a, b);
    eg.rebuild();
    let canon = eg.find(a);
    assert_eq!(eg.fun_value("cost", &[canon]).unwrap(), &Value::Int(1));
    assert_eq!(eg.fun_tab("cost").unwrap().len(), 1);
}

#[test]
fn rules_propagate_analysis_values() {
    init_logging();
    let mut eg = EGraph::new();
    eg.add_fun("cost", min_join);
    let root = eg.add_expr(&Expr::app("+", vec![Expr::atom("x"), Expr::atom("y")]));
    let x = eg.atom_id(&Value::from("x")).unwrap();
    eg.set_fun("cost", &[x], Value::Int(2)).unwrap();

    let propagate = rule(
        vec![
            Pattern::app("+", &["?a", "?b"], "?root"),
            Pattern::app("cost", &["?a"], "?k"),
        ],
        Action::set_fun("cost", vec![ActionExpr::var("?root")], FunRhs::var("?k")),
    );
    eg.run_rule(&propagate).unwrap();
    eg.rebuild();

    let canon = eg.find(root);
    assert_eq!(eg.fun_value("cost", &[canon]).unwrap(), &Value::Int(2));
}

#[test]
fn rule_order_does_not_change_the_saturated_partition() {
    init_logging();
    let terms = vec![
        Expr::atom(0),
        Expr::atom("x"),
        Expr::app("+", vec![Expr::atom("x"), Expr::atom(0)]),
        Expr::app("+", vec![Expr::atom(0), Expr::atom("x")]),
        Expr::app("~", vec![Expr::app("~", vec![Expr::atom("x")])]),
    ];

    fn partition(rules: &[Rule], terms: &[Expr]) -> Vec<Vec<bool>> {
        let mut eg = EGraph::new();
        let ids: Vec<_> = terms.iter().map(|t| eg.add_expr(t)).collect();
        saturate(&mut eg, rules);
        let mut matrix = Vec::new();
        for &a in &ids {
            let mut row = Vec::new();
            for &b in &ids {
                row.push(eg.equiv(a, b));
            }
            matrix.push(row);
        }
        matrix
    }

    let forward = [add_comm(), add_zero(), neg_neg()];
    let backward = [neg_neg(), add_zero(), add_comm()];
    let p1 = partition(&forward, &terms);
    let p2 = partition(&backward, &terms);
    assert_eq!(p1, p2);

    // And the rules really fired: x, x+0, 0+x, and ~~x all coincide.
    assert!(p1[1][2] && p1[1][3] && p1[1][4]);
}

#[test]
fn products_with_a_vanishing_factor_collapse_to_zero() {
    init_logging();
    let mut eg = EGraph::new();
    eg.add_expr(&Expr::atom(0));
    eg.add_expr(&Expr::atom(1));
    let term = Expr::app(
        "*",
        vec![
            Expr::app(
                "+",
                vec![Expr::atom("x"), Expr::app("~", vec![Expr::atom("x")])],
            ),
            Expr::app("+", vec![Expr::atom("y"), Expr::atom("z")]),
        ],
    );
    let root = eg.add_expr(&term);

    let rules = [
        neg_neg(),
        add_neg(),
        sub_self(),
        add_comm(),
        mul_comm(),
        add_zero(),
        mul_zero(),
        mul_one(),
    ];
    saturate(&mut eg, &rules);

    let zero = eg.atom_id(&Value::Int(0)).unwrap();
    assert!(eg.equiv(root, zero));
}

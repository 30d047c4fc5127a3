use pretty_assertions::assert_eq;
use solvegraph_expr::{
    evaluate_str, sub_operations, ExprError, Number, Operation, Operator, SubOperation,
};

fn trace(expr: &str) -> Vec<String> {
    sub_operations(expr)
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn precedence_is_respected() {
    let ev = evaluate_str("2+3*4").unwrap();
    assert_eq!(ev.value, Number::from(14));
    assert_eq!(trace("2+3*4"), vec!["[3, *, 4, 12]", "[2, +, 12, 14]"]);
}

#[test]
fn parentheses_group_first() {
    let ev = evaluate_str("(9-4)*3+9").unwrap();
    assert_eq!(ev.value, Number::from(24));
    assert_eq!(
        ev.sub_operations,
        vec![
            SubOperation::new(9.into(), Operator::Subtract, 4.into(), 5.into()),
            SubOperation::new(5.into(), Operator::Multiply, 3.into(), 15.into()),
            SubOperation::new(15.into(), Operator::Add, 9.into(), 24.into()),
        ]
    );
}

#[test]
fn signed_literals() {
    assert_eq!(trace("-3+3"), vec!["[-3, +, 3, 0]"]);
    assert_eq!(trace("2+(-5)"), vec!["[2, +, -5, -3]"]);
    assert_eq!(
        trace("-1*(2+3)*4"),
        vec!["[2, +, 3, 5]", "[-1, *, 5, -5]", "[-5, *, 4, -20]"]
    );
    assert_eq!(trace("5*-3"), vec!["[5, *, -3, -15]"]);
    assert_eq!(trace("4/(-2)"), vec!["[4, /, -2, -2]"]);
    assert_eq!(trace("3-(-3)"), vec!["[3, -, -3, 6]"]);
}

#[test]
fn same_precedence_is_left_associative() {
    assert_eq!(
        trace("10+8+4+3"),
        vec!["[10, +, 8, 18]", "[18, +, 4, 22]", "[22, +, 3, 25]"]
    );
    assert_eq!(
        trace("(10*4)-8-3"),
        vec!["[10, *, 4, 40]", "[40, -, 8, 32]", "[32, -, 3, 29]"]
    );
    assert_eq!(trace("4*10/8"), vec!["[4, *, 10, 40]", "[40, /, 8, 5]"]);
}

#[test]
fn fractional_results_keep_full_precision() {
    let ev = evaluate_str("12/7").unwrap();
    assert_eq!(ev.value, Number::from(12.0 / 7.0));
    let ev = evaluate_str("36/1.5").unwrap();
    assert_eq!(ev.value, Number::from(24));
    assert_eq!(ev.value.to_string(), "24");
}

#[test]
fn single_literal_has_no_sub_operations() {
    let ev = evaluate_str("24").unwrap();
    assert_eq!(ev.value, Number::from(24));
    assert!(ev.sub_operations.is_empty());
}

#[test]
fn error_taxonomy() {
    assert_eq!(
        evaluate_str("(1+2").unwrap_err(),
        ExprError::MismatchedParentheses
    );
    assert_eq!(
        evaluate_str("1+2)").unwrap_err(),
        ExprError::MismatchedParentheses
    );
    assert_eq!(
        evaluate_str("1.2.3+1").unwrap_err(),
        ExprError::UnknownToken("1.2.3".to_string())
    );
    assert_eq!(
        evaluate_str("1+").unwrap_err(),
        ExprError::EmptyOperand(Some(Operator::Add))
    );
    assert_eq!(
        evaluate_str("*2").unwrap_err(),
        ExprError::EmptyOperand(Some(Operator::Multiply))
    );
    assert_eq!(evaluate_str("").unwrap_err(), ExprError::EmptyOperand(None));
    assert_eq!(evaluate_str("2 3").unwrap_err(), ExprError::MissingOperator);
    assert_eq!(evaluate_str("2(3)").unwrap_err(), ExprError::MissingOperator);
    assert_eq!(
        evaluate_str("1+x").unwrap_err(),
        ExprError::Tokenize { ch: 'x', offset: 2 }
    );
    assert!(matches!(
        evaluate_str("3/(2-2)").unwrap_err(),
        ExprError::DivisionByZero { .. }
    ));

    let huge = format!("1{}", "0".repeat(300));
    assert_eq!(
        evaluate_str(&format!("{huge}*{huge}")).unwrap_err(),
        ExprError::Overflow
    );
}

#[test]
fn operation_strings_round_trip_through_the_engine() {
    let op = Operation::parse("12*(10-8)=24").unwrap();
    assert_eq!(op.expression, "12*(10-8)");
    assert_eq!(op.stated_text, "24");
    assert_eq!(op.stated_result, Number::from(24));
    assert_eq!(
        op.operands(),
        vec![Number::from(12), Number::from(10), Number::from(8)]
    );
    assert_eq!(op.evaluate().unwrap().value, Number::from(24));

    let last = op.evaluate().unwrap().sub_operations[1];
    assert_eq!(last.to_operation_string(&op.stated_text), "12*2=24");
}

#[test]
fn operation_parse_errors() {
    assert_eq!(
        Operation::parse("1*2*3*4").unwrap_err(),
        ExprError::MissingEquals("1*2*3*4".to_string())
    );
    assert!(matches!(
        Operation::parse("1+1=2+1=3").unwrap_err(),
        ExprError::Tokenize { ch: '=', .. }
    ));
    assert_eq!(
        Operation::parse("1+2=three").unwrap_err(),
        ExprError::InvalidResult("three".to_string())
    );
}

#[test]
fn sub_operations_serialize_as_four_element_arrays() {
    let ops = sub_operations("2+3*4").unwrap();
    let json = serde_json::to_string(&ops).unwrap();
    assert_eq!(json, r#"[[3,"*",4,12],[2,"+",12,14]]"#);
    let back: Vec<SubOperation> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ops);
}

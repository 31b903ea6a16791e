use super::*;
use crate::testing::{FailingTool, StaticTool};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::Ordering;

#[test]
fn every_kind_round_trips_through_its_name() {
    assert_eq!(ToolKind::ALL.len(), 19);
    for kind in ToolKind::ALL {
        let parsed: ToolKind = kind.name().parse().expect("should parse tool name");
        assert_eq!(parsed, *kind);
    }
}

#[test]
fn unknown_name_is_rejected() {
    let error = "delete_everything"
        .parse::<ToolKind>()
        .expect_err("should reject unknown tool");
    assert!(matches!(error, AgentError::UnknownTool { ref name } if name == "delete_everything"));
}

#[test]
fn every_declaration_is_an_object_schema_with_known_required_fields() {
    let mut names = HashSet::new();
    for kind in ToolKind::ALL {
        let declaration = catalog::declaration(*kind);
        assert_eq!(declaration.name, kind.name());
        assert!(!declaration.description.is_empty());
        assert_eq!(declaration.parameters["type"], "object");

        let properties = declaration.parameters["properties"]
            .as_object()
            .expect("should have properties");
        let required = declaration.parameters["required"]
            .as_array()
            .expect("should have required list");
        for field in required {
            let field = field.as_str().expect("required entries are strings");
            assert!(
                properties.contains_key(field),
                "{} requires undeclared {}",
                kind,
                field
            );
        }

        names.insert(declaration.name);
    }
    assert_eq!(names.len(), ToolKind::ALL.len());
}

#[test]
fn send_email_requires_all_fields() {
    let declaration = catalog::declaration(ToolKind::SendEmail);
    assert_eq!(
        declaration.parameters["required"],
        json!(["to", "subject", "message"])
    );
}

#[test]
fn builder_rejects_duplicate_handlers() {
    let result = ToolRegistry::builder()
        .register(ToolKind::ListCourses, StaticTool::new(json!([])))
        .register(ToolKind::ListCourses, StaticTool::new(json!([])))
        .build();

    assert!(matches!(
        result,
        Err(AgentError::DuplicateHandler {
            kind: ToolKind::ListCourses
        })
    ));
}

#[test]
fn builder_rejects_missing_required_handler() {
    let result = ToolRegistry::builder()
        .require([ToolKind::ListCourses, ToolKind::GetForm])
        .register(ToolKind::ListCourses, StaticTool::new(json!([])))
        .build();

    assert!(matches!(
        result,
        Err(AgentError::MissingHandler {
            kind: ToolKind::GetForm
        })
    ));
}

#[test]
fn catalog_lists_exactly_registered_kinds() {
    let registry = ToolRegistry::builder()
        .register(ToolKind::GetForm, StaticTool::new(json!({})))
        .register(ToolKind::SendEmail, StaticTool::new(json!({})))
        .build()
        .expect("should build registry");

    let names: Vec<String> = registry
        .declarations()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["send_email", "get_form"]);
    assert!(ToolRegistry::empty().declarations().is_empty());
}

#[tokio::test]
async fn dispatch_calls_the_registered_handler() {
    let tool = StaticTool::new(json!([{"id": "c1"}]));
    let counter = tool.counter();
    let registry = ToolRegistry::builder()
        .register(ToolKind::ListCourses, tool)
        .build()
        .expect("should build registry");

    let result = registry
        .dispatch("list_courses", &json!({}), &Caller::new("t1"))
        .await
        .expect("should dispatch");

    assert_eq!(result, json!([{"id": "c1"}]));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dispatch_failures_are_typed() {
    let registry = ToolRegistry::builder()
        .register(ToolKind::SendEmail, FailingTool)
        .build()
        .expect("should build registry");
    let caller = Caller::new("t1");

    let unregistered = registry
        .dispatch("list_forms", &json!({}), &caller)
        .await
        .expect_err("unregistered kind should fail");
    assert!(matches!(unregistered, AgentError::UnknownTool { .. }));
    assert!(unregistered.is_dispatch_failure());

    let raised = registry
        .dispatch("send_email", &json!({}), &caller)
        .await
        .expect_err("failing tool should fail");
    assert!(matches!(raised, AgentError::ToolFailed { ref tool, .. } if tool == "send_email"));
    assert!(raised.to_string().contains("403"));
}

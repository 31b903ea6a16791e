use chrono::Utc;

use super::*;

fn folder(tenant_id: &str, folder_id: &str) -> Folder {
    Folder {
        folder_id: folder_id.to_string(),
        folder_name: "Lecture notes".to_string(),
        tenant_id: tenant_id.to_string(),
        created_at: Utc::now(),
        file_count: 0,
    }
}

#[test]
fn folder_scope_uses_tenant_and_id() {
    let scope = folder("instructor-1", "0b6f").scope().expect("should build scope");
    assert_eq!(scope.tenant_id(), Some("instructor-1"));
    assert_eq!(scope.folder_id(), Some("0b6f"));
}

#[test]
fn folder_scope_rejects_unsafe_tenant() {
    assert!(folder("../escape", "0b6f").scope().is_err());
}

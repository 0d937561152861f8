use super::*;

#[test]
fn test_to_prompt_entry() {
    for role in ["system", "user", "assistant"] {
        let msg = Message::new(ContextId::new(7), role, format!("{role} says hi"))
            .with_id(42)
            .with_created_at(chrono::Utc::now());

        let entry = msg.to_prompt_entry();
        assert_eq!(entry.role.as_str(), role);
        assert_eq!(entry.content, format!("{role} says hi"));

        let value = serde_json::to_value(&entry).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["role"], role);
        assert_eq!(object["content"], format!("{role} says hi"));
    }
}

#[test]
fn test_to_prompt_entry_keeps_empty_content() {
    let msg = Message::new(ContextId::new(1), Role::Assistant, "");
    let entry = PromptEntry::from(&msg);
    assert_eq!(entry, PromptEntry::assistant(""));
}

#[test]
fn test_role_passthrough() {
    assert_eq!(Role::from("user"), Role::User);
    assert_eq!(Role::from("assistant"), Role::Assistant);
    assert_eq!(Role::from("system"), Role::System);

    let role = Role::from("tool");
    assert_eq!(role, Role::Other("tool".to_string()));
    assert_eq!(role.as_str(), "tool");
    assert_eq!(String::from(role), "tool");
}

#[test]
fn test_prompt_entry_deserialize() {
    let entry: PromptEntry =
        serde_json::from_str(r#"{"role":"system","content":"be brief"}"#).unwrap();
    assert_eq!(entry.role, Role::System);
    assert_eq!(entry.content, "be brief");
}

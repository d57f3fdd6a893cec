use super::*;

#[derive(Debug, Clone, PartialEq)]
struct Account {
    id: String,
    balance: i64,
    tags: Vec<String>,
}

impl FieldAccess for Account {
    fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::from(&self.id)),
            "balance" => Some(Value::Integer(self.balance)),
            "tags" => Some(Value::from(self.tags.clone())),
            _ => None,
        }
    }
}

impl Snapshot for Account {
    fn snapshot(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::from(&self.id));
        record.insert("balance".to_string(), Value::Integer(self.balance));
        record.insert("tags".to_string(), Value::from(self.tags.clone()));
        record
    }
}

fn account() -> Account {
    Account {
        id: "acc-1".to_string(),
        balance: 100,
        tags: vec!["gold".to_string()],
    }
}

#[test]
fn test_struct_field_access() {
    let acc = account();
    assert_eq!(acc.get_field("balance"), Some(Value::Integer(100)));
    assert_eq!(acc.get_field("missing"), None);
}

#[test]
fn test_map_field_access() {
    let value = Value::Map(account().snapshot());
    assert_eq!(value.get_field("id"), Some(Value::from("acc-1")));
    assert_eq!(value.get_field("owner"), None);
    assert_eq!(Value::Integer(3).get_field("id"), None);
}

#[test]
fn test_snapshot_is_independent_of_later_mutation() {
    let mut acc = account();
    let captured = acc.snapshot();

    acc.balance = 0;
    acc.tags.push("closed".to_string());

    assert_eq!(captured.get("balance"), Some(&Value::Integer(100)));
    assert_eq!(captured.get("tags"), Some(&Value::from(vec!["gold"])));
}

#[test]
fn test_non_map_value_snapshot_is_empty() {
    assert!(Value::Integer(1).snapshot().is_empty());
}

#[test]
fn test_smart_pointer_forwarding() {
    let shared = Arc::new(account());
    assert_eq!(shared.get_field("id"), Some(Value::from("acc-1")));
    assert_eq!(shared.snapshot().len(), 3);

    let boxed: Box<dyn FieldAccess> = Box::new(account());
    assert_eq!(boxed.get_field("balance"), Some(Value::Integer(100)));
}

use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::row_utils::now_ts;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_test_log(action_id: &str, entity_type: &str, entity_id: &str, actor: &str) -> ActionLog {
    ActionLog {
        action_id: action_id.to_string(),
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
        action_type: ActionType::Update.as_str().to_string(),
        action_ts: now_ts(),
        actor: actor.to_string(),
        payload_json: Some(json!({ "status": "completed" })),
        detail: Some("Test log".to_string()),
    }
}

#[test]
fn test_insert_and_list_by_entity() {
    let conn = setup_test_db();
    let repo = ActionLogRepository::new(conn);

    repo.insert(&make_test_log("log1", "press_run", "PR1", "user1")).unwrap();
    repo.insert(&make_test_log("log2", "press_run", "PR1", "user2")).unwrap();
    repo.insert(&make_test_log("log3", "batch", "PR1", "user1")).unwrap();

    let logs = repo.list_by_entity("press_run", "PR1").unwrap();

    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action_id, "log1");
    assert_eq!(logs[1].actor, "user2");
    assert_eq!(logs[0].payload_json, Some(json!({ "status": "completed" })));
}

#[test]
fn test_find_recent() {
    let conn = setup_test_db();
    let repo = ActionLogRepository::new(conn);

    for i in 1..=5 {
        let log = make_test_log(&format!("log{}", i), "batch", "B1", "user1");
        repo.insert(&log).unwrap();
    }

    let logs = repo.find_recent(3).unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].action_id, "log5");
}

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDateTime;
use sql_access::mock::{MockDriver, MockResultBuilder, MockServer};
use sql_access::{Connection, DriverRegistry, NativeType, RowMapper, Value};

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
}

#[derive(Debug, Default)]
struct Profile {
    id: i64,
    nickname: Option<String>,
    joined: NaiveDateTime,
}

fn open_mock() -> (Connection, Arc<MockServer>, tempfile::NamedTempFile) {
    let server = MockServer::new();
    let mut registry = DriverRegistry::new();
    registry.register("mock", Arc::new(MockDriver::new(Arc::clone(&server))));

    let mut cfg = tempfile::NamedTempFile::new().unwrap();
    cfg.write_all(b"driver=mock\nuser=u\npassword=p\nserver=h\ndatabase=d\n")
        .unwrap();
    cfg.flush().unwrap();

    let conn = registry.open(cfg.path()).unwrap();
    (conn, server, cfg)
}

fn user_result(rows: Vec<Vec<Value>>) -> sql_access::mock::MockResult {
    let mut builder = MockResultBuilder::new()
        .column("id", NativeType::LongLong)
        .column("name", NativeType::Text);
    for row in rows {
        builder = builder.row(row);
    }
    builder.build()
}

fn user_mapper() -> RowMapper<User> {
    RowMapper::new()
        .long(0, |u: &mut User, v| u.id = v)
        .text(1, |u, v| u.name = v)
}

#[test]
fn maps_all_rows_in_fetch_order() {
    let (conn, server, _cfg) = open_mock();
    server.push_result(user_result(vec![
        vec![Value::Long(1), Value::Text("Alice".into())],
        vec![Value::Long(2), Value::Text("Bob".into())],
        vec![Value::Long(3), Value::Text("Carol".into())],
    ]));

    let mut stmt = conn.prepare("SELECT id, name FROM users").unwrap();
    let mut cursor = stmt.query().unwrap();
    let mut users = Vec::new();
    assert!(user_mapper().map_all(&mut cursor, &mut users));

    assert_eq!(
        users,
        vec![
            User {
                id: 1,
                name: "Alice".into()
            },
            User {
                id: 2,
                name: "Bob".into()
            },
            User {
                id: 3,
                name: "Carol".into()
            },
        ]
    );
}

#[test]
fn null_in_non_nullable_field_stops_at_that_row() {
    let (conn, server, _cfg) = open_mock();
    server.push_result(user_result(vec![
        vec![Value::Long(1), Value::Text("Alice".into())],
        vec![Value::Long(2), Value::Null],
        vec![Value::Long(3), Value::Text("Carol".into())],
    ]));

    let mut stmt = conn.prepare("SELECT id, name FROM users").unwrap();
    let mut cursor = stmt.query().unwrap();
    let mut users = Vec::new();
    assert!(!user_mapper().map_all(&mut cursor, &mut users));

    // Row 1 survived; row 2 failed; row 3 was never reached.
    assert_eq!(
        users,
        vec![User {
            id: 1,
            name: "Alice".into()
        }]
    );
}

#[test]
fn map_one_leaves_the_record_partially_populated_on_failure() {
    let (conn, server, _cfg) = open_mock();
    server.push_result(user_result(vec![vec![Value::Long(5), Value::Null]]));

    let mut stmt = conn.prepare("SELECT id, name FROM users").unwrap();
    let mut cursor = stmt.query().unwrap();
    assert!(cursor.next());

    let mut user = User::default();
    assert!(!user_mapper().map_one(&mut cursor, &mut user));
    // The earlier binding already ran; the caller must discard the record.
    assert_eq!(user.id, 5);
    assert!(user.name.is_empty());
}

#[test]
fn nullable_and_sentinel_bindings() {
    let (conn, server, _cfg) = open_mock();
    server.push_result(
        MockResultBuilder::new()
            .column("id", NativeType::LongLong)
            .column("nickname", NativeType::Text)
            .column("joined", NativeType::Timestamp)
            .row(vec![Value::Null, Value::Null, Value::Null])
            .build(),
    );

    let mapper = RowMapper::new()
        .long(0, |p: &mut Profile, v| p.id = v)
        .text_opt(1, |p, v| p.nickname = v)
        .timestamp(2, |p, v| p.joined = v);

    let mut stmt = conn.prepare("SELECT id, nickname, joined FROM p").unwrap();
    let mut cursor = stmt.query().unwrap();
    assert!(cursor.next());

    let mut profile = Profile::default();
    assert!(mapper.map_one(&mut cursor, &mut profile));
    assert_eq!(profile.id, 0);
    assert_eq!(profile.nickname, None);
    assert_eq!(profile.joined, NaiveDateTime::default());
}

#[test]
fn out_of_range_binding_fails_the_mapping() {
    let (conn, server, _cfg) = open_mock();
    server.push_result(user_result(vec![vec![
        Value::Long(1),
        Value::Text("Alice".into()),
    ]]));

    let mapper = RowMapper::new().long(9, |u: &mut User, v| u.id = v);
    let mut stmt = conn.prepare("SELECT id, name FROM users").unwrap();
    let mut cursor = stmt.query().unwrap();
    let mut users = Vec::new();
    assert!(!mapper.map_all(&mut cursor, &mut users));
    assert!(users.is_empty());
}

#[test]
fn mapper_is_reusable_across_cursors() {
    let (conn, server, _cfg) = open_mock();
    let mapper = user_mapper();

    for name in ["first", "second"] {
        server.push_result(user_result(vec![vec![
            Value::Long(1),
            Value::Text(name.into()),
        ]]));
        let mut stmt = conn.prepare("SELECT id, name FROM users").unwrap();
        let mut cursor = stmt.query().unwrap();
        let mut users = Vec::new();
        assert!(mapper.map_all(&mut cursor, &mut users));
        assert_eq!(users[0].name, name);
    }
}

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use sql_access::mock::{MockDriver, MockServer};
use sql_access::{DriverLib, DriverRegistry, Environment, builtin_driver_libs};

fn config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const MOCK_CFG: &str = "driver=mock\nuser=bob\npassword=secret\nserver=db.internal:3306\ndatabase=app\n";

fn mock_registry() -> (DriverRegistry, Arc<MockServer>) {
    let server = MockServer::new();
    let mut registry = DriverRegistry::new();
    registry.register("mock", Arc::new(MockDriver::new(Arc::clone(&server))));
    (registry, server)
}

#[test]
fn open_succeeds_end_to_end() {
    let (registry, _server) = mock_registry();
    let cfg = config(MOCK_CFG);

    let conn = registry.open(cfg.path()).expect("open should succeed");
    assert_eq!(conn.uri(), "mock://bob@db.internal:3306/app");
    assert!(conn.is_still_alive());
}

#[test]
fn open_fails_for_unreadable_source() {
    let (registry, _server) = mock_registry();
    assert!(registry.open(Path::new("/nonexistent/conn.cfg")).is_none());
}

#[test]
fn open_fails_without_driver_key() {
    let (registry, _server) = mock_registry();
    let cfg = config("user=bob\npassword=secret\nserver=h\ndatabase=app\n");
    assert!(registry.open(cfg.path()).is_none());
}

#[test]
fn open_fails_for_unknown_driver_name() {
    let (registry, _server) = mock_registry();
    let cfg = config("driver=nope\nuser=bob\npassword=secret\nserver=h\ndatabase=app\n");
    assert!(registry.open(cfg.path()).is_none());
}

#[test]
fn open_fails_when_driver_validation_fails() {
    let (registry, _server) = mock_registry();

    // Missing key.
    let cfg = config("driver=mock\nuser=bob\npassword=secret\nserver=h\n");
    assert!(registry.open(cfg.path()).is_none());

    // Present but empty key.
    let cfg = config("driver=mock\nuser=bob\npassword=\nserver=h\ndatabase=app\n");
    assert!(registry.open(cfg.path()).is_none());
}

#[test]
fn open_fails_for_invalid_port() {
    let (registry, _server) = mock_registry();
    let cfg = config("driver=mock\nuser=bob\npassword=s\nserver=h:notaport\ndatabase=app\n");
    assert!(registry.open(cfg.path()).is_none());
}

#[test]
fn open_fails_when_native_connect_fails() {
    let (registry, server) = mock_registry();
    server.fail_next();
    let cfg = config(MOCK_CFG);
    assert!(registry.open(cfg.path()).is_none());
}

#[test]
fn last_registration_wins() {
    let first = MockServer::new();
    let second = MockServer::new();
    let mut registry = DriverRegistry::new();
    registry.register("mock", Arc::new(MockDriver::new(Arc::clone(&first))));
    registry.register("mock", Arc::new(MockDriver::new(Arc::clone(&second))));

    let cfg = config(MOCK_CFG);
    let conn = registry.open(cfg.path()).unwrap();
    assert!(conn.exec("PING"));

    assert!(first.exec_log().is_empty());
    assert_eq!(second.exec_log(), vec!["PING".to_string()]);
}

#[test]
fn lookup_of_unregistered_name_misses() {
    let registry = DriverRegistry::new();
    assert!(registry.lookup("anything").is_none());
    assert!(registry.is_empty());
}

#[test]
fn builtin_libs_register_their_drivers() {
    let mut registry = DriverRegistry::new();
    let env = Environment::activate(&mut registry, &builtin_driver_libs());
    assert!(!env.failed());
    assert!(registry.lookup("mock").is_some());
    #[cfg(feature = "sqlite")]
    assert!(registry.lookup("sqlite").is_some());
}

static ORDER_EVENTS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

fn order_start_a(_: &mut DriverRegistry) -> bool {
    ORDER_EVENTS.lock().unwrap().push("start a");
    true
}
fn order_start_b(_: &mut DriverRegistry) -> bool {
    ORDER_EVENTS.lock().unwrap().push("start b");
    true
}
fn order_stop_a() {
    ORDER_EVENTS.lock().unwrap().push("stop a");
}
fn order_stop_b() {
    ORDER_EVENTS.lock().unwrap().push("stop b");
}

#[test]
fn environment_starts_in_order_and_stops_in_reverse() {
    let libs = [
        DriverLib {
            name: "a",
            startup: order_start_a,
            shutdown: order_stop_a,
        },
        DriverLib {
            name: "b",
            startup: order_start_b,
            shutdown: order_stop_b,
        },
    ];
    let mut registry = DriverRegistry::new();
    let env = Environment::activate(&mut registry, &libs);
    assert!(!env.failed());
    drop(env);

    assert_eq!(
        *ORDER_EVENTS.lock().unwrap(),
        vec!["start a", "start b", "stop b", "stop a"]
    );
}

static UNWIND_EVENTS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

fn unwind_start_a(_: &mut DriverRegistry) -> bool {
    UNWIND_EVENTS.lock().unwrap().push("start a");
    true
}
fn unwind_start_b(_: &mut DriverRegistry) -> bool {
    UNWIND_EVENTS.lock().unwrap().push("start b failed");
    false
}
fn unwind_start_c(_: &mut DriverRegistry) -> bool {
    UNWIND_EVENTS.lock().unwrap().push("start c");
    true
}
fn unwind_stop_a() {
    UNWIND_EVENTS.lock().unwrap().push("stop a");
}
fn unwind_stop_b() {
    UNWIND_EVENTS.lock().unwrap().push("stop b");
}
fn unwind_stop_c() {
    UNWIND_EVENTS.lock().unwrap().push("stop c");
}

#[test]
fn environment_failure_unwinds_only_the_started_prefix() {
    let libs = [
        DriverLib {
            name: "a",
            startup: unwind_start_a,
            shutdown: unwind_stop_a,
        },
        DriverLib {
            name: "b",
            startup: unwind_start_b,
            shutdown: unwind_stop_b,
        },
        DriverLib {
            name: "c",
            startup: unwind_start_c,
            shutdown: unwind_stop_c,
        },
    ];
    let mut registry = DriverRegistry::new();
    let env = Environment::activate(&mut registry, &libs);
    assert!(env.failed());
    drop(env);

    // The failing library and everything after it never started; only the
    // prefix was shut down, in reverse, and dropping adds nothing.
    assert_eq!(
        *UNWIND_EVENTS.lock().unwrap(),
        vec!["start a", "start b failed", "stop a"]
    );
}

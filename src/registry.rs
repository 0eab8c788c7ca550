//! Driver registry and driver-library activation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::connection::Connection;
use crate::props::{Props, get_prop, read_props};

/// A capability that knows how to open a connection to one specific engine.
pub trait Driver: Send + Sync {
    /// Open a connection from the given properties. Implementations must
    /// validate every engine-required key (present and non-empty) before
    /// touching the native engine, and must not leak native resources when
    /// establishment fails partway.
    fn open(&self, source: &Path, props: &Props) -> Option<Connection>;
}

/// Mapping from a driver name to a driver instance.
///
/// An explicit object owned by the process entry point, not a process
/// global. Registration is idempotent per name (last registration wins);
/// lookups of unregistered names simply miss.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `driver` under `name`, silently overwriting any previous
    /// registration.
    pub fn register(&mut self, name: &str, driver: Arc<dyn Driver>) {
        self.drivers.insert(name.to_string(), driver);
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Top-level entry point: read the config source, resolve the mandatory
    /// `driver` key, and delegate to the driver's `open`. Every failure
    /// yields `None`; the reason is logged, never thrown.
    #[must_use]
    pub fn open(&self, source: &Path) -> Option<Connection> {
        let props = match read_props(source) {
            Ok(props) => props,
            Err(err) => {
                warn!(source = %source.display(), %err, "cannot open connection config");
                return None;
            }
        };
        let Some(name) = get_prop(&props, "driver") else {
            warn!(source = %source.display(), "connection config is missing the `driver' key");
            return None;
        };
        let Some(driver) = self.lookup(name) else {
            warn!(driver = name, "no such database driver");
            return None;
        };
        driver.open(source, &props)
    }
}

/// One driver library compiled into the binary: a (startup, shutdown)
/// capability pair. `startup` registers the library's drivers and brings up
/// any engine-global state.
pub struct DriverLib {
    pub name: &'static str,
    pub startup: fn(&mut DriverRegistry) -> bool,
    pub shutdown: fn(),
}

/// Ordered all-or-nothing activation of a set of driver libraries.
///
/// Libraries start in list order. If library *k* fails to start, the
/// already-started prefix is shut down in reverse order and libraries at or
/// after *k* are never started. Dropping the environment shuts down exactly
/// the started prefix, in reverse.
pub struct Environment {
    failed: bool,
    started: Vec<(&'static str, fn())>,
}

impl Environment {
    pub fn activate(registry: &mut DriverRegistry, libs: &[DriverLib]) -> Self {
        let mut started: Vec<(&'static str, fn())> = Vec::with_capacity(libs.len());
        for lib in libs {
            if !(lib.startup)(registry) {
                warn!(driver = lib.name, "driver library failed to start; unwinding");
                for (_, shutdown) in started.drain(..).rev() {
                    shutdown();
                }
                return Environment {
                    failed: true,
                    started: Vec::new(),
                };
            }
            started.push((lib.name, lib.shutdown));
        }
        Environment {
            failed: false,
            started,
        }
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        for (_, shutdown) in self.started.drain(..).rev() {
            shutdown();
        }
    }
}

/// The driver libraries compiled into this build, in activation order.
#[must_use]
pub fn builtin_driver_libs() -> Vec<DriverLib> {
    let mut libs = Vec::new();
    #[cfg(feature = "sqlite")]
    libs.push(DriverLib {
        name: "sqlite",
        startup: crate::sqlite::startup_driver,
        shutdown: crate::sqlite::shutdown_driver,
    });
    libs.push(DriverLib {
        name: "mock",
        startup: crate::mock::startup_driver,
        shutdown: crate::mock::shutdown_driver,
    });
    libs
}

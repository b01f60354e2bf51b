use std::{cell::RefCell, ffi::OsStr};

use tracing::Level;

#[derive(Clone, Copy)]
struct Env {
    log_level: Level,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Read configuration from the process environment.
///
/// `I8080_LOG` selects the tracing level (`error`, `warn`, `info`, `debug`, `trace`).
pub fn init() {
    let value = Env {
        log_level: var_parse("I8080_LOG").unwrap_or(Level::WARN),
    };
    set_env(value);
}

pub fn log_level() -> Level {
    with_env(|env| env.log_level)
}

fn set_env(value: Env) {
    let fresh = ENV.with(|env| {
        let mut env = env.borrow_mut();
        env.is_none().then(|| *env = Some(value)).is_some()
    });
    if !fresh {
        panic!("I8080 environment initialised twice");
    }
}

fn with_env<R>(read: impl Fn(&Env) -> R) -> R {
    let env = ENV.with(|env| *env.borrow());
    match env {
        Some(env) => read(&env),
        None => panic!("I8080 environment read before initialisation"),
    }
}

/// Unset or unparsable variables are ignored.
fn var_parse<T: std::str::FromStr>(name: impl AsRef<OsStr>) -> Option<T> {
    std::env::var(name.as_ref())
        .ok()
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_once() {
        // Each test runs on its own thread, so the state starts empty
        set_env(Env {
            log_level: Level::DEBUG,
        });
        assert_eq!(log_level(), Level::DEBUG);
        let again = std::panic::catch_unwind(|| {
            set_env(Env {
                log_level: Level::INFO,
            })
        });
        assert!(again.is_err());
    }

    #[test]
    #[should_panic(expected = "before initialisation")]
    fn read_before_init() {
        log_level();
    }
}

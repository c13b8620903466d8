// spawn() and shared environments across threads

use std::thread;
use std::time::{Duration, Instant};

use gatoscript::{Environment, Object, apply_function, run_source};

fn wait_for(env: &Environment, name: &str, expected: Object) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if env.get(name) == Some(expected.clone()) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "{name} is {:?}, expected {expected}",
            env.get(name)
        );
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_spawn_is_detached() {
    let env = Environment::new();
    let started = Instant::now();
    let value = run_source(
        "let done = false; spawn(fn() { sleep(300); done = true }); done",
        &env,
    )
    .unwrap();
    assert_eq!(value, Object::Boolean(false));
    assert!(started.elapsed() < Duration::from_millis(250));
    wait_for(&env, "done", Object::Boolean(true));
}

#[test]
fn test_spawn_passes_arguments() {
    let env = Environment::new();
    run_source(
        "let out = null; spawn(fn(a, b) { out = a + b }, 40, 2)",
        &env,
    )
    .unwrap();
    wait_for(&env, "out", Object::Integer(42));
}

#[test]
fn test_spawned_increments_are_not_lost() {
    let env = Environment::new();
    let src = "
        let total = 0;
        let bump = fn(n) {
            let i = 0;
            while (i < n) { total += 1; i += 1; }
        };
        let k = 0;
        while (k < 10) { spawn(bump, 100); k += 1; }
    ";
    let value = run_source(src, &env).unwrap();
    assert_eq!(value, Object::Null);
    wait_for(&env, "total", Object::Integer(1000));
}

#[test]
fn test_closure_called_from_many_threads() {
    let env = Environment::new();
    let counter = run_source("let n = 0; fn() { n += 1 }", &env).unwrap();
    thread::scope(|s| {
        for _ in 0..4 {
            let counter = counter.clone();
            s.spawn(move || {
                for _ in 0..250 {
                    assert!(!apply_function(&counter, vec![]).is_error());
                }
            });
        }
    });
    assert_eq!(env.get("n"), Some(Object::Integer(1000)));
}

#[test]
fn test_spawn_does_not_validate_callee() {
    let value = run_source("spawn(\"not callable\")", &Environment::new()).unwrap();
    assert_eq!(value, Object::Null);
}

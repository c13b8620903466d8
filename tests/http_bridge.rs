// listen(): real listener driven over HTTP with ureq

use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use gatoscript::{Environment, run_source};

fn free_port() -> u16 {
    let probe = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    probe.local_addr().expect("probe addr").port()
}

/// Starts `listen(port, handler)` on a background thread and waits until it accepts.
fn start_server(handler: &str) -> String {
    let port = free_port();
    let src = format!("listen(\"{port}\", {handler})");
    thread::spawn(move || {
        let _ = run_source(&src, &Environment::new());
    });
    let base = format!("http://127.0.0.1:{port}");
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if std::net::TcpStream::connect(("127.0.0.1", port)).is_ok() {
            return base;
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("server on port {port} never came up");
}

fn get(url: &str) -> (u16, String) {
    match ureq::get(url).timeout(Duration::from_secs(10)).call() {
        Ok(response) => (response.status(), response.into_string().expect("body")),
        Err(ureq::Error::Status(code, response)) => {
            (code, response.into_string().expect("body"))
        }
        Err(err) => panic!("request to {url} failed: {err}"),
    }
}

#[test]
fn test_handler_sees_method_path_and_host() {
    let base = start_server(r#"fn(req) { req["method"] + " " + req["path"] + " " + req["host"] }"#);
    let (status, body) = get(&format!("{base}/cats?name=tom"));
    assert_eq!(status, 200);
    let port = base.rsplit(':').next().unwrap();
    assert_eq!(body, format!("GET /cats 127.0.0.1:{port}"));
}

#[test]
fn test_routes_by_path() {
    let handler = r#"fn(req) {
        let path = req["path"];
        if (path == "/") { return "home"; }
        if (path == "/count") { return len([1, 2, 3]); }
        if (path == "/boom") { return 1 + true; }
        null
    }"#;
    let base = start_server(handler);
    assert_eq!(get(&format!("{base}/")), (200, "home".to_string()));
    assert_eq!(get(&format!("{base}/count")), (200, "3".to_string()));
    assert_eq!(
        get(&format!("{base}/missing")),
        (404, "404 Not Found".to_string())
    );
    assert_eq!(
        get(&format!("{base}/boom")),
        (500, "type mismatch: INTEGER + BOOLEAN".to_string())
    );
}

#[test]
fn test_slow_handler_does_not_block_others() {
    let handler = r#"fn(req) {
        if (req["path"] == "/slow") { sleep(2000); return "slow"; }
        "fast"
    }"#;
    let base = start_server(handler);

    let slow_url = format!("{base}/slow");
    let slow = thread::spawn(move || get(&slow_url));
    thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    assert_eq!(get(&format!("{base}/quick")), (200, "fast".to_string()));
    assert!(
        started.elapsed() < Duration::from_millis(1500),
        "fast request waited {:?}",
        started.elapsed()
    );
    assert_eq!(slow.join().unwrap(), (200, "slow".to_string()));
}

#[test]
fn test_concurrent_requests_share_captured_state() {
    let src_port = free_port();
    let src = format!(
        r#"
let hits = 0;
listen("{src_port}", fn(req) {{ hits += 1; "ok" }})
"#
    );
    let env = Environment::new();
    let server_env = env.clone();
    thread::spawn(move || {
        let _ = run_source(&src, &server_env);
    });
    let base = format!("http://127.0.0.1:{src_port}");
    let deadline = Instant::now() + Duration::from_secs(10);
    while std::net::TcpStream::connect(("127.0.0.1", src_port)).is_err() {
        assert!(Instant::now() < deadline, "server never came up");
        thread::sleep(Duration::from_millis(20));
    }

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let url = format!("{base}/w{i}");
            thread::spawn(move || {
                for _ in 0..5 {
                    assert_eq!(get(&url), (200, "ok".to_string()));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(env.get("hits"), Some(gatoscript::Object::Integer(40)));
}

#[test]
fn test_bind_failure_returns_error_value() {
    let taken = TcpListener::bind("0.0.0.0:0").unwrap();
    let port = taken.local_addr().unwrap().port();
    let _taken_v6 = TcpListener::bind(("::", port));
    let value = run_source(
        &format!("listen(\"{port}\", fn(req) {{ \"never\" }})"),
        &Environment::new(),
    )
    .unwrap();
    assert!(value.is_error(), "got {value}");
}

#[test]
fn test_listener_answers_on_ipv6_loopback() {
    if TcpListener::bind("[::1]:0").is_err() {
        return;
    }
    let base = start_server(r#"fn(req) { "v6 " + req["path"] }"#);
    let port = base.rsplit(':').next().expect("port");
    let (status, body) = get(&format!("http://[::1]:{port}/paws"));
    assert_eq!(status, 200);
    assert_eq!(body, "v6 /paws");
}

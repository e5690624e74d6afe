//! End-to-end scenarios: engine init, an interceptor call, and the audit
//! line/summary it produces, exercised through the public facade only.

use scfw::{Engine, Firewall};

/// Serializes access to the process environment across these tests; env
/// vars are process-global, so concurrent `#[test]` threads would race on
/// `FIREWALL_AUDIT_LOG` otherwise.
fn with_audit_log_at<T>(path: &std::path::Path, f: impl FnOnce() -> T) -> T {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = LOCK.lock().unwrap();
    std::env::set_var("FIREWALL_AUDIT_LOG", path.to_str().unwrap());
    let result = f();
    std::env::remove_var("FIREWALL_AUDIT_LOG");
    result
}

#[test]
fn allowed_read_produces_one_audit_line() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let target = dir.path().join("readme.txt");
    std::fs::write(&target, b"hello").unwrap();

    with_audit_log_at(&audit_path, || {
        let engine = Engine::try_initialize().expect("baseline config always initializes");
        let firewall = Firewall { engine };

        let contents = firewall
            .files()
            .guarded_read(target.to_str().unwrap(), "user-code")
            .expect("plain read under an unrestricted temp dir is allowed");
        assert_eq!(contents, b"hello");

        let logged = std::fs::read_to_string(&audit_path).unwrap();
        assert_eq!(logged.lines().count(), 1);
        let entry: serde_json::Value = serde_json::from_str(logged.lines().next().unwrap()).unwrap();
        assert_eq!(entry["verdict"], "allow");
        assert_eq!(entry["operation_kind"], "file_read");
    });
}

#[test]
fn ssh_key_read_is_blocked_and_audited() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let ssh_dir = dir.path().join(".ssh");
    std::fs::create_dir_all(&ssh_dir).unwrap();
    let key_path = ssh_dir.join("id_rsa");
    std::fs::write(&key_path, b"not-a-real-key").unwrap();

    with_audit_log_at(&audit_path, || {
        let engine = Engine::try_initialize().expect("baseline config always initializes");
        let firewall = Firewall { engine };

        let result = firewall.files().guarded_read(key_path.to_str().unwrap(), "user-code");
        assert!(result.is_err());

        let logged = std::fs::read_to_string(&audit_path).unwrap();
        let last: serde_json::Value = serde_json::from_str(logged.lines().last().unwrap()).unwrap();
        assert_eq!(last["verdict"], "block");
    });
}

#[test]
fn teardown_summary_reflects_a_blocked_operation() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let ssh_dir = dir.path().join(".ssh");
    std::fs::create_dir_all(&ssh_dir).unwrap();
    let key_path = ssh_dir.join("id_ed25519");
    std::fs::write(&key_path, b"not-a-real-key").unwrap();

    with_audit_log_at(&audit_path, || {
        let engine = Engine::try_initialize().expect("baseline config always initializes");
        let firewall = Firewall { engine };

        let _ = firewall.files().guarded_read(key_path.to_str().unwrap(), "user-code");
        firewall.teardown();

        let logged = std::fs::read_to_string(&audit_path).unwrap();
        let last: serde_json::Value = serde_json::from_str(logged.lines().last().unwrap()).unwrap();
        assert_eq!(last["record_type"], "summary");
        assert_eq!(last["risky"], true);
    });
}

use telemetry::{TracingError, init_tracing};

// Installs the global subscriber, so this file holds a single test.
#[test]
fn init_tracing_installs_the_subscriber_once() {
    let working_directory = std::env::temp_dir().join(format!(
        "telemetry_init_tracing_{}",
        std::process::id()
    ));
    std::fs::create_dir_all(&working_directory).unwrap();
    std::env::set_current_dir(&working_directory).unwrap();

    let flusher = init_tracing("loader");
    assert!(flusher.is_ok(), "first init failed: {:?}", flusher.as_ref().err());

    tracing::info!(table = "dim_user", row_count = 3, "record after init");

    let second = init_tracing("loader");
    assert!(matches!(second, Err(TracingError::Subscriber(_))));

    drop(flusher);
    assert!(working_directory.join("logs").is_dir());
}

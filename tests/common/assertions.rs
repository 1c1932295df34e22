//! Custom assertion macros

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that the queue holds exactly these mutation ids, front first
#[macro_export]
macro_rules! assert_queue_ids {
    ($queue:expr, $ids:expr) => {{
        let actual: Vec<uuid::Uuid> = $queue.snapshot().iter().map(|m| m.id).collect();
        let expected: Vec<uuid::Uuid> = $ids.into_iter().collect();
        pretty_assertions::assert_eq!(actual, expected);
    }};
}

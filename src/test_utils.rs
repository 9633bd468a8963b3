/// Runs `test` on a thread with a stack large enough for deeply nested trees.
///
/// Building, comparing, and dropping trees at the nesting limit recurses more
/// than the default stack of test threads allows in debug builds.
pub fn with_large_stack(test: impl FnOnce() + Send + 'static) {
    std::thread::Builder::new()
        .stack_size(64 << 20)
        .spawn(test)
        .unwrap()
        .join()
        .unwrap();
}

/// `f(f(…f(1)…))` with the literal nested `depth` levels deep.
pub fn nested_calls(depth: usize) -> String {
    format!("{}1{}", "f(".repeat(depth), ")".repeat(depth))
}

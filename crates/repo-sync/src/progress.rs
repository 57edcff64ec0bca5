/// Observer for bulk content retrieval.
///
/// Receives `Some(0)` when a fetch starts, `Some(percent)` after each
/// chunk and `None` once the fetch has finished. Exactly one fetch writes
/// to a callback at a time. The lifetime lets a callback borrow from the
/// caller's stack.
pub type ProgressCallback<'a> = dyn Fn(Option<u8>) + Send + Sync + 'a;

/// `ceil(processed / total * 100)`, clamped to 100.
pub fn percent_complete(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (processed * 100).div_ceil(total);
    percent.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_up() {
        assert_eq!(percent_complete(0, 3), 0);
        assert_eq!(percent_complete(1, 3), 34);
        assert_eq!(percent_complete(2, 3), 67);
        assert_eq!(percent_complete(3, 3), 100);
        assert_eq!(percent_complete(30, 75), 40);
    }

    #[test]
    fn percent_never_exceeds_100() {
        assert_eq!(percent_complete(5, 3), 100);
        assert_eq!(percent_complete(0, 0), 100);
    }
}

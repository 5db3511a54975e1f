//! Queue processor tests


#[cfg(test)]
pub(crate) mod support {
    use std::thread;
    use std::time::{Duration, Instant};

    /// Poll `condition` for up to five seconds
    pub fn eventually(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }
}

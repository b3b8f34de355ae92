/// A display-only value that carries its own expiry.
///
/// Writing replaces both the value and its deadline, so a superseded write can
/// never clear a newer one early. Time is a logical millisecond counter
/// supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Expiring<T> {
    slot: Option<(T, u64)>,
}

impl<T> Default for Expiring<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> Expiring<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `value` from `now_ms` for `ttl_ms`.
    pub fn set(&mut self, value: T, now_ms: u64, ttl_ms: u64) {
        self.slot = Some((value, now_ms.saturating_add(ttl_ms)));
    }

    /// The value if it is still live at `now_ms`.
    pub fn get(&self, now_ms: u64) -> Option<&T> {
        match &self.slot {
            Some((value, expires_at)) if now_ms < *expires_at => Some(value),
            _ => None,
        }
    }

    pub fn is_active(&self, now_ms: u64) -> bool {
        self.get(now_ms).is_some()
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.slot.as_ref().map(|(_, at)| *at)
    }

    /// Drop the value once its deadline has passed. Returns true if cleared.
    pub fn sweep(&mut self, now_ms: u64) -> bool {
        match self.expires_at() {
            Some(at) if now_ms >= at => {
                self.slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_lives_until_deadline() {
        let mut s = Expiring::new();
        s.set("hello", 100, 2000);
        assert_eq!(s.get(100), Some(&"hello"));
        assert_eq!(s.get(2099), Some(&"hello"));
        assert_eq!(s.get(2100), None);
        assert_eq!(s.expires_at(), Some(2100));
    }

    #[test]
    fn later_write_replaces_deadline() {
        let mut s = Expiring::new();
        s.set(1u32, 0, 3000);
        s.set(2u32, 2000, 3000);

        // The first write's deadline no longer applies.
        assert!(!s.sweep(3000));
        assert_eq!(s.get(3000), Some(&2));
        assert!(s.sweep(5000));
        assert_eq!(s.get(5000), None);
    }

    #[test]
    fn shorter_later_write_wins_too() {
        let mut s = Expiring::new();
        s.set("level up", 0, 3000);
        s.set("+1 ore", 500, 2000);
        assert!(s.is_active(2499));
        assert!(!s.is_active(2500));
    }

    #[test]
    fn sweep_before_deadline_keeps_value() {
        let mut s = Expiring::new();
        s.set((), 0, 10);
        assert!(!s.sweep(9));
        assert!(s.is_active(9));
        s.clear();
        assert!(!s.is_active(0));
        assert_eq!(s.expires_at(), None);
    }
}

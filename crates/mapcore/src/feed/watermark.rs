#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(i64);

impl Watermark {
    pub fn unset() -> Self {
        Self(0)
    }

    pub fn from_millis(timestamp: i64) -> Self {
        Self(timestamp.max(0))
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    pub fn is_unset(self) -> bool {
        self.0 == 0
    }

    pub fn accepts(self, timestamp: i64) -> bool {
        self.0 == 0 || timestamp >= self.0
    }

    pub fn advance_to(&mut self, timestamp: i64) {
        if timestamp > self.0 {
            self.0 = timestamp;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_watermark_accepts_everything() {
        let watermark = Watermark::unset();
        assert!(watermark.accepts(0));
        assert!(watermark.accepts(-5));
        assert!(watermark.accepts(i64::MAX));
    }

    #[test]
    fn boundary_timestamp_is_accepted() {
        let watermark = Watermark::from_millis(100);
        assert!(watermark.accepts(100));
        assert!(watermark.accepts(101));
        assert!(!watermark.accepts(99));
    }

    #[test]
    fn advance_never_moves_backward() {
        let mut watermark = Watermark::from_millis(100);
        watermark.advance_to(50);
        assert_eq!(watermark.millis(), 100);
        watermark.advance_to(200);
        assert_eq!(watermark.millis(), 200);
    }
}

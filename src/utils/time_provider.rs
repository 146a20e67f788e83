use chrono::{DateTime, Utc};

///
/// An overridable clock. Reset token expiry is measured against this so tests (and the Admin
/// service) can time-travel.
///
#[derive(Debug, Default)]
pub struct TimeProvider {
    fixed: Option<DateTime<Utc>>
}

impl TimeProvider {
    pub fn now(&self) -> DateTime<Utc> {
        self.fixed.unwrap_or_else(Utc::now)
    }

    ///
    /// Pin the clock to a point in time, or release it back to the system clock with None.
    ///
    pub fn fix(&mut self, fixed: Option<DateTime<Utc>>) {
        self.fixed = fixed;
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_is_returned_until_released() {
        let mut clock = TimeProvider::default();
        let fixed = DateTime::parse_from_rfc3339("2021-08-23T09:30:00Z").unwrap().with_timezone(&Utc);

        clock.fix(Some(fixed));
        assert!(clock.is_fixed());
        assert_eq!(clock.now(), fixed);

        clock.fix(None);
        assert!(!clock.is_fixed());
        assert!(clock.now() > fixed);
    }
}

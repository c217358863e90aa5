use chrono::Utc;

/// Current wall-clock time as unix seconds, the unit of every record `Timestamp`.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_now_timestamp_is_current_unix_seconds() {
        let now = now_timestamp();
        let instant = DateTime::from_timestamp(now, 0).unwrap();
        assert!((Utc::now() - instant).num_seconds().abs() <= 1);
    }
}

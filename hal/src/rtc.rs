use chrono::naive::NaiveDateTime;

/// Sink for UTC time recovered from the navigation solution.
pub trait RTCWriter: Send + Sync {
    fn set_datetime(&self, datetime: &NaiveDateTime);
}

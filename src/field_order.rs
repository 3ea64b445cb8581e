use std::cmp::Ordering;

pub const FIELD_TIME: &str = "time";
pub const FIELD_LEVEL: &str = "level";
/// Added by component loggers, see [`crate::Logger::comp`].
pub const FIELD_COMPONENT: &str = "comp";
pub const FIELD_FILE: &str = "file";
pub const FIELD_FUNC: &str = "func";
pub const FIELD_MSG: &str = "msg";

/// Names the logger fills in itself; user fields with these names are
/// renamed `fields.<name>` before rendering.
pub const RESERVED_FIELDS: [&str; 6] = [FIELD_TIME, FIELD_LEVEL, FIELD_COMPONENT, FIELD_FILE, FIELD_FUNC, FIELD_MSG];

/// Position of a well known field. Everything else ranks `0` and sorts by
/// name between the negative ranks and `msg`.
pub fn field_rank(key: &str) -> i8 {
    match key {
        FIELD_TIME => -5,
        FIELD_LEVEL => -4,
        FIELD_COMPONENT => -3,
        FIELD_FILE => -2,
        FIELD_FUNC => -1,
        FIELD_MSG => 1,
        _ => 0,
    }
}

/// Order used when rendering a record:
/// `time, level, comp, file, func, <other fields by name>, msg`.
pub fn compare_field_keys(a: &str, b: &str) -> Ordering {
    let (rank_a, rank_b) = (field_rank(a), field_rank(b));
    if rank_a != 0 || rank_b != 0 {
        return rank_a.cmp(&rank_b);
    }
    a.cmp(b)
}

pub fn sort_field_keys<K: AsRef<str>>(keys: &mut [K]) {
    keys.sort_by(|a, b| compare_field_keys(a.as_ref(), b.as_ref()));
}

use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec};

lazy_static! {
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "chores_logins_total",
        "Login attempts by account type and status",
        &["user_type", "status"]
    ).unwrap();

    pub static ref SIGNUPS_COUNTER: Counter = register_counter!(
        "chores_signups_total",
        "Parent accounts created"
    ).unwrap();

    pub static ref TASK_TOGGLES_COUNTER: CounterVec = register_counter_vec!(
        "chores_task_toggles_total",
        "Task completion toggles by direction",
        &["direction"]
    ).unwrap();

    pub static ref DELETIONS_REJECTED_COUNTER: CounterVec = register_counter_vec!(
        "chores_deletions_rejected_total",
        "Task and prize deletions refused because a child still references them",
        &["kind"]
    ).unwrap();
}

pub fn record_login(user_type: &str, status: &str) {
    LOGINS_COUNTER.with_label_values(&[user_type, status]).inc();
}

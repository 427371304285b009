pub mod auth;
pub mod children;
pub mod metrics;
pub mod parents;
pub mod validation;

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    db::ChoreStore,
    models::{prize::Prize, task::Task},
};

/// Tasks and prizes fetched in one batch each, keyed by id, so that nested
/// documents can be expanded without a query per reference.
pub(crate) struct Lookups {
    pub tasks: HashMap<Uuid, Task>,
    pub prizes: HashMap<Uuid, Prize>,
}

impl Lookups {
    pub async fn load(
        store: &dyn ChoreStore,
        task_ids: &[Uuid],
        prize_ids: &[Uuid],
    ) -> anyhow::Result<Self> {
        let tasks = store.tasks_by_ids(task_ids).await?;
        let prizes = store.prizes_by_ids(prize_ids).await?;
        Ok(Self {
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
            prizes: prizes.into_iter().map(|p| (p.id, p)).collect(),
        })
    }
}

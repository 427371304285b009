pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    child::{Child, NewChild, TaskImageUpload, ToggleOutcome},
    parent::{NewParent, Parent},
    prize::{NewPrize, Prize},
    task::{NewTask, Task},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Outcome of a guarded delete of a parent-owned entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Removal<T> {
    Removed(T),
    NotFound,
    /// The entity exists but is not in the acting parent's list.
    NotOwned,
    /// A child still references the entity.
    InUse,
}

/// Outcome of creating a child.
#[derive(Debug, Clone)]
pub enum ChildInsert {
    Created(Child),
    ParentNotFound,
    /// The prize is missing or belongs to another parent.
    PrizeNotFound,
    /// A selected task is missing or belongs to another parent.
    TaskNotFound(Uuid),
    /// A parent or child already uses the username.
    UsernameTaken,
}

/// Storage behind the handlers.
///
/// Every method that mutates more than one record applies its changes as a
/// single unit: callers never observe a half-applied update.
#[async_trait]
pub trait ChoreStore: Send + Sync {
    async fn ping(&self) -> anyhow::Result<()>;

    /// True if a parent or a child already uses `username`.
    async fn username_taken(&self, username: &str) -> anyhow::Result<bool>;

    /// Returns `None` if a parent or child already uses the username.
    async fn insert_parent(&self, parent: NewParent) -> anyhow::Result<Option<Parent>>;

    async fn parent_by_id(&self, id: Uuid) -> anyhow::Result<Option<Parent>>;

    async fn parent_by_username(&self, username: &str) -> anyhow::Result<Option<Parent>>;

    async fn child_by_id(&self, id: Uuid) -> anyhow::Result<Option<Child>>;

    async fn child_by_username(&self, username: &str) -> anyhow::Result<Option<Child>>;

    async fn children_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Child>>;

    async fn tasks_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Task>>;

    async fn prizes_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Prize>>;

    /// Creates the task and appends it to the parent's list. `None` if the
    /// parent does not exist.
    async fn insert_task(&self, parent_id: Uuid, task: NewTask) -> anyhow::Result<Option<Task>>;

    /// Replaces a task owned by `parent_id`. `None` if no such task.
    async fn update_task(
        &self,
        parent_id: Uuid,
        task_id: Uuid,
        task: NewTask,
    ) -> anyhow::Result<Option<Task>>;

    async fn delete_task(&self, parent_id: Uuid, task_id: Uuid) -> anyhow::Result<Removal<Task>>;

    async fn insert_prize(&self, parent_id: Uuid, prize: NewPrize)
        -> anyhow::Result<Option<Prize>>;

    async fn delete_prize(&self, parent_id: Uuid, prize_id: Uuid)
        -> anyhow::Result<Removal<Prize>>;

    /// Creates the child with every selected task not yet completed and zero
    /// points, and appends it to the parent's list. The prize and tasks must
    /// belong to `parent_id` and stay in place until the child exists.
    async fn insert_child(&self, parent_id: Uuid, child: NewChild)
        -> anyhow::Result<ChildInsert>;

    /// Removes a child of `parent_id` along with its task lists and images.
    async fn delete_child(&self, parent_id: Uuid, child_id: Uuid)
        -> anyhow::Result<Option<Child>>;

    /// Moves the task to the child's other list, adjusts points and applies
    /// the image rule, all at once.
    async fn toggle_task(
        &self,
        child_id: Uuid,
        task_id: Uuid,
        upload: &TaskImageUpload,
    ) -> anyhow::Result<ToggleOutcome>;
}

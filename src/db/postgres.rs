use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{ChildInsert, ChoreStore, Removal};
use crate::models::{
    child::{Child, ImageChange, NewChild, TaskImageUpload, ToggleOutcome, Transition},
    parent::{NewParent, Parent},
    prize::{NewPrize, Prize},
    task::{NewTask, Task},
};

/// Explicit column list for Parent. Reference lists come from ARRAY subqueries.
/// All queries must alias the parents table as `p`.
const PARENT_COLS: &str = "p.id, p.username, p.password_hash, p.profile_pic,
     ARRAY(SELECT t.id FROM tasks t WHERE t.parent_id = p.id ORDER BY t.position) AS task_ids,
     ARRAY(SELECT z.id FROM prizes z WHERE z.parent_id = p.id ORDER BY z.position) AS prize_ids,
     ARRAY(SELECT c.id FROM children c WHERE c.parent_id = p.id ORDER BY c.position) AS child_ids";

/// Explicit column list for Child. Task lists are split on `completed` and
/// images are aggregated as JSON. All queries must alias children as `c`.
const CHILD_COLS: &str = "c.id, c.parent_id, c.username, c.password_hash, c.prize_id, c.points, c.image_url,
     ARRAY(SELECT ct.task_id FROM child_tasks ct
           WHERE ct.child_id = c.id AND ct.completed ORDER BY ct.position) AS completed,
     ARRAY(SELECT ct.task_id FROM child_tasks ct
           WHERE ct.child_id = c.id AND NOT ct.completed ORDER BY ct.position) AS not_completed,
     COALESCE(
         (SELECT json_agg(json_build_object(
                     'taskId', ti.task_id, 'picBefore', ti.pic_before, 'picAfter', ti.pic_after)
                  ORDER BY ti.updated_at)
          FROM child_task_images ti WHERE ti.child_id = c.id),
         '[]'::json) AS task_images";

const TASK_COLS: &str = "id, name, value, image_url";

const USERNAME_TAKEN: &str = "SELECT EXISTS(SELECT 1 FROM parents WHERE username = $1)
                                  OR EXISTS(SELECT 1 FROM children WHERE username = $1)";

/// Serializes account creation per username across both account tables,
/// then reports whether the name is already used. Must run inside the
/// transaction that inserts the account.
async fn claim_username(
    tx: &mut Transaction<'_, Postgres>,
    username: &str,
) -> anyhow::Result<bool> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(username)
        .execute(&mut **tx)
        .await?;

    let taken: bool = sqlx::query_scalar(USERNAME_TAKEN)
        .bind(username)
        .fetch_one(&mut **tx)
        .await?;
    Ok(!taken)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChoreStore for PgStore {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn username_taken(&self, username: &str) -> anyhow::Result<bool> {
        let taken: bool = sqlx::query_scalar(USERNAME_TAKEN)
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }

    async fn insert_parent(&self, parent: NewParent) -> anyhow::Result<Option<Parent>> {
        let mut tx = self.pool.begin().await?;
        if !claim_username(&mut tx, &parent.username).await? {
            return Ok(None);
        }

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO parents (id, username, password_hash, profile_pic)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&parent.username)
        .bind(&parent.password_hash)
        .bind(&parent.profile_pic)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.parent_by_id(id).await
    }

    async fn parent_by_id(&self, id: Uuid) -> anyhow::Result<Option<Parent>> {
        let parent = sqlx::query_as::<_, Parent>(&format!(
            "SELECT {PARENT_COLS} FROM parents p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(parent)
    }

    async fn parent_by_username(&self, username: &str) -> anyhow::Result<Option<Parent>> {
        let parent = sqlx::query_as::<_, Parent>(&format!(
            "SELECT {PARENT_COLS} FROM parents p WHERE p.username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(parent)
    }

    async fn child_by_id(&self, id: Uuid) -> anyhow::Result<Option<Child>> {
        let child = sqlx::query_as::<_, Child>(&format!(
            "SELECT {CHILD_COLS} FROM children c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(child)
    }

    async fn child_by_username(&self, username: &str) -> anyhow::Result<Option<Child>> {
        let child = sqlx::query_as::<_, Child>(&format!(
            "SELECT {CHILD_COLS} FROM children c WHERE c.username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(child)
    }

    async fn children_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Child>> {
        let children = sqlx::query_as::<_, Child>(&format!(
            "SELECT {CHILD_COLS} FROM children c WHERE c.id = ANY($1) ORDER BY c.position"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(children)
    }

    async fn tasks_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLS} FROM tasks WHERE id = ANY($1) ORDER BY position"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn prizes_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Prize>> {
        let prizes = sqlx::query_as::<_, Prize>(
            "SELECT id, name, value, image_url FROM prizes WHERE id = ANY($1) ORDER BY position",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(prizes)
    }

    async fn insert_task(&self, parent_id: Uuid, task: NewTask) -> anyhow::Result<Option<Task>> {
        let created = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, parent_id, name, value, image_url)
             SELECT $1, $2, $3, $4, $5
             WHERE EXISTS(SELECT 1 FROM parents WHERE id = $2)
             RETURNING {TASK_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(parent_id)
        .bind(&task.name)
        .bind(task.value)
        .bind(&task.image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_task(
        &self,
        parent_id: Uuid,
        task_id: Uuid,
        task: NewTask,
    ) -> anyhow::Result<Option<Task>> {
        let updated = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
             SET name = $1, value = $2, image_url = $3, updated_at = NOW()
             WHERE id = $4 AND parent_id = $5
             RETURNING {TASK_COLS}"
        ))
        .bind(&task.name)
        .bind(task.value)
        .bind(&task.image_url)
        .bind(task_id)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_task(&self, parent_id: Uuid, task_id: Uuid) -> anyhow::Result<Removal<Task>> {
        let mut tx = self.pool.begin().await?;

        // Row lock: child_tasks inserts need a key-share lock on the task, so
        // no child can pick the task up between the check and the delete.
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT parent_id FROM tasks WHERE id = $1 FOR UPDATE")
                .bind(task_id)
                .fetch_optional(&mut *tx)
                .await?;

        match owner {
            None => return Ok(Removal::NotFound),
            Some(owner) if owner != parent_id => return Ok(Removal::NotOwned),
            Some(_) => {}
        }

        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM child_tasks WHERE task_id = $1)")
                .bind(task_id)
                .fetch_one(&mut *tx)
                .await?;
        if in_use {
            return Ok(Removal::InUse);
        }

        let deleted = sqlx::query_as::<_, Task>(&format!(
            "DELETE FROM tasks WHERE id = $1 RETURNING {TASK_COLS}"
        ))
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Removal::Removed(deleted))
    }

    async fn insert_prize(
        &self,
        parent_id: Uuid,
        prize: NewPrize,
    ) -> anyhow::Result<Option<Prize>> {
        let created = sqlx::query_as::<_, Prize>(
            "INSERT INTO prizes (id, parent_id, name, value, image_url)
             SELECT $1, $2, $3, $4, $5
             WHERE EXISTS(SELECT 1 FROM parents WHERE id = $2)
             RETURNING id, name, value, image_url",
        )
        .bind(Uuid::new_v4())
        .bind(parent_id)
        .bind(&prize.name)
        .bind(prize.value)
        .bind(&prize.image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created)
    }

    async fn delete_prize(
        &self,
        parent_id: Uuid,
        prize_id: Uuid,
    ) -> anyhow::Result<Removal<Prize>> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT parent_id FROM prizes WHERE id = $1 FOR UPDATE")
                .bind(prize_id)
                .fetch_optional(&mut *tx)
                .await?;

        match owner {
            None => return Ok(Removal::NotFound),
            Some(owner) if owner != parent_id => return Ok(Removal::NotOwned),
            Some(_) => {}
        }

        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM children WHERE prize_id = $1)")
                .bind(prize_id)
                .fetch_one(&mut *tx)
                .await?;
        if in_use {
            return Ok(Removal::InUse);
        }

        let deleted = sqlx::query_as::<_, Prize>(
            "DELETE FROM prizes WHERE id = $1 RETURNING id, name, value, image_url",
        )
        .bind(prize_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Removal::Removed(deleted))
    }

    async fn insert_child(&self, parent_id: Uuid, child: NewChild) -> anyhow::Result<ChildInsert> {
        let mut tx = self.pool.begin().await?;

        let parent_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM parents WHERE id = $1)")
                .bind(parent_id)
                .fetch_one(&mut *tx)
                .await?;
        if !parent_exists {
            return Ok(ChildInsert::ParentNotFound);
        }

        // Key-share locks keep the prize and tasks from being deleted before
        // the child row references them.
        let prize: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM prizes WHERE id = $1 AND parent_id = $2 FOR KEY SHARE",
        )
        .bind(child.prize_id)
        .bind(parent_id)
        .fetch_optional(&mut *tx)
        .await?;
        if prize.is_none() {
            return Ok(ChildInsert::PrizeNotFound);
        }

        let owned: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM tasks WHERE id = ANY($1) AND parent_id = $2 FOR KEY SHARE",
        )
        .bind(&child.task_ids)
        .bind(parent_id)
        .fetch_all(&mut *tx)
        .await?;
        if let Some(missing) = child.task_ids.iter().find(|id| !owned.contains(id)) {
            return Ok(ChildInsert::TaskNotFound(*missing));
        }

        if !claim_username(&mut tx, &child.username).await? {
            return Ok(ChildInsert::UsernameTaken);
        }

        let child_id = Uuid::new_v4();
        let inserted = sqlx::query(
            "INSERT INTO children (id, parent_id, username, password_hash, prize_id, points, image_url)
             VALUES ($1, $2, $3, $4, $5, 0, $6)",
        )
        .bind(child_id)
        .bind(parent_id)
        .bind(&child.username)
        .bind(&child.password_hash)
        .bind(child.prize_id)
        .bind(&child.image_url)
        .execute(&mut *tx)
        .await;
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Ok(ChildInsert::UsernameTaken),
            Err(e) => return Err(e.into()),
        }

        sqlx::query(
            "INSERT INTO child_tasks (child_id, task_id, completed)
             SELECT $1, sel.task_id, FALSE
             FROM UNNEST($2::uuid[]) WITH ORDINALITY AS sel(task_id, ord)
             ORDER BY sel.ord
             ON CONFLICT (child_id, task_id) DO NOTHING",
        )
        .bind(child_id)
        .bind(&child.task_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        match self.child_by_id(child_id).await? {
            Some(created) => Ok(ChildInsert::Created(created)),
            None => Err(anyhow::anyhow!("child {child_id} vanished after insert")),
        }
    }

    async fn delete_child(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> anyhow::Result<Option<Child>> {
        let mut tx = self.pool.begin().await?;

        let child = sqlx::query_as::<_, Child>(&format!(
            "SELECT {CHILD_COLS} FROM children c WHERE c.id = $1 AND c.parent_id = $2 FOR UPDATE"
        ))
        .bind(child_id)
        .bind(parent_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(child) = child else {
            return Ok(None);
        };

        // child_tasks and child_task_images go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM children WHERE id = $1")
            .bind(child_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(child))
    }

    async fn toggle_task(
        &self,
        child_id: Uuid,
        task_id: Uuid,
        upload: &TaskImageUpload,
    ) -> anyhow::Result<ToggleOutcome> {
        let mut tx = self.pool.begin().await?;

        let points: Option<i64> =
            sqlx::query_scalar("SELECT points FROM children WHERE id = $1 FOR UPDATE")
                .bind(child_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(points) = points else {
            return Ok(ToggleOutcome::ChildNotFound);
        };

        // Flipping the flag moves the task between the two lists; bumping the
        // position appends it to the end of its new list.
        let flipped: Option<(bool, i64)> = sqlx::query_as(
            "UPDATE child_tasks ct
             SET completed = NOT ct.completed,
                 position  = nextval('child_tasks_position_seq')
             FROM tasks t
             WHERE ct.child_id = $1 AND ct.task_id = $2 AND t.id = ct.task_id
             RETURNING ct.completed, t.value",
        )
        .bind(child_id)
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((now_completed, task_value)) = flipped else {
            return Ok(ToggleOutcome::TaskNotAssigned);
        };
        let transition = if now_completed {
            Transition::Completed
        } else {
            Transition::Reopened
        };

        // Dropping the transaction here also rolls back the flip above.
        let Some(points) = points.checked_add(transition.points_delta(task_value)) else {
            return Ok(ToggleOutcome::PointsOverflow);
        };

        sqlx::query("UPDATE children SET points = $1 WHERE id = $2")
            .bind(points)
            .bind(child_id)
            .execute(&mut *tx)
            .await?;

        match transition.image_change(task_id, upload) {
            ImageChange::Upsert(image) => {
                sqlx::query(
                    "INSERT INTO child_task_images (child_id, task_id, pic_before, pic_after)
                     VALUES ($1, $2, $3, $4)
                     ON CONFLICT (child_id, task_id) DO UPDATE
                     SET pic_before = EXCLUDED.pic_before,
                         pic_after  = EXCLUDED.pic_after,
                         updated_at = NOW()",
                )
                .bind(child_id)
                .bind(task_id)
                .bind(&image.pic_before)
                .bind(&image.pic_after)
                .execute(&mut *tx)
                .await?;
            }
            ImageChange::Remove => {
                sqlx::query("DELETE FROM child_task_images WHERE child_id = $1 AND task_id = $2")
                    .bind(child_id)
                    .bind(task_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let child = sqlx::query_as::<_, Child>(&format!(
            "SELECT {CHILD_COLS} FROM children c WHERE c.id = $1"
        ))
        .bind(child_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ToggleOutcome::Toggled { child, transition })
    }
}

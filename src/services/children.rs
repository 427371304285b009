use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{ChildInsert, ChoreStore},
    error::{ApiError, ApiResult},
    models::child::{
        Child, ChildView, CreateChildRequest, NewChild, TaskImageUpload, ToggleOutcome,
        ToggleTaskRequest,
    },
    services::{metrics, validation, Lookups},
};

pub struct ChildService;

impl ChildService {
    pub async fn get(store: &dyn ChoreStore, child_id: Uuid) -> ApiResult<ChildView> {
        let child = store
            .child_by_id(child_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Child not found"))?;
        Self::populate(store, child).await
    }

    /// Creates a child under `parent_id`. The selected prize and tasks must
    /// belong to that parent.
    pub async fn create(
        store: &dyn ChoreStore,
        config: &Config,
        parent_id: Uuid,
        body: CreateChildRequest,
    ) -> ApiResult<Child> {
        let username = validation::username(body.name.as_deref())?;
        let password = validation::password(body.password.as_deref())?;
        let image_url = validation::optional_image(body.profile_pic.as_deref(), "profilePic")?;
        let prize_id = body
            .selected_prize
            .as_ref()
            .map(|p| p.id())
            .ok_or_else(|| ApiError::validation("A prize must be selected"))?;
        let task_ids: Vec<Uuid> = body.selected_tasks.iter().map(|t| t.id()).collect();

        // The store re-checks this under its own lock.
        if store.username_taken(&username).await? {
            warn!(%parent_id, %username, "Child creation rejected: username taken");
            return Err(ApiError::Conflict("Username already exists".into()));
        }

        let password_hash = bcrypt::hash(&password, config.bcrypt_cost)
            .map_err(|e| anyhow::anyhow!("bcrypt hash failed: {e}"))?;

        let new_child = NewChild {
            username,
            password_hash,
            prize_id,
            task_ids,
            image_url,
        };
        let child = match store.insert_child(parent_id, new_child).await? {
            ChildInsert::Created(child) => child,
            ChildInsert::ParentNotFound => return Err(ApiError::not_found("Parent not found")),
            ChildInsert::PrizeNotFound => return Err(ApiError::not_found("Prize not found")),
            ChildInsert::TaskNotFound(missing) => {
                return Err(ApiError::not_found(format!("Task {missing} not found")))
            }
            ChildInsert::UsernameTaken => {
                warn!(%parent_id, "Child creation lost a username race");
                return Err(ApiError::Conflict("Username already exists".into()));
            }
        };

        info!(%parent_id, child_id = %child.id, "Child created");
        Ok(child)
    }

    /// Flips a task between the child's two lists, adjusting points and the
    /// task's photos in the same step.
    pub async fn toggle_task(
        store: &dyn ChoreStore,
        child_id: Uuid,
        body: ToggleTaskRequest,
    ) -> ApiResult<ChildView> {
        let task_id = body
            .task_id
            .ok_or_else(|| ApiError::validation("task_id is required"))?;
        let upload = TaskImageUpload::new(body.pic_before, body.pic_after);
        for (pic, field) in [(&upload.pic_before, "picBefore"), (&upload.pic_after, "picAfter")] {
            validation::optional_image(pic.as_deref(), field)?;
        }

        match store.toggle_task(child_id, task_id, &upload).await? {
            ToggleOutcome::Toggled { child, transition } => {
                metrics::TASK_TOGGLES_COUNTER
                    .with_label_values(&[transition.as_str()])
                    .inc();
                info!(
                    %child_id,
                    %task_id,
                    direction = transition.as_str(),
                    points = child.points,
                    "Task toggled"
                );
                Self::populate(store, child).await
            }
            ToggleOutcome::ChildNotFound => Err(ApiError::not_found("Child not found")),
            ToggleOutcome::TaskNotAssigned => {
                Err(ApiError::not_found("Task not found in child's lists"))
            }
            ToggleOutcome::PointsOverflow => {
                warn!(%child_id, %task_id, "Toggle rejected: points out of range");
                Err(ApiError::Conflict("Points total out of range".into()))
            }
        }
    }

    pub async fn delete(
        store: &dyn ChoreStore,
        parent_id: Uuid,
        child_id: Option<Uuid>,
    ) -> ApiResult<Child> {
        let child_id = child_id.ok_or_else(|| ApiError::validation("childId is required"))?;

        let child = store
            .delete_child(parent_id, child_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Child not found"))?;

        info!(%parent_id, %child_id, "Child deleted");
        Ok(child)
    }

    async fn populate(store: &dyn ChoreStore, child: Child) -> ApiResult<ChildView> {
        let task_ids: Vec<Uuid> = child.task_ids().copied().collect();
        let lookups = Lookups::load(store, &task_ids, &[child.prize_id]).await?;
        Ok(ChildView::assemble(child, &lookups.tasks, &lookups.prizes))
    }
}

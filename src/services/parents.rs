use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    db::{ChoreStore, Removal},
    error::{ApiError, ApiResult},
    models::{
        child::ChildView,
        parent::ParentView,
        prize::{NewPrize, Prize, PrizeRequest},
        task::{NewTask, Task, TaskRequest},
    },
    services::{metrics, validation, Lookups},
};

pub struct ParentService;

impl ParentService {
    /// The parent with children, tasks and prizes expanded, each list in
    /// insertion order.
    pub async fn get(store: &dyn ChoreStore, parent_id: Uuid) -> ApiResult<ParentView> {
        let parent = store
            .parent_by_id(parent_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Parent not found"))?;
        let children = store.children_by_ids(&parent.child_ids).await?;

        let mut task_ids = parent.task_ids.clone();
        let mut prize_ids = parent.prize_ids.clone();
        for child in &children {
            task_ids.extend(child.task_ids().filter(|id| !parent.task_ids.contains(id)));
            if !prize_ids.contains(&child.prize_id) {
                prize_ids.push(child.prize_id);
            }
        }
        let lookups = Lookups::load(store, &task_ids, &prize_ids).await?;

        let children = children
            .into_iter()
            .map(|c| ChildView::assemble(c, &lookups.tasks, &lookups.prizes))
            .collect();

        Ok(ParentView {
            id: parent.id,
            username: parent.username,
            profile_pic: parent.profile_pic,
            children,
            tasks: parent
                .task_ids
                .iter()
                .filter_map(|id| lookups.tasks.get(id).cloned())
                .collect(),
            prizes: parent
                .prize_ids
                .iter()
                .filter_map(|id| lookups.prizes.get(id).cloned())
                .collect(),
        })
    }

    pub async fn add_task(
        store: &dyn ChoreStore,
        parent_id: Uuid,
        body: TaskRequest,
    ) -> ApiResult<Task> {
        let task = new_task(&body)?;
        let created = store
            .insert_task(parent_id, task)
            .await?
            .ok_or_else(|| ApiError::not_found("Parent not found"))?;

        info!(%parent_id, task_id = %created.id, "Task created");
        Ok(created)
    }

    /// Replaces name, value and image of one of the parent's tasks. Points
    /// already earned with the old value are left as they are.
    pub async fn edit_task(
        store: &dyn ChoreStore,
        parent_id: Uuid,
        body: TaskRequest,
    ) -> ApiResult<Task> {
        let task_id = body
            .id
            .ok_or_else(|| ApiError::validation("Task id is required"))?;
        let task = new_task(&body)?;

        let updated = store
            .update_task(parent_id, task_id, task)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))?;

        info!(%parent_id, %task_id, "Task updated");
        Ok(updated)
    }

    pub async fn delete_task(
        store: &dyn ChoreStore,
        parent_id: Uuid,
        task_id: Option<Uuid>,
    ) -> ApiResult<Task> {
        let task_id = task_id.ok_or_else(|| ApiError::validation("taskId is required"))?;

        match store.delete_task(parent_id, task_id).await? {
            Removal::Removed(task) => {
                info!(%parent_id, %task_id, "Task deleted");
                Ok(task)
            }
            Removal::NotFound | Removal::NotOwned => Err(ApiError::not_found("Task not found")),
            Removal::InUse => {
                metrics::DELETIONS_REJECTED_COUNTER.with_label_values(&["task"]).inc();
                warn!(%parent_id, %task_id, "Task deletion refused: still assigned");
                Err(ApiError::Conflict(
                    "Task is assigned to a child and cannot be deleted".into(),
                ))
            }
        }
    }

    pub async fn add_prize(
        store: &dyn ChoreStore,
        parent_id: Uuid,
        body: PrizeRequest,
    ) -> ApiResult<Prize> {
        let prize = NewPrize {
            name: validation::name(body.name.as_deref())?,
            value: validation::value(body.value)?,
            image_url: validation::image(body.image_url.as_deref(), "imageURL")?,
        };
        let created = store
            .insert_prize(parent_id, prize)
            .await?
            .ok_or_else(|| ApiError::not_found("Parent not found"))?;

        info!(%parent_id, prize_id = %created.id, "Prize created");
        Ok(created)
    }

    pub async fn delete_prize(
        store: &dyn ChoreStore,
        parent_id: Uuid,
        prize_id: Option<Uuid>,
    ) -> ApiResult<Prize> {
        let prize_id = prize_id.ok_or_else(|| ApiError::validation("prizeId is required"))?;

        match store.delete_prize(parent_id, prize_id).await? {
            Removal::Removed(prize) => {
                info!(%parent_id, %prize_id, "Prize deleted");
                Ok(prize)
            }
            Removal::NotFound | Removal::NotOwned => Err(ApiError::not_found("Prize not found")),
            Removal::InUse => {
                metrics::DELETIONS_REJECTED_COUNTER.with_label_values(&["prize"]).inc();
                warn!(%parent_id, %prize_id, "Prize deletion refused: still assigned");
                Err(ApiError::Conflict(
                    "Prize is assigned to a child and cannot be deleted".into(),
                ))
            }
        }
    }
}

fn new_task(body: &TaskRequest) -> ApiResult<NewTask> {
    Ok(NewTask {
        name: validation::name(body.name.as_deref())?,
        value: validation::value(body.value)?,
        image_url: validation::image(body.image_url.as_deref(), "imageURL")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::{child::NewChild, parent::NewParent},
    };

    async fn parent(store: &MemoryStore, username: &str) -> Uuid {
        store
            .insert_parent(NewParent {
                username: username.into(),
                password_hash: "hash".into(),
                profile_pic: "https://example.com/p.png".into(),
            })
            .await
            .unwrap()
            .unwrap()
            .id
    }

    fn task_body(name: &str, value: i64) -> TaskRequest {
        TaskRequest {
            id: None,
            name: Some(name.into()),
            value: Some(value),
            image_url: Some("https://example.com/t.png".into()),
        }
    }

    #[tokio::test]
    async fn task_creation_requires_every_field() {
        let store = MemoryStore::new();
        let mama = parent(&store, "Mama").await;

        let mut body = task_body("Dishes", 10);
        body.image_url = None;
        let err = ParentService::add_task(&store, mama, body).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = ParentService::add_task(&store, mama, task_body("Dishes", 0)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let view = ParentService::get(&store, mama).await.unwrap();
        assert!(view.tasks.is_empty());
    }

    #[tokio::test]
    async fn edit_replaces_fields_in_place() {
        let store = MemoryStore::new();
        let mama = parent(&store, "Mama").await;
        let task = ParentService::add_task(&store, mama, task_body("Dishes", 10)).await.unwrap();

        let mut body = task_body("Dishes and pans", 12);
        body.id = Some(task.id);
        let edited = ParentService::edit_task(&store, mama, body).await.unwrap();

        assert_eq!(edited.id, task.id);
        assert_eq!(edited.value, 12);
        let view = ParentService::get(&store, mama).await.unwrap();
        assert_eq!(view.tasks, vec![edited]);
    }

    #[tokio::test]
    async fn another_parents_task_is_not_found() {
        let store = MemoryStore::new();
        let mama = parent(&store, "Mama").await;
        let papa = parent(&store, "Papa").await;
        let task = ParentService::add_task(&store, mama, task_body("Dishes", 10)).await.unwrap();

        let err = ParentService::delete_task(&store, papa, Some(task.id)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let mut body = task_body("Mine now", 1);
        body.id = Some(task.id);
        let err = ParentService::edit_task(&store, papa, body).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_expands_children_in_order() {
        let store = MemoryStore::new();
        let mama = parent(&store, "Mama").await;
        let dishes = ParentService::add_task(&store, mama, task_body("Dishes", 10)).await.unwrap();
        let laundry = ParentService::add_task(&store, mama, task_body("Laundry", 15)).await.unwrap();
        let lego = ParentService::add_prize(
            &store,
            mama,
            PrizeRequest {
                name: Some("Lego".into()),
                value: Some(100),
                image_url: Some("https://example.com/lego.png".into()),
            },
        )
        .await
        .unwrap();
        store
            .insert_child(
                mama,
                NewChild {
                    username: "Kid".into(),
                    password_hash: "hash".into(),
                    prize_id: lego.id,
                    task_ids: vec![laundry.id, dishes.id],
                    image_url: String::new(),
                },
            )
            .await
            .unwrap();

        let view = ParentService::get(&store, mama).await.unwrap();
        assert_eq!(view.tasks, vec![dishes.clone(), laundry.clone()]);
        assert_eq!(view.prizes, vec![lego.clone()]);
        assert_eq!(view.children.len(), 1);
        assert_eq!(view.children[0].tasks_not_completed, vec![laundry, dishes]);
        assert_eq!(view.children[0].prize, Some(lego));
    }

    #[tokio::test]
    async fn missing_ids_are_validation_errors() {
        let store = MemoryStore::new();
        let mama = parent(&store, "Mama").await;

        assert!(matches!(
            ParentService::delete_task(&store, mama, None).await.unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ParentService::delete_prize(&store, mama, None).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }
}

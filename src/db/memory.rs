//! In-process store with the same contracts as [`PgStore`](super::PgStore).
//! Backs the test suite; a single write lock makes every mutation atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChildInsert, ChoreStore, Removal};
use crate::models::{
    child::{Child, NewChild, TaskImageUpload, ToggleOutcome},
    parent::{NewParent, Parent},
    prize::{NewPrize, Prize},
    task::{NewTask, Task},
};

#[derive(Default)]
struct Collections {
    parents: HashMap<Uuid, Parent>,
    children: HashMap<Uuid, Child>,
    tasks: HashMap<Uuid, Task>,
    prizes: HashMap<Uuid, Prize>,
}

impl Collections {
    fn username_taken(&self, username: &str) -> bool {
        self.parents.values().any(|p| p.username == username)
            || self.children.values().any(|c| c.username == username)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChoreStore for MemoryStore {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn username_taken(&self, username: &str) -> anyhow::Result<bool> {
        Ok(self.inner.read().await.username_taken(username))
    }

    async fn insert_parent(&self, parent: NewParent) -> anyhow::Result<Option<Parent>> {
        let mut db = self.inner.write().await;
        if db.username_taken(&parent.username) {
            return Ok(None);
        }

        let created = Parent {
            id: Uuid::new_v4(),
            username: parent.username,
            password_hash: parent.password_hash,
            profile_pic: parent.profile_pic,
            task_ids: vec![],
            prize_ids: vec![],
            child_ids: vec![],
        };
        db.parents.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn parent_by_id(&self, id: Uuid) -> anyhow::Result<Option<Parent>> {
        Ok(self.inner.read().await.parents.get(&id).cloned())
    }

    async fn parent_by_username(&self, username: &str) -> anyhow::Result<Option<Parent>> {
        let db = self.inner.read().await;
        Ok(db.parents.values().find(|p| p.username == username).cloned())
    }

    async fn child_by_id(&self, id: Uuid) -> anyhow::Result<Option<Child>> {
        Ok(self.inner.read().await.children.get(&id).cloned())
    }

    async fn child_by_username(&self, username: &str) -> anyhow::Result<Option<Child>> {
        let db = self.inner.read().await;
        Ok(db.children.values().find(|c| c.username == username).cloned())
    }

    async fn children_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Child>> {
        let db = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| db.children.get(id).cloned()).collect())
    }

    async fn tasks_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Task>> {
        let db = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| db.tasks.get(id).cloned()).collect())
    }

    async fn prizes_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Prize>> {
        let db = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| db.prizes.get(id).cloned()).collect())
    }

    async fn insert_task(&self, parent_id: Uuid, task: NewTask) -> anyhow::Result<Option<Task>> {
        let mut db = self.inner.write().await;
        let Some(parent) = db.parents.get_mut(&parent_id) else {
            return Ok(None);
        };

        let created = Task {
            id: Uuid::new_v4(),
            name: task.name,
            value: task.value,
            image_url: task.image_url,
        };
        parent.task_ids.push(created.id);
        db.tasks.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn update_task(
        &self,
        parent_id: Uuid,
        task_id: Uuid,
        task: NewTask,
    ) -> anyhow::Result<Option<Task>> {
        let mut db = self.inner.write().await;
        let owned = db
            .parents
            .get(&parent_id)
            .is_some_and(|p| p.task_ids.contains(&task_id));
        if !owned {
            return Ok(None);
        }

        let Some(existing) = db.tasks.get_mut(&task_id) else {
            return Ok(None);
        };
        existing.name = task.name;
        existing.value = task.value;
        existing.image_url = task.image_url;
        Ok(Some(existing.clone()))
    }

    async fn delete_task(&self, parent_id: Uuid, task_id: Uuid) -> anyhow::Result<Removal<Task>> {
        let mut db = self.inner.write().await;
        if !db.tasks.contains_key(&task_id) {
            return Ok(Removal::NotFound);
        }
        let owned = db
            .parents
            .get(&parent_id)
            .is_some_and(|p| p.task_ids.contains(&task_id));
        if !owned {
            return Ok(Removal::NotOwned);
        }
        if db.children.values().any(|c| c.references_task(task_id)) {
            return Ok(Removal::InUse);
        }

        if let Some(parent) = db.parents.get_mut(&parent_id) {
            parent.task_ids.retain(|id| *id != task_id);
        }
        match db.tasks.remove(&task_id) {
            Some(task) => Ok(Removal::Removed(task)),
            None => Ok(Removal::NotFound),
        }
    }

    async fn insert_prize(
        &self,
        parent_id: Uuid,
        prize: NewPrize,
    ) -> anyhow::Result<Option<Prize>> {
        let mut db = self.inner.write().await;
        let Some(parent) = db.parents.get_mut(&parent_id) else {
            return Ok(None);
        };

        let created = Prize {
            id: Uuid::new_v4(),
            name: prize.name,
            value: prize.value,
            image_url: prize.image_url,
        };
        parent.prize_ids.push(created.id);
        db.prizes.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn delete_prize(
        &self,
        parent_id: Uuid,
        prize_id: Uuid,
    ) -> anyhow::Result<Removal<Prize>> {
        let mut db = self.inner.write().await;
        if !db.prizes.contains_key(&prize_id) {
            return Ok(Removal::NotFound);
        }
        let owned = db
            .parents
            .get(&parent_id)
            .is_some_and(|p| p.prize_ids.contains(&prize_id));
        if !owned {
            return Ok(Removal::NotOwned);
        }
        if db.children.values().any(|c| c.prize_id == prize_id) {
            return Ok(Removal::InUse);
        }

        if let Some(parent) = db.parents.get_mut(&parent_id) {
            parent.prize_ids.retain(|id| *id != prize_id);
        }
        match db.prizes.remove(&prize_id) {
            Some(prize) => Ok(Removal::Removed(prize)),
            None => Ok(Removal::NotFound),
        }
    }

    async fn insert_child(&self, parent_id: Uuid, child: NewChild) -> anyhow::Result<ChildInsert> {
        let mut db = self.inner.write().await;
        let Some(parent) = db.parents.get(&parent_id) else {
            return Ok(ChildInsert::ParentNotFound);
        };
        if !parent.prize_ids.contains(&child.prize_id) {
            return Ok(ChildInsert::PrizeNotFound);
        }
        if let Some(missing) = child.task_ids.iter().find(|id| !parent.task_ids.contains(id)) {
            return Ok(ChildInsert::TaskNotFound(*missing));
        }
        if db.username_taken(&child.username) {
            return Ok(ChildInsert::UsernameTaken);
        }

        let mut not_completed: Vec<Uuid> = Vec::with_capacity(child.task_ids.len());
        for id in child.task_ids {
            if !not_completed.contains(&id) {
                not_completed.push(id);
            }
        }

        let created = Child {
            id: Uuid::new_v4(),
            parent_id,
            username: child.username,
            password_hash: child.password_hash,
            prize_id: child.prize_id,
            completed: vec![],
            not_completed,
            points: 0,
            image_url: child.image_url,
            task_images: vec![],
        };
        if let Some(parent) = db.parents.get_mut(&parent_id) {
            parent.child_ids.push(created.id);
        }
        db.children.insert(created.id, created.clone());
        Ok(ChildInsert::Created(created))
    }

    async fn delete_child(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> anyhow::Result<Option<Child>> {
        let mut db = self.inner.write().await;
        let owned = db
            .children
            .get(&child_id)
            .is_some_and(|c| c.parent_id == parent_id);
        if !owned {
            return Ok(None);
        }

        if let Some(parent) = db.parents.get_mut(&parent_id) {
            parent.child_ids.retain(|id| *id != child_id);
        }
        Ok(db.children.remove(&child_id))
    }

    async fn toggle_task(
        &self,
        child_id: Uuid,
        task_id: Uuid,
        upload: &TaskImageUpload,
    ) -> anyhow::Result<ToggleOutcome> {
        let mut db = self.inner.write().await;
        let task_value = db.tasks.get(&task_id).map(|t| t.value);

        let Some(child) = db.children.get_mut(&child_id) else {
            return Ok(ToggleOutcome::ChildNotFound);
        };
        let Some(task_value) = task_value else {
            return Ok(ToggleOutcome::TaskNotAssigned);
        };

        match child.apply_toggle(task_id, task_value, upload) {
            Ok(Some(transition)) => Ok(ToggleOutcome::Toggled {
                child: child.clone(),
                transition,
            }),
            Ok(None) => Ok(ToggleOutcome::TaskNotAssigned),
            Err(_) => Ok(ToggleOutcome::PointsOverflow),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_parent(username: &str) -> NewParent {
        NewParent {
            username: username.into(),
            password_hash: "hash".into(),
            profile_pic: "https://example.com/p.png".into(),
        }
    }

    fn new_task(name: &str, value: i64) -> NewTask {
        NewTask {
            name: name.into(),
            value,
            image_url: "https://example.com/t.png".into(),
        }
    }

    fn created(outcome: ChildInsert) -> Child {
        match outcome {
            ChildInsert::Created(child) => child,
            other => panic!("child not created: {other:?}"),
        }
    }

    fn new_child(username: &str, prize_id: Uuid, task_ids: Vec<Uuid>) -> NewChild {
        NewChild {
            username: username.into(),
            password_hash: "hash".into(),
            prize_id,
            task_ids,
            image_url: String::new(),
        }
    }

    async fn family(store: &MemoryStore) -> (Parent, Task, Prize, Child) {
        let parent = store.insert_parent(new_parent("Mama")).await.unwrap().unwrap();
        let task = store.insert_task(parent.id, new_task("Dishes", 10)).await.unwrap().unwrap();
        let prize = store
            .insert_prize(
                parent.id,
                NewPrize { name: "Lego".into(), value: 100, image_url: "https://example.com/l.png".into() },
            )
            .await
            .unwrap()
            .unwrap();
        let child = created(
            store
                .insert_child(parent.id, new_child("Kid", prize.id, vec![task.id, task.id]))
                .await
                .unwrap(),
        );
        (parent, task, prize, child)
    }

    #[tokio::test]
    async fn duplicate_parent_username_is_refused() {
        let store = MemoryStore::new();
        assert!(store.insert_parent(new_parent("Mama")).await.unwrap().is_some());
        assert!(store.insert_parent(new_parent("Mama")).await.unwrap().is_none());
        assert!(store.username_taken("Mama").await.unwrap());
    }

    #[tokio::test]
    async fn child_is_appended_to_parent_and_selection_deduplicated() {
        let store = MemoryStore::new();
        let (parent, task, _, child) = family(&store).await;

        assert_eq!(child.not_completed, vec![task.id]);
        assert_eq!(child.points, 0);
        let parent = store.parent_by_id(parent.id).await.unwrap().unwrap();
        assert_eq!(parent.child_ids, vec![child.id]);
    }

    #[tokio::test]
    async fn referenced_entities_cannot_be_deleted() {
        let store = MemoryStore::new();
        let (parent, task, prize, child) = family(&store).await;

        assert_eq!(store.delete_task(parent.id, task.id).await.unwrap(), Removal::InUse);
        assert_eq!(store.delete_prize(parent.id, prize.id).await.unwrap(), Removal::InUse);
        let unchanged = store.parent_by_id(parent.id).await.unwrap().unwrap();
        assert_eq!(unchanged.task_ids, vec![task.id]);
        assert_eq!(unchanged.prize_ids, vec![prize.id]);

        store.delete_child(parent.id, child.id).await.unwrap().unwrap();
        assert_eq!(store.delete_task(parent.id, task.id).await.unwrap(), Removal::Removed(task));
        assert_eq!(store.delete_prize(parent.id, prize.id).await.unwrap(), Removal::Removed(prize));
        let parent = store.parent_by_id(parent.id).await.unwrap().unwrap();
        assert!(parent.task_ids.is_empty());
        assert!(parent.prize_ids.is_empty());
        assert!(parent.child_ids.is_empty());
    }

    #[tokio::test]
    async fn other_parents_cannot_touch_foreign_tasks() {
        let store = MemoryStore::new();
        let (_, task, _, _) = family(&store).await;
        let stranger = store.insert_parent(new_parent("Stranger")).await.unwrap().unwrap();

        assert_eq!(store.delete_task(stranger.id, task.id).await.unwrap(), Removal::NotOwned);
        assert!(store
            .update_task(stranger.id, task.id, new_task("Hijacked", 1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn toggle_reports_missing_child_and_unassigned_task() {
        let store = MemoryStore::new();
        let (parent, _, _, child) = family(&store).await;
        let other = store.insert_task(parent.id, new_task("Laundry", 15)).await.unwrap().unwrap();
        let upload = TaskImageUpload::default();

        assert!(matches!(
            store.toggle_task(Uuid::new_v4(), other.id, &upload).await.unwrap(),
            ToggleOutcome::ChildNotFound
        ));
        assert!(matches!(
            store.toggle_task(child.id, other.id, &upload).await.unwrap(),
            ToggleOutcome::TaskNotAssigned
        ));
        assert_eq!(store.child_by_id(child.id).await.unwrap().unwrap().points, 0);
    }

    #[tokio::test]
    async fn child_selection_must_belong_to_the_parent() {
        let store = MemoryStore::new();
        let (_, task, prize, _) = family(&store).await;
        let papa = store.insert_parent(new_parent("Papa")).await.unwrap().unwrap();
        let own = store.insert_task(papa.id, new_task("Laundry", 15)).await.unwrap().unwrap();

        assert!(matches!(
            store.insert_child(papa.id, new_child("Kid2", prize.id, vec![])).await.unwrap(),
            ChildInsert::PrizeNotFound
        ));

        let own_prize = store
            .insert_prize(
                papa.id,
                NewPrize { name: "Kite".into(), value: 50, image_url: "https://example.com/k.png".into() },
            )
            .await
            .unwrap()
            .unwrap();
        match store
            .insert_child(papa.id, new_child("Kid2", own_prize.id, vec![own.id, task.id]))
            .await
            .unwrap()
        {
            ChildInsert::TaskNotFound(id) => assert_eq!(id, task.id),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(store.parent_by_id(papa.id).await.unwrap().unwrap().child_ids.is_empty());
    }

    #[tokio::test]
    async fn usernames_are_shared_between_parents_and_children() {
        let store = MemoryStore::new();
        let (parent, task, prize, _) = family(&store).await;

        assert!(matches!(
            store.insert_child(parent.id, new_child("Mama", prize.id, vec![task.id])).await.unwrap(),
            ChildInsert::UsernameTaken
        ));
        assert!(store.insert_parent(new_parent("Kid")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overflowing_toggle_leaves_child_untouched() {
        let store = MemoryStore::new();
        let (parent, _, prize, _) = family(&store).await;
        let big = store.insert_task(parent.id, new_task("Big", i64::MAX)).await.unwrap().unwrap();
        let one = store.insert_task(parent.id, new_task("One", 1)).await.unwrap().unwrap();
        let child = created(
            store
                .insert_child(parent.id, new_child("Greedy", prize.id, vec![big.id, one.id]))
                .await
                .unwrap(),
        );
        let upload = TaskImageUpload::default();

        assert!(matches!(
            store.toggle_task(child.id, big.id, &upload).await.unwrap(),
            ToggleOutcome::Toggled { .. }
        ));
        assert!(matches!(
            store.toggle_task(child.id, one.id, &upload).await.unwrap(),
            ToggleOutcome::PointsOverflow
        ));

        let stored = store.child_by_id(child.id).await.unwrap().unwrap();
        assert_eq!(stored.points, i64::MAX);
        assert_eq!(stored.not_completed, vec![one.id]);
    }
}

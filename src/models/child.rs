use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{prize::Prize, task::Task, IdRef};

/// Before/after photos attached to a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskImage {
    pub task_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic_after: Option<String>,
}

/// Child account as stored. A task id is in at most one of `completed` and
/// `not_completed`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Child {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "parent")]
    pub parent_id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "prize")]
    pub prize_id: Uuid,
    #[serde(rename = "tasksCompleted")]
    pub completed: Vec<Uuid>,
    #[serde(rename = "tasksNotCompleted")]
    pub not_completed: Vec<Uuid>,
    pub points: i64,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "taskImages")]
    #[sqlx(json)]
    pub task_images: Vec<TaskImage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    NotCompleted,
    Completed,
}

/// What a toggle does to a task that is in one of the child's lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Completed,
    Reopened,
}

impl Transition {
    pub fn from_state(state: TaskState) -> Self {
        match state {
            TaskState::NotCompleted => Transition::Completed,
            TaskState::Completed => Transition::Reopened,
        }
    }

    pub fn points_delta(self, task_value: i64) -> i64 {
        match self {
            Transition::Completed => task_value,
            Transition::Reopened => -task_value,
        }
    }

    /// Images are kept only when the task became complete and at least one
    /// photo came with the request. Anything else clears the record.
    pub fn image_change(self, task_id: Uuid, upload: &TaskImageUpload) -> ImageChange {
        match self {
            Transition::Completed if !upload.is_empty() => ImageChange::Upsert(TaskImage {
                task_id,
                pic_before: upload.pic_before.clone(),
                pic_after: upload.pic_after.clone(),
            }),
            _ => ImageChange::Remove,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Completed => "completed",
            Transition::Reopened => "reopened",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageChange {
    Upsert(TaskImage),
    Remove,
}

/// Photos supplied with a toggle. Empty strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct TaskImageUpload {
    pub pic_before: Option<String>,
    pub pic_after: Option<String>,
}

impl TaskImageUpload {
    pub fn new(pic_before: Option<String>, pic_after: Option<String>) -> Self {
        let keep = |p: Option<String>| p.filter(|s| !s.trim().is_empty());
        Self {
            pic_before: keep(pic_before),
            pic_after: keep(pic_after),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pic_before.is_none() && self.pic_after.is_none()
    }
}

/// The points counter cannot absorb a toggle's delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("points total out of range")]
pub struct PointsOverflow;

/// Result of asking a store to toggle a task.
#[derive(Debug, Clone)]
pub enum ToggleOutcome {
    Toggled { child: Child, transition: Transition },
    ChildNotFound,
    TaskNotAssigned,
    PointsOverflow,
}

impl Child {
    pub fn task_state(&self, task_id: Uuid) -> Option<TaskState> {
        if self.not_completed.contains(&task_id) {
            Some(TaskState::NotCompleted)
        } else if self.completed.contains(&task_id) {
            Some(TaskState::Completed)
        } else {
            None
        }
    }

    /// Every task id referenced by either list.
    pub fn task_ids(&self) -> impl Iterator<Item = &Uuid> {
        self.completed.iter().chain(self.not_completed.iter())
    }

    pub fn references_task(&self, task_id: Uuid) -> bool {
        self.task_state(task_id).is_some()
    }

    /// Moves `task_id` to the other list, adjusts points by `task_value` and
    /// applies the image rule. Returns `Ok(None)` if the task is in neither
    /// list. Nothing changes when the new points total would not fit.
    pub fn apply_toggle(
        &mut self,
        task_id: Uuid,
        task_value: i64,
        upload: &TaskImageUpload,
    ) -> Result<Option<Transition>, PointsOverflow> {
        let Some(state) = self.task_state(task_id) else {
            return Ok(None);
        };
        let transition = Transition::from_state(state);
        let points = self
            .points
            .checked_add(transition.points_delta(task_value))
            .ok_or(PointsOverflow)?;

        let (from, to) = match transition {
            Transition::Completed => (&mut self.not_completed, &mut self.completed),
            Transition::Reopened => (&mut self.completed, &mut self.not_completed),
        };
        from.retain(|id| *id != task_id);
        if !to.contains(&task_id) {
            to.push(task_id);
        }

        self.points = points;

        self.task_images.retain(|img| img.task_id != task_id);
        if let ImageChange::Upsert(image) = transition.image_change(task_id, upload) {
            self.task_images.push(image);
        }

        Ok(Some(transition))
    }
}

#[derive(Debug, Clone)]
pub struct NewChild {
    pub username: String,
    pub password_hash: String,
    pub prize_id: Uuid,
    pub task_ids: Vec<Uuid>,
    pub image_url: String,
}

/// Child with its prize and task lists expanded.
#[derive(Debug, Clone, Serialize)]
pub struct ChildView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub prize: Option<Prize>,
    #[serde(rename = "tasksCompleted")]
    pub tasks_completed: Vec<Task>,
    #[serde(rename = "tasksNotCompleted")]
    pub tasks_not_completed: Vec<Task>,
    pub points: i64,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "taskImages")]
    pub task_images: Vec<TaskImage>,
}

impl ChildView {
    /// Expands a child's references from pre-fetched lookups, keeping list order.
    pub fn assemble(
        child: Child,
        tasks: &HashMap<Uuid, Task>,
        prizes: &HashMap<Uuid, Prize>,
    ) -> Self {
        let expand = |ids: &[Uuid]| -> Vec<Task> {
            ids.iter().filter_map(|id| tasks.get(id).cloned()).collect()
        };

        Self {
            id: child.id,
            username: child.username,
            prize: prizes.get(&child.prize_id).cloned(),
            tasks_completed: expand(&child.completed),
            tasks_not_completed: expand(&child.not_completed),
            points: child.points,
            image_url: child.image_url,
            task_images: child.task_images,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateChildRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "selectedPrize")]
    pub selected_prize: Option<IdRef>,
    #[serde(rename = "selectedTasks", default)]
    pub selected_tasks: Vec<IdRef>,
    #[serde(rename = "profilePic")]
    pub profile_pic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleTaskRequest {
    pub task_id: Option<Uuid>,
    #[serde(rename = "picBefore")]
    pub pic_before: Option<String>,
    #[serde(rename = "picAfter")]
    pub pic_after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteChildRequest {
    #[serde(rename = "childId")]
    pub child_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kid(not_completed: Vec<Uuid>) -> Child {
        Child {
            id: Uuid::new_v4(),
            parent_id: Uuid::new_v4(),
            username: "Kid".into(),
            password_hash: String::new(),
            prize_id: Uuid::new_v4(),
            completed: vec![],
            not_completed,
            points: 0,
            image_url: String::new(),
            task_images: vec![],
        }
    }

    #[test]
    fn completing_moves_task_and_adds_points() {
        let dishes = Uuid::new_v4();
        let mut child = kid(vec![dishes]);

        let t = child.apply_toggle(dishes, 10, &TaskImageUpload::default());

        assert_eq!(t, Ok(Some(Transition::Completed)));
        assert_eq!(child.completed, vec![dishes]);
        assert!(child.not_completed.is_empty());
        assert_eq!(child.points, 10);
    }

    #[test]
    fn even_number_of_toggles_restores_points_and_lists() {
        let dishes = Uuid::new_v4();
        let laundry = Uuid::new_v4();
        let mut child = kid(vec![dishes, laundry]);

        for _ in 0..4 {
            child.apply_toggle(dishes, 10, &TaskImageUpload::default()).unwrap();
        }

        assert_eq!(child.points, 0);
        assert!(child.completed.is_empty());
        assert_eq!(child.not_completed.len(), 2);
        assert!(child.not_completed.contains(&dishes));
    }

    #[test]
    fn unknown_task_changes_nothing() {
        let mut child = kid(vec![Uuid::new_v4()]);
        child.points = 7;

        assert_eq!(child.apply_toggle(Uuid::new_v4(), 10, &TaskImageUpload::default()), Ok(None));
        assert_eq!(child.points, 7);
    }

    #[test]
    fn points_may_go_negative() {
        let dishes = Uuid::new_v4();
        let mut child = kid(vec![]);
        child.completed.push(dishes);

        assert_eq!(
            child.apply_toggle(dishes, 10, &TaskImageUpload::default()),
            Ok(Some(Transition::Reopened))
        );
        assert_eq!(child.points, -10);
    }

    #[test]
    fn overflowing_toggle_is_refused_and_changes_nothing() {
        let big = Uuid::new_v4();
        let one = Uuid::new_v4();
        let mut child = kid(vec![big, one]);

        assert_eq!(
            child.apply_toggle(big, i64::MAX, &TaskImageUpload::default()),
            Ok(Some(Transition::Completed))
        );
        assert_eq!(
            child.apply_toggle(one, 1, &TaskImageUpload::default()),
            Err(PointsOverflow)
        );
        assert_eq!(child.points, i64::MAX);
        assert_eq!(child.not_completed, vec![one]);
        assert_eq!(child.completed, vec![big]);
    }

    #[test]
    fn images_replace_existing_record_on_completion() {
        let dishes = Uuid::new_v4();
        let mut child = kid(vec![dishes]);
        child.task_images.push(TaskImage {
            task_id: dishes,
            pic_before: Some("old".into()),
            pic_after: None,
        });

        let upload = TaskImageUpload::new(None, Some("data:image/png;base64,AAAA".into()));
        child.apply_toggle(dishes, 10, &upload).unwrap();

        assert_eq!(child.task_images.len(), 1);
        assert_eq!(child.task_images[0].pic_before, None);
        assert_eq!(child.task_images[0].pic_after.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn reopening_clears_images_even_when_new_ones_are_sent() {
        let dishes = Uuid::new_v4();
        let mut child = kid(vec![dishes]);
        let upload = TaskImageUpload::new(Some("before".into()), Some("after".into()));

        child.apply_toggle(dishes, 10, &upload).unwrap();
        assert_eq!(child.task_images.len(), 1);

        child.apply_toggle(dishes, 10, &upload).unwrap();
        assert!(child.task_images.is_empty());
    }

    #[test]
    fn blank_uploads_count_as_absent() {
        let upload = TaskImageUpload::new(Some("  ".into()), Some(String::new()));
        assert!(upload.is_empty());
        assert_eq!(
            Transition::Completed.image_change(Uuid::new_v4(), &upload),
            ImageChange::Remove
        );
    }

    #[test]
    fn assemble_keeps_list_order_and_resolves_prize() {
        let a = Task { id: Uuid::new_v4(), name: "A".into(), value: 1, image_url: "a".into() };
        let b = Task { id: Uuid::new_v4(), name: "B".into(), value: 2, image_url: "b".into() };
        let child = kid(vec![b.id, a.id]);
        let prize = Prize { id: child.prize_id, name: "Lego".into(), value: 100, image_url: "l".into() };

        let tasks = HashMap::from([(a.id, a.clone()), (b.id, b.clone())]);
        let prizes = HashMap::from([(prize.id, prize.clone())]);
        let view = ChildView::assemble(child, &tasks, &prizes);

        assert_eq!(view.tasks_not_completed, vec![b, a]);
        assert_eq!(view.prize, Some(prize));
    }
}

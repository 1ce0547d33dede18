//! Task API handlers.
//!
//! ```text
//! GET  /api/v1/tasks?type=daily
//! GET  /api/v1/users/{id}/tasks
//! PUT  /api/v1/users/{id}/tasks/{taskId} {"progress":2}
//! POST /api/v1/users/{id}/tasks/{taskId}/complete
//! ```

use actix_web::{get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::TaskProgressReceipt;
use crate::domain::{TaskDefinition, UserTask};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{
    ErrorSchema, TaskDefinitionSchema, TaskProgressReceiptSchema, UserTaskSchema,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::USER_ID_FIELD;
use crate::inbound::http::validation::{
    FieldName, parse_optional_task_kind, parse_task_id, parse_user_id,
};

const TASK_ID_FIELD: FieldName = FieldName::new("taskId");
const TYPE_FIELD: FieldName = FieldName::new("type");

/// Query string for `GET /api/v1/tasks`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// One of `daily`, `weekly` or `special`; all kinds when omitted.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Request body for `PUT /api/v1/users/{id}/tasks/{taskId}`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgressRequest {
    /// Reported progress; values past the requirement are capped.
    #[schema(example = 2)]
    pub progress: u32,
}

/// List active tasks, optionally of one type.
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Active tasks ordered by id", body = [TaskDefinitionSchema]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["tasks"],
    operation_id = "listTasks"
)]
#[get("/tasks")]
pub async fn list_tasks(
    state: web::Data<HttpState>,
    query: web::Query<TaskListQuery>,
) -> ApiResult<web::Json<Vec<TaskDefinition>>> {
    let kind = parse_optional_task_kind(query.kind.as_deref(), TYPE_FIELD)?;
    let tasks = state.tasks_query.tasks(kind).await?;
    Ok(web::Json(tasks))
}

/// List the user's task progress.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/tasks",
    params(("id" = String, Path, format = Uuid, description = "User identifier")),
    responses(
        (status = 200, description = "Progress records ordered by task id", body = [UserTaskSchema]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["tasks"],
    operation_id = "listUserTasks"
)]
#[get("/users/{id}/tasks")]
pub async fn list_user_tasks(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<UserTask>>> {
    let user_id = parse_user_id(&path, USER_ID_FIELD)?;
    let user_tasks = state.tasks_query.user_tasks(&user_id).await?;
    Ok(web::Json(user_tasks))
}

/// Report progress on a task.
///
/// Reaching the requirement completes the task and credits its points in
/// the same write. Lower progress than already stored is ignored.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/tasks/{taskId}",
    params(
        ("id" = String, Path, format = Uuid, description = "User identifier"),
        ("taskId" = i64, Path, description = "Task identifier")
    ),
    request_body = TaskProgressRequest,
    responses(
        (status = 200, description = "Progress recorded", body = TaskProgressReceiptSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown user or task", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["tasks"],
    operation_id = "updateTaskProgress"
)]
#[put("/users/{id}/tasks/{taskId}")]
pub async fn update_task_progress(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    payload: web::Json<TaskProgressRequest>,
) -> ApiResult<web::Json<TaskProgressReceipt>> {
    let (raw_user, raw_task) = path.into_inner();
    let user_id = parse_user_id(&raw_user, USER_ID_FIELD)?;
    let task_id = parse_task_id(&raw_task, TASK_ID_FIELD)?;
    let receipt = state
        .tasks
        .update_progress(&user_id, task_id, payload.progress)
        .await?;
    Ok(web::Json(receipt))
}

/// Mark a task complete.
///
/// Completing an already completed task succeeds without a second credit.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/tasks/{taskId}/complete",
    params(
        ("id" = String, Path, format = Uuid, description = "User identifier"),
        ("taskId" = i64, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "Task completed", body = TaskProgressReceiptSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown user or task", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["tasks"],
    operation_id = "completeTask"
)]
#[post("/users/{id}/tasks/{taskId}/complete")]
pub async fn complete_task(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<TaskProgressReceipt>> {
    let (raw_user, raw_task) = path.into_inner();
    let user_id = parse_user_id(&raw_user, USER_ID_FIELD)?;
    let task_id = parse_task_id(&raw_task, TASK_ID_FIELD)?;
    let receipt = state.tasks.complete(&user_id, task_id).await?;
    Ok(web::Json(receipt))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::{Error, TaskId, TaskKind, UserId, default_task_catalog};
    use crate::inbound::http::test_utils::{TestPorts, test_app};
    use crate::test_support::{UserBuilder, at_hour};

    fn catalog() -> Vec<TaskDefinition> {
        default_task_catalog()
            .into_iter()
            .map(|draft| TaskDefinition::new(draft).expect("valid draft"))
            .collect()
    }

    #[rstest]
    #[case::all("/api/v1/tasks", None)]
    #[case::daily("/api/v1/tasks?type=daily", Some(TaskKind::Daily))]
    #[actix_web::test]
    async fn list_forwards_the_type_filter(
        #[case] uri: &str,
        #[case] expected: Option<TaskKind>,
    ) {
        let mut ports = TestPorts::default();
        ports
            .tasks_query
            .expect_tasks()
            .withf(move |kind| *kind == expected)
            .times(1)
            .return_once(|_| Ok(catalog()));
        let app = actix_test::init_service(test_app(ports)).await;

        let response =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Vec<Value> = actix_test::read_body_json(response).await;
        let first = body.first().expect("at least one task");
        assert_eq!(first["type"], "daily");
        assert_eq!(first["requiredAmount"], 1);
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_type_is_rejected_before_the_port() {
        let app = actix_test::init_service(test_app(TestPorts::default())).await;

        let request = actix_test::TestRequest::get()
            .uri("/api/v1/tasks?type=monthly")
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["details"]["field"], "type");
    }

    #[rstest]
    #[actix_web::test]
    async fn progress_update_returns_the_receipt() {
        let user = UserBuilder::new("42").points(60).build();
        let user_id = user.id();
        let mut ports = TestPorts::default();
        ports
            .tasks
            .expect_update_progress()
            .withf(move |id, task, progress| *id == user_id && task.get() == 2 && *progress == 3)
            .times(1)
            .return_once(move |_, task_id, progress| {
                Ok(TaskProgressReceipt {
                    user_task: UserTask {
                        user_id,
                        task_id,
                        progress,
                        completed_at: Some(at_hour(1)),
                    },
                    user,
                    credited_points: 50,
                })
            });
        let app = actix_test::init_service(test_app(ports)).await;

        let request = actix_test::TestRequest::put()
            .uri(&format!("/api/v1/users/{user_id}/tasks/2"))
            .set_json(json!({ "progress": 3 }))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["creditedPoints"], 50);
        assert_eq!(body["userTask"]["taskId"], 2);
        assert!(body["userTask"]["completedAt"].is_string());
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_task_id_is_rejected() {
        let app = actix_test::init_service(test_app(TestPorts::default())).await;

        let request = actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{}/tasks/first/complete", UserId::random()))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["details"]["field"], "taskId");
    }

    #[rstest]
    #[actix_web::test]
    async fn completing_an_unknown_task_is_not_found() {
        let mut ports = TestPorts::default();
        ports
            .tasks
            .expect_complete()
            .withf(|_, task| *task == TaskId::new(99))
            .times(1)
            .return_once(|_, _| Err(Error::not_found("task 99 not found")));
        let app = actix_test::init_service(test_app(ports)).await;

        let request = actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{}/tasks/99/complete", UserId::random()))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["code"], "not_found");
    }
}

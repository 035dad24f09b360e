use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
    query::Query,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use meshforum_common::model::{
    Id,
    question::{
        Answer, CreateAnswer, CreateQuestion, Question, QuestionMarker, QuestionWithAnswers,
        TagName,
    },
};
use meshforum_db::store::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_questions)
        .typed_post(create_question)
        .typed_get(get_question)
        .typed_post(create_answer)
}

#[derive(Clone, Debug, Default, Deserialize)]
struct ListQuestionsQuery {
    tag: Option<TagName>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/questions", rejection(ServerError))]
struct QuestionsPath();

async fn list_questions(
    _: QuestionsPath,
    Query(ListQuestionsQuery { tag }): Query<ListQuestionsQuery>,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<Question>>> {
    let questions = store.list_questions(tag.as_ref()).await?;

    Ok(Json(questions))
}

async fn create_question(
    _: QuestionsPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    Json(question): Json<CreateQuestion>,
) -> Result<Created<Question>> {
    let question = store
        .create_question(user.username(), question.validated()?)
        .await?;
    info!(id = %question.id, asked_by = %question.asked_by, "Question asked");

    Ok(Created(question))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/questions/{id}", rejection(ServerError))]
struct QuestionPath {
    id: Id<QuestionMarker>,
}

async fn get_question(
    QuestionPath { id }: QuestionPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<QuestionWithAnswers>> {
    let question = store
        .view_question(id)
        .await?
        .ok_or(ServerError::QuestionNotFound(id))?;
    let answers = store.list_answers(id).await?;

    Ok(Json(QuestionWithAnswers { question, answers }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/questions/{id}/answers", rejection(ServerError))]
struct AnswersPath {
    id: Id<QuestionMarker>,
}

async fn create_answer(
    AnswersPath { id }: AnswersPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    Json(answer): Json<CreateAnswer>,
) -> Result<Created<Answer>> {
    let answer = store
        .create_answer(id, user.username(), answer.resolve()?)
        .await?
        .ok_or(ServerError::QuestionNotFound(id))?;
    info!(
        id = %answer.id,
        question = %id,
        cameras = answer.camera_references.len(),
        "Question answered"
    );

    Ok(Created(answer))
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    async fn ask(app: &TestApp, token: &str, title: &str, tags: Value) -> Value {
        let (status, question) = app
            .send(
                Method::POST,
                "/questions",
                Some(token),
                Some(json!({ "title": title, "text": "How?", "tags": tags })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{question}");
        question
    }

    fn camera(label: &str) -> Value {
        json!({ "label": label, "position": [0.0, 1.0, 2.0], "target": [0.0, 0.0, 0.0], "fov": 50.0 })
    }

    #[tokio::test]
    async fn questions_are_tagged_and_filtered() {
        let app = TestApp::new();
        let alice = app.signup("alice").await;

        let first = ask(&app, &alice, "UV seams", json!(["Blender", "uv"])).await;
        assert_eq!(first["tags"], json!(["blender", "uv"]));
        assert_eq!(first["askedBy"], "alice");
        assert_eq!(first["views"], 0);
        ask(&app, &alice, "Retopology", json!(["blender"])).await;
        ask(&app, &alice, "Baking", json!(["substance"])).await;

        let (_, blender) = app
            .send(Method::GET, "/questions?tag=blender", None, None)
            .await;
        let titles: Vec<_> = blender
            .as_array()
            .unwrap()
            .iter()
            .map(|question| question["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Retopology", "UV seams"]);

        let (_, all) = app.send(Method::GET, "/questions", None, None).await;
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn tag_counts_are_bounded() {
        let app = TestApp::new();
        let alice = app.signup("alice").await;

        for tags in [json!([]), json!(["a", "b", "c", "d", "e", "f"]), json!(["two words"])] {
            let (status, _) = app
                .send(
                    Method::POST,
                    "/questions",
                    Some(&alice),
                    Some(json!({ "title": "T", "text": "X", "tags": tags })),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn fetching_counts_views_and_includes_answers() {
        let app = TestApp::new();
        let alice = app.signup("alice").await;
        let bob = app.signup("bob").await;
        let question = ask(&app, &alice, "Normals", json!(["shading"])).await;
        let path = format!("/questions/{}", question["id"]);

        let (status, answer) = app
            .send(
                Method::POST,
                &format!("{path}/answers"),
                Some(&bob),
                Some(json!({ "text": "Recalculate them" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(answer["ansBy"], "bob");
        assert_eq!(answer["question"], question["id"]);

        app.send(Method::GET, &path, None, None).await;
        let (status, fetched) = app.send(Method::GET, &path, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["views"], 2);
        assert_eq!(fetched["answers"][0]["text"], "Recalculate them");
    }

    #[tokio::test]
    async fn answers_keep_only_mentioned_cameras() {
        let app = TestApp::new();
        let alice = app.signup("alice").await;
        let question = ask(&app, &alice, "Lighting", json!(["render"])).await;
        let path = format!("/questions/{}/answers", question["id"]);

        let (status, answer) = app
            .send(
                Method::POST,
                &path,
                Some(&alice),
                Some(json!({
                    "text": "See @camera(back) and then @camera(front)",
                    "cameras": [camera("front"), camera("unused"), camera("back")],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let labels: Vec<_> = answer["cameraReferences"]
            .as_array()
            .unwrap()
            .iter()
            .map(|reference| reference["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, ["back", "front"]);

        let (status, _) = app
            .send(
                Method::POST,
                &path,
                Some(&alice),
                Some(json!({ "text": "See @camera(missing)", "cameras": [camera("front")] })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_questions_are_not_found() {
        let app = TestApp::new();
        let alice = app.signup("alice").await;

        let (status, _) = app.send(Method::GET, "/questions/42", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                Method::POST,
                "/questions/42/answers",
                Some(&alice),
                Some(json!({ "text": "Hello" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

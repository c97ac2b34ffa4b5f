use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use librarr::config::Config;
use tower::ServiceExt;

const BOUNDARY: &str = "librarr-test-boundary";

async fn spawn_app() -> Router {
    let suffix = uuid::Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("librarr-test-{suffix}.db"));
    let uploads_dir = std::env::temp_dir().join(format!("librarr-test-uploads-{suffix}"));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.general.uploads_path = uploads_dir.display().to_string();

    let state = librarr::api::create_app_state_from_config(config)
        .await
        .expect("failed to create app state");
    librarr::api::router(state).await
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn book_form_request(method: &str, uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn login(app: &Router, email: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            serde_json::json!({ "email": email }),
        ))
        .await
        .unwrap();
    assert!(
        response.status() == StatusCode::OK || response.status() == StatusCode::CREATED,
        "unexpected login status: {}",
        response.status()
    );
    read_json(response).await["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_login_is_get_or_create() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/login", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "Email is required");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            serde_json::json!({ "email": "a@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = read_json(response).await;
    assert_eq!(first["email"], "a@x.com");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            serde_json::json!({ "email": "a@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second = read_json(response).await;
    assert_eq!(second["id"], first["id"]);

    let other = login(&app, "b@x.com").await;
    assert_ne!(other, first["id"].as_i64().unwrap());
}

#[tokio::test]
async fn test_list_requires_author_id() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/libros").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "Author ID is required");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/libros?authorId=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_unknown_author_is_empty() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/libros?authorId=999999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_create_and_fetch_roundtrip() {
    let app = spawn_app().await;
    let author_id = login(&app, "roundtrip@x.com").await;
    let author_id_str = author_id.to_string();

    let response = app
        .clone()
        .oneshot(book_form_request(
            "POST",
            "/libros",
            &[
                ("title", "Dune"),
                ("author", "Frank Herbert"),
                ("genre", "Science Fiction"),
                ("rating", "5"),
                ("authorId", &author_id_str),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    assert_eq!(created["title"], "Dune");
    assert_eq!(created["author"], "Frank Herbert");
    assert_eq!(created["genre"], "Science Fiction");
    assert_eq!(created["rating"], 5);
    assert_eq!(created["authorId"], author_id);
    assert!(created["coverImage"].is_null());

    let id = created["id"].as_i64().unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/libros/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = read_json(response).await;
    assert_eq!(fetched["title"], created["title"]);
    assert_eq!(fetched["author"], created["author"]);
    assert_eq!(fetched["genre"], created["genre"]);
    assert_eq!(fetched["rating"], created["rating"]);
    assert!(fetched["coverImage"].is_null());
}

#[tokio::test]
async fn test_create_requires_title_author_and_owner() {
    let app = spawn_app().await;
    let author_id = login(&app, "required@x.com").await;
    let author_id_str = author_id.to_string();

    let response = app
        .clone()
        .oneshot(book_form_request(
            "POST",
            "/libros",
            &[("title", "Dune"), ("authorId", &author_id_str)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await["error"],
        "Title, author, and authorId are required"
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/libros?authorId={author_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(read_json(response).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_rejects_out_of_range_rating() {
    let app = spawn_app().await;
    let author_id = login(&app, "rating@x.com").await;
    let author_id_str = author_id.to_string();

    let response = app
        .clone()
        .oneshot(book_form_request(
            "POST",
            "/libros",
            &[
                ("title", "Dune"),
                ("author", "Frank Herbert"),
                ("rating", "6"),
                ("authorId", &author_id_str),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await["error"],
        "Rating must be between 1 and 5"
    );

    // No row was inserted.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/libros?authorId={author_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(read_json(response).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_update_rejects_out_of_range_rating() {
    let app = spawn_app().await;
    let author_id = login(&app, "update-rating@x.com").await;
    let author_id_str = author_id.to_string();

    let response = app
        .clone()
        .oneshot(book_form_request(
            "POST",
            "/libros",
            &[
                ("title", "Dune"),
                ("author", "Frank Herbert"),
                ("rating", "4"),
                ("authorId", &author_id_str),
            ],
        ))
        .await
        .unwrap();
    let id = read_json(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(book_form_request(
            "PUT",
            &format!("/libros/{id}"),
            &[
                ("title", "Dune"),
                ("author", "Frank Herbert"),
                ("rating", "0"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/libros/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(read_json(response).await["rating"], 4);
}

#[tokio::test]
async fn test_get_missing_book_returns_404() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/libros/999999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["error"], "Book not found");
}

#[tokio::test]
async fn test_update_requires_title_and_author() {
    let app = spawn_app().await;
    let author_id = login(&app, "update-required@x.com").await;
    let author_id_str = author_id.to_string();

    let response = app
        .clone()
        .oneshot(book_form_request(
            "POST",
            "/libros",
            &[
                ("title", "Dune"),
                ("author", "Frank Herbert"),
                ("authorId", &author_id_str),
            ],
        ))
        .await
        .unwrap();
    let id = read_json(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(book_form_request(
            "PUT",
            &format!("/libros/{id}"),
            &[("title", "Dune Messiah")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await["error"],
        "Title and author are required"
    );
}

#[tokio::test]
async fn test_update_missing_book_returns_404() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(book_form_request(
            "PUT",
            "/libros/999999",
            &[("title", "Dune"), ("author", "Frank Herbert")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["error"], "Book not found");
}

#[tokio::test]
async fn test_update_roundtrip() {
    let app = spawn_app().await;
    let author_id = login(&app, "update@x.com").await;
    let author_id_str = author_id.to_string();

    let response = app
        .clone()
        .oneshot(book_form_request(
            "POST",
            "/libros",
            &[
                ("title", "Dune"),
                ("author", "Frank Herbert"),
                ("genre", "Science Fiction"),
                ("rating", "4"),
                ("authorId", &author_id_str),
            ],
        ))
        .await
        .unwrap();
    let id = read_json(response).await["id"].as_i64().unwrap();

    // Genre and rating are resubmitted wholesale: leaving them out clears them.
    let response = app
        .clone()
        .oneshot(book_form_request(
            "PUT",
            &format!("/libros/{id}"),
            &[("title", "Dune Messiah"), ("author", "Frank Herbert")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["title"], "Dune Messiah");
    assert!(updated["genre"].is_null());
    assert!(updated["rating"].is_null());
    assert_eq!(updated["authorId"], author_id);
}

#[tokio::test]
async fn test_delete_book() {
    let app = spawn_app().await;
    let author_id = login(&app, "delete@x.com").await;
    let author_id_str = author_id.to_string();

    let response = app
        .clone()
        .oneshot(book_form_request(
            "POST",
            "/libros",
            &[
                ("title", "Dune"),
                ("author", "Frank Herbert"),
                ("authorId", &author_id_str),
            ],
        ))
        .await
        .unwrap();
    let id = read_json(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/libros/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await["message"],
        "Book deleted successfully"
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/libros/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/libros/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_is_scoped_to_author() {
    let app = spawn_app().await;
    let first = login(&app, "first@x.com").await;
    let second = login(&app, "second@x.com").await;
    let first_str = first.to_string();
    let second_str = second.to_string();

    for (title, owner) in [("Dune", &first_str), ("Neuromancer", &second_str)] {
        let response = app
            .clone()
            .oneshot(book_form_request(
                "POST",
                "/libros",
                &[("title", title), ("author", "Somebody"), ("authorId", owner)],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/libros?authorId={first}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let books = read_json(response).await;
    let books = books.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Dune");
    assert_eq!(books[0]["authorId"], first);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/libros?authorId={second}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let books = read_json(response).await;
    let books = books.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Neuromancer");
}

#[tokio::test]
async fn test_seed_data_is_present_once() {
    let app = spawn_app().await;

    // Seeded author from first startup; logging in returns it rather than
    // creating a duplicate.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            serde_json::json!({ "email": "test@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let author = read_json(response).await;
    let author_id = author["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/libros?authorId={author_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let books = read_json(response).await;
    assert_eq!(books.as_array().unwrap().len(), 2);
}

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use lending_library::adapters::http::SERVER_KEY_HEADER;
use lending_library::adapters::mock::{TokenVerifier, WriteFailure};
use lending_library::api::handlers::AppState;
use lending_library::api::router::{create_book_router, create_category_router};
use lending_library::api::types::*;
use lending_library::api::{CategoryAppState, ServerKey};
use lending_library::domain::{AuthorId, UserId};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

mod common;

use common::Library;

const TOKEN: &str = "valid-token";
const SERVER_KEY: &str = "shared-secret";

// ============================================================================
// E2Eテスト用のヘルパー関数
// ============================================================================

/// 書籍サービスのルーターを組み立てる
///
/// インメモリのアダプターと実際のAPIルーターを使用します。
/// ライブラリのハンドルはテスト側で状態確認や故障注入に使います。
fn setup_book_app() -> (axum::Router, Library, UserId) {
    let library = Library::new();

    let token_verifier = Arc::new(TokenVerifier::new());
    let user_id = UserId::new();
    token_verifier.add_token(TOKEN, user_id);

    let app_state = Arc::new(AppState {
        service_deps: library.deps.clone(),
        token_verifier,
    });

    (create_book_router(app_state), library, user_id)
}

fn setup_category_app(library: &Library) -> axum::Router {
    let state = Arc::new(CategoryAppState {
        service_deps: library.category_deps(),
    });
    create_category_router(state, ServerKey(Arc::from(SERVER_KEY)))
}

fn authorized(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(header::CONTENT_TYPE, "application/json")
}

fn server_call(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(SERVER_KEY_HEADER, SERVER_KEY)
        .header(header::CONTENT_TYPE, "application/json")
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn book_request(author_id: AuthorId, total_copies: i32, category_ids: &[Uuid]) -> serde_json::Value {
    json!({
        "title": "A Wizard of Earthsea",
        "author_id": author_id.value(),
        "isbn": "978-0547773742",
        "publication_year": 1968,
        "publisher": "Parnassus Press",
        "total_copies": total_copies,
        "category_ids": category_ids,
    })
}

async fn create_book_via_api(app: &axum::Router, body: serde_json::Value) -> BookResponse {
    let response = app
        .clone()
        .oneshot(
            authorized("POST", "/books")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

// ============================================================================
// 認証
// ============================================================================

#[tokio::test]
async fn test_e2e_missing_token_is_unauthorized() {
    let (app, _library, _) = setup_book_app();

    let response = app
        .oneshot(Request::builder().uri("/books").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_e2e_invalid_token_is_unauthorized() {
    let (app, _library, _) = setup_book_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/books")
                .header(header::AUTHORIZATION, "Bearer forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_e2e_health_check_needs_no_token() {
    let (app, _library, _) = setup_book_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// 書籍サービス
// ============================================================================

#[tokio::test]
async fn test_e2e_create_and_get_book() {
    // Arrange
    let (app, library, _) = setup_book_app();
    let author_id = library.authors.add_author("Ursula K. Le Guin");
    let fantasy = library.add_category("Fantasy").await;

    // Act
    let created = create_book_via_api(&app, book_request(author_id, 2, &[fantasy.id.value()])).await;

    let response = app
        .clone()
        .oneshot(
            authorized("GET", &format!("/books/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let book: BookResponse = read_json(response).await;
    assert_eq!(book.title, "A Wizard of Earthsea");
    assert_eq!(book.author.name, "Ursula K. Le Guin");
    assert_eq!(book.available_copies, 2);
    assert_eq!(book.categories.len(), 1);
    assert_eq!(book.categories[0].name, "Fantasy");
}

#[tokio::test]
async fn test_e2e_get_unknown_book_is_not_found() {
    let (app, _library, _) = setup_book_app();

    let response = app
        .oneshot(
            authorized("GET", &format!("/books/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "BOOK_NOT_FOUND");
}

#[tokio::test]
async fn test_e2e_invalid_book_is_unprocessable() {
    let (app, library, _) = setup_book_app();
    let author_id = library.authors.add_author("Anonymous");

    let response = app
        .oneshot(
            authorized("POST", "/books")
                .body(Body::from(book_request(author_id, -3, &[]).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_e2e_category_failure_is_internal_error_and_book_absent() {
    // Arrange
    let (app, library, _) = setup_book_app();
    let author_id = library.authors.add_author("Anonymous");
    library.category_client.fail_writes(WriteFailure::BeforeApply);

    // Act
    let response = app
        .clone()
        .oneshot(
            authorized("POST", "/books")
                .body(Body::from(book_request(author_id, 1, &[]).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "INTERNAL_ERROR");

    let list = app
        .oneshot(authorized("GET", "/books").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let page: BookListResponse = read_json(list).await;
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_e2e_borrow_return_flow() {
    // Arrange
    let (app, library, user_id) = setup_book_app();
    let author_id = library.authors.add_author("Anonymous");
    let created = create_book_via_api(&app, book_request(author_id, 1, &[])).await;

    // Act 1: 貸出
    let response = app
        .clone()
        .oneshot(
            authorized("POST", &format!("/books/{}/borrow", created.id))
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let borrowed: BorrowBookResponse = read_json(response).await;
    assert!(borrowed.success);

    // Act 2: 在庫切れでの貸出は412
    let response = app
        .clone()
        .oneshot(
            authorized("POST", &format!("/books/{}/borrow", created.id))
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "NO_AVAILABLE_COPIES");

    // Act 3: 返却
    let response = app
        .clone()
        .oneshot(
            authorized("POST", &format!("/books/{}/return", created.id))
                .body(Body::from(
                    json!({ "transaction_id": borrowed.transaction_id }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Act 4: 全冊が棚にある状態での返却は412
    let response = app
        .clone()
        .oneshot(
            authorized("POST", &format!("/books/{}/return", created.id))
                .body(Body::from(
                    json!({ "transaction_id": borrowed.transaction_id }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

    // Assert: 履歴は認証済みユーザーの貸出と返却の2件
    let response = app
        .oneshot(
            authorized("GET", &format!("/books/{}/history", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let history: LendingHistoryResponse = read_json(response).await;
    let kinds: Vec<_> = history.items.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, vec!["borrow", "return"]);
    assert!(history.items.iter().all(|e| e.user_id == user_id.value()));
    assert_eq!(history.items[0].transaction_id, borrowed.transaction_id);
}

#[tokio::test]
async fn test_e2e_borrow_on_behalf_of_user() {
    let (app, library, _) = setup_book_app();
    let author_id = library.authors.add_author("Anonymous");
    let created = create_book_via_api(&app, book_request(author_id, 1, &[])).await;
    let member = Uuid::new_v4();

    app.clone()
        .oneshot(
            authorized("POST", &format!("/books/{}/borrow", created.id))
                .body(Body::from(json!({ "user_id": member }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            authorized("GET", &format!("/books/{}/history", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let history: LendingHistoryResponse = read_json(response).await;
    assert_eq!(history.items.len(), 1);
    assert_eq!(history.items[0].user_id, member);
}

#[tokio::test]
async fn test_e2e_list_books_with_invalid_sort_is_bad_request() {
    let (app, _library, _) = setup_book_app();

    let response = app
        .oneshot(
            authorized("GET", "/books?sort_by=shelf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_e2e_list_books_with_huge_page_is_bad_request() {
    let (app, _library, _) = setup_book_app();

    let response = app
        .oneshot(
            authorized("GET", &format!("/books?page={}&page_size=10", i64::MAX))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_e2e_update_and_delete_book() {
    // Arrange
    let (app, library, _) = setup_book_app();
    let author_id = library.authors.add_author("Anonymous");
    let a = library.add_category("A").await;
    let b = library.add_category("B").await;
    let created = create_book_via_api(&app, book_request(author_id, 1, &[a.id.value()])).await;

    // Act 1: カテゴリを {B} に変更
    let response = app
        .clone()
        .oneshot(
            authorized("PUT", &format!("/books/{}", created.id))
                .body(Body::from(
                    book_request(author_id, 4, &[b.id.value()]).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: BookResponse = read_json(response).await;
    assert_eq!(updated.total_copies, 4);
    assert_eq!(updated.available_copies, 4);
    let names: Vec<_> = updated.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["B"]);

    // Act 2: 削除
    let response = app
        .clone()
        .oneshot(
            authorized("DELETE", &format!("/books/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Assert
    assert_eq!(library.categories.edge_count(), 0);
    let response = app
        .oneshot(
            authorized("GET", &format!("/books/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_e2e_recommendations() {
    // Arrange
    let (app, library, _) = setup_book_app();
    let author_id = library.authors.add_author("Anonymous");
    let target = create_book_via_api(&app, book_request(author_id, 1, &[])).await;
    let sibling = create_book_via_api(&app, book_request(author_id, 1, &[])).await;

    // Act
    let response = app
        .oneshot(
            authorized("GET", &format!("/books/{}/recommendations?limit=5", target.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let recommended: RecommendationsResponse = read_json(response).await;
    assert_eq!(recommended.items.len(), 1);
    assert_eq!(recommended.items[0].book.id, sibling.id);
    assert_eq!(recommended.items[0].tier, 1);
}

// ============================================================================
// カテゴリサービス
// ============================================================================

#[tokio::test]
async fn test_e2e_category_service_requires_server_key() {
    let library = Library::new();
    let app = setup_category_app(&library);

    let missing = app
        .clone()
        .oneshot(Request::builder().uri("/categories").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let wrong = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/categories")
                .header(SERVER_KEY_HEADER, "guess")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_e2e_category_crud_and_reconcile() {
    // Arrange
    let library = Library::new();
    let app = setup_category_app(&library);

    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        let response = app
            .clone()
            .oneshot(
                server_call("POST", "/categories")
                    .body(Body::from(json!({ "name": name }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: CategoryResponse = read_json(response).await;
        ids.push(created.id);
    }
    let (a, b, c) = (ids[0], ids[1], ids[2]);
    let item = Uuid::new_v4();
    let path = format!("/items/book/{}/categories", item);

    // Act 1: 一括付与 {A, C}
    let response = app
        .clone()
        .oneshot(
            server_call("POST", &path)
                .body(Body::from(json!({ "category_ids": [a, c] }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Act 2: {A, B} へ照合
    let response = app
        .clone()
        .oneshot(
            server_call("PUT", &path)
                .body(Body::from(json!({ "category_ids": [a, b] }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let diff: ReconciliationResponse = read_json(response).await;
    assert_eq!(diff.added, vec![b]);
    assert_eq!(diff.removed, vec![c]);

    // Act 3: 逆引き
    let response = app
        .clone()
        .oneshot(
            server_call("POST", "/items/book/lookup")
                .body(Body::from(json!({ "category_ids": [b] }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let lookup: ItemIdsResponse = read_json(response).await;
    assert_eq!(lookup.item_ids, vec![item]);

    // Assert
    let response = app
        .oneshot(server_call("GET", &path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let current: ItemCategoriesResponse = read_json(response).await;
    let mut current_ids: Vec<_> = current.categories.iter().map(|c| c.id).collect();
    current_ids.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(current_ids, expected);
}

#[tokio::test]
async fn test_e2e_invalid_item_type_is_bad_request() {
    let library = Library::new();
    let app = setup_category_app(&library);

    let response = app
        .oneshot(
            server_call("GET", &format!("/items/Book!/{}/categories", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

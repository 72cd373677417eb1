use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod products;
pub mod pvz;
pub mod receptions;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/pvz", post(pvz::create_pvz).get(pvz::list_pvzs))
        .route("/pvz/:pvz_id/close_last_reception", post(receptions::close_last_reception))
        .route("/pvz/:pvz_id/delete_last_product", post(products::delete_last_product))
        .route("/receptions", post(receptions::open_reception))
        .route("/products", post(products::add_product))
}

/// Router for endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/dummyLogin", post(auth::dummy_login))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
}

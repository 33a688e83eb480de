// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

// Route tests for everything that does not reach the quote provider; the
// pricing paths are covered by the ledger unit tests, which take the
// execution price as an argument.

use papertrade::{db, web};
use warp::http::StatusCode;

const FORM: &str = "application/x-www-form-urlencoded";

fn make_state() -> (tempfile::TempDir, web::AppState) {
    let dir = tempfile::tempdir().unwrap();
    let conn = db::open_or_init_at(&dir.path().join("t.sqlite")).unwrap();
    (dir, web::AppState::new(conn).unwrap())
}

// warp's test bounds are not nameable from outside the crate, so the
// shared register step is a macro rather than a generic helper.
macro_rules! register {
    ($api:expr, $name:expr) => {{
        let res = warp::test::request()
            .method("POST")
            .path("/register")
            .header("content-type", FORM)
            .body(format!("username={}&password=pw1&confirmation=pw1", $name))
            .reply($api)
            .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let cookie = res
            .headers()
            .get("set-cookie")
            .expect("registration sets a session cookie")
            .to_str()
            .unwrap();
        cookie.split(';').next().unwrap().to_string()
    }};
}

#[tokio::test]
async fn unauthenticated_portfolio_redirects_to_login() {
    let (_dir, state) = make_state();
    let api = web::routes(state);

    let res = warp::test::request().method("GET").path("/").reply(&api).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers().get("location").unwrap(), "/login");
}

#[tokio::test]
async fn register_then_deposit_then_view_portfolio() {
    let (_dir, state) = make_state();
    let api = web::routes(state);
    let cookie = register!(&api, "alice");

    let res = warp::test::request()
        .method("POST")
        .path("/account")
        .header("content-type", FORM)
        .header("cookie", &cookie)
        .body("money=250.50")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers().get("location").unwrap(), "/");

    let res = warp::test::request()
        .method("GET")
        .path("/")
        .header("cookie", &cookie)
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = String::from_utf8_lossy(res.body());
    assert!(body.contains("$10250.50"), "portfolio should show new cash");
    assert_eq!(
        res.headers().get("cache-control").unwrap(),
        "no-cache, no-store, must-revalidate"
    );
}

#[tokio::test]
async fn oversized_deposit_is_rejected_with_400() {
    let (_dir, state) = make_state();
    let api = web::routes(state);
    let cookie = register!(&api, "alice");

    let res = warp::test::request()
        .method("POST")
        .path("/account")
        .header("content-type", FORM)
        .header("cookie", &cookie)
        .body("money=100000.01")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = String::from_utf8_lossy(res.body());
    assert!(body.contains("limited to $100,000.00"));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let (_dir, state) = make_state();
    let api = web::routes(state);
    register!(&api, "alice");

    let res = warp::test::request()
        .method("POST")
        .path("/register")
        .header("content-type", FORM)
        .body("username=alice&password=other&confirmation=other")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = String::from_utf8_lossy(res.body());
    assert!(body.contains("Username already taken"));
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_accepts_good_ones() {
    let (_dir, state) = make_state();
    let api = web::routes(state);
    register!(&api, "alice");

    let res = warp::test::request()
        .method("POST")
        .path("/login")
        .header("content-type", FORM)
        .body("username=alice&password=wrong")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = warp::test::request()
        .method("POST")
        .path("/login")
        .header("content-type", FORM)
        .body("username=alice&password=pw1")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(res.headers().get("set-cookie").is_some());
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let (_dir, state) = make_state();
    let api = web::routes(state);
    let cookie = register!(&api, "alice");

    let res = warp::test::request()
        .method("GET")
        .path("/logout")
        .header("cookie", &cookie)
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers().get("location").unwrap(), "/login");
    let cleared = res.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn history_page_and_csv_render_for_fresh_user() {
    let (_dir, state) = make_state();
    let api = web::routes(state);
    let cookie = register!(&api, "alice");

    let res = warp::test::request()
        .method("GET")
        .path("/history")
        .header("cookie", &cookie)
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = warp::test::request()
        .method("GET")
        .path("/history.csv")
        .header("cookie", &cookie)
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("content-type").unwrap(), "text/csv");
    let body = String::from_utf8_lossy(res.body());
    assert!(body.starts_with("symbol,type,shares,price,time,amount"));
}

#[tokio::test]
async fn unknown_path_falls_through_to_a_404_apology() {
    let (_dir, state) = make_state();
    let api = web::routes(state);

    let res = warp::test::request()
        .method("GET")
        .path("/no-such-page")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = String::from_utf8_lossy(res.body());
    assert!(body.contains("Page not found"));
}

#[tokio::test]
async fn tampered_session_cookie_is_treated_as_logged_out() {
    let (_dir, state) = make_state();
    let api = web::routes(state);
    let cookie = register!(&api, "alice");
    let forged = format!("{}x", cookie);

    let res = warp::test::request()
        .method("GET")
        .path("/history")
        .header("cookie", &forged)
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers().get("location").unwrap(), "/login");
}

// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! HTTP surface: warp filters, session-cookie auth, and handlers for the
//! portfolio, trading, and account routes. All accounting goes through
//! `ledger`; handlers only fetch quotes, parse forms, and render.

use crate::error::{AppError, AppResult};
use crate::models::Quote;
use crate::{auth, ledger, quotes, render, utils};
use log::{error, info, warn};
use rusqlite::Connection;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

type Form = HashMap<String, String>;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    client: reqwest::Client,
    secret: Arc<Vec<u8>>,
}

impl AppState {
    pub fn new(conn: Connection) -> anyhow::Result<AppState> {
        Ok(AppState {
            db: Arc::new(Mutex::new(conn)),
            client: utils::http_client()?,
            secret: Arc::new(auth::session_secret()),
        })
    }
}

/// Rejection for requests without a valid session; recovered as a redirect
/// to the login page.
#[derive(Debug)]
struct RequireLogin;

impl warp::reject::Reject for RequireLogin {}

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn authed(state: AppState) -> impl Filter<Extract = (i64,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>("session")
        .and(with_state(state))
        .and_then(|cookie: Option<String>, state: AppState| async move {
            match cookie.and_then(|c| auth::verify_token(&state.secret, &c)) {
                Some(uid) => Ok(uid),
                None => Err(warp::reject::custom(RequireLogin)),
            }
        })
}

fn reject(e: AppError) -> Rejection {
    warp::reject::custom(e)
}

fn internal<E: std::error::Error + Send + Sync + 'static>(e: E) -> Rejection {
    reject(AppError::Internal(anyhow::Error::new(e)))
}

fn field<'a>(form: &'a Form, name: &str) -> &'a str {
    form.get(name).map(String::as_str).unwrap_or("").trim()
}

fn see_other(location: &'static str) -> impl Reply {
    warp::reply::with_header(
        warp::reply::with_status(warp::reply::html(String::new()), StatusCode::SEE_OTHER),
        "location",
        location,
    )
}

fn session_cookie(token: &str) -> String {
    format!(
        "session={}; HttpOnly; Path=/; Max-Age={}",
        token,
        auth::SESSION_TTL_SECS
    )
}

async fn fetch_prices(state: &AppState, held: &[(String, i64)]) -> HashMap<String, rust_decimal::Decimal> {
    let mut prices = HashMap::new();
    for (symbol, _) in held {
        match quotes::lookup(&state.client, symbol).await {
            Some(q) => {
                prices.insert(symbol.clone(), q.price);
            }
            None => warn!("No quote for held symbol {}", symbol),
        }
    }
    prices
}

async fn resolve_symbol(state: &AppState, symbol: &str) -> AppResult<Quote> {
    quotes::lookup(&state.client, symbol).await.ok_or_else(|| {
        AppError::NotFound("Stock field left empty or symbol doesn't exist".into())
    })
}

async fn index_handler(uid: i64, state: AppState) -> Result<impl Reply, Rejection> {
    let held = {
        let conn = state.db.lock().await;
        ledger::holdings(&conn, uid).map_err(reject)?
    };
    let prices = fetch_prices(&state, &held).await;
    let view = {
        let conn = state.db.lock().await;
        ledger::portfolio(&conn, uid, &prices).map_err(reject)?
    };
    Ok(warp::reply::html(render::portfolio(&view)))
}

async fn account_post(uid: i64, state: AppState, form: Form) -> Result<impl Reply, Rejection> {
    let amount = utils::parse_amount(field(&form, "money")).map_err(reject)?;
    let settlement = {
        let mut conn = state.db.lock().await;
        ledger::deposit(&mut conn, uid, amount).map_err(reject)?
    };
    info!(
        "User {} deposited {} (cash now {})",
        uid, settlement.amount, settlement.cash_after
    );
    Ok(see_other("/"))
}

async fn buy_post(uid: i64, state: AppState, form: Form) -> Result<impl Reply, Rejection> {
    let quote = resolve_symbol(&state, field(&form, "symbol"))
        .await
        .map_err(reject)?;
    let shares = utils::parse_shares(field(&form, "shares")).map_err(reject)?;
    let settlement = {
        let mut conn = state.db.lock().await;
        ledger::buy(&mut conn, uid, &quote.symbol, quote.price, shares).map_err(reject)?
    };
    info!(
        "User {} bought {} x {} @ {} (cash now {})",
        uid, settlement.shares, quote.symbol, settlement.price, settlement.cash_after
    );
    Ok(see_other("/"))
}

async fn sell_form_handler(uid: i64, state: AppState) -> Result<impl Reply, Rejection> {
    let held = {
        let conn = state.db.lock().await;
        ledger::holdings(&conn, uid).map_err(reject)?
    };
    Ok(warp::reply::html(render::sell_form(&held)))
}

async fn sell_post(uid: i64, state: AppState, form: Form) -> Result<impl Reply, Rejection> {
    let quote = resolve_symbol(&state, field(&form, "symbol"))
        .await
        .map_err(reject)?;
    let shares = utils::parse_shares(field(&form, "shares")).map_err(reject)?;
    let settlement = {
        let mut conn = state.db.lock().await;
        ledger::sell(&mut conn, uid, &quote.symbol, quote.price, shares).map_err(reject)?
    };
    info!(
        "User {} sold {} x {} @ {} (cash now {})",
        uid,
        settlement.shares.abs(),
        quote.symbol,
        settlement.price,
        settlement.cash_after
    );
    Ok(see_other("/"))
}

async fn quote_post(_uid: i64, state: AppState, form: Form) -> Result<impl Reply, Rejection> {
    let symbol = field(&form, "symbol");
    let quote = quotes::lookup(&state.client, symbol)
        .await
        .ok_or_else(|| reject(AppError::NotFound("Stock doesn't exist".into())))?;
    Ok(warp::reply::html(render::quoted(&quote)))
}

async fn history_handler(uid: i64, state: AppState) -> Result<impl Reply, Rejection> {
    let rows = {
        let conn = state.db.lock().await;
        ledger::history(&conn, uid).map_err(reject)?
    };
    Ok(warp::reply::html(render::history(&rows)))
}

async fn history_csv_handler(uid: i64, state: AppState) -> Result<impl Reply, Rejection> {
    let rows = {
        let conn = state.db.lock().await;
        ledger::history(&conn, uid).map_err(reject)?
    };
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["symbol", "type", "shares", "price", "time", "amount"])
        .map_err(internal)?;
    for r in &rows {
        wtr.write_record([
            r.symbol.as_str(),
            r.kind.as_str(),
            &r.shares.to_string(),
            &r.price.to_string(),
            &r.time.to_rfc3339(),
            &r.transaction_price.to_string(),
        ])
        .map_err(internal)?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| reject(AppError::Internal(anyhow::anyhow!("csv flush: {}", e))))?;
    let body = String::from_utf8(data).map_err(internal)?;
    Ok(warp::reply::with_header(
        warp::reply::with_header(body, "content-type", "text/csv"),
        "content-disposition",
        "attachment; filename=\"history.csv\"",
    ))
}

async fn register_post(state: AppState, form: Form) -> Result<impl Reply, Rejection> {
    let token = {
        let conn = state.db.lock().await;
        let uid = auth::register(
            &conn,
            field(&form, "username"),
            field(&form, "password"),
            field(&form, "confirmation"),
        )
        .map_err(reject)?;
        info!("Registered user {} ({})", field(&form, "username"), uid);
        auth::issue_token(&state.secret, uid).map_err(reject)?
    };
    Ok(warp::reply::with_header(
        see_other("/"),
        "set-cookie",
        session_cookie(&token),
    ))
}

async fn login_post(state: AppState, form: Form) -> Result<impl Reply, Rejection> {
    let token = {
        let conn = state.db.lock().await;
        let uid = auth::login(&conn, field(&form, "username"), field(&form, "password"))
            .map_err(reject)?;
        info!("User {} logged in", uid);
        auth::issue_token(&state.secret, uid).map_err(reject)?
    };
    Ok(warp::reply::with_header(
        see_other("/"),
        "set-cookie",
        session_cookie(&token),
    ))
}

async fn logout_handler() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::with_header(
        see_other("/login"),
        "set-cookie",
        "session=; HttpOnly; Path=/; Max-Age=0",
    ))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if err.find::<RequireLogin>().is_some() {
        return Ok(see_other("/login").into_response());
    }
    if let Some(app) = err.find::<AppError>() {
        let status = app.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error: {}", app);
            return Ok(warp::reply::with_status(
                warp::reply::html(render::apology("Something went wrong")),
                status,
            )
            .into_response());
        }
        return Ok(warp::reply::with_status(
            warp::reply::html(render::apology(&app.to_string())),
            status,
        )
        .into_response());
    }
    if err.is_not_found() {
        return Ok(warp::reply::with_status(
            warp::reply::html(render::apology("Page not found")),
            StatusCode::NOT_FOUND,
        )
        .into_response());
    }
    if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        return Ok(warp::reply::with_status(
            warp::reply::html(render::apology("Malformed form submission")),
            StatusCode::BAD_REQUEST,
        )
        .into_response());
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(warp::reply::with_status(
            warp::reply::html(render::apology("Method not allowed")),
            StatusCode::METHOD_NOT_ALLOWED,
        )
        .into_response());
    }
    error!("Unhandled rejection: {:?}", err);
    Ok(warp::reply::with_status(
        warp::reply::html(render::apology("Something went wrong")),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .into_response())
}

pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = std::convert::Infallible> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(authed(state.clone()))
        .and(with_state(state.clone()))
        .and_then(index_handler);

    let account_form = warp::path!("account")
        .and(warp::get())
        .and(authed(state.clone()))
        .map(|_uid| warp::reply::html(render::account_form()));

    let account = warp::path!("account")
        .and(warp::post())
        .and(authed(state.clone()))
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(account_post);

    let buy_form = warp::path!("buy")
        .and(warp::get())
        .and(authed(state.clone()))
        .map(|_uid| warp::reply::html(render::buy_form()));

    let buy = warp::path!("buy")
        .and(warp::post())
        .and(authed(state.clone()))
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(buy_post);

    let sell_form = warp::path!("sell")
        .and(warp::get())
        .and(authed(state.clone()))
        .and(with_state(state.clone()))
        .and_then(sell_form_handler);

    let sell = warp::path!("sell")
        .and(warp::post())
        .and(authed(state.clone()))
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(sell_post);

    let quote_form = warp::path!("quote")
        .and(warp::get())
        .and(authed(state.clone()))
        .map(|_uid| warp::reply::html(render::quote_form()));

    let quote = warp::path!("quote")
        .and(warp::post())
        .and(authed(state.clone()))
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(quote_post);

    let history = warp::path!("history")
        .and(warp::get())
        .and(authed(state.clone()))
        .and(with_state(state.clone()))
        .and_then(history_handler);

    let history_csv = warp::path!("history.csv")
        .and(warp::get())
        .and(authed(state.clone()))
        .and(with_state(state.clone()))
        .and_then(history_csv_handler);

    let register_form = warp::path!("register")
        .and(warp::get())
        .map(|| warp::reply::html(render::register_form()));

    let register = warp::path!("register")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(register_post);

    let login_form = warp::path!("login")
        .and(warp::get())
        .map(|| warp::reply::html(render::login_form()));

    let login = warp::path!("login")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(login_post);

    let logout = warp::path!("logout").and(warp::get()).and_then(logout_handler);

    index
        .or(account_form)
        .or(account)
        .or(buy_form)
        .or(buy)
        .or(sell_form)
        .or(sell)
        .or(quote_form)
        .or(quote)
        .or(history)
        .or(history_csv)
        .or(register_form)
        .or(register)
        .or(login_form)
        .or(login)
        .or(logout)
        .recover(handle_rejection)
        // Portfolio pages show live-ish prices; never let them cache.
        .with(warp::reply::with::header(
            "cache-control",
            "no-cache, no-store, must-revalidate",
        ))
}

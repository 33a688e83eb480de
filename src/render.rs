// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Plain-string HTML rendering for the form/table pages. Deliberately small;
//! no template engine.

use crate::models::{HistoryRow, PortfolioView, Quote};
use rust_decimal::Decimal;

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn usd(d: Decimal) -> String {
    format!("${:.2}", d)
}

pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>papertrade: {title}</title></head>
<body>
<nav><a href="/">Portfolio</a> | <a href="/quote">Quote</a> | <a href="/buy">Buy</a> | <a href="/sell">Sell</a> | <a href="/history">History</a> | <a href="/account">Add Cash</a> | <a href="/logout">Log Out</a></nav>
<hr>
{body}
</body>
</html>"#,
        title = escape(title),
        body = body
    )
}

fn bare_page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>papertrade: {title}</title></head>
<body>
{body}
</body>
</html>"#,
        title = escape(title),
        body = body
    )
}

pub fn apology(message: &str) -> String {
    bare_page(
        "error",
        &format!(
            "<h1>Sorry</h1><p>{}</p><p><a href=\"/\">Back</a></p>",
            escape(message)
        ),
    )
}

pub fn portfolio(view: &PortfolioView) -> String {
    let mut rows = String::new();
    for h in &view.holdings {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&h.symbol),
            h.quantity,
            usd(h.price),
            usd(h.value)
        ));
    }
    page(
        "portfolio",
        &format!(
            r#"<h1>Portfolio</h1>
<table border="1">
<tr><th>Symbol</th><th>Shares</th><th>Price</th><th>Value</th></tr>
{rows}
</table>
<p>Cash: {cash}</p>
<p>Total: {total}</p>"#,
            rows = rows,
            cash = usd(view.cash),
            total = usd(view.total)
        ),
    )
}

pub fn quote_form() -> String {
    page(
        "quote",
        r#"<h1>Get Quote</h1>
<form action="/quote" method="post">
<input name="symbol" placeholder="Symbol" autofocus>
<button type="submit">Quote</button>
</form>"#,
    )
}

pub fn quoted(q: &Quote) -> String {
    page(
        "quoted",
        &format!(
            "<h1>Quote</h1><p>{} ({}): {}</p>",
            escape(&q.name),
            escape(&q.symbol),
            usd(q.price)
        ),
    )
}

pub fn buy_form() -> String {
    page(
        "buy",
        r#"<h1>Buy</h1>
<form action="/buy" method="post">
<input name="symbol" placeholder="Symbol" autofocus>
<input name="shares" placeholder="Shares" type="number" min="1">
<button type="submit">Buy</button>
</form>"#,
    )
}

pub fn sell_form(held: &[(String, i64)]) -> String {
    let mut options = String::new();
    for (symbol, qty) in held {
        options.push_str(&format!(
            "<option value=\"{0}\">{0} ({1} shares)</option>",
            escape(symbol),
            qty
        ));
    }
    page(
        "sell",
        &format!(
            r#"<h1>Sell</h1>
<form action="/sell" method="post">
<select name="symbol">{options}</select>
<input name="shares" placeholder="Shares" type="number" min="1">
<button type="submit">Sell</button>
</form>"#,
            options = options
        ),
    )
}

pub fn account_form() -> String {
    page(
        "add cash",
        r#"<h1>Add Cash</h1>
<form action="/account" method="post">
<input name="money" placeholder="Amount" autofocus>
<button type="submit">Deposit</button>
</form>
<p>Between $1.00 and $100,000.00 per transfer.</p>"#,
    )
}

pub fn history(rows: &[HistoryRow]) -> String {
    let mut body = String::new();
    for r in rows {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&r.symbol),
            r.kind.as_str(),
            r.shares,
            usd(r.price),
            usd(r.transaction_price),
            r.time.to_rfc3339()
        ));
    }
    page(
        "history",
        &format!(
            r#"<h1>History</h1>
<p><a href="/history.csv">Download CSV</a></p>
<table border="1">
<tr><th>Symbol</th><th>Type</th><th>Shares</th><th>Price</th><th>Amount</th><th>Time</th></tr>
{body}
</table>"#,
            body = body
        ),
    )
}

pub fn login_form() -> String {
    bare_page(
        "log in",
        r#"<h1>Log In</h1>
<form action="/login" method="post">
<input name="username" placeholder="Username" autofocus>
<input name="password" placeholder="Password" type="password">
<button type="submit">Log In</button>
</form>
<p><a href="/register">Register</a></p>"#,
    )
}

pub fn register_form() -> String {
    bare_page(
        "register",
        r#"<h1>Register</h1>
<form action="/register" method="post">
<input name="username" placeholder="Username" autofocus>
<input name="password" placeholder="Password" type="password">
<input name="confirmation" placeholder="Confirm password" type="password">
<button type="submit">Register</button>
</form>
<p><a href="/login">Log in</a></p>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<b>"A&B"</b>"#),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn sell_form_lists_held_symbols() {
        let html = sell_form(&[("AAPL".to_string(), 30), ("MSFT".to_string(), 2)]);
        assert!(html.contains("AAPL (30 shares)"));
        assert!(html.contains("MSFT (2 shares)"));
    }
}

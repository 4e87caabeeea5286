//! HTML rendering for the status page.

use std::fmt::Write;

use nugu_oob_oauth::{Registration, TokenRecord};

/// Token fields shown in the status panel, in display order.
const TOKEN_FIELDS: [&str; 6] = [
    "access_token",
    "expires_at",
    "expires_in",
    "refresh_token",
    "token_type",
    "scope",
];

/// Message shown above the status panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Provider HTTP status, when the notice reports a provider failure.
    pub status: Option<u16>,
    pub message: String,
}

impl Notice {
    /// A provider call answered with a non-200 status.
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// A plain message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_notice(notice: &Notice) -> String {
    let heading = match notice.status {
        Some(status) => format!("Provider returned {}", status),
        None => "Notice".to_string(),
    };
    format!(
        r#"
        <fieldset class="notice">
            <legend>{}</legend>
            <p>{}</p>
        </fieldset>"#,
        escape_html(&heading),
        escape_html(&notice.message)
    )
}

fn render_token(token: &TokenRecord) -> String {
    let mut rows = String::new();
    for field in TOKEN_FIELDS {
        // Writing into a String cannot fail.
        let _ = write!(
            rows,
            r#"
                <tr>
                    <th>{field}</th>
                    <td width=100%><input style="width:100%;" type=text readonly name={field} value="{value}"/></td>
                </tr>"#,
            field = field,
            value = escape_html(&token.field(field)),
        );
    }

    format!(
        r#"
            <table width=100%>{rows}
            </table>
            <p align="center">
                <a href="/refresh">Refresh token</a>
                <form method=post action="/revoke" style="display:inline;"><input type=submit value="Revoke token"/></form>
                <a href="/logout">Logout</a>
            </p>"#
    )
}

const LOGIN_LINKS: &str = r#"
            <p align="center">
                <a href="/loginAuthorizationCode">Get OAuth2 token (authorization code)</a>
                |
                <a href="/loginClientCredentials">Get OAuth2 token (client credentials)</a>
            </p>
            <p align="center"><a href="/refresh">Refresh stored token</a></p>"#;

/// Render the status page with the registration form.
pub fn render_index(
    registration: &Registration,
    token: Option<&TokenRecord>,
    notice: Option<&Notice>,
) -> String {
    let notice_html = notice.map(render_notice).unwrap_or_default();
    let user_html = match token {
        Some(token) if token.access_token().is_some() => render_token(token),
        _ => LOGIN_LINKS.to_string(),
    };

    format!(
        r#"<!DOCTYPE HTML>
<html>
    <head>
        <meta charset="utf-8">
        <title>NUGU OOB setup</title>
    </head>
    <body>{notice_html}
        <fieldset>
            <legend>User</legend>{user_html}
        </fieldset>
        <form method=post action='/oauth'>
            <fieldset>
                <legend>OAuth2 information</legend>
                <table width=100%>
                    <tr>
                        <th>poc_id</th>
                        <td width=100%><input style="width:100%;" type=text name=pocId value="{poc_id}"/></td>
                    </tr>
                    <tr>
                        <th>client_id</th>
                        <td width=100%><input style="width:100%;" type=text name=clientId value="{client_id}"/></td>
                    </tr>
                    <tr>
                        <th>client_secret</th>
                        <td width=100%><input style="width:100%;" type=text name=clientSecret value="{client_secret}"/></td>
                    </tr>
                    <tr>
                        <th>device serial</th>
                        <td width=100%><input style="width:100%;" type=text name=serial value="{serial}"/></td>
                    </tr>
                    <tr>
                        <td colspan=2 align=center>
                            <a href="/">Reload</a> <input type=submit value="Save"/>
                        </td>
                    </tr>
                </table>
            </fieldset>
        </form>
    </body>
</html>"#,
        poc_id = escape_html(&registration.poc_id),
        client_id = escape_html(&registration.client_id),
        client_secret = escape_html(&registration.client_secret),
        serial = escape_html(&registration.device_serial_number),
    )
}

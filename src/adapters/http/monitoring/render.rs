//! Server-side HTML rendering of dashboard pages.
//!
//! Produces a complete document per request: a sidebar menu built from the
//! view registry, the view heading, its controls (refresh button, drill-down
//! form) and every page block in order. All text from the warehouse is
//! escaped.

use std::fmt::Write as _;

use crate::domain::monitoring::{
    DashboardPage, DrillDownOutcome, PageBlock, QueryResult, ViewId, ViewSummary,
};
use crate::ports::PageRenderer;

/// Renders pages as standalone HTML documents.
#[derive(Debug, Clone, Default)]
pub struct HtmlPageRenderer;

impl HtmlPageRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRenderer for HtmlPageRenderer {
    fn render_page(&self, menu: &[ViewSummary], page: &DashboardPage) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "<h1>{}</h1>", html_escape(&page.heading));
        let _ = writeln!(
            body,
            "<p class=\"meta\">{} &middot; rendered {}</p>",
            page.window.label(),
            page.rendered_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        if page.refreshable {
            let _ = writeln!(
                body,
                "<form method=\"post\" action=\"/views/{}/refresh\"><button type=\"submit\">Refresh</button></form>",
                page.view.id
            );
        }

        if let Some(prompt) = &page.drill_down_prompt {
            let _ = writeln!(
                body,
                "<form method=\"get\" action=\"/views/{}/drilldown\" class=\"drilldown\">\
                 <label for=\"query_id\">{}</label> \
                 <input id=\"query_id\" name=\"query_id\" type=\"text\" maxlength=\"128\"> \
                 <button type=\"submit\">Inspect</button></form>",
                page.view.id,
                html_escape(prompt)
            );
        }

        for block in &page.blocks {
            render_block(&mut body, block);
        }

        wrap_html(menu, Some(page.view.id), &page.view.title, &body)
    }

    fn render_error(&self, menu: &[ViewSummary], title: &str, message: &str) -> String {
        let body = format!(
            "<h1>{}</h1>\n<div class=\"error\">{}</div>\n",
            html_escape(title),
            html_escape(message)
        );
        wrap_html(menu, None, title, &body)
    }
}

fn render_block(out: &mut String, block: &PageBlock) {
    match block {
        PageBlock::Table { heading, table } => {
            if let Some(heading) = heading {
                let _ = writeln!(out, "<h2>{}</h2>", html_escape(heading));
            }
            render_table(out, table);
        }
        PageBlock::Error { heading, message } => {
            if let Some(heading) = heading {
                let _ = writeln!(out, "<h2>{}</h2>", html_escape(heading));
            }
            let _ = writeln!(out, "<div class=\"error\">{}</div>", html_escape(message));
        }
        PageBlock::Caption { text } => {
            let _ = writeln!(out, "<p class=\"caption\">{}</p>", html_escape(text));
        }
        PageBlock::DrillDown(DrillDownOutcome::Found {
            query_id,
            query_text,
            keyword,
            keyword_count,
        }) => {
            let _ = writeln!(out, "<h2>Query {}</h2>", html_escape(query_id));
            let _ = writeln!(out, "<pre class=\"query-text\">{}</pre>", html_escape(query_text));
            let _ = writeln!(
                out,
                "<p class=\"keyword-count\">{} count: <strong>{}</strong></p>",
                html_escape(keyword),
                keyword_count
            );
        }
        PageBlock::DrillDown(DrillDownOutcome::NotFound { query_id }) => {
            let _ = writeln!(
                out,
                "<p class=\"notice\">No query found with ID {}.</p>",
                html_escape(query_id)
            );
        }
    }
}

fn render_table(out: &mut String, table: &QueryResult) {
    out.push_str("<table>\n<thead><tr>");
    for name in table.column_names() {
        let _ = write!(out, "<th>{}</th>", html_escape(name));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    if table.is_empty() {
        let _ = writeln!(
            out,
            "<tr><td class=\"empty\" colspan=\"{}\">No rows returned</td></tr>",
            table.columns().len().max(1)
        );
    }
    for row in table.rows() {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", html_escape(&cell.display()));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
}

fn render_menu(menu: &[ViewSummary], current: Option<ViewId>) -> String {
    let mut nav = String::from("<nav><ul>\n");
    for entry in menu {
        let class = if Some(entry.id) == current {
            " class=\"active\""
        } else {
            ""
        };
        let _ = writeln!(
            nav,
            "<li{}><a href=\"/views/{}\">{}</a></li>",
            class,
            entry.id,
            html_escape(&entry.title)
        );
    }
    nav.push_str("</ul></nav>\n");
    nav
}

fn wrap_html(menu: &[ViewSummary], current: Option<ViewId>, title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{} - Warehouse Monitor</title>
<style>{}</style>
</head>
<body>
{}<main>
{}</main>
</body>
</html>"#,
        html_escape(title),
        DEFAULT_CSS,
        render_menu(menu, current),
        body
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const DEFAULT_CSS: &str = r#"
:root {
    --primary-color: #29b5e8;
    --text-color: #1f2937;
    --muted-color: #6b7280;
    --border-color: #e5e7eb;
    --error-bg: #fef2f2;
    --error-color: #b91c1c;
}
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif;
    color: var(--text-color);
    margin: 0;
    display: flex;
}
nav {
    width: 15rem;
    min-height: 100vh;
    background: #f8fafc;
    border-right: 1px solid var(--border-color);
    padding: 1rem;
}
nav ul { list-style: none; padding: 0; margin: 0; }
nav li { margin: 0.25rem 0; }
nav a { color: var(--text-color); text-decoration: none; }
nav li.active a { color: var(--primary-color); font-weight: 600; }
main { flex: 1; padding: 1.5rem 2rem; overflow-x: auto; }
.meta, .caption { color: var(--muted-color); }
.error {
    background: var(--error-bg);
    color: var(--error-color);
    border: 1px solid var(--error-color);
    padding: 0.75rem 1rem;
    border-radius: 4px;
}
table { border-collapse: collapse; margin: 1rem 0; font-size: 0.875rem; }
th, td { border: 1px solid var(--border-color); padding: 0.375rem 0.75rem; text-align: left; }
th { background: #f3f4f6; }
td.empty { color: var(--muted-color); font-style: italic; }
pre.query-text { background: #f3f4f6; padding: 1rem; white-space: pre-wrap; }
form { margin: 1rem 0; }
"#;

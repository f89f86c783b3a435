//! Server-rendered HTML pages
//!
//! Plain string templates; every dynamic value goes through [`escape_html`].

use crate::messages;
use crate::submission::form::{FieldError, FIELD_CATEGORY_ID, FIELD_DESCRIPTION, FIELD_FILE, FIELD_NAME};
use axum::response::Html;
use softstore_common::db::{Category, ProgramBasicInfo};
use std::fmt::Write;

const STYLE: &str = r#"
        body {
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 900px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.6;
        }
        h1 {
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
        }
        nav a { margin-right: 12px; }
        .flash { padding: 10px 14px; border-radius: 4px; margin: 12px 0; }
        .flash.success { background: #e6f4ea; color: #1e4620; }
        .flash.error { background: #fdecea; color: #611a15; }
        .field-error { color: #b00020; font-size: 0.9em; }
        .program { border-bottom: 1px solid #ddd; padding: 10px 0; }
        .meta { color: #666; font-size: 0.9em; }
        label { display: block; margin-top: 12px; font-weight: 600; }
        input[type=text], textarea, select { width: 100%; padding: 6px; }
        button {
            margin-top: 16px;
            padding: 10px 20px;
            background: #0066cc;
            color: white;
            border: none;
            border-radius: 4px;
        }
"#;

/// Escape text for HTML element and attribute content
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - SoftStore</title>
    <style>{STYLE}</style>
</head>
<body>
    <nav><a href="/">Catalog</a><a href="/submit">Submit a program</a><a href="/details">About</a></nav>
    <h1>{title}</h1>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        body = body,
    ))
}

fn flash(class: &str, text: Option<&str>) -> String {
    text.map(|t| format!(r#"    <div class="flash {}">{}</div>"#, class, escape_html(t)) + "\n")
        .unwrap_or_default()
}

fn field_errors(errors: &[FieldError], field: &str) -> String {
    errors
        .iter()
        .filter(|e| e.field == field)
        .map(|e| {
            format!(
                r#"<div class="field-error">{}</div>"#,
                escape_html(messages::text(e.message_key))
            )
        })
        .collect()
}

/// Everything the submission form shows
#[derive(Debug, Default)]
pub struct SubmitView<'a> {
    pub categories: &'a [Category],
    pub max_file_size_kb: u64,
    pub name: &'a str,
    pub description: &'a str,
    pub category_id: Option<i64>,
    pub errors: &'a [FieldError],
    pub success_message: Option<&'a str>,
    pub error_message: Option<&'a str>,
}

/// Submission form page
pub fn submit_page(view: &SubmitView<'_>) -> Html<String> {
    let mut body = String::new();
    body.push_str(&flash("success", view.success_message));
    body.push_str(&flash("error", view.error_message));

    let mut options = String::from(r#"<option value="">-- choose --</option>"#);
    for category in view.categories {
        let selected = if view.category_id == Some(category.id) { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            category.id,
            selected,
            escape_html(&category.name)
        );
    }

    let _ = write!(
        body,
        r#"    <form method="post" action="/submit" enctype="multipart/form-data">
        <label for="name">Name</label>
        <input type="text" id="name" name="{f_name}" value="{name}">
        {e_name}
        <label for="description">Description</label>
        <textarea id="description" name="{f_desc}" rows="5">{description}</textarea>
        {e_desc}
        <label for="categoryId">Category</label>
        <select id="categoryId" name="{f_cat}">{options}</select>
        {e_cat}
        <label for="file">Program archive (.zip, max {max_kb} KB)</label>
        <input type="file" id="file" name="{f_file}" accept=".zip">
        {e_file}
        <button type="submit">Submit</button>
    </form>
"#,
        f_name = FIELD_NAME,
        name = escape_html(view.name),
        e_name = field_errors(view.errors, FIELD_NAME),
        f_desc = FIELD_DESCRIPTION,
        description = escape_html(view.description),
        e_desc = field_errors(view.errors, FIELD_DESCRIPTION),
        f_cat = FIELD_CATEGORY_ID,
        options = options,
        e_cat = field_errors(view.errors, FIELD_CATEGORY_ID),
        max_kb = view.max_file_size_kb,
        f_file = FIELD_FILE,
        e_file = field_errors(view.errors, FIELD_FILE),
    );

    layout("Submit a program", &body)
}

/// Catalog listing, optionally filtered to one category
pub fn catalog_page(
    categories: &[Category],
    selected: Option<i64>,
    programs: &[ProgramBasicInfo],
) -> Html<String> {
    let mut body = String::from("    <p class=\"meta\">Categories: <a href=\"/\">All</a>");
    for category in categories {
        let label = escape_html(&category.name);
        if selected == Some(category.id) {
            let _ = write!(body, " | <strong>{}</strong>", label);
        } else {
            let _ = write!(body, " | <a href=\"/?category={}\">{}</a>", category.id, label);
        }
    }
    body.push_str("</p>\n");

    if programs.is_empty() {
        body.push_str("    <p>No programs yet.</p>\n");
    }

    for program in programs {
        let icons = [program.img128.as_deref(), program.img512.as_deref()]
            .iter()
            .flatten()
            .map(|icon| escape_html(icon))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(
            body,
            r#"    <div class="program">
        <h3>{name}</h3>
        <p>{description}</p>
        <p class="meta">{category} &middot; {downloads} downloads{icons} &middot; <a href="/remove?id={id}">Remove</a></p>
    </div>
"#,
            name = escape_html(&program.name),
            description = escape_html(&program.description),
            category = escape_html(&program.category_name),
            downloads = program.downloads,
            icons = if icons.is_empty() { String::new() } else { format!(" &middot; icons: {}", icons) },
            id = program.id,
        );
    }

    layout("Catalog", &body)
}

/// Details page describing the archive layout
pub fn details_page(metadata_file_name: &str) -> Html<String> {
    let intro = format!(
        r#"    <p>SoftStore is a catalog of freely distributed programs, grouped by category.</p>
    <h2>Submitting a program</h2>
    <p>Upload a single <code>.zip</code> archive. It must contain an <code>{}</code> file with
    one <code>key=value</code> pair per line:</p>
"#,
        escape_html(metadata_file_name)
    );

    layout("About SoftStore", &(intro + DETAILS_FORMAT))
}

const DETAILS_FORMAT: &str = r#"    <pre>name=My Program
description=What my program does
icon128=icons/small.png
icon512=icons/large.png</pre>
    <p><code>name</code> and <code>description</code> are required, icons are optional.
    Archives containing empty files are rejected.</p>
"#;

/// Generic error page; never includes internal details
pub fn error_page(status: u16, reason: &str) -> Html<String> {
    layout(
        &format!("{} {}", status, reason),
        "    <p>Sorry, the request could not be completed.</p>\n",
    )
}

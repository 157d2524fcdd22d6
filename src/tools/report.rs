//! HTML report composition
//!
//! Pure formatter: emits a self-contained document embedding the surviving
//! blocks as JSON data for client-side rendering (Markdown via marked.js,
//! HTML inserted verbatim). The title is escaped; raw HTML block content is
//! intentionally not sanitized, it is authored by the same trusted loop.

use serde_json::{json, Value};

const DEFAULT_CSS: &str = "\
    body{font-family:Inter,system-ui,Segoe UI,Roboto,Arial,sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem;}\n\
    h1,h2,h3{font-weight:600} .section{margin:1.5rem 0} table{border-collapse:collapse;width:100%}\n\
    td,th{border:1px solid #ddd;padding:6px 8px;text-align:left}";

pub fn compose_html_report(title: &str, blocks: &[Value], css: Option<&str>) -> String {
    let head_css = css.unwrap_or(DEFAULT_CSS);
    let safe_blocks = filter_blocks(blocks);
    let title = if title.is_empty() { "Report" } else { title };
    let escaped_title = escape_html(title);
    let blocks_json = serde_json::to_string(&safe_blocks).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <title>{title}</title>
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <style>{css}</style>
  <script src="https://cdn.jsdelivr.net/npm/marked/marked.min.js"></script>
</head>
<body>
  <h1>{title}</h1>
  <div id="report"></div>
  <script>
    const blocks = {blocks};
    const mount = document.getElementById('report');
    for (const block of blocks) {{
      const section = document.createElement('section');
      section.className = 'section';
      const container = document.createElement('div');
      if (block.kind === 'md') {{
        container.innerHTML = marked.parse(block.content || '');
      }} else {{
        container.innerHTML = block.content || '';
      }}
      section.appendChild(container);
      mount.appendChild(section);
    }}
  </script>
</body>
</html>"#,
        title = escaped_title,
        css = head_css,
        blocks = blocks_json,
    )
}

/// Keep only well-formed md/html blocks; everything else is dropped
/// silently. A missing content field is tolerated as empty content.
fn filter_blocks(blocks: &[Value]) -> Vec<Value> {
    blocks
        .iter()
        .filter_map(|block| {
            let record = block.as_object()?;
            let kind = record.get("kind")?.as_str()?.to_lowercase();
            if kind != "md" && kind != "html" {
                return None;
            }
            let content = record
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or("");
            Some(json!({"kind": kind, "content": content}))
        })
        .collect()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

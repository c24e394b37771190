//! HTML pages for the gallery and live view.
//!
//! Templates are compile-time maud markup; all interpolation is
//! auto-escaped, so photo names can be dropped straight into attributes.

use maud::{html, Markup, PreEscaped, DOCTYPE};

const GALLERY_CSS: &str = "\
    body { font-family: sans-serif; margin: 16px; }\n\
    .top { display:flex; gap:12px; align-items:center; flex-wrap:wrap; }\n\
    .btn { padding:10px 14px; border:1px solid #ccc; border-radius:12px; background:#f7f7f7; cursor:pointer; }\n\
    .grid { margin-top:14px; display:grid; grid-template-columns:repeat(auto-fill, minmax(220px, 1fr)); gap:10px; }\n\
    img { width:100%; height:auto; border-radius:12px; }\n\
    a { text-decoration:none; color:inherit; }\n\
    form { margin:0; }\n\
    .card { position: relative; }\n\
    .del { width:100%; margin-top:6px; padding:8px 12px; border:1px solid #e0b4b4; border-radius:10px; background:#fff5f5; cursor:pointer; }\n";

const LIVE_CSS: &str = "\
    body { font-family: sans-serif; margin: 12px; text-align: center; }\n\
    img { max-width: 100%; height: auto; border-radius: 12px; }\n\
    .bar { display:flex; justify-content:space-between; align-items:center; margin-bottom:10px; gap:8px; flex-wrap:wrap; }\n\
    .btn { padding:10px 14px; border:1px solid #ccc; border-radius:12px; background:#f7f7f7; cursor:pointer; }\n\
    form { margin:0; }\n";

/// Script polling `/latest_ts`; reloads the gallery when a new photo
/// appears. The first observed value only seeds the comparison.
fn poll_script(poll_ms: u64) -> String {
    format!(
        "let lastTs = \"\";\n\
         async function checkForUpdate() {{\n\
           try {{\n\
             const r = await fetch(\"/latest_ts\");\n\
             const ts = await r.text();\n\
             if (ts !== lastTs) {{\n\
               if (lastTs !== \"\") location.reload();\n\
               lastTs = ts;\n\
             }}\n\
           }} catch (e) {{}}\n\
         }}\n\
         setInterval(checkForUpdate, {poll_ms});\n"
    )
}

/// Gallery page: photo grid newest-first, capture button, delete buttons.
pub fn gallery(files: &[String], refresh_secs: u64) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Shutterpi" }
                style { (PreEscaped(GALLERY_CSS)) }
                script { (PreEscaped(poll_script(refresh_secs * 1000))) }
            }
            body {
                div class="top" {
                    h2 style="margin:0;" { "Shutterpi" }
                    form method="POST" action="/capture" {
                        button class="btn" type="submit" { "Take Photo" }
                    }
                    a class="btn" href="/live" { "Live view" }
                    a class="btn" href="/latest" { "Open latest" }
                    button class="btn" onclick="location.reload()" { "Refresh" }
                }
                div class="grid" {
                    @for f in files {
                        div class="card" {
                            a href={ "/photos/" (f) } {
                                img src={ "/photos/" (f) } loading="lazy";
                            }
                            form method="POST"
                                action={ "/delete/" (f) }
                                onsubmit="return confirm('Delete this photo?');" {
                                button class="del" type="submit" { "Delete" }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Live view: the newest photo, auto-refreshing every `refresh_secs`.
/// The mtime query parameter busts the browser cache between refreshes.
pub fn live(newest: Option<(&str, u128)>, refresh_secs: u64) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Latest Photo" }
                meta http-equiv="refresh" content=(refresh_secs);
                style { (PreEscaped(LIVE_CSS)) }
            }
            body {
                div class="bar" {
                    a class="btn" href="/" { "Gallery" }
                    form method="POST" action="/capture" {
                        button class="btn" type="submit" { "Take Photo" }
                    }
                    div { "Auto refresh: " (refresh_secs) "s" }
                    a class="btn" href="/latest" { "Open file" }
                }
                @if let Some((name, ts)) = newest {
                    img src={ "/photos/" (name) "?t=" (ts.to_string()) };
                } @else {
                    p { "No photos yet." }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gallery_lists_files_in_order() {
        let files = vec!["b.jpg".to_string(), "a.png".to_string()];
        let page = gallery(&files, 2).into_string();

        let b = page.find("/photos/b.jpg").unwrap();
        let a = page.find("/photos/a.png").unwrap();
        assert!(b < a, "newest photo should render first");
        assert!(page.contains("/latest_ts"));
        assert!(page.contains("setInterval(checkForUpdate, 2000)"));
    }

    #[test]
    fn test_gallery_escapes_names() {
        // Names like this never pass the store's validation, but the
        // template must not be the last line of defense anyway.
        let files = vec!["<script>.png".to_string()];
        let page = gallery(&files, 2).into_string();
        assert!(!page.contains("<script>.png"));
        assert!(page.contains("&lt;script&gt;.png"));
    }

    #[test]
    fn test_live_with_and_without_photo() {
        let page = live(Some(("b.jpg", 12345)), 3).into_string();
        assert!(page.contains("/photos/b.jpg?t=12345"));
        assert!(page.contains("content=\"3\""));

        let empty = live(None, 3).into_string();
        assert!(empty.contains("No photos yet."));
    }
}

//! Renderers for the built-in widget kinds.

use std::fmt::Write;

use pulldown_cmark::{Options, Parser, html};
use trellis_store::FieldValue;

use super::{RenderFn, WidgetEnv, WidgetKind};
use crate::fields::{FieldContext, WidgetError, background_class};
use crate::html::escape_html;

pub(super) fn renderer(kind: WidgetKind) -> RenderFn {
    match kind {
        WidgetKind::Heading => heading,
        WidgetKind::Text => text,
        WidgetKind::Image => image,
        WidgetKind::Hero => hero,
        WidgetKind::Button => button,
        WidgetKind::Gallery => gallery,
        WidgetKind::ContentCard => content_card,
        WidgetKind::Spacer => spacer,
        WidgetKind::Html => raw_html,
    }
}

fn one_of<'a>(
    cx: &'a FieldContext,
    name: &str,
    allowed: &[&str],
    fallback: &'a str,
) -> Result<&'a str, WidgetError> {
    match cx.text(name)? {
        None => Ok(fallback),
        Some(value) if allowed.contains(&value) => Ok(value),
        Some(_) => Err(WidgetError::InvalidField {
            field: name.to_owned(),
            expected: "one of the declared options",
        }),
    }
}

fn heading(cx: &FieldContext, _env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
    let text = cx.require_text("text")?;
    let level = one_of(cx, "level", &["h1", "h2", "h3", "h4"], "h2")?;
    Ok(format!(
        r#"<{level} class="widget-heading">{}</{level}>"#,
        escape_html(text)
    ))
}

fn text(cx: &FieldContext, _env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
    let body = cx.require_text("body")?;
    let parser = Parser::new_ext(body, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut out = String::from(r#"<div class="widget-text">"#);
    html::push_html(&mut out, parser);
    out.push_str("</div>");
    Ok(out)
}

fn image(cx: &FieldContext, env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
    let id = cx
        .media("image")?
        .ok_or_else(|| WidgetError::MissingField("image".to_owned()))?;
    let (url, media_alt) = env
        .media_url(id)
        .ok_or_else(|| WidgetError::Unresolved(format!("image {id} no longer exists")))?;
    let alt = cx.text("alt")?.map_or(media_alt, str::to_owned);

    let mut out = format!(
        r#"<figure class="widget-image"><img src="{}" alt="{}" loading="lazy">"#,
        escape_html(&url),
        escape_html(&alt)
    );
    if let Some(caption) = cx.text("caption")? {
        write!(out, "<figcaption>{}</figcaption>", escape_html(caption)).unwrap();
    }
    out.push_str("</figure>");
    Ok(out)
}

fn hero(cx: &FieldContext, env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
    let title = cx.require_text("title")?;

    let mut classes = String::from("widget-hero");
    if let Some(id) = cx.media("background")?
        && let Some((url, _)) = env.media_url(id)
    {
        let class = background_class(&url);
        env.styles().push(
            &format!(".{class}"),
            &format!("background-image: url('{}');", css_url(&url)),
        );
        classes.push(' ');
        classes.push_str(&class);
    }

    let mut out = format!(
        r#"<div class="{classes}"><h1 class="hero-title">{}</h1>"#,
        escape_html(title)
    );
    if let Some(subtitle) = cx.text("subtitle")? {
        write!(out, r#"<p class="hero-subtitle">{}</p>"#, escape_html(subtitle)).unwrap();
    }
    if let (Some(label), Some(url)) = (cx.text("cta_label")?, cx.text("cta_url")?) {
        write!(
            out,
            r#"<a class="btn btn-primary hero-cta" href="{}">{}</a>"#,
            escape_html(url),
            escape_html(label)
        )
        .unwrap();
    }
    out.push_str("</div>");
    Ok(out)
}

/// Percent-encodes the characters that could close a quoted `url()` or the style block.
fn css_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            '\'' | '"' | '(' | ')' | '<' | '>' | '\\' => write!(out, "%{:02X}", c as u32).unwrap(),
            c if c.is_ascii_whitespace() => write!(out, "%{:02X}", c as u32).unwrap(),
            c => out.push(c),
        }
    }
    out
}

fn button(cx: &FieldContext, _env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
    let label = cx.require_text("label")?;
    let url = cx.require_text("url")?;
    let style = one_of(cx, "style", &["primary", "secondary", "link"], "primary")?;
    let target = if cx.flag("new_tab")? {
        r#" target="_blank" rel="noopener""#
    } else {
        ""
    };
    Ok(format!(
        r#"<a class="btn btn-{style}" href="{}"{target}>{}</a>"#,
        escape_html(url),
        escape_html(label)
    ))
}

fn gallery(cx: &FieldContext, env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
    let columns: u16 = one_of(cx, "columns", &["2", "3", "4"], "3")?
        .parse()
        .unwrap_or(3);
    let span = (env.options().grid_columns / columns).max(1);

    let mut out = String::from(r#"<div class="widget-gallery row">"#);
    for row in cx.list("images")? {
        let Some(FieldValue::Media(id)) = row.get("image") else {
            env.warn(format!(
                "gallery widget {} has a row without an image",
                cx.widget_id()
            ));
            continue;
        };
        let Some((url, alt)) = env.media_url(*id) else {
            continue;
        };
        write!(
            out,
            r#"<figure class="col-{span}"><img src="{}" alt="{}" loading="lazy">"#,
            escape_html(&url),
            escape_html(&alt)
        )
        .unwrap();
        if let Some(caption) = row.get("caption").and_then(|v| v.as_text())
            && !caption.is_empty()
        {
            write!(out, "<figcaption>{}</figcaption>", escape_html(caption)).unwrap();
        }
        out.push_str("</figure>");
    }
    out.push_str("</div>");
    Ok(out)
}

fn content_card(cx: &FieldContext, env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
    let id = cx
        .content("content")?
        .ok_or_else(|| WidgetError::MissingField("content".to_owned()))?;
    let item = env
        .content(id)
        .ok_or_else(|| WidgetError::Unresolved(format!("content {id} no longer exists")))?;

    let mut out = format!(
        r#"<article class="widget-content-card" data-content-id="{}"><h3 class="card-title">{}</h3>"#,
        item.id,
        escape_html(&item.title)
    );
    if cx.flag("show_excerpt")? && !item.excerpt.is_empty() {
        write!(out, r#"<p class="card-text">{}</p>"#, escape_html(&item.excerpt)).unwrap();
    }
    if let Some(file) = cx.media("attachment")?
        && let Some((url, _)) = env.media_url(file)
    {
        write!(
            out,
            r#"<a class="card-attachment" href="{}" download>Download</a>"#,
            escape_html(&url)
        )
        .unwrap();
    }
    out.push_str("</article>");
    Ok(out)
}

fn spacer(cx: &FieldContext, _env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
    let size = one_of(cx, "size", &["sm", "md", "lg"], "md")?;
    Ok(format!(
        r#"<div class="widget-spacer spacer-{size}" aria-hidden="true"></div>"#
    ))
}

fn raw_html(cx: &FieldContext, _env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
    Ok(cx.require_text("markup")?.to_owned())
}

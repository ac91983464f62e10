// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Open-pixel injection and click-tracking link rewrites.
//!
//! Rewritten hrefs point at the tracking redirect with an opaque token
//! carrying `(workflow, subscriber, step, original url)`. Unsubscribe links,
//! anchors, and mailto links are left untouched. The pixel lands before
//! `</body>` when one exists, otherwise it is appended.

use crate::seed::hex_encode;
use drip_core::{StepId, SubscriberId, WorkflowId};
use regex::Regex;
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static HREF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).expect("constant regex pattern is valid"));

/// Identity of the send being instrumented
#[derive(Debug, Clone)]
pub struct TrackingContext<'a> {
    pub base_url: &'a str,
    pub workflow_id: &'a WorkflowId,
    pub subscriber_id: &'a SubscriberId,
    pub step_id: &'a StepId,
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

fn encode_parts(ctx: &TrackingContext<'_>, url: &str) -> String {
    hex_encode(
        format!("{}|{}|{}|{}", ctx.workflow_id, ctx.subscriber_id, ctx.step_id, url).as_bytes(),
    )
}

/// Decode a tracking token back into `(workflow, subscriber, step, url)`
pub fn decode_token(token: &str) -> Option<(WorkflowId, SubscriberId, StepId, String)> {
    let bytes = hex_decode(token)?;
    let raw = String::from_utf8(bytes).ok()?;
    let mut parts = raw.splitn(4, '|');
    let workflow = parts.next()?;
    let subscriber = parts.next()?;
    let step = parts.next()?;
    let url = parts.next()?;
    Some((
        WorkflowId::from_string(workflow),
        SubscriberId::from_string(subscriber),
        StepId::new(step),
        url.to_string(),
    ))
}

fn skip_rewrite(url: &str) -> bool {
    url.starts_with('#')
        || url.starts_with("mailto:")
        || url.contains("unsubscribe")
        || url.starts_with("{{")
}

/// Rewrite hrefs through the click redirect and inject the open pixel
pub fn instrument_html(html: &str, ctx: &TrackingContext<'_>) -> String {
    let rewritten = HREF_PATTERN
        .replace_all(html, |caps: &regex::Captures| {
            let url = &caps[1];
            if skip_rewrite(url) {
                caps[0].to_string()
            } else {
                format!(r#"href="{}/c/{}""#, ctx.base_url, encode_parts(ctx, url))
            }
        })
        .to_string();

    let pixel = format!(
        r#"<img src="{}/o/{}" width="1" height="1" alt="" style="display:none"/>"#,
        ctx.base_url,
        encode_parts(ctx, ""),
    );
    match rewritten.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(rewritten.len() + pixel.len());
            out.push_str(&rewritten[..pos]);
            out.push_str(&pixel);
            out.push_str(&rewritten[pos..]);
            out
        }
        None => format!("{rewritten}{pixel}"),
    }
}

#[cfg(test)]
#[path = "tracking_tests.rs"]
mod tests;

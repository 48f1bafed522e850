//! JavaScript evaluated inside the Box.com preview.
//!
//! All selectors that depend on the viewer's markup live here, so a change to
//! the preview's DOM means editing this file only. Every script returns a
//! JSON value (never `null` at the top level) so results deserialise cleanly.

/// `true` once the preview shows a rendered page surface.
pub const PREVIEW_READY: &str = r#"(() => {
    const imgs = document.querySelectorAll('img[src^="data:"]');
    for (const img of imgs) {
        if (img.src.length > 1000) return true;
    }
    for (const c of document.querySelectorAll('canvas')) {
        const rect = c.getBoundingClientRect();
        if (rect.width > 100 && rect.height > 100) return true;
    }
    const containers = document.querySelectorAll('[class*="bp-doc"], [class*="PreviewContent"]');
    for (const el of containers) {
        if (el.scrollHeight > 1000) return true;
    }
    return false;
})()"#;

/// Element hovered to make the page toolbar appear.
pub const PREVIEW_SELECTOR: &str = r#".bp-doc, [class*="bp-doc"], .bp-content"#;

/// `true` when the page toolbar is in the DOM.
pub const CONTROLS_PRESENT: &str = "document.querySelector('.bp-PageControls') !== null";

/// `{ total: number | null }` read from the toolbar (`3 / 42`) or page text (`of 42`, `42 pages`).
pub const PAGE_COUNT: &str = r#"(() => {
    const result = { total: null };
    const controls = document.querySelector('.bp-PageControls, .bp-PageControlsForm, [class*="PageControls"]');
    if (controls) {
        const m = (controls.textContent || '').match(/(\d+)\s*\/\s*(\d+)/);
        if (m) result.total = parseInt(m[2], 10);
    }
    if (!result.total) {
        const text = document.body.innerText || '';
        const m = text.match(/of\s+(\d+)/i) || text.match(/(\d+)\s+pages?/i);
        if (m) result.total = parseInt(m[1], 10);
    }
    return result;
})()"#;

/// Clicks the "next page" button; `true` if it existed and was enabled.
pub const NEXT_PAGE: &str = r#"(() => {
    const next = document.querySelector('[data-testid="bp-PageControls-next"]');
    if (next && !next.disabled) {
        next.click();
        return true;
    }
    return false;
})()"#;

/// Template for the page capture promise; see [`capture_script`].
const CAPTURE_TEMPLATE: &str = r#"new Promise((resolve) => {
    const started = Date.now();
    const maxWait = __MAX_WAIT_MS__;
    const minWidth = __MIN_WIDTH__;

    const nearestSurface = () => {
        const centre = window.innerHeight / 2;
        let best = null;
        let bestDistance = Infinity;
        const consider = (el, wide, rect) => {
            if (!wide || rect.height <= 100) return;
            const distance = Math.abs(rect.top + rect.height / 2 - centre);
            if (distance < bestDistance) {
                bestDistance = distance;
                best = el;
            }
        };
        for (const c of document.querySelectorAll('canvas')) {
            consider(c, c.width >= minWidth, c.getBoundingClientRect());
        }
        for (const img of document.querySelectorAll('img')) {
            const inline = img.src.startsWith('blob:') || img.src.startsWith('data:');
            consider(img, inline && img.naturalWidth >= minWidth, img.getBoundingClientRect());
        }
        return best;
    };

    const attempt = () => {
        const el = nearestSurface();
        if (!el) {
            if (Date.now() - started < maxWait) {
                setTimeout(attempt, 100);
            } else {
                resolve({ dataUrl: null, width: 0, height: 0 });
            }
            return;
        }
        try {
            let canvas = el;
            if (el.tagName !== 'CANVAS') {
                canvas = document.createElement('canvas');
                canvas.width = el.naturalWidth;
                canvas.height = el.naturalHeight;
                canvas.getContext('2d').drawImage(el, 0, 0);
            }
            const dataUrl = canvas.toDataURL('image/png');
            if (dataUrl && dataUrl.length > 1000) {
                resolve({ dataUrl, width: canvas.width, height: canvas.height });
            } else {
                resolve({ dataUrl: null, width: 0, height: 0 });
            }
        } catch (e) {
            resolve({ dataUrl: null, width: 0, height: 0 });
        }
    };
    attempt();
})"#;

/// Build the capture script for the given render wait and minimum page width.
///
/// The promise resolves to `{ dataUrl, width, height }`, with `dataUrl: null`
/// when no page surface appeared in time or the surface was tainted.
pub fn capture_script(max_wait_ms: u64, min_width: u32) -> String {
    CAPTURE_TEMPLATE
        .replace("__MAX_WAIT_MS__", &max_wait_ms.to_string())
        .replace("__MIN_WIDTH__", &min_width.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_script_substitutes_parameters() {
        let js = capture_script(2500, 640);
        assert!(js.contains("const maxWait = 2500;"));
        assert!(js.contains("const minWidth = 640;"));
        assert!(!js.contains("__"), "placeholder left behind");
    }

    #[test]
    fn scripts_are_expressions() {
        for js in [PREVIEW_READY, PAGE_COUNT, NEXT_PAGE] {
            assert!(js.starts_with("(() =>"));
            assert!(js.ends_with(")()"));
        }
    }
}

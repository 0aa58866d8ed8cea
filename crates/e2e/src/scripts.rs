//! Page-context scripts injected through `execute_script`.
//!
//! Element arguments arrive as `arguments[0]`; numeric arguments follow in
//! call order.

/// Script-driven click, second tier of the click fallback
pub const CLICK: &str = "arguments[0].click();";

/// Jump to the bottom of the document
pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Bring an element to the vertical centre of the viewport
pub const SCROLL_INTO_VIEW_CENTER: &str =
    "arguments[0].scrollIntoView({behavior: 'smooth', block: 'center'});";

/// Relative scroll by `(arguments[0], arguments[1])`
pub const SCROLL_BY: &str = "window.scrollBy(arguments[0], arguments[1]);";

/// True when the topmost node at the element centre is neither the element
/// nor one of its descendants
pub const IS_OBSCURED: &str = r#"
var el = arguments[0];
var r = el.getBoundingClientRect();
var top = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2);
return top !== null && top !== el && !el.contains(top);
"#;

pub const READY_STATE: &str = "return document.readyState;";

/// Empty a form control and notify listeners
pub const CLEAR_VALUE: &str = r#"
var el = arguments[0];
el.value = '';
el.dispatchEvent(new Event('input', {bubbles: true}));
el.dispatchEvent(new Event('change', {bubbles: true}));
"#;

/// Click the first cookie-consent accept button found. Returns whether one was clicked.
pub const ACCEPT_CONSENT: &str = r#"
var selectors = [
  "button[data-a-target='consent-banner-accept']",
  "[data-a-target='consent-banner-accept']",
  "button[aria-label*='Accept']"
];
for (var i = 0; i < selectors.length; i++) {
  var btn = document.querySelector(selectors[i]);
  if (btn) { btn.click(); return true; }
}
return false;
"#;

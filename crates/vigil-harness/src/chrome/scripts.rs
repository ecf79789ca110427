//! Scripts evaluated in the page to resolve and inspect locators.
//!
//! Every argument is embedded as JSON, so locator text can never break out
//! of its string literal.

use crate::locator::Locator;
use crate::session::{ElementHandle, ElementSnapshot};
use serde::Deserialize;
use serde_json::{json, Value};

/// Attribute carrying an element's handle token.
pub(super) const HANDLE_ATTR: &str = "data-vigil-handle";

/// Shared helpers: visibility, interactability, roles and accessible names.
const HELPERS: &str = r#"
const ATTR = 'data-vigil-handle';
const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
const lower = (s) => norm(s).toLowerCase();

const isVisible = (el) => {
  if (!el.isConnected) return false;
  const style = getComputedStyle(el);
  if (style.visibility === 'hidden' || style.visibility === 'collapse') return false;
  const rect = el.getBoundingClientRect();
  return rect.width > 0 && rect.height > 0;
};

const isEnabled = (el) =>
  !(el.matches(':disabled') || el.closest('[aria-disabled="true"]'));

const TEXT_INPUTS = ['text', 'search', 'email', 'url', 'tel', 'password', 'number',
  'date', 'datetime-local', 'month', 'time', 'week'];

const isEditable = (el) => {
  if (el.isContentEditable) return true;
  if (el instanceof HTMLTextAreaElement) return !el.readOnly;
  if (el instanceof HTMLInputElement) return TEXT_INPUTS.includes(el.type) && !el.readOnly;
  return false;
};

const textOf = (el) => {
  if (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement
      || el instanceof HTMLSelectElement) {
    return el.value;
  }
  return el.innerText ?? el.textContent ?? '';
};

const implicitRole = (el) => {
  const explicit = el.getAttribute('role');
  if (explicit) return explicit.trim().split(/\s+/)[0].toLowerCase();
  const tag = el.tagName.toLowerCase();
  switch (tag) {
    case 'button': return 'button';
    case 'a': case 'area': return el.hasAttribute('href') ? 'link' : null;
    case 'input': {
      const type = el.type;
      if (['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
      if (type === 'checkbox') return 'checkbox';
      if (type === 'radio') return 'radio';
      if (type === 'range') return 'slider';
      if (type === 'number') return 'spinbutton';
      if (type === 'search') return 'searchbox';
      if (type === 'hidden') return null;
      return 'textbox';
    }
    case 'textarea': return 'textbox';
    case 'select': return el.multiple || el.size > 1 ? 'listbox' : 'combobox';
    case 'option': return 'option';
    case 'h1': case 'h2': case 'h3': case 'h4': case 'h5': case 'h6': return 'heading';
    case 'img': return el.getAttribute('alt') === '' ? 'presentation' : 'img';
    case 'ul': case 'ol': return 'list';
    case 'li': return 'listitem';
    case 'nav': return 'navigation';
    case 'main': return 'main';
    case 'dialog': return 'dialog';
    case 'form': return 'form';
    case 'table': return 'table';
    case 'progress': return 'progressbar';
    default: return null;
  }
};

const accessibleName = (el) => {
  const labelledBy = el.getAttribute('aria-labelledby');
  if (labelledBy) {
    const text = labelledBy.split(/\s+/)
      .map((id) => document.getElementById(id))
      .filter(Boolean)
      .map((node) => node.textContent)
      .join(' ');
    if (norm(text)) return norm(text);
  }
  const aria = el.getAttribute('aria-label');
  if (norm(aria)) return norm(aria);
  if (el.labels && el.labels.length) {
    return norm(Array.from(el.labels).map((l) => l.innerText).join(' '));
  }
  if (el instanceof HTMLInputElement && ['button', 'submit', 'reset'].includes(el.type)) {
    return norm(el.value);
  }
  if (el instanceof HTMLImageElement) return norm(el.alt);
  const text = norm(el.innerText || el.textContent);
  if (text) return text;
  return norm(el.getAttribute('title') || el.getAttribute('placeholder'));
};

const SKIP_TEXT = ['HTML', 'HEAD', 'SCRIPT', 'STYLE', 'TITLE', 'NOSCRIPT', 'TEMPLATE'];

const find = (query) => {
  const all = () => Array.from(document.querySelectorAll('*'));
  switch (query.kind) {
    case 'css':
      return Array.from(document.querySelectorAll(query.value));
    case 'testid':
      return Array.from(document.querySelectorAll('[data-testid="' + CSS.escape(query.value) + '"]'));
    case 'role': {
      const role = query.role.toLowerCase();
      const name = lower(query.name);
      return all().filter((el) => implicitRole(el) === role && lower(accessibleName(el)).includes(name));
    }
    case 'label': {
      const want = lower(query.text);
      const hits = new Set();
      document.querySelectorAll('label').forEach((label) => {
        if (label.control && lower(label.innerText).includes(want)) hits.add(label.control);
      });
      document.querySelectorAll('[aria-label], [aria-labelledby]').forEach((el) => {
        if (lower(accessibleName(el)).includes(want)) hits.add(el);
      });
      return all().filter((el) => hits.has(el));
    }
    case 'text': {
      const want = lower(query.text);
      const hits = all().filter((el) => !SKIP_TEXT.includes(el.tagName)
        && lower(el.innerText ?? el.textContent).includes(want));
      return hits.filter((el) => !hits.some((other) => other !== el && el.contains(other)));
    }
    default:
      throw new Error('unknown locator kind: ' + query.kind);
  }
};

const describe = (el, token) => ({
  handle: token,
  visible: isVisible(el),
  enabled: isEnabled(el),
  editable: isEditable(el),
  text: textOf(el),
});

const byHandle = (token) =>
  document.querySelector('[' + ATTR + '="' + CSS.escape(token) + '"]');
"#;

/// Element state as returned by the page scripts.
#[derive(Debug, Deserialize)]
pub(super) struct RawElement {
    handle: String,
    visible: bool,
    enabled: bool,
    editable: bool,
    text: String,
}

impl From<RawElement> for ElementSnapshot {
    fn from(raw: RawElement) -> Self {
        Self {
            handle: ElementHandle::new(raw.handle),
            visible: raw.visible,
            enabled: raw.enabled,
            editable: raw.editable,
            text: raw.text,
        }
    }
}

fn locator_query(locator: &Locator) -> Value {
    match locator {
        Locator::Role { role, name } => json!({ "kind": "role", "role": role, "name": name }),
        Locator::Label(text) => json!({ "kind": "label", "text": text }),
        Locator::TestId(id) => json!({ "kind": "testid", "value": id }),
        Locator::Selector(css) => json!({ "kind": "css", "value": css }),
        Locator::Text(text) => json!({ "kind": "text", "text": text }),
    }
}

fn literal(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Finds every match in document order and tags it with `<tag>-<n>`.
///
/// Tags from earlier queries are removed first, so only the latest query's
/// handles stay live.
pub(super) fn query(locator: &Locator, tag: &str) -> String {
    format!(
        r"(() => {{
{HELPERS}
const query = {query};
const tag = {tag};
document.querySelectorAll('[' + ATTR + ']').forEach((el) => el.removeAttribute(ATTR));
return find(query).map((el, i) => {{
  const token = tag + '-' + i;
  el.setAttribute(ATTR, token);
  return describe(el, token);
}});
}})()",
        query = locator_query(locator),
        tag = literal(tag),
    )
}

/// Describes the element behind a handle, as a list that is empty once the
/// element is gone (a `null` result carries no value over CDP).
pub(super) fn inspect(handle: &ElementHandle) -> String {
    format!(
        r"(() => {{
{HELPERS}
const token = {token};
const el = byHandle(token);
return el ? [describe(el, token)] : [];
}})()",
        token = literal(handle.token()),
    )
}

/// Focuses the element and clears its content, firing `input` so that
/// framework-controlled inputs see the change. Evaluates to `false` when
/// the handle is stale.
pub(super) fn clear(handle: &ElementHandle) -> String {
    format!(
        r"(() => {{
{HELPERS}
const el = byHandle({token});
if (!el) return false;
el.focus();
if (el.isContentEditable) {{
  el.textContent = '';
}} else {{
  const proto = el instanceof HTMLTextAreaElement
    ? HTMLTextAreaElement.prototype
    : HTMLInputElement.prototype;
  Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, '');
}}
el.dispatchEvent(new Event('input', {{ bubbles: true }}));
return true;
}})()",
        token = literal(handle.token()),
    )
}

/// CSS selector for the element behind a handle.
pub(super) fn handle_selector(handle: &ElementHandle) -> String {
    format!("[{HANDLE_ATTR}={}]", literal(handle.token()))
}

/// Document readiness and the number of resources fetched so far.
pub(super) const DOCUMENT_STATE: &str = "({ ready_state: document.readyState, \
     resource_count: performance.getEntriesByType('resource').length })";

//! Page-side scripts.
//!
//! Every locator operation evaluates [`RESOLVER`] with a JSON selector spec so
//! nothing has to be injected into the page ahead of time. The resolver
//! returns all matches in document order; the caller picks the index.

use serde_json::Value;

/// `(spec) => Element[]` for `{kind: "css" | "role" | "label", ...}` specs.
///
/// Role and label queries skip elements hidden from the accessibility tree;
/// CSS queries return everything, so hidden file inputs stay reachable.
pub const RESOLVER: &str = r#"(spec) => {
	const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
	const matches = (m, text) => {
		if (!m) return true;
		const t = norm(text);
		if (m.pattern !== undefined) return new RegExp(m.pattern, m.flags || '').test(t);
		return m.exact ? t === norm(m.text) : t.toLowerCase().includes(norm(m.text).toLowerCase());
	};
	const textOf = (ids) => ids.split(/\s+/)
		.map((id) => document.getElementById(id))
		.filter(Boolean)
		.map((e) => e.textContent)
		.join(' ');
	const hidden = (el) => {
		for (let e = el; e && e.nodeType === 1; e = e.parentElement) {
			if (e.getAttribute('aria-hidden') === 'true') return true;
			if (getComputedStyle(e).display === 'none') return true;
		}
		return getComputedStyle(el).visibility === 'hidden';
	};
	const roleOf = (el) => {
		const explicit = el.getAttribute('role');
		if (explicit) return explicit.split(/\s+/)[0].toLowerCase();
		const tag = el.tagName.toLowerCase();
		if (/^h[1-6]$/.test(tag)) return 'heading';
		switch (tag) {
			case 'button': return 'button';
			case 'a': case 'area': return el.hasAttribute('href') ? 'link' : null;
			case 'textarea': return 'textbox';
			case 'select': return el.multiple || el.size > 1 ? 'listbox' : 'combobox';
			case 'option': return 'option';
			case 'img': return el.getAttribute('alt') === '' ? 'presentation' : 'img';
			case 'dialog': return 'dialog';
			case 'nav': return 'navigation';
			case 'main': return 'main';
			case 'form': return 'form';
			case 'ul': case 'ol': return 'list';
			case 'li': return 'listitem';
			case 'table': return 'table';
			case 'input': {
				const type = (el.getAttribute('type') || 'text').toLowerCase();
				if (['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
				if (type === 'checkbox') return 'checkbox';
				if (type === 'radio') return 'radio';
				if (type === 'number') return 'spinbutton';
				if (type === 'range') return 'slider';
				if (type === 'search') return el.hasAttribute('list') ? 'combobox' : 'searchbox';
				if (['text', 'email', 'tel', 'url'].includes(type)) return el.hasAttribute('list') ? 'combobox' : 'textbox';
				return null;
			}
		}
		if (el.isContentEditable) return 'textbox';
		return null;
	};
	const labelOf = (el) => {
		const parts = [];
		const by = el.getAttribute('aria-labelledby');
		if (by) parts.push(textOf(by));
		const aria = el.getAttribute('aria-label');
		if (aria) parts.push(aria);
		if (el.labels) for (const l of el.labels) parts.push(l.textContent);
		return parts.map(norm).filter(Boolean);
	};
	const nameOf = (el) => {
		const labels = labelOf(el);
		if (labels.length) return labels[0];
		const tag = el.tagName.toLowerCase();
		if (tag === 'input' || tag === 'textarea') {
			const type = (el.getAttribute('type') || '').toLowerCase();
			if (['button', 'submit', 'reset'].includes(type)) return norm(el.value);
			const ph = el.getAttribute('placeholder');
			if (ph) return norm(ph);
			return norm(el.getAttribute('title'));
		}
		if (tag === 'img') return norm(el.getAttribute('alt'));
		const text = norm(el.innerText !== undefined ? el.innerText : el.textContent);
		return text || norm(el.getAttribute('title'));
	};
	const all = Array.from(document.querySelectorAll('*'));
	switch (spec.kind) {
		case 'css':
			return Array.from(document.querySelectorAll(spec.selector));
		case 'role':
			return all.filter((el) => roleOf(el) === spec.role && !hidden(el) && matches(spec.name, nameOf(el)));
		case 'label':
			return all.filter((el) => {
				if (hidden(el)) return false;
				const labels = labelOf(el);
				if (!labels.length) {
					const ph = el.getAttribute('placeholder');
					if (ph) labels.push(norm(ph));
				}
				return labels.some((l) => matches(spec.text, l));
			});
		default:
			throw new Error('unknown selector kind: ' + spec.kind);
	}
}"#;

/// Embeds `spec` as a literal argument to [`RESOLVER`].
fn resolve(spec: &Value) -> String {
	format!("({RESOLVER})({spec})")
}

/// Expression returning `{count, found, visible, enabled}` for the element at `index`.
pub fn probe_expression(spec: &Value, index: usize) -> String {
	format!(
		r#"(() => {{
	const els = {resolve};
	const el = els[{index}];
	const visible = !!el && (() => {{
		const r = el.getBoundingClientRect();
		const s = getComputedStyle(el);
		return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
	}})();
	const enabled = !!el && !el.disabled && el.getAttribute('aria-disabled') !== 'true';
	return {{ count: els.length, found: !!el, visible, enabled }};
}})()"#,
		resolve = resolve(spec)
	)
}

/// Expression returning the element at `index` itself, or `null`.
pub fn element_expression(spec: &Value, index: usize) -> String {
	format!("({resolve})[{index}] ?? null", resolve = resolve(spec))
}

/// Scrolls the element into view and returns the centre of its box.
pub fn click_point_expression(spec: &Value, index: usize) -> String {
	format!(
		r#"(() => {{
	const el = {resolve}[{index}];
	if (!el) return null;
	el.scrollIntoView({{ block: 'center', inline: 'center' }});
	const r = el.getBoundingClientRect();
	return {{ x: r.left + r.width / 2, y: r.top + r.height / 2 }};
}})()"#,
		resolve = resolve(spec)
	)
}

/// Focuses the element and clears its current value so typed text replaces it.
///
/// Uses the prototype setter so framework-controlled inputs see the change.
pub fn focus_and_clear_expression(spec: &Value, index: usize) -> String {
	format!(
		r#"(() => {{
	const el = {resolve}[{index}];
	if (!el) return false;
	el.focus();
	if (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement) {{
		const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
		const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
		setter.call(el, '');
		el.dispatchEvent(new Event('input', {{ bubbles: true }}));
	}} else if (el.isContentEditable) {{
		el.textContent = '';
	}}
	return true;
}})()"#,
		resolve = resolve(spec)
	)
}

/// Focuses the element; returns false when it is gone.
pub fn focus_expression(spec: &Value, index: usize) -> String {
	format!(
		"(() => {{ const el = {resolve}[{index}]; if (!el) return false; el.focus(); return true; }})()",
		resolve = resolve(spec)
	)
}

/// Collects `{origin, entries}` for the current document's localStorage.
pub const LOCAL_STORAGE_SNAPSHOT: &str = r#"(() => {
	try {
		const entries = [];
		for (let i = 0; i < localStorage.length; i++) {
			const name = localStorage.key(i);
			entries.push({ name, value: localStorage.getItem(name) });
		}
		return { origin: location.origin, entries };
	} catch (e) {
		return { origin: location.origin, entries: [] };
	}
})()"#;

/// Init script that restores localStorage entries for one origin.
pub fn restore_local_storage_script(origin: &str, entries: &Value) -> String {
	let origin = Value::String(origin.to_string());
	format!(
		"if (location.origin === {origin}) {{ for (const e of {entries}) {{ try {{ localStorage.setItem(e.name, e.value); }} catch (_) {{}} }} }}"
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn selector_spec_is_embedded_as_json_literal() {
		let spec = json!({"kind": "css", "selector": "input[type=\"file\"]"});
		let expr = element_expression(&spec, 0);
		assert!(expr.contains(r#"{"kind":"css","selector":"input[type=\"file\"]"}"#));
		assert!(expr.ends_with("[0] ?? null"));
	}

	#[test]
	fn probe_targets_requested_index() {
		let spec = json!({"kind": "role", "role": "button", "name": null});
		let expr = probe_expression(&spec, 3);
		assert!(expr.contains("const el = els[3];"));
	}

	#[test]
	fn restore_script_quotes_origin() {
		let script = restore_local_storage_script("https://rhombusai.com", &json!([{"name": "k", "value": "v"}]));
		assert!(script.starts_with(r#"if (location.origin === "https://rhombusai.com")"#));
		assert!(script.contains(r#"[{"name":"k","value":"v"}]"#));
	}
}

//! In-page runtime installed into every attached tab.
//!
//! The script keeps a `WeakRef` table of the elements it has handed out, so
//! the engine's node ids never keep a host element alive. Collected entries
//! are swept on every query. Controls are rebuilt only when what they show
//! changes; repeated renders of the same view only restyle them. Events
//! travel back through a `Runtime.addBinding` function as JSON strings.

use serde_json::Value;

/// Name of the binding the page calls to report events.
pub const BINDING: &str = "__promptoEmit";

/// Global the runtime lives under.
pub const GLOBAL: &str = "__prompto";

pub const BOOTSTRAP: &str = r#"(() => {
  if (window.__prompto) return;

  const nodes = new Map();
  const ids = new WeakMap();
  const controls = new Map();
  const notices = new Map();
  let nextNode = 1, nextControl = 1, nextNotice = 1;
  let observer = null, listeners = [];

  const emit = (event) => {
    if (typeof window.__promptoEmit === 'function') {
      window.__promptoEmit(JSON.stringify(event));
    }
  };

  const ref = (el) => {
    let id = ids.get(el);
    if (id === undefined) {
      id = nextNode++;
      ids.set(el, id);
      nodes.set(id, new WeakRef(el));
    }
    return id;
  };

  const get = (id) => {
    const weak = nodes.get(id);
    const el = weak && weak.deref();
    if (!el) nodes.delete(id);
    return el || null;
  };

  const live = (id) => {
    const el = get(id);
    return el && el.isConnected ? el : null;
  };

  const need = (id) => {
    const el = live(id);
    if (!el) throw new Error('detached:' + id);
    return el;
  };

  const rectOf = (el) => {
    const r = el.getBoundingClientRect();
    return { x: r.left, y: r.top, width: r.width, height: r.height };
  };

  const ownsNode = (node) => {
    for (const { host } of controls.values()) {
      if (host === node || host.contains(node)) return true;
    }
    for (const el of notices.values()) {
      if (el === node || el.contains(node)) return true;
    }
    return false;
  };

  const px = (v) => Math.round(v) + 'px';

  const place = (el, rect, style) => {
    for (const [name, value] of style) el.style.setProperty(name, value, 'important');
    el.style.setProperty('left', px(rect.x), 'important');
    el.style.setProperty('top', px(rect.y), 'important');
    el.style.setProperty('width', px(rect.width), 'important');
    el.style.setProperty('height', px(rect.height), 'important');
  };

  const button = (label, onClick) => {
    const b = document.createElement('button');
    b.type = 'button';
    b.textContent = label;
    b.style.cssText = 'border:none;border-radius:50%;cursor:pointer;font:600 12px system-ui;' +
      'background:#6d28d9;color:#fff;box-shadow:0 2px 8px rgba(0,0,0,.25);padding:0;';
    b.addEventListener('click', (e) => { e.preventDefault(); e.stopPropagation(); onClick(); });
    return b;
  };

  const build = (id, view, labels) => {
    const intent = (payload) => emit({ type: 'control', control: id, intent: payload });
    const trigger = button('P', () => intent({ intent: 'activate' }));
    if (view.state.state === 'busy') {
      trigger.textContent = '…';
      trigger.disabled = true;
    }
    const actions = view.layout.actions.map(({ action }) => {
      const b = button(labels[action] || action, () => intent({ intent: 'select', action }));
      b.title = labels[action] || action;
      return b;
    });
    let panel = null;
    if (view.state.state === 'reviewing') {
      panel = document.createElement('div');
      panel.style.cssText = 'max-width:420px;max-height:240px;overflow:auto;background:#fff;' +
        'color:#111;border-radius:8px;padding:12px;font:14px system-ui;white-space:pre-wrap;' +
        'box-shadow:0 4px 16px rgba(0,0,0,.3);';
      const text = document.createElement('div');
      text.textContent = view.state.candidate;
      const row = document.createElement('div');
      row.style.cssText = 'display:flex;gap:8px;justify-content:flex-end;margin-top:8px;';
      const accept = button('Use', () => intent({ intent: 'accept' }));
      const decline = button('Discard', () => intent({ intent: 'decline' }));
      for (const b of [accept, decline]) {
        b.style.borderRadius = '6px';
        b.style.padding = '4px 10px';
      }
      decline.style.background = '#e5e7eb';
      decline.style.color = '#111';
      row.append(accept, decline);
      panel.append(text, row);
    }
    return { trigger, actions, panel };
  };

  const arrange = ({ trigger, actions, panel }, view, style) => {
    place(trigger, view.layout.trigger, style);
    view.layout.actions.forEach(({ rect }, i) => place(actions[i], rect, style));
    if (panel) {
      for (const [name, value] of style) panel.style.setProperty(name, value, 'important');
      const t = view.layout.trigger;
      panel.style.setProperty('right', px(Math.max(0, innerWidth - t.x - t.width)), 'important');
      panel.style.setProperty('bottom', px(Math.max(0, innerHeight - t.y + 8)), 'important');
    }
  };

  const api = {
    location: () => location.href,

    query: (selector) => {
      for (const [id, weak] of nodes) {
        if (!weak.deref()) nodes.delete(id);
      }
      try {
        return Array.from(document.querySelectorAll(selector), ref);
      } catch (e) {
        return { error: 'invalid-selector', message: String(e && e.message || e) };
      }
    },

    describe: (id) => {
      const el = live(id);
      if (!el) return null;
      const style = getComputedStyle(el);
      return {
        tag: el.tagName.toLowerCase(),
        editable: el.getAttribute('contenteditable') === 'true' || el.isContentEditable,
        displayed: style.display !== 'none' && style.visibility !== 'hidden' &&
          el.getClientRects().length > 0,
        rect: rectOf(el),
      };
    },

    connected: (id) => !!live(id),
    rect: (id) => { const el = live(id); return el ? rectOf(el) : null; },

    readValue: (id) => need(id).value || '',
    writeValue: (id, text) => {
      const el = need(id);
      const proto = Object.getPrototypeOf(el);
      const setter = Object.getOwnPropertyDescriptor(proto, 'value');
      if (setter && setter.set) setter.set.call(el, text); else el.value = text;
      return null;
    },
    readText: (id) => need(id).innerText || need(id).textContent || '',
    writeText: (id, text) => { need(id).textContent = text; return null; },
    dispatch: (id, type) => {
      need(id).dispatchEvent(new Event(type, { bubbles: true }));
      return null;
    },
    focus: (id) => { need(id).focus(); return null; },

    mount: (anchor) => {
      need(anchor);
      const id = nextControl++;
      const host = document.createElement('prompto-control');
      const root = host.attachShadow({ mode: 'closed' });
      document.documentElement.appendChild(host);
      controls.set(id, { host, root, anchor });
      return id;
    },

    render: (id, view, labels) => {
      const control = controls.get(id);
      if (!control) throw new Error('unknown-control:' + id);
      const { host, root } = control;
      const style = view.declarations;
      host.style.setProperty('position', 'fixed', 'important');
      host.style.setProperty('z-index', String(view.style.z_index), 'important');

      // Rebuild only when the content changes; ticks just restyle.
      const shape = JSON.stringify([view.state, view.layout.actions.map((a) => a.action), labels]);
      if (control.shape !== shape) {
        control.shape = shape;
        control.parts = build(id, view, labels);
        const { trigger, actions, panel } = control.parts;
        root.replaceChildren(trigger, ...actions, ...(panel ? [panel] : []));
      }
      arrange(control.parts, view, style);
      return null;
    },

    remove: (id) => {
      const control = controls.get(id);
      if (control) {
        control.host.remove();
        controls.delete(id);
      }
      return null;
    },

    notice: (notice) => {
      const id = nextNotice++;
      const el = document.createElement('div');
      const colors = { validation: '#b45309', failure: '#b91c1c', success: '#15803d' };
      el.textContent = notice.message;
      el.setAttribute('role', 'status');
      el.style.cssText = 'position:fixed;right:20px;top:' + (20 + 56 * notices.size) + 'px;' +
        'z-index:999999999;isolation:isolate;transform:translateZ(0);padding:10px 16px;' +
        'border-radius:8px;color:#fff;font:14px system-ui;max-width:360px;' +
        'box-shadow:0 4px 12px rgba(0,0,0,.25);background:' + (colors[notice.kind] || '#374151');
      document.documentElement.appendChild(el);
      notices.set(id, el);
      return id;
    },

    dismissNotice: (id) => {
      const el = notices.get(id);
      if (el) {
        el.remove();
        notices.delete(id);
      }
      return null;
    },

    observe: (options) => {
      api.disconnect();
      observer = new MutationObserver((records) => {
        if (records.some((r) => !ownsNode(r.target))) emit({ type: 'mutation' });
      });
      const init = {
        childList: options.child_list,
        subtree: options.subtree,
        attributes: options.attributes,
      };
      if (options.attributes) init.attributeFilter = options.attribute_filter;
      observer.observe(document.documentElement, init);

      let framePending = false;
      const throttled = (type) => () => {
        if (framePending) return;
        framePending = true;
        requestAnimationFrame(() => { framePending = false; emit({ type }); });
      };
      let lastLocation = location.href;
      const checkLocation = () => {
        if (location.href !== lastLocation) {
          lastLocation = location.href;
          emit({ type: 'navigated', location: lastLocation });
        }
      };
      const on = (target, type, handler, opts) => {
        target.addEventListener(type, handler, opts);
        listeners.push(() => target.removeEventListener(type, handler, opts));
      };
      on(document, 'visibilitychange', () =>
        emit({ type: 'visibility', visible: document.visibilityState === 'visible' }));
      on(window, 'scroll', throttled('scroll'), { capture: true, passive: true });
      on(window, 'resize', throttled('resize'), { passive: true });
      on(window, 'popstate', checkLocation);
      on(window, 'hashchange', checkLocation);
      on(document, 'pointerdown', (e) => {
        if (e.composedPath().some((n) => n instanceof Node && ownsNode(n))) return;
        emit({ type: 'pointer', point: { x: e.clientX, y: e.clientY } });
      }, { capture: true, passive: true });
      const timer = setInterval(checkLocation, 1000);
      listeners.push(() => clearInterval(timer));
      return null;
    },

    disconnect: () => {
      if (observer) observer.disconnect();
      observer = null;
      for (const off of listeners.splice(0)) off();
      return null;
    },
  };

  Object.defineProperty(window, '__prompto', { value: api, configurable: true });
})()"#;

/// Expression calling `window.__prompto.<function>(args...)`.
pub fn invocation(function: &str, args: &[Value]) -> String {
    let args: Vec<String> = args.iter().map(Value::to_string).collect();
    format!("window.{}.{}({})", GLOBAL, function, args.join(", "))
}

/// Script run in every new document: the runtime, then observation with
/// the given options.
pub fn observing_bootstrap(options: &Value) -> String {
    format!("{};\n{};", BOOTSTRAP, invocation("observe", &[options.clone()]))
}

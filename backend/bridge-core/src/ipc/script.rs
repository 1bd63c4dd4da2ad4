//! The client script served next to the websocket endpoint.
//!
//! The script is a fixed template with one configuration block filled in per
//! request: the announced binding names, the endpoint location and the query
//! string the page was loaded with.

use crate::binding::{CONTEXT_BINDING_NAME, READY_BINDING_NAME};

use serde::Serialize;

const OPTIONS_PLACEHOLDER: &str = "let options = null;";

/// Values injected into the client script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOptions {
    pub dev: bool,
    pub tls: bool,
    pub ready_func_name: String,
    pub context_name: String,
    pub prefix: String,
    pub server_path: String,
    pub search: String,
    pub bindings: Vec<String>,
    pub blur_on_close: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            dev: false,
            tls: false,
            ready_func_name: READY_BINDING_NAME.to_string(),
            context_name: CONTEXT_BINDING_NAME.to_string(),
            prefix: String::new(),
            server_path: crate::DEFAULT_SERVER_PATH.to_string(),
            search: String::new(),
            bindings: Vec::new(),
            blur_on_close: true,
        }
    }
}

/// The client script with `options` in its configuration block.
pub fn render_client_script(options: &ScriptOptions) -> String {
    let options = serde_json::to_string_pretty(options).unwrap_or_else(|e| {
        log::error!("client script options not serializable: {e}");
        "null".to_string()
    });
    CLIENT_SCRIPT.replacen(OPTIONS_PLACEHOLDER, &format!("let options = {options};"), 1)
}

const CLIENT_SCRIPT: &str = r##"(function () {
  "use strict";
  let options = null;

  const root = window;
  const pending = new Map();
  const callbacks = new Map();
  const seqs = new Map();
  const held = [];
  let lastId = 0;
  let lastRef = 0;
  let socket = null;
  let ready = false;
  let closed = false;

  function trace(...args) {
    if (options.dev) console.debug("[bridge]", ...args);
  }

  // Frames wait until the backend sent `ready`, so no call races bind-announce.
  function send(id, method, params) {
    const frame = JSON.stringify({ id, method, params });
    if (!ready) {
      trace("hold", frame);
      held.push(frame);
      return;
    }
    trace("send", frame);
    socket.send(frame);
  }

  function flush() {
    ready = true;
    while (held.length > 0) {
      const frame = held.shift();
      trace("send", frame);
      socket.send(frame);
    }
  }

  function request(method, params) {
    const id = ++lastId;
    return new Promise((resolve, reject) => {
      if (closed) {
        reject(new Error("connection closed"));
        return;
      }
      pending.set(id, { resolve, reject });
      send(id, method, params);
    });
  }

  function nextSeq(name) {
    const seq = (seqs.get(name) || 0) + 1;
    seqs.set(name, seq);
    return seq;
  }

  function lookup(name) {
    return name.split(".").reduce((obj, key) => (obj == null ? obj : obj[key]), root);
  }

  function define(name, fn) {
    const parts = name.split(".");
    const last = parts.pop();
    let obj = root;
    for (const part of parts) {
      obj[part] = obj[part] || {};
      obj = obj[part];
    }
    obj[last] = fn;
  }

  class Token {
    constructor() {
      this.seq = ++lastRef;
      this.cancelled = false;
      this.listeners = [];
    }
    cancel() {
      if (this.cancelled) return;
      this.cancelled = true;
      this.listeners.forEach((fn) => fn());
      if (!closed) send(++lastId, "ref-cancel", { seq: this.seq });
    }
    onCancel(fn) {
      this.listeners.push(fn);
    }
  }

  function marshal(name, args) {
    return args.map((arg) => {
      if (arg instanceof Token) return { seq: arg.seq };
      if (typeof arg === "function") {
        const seq = nextSeq(name + "#callback");
        callbacks.set(name + "#" + seq, arg);
        return { bindingName: name, seq };
      }
      return arg === undefined ? null : arg;
    });
  }

  function bind(name) {
    define(name, (...args) =>
      request("call", { name, seq: nextSeq(name), args: marshal(name, args) }));
  }

  async function answer(id, name, seq, fn, args) {
    const params = { name, seq, result: null, error: null };
    try {
      params.result = (await fn(...args)) ?? null;
    } catch (e) {
      params.error = String(e && e.message ? e.message : e) || "error";
    }
    send(id, "ret", params);
  }

  function remoteCallback(payload) {
    return (...args) =>
      request("callback-invoke", { name: payload.bindingName, seq: payload.seq, args });
  }

  function receive(event) {
    trace("receive", event.data);
    const { id, method, params } = JSON.parse(event.data);
    switch (method) {
      case "ret": {
        const entry = pending.get(id);
        if (!entry) return;
        pending.delete(id);
        if (params.error) entry.reject(new Error(params.error));
        else entry.resolve(params.result);
        return;
      }
      case "call": {
        const fn = params.name === "eval" ? (js) => (0, eval)(js) : lookup(params.name);
        if (typeof fn !== "function") return;
        const args = (params.args || []).map((arg) =>
          arg && typeof arg === "object" && "bindingName" in arg ? remoteCallback(arg) : arg);
        answer(id, params.name, params.seq, fn, args);
        return;
      }
      case "callback-invoke": {
        const fn = callbacks.get(params.name + "#" + params.seq);
        if (!fn) {
          const error = "callback is closed";
          send(id, "ret", { name: params.name, seq: params.seq, result: null, error });
          return;
        }
        answer(id, params.name, params.seq, fn, params.args || []);
        return;
      }
      case "callback-close":
        callbacks.delete(params.name + "#" + params.seq);
        return;
      case "bind-announce":
        params.name.forEach(bind);
        return;
      case "ready": {
        flush();
        const onReady = root[options.readyFuncName];
        if (typeof onReady === "function") onReady();
        root.dispatchEvent(new Event(options.readyFuncName.toLowerCase() + "ready"));
        return;
      }
      default:
        console.warn("[bridge] unknown method", method);
    }
  }

  root[options.contextName] = {
    withCancel() {
      return new Token();
    },
  };

  options.bindings.forEach(bind);

  const scheme = options.tls ? "wss://" : "ws://";
  const search = options.search ? "?" + options.search : "";
  socket = new WebSocket(scheme + location.host + options.prefix + options.serverPath + search);
  socket.onmessage = receive;
  socket.onclose = () => {
    closed = true;
    held.length = 0;
    pending.forEach((entry) => entry.reject(new Error("connection closed")));
    pending.clear();
    if (options.blurOnClose && document.body) {
      document.body.style.filter = "blur(2px)";
    }
  };
})();
"##;

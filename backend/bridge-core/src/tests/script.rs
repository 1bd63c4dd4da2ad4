// Unit tests for the client script

use crate::config::BridgeConfig;
use crate::ipc::{BridgeServer, ScriptOptions, render_client_script};

use serde_json::Value;

/// The JSON object injected as `let options = {...};`.
fn injected_options(script: &str) -> Value {
    let start = script.find("let options = ").expect("options block") + "let options = ".len();
    let end = start + script[start..].find("};").expect("options end") + 1;
    serde_json::from_str(&script[start..end]).expect("options are json")
}

/// **VALUE**: Verifies the rendered script carries the configuration the page
/// needs in the client's camelCase field names.
///
/// **BUG THIS CATCHES**: Would catch the placeholder not being replaced, leaving
/// `options` null and every page access throwing.
#[test]
fn given_options_when_rendered_then_injected_as_json() {
    let script = render_client_script(&ScriptOptions {
        bindings: vec!["add".to_string(), "math.mul".to_string()],
        search: "user=1".to_string(),
        ..ScriptOptions::default()
    });

    assert!(!script.contains("let options = null;"));
    let options = injected_options(&script);
    assert_eq!(options["readyFuncName"], "Bridge");
    assert_eq!(options["contextName"], "context");
    assert_eq!(options["serverPath"], "/bridge");
    assert_eq!(options["search"], "user=1");
    assert_eq!(options["bindings"][1], "math.mul");
    assert_eq!(options["blurOnClose"], true);
}

/// **VALUE**: Verifies the server's script lists every registered name and the
/// page's query without its `?`.
///
/// **WHY THIS MATTERS**: The page opens its websocket with this query, so
/// deferred bindings see the same parameters the page was loaded with.
#[test]
fn given_server_with_bindings_when_script_requested_then_names_and_query_included() {
    let mut config = BridgeConfig::default();
    config.server.prefix = "/app".to_string();
    let server = BridgeServer::new(config).expect("valid config");
    server
        .bind_function("zeta", || async { 1 })
        .expect("bound");
    server
        .bind_function("alpha", |n: i64| async move { n })
        .expect("bound");

    let options = injected_options(&server.client_script("?theme=dark"));

    assert_eq!(options["bindings"], serde_json::json!(["alpha", "zeta"]));
    assert_eq!(options["search"], "theme=dark");
    assert_eq!(options["prefix"], "/app");
}

/// **VALUE**: Verifies the whole template survives: callback keys built with
/// `"#"` are intact and the script closes its wrapper function.
///
/// **BUG THIS CATCHES**: Would catch the template literal ending early at the
/// first `"#` inside the JavaScript.
#[test]
fn given_template_when_rendered_then_complete_script() {
    let script = render_client_script(&ScriptOptions::default());

    assert!(script.starts_with("(function () {"));
    assert!(script.trim_end().ends_with("})();"));
    assert!(script.contains(r##"callbacks.set(name + "#" + seq, arg);"##));
    for method in ["ret", "call", "callback-invoke", "callback-close", "bind-announce", "ready"] {
        assert!(
            script.contains(&format!("case \"{method}\"")),
            "script handles {method}"
        );
    }
}

/// **VALUE**: Verifies the front end holds its frames until `ready` and flushes
/// them before telling the page.
///
/// **WHY THIS MATTERS**: Stubs exist as soon as the script loads; a call made
/// before the socket opens or before the bindings are announced must wait, not
/// throw or race the announcement.
///
/// **BUG THIS CATCHES**: Would catch frames written straight to a connecting
/// socket, or the page's ready hook running before held calls went out.
#[test]
fn given_script_when_ready_arrives_then_held_frames_flushed_first() {
    let script = render_client_script(&ScriptOptions::default());

    // GIVEN: Sends are held until ready
    let send = script.find("function send(").expect("send defined");
    let hold = script.find("held.push(frame)").expect("frames held");
    assert!(hold > send);
    assert!(script[send..hold].contains("if (!ready)"));

    // THEN: The ready case flushes before calling the page's hook
    let ready_case = script.find("case \"ready\"").expect("ready handled");
    let flush = ready_case + script[ready_case..].find("flush();").expect("flush on ready");
    let hook = ready_case
        + script[ready_case..]
            .find("root[options.readyFuncName]")
            .expect("ready hook");
    assert!(flush < hook);

    // THEN: A closed connection rejects new calls instead of queueing them
    assert!(script.contains("if (closed) {"));
}

/// **VALUE**: Verifies tokens only flow from the front end: it sends
/// `ref-cancel` and never acts on one.
///
/// **BUG THIS CATCHES**: Would catch the front end cancelling its own token when
/// a `ref-cancel` with a colliding seq arrives, then echoing it back.
#[test]
fn given_script_when_inspected_then_ref_cancel_only_sent() {
    let script = render_client_script(&ScriptOptions::default());

    assert!(script.contains(r#"send(++lastId, "ref-cancel", { seq: this.seq })"#));
    assert!(!script.contains(r#"case "ref-cancel""#));
}

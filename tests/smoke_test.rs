//! End-to-end tests against hand-authored WAT fixtures standing in for
//! a compiled Rego policy (see `tests/fixtures/`). None of them
//! implement real Rego evaluation; they exercise the ABI contract
//! `Vm` drives: allocation discipline, the 1.2+ one-shot `opa_eval`
//! fastpath, the legacy `eval(ctx)` path, and abort propagation.

use opa_wasm::{AbiVersion, Vm, VmOptions};
use wasmtime::{Config, Engine, Module, Store};

async fn load(wat: &str) -> (Store<()>, Module) {
    let mut config = Config::new();
    config.async_support(true);
    let engine = Engine::new(&config).expect("engine config is valid");

    let bytes = wat::parse_str(wat).expect("fixture is well-formed WAT");
    let module = Module::new(&engine, bytes).expect("fixture compiles");

    let store = Store::new(&engine, ());
    (store, module)
}

#[tokio::test]
async fn one_shot_eval_echoes_input() {
    let (mut store, module) = load(include_str!("fixtures/echo.wat")).await;
    let vm = Vm::new(&mut store, &module, VmOptions::default())
        .await
        .expect("vm construction succeeds");

    assert!(matches!(
        vm.abi_version().await.expect("vm is ready"),
        AbiVersion::V1_2
    ));

    let input = serde_json::json!({ "message": "world" });
    let result: serde_json::Value = vm
        .eval(&mut store, "test/echo", Some(&input))
        .await
        .expect("eval succeeds");

    assert_eq!(result, input);
}

#[tokio::test]
async fn one_shot_eval_defaults_input_to_null() {
    let (mut store, module) = load(include_str!("fixtures/echo.wat")).await;
    let vm = Vm::new(&mut store, &module, VmOptions::default())
        .await
        .expect("vm construction succeeds");

    let result: serde_json::Value = vm
        .eval::<serde_json::Value, _, _>(&mut store, "test/echo", None)
        .await
        .expect("eval succeeds");

    assert_eq!(result, serde_json::Value::Null);
}

#[tokio::test]
async fn eval_with_deadline_does_not_disrupt_evaluation_without_cooperating_builtins() {
    let (mut store, module) = load(include_str!("fixtures/echo.wat")).await;
    let vm = Vm::new(&mut store, &module, VmOptions::default())
        .await
        .expect("vm construction succeeds");

    let input = serde_json::json!({ "message": "world" });
    let result: serde_json::Value = vm
        .eval_with_deadline(
            &mut store,
            "test/echo",
            Some(&input),
            Some(std::time::Duration::from_millis(1)),
        )
        .await
        .expect("a tripped deadline only matters to builtins that check cancel_token");

    assert_eq!(result, input);
}

#[tokio::test]
async fn legacy_ctx_eval_echoes_input() {
    let (mut store, module) = load(include_str!("fixtures/echo_legacy.wat")).await;
    let vm = Vm::new(&mut store, &module, VmOptions::default())
        .await
        .expect("vm construction succeeds");

    assert!(matches!(
        vm.abi_version().await.expect("vm is ready"),
        AbiVersion::V1_1
    ));

    let input = serde_json::json!(["a", "b", 3]);
    let result: serde_json::Value = vm
        .eval(&mut store, "test/echo", Some(&input))
        .await
        .expect("eval succeeds");

    assert_eq!(result, input);
}

#[tokio::test]
async fn entrypoints_are_reported() {
    let (mut store, module) = load(include_str!("fixtures/echo.wat")).await;
    let vm = Vm::new(&mut store, &module, VmOptions::default())
        .await
        .expect("vm construction succeeds");

    let entrypoints = vm.entrypoints().await.expect("vm is ready");
    assert_eq!(entrypoints.len(), 1);
    assert!(entrypoints.contains_key("test/echo"));
}

#[tokio::test]
async fn eval_on_unknown_entrypoint_fails() {
    let (mut store, module) = load(include_str!("fixtures/echo.wat")).await;
    let vm = Vm::new(&mut store, &module, VmOptions::default())
        .await
        .expect("vm construction succeeds");

    let input = serde_json::json!(null);
    let result = vm
        .eval::<_, serde_json::Value, _>(&mut store, "does/not/exist", Some(&input))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn policy_abort_is_surfaced_as_a_typed_error() {
    let (mut store, module) = load(include_str!("fixtures/abort.wat")).await;
    let vm = Vm::new(&mut store, &module, VmOptions::default())
        .await
        .expect("vm construction succeeds");

    let input = serde_json::json!(null);
    let err = vm
        .eval::<_, serde_json::Value, _>(&mut store, "test/boom", Some(&input))
        .await
        .expect_err("the policy always aborts");

    match err {
        opa_wasm::Error::PolicyAborted(msg) => assert_eq!(msg, "boom"),
        other => panic!("expected PolicyAborted, got {other:?}"),
    }
}

#[tokio::test]
async fn set_data_and_patch_paths_round_trip() {
    let (mut store, module) = load(include_str!("fixtures/echo.wat")).await;
    let vm = Vm::new(&mut store, &module, VmOptions::default())
        .await
        .expect("vm construction succeeds");

    let data = serde_json::json!({ "allowed_users": ["alice"] });
    vm.set_data(&mut store, &data)
        .await
        .expect("set_data succeeds");

    vm.set_path(&mut store, &["allowed_users", "1"], &"bob")
        .await
        .expect("set_path succeeds against this fixture's always-ok stub");

    vm.remove_path(&mut store, &["allowed_users", "1"])
        .await
        .expect("remove_path succeeds against this fixture's always-ok stub");

    // The fixture's evaluation path doesn't read `data` at all, so this
    // only confirms the VM is still usable after a data swap.
    let input = serde_json::json!({});
    let result: serde_json::Value = vm
        .eval(&mut store, "test/echo", Some(&input))
        .await
        .expect("eval still succeeds after set_data/set_path/remove_path");
    assert_eq!(result, input);
}

#[tokio::test]
async fn registry_hands_out_named_vms() {
    let (mut store, module) = load(include_str!("fixtures/echo.wat")).await;
    let vm = Vm::new(&mut store, &module, VmOptions::default())
        .await
        .expect("vm construction succeeds");

    let registry = opa_wasm::VmRegistry::new();
    registry.insert("echo", vm).await;

    assert_eq!(registry.names().await, vec!["echo".to_string()]);

    let handle = registry.require("echo").await.expect("registered above");
    let input = serde_json::json!({ "k": "v" });
    let result: serde_json::Value = handle
        .eval(&mut store, "test/echo", Some(&input))
        .await
        .expect("eval through the registry handle succeeds");
    assert_eq!(result, input);

    assert!(registry.get("missing").await.is_none());
}

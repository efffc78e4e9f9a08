//! Counter store demo
//!
//! Builds a counter with a logging middleware, a devtools registry, a
//! hydration override and a handful of actions, then prints what a
//! rendering layer would observe.
//!
//! Run with: `SNAPSTORE_LOG_MODE=development cargo run --example counter`

use std::sync::Arc;

use snapstore::{
    create_store_from, init_logging_from_env, middleware, Definition, DevtoolsRegistry,
    ExternalStore, Listener, Snapshot, SnapshotWatcher, StoreConfig, Updater,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    println!("Counter Store Demo");
    println!("==================\n");

    let registry = Arc::new(DevtoolsRegistry::new());

    let definition = Definition::new()
        .field("count", 0)
        .field("step", 1)
        .action("increment", |_args| {
            Ok(Updater::compute(|s| {
                let count = s["count"].as_i64().unwrap_or(0);
                let step = s["step"].as_i64().unwrap_or(1);
                Snapshot::object([("count", count + step)])
            }))
        })
        .action("set_step", |args| {
            let step = args
                .first()
                .and_then(Snapshot::as_i64)
                .ok_or("set_step expects an integer")?;
            Ok(Updater::patch(Snapshot::object([("step", step)])))
        });

    let config = StoreConfig::named("counter")
        .with_registry(Arc::clone(&registry))
        .with_middleware(middleware::logger("counter"))
        .with_ssr(serde_json::json!({ "count": 100 }));

    let (store, actions) = create_store_from(definition, config)?;

    println!("Actions: {:?}", actions.names().collect::<Vec<_>>());
    println!("Server snapshot: {}", store.server_snapshot_or_live());
    println!("Live snapshot:   {}\n", store.get_snapshot());

    let reader = store.clone();
    let unsubscribe = store.subscribe(Listener::new(move || {
        println!("  -> count is now {}", reader.get_state()["count"]);
    }));
    let watcher = SnapshotWatcher::new(store.clone());

    println!("Incrementing twice:");
    actions.dispatch("increment", vec![])?;
    actions.dispatch("increment", vec![])?;

    println!("Setting step to 5 and incrementing:");
    actions.dispatch("set_step", vec![Snapshot::from(5)])?;
    actions.dispatch("increment", vec![])?;

    if let Err(e) = actions.dispatch("set_step", vec![Snapshot::from("five")]) {
        println!("Rejected: {e}");
    }

    if let Some(snapshot) = watcher.take_changed() {
        println!("\nWatcher saw a change, latest: {snapshot}");
    }

    println!("\nDevtools:");
    for (key, snapshot) in registry.inspect() {
        println!("  {key}: {snapshot}");
    }

    unsubscribe.unsubscribe();
    println!(
        "\nServer snapshot unchanged: {}",
        ExternalStore::get_server_snapshot(&store).unwrap_or_default()
    );

    store.destroy();
    println!("Destroyed; registry now holds {} store(s)", registry.len());

    Ok(())
}
